use crate::algorithm::{broadcast_columns, check_training_data};
use crate::errors::{GpError, Result};
use crate::kernels::{Kernel, Rbf, RbfLinear};
use crate::optimization::{from_log10, multistart_minimize, prepare_multistart, CobylaParams};
use crate::normalization::Standardization;
use crate::regression::{GpMethod, GpModel};
use crate::sparse_parameters::{Inducings, SgpParams, SgpValidParams, SparseMethod};
use crate::utils::{col_sq_sum, into_f64, log_diag_sum, lower_inverse, make_rng};

use linfa::prelude::{Dataset, DatasetBase, Fit, Float};
use linfa::ParamGuard;
use linfa_linalg::cholesky::*;
use log::debug;
use ndarray::{s, Array, Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Woodbury data computed during training and used for prediction
///
/// Name came from [Woodbury matrix identity](https://en.wikipedia.org/wiki/Woodbury_matrix_identity)
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
#[derive(Debug, Clone)]
pub(crate) struct WoodburyData<F: Float> {
    /// (M, p) weights of the inducing points cross covariance for the mean
    vec: Array2<F>,
    /// (M, M) matrix such that latent variance is k(x, x) - k(x, Z) inv k(Z, x)
    inv: Array2<F>,
}

/// Sparse gaussian process considers a set of `M` inducing points either to approximate the posterior Gaussian distribution
/// with a low-rank representation (FITC - Fully Independent Training Conditional method), or to approximate the posterior
/// distribution directly (VFE - Variational Free Energy method).
///
/// With `M < N`, we get `O(NM^2)` complexity instead of `O(N^3)`
/// in time processing and `O(NM)` instead of `O(N^2)` in memory space.
///
/// Inducing points are either picked randomly in the training inputs or given by the user
/// (see [`Inducings`]) and stay fixed during the hyperparameters optimization.
/// Kernel hyperparameters and noise variance (unless constant) maximize the approximate
/// log marginal likelihood of the selected [`SparseMethod`].
///
/// # Reference
///
/// Matthias Bauer, Mark van der Wilk, and Carl Edward Rasmussen.
/// [Understanding Probabilistic Sparse Gaussian Process Approximations](https://arxiv.org/pdf/1606.04820.pdf).
/// In: Advances in Neural Information Processing Systems. Ed. by D. Lee et al. Vol. 29. Curran Associates, Inc., 2016
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct SparseGaussianProcess<F: Float, K: Kernel<F>> {
    /// Optimized kernel
    kernel: K,
    /// Sparse method used
    method: SparseMethod,
    /// Gaussian noise variance
    noise: F,
    /// Approximate log marginal likelihood at optimum
    likelihood: F,
    /// Inducing points
    inducings: Array2<F>,
    /// Data used for prediction
    w_data: WoodburyData<F>,
}

/// Sparse GP with VFE approximation and RBF + Linear ARD kernel
pub type SparseRbfLinearGp<F> = SparseGaussianProcess<F, RbfLinear<F>>;

/// Sparse GP with FITC approximation and RBF ARD kernel
pub type FitcRbfGp<F> = SparseGaussianProcess<F, Rbf<F>>;

impl<F: Float> SparseRbfLinearGp<F> {
    /// Default VFE parameters
    pub fn params() -> SgpParams<F, RbfLinear<F>> {
        SgpParams::default()
    }
}

impl<F: Float> FitcRbfGp<F> {
    /// Default FITC parameters
    pub fn params() -> SgpParams<F, Rbf<F>> {
        SgpParams::default()
    }
}

impl<F: Float, K: Kernel<F>> fmt::Display for SparseGaussianProcess<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SGP(method={:?}, kernel={}, noise variance={}, likelihood={})",
            self.method, self.kernel, self.noise, self.likelihood
        )
    }
}

impl<F: Float, K: Kernel<F>> SparseGaussianProcess<F, K> {
    /// Sparse GP parameters contructor
    pub fn params_with(kernel: K, inducings: Inducings<F>) -> SgpParams<F, K> {
        SgpParams::new(kernel, inducings)
    }

    fn check_input_dim(&self, ncols: usize) -> Result<()> {
        if ncols != self.input_dim() {
            return Err(GpError::DimensionMismatch {
                expected: self.input_dim(),
                actual: ncols,
                context: "SGP input dimension".to_string(),
            });
        }
        Ok(())
    }

    /// Predict output values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns (n, ny) output values.
    pub fn predict_values(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_input_dim(x.ncols())?;
        let kx = self.kernel.cross(x, &self.inducings);
        Ok(kx.dot(&self.w_data.vec))
    }

    /// Predict latent variance values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns (n, ny) variances.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_input_dim(x.ncols())?;
        let kx = self.kernel.cross(&self.inducings, x);
        let kxx = self.kernel.diag(x);
        let var = kxx - (self.w_data.inv.dot(&kx) * &kx).sum_axis(Axis(0));
        let var = var.mapv(|v| v.max(F::zero()));
        Ok(broadcast_columns(&var.view(), self.output_dim()))
    }

    /// Optimized kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Sparse approximation used
    pub fn method(&self) -> SparseMethod {
        self.method
    }

    /// Estimated noise variance
    pub fn noise_variance(&self) -> F {
        self.noise
    }

    /// Retrieve approximate log likelihood value
    pub fn likelihood(&self) -> F {
        self.likelihood
    }

    /// Inducing points
    pub fn inducings(&self) -> &Array2<F> {
        &self.inducings
    }

    /// Retrieve input dimension
    pub fn input_dim(&self) -> usize {
        self.inducings.ncols()
    }

    /// Retrieve output dimension
    pub fn output_dim(&self) -> usize {
        self.w_data.vec.ncols()
    }
}

impl<F: Float, K: Kernel<F>, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError>
    for SgpValidParams<F, K>
{
    type Object = SparseGaussianProcess<F, K>;

    /// Fit SGP parameters using maximum likelihood
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let xtrain = dataset.records().to_owned();
        let ytrain = dataset.targets().to_owned();
        check_training_data(&xtrain, &ytrain)?;

        let mut rng = make_rng(self.seed());
        let z = self.inducings().select(&xtrain.view(), &mut rng)?;

        let kernel = self.kernel().with_input_dim(xtrain.ncols());
        let nk = kernel.n_params();
        // Initial guess for noise, when noise variance constant, it is not part of optimization params
        let noise0 = self.noise_variance().initial_value(&ytrain);
        let noise_bounds = self.noise_variance().bounds();

        // Params consist in [kernel hyperparameters, [noise]]
        let mut params0 = kernel.hyperparameters().to_vec();
        let mut bounds = kernel.bounds();
        if let Some(nb) = noise_bounds {
            params0.push(noise0);
            bounds.push(nb);
        }
        let params0: Array1<F> = params0
            .iter()
            .zip(bounds.iter())
            .map(|(v, (lo, up))| v.max(*lo).min(*up))
            .collect();

        let split = |params: &Array1<F>| -> (K, F) {
            let k = kernel.with_hyperparameters(&params.slice(s![..nk]));
            let noise = if noise_bounds.is_some() {
                params[nk]
            } else {
                noise0
            };
            (k, noise)
        };

        let objfn = |x: &[f64], _gradient: Option<&mut [f64]>, _params: &mut ()| -> f64 {
            let Some(params) = from_log10::<F>(x) else {
                return f64::INFINITY;
            };
            let (k, noise) = split(&params);
            match self.reduced_likelihood(&k, noise, &xtrain.view(), &ytrain.view(), &z) {
                Ok((lkh, _)) => -into_f64(lkh),
                Err(_) => f64::INFINITY,
            }
        };

        let now = Instant::now();
        let (kernel, noise) = if self.optimize() {
            let (params0s, bounds) =
                prepare_multistart(self.n_start(), &params0, &bounds, &mut rng);
            debug!(
                "Optimize {:?} with {} inducing points from {} starts",
                self.method(),
                z.nrows(),
                params0s.nrows()
            );
            let (fval, opt_params) = multistart_minimize(
                objfn,
                &params0s,
                &bounds,
                CobylaParams::with_budget(params0.len(), self.max_eval()),
            );
            if !fval.is_finite() {
                return Err(GpError::LikelihoodComputationError(
                    "no finite likelihood found during hyperparameters optimization".to_string(),
                ));
            }
            let opt_params = from_log10::<F>(opt_params.as_slice().unwrap_or(&[]))
                .ok_or_else(|| GpError::LikelihoodComputationError("nan optimum".to_string()))?;
            split(&opt_params)
        } else {
            split(&params0)
        };

        // Recompute reduced likelihood with optimized params
        let (likelihood, w_data) =
            self.reduced_likelihood(&kernel, noise, &xtrain.view(), &ytrain.view(), &z)?;
        debug!(
            "SGP built in {:?}ms: kernel={}, noise={}, likelihood={}",
            now.elapsed().as_millis(),
            kernel,
            noise,
            likelihood
        );
        Ok(SparseGaussianProcess {
            kernel,
            method: self.method(),
            noise,
            likelihood,
            inducings: z,
            w_data,
        })
    }
}

impl<F: Float, K: Kernel<F>> SgpValidParams<F, K> {
    /// Compute approximate log marginal likelihood and prediction data
    fn reduced_likelihood(
        &self,
        kernel: &K,
        noise: F,
        xtrain: &ArrayView2<F>,
        ytrain: &ArrayView2<F>,
        z: &Array2<F>,
    ) -> Result<(F, WoodburyData<F>)> {
        let (likelihood, w_data) = match self.method() {
            SparseMethod::Fitc => fitc(kernel, noise, self.nugget(), xtrain, ytrain, z)?,
            SparseMethod::Vfe => vfe(kernel, noise, self.nugget(), xtrain, ytrain, z)?,
        };
        let half = F::cast(0.5);
        let n = F::cast(ytrain.nrows() * ytrain.ncols());
        let constant = half * n * F::cast(2. * std::f64::consts::PI).ln();
        Ok((likelihood - constant, w_data))
    }
}

/// FITC method, likelihood given without the constant term
fn fitc<F: Float, K: Kernel<F>>(
    kernel: &K,
    noise: F,
    nugget: F,
    xtrain: &ArrayView2<F>,
    ytrain: &ArrayView2<F>,
    z: &Array2<F>,
) -> Result<(F, WoodburyData<F>)> {
    let nz = z.nrows();
    let p = F::cast(ytrain.ncols());
    let knn = kernel.diag(xtrain);
    let kmm = kernel.gram(z) + Array::eye(nz) * nugget;
    let kmn = kernel.cross(z, xtrain);

    // Compute (lower) Cholesky decomposition: Kmm = U U^T
    let u = kmm.cholesky()?;

    // Compute cholesky decomposition: Qnn = V^T V
    let ui = lower_inverse(&u)?;
    let v = ui.dot(&kmn);

    // Compute diagonal correction: nu = Knn_diag - Qnn_diag + \eta^2
    let nu = knn - col_sq_sum(&v) + noise;
    // Compute beta, the effective noise precision
    let beta = nu.mapv(|v| F::one() / v);

    // Compute (lower) Cholesky decomposition: A = I + V diag(beta) V^T = L L^T
    let a = Array::eye(nz) + &(&v * &beta.view().insert_axis(Axis(0))).dot(&v.t());
    let l = a.cholesky()?;
    let li = lower_inverse(&l)?;

    // Compute a and b
    let a = ytrain * &beta.view().insert_axis(Axis(1));
    let b = li.dot(&v).dot(&a);

    // Compute marginal log-likelihood
    let term1 = p * nu.mapv(|v| v.ln()).sum();
    let term2 = F::cast(2.) * p * log_diag_sum(&l);
    let term3 = (&a * ytrain).sum();
    let term4 = -b.mapv(|v| v * v).sum();
    let likelihood = -F::cast(0.5) * (term1 + term2 + term3 + term4);

    // Store Woodbury vectors for prediction step
    let li_ui = li.dot(&ui);
    let li_ui_t = li_ui.t();
    let w_data = WoodburyData {
        vec: li_ui_t.dot(&b),
        inv: ui.t().dot(&ui) - li_ui_t.dot(&li_ui),
    };

    Ok((likelihood, w_data))
}

/// VFE method, likelihood given without the constant term
fn vfe<F: Float, K: Kernel<F>>(
    kernel: &K,
    noise: F,
    nugget: F,
    xtrain: &ArrayView2<F>,
    ytrain: &ArrayView2<F>,
    z: &Array2<F>,
) -> Result<(F, WoodburyData<F>)> {
    // Compute: Kmm and Kmn
    let nz = z.nrows();
    let (n, p) = (F::cast(ytrain.nrows()), F::cast(ytrain.ncols()));
    let kmm = kernel.gram(z) + Array::eye(nz) * nugget;
    let kmn = kernel.cross(z, xtrain);

    // Compute cholesky decomposition: Kmm = U U^T
    let u = kmm.cholesky()?;

    // Compute cholesky decomposition: Qnn = V^T V
    let ui = lower_inverse(&u)?;
    let v = ui.dot(&kmn);

    // Compute beta, the effective noise precision
    let beta = F::one() / noise.max(nugget);

    // Compute A = beta * V @ V.T
    let a = v.dot(&v.t()).mapv(|v| v * beta);

    // Compute cholesky decomposition: B = I + A = L L^T
    let b: Array2<F> = Array::eye(nz) + &a;
    let l = b.cholesky()?;
    let li = lower_inverse(&l)?;

    // Compute b
    let b = li.dot(&v).dot(ytrain).mapv(|v| v * beta);

    // Compute log-marginal likelihood
    let term1 = -n * p * beta.ln();
    let term2 = F::cast(2.) * p * log_diag_sum(&l);
    let term3 = beta * ytrain.mapv(|v| v * v).sum();
    let term4 = -b.mapv(|v| v * v).sum();
    let term5 = p * beta * kernel.diag(xtrain).sum();
    let term6 = -p * a.diag().sum();
    let likelihood = -F::cast(0.5) * (term1 + term2 + term3 + term4 + term5 + term6);

    let li_ui = li.dot(&ui);
    let li_ui_t = li_ui.t();
    let w_data = WoodburyData {
        vec: li_ui_t.dot(&b),
        inv: ui.t().dot(&ui) - li_ui_t.dot(&li_ui),
    };

    Ok((likelihood, w_data))
}

impl<F: Float, K: Kernel<F>> GpModel<F> for SparseGaussianProcess<F, K> {
    fn predict(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        self.predict_values(x)
    }

    fn predict_var(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        SparseGaussianProcess::predict_var(self, x)
    }

    fn input_dim(&self) -> usize {
        SparseGaussianProcess::input_dim(self)
    }

    fn output_dim(&self) -> usize {
        SparseGaussianProcess::output_dim(self)
    }
}

impl<F: Float, K: Kernel<F>> GpMethod<F> for SgpParams<F, K> {
    type Model = SparseGaussianProcess<F, K>;

    fn name(&self) -> &'static str {
        match self.sparse_method_kind() {
            SparseMethod::Fitc => "SGP_FITC",
            SparseMethod::Vfe => "SparseGP_RBF",
        }
    }

    fn train(&self, dataset: &Dataset<F, F, Ix2>) -> Result<Self::Model> {
        self.check_ref()?.fit(dataset)
    }

    fn normalized(&self, input_stats: &Standardization<F>) -> Result<Self> {
        self.with_normalized_inducings(input_stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::algorithm::log_marginal_likelihood;
    use crate::parameters::VarianceConfig;
    use crate::utils::make_inducings;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, concatenate};
    use ndarray_npy::write_npy;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::{Normal, Uniform};
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    const PI: f64 = std::f64::consts::PI;

    fn f_obj(x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Array2<f64> {
        x.mapv(|v| (3. * PI * v).sin() + 0.3 * (9. * PI * v).cos() + 0.5 * (7. * PI * v).sin())
    }

    fn make_test_data(
        nt: usize,
        eta2: f64,
        rng: &mut Xoshiro256Plus,
    ) -> (Array2<f64>, Array2<f64>) {
        let normal = Normal::new(0., eta2.sqrt()).unwrap();
        let gaussian_noise = Array::<f64, _>::random_using((nt, 1), normal, rng);
        let xt = 2. * Array::<f64, _>::random_using((nt, 1), Uniform::new(0., 1.), rng) - 1.;
        let yt = f_obj(&xt) + gaussian_noise;
        (xt, yt)
    }

    fn save_data(
        prefix: &str,
        xt: &Array2<f64>,
        yt: &Array2<f64>,
        z: &Array2<f64>,
        xplot: &Array2<f64>,
        sgp_vals: &Array2<f64>,
        sgp_vars: &Array2<f64>,
    ) {
        let test_dir = "target/tests";
        std::fs::create_dir_all(test_dir).ok();

        write_npy(format!("{test_dir}/{prefix}_xt.npy"), xt).expect("xt saved");
        write_npy(format!("{test_dir}/{prefix}_yt.npy"), yt).expect("yt saved");
        write_npy(format!("{test_dir}/{prefix}_z.npy"), z).expect("z saved");
        write_npy(format!("{test_dir}/{prefix}_x.npy"), xplot).expect("x saved");
        write_npy(format!("{test_dir}/{prefix}_vals.npy"), sgp_vals).expect("sgp vals saved");
        write_npy(format!("{test_dir}/{prefix}_vars.npy"), sgp_vars).expect("sgp vars saved");
    }

    #[test]
    fn test_sgp_fitc() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let nt = 200;
        let eta2: f64 = 0.01;
        let (xt, yt) = make_test_data(nt, eta2, &mut rng);

        let xplot = Array::linspace(-1.0, 1.0, 100).insert_axis(Axis(1));
        let sgp = FitcRbfGp::params()
            .n_inducings(30)
            .kernel(Rbf::ard(1., 0.1))
            .seed(Some(42))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("SGP fitted");
        assert_eq!(sgp.method(), SparseMethod::Fitc);
        assert_eq!(sgp.inducings().nrows(), 30);

        let sgp_vals = sgp.predict_values(&xplot).unwrap();
        let yplot = f_obj(&xplot);
        let errvals = (yplot - &sgp_vals).mapv(|v| v.abs());
        assert_abs_diff_eq!(errvals, Array2::zeros((xplot.nrows(), 1)), epsilon = 0.5);
        let sgp_vars = sgp.predict_var(&xplot).unwrap();
        assert!(sgp_vars.iter().all(|v| *v >= 0. && *v < 0.3));

        save_data("sgp_fitc", &xt, &yt, sgp.inducings(), &xplot, &sgp_vals, &sgp_vars);
    }

    #[test]
    fn test_sgp_vfe_fixed_noise() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let nt = 200;
        let eta2: f64 = 0.01;
        let (xt, yt) = make_test_data(nt, eta2, &mut rng);

        let xplot = Array::linspace(-1., 1., 100).insert_axis(Axis(1));
        let z = make_inducings(30, &xt.view(), &mut rng);

        let sgp = SparseGaussianProcess::params_with(Rbf::ard(1., 0.1), Inducings::Located(z.clone()))
            .sparse_method(SparseMethod::Vfe)
            .noise_variance(VarianceConfig::Constant(0.01))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("SGP fitted");

        assert_abs_diff_eq!(eta2, sgp.noise_variance());
        assert_abs_diff_eq!(&z, sgp.inducings());

        let sgp_vals = sgp.predict_values(&xplot).unwrap();
        let errvals = (f_obj(&xplot) - &sgp_vals).mapv(|v| v.abs());
        assert_abs_diff_eq!(errvals, Array2::zeros((xplot.nrows(), 1)), epsilon = 0.5);
        let sgp_vars = sgp.predict_var(&xplot).unwrap();

        save_data("sgp_vfe", &xt, &yt, &z, &xplot, &sgp_vals, &sgp_vars);
    }

    #[test]
    fn test_sgp_matches_exact_gp_with_all_points() {
        // With inducing points at the training inputs, FITC and VFE are the exact GP
        let xt = Array::linspace(0f64, 3., 8).insert_axis(Axis(1));
        let yt = xt.mapv(|v| v.sin());
        let kernel = Rbf::new(1.2, 0.7);
        let noise = 0.05;
        let (exact, _) = log_marginal_likelihood(&kernel, noise, 0., &xt, &yt).unwrap();
        for method in [SparseMethod::Fitc, SparseMethod::Vfe] {
            let params = SgpParams::new(kernel.clone(), Inducings::Located(xt.clone()))
                .sparse_method(method)
                .nugget(1e-10);
            let (lkh, _) = params
                .check_ref()
                .unwrap()
                .reduced_likelihood(&kernel, noise, &xt.view(), &yt.view(), &xt)
                .unwrap();
            assert_abs_diff_eq!(lkh, exact, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_sgp_noise_estimation() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let nt = 200;
        let eta2: f64 = 0.01;
        let (xt, yt) = make_test_data(nt, eta2, &mut rng);
        let z = make_inducings(30, &xt.view(), &mut rng);

        let sgp = SparseGaussianProcess::params_with(Rbf::ard(1., 0.1), Inducings::Located(z))
            .sparse_method(SparseMethod::Vfe)
            .noise_variance(VarianceConfig::Estimated {
                initial_guess: 0.02,
                bounds: (1e-3, 1.),
            })
            .fit(&Dataset::new(xt, yt))
            .expect("SGP fitted");
        assert_abs_diff_eq!(eta2, sgp.noise_variance(), epsilon = 0.015);
    }

    #[test]
    fn test_sgp_multiple_outputs() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let (xt, yt) = make_test_data(100, 0.01, &mut rng);
        let yt = concatenate(Axis(1), &[yt.view(), (-&yt).view()]).unwrap();

        let sgp = SparseRbfLinearGp::params()
            .n_inducings(20)
            .seed(Some(1))
            .fit(&Dataset::new(xt, yt))
            .expect("SGP fitted");
        let x = array![[-0.5], [0.], [0.5]];
        let vals = sgp.predict_values(&x).unwrap();
        assert_eq!(vals.dim(), (3, 2));
        assert_abs_diff_eq!(vals.column(0).to_owned(), -vals.column(1).to_owned(), epsilon = 1e-8);
        assert_eq!(sgp.predict_var(&x).unwrap().dim(), (3, 2));
        assert!(sgp.predict_values(&array![[0., 1.]]).is_err());
    }

    #[test]
    fn test_sgp_fitc_without_optimization() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let (xt, yt) = make_test_data(100, 0.01, &mut rng);
        let ds = Dataset::new(xt, yt.clone());
        let params = FitcRbfGp::params()
            .n_inducings(20)
            .kernel(Rbf::ard(1., 0.1))
            .seed(Some(3));

        let built = params.clone().optimize(false).fit(&ds).expect("SGP built");
        assert_eq!(built.kernel(), &Rbf::ard(1., 0.1).with_input_dim(1));
        assert_abs_diff_eq!(
            built.noise_variance(),
            VarianceConfig::default().initial_value(&yt),
            epsilon = 1e-12
        );
        assert!(built.likelihood().is_finite());

        // same inducing points, optimization starts from the built hyperparameters
        let optimized = params.fit(&ds).expect("SGP fitted");
        assert_eq!(optimized.inducings(), built.inducings());
        assert!(optimized.likelihood() >= built.likelihood() - 1e-8);
    }

    #[test]
    fn test_sgp_method_names() {
        assert_eq!(SparseRbfLinearGp::<f64>::params().name(), "SparseGP_RBF");
        assert_eq!(FitcRbfGp::<f64>::params().name(), "SGP_FITC");
        // name does not depend on parameters validity
        assert_eq!(FitcRbfGp::<f64>::params().n_inducings(0).name(), "SGP_FITC");
        assert_eq!(
            SparseRbfLinearGp::<f64>::params().max_eval(0).name(),
            "SparseGP_RBF"
        );
    }
}
