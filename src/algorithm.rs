use crate::errors::{GpError, Result};
use crate::kernels::{Kernel, Rbf};
use crate::optimization::{from_log10, multistart_minimize, prepare_multistart, CobylaParams};
use crate::parameters::{GpParams, GpValidParams};
use crate::regression::{GpMethod, GpModel};
use crate::utils::{col_sq_sum, into_f64, log_diag_sum, make_rng};

use linfa::prelude::{Dataset, DatasetBase, Fit, Float};
use linfa::ParamGuard;
use linfa_linalg::{cholesky::*, triangular::*};
use log::debug;
use ndarray::{s, Array, Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Factorized covariance of the training data computed for given hyperparameters
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub(crate) struct GpInnerParams<F: Float> {
    /// Cholesky decomposition of K + noise * I (lower)
    chol: Array2<F>,
    /// (K + noise * I)^-1 y
    alpha: Array2<F>,
}

/// Exact gaussian process regression with additive gaussian noise:
///
/// y = f(x) + e, with f ~ GP(0, k(x, x')) and e ~ N(0, noise)
///
/// Kernel hyperparameters and noise variance are estimated by maximizing
/// the log marginal likelihood of the training data.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct GaussianProcess<F: Float, K: Kernel<F>> {
    /// Optimized kernel
    kernel: K,
    /// Optimized gaussian noise variance
    noise: F,
    /// Log marginal likelihood at optimum
    likelihood: F,
    /// Nugget added to the diagonal
    nugget: F,
    /// Training inputs
    xtrain: Array2<F>,
    /// Data used for prediction
    inner_params: GpInnerParams<F>,
}

impl<F: Float, K: Kernel<F>> fmt::Display for GaussianProcess<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GP(kernel={}, noise={}, likelihood={})",
            self.kernel, self.noise, self.likelihood
        )
    }
}

/// Exact GP with a single length-scale squared exponential kernel
pub type RbfGp<F> = GaussianProcess<F, Rbf<F>>;

impl<F: Float> RbfGp<F> {
    /// Default parameters: isotropic RBF kernel and noise started at 1% of the labels variance
    pub fn params() -> GpParams<F, Rbf<F>> {
        GpParams::default()
    }
}

impl<F: Float, K: Kernel<F>> GaussianProcess<F, K> {
    /// Gp parameters contructor
    pub fn params_with(kernel: K) -> GpParams<F, K> {
        GpParams::new(kernel)
    }

    /// Predict output values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns (n, ny) output values.
    pub fn predict_values(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_input_dim(x.ncols())?;
        let kx = self.kernel.cross(x, &self.xtrain);
        Ok(kx.dot(&self.inner_params.alpha))
    }

    /// Predict latent variance values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns (n, ny) variances, identical for all outputs as hyperparameters are shared.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_input_dim(x.ncols())?;
        let kxt = self.kernel.cross(&self.xtrain, x);
        let v = self
            .inner_params
            .chol
            .solve_triangular(&kxt, UPLO::Lower)?;
        let var = (self.kernel.diag(x) - col_sq_sum(&v)).mapv(|v| v.max(F::zero()));
        Ok(broadcast_columns(&var.view(), self.output_dim()))
    }

    fn check_input_dim(&self, ncols: usize) -> Result<()> {
        if ncols != self.input_dim() {
            return Err(GpError::DimensionMismatch {
                expected: self.input_dim(),
                actual: ncols,
                context: "GP input dimension".to_string(),
            });
        }
        Ok(())
    }

    /// Retrieve input dimension
    pub fn input_dim(&self) -> usize {
        self.xtrain.ncols()
    }

    /// Retrieve output dimension
    pub fn output_dim(&self) -> usize {
        self.inner_params.alpha.ncols()
    }

    /// Optimized kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Estimated noise variance
    pub fn noise(&self) -> F {
        self.noise
    }

    /// Log marginal likelihood at optimum
    pub fn likelihood(&self) -> F {
        self.likelihood
    }

    /// Nugget used in the covariance diagonal
    pub fn nugget(&self) -> F {
        self.nugget
    }
}

/// Repeat a column vector to get a (n, ncols) matrix
pub(crate) fn broadcast_columns<F: Float>(v: &ArrayView1<F>, ncols: usize) -> Array2<F> {
    Array2::from_shape_fn((v.len(), ncols), |(i, _)| v[i])
}

/// Log marginal likelihood of `y` given kernel and noise with the factorization used by predictions
pub(crate) fn log_marginal_likelihood<F: Float, K: Kernel<F>>(
    kernel: &K,
    noise: F,
    nugget: F,
    xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ytrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<(F, GpInnerParams<F>)> {
    let n = xtrain.nrows();
    let k = kernel.gram(xtrain) + Array::eye(n) * (noise + nugget);
    let chol = k.cholesky()?;
    let v = chol.solve_triangular(ytrain, UPLO::Lower)?;
    let alpha = chol.t().solve_triangular(&v, UPLO::Upper)?;

    let half = F::cast(0.5);
    let p = F::cast(ytrain.ncols());
    let data_fit = half * v.mapv(|e| e * e).sum();
    let complexity = p * log_diag_sum(&chol);
    let constant = half * F::cast(n) * p * F::cast(2. * std::f64::consts::PI).ln();
    let likelihood = -(data_fit + complexity + constant);
    Ok((likelihood, GpInnerParams { chol, alpha }))
}

impl<F: Float, K: Kernel<F>, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError>
    for GpValidParams<F, K>
{
    type Object = GaussianProcess<F, K>;

    /// Fit GP parameters using maximum likelihood
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let xtrain = dataset.records().to_owned();
        let ytrain = dataset.targets().to_owned();
        check_training_data(&xtrain, &ytrain)?;

        let kernel = self.kernel().with_input_dim(xtrain.ncols());
        let nk = kernel.n_params();
        let noise0 = self.noise_variance().initial_value(&ytrain);
        let noise_bounds = self.noise_variance().bounds();

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
                // shortcut return worst value wrt to likelihood maximization
                return f64::INFINITY;
            };
            let (k, noise) = split(&params);
            match log_marginal_likelihood(&k, noise, self.nugget(), &xtrain, &ytrain) {
                Ok((lkh, _)) => -into_f64(lkh),
                Err(_) => f64::INFINITY,
            }
        };

        let mut rng = make_rng(self.seed());
        let (params0s, bounds) = prepare_multistart(self.n_start(), &params0, &bounds, &mut rng);
        let now = Instant::now();
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
        let (kernel, noise) = split(&opt_params);
        let (likelihood, inner_params) =
            log_marginal_likelihood(&kernel, noise, self.nugget(), &xtrain, &ytrain)?;
        debug!(
            "GP optimized in {:?}ms: kernel={}, noise={}, likelihood={}",
            now.elapsed().as_millis(),
            kernel,
            noise,
            likelihood
        );

        Ok(GaussianProcess {
            kernel,
            noise,
            likelihood,
            nugget: self.nugget(),
            xtrain,
            inner_params,
        })
    }
}

/// Check training inputs and outputs are consistent
pub(crate) fn check_training_data<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<()> {
    if x.nrows() == 0 {
        return Err(GpError::EmptyData(
            "training data should have at least one sample".to_string(),
        ));
    }
    if x.nrows() != y.nrows() {
        return Err(GpError::DimensionMismatch {
            expected: x.nrows(),
            actual: y.nrows(),
            context: "number of training outputs".to_string(),
        });
    }
    Ok(())
}

impl<F: Float, K: Kernel<F>> GpModel<F> for GaussianProcess<F, K> {
    fn predict(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        self.predict_values(x)
    }

    fn predict_var(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        GaussianProcess::predict_var(self, x)
    }

    fn input_dim(&self) -> usize {
        GaussianProcess::input_dim(self)
    }

    fn output_dim(&self) -> usize {
        GaussianProcess::output_dim(self)
    }
}

impl<F: Float, K: Kernel<F>> GpMethod<F> for GpParams<F, K> {
    type Model = GaussianProcess<F, K>;

    fn name(&self) -> &'static str {
        "GP_RBF"
    }

    fn train(&self, dataset: &Dataset<F, F, Ix2>) -> Result<Self::Model> {
        self.check_ref()?.fit(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, concatenate, Axis};
    use ndarray_npy::write_npy;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::{Normal, Uniform};
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    use crate::parameters::VarianceConfig;

    fn f_obj(x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Array2<f64> {
        x.mapv(|v| (3. * v).sin() + 0.5 * v)
    }

    #[test]
    fn test_log_marginal_likelihood_small() {
        let x = array![[0.], [1.]];
        let y = array![[1.], [-1.]];
        let kernel = Rbf::new(1., 1.);
        let noise = 0.1;
        let (lkh, inner) = log_marginal_likelihood(&kernel, noise, 0., &x, &y).unwrap();

        let c = (-0.5f64).exp();
        let (a, det) = (1.1, 1.1 * 1.1 - c * c);
        // y^T K^-1 y with K = [[a, c], [c, a]] and y = [1, -1]
        let quad = (a + a + 2. * c) / det;
        let expected = -0.5 * quad - 0.5 * det.ln() - (2. * std::f64::consts::PI).ln();
        assert_abs_diff_eq!(lkh, expected, epsilon = 1e-10);
        let k = array![[a, c], [c, a]];
        assert_abs_diff_eq!(k.dot(&inner.alpha), y, epsilon = 1e-10);
    }

    #[test]
    fn test_gp_noisy_sine() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let nt = 40;
        let eta2: f64 = 0.01;
        let normal = Normal::new(0., eta2.sqrt()).unwrap();
        let xt = Array::random_using((nt, 1), Uniform::new(-2., 2.), &mut rng);
        let yt = f_obj(&xt) + Array::random_using((nt, 1), normal, &mut rng);

        let gp = RbfGp::params()
            .seed(Some(42))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("GP fitted");

        let xtest = Array::linspace(-1.8, 1.8, 20).insert_axis(Axis(1));
        let ytest = gp.predict_values(&xtest).unwrap();
        assert_abs_diff_eq!(ytest, f_obj(&xtest), epsilon = 0.15);
        assert!(gp.noise() > 1e-4 && gp.noise() < 0.05, "noise = {}", gp.noise());

        let var = gp.predict_var(&xtest).unwrap();
        assert_eq!(var.dim(), (20, 1));
        assert!(var.iter().all(|v| *v >= 0. && *v < 0.1));

        let test_dir = "target/tests";
        std::fs::create_dir_all(test_dir).ok();
        write_npy(format!("{test_dir}/gp_xt.npy"), &xt).expect("xt saved");
        write_npy(format!("{test_dir}/gp_yt.npy"), &yt).expect("yt saved");
        write_npy(format!("{test_dir}/gp_x.npy"), &xtest).expect("x saved");
        write_npy(format!("{test_dir}/gp_vals.npy"), &ytest).expect("gp vals saved");
    }

    #[test]
    fn test_gp_optimization_improves_likelihood() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let xt = Array::random_using((20, 2), Uniform::new(-1., 1.), &mut rng);
        let yt = xt.map_axis(Axis(1), |r| r[0] * r[0] - r[1]).insert_axis(Axis(1));
        let params = RbfGp::params().n_start(2);
        let valid = params.check_ref().unwrap();
        let noise0 = valid.noise_variance().initial_value(&yt);
        let (lkh0, _) =
            log_marginal_likelihood(&Rbf::new(1., 1.), noise0, valid.nugget(), &xt, &yt).unwrap();
        let gp = params.fit(&Dataset::new(xt, yt)).unwrap();
        assert!(gp.likelihood() >= lkh0);
    }

    #[test]
    fn test_gp_multi_outputs_fixed_noise() {
        let xt = Array::linspace(0f64, 4., 12).insert_axis(Axis(1));
        let yt = concatenate![Axis(1), xt.mapv(|v| v.sin()), xt.mapv(|v| v.cos())];
        let gp = GaussianProcess::params_with(Rbf::new(1., 1.))
            .noise_variance(VarianceConfig::Constant(1e-4))
            .seed(Some(1))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .unwrap();
        assert_eq!(gp.noise(), 1e-4);
        let xtest = array![[0.5], [2.2], [3.7]];
        let ytest = gp.predict_values(&xtest).unwrap();
        assert_eq!(ytest.dim(), (3, 2));
        assert_abs_diff_eq!(ytest.column(0).to_owned(), xtest.column(0).mapv(f64::sin), epsilon = 0.05);
        assert_abs_diff_eq!(ytest.column(1).to_owned(), xtest.column(0).mapv(f64::cos), epsilon = 0.05);
        assert_eq!(gp.predict_var(&xtest).unwrap().dim(), (3, 2));
    }

    #[cfg(feature = "serializable")]
    #[test]
    fn test_gp_serde_roundtrip() {
        let xt = Array::linspace(0., 4., 10).insert_axis(Axis(1));
        let yt = f_obj(&xt);
        let gp = RbfGp::params()
            .n_start(1)
            .seed(Some(0))
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        let json = serde_json::to_string(&gp).expect("GP serialized");
        let loaded: RbfGp<f64> = serde_json::from_str(&json).expect("GP deserialized");
        let x = array![[0.3], [2.7]];
        assert_abs_diff_eq!(
            loaded.predict_values(&x).unwrap(),
            gp.predict_values(&x).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_gp_bad_inputs() {
        let xt = array![[0.], [1.], [2.]];
        let yt = array![[0.], [1.]];
        let res = RbfGp::params().fit(&Dataset::new(xt.clone(), yt));
        assert!(matches!(res, Err(GpError::DimensionMismatch { .. })));

        let yt = array![[0.], [1.], [0.5]];
        let gp = RbfGp::params().n_start(1).fit(&Dataset::new(xt, yt)).unwrap();
        assert!(gp.predict_values(&array![[0., 1.]]).is_err());
    }
}
