//! Bayesian GP latent variable model used as a regressor.
//!
//! Inputs are treated as uncertain latent points with a gaussian variational
//! distribution `q(X) = N(mu, S)` where `mu` are the training inputs and `S` a fixed
//! fraction of the input column variances. Kernel and noise hyperparameters maximize
//! the collapsed evidence lower bound computed from the RBF kernel expectations
//! (psi statistics) under `q(X)`.
//!
//! # Reference
//!
//! Titsias, M., Lawrence, N. D.
//! [Bayesian Gaussian Process Latent Variable Model](http://proceedings.mlr.press/v9/titsias10a/titsias10a.pdf), AISTATS 2010.

use crate::algorithm::{broadcast_columns, check_training_data};
use crate::bgplvm_parameters::{BgplvmParams, BgplvmValidParams};
use crate::errors::{GpError, Result};
use crate::kernels::{Kernel, Rbf};
use crate::optimization::{from_log10, multistart_minimize, prepare_multistart, CobylaParams};
use crate::normalization::Standardization;
use crate::regression::{GpMethod, GpModel};
use crate::utils::{col_sq_sum, into_f64, jittered_cholesky, log_diag_sum, make_rng};

use linfa::prelude::{Dataset, DatasetBase, Fit, Float};
use linfa::ParamGuard;
use linfa_linalg::{cholesky::*, triangular::*};
use log::debug;
use ndarray::{s, Array, Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Expectations of the RBF kernel under q(X)
#[derive(Debug)]
pub(crate) struct PsiStatistics<F: Float> {
    /// sum_n E[k(x_n, x_n)]
    psi0: F,
    /// (N, M) E[k(x_n, z_m)]
    psi1: Array2<F>,
    /// (M, M) sum_n E[k(z_m, x_n) k(x_n, z_m')]
    psi2: Array2<F>,
}

impl<F: Float> PsiStatistics<F> {
    pub(crate) fn new(kernel: &Rbf<F>, mu: &Array2<F>, s: &Array2<F>, z: &Array2<F>) -> Self {
        let (n, nz) = (mu.nrows(), z.nrows());
        let var = kernel.variance();
        let l2 = kernel.inv_sq_lengthscales(mu.ncols()).mapv(|w| F::one() / w);
        let (half, two, four) = (F::cast(0.5), F::cast(2.), F::cast(4.));

        let psi0 = F::cast(n) * var;

        let psi1 = Array2::from_shape_fn((n, nz), |(i, m)| {
            let mut res = var;
            for q in 0..mu.ncols() {
                let d = mu[[i, q]] - z[[m, q]];
                let den = l2[q] + s[[i, q]];
                res *= (l2[q] / den).sqrt() * (-half * d * d / den).exp();
            }
            res
        });

        // z dependent factor of psi2
        let zfactor = Array2::from_shape_fn((nz, nz), |(m, p)| {
            let r2 = (0..z.ncols()).fold(F::zero(), |acc, q| {
                let d = z[[m, q]] - z[[p, q]];
                acc + d * d / (four * l2[q])
            });
            (-r2).exp()
        });
        let mut psi2 = Array2::<F>::zeros((nz, nz));
        for i in 0..n {
            let coef = (0..mu.ncols()).fold(var * var, |acc, q| {
                acc * (l2[q] / (l2[q] + two * s[[i, q]])).sqrt()
            });
            for m in 0..nz {
                for p in 0..=m {
                    let e = (0..mu.ncols()).fold(F::zero(), |acc, q| {
                        let d = mu[[i, q]] - half * (z[[m, q]] + z[[p, q]]);
                        acc + d * d / (l2[q] + two * s[[i, q]])
                    });
                    psi2[[m, p]] += coef * zfactor[[m, p]] * (-e).exp();
                }
            }
        }
        for m in 0..nz {
            for p in m + 1..nz {
                psi2[[m, p]] = psi2[[p, m]];
            }
        }
        PsiStatistics { psi0, psi1, psi2 }
    }
}

/// Data used for prediction
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub(crate) struct BoundData<F: Float> {
    /// cholesky of Kuu
    l: Array2<F>,
    /// cholesky of B = I + L^-1 psi2 L^-T / noise
    lb: Array2<F>,
    /// (M, p) LB^-1 L^-1 psi1^T Y / noise
    c: Array2<F>,
}

/// Collapsed evidence lower bound for given kernel and noise, KL(q(X) || p(X)) excluded
pub(crate) fn collapsed_bound<F: Float>(
    kernel: &Rbf<F>,
    noise: F,
    psi: &PsiStatistics<F>,
    z: &Array2<F>,
    ytrain: &ArrayView2<F>,
    nugget: F,
) -> Result<(F, BoundData<F>)> {
    let (n, p) = (F::cast(ytrain.nrows()), F::cast(ytrain.ncols()));
    let sigma = noise.sqrt();
    let half = F::cast(0.5);

    let l = jittered_cholesky(&kernel.gram(z), nugget)?;
    let a = l.solve_triangular(&psi.psi1.t(), UPLO::Lower)? / sigma;
    let tmp = l.solve_triangular(&psi.psi2, UPLO::Lower)?;
    let aat = l.solve_triangular(&tmp.t(), UPLO::Lower)? / noise;
    let b = &aat + &Array::eye(z.nrows());
    let lb = b.cholesky()?;
    let c = lb.solve_triangular(&a.dot(ytrain), UPLO::Lower)? / sigma;

    let mut bound = -half * n * p * (F::cast(2. * std::f64::consts::PI) * noise).ln();
    bound -= p * log_diag_sum(&lb);
    bound -= half * ytrain.mapv(|v| v * v).sum() / noise;
    bound += half * c.mapv(|v| v * v).sum();
    bound -= half * p * (psi.psi0 / noise - aat.diag().sum());
    Ok((bound, BoundData { l, lb, c }))
}

/// KL divergence between q(X) = N(mu, S) and the standard normal prior
fn kl_latent<F: Float>(mu: &Array2<F>, s: &Array2<F>) -> F {
    let half = F::cast(0.5);
    Zip::from(mu)
        .and(s)
        .fold(F::zero(), |acc, m, v| acc + half * (*v + *m * *m - F::one() - v.ln()))
}

/// Bayesian GPLVM regressor with an RBF ARD kernel
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct BayesianGplvm<F: Float> {
    kernel: Rbf<F>,
    noise: F,
    /// Evidence lower bound, KL(q(X) || p(X)) included
    elbo: F,
    inducings: Array2<F>,
    /// q(X) variances, one per input column
    x_variances: Array1<F>,
    bound_data: BoundData<F>,
}

impl<F: Float> fmt::Display for BayesianGplvm<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "BGPLVM(kernel={}, noise variance={}, elbo={})",
            self.kernel, self.noise, self.elbo
        )
    }
}

impl<F: Float> BayesianGplvm<F> {
    /// Default parameters
    pub fn params() -> BgplvmParams<F> {
        BgplvmParams::default()
    }

    fn check_input_dim(&self, ncols: usize) -> Result<()> {
        if ncols != self.input_dim() {
            return Err(GpError::DimensionMismatch {
                expected: self.input_dim(),
                actual: ncols,
                context: "BGPLVM input dimension".to_string(),
            });
        }
        Ok(())
    }

    /// Returns L^-1 Kus and LB^-1 L^-1 Kus
    fn projections(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<(Array2<F>, Array2<F>)> {
        self.check_input_dim(x.ncols())?;
        let kus = self.kernel.cross(&self.inducings, x);
        let tmp1 = self.bound_data.l.solve_triangular(&kus, UPLO::Lower)?;
        let tmp2 = self.bound_data.lb.solve_triangular(&tmp1, UPLO::Lower)?;
        Ok((tmp1, tmp2))
    }

    /// Predict mean values at n given `x` points specified as a (n, nx) matrix.
    /// Returns (n, ny) values.
    pub fn predict_values(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let (_, tmp2) = self.projections(x)?;
        Ok(tmp2.t().dot(&self.bound_data.c))
    }

    /// Predict latent variances at n given `x` points specified as a (n, nx) matrix.
    /// Returns (n, ny) variances.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let (tmp1, tmp2) = self.projections(x)?;
        let var = (self.kernel.diag(x) + col_sq_sum(&tmp2) - col_sq_sum(&tmp1))
            .mapv(|v| v.max(F::zero()));
        Ok(broadcast_columns(&var.view(), self.output_dim()))
    }

    /// Predict observation variances (latent variances plus noise) at n given `x` points.
    /// Returns (n, ny) variances.
    pub fn predict_y_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        Ok(self.predict_var(x)? + self.noise)
    }

    /// Optimized kernel
    pub fn kernel(&self) -> &Rbf<F> {
        &self.kernel
    }

    /// Estimated noise variance
    pub fn noise_variance(&self) -> F {
        self.noise
    }

    /// Evidence lower bound reached on the training data
    pub fn elbo(&self) -> F {
        self.elbo
    }

    /// Inducing points
    pub fn inducings(&self) -> &Array2<F> {
        &self.inducings
    }

    /// q(X) variances, one per input column
    pub fn x_variances(&self) -> &Array1<F> {
        &self.x_variances
    }

    /// Retrieve input dimension
    pub fn input_dim(&self) -> usize {
        self.inducings.ncols()
    }

    /// Retrieve output dimension
    pub fn output_dim(&self) -> usize {
        self.bound_data.c.ncols()
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError>
    for BgplvmValidParams<F>
{
    type Object = BayesianGplvm<F>;

    /// Fit kernel and noise hyperparameters by maximizing the collapsed bound
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let xtrain = dataset.records().to_owned();
        let ytrain = dataset.targets().to_owned();
        check_training_data(&xtrain, &ytrain)?;

        let mut rng = make_rng(self.seed());
        let z = self.inducings().select(&xtrain.view(), &mut rng)?;

        // q(X) held at its initialization
        let x_variances = xtrain
            .var_axis(Axis(0), F::zero())
            .mapv(|v| (v * self.x_variance_ratio()).max(F::cast(1e-8)));
        let xvar = Array2::from_shape_fn(xtrain.dim(), |(_, q)| x_variances[q]);
        let kl = kl_latent(&xtrain, &xvar);

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

        let split = |params: &Array1<F>| -> (Rbf<F>, F) {
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
            let psi = PsiStatistics::new(&k, &xtrain, &xvar, &z);
            match collapsed_bound(&k, noise, &psi, &z, &ytrain.view(), self.nugget()) {
                Ok((bound, _)) => -into_f64(bound),
                Err(_) => f64::INFINITY,
            }
        };

        let now = Instant::now();
        let (kernel, noise) = if self.optimize() {
            let (params0s, bounds) =
                prepare_multistart(self.n_start(), &params0, &bounds, &mut rng);
            let (fval, opt_params) = multistart_minimize(
                objfn,
                &params0s,
                &bounds,
                CobylaParams::with_budget(params0.len(), self.max_eval()),
            );
            if !fval.is_finite() {
                return Err(GpError::LikelihoodComputationError(
                    "no finite evidence lower bound found during hyperparameters optimization"
                        .to_string(),
                ));
            }
            let opt_params = from_log10::<F>(opt_params.as_slice().unwrap_or(&[]))
                .ok_or_else(|| GpError::LikelihoodComputationError("nan optimum".to_string()))?;
            split(&opt_params)
        } else {
            split(&params0)
        };

        let psi = PsiStatistics::new(&kernel, &xtrain, &xvar, &z);
        let (bound, bound_data) =
            collapsed_bound(&kernel, noise, &psi, &z, &ytrain.view(), self.nugget())?;
        let elbo = bound - kl;
        debug!(
            "BGPLVM built in {:?}ms: kernel={}, noise={}, elbo={}",
            now.elapsed().as_millis(),
            kernel,
            noise,
            elbo
        );

        Ok(BayesianGplvm {
            kernel,
            noise,
            elbo,
            inducings: z,
            x_variances,
            bound_data,
        })
    }
}

impl<F: Float> GpModel<F> for BayesianGplvm<F> {
    fn predict(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        self.predict_values(x)
    }

    fn predict_var(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        BayesianGplvm::predict_var(self, x)
    }

    fn input_dim(&self) -> usize {
        BayesianGplvm::input_dim(self)
    }

    fn output_dim(&self) -> usize {
        BayesianGplvm::output_dim(self)
    }
}

impl<F: Float> GpMethod<F> for BgplvmParams<F> {
    type Model = BayesianGplvm<F>;

    fn name(&self) -> &'static str {
        "BGPLVM"
    }

    fn train(&self, dataset: &Dataset<F, F, Ix2>) -> Result<Self::Model> {
        self.check_ref()?.fit(dataset)
    }

    fn normalized(&self, input_stats: &Standardization<F>) -> Result<Self> {
        self.with_normalized_inducings(input_stats)
    }
}
