use crate::errors::{GpError, Result};
use crate::kernels::Rbf;
use crate::normalization::Standardization;
use crate::parameters::{check_kernel, check_max_eval, check_nugget, VarianceConfig, GP_COBYLA_MAX_EVAL};
use crate::sparse_parameters::Inducings;
use linfa::{Float, ParamGuard};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default number of inducing points of the latent variable model
pub const BGPLVM_N_INDUCINGS: usize = 100;
/// Default ratio between q(X) variances and the input column variances
pub const BGPLVM_X_VARIANCE_RATIO: f64 = 0.01;

/// A set of validated Bayesian GPLVM parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct BgplvmValidParams<F: Float> {
    /// RBF kernel, length-scales are expanded to the input dimension
    pub(crate) kernel: Rbf<F>,
    pub(crate) noise: VarianceConfig<F>,
    pub(crate) z: Inducings<F>,
    /// q(X) variances as a ratio of the input column variances
    pub(crate) x_variance_ratio: F,
    pub(crate) n_start: usize,
    pub(crate) max_eval: usize,
    pub(crate) nugget: F,
    pub(crate) seed: Option<u64>,
    /// Whether hyperparameters are optimized or kept at their initial values
    pub(crate) optimize: bool,
}

impl<F: Float> Default for BgplvmValidParams<F> {
    fn default() -> BgplvmValidParams<F> {
        BgplvmValidParams {
            kernel: Rbf::ard(F::one(), F::one()),
            noise: VarianceConfig::default(),
            z: Inducings::Randomized(BGPLVM_N_INDUCINGS),
            x_variance_ratio: F::cast(BGPLVM_X_VARIANCE_RATIO),
            n_start: 1,
            max_eval: GP_COBYLA_MAX_EVAL,
            nugget: F::cast(1e-6),
            seed: None,
            optimize: true,
        }
    }
}

impl<F: Float> BgplvmValidParams<F> {
    /// Get RBF kernel
    pub fn kernel(&self) -> &Rbf<F> {
        &self.kernel
    }

    /// Get noise variance configuration
    pub fn noise_variance(&self) -> &VarianceConfig<F> {
        &self.noise
    }

    /// Get inducing points specification
    pub fn inducings(&self) -> &Inducings<F> {
        &self.z
    }

    /// Get q(X) variance ratio
    pub fn x_variance_ratio(&self) -> F {
        self.x_variance_ratio
    }

    /// Get the number of internal optimization restart
    pub fn n_start(&self) -> usize {
        self.n_start
    }

    /// Get the max number of bound evaluations during one optimization
    pub fn max_eval(&self) -> usize {
        self.max_eval
    }

    /// Get nugget
    pub fn nugget(&self) -> F {
        self.nugget
    }

    /// Get seed
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Whether hyperparameters are optimized
    pub fn optimize(&self) -> bool {
        self.optimize
    }
}

#[derive(Clone, Debug, Default)]
/// The set of hyperparameters that can be specified for the execution of
/// the [Bayesian GPLVM algorithm](struct.BayesianGplvm.html).
pub struct BgplvmParams<F: Float>(BgplvmValidParams<F>);

impl<F: Float> BgplvmParams<F> {
    /// A constructor for Bayesian GPLVM parameters from validated parameters
    pub fn new_from_valid(params: &BgplvmValidParams<F>) -> Self {
        Self(params.clone())
    }

    /// Set RBF kernel, its hyperparameters are used as initial guess
    pub fn kernel(mut self, kernel: Rbf<F>) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set noise variance configuration
    pub fn noise_variance(mut self, config: VarianceConfig<F>) -> Self {
        self.0.noise = config;
        self
    }

    /// Set the number of inducing points randomly picked in the training inputs
    pub fn n_inducings(mut self, n_inducings: usize) -> Self {
        self.0.z = Inducings::Randomized(n_inducings);
        self
    }

    /// Set inducing points specification
    pub fn inducings(mut self, z: Inducings<F>) -> Self {
        self.0.z = z;
        self
    }

    /// Set q(X) variances as a ratio of the input column variances
    pub fn x_variance_ratio(mut self, ratio: F) -> Self {
        self.0.x_variance_ratio = ratio;
        self
    }

    /// Set the number of internal hyperparameters optimization restarts
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.0.n_start = n_start;
        self
    }

    /// Set the max number of bound evaluations during one optimization
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.0.max_eval = max_eval;
        self
    }

    /// Set nugget added to the inducing points covariance
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }

    /// Set random generator seed used for inducing points selection
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }

    /// Enable or disable the hyperparameters optimization.
    ///
    /// When disabled, the bound is computed once with the initial kernel
    /// hyperparameters and the initial noise variance.
    pub fn optimize(mut self, optimize: bool) -> Self {
        self.0.optimize = optimize;
        self
    }

    /// Parameters with located inducing points mapped to the standardized input space
    pub(crate) fn with_normalized_inducings(&self, stats: &Standardization<F>) -> Result<Self> {
        let z = self.0.z.normalized(stats)?;
        Ok(self.clone().inducings(z))
    }
}

impl<F: Float> From<BgplvmValidParams<F>> for BgplvmParams<F> {
    fn from(valid: BgplvmValidParams<F>) -> Self {
        BgplvmParams(valid)
    }
}

impl<F: Float> ParamGuard for BgplvmParams<F> {
    type Checked = BgplvmValidParams<F>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        check_kernel(&self.0.kernel)?;
        self.0.noise.check()?;
        self.0.z.check()?;
        check_max_eval(self.0.max_eval)?;
        check_nugget(self.0.nugget)?;
        if self.0.x_variance_ratio <= F::zero() {
            return Err(GpError::InvalidValueError(format!(
                "q(X) variance ratio should be positive, got {}",
                self.0.x_variance_ratio
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
