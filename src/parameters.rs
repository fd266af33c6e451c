use crate::errors::{GpError, Result};
use crate::kernels::{Kernel, Rbf};
use linfa::{Float, ParamGuard};
use ndarray::{ArrayBase, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default number of optimization restarts (aka multistart)
pub const GP_OPTIM_N_START: usize = 10;
/// Default max number of likelihood evaluations during one optimization
pub const GP_COBYLA_MAX_EVAL: usize = 1000;

/// Gaussian noise variance handling.
///
/// Values are expressed in the units of the labels the model is trained on.
/// Behind a [`Regressor`](crate::Regressor) with preprocessing enabled, labels are
/// standardized: a noise variance `v` then stands for `v * std_y^2` in the original
/// labels units, the labels variance being 1.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum VarianceConfig<F: Float> {
    /// Constant variance
    Constant(F),
    /// Variance is optimized between given bounds (lower, upper) starting from the inital guess
    Estimated {
        /// Starting noise variance
        initial_guess: F,
        /// (lower, upper) noise variance bounds
        bounds: (F, F),
    },
    /// Variance is optimized between given bounds starting from `ratio` times the labels variance
    Relative {
        /// Starting noise variance as a fraction of the labels variance
        ratio: F,
        /// (lower, upper) noise variance bounds
        bounds: (F, F),
    },
}

impl<F: Float> Default for VarianceConfig<F> {
    fn default() -> VarianceConfig<F> {
        Self::Relative {
            ratio: F::cast(0.01),
            bounds: (F::cast(1e-6), F::cast(10.)),
        }
    }
}

impl<F: Float> VarianceConfig<F> {
    /// Starting (or constant) noise variance given training labels
    pub fn initial_value(&self, y: &ArrayBase<impl Data<Elem = F>, Ix2>) -> F {
        match self {
            Self::Constant(v) => *v,
            Self::Estimated { initial_guess, .. } => *initial_guess,
            Self::Relative { ratio, bounds } => {
                let mean = y.mean().unwrap_or_else(F::zero);
                let var = y.mapv(|v| (v - mean) * (v - mean)).mean().unwrap_or_else(F::one);
                (*ratio * var).max(bounds.0).min(bounds.1)
            }
        }
    }

    /// Optimization bounds, none when variance is constant
    pub fn bounds(&self) -> Option<(F, F)> {
        match self {
            Self::Constant(_) => None,
            Self::Estimated { bounds, .. } | Self::Relative { bounds, .. } => Some(*bounds),
        }
    }

    pub(crate) fn check(&self) -> Result<()> {
        let valid = match self {
            Self::Constant(v) => *v > F::zero(),
            Self::Estimated {
                initial_guess,
                bounds,
            } => *initial_guess > F::zero() && bounds.0 > F::zero() && bounds.0 <= bounds.1,
            Self::Relative { ratio, bounds } => {
                *ratio > F::zero() && bounds.0 > F::zero() && bounds.0 <= bounds.1
            }
        };
        if valid {
            Ok(())
        } else {
            Err(GpError::InvalidValueError(format!(
                "Noise variance configuration should be positive, got {:?}",
                self
            )))
        }
    }
}

pub(crate) fn check_max_eval(max_eval: usize) -> Result<()> {
    if max_eval == 0 {
        return Err(GpError::InvalidValueError(
            "Max number of objective evaluations should be positive".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_kernel<F: Float, K: Kernel<F>>(kernel: &K) -> Result<()> {
    if kernel.hyperparameters().iter().any(|v| *v <= F::zero()) {
        return Err(GpError::InvalidValueError(format!(
            "Kernel hyperparameters should be positive, got {}",
            kernel
        )));
    }
    Ok(())
}

pub(crate) fn check_nugget<F: Float>(nugget: F) -> Result<()> {
    if nugget < F::zero() {
        return Err(GpError::InvalidValueError(format!(
            "Nugget should be non negative, got {}",
            nugget
        )));
    }
    Ok(())
}

/// A set of validated exact GP parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct GpValidParams<F: Float, K: Kernel<F>> {
    /// Covariance kernel, its hyperparameters are the starting point of the optimization
    pub(crate) kernel: K,
    /// Gaussian homoscedastic noise variance
    pub(crate) noise: VarianceConfig<F>,
    /// Number of optimization restarts
    pub(crate) n_start: usize,
    /// Max number of likelihood evaluations during one optimization
    pub(crate) max_eval: usize,
    /// Parameter to improve numerical stability
    pub(crate) nugget: F,
    /// Random generator seed
    pub(crate) seed: Option<u64>,
}

impl<F: Float> Default for GpValidParams<F, Rbf<F>> {
    fn default() -> GpValidParams<F, Rbf<F>> {
        GpValidParams {
            kernel: Rbf::default(),
            noise: VarianceConfig::default(),
            n_start: GP_OPTIM_N_START,
            max_eval: GP_COBYLA_MAX_EVAL,
            nugget: F::cast(100.0) * F::epsilon(),
            seed: None,
        }
    }
}

impl<F: Float, K: Kernel<F>> GpValidParams<F, K> {
    /// Get covariance kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Get noise variance configuration
    pub fn noise_variance(&self) -> &VarianceConfig<F> {
        &self.noise
    }

    /// Get the number of internal optimization restart
    pub fn n_start(&self) -> usize {
        self.n_start
    }

    /// Get the max number of internal likelihood evaluations during one optimization
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
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [exact GP algorithm](struct.GaussianProcess.html).
pub struct GpParams<F: Float, K: Kernel<F>>(GpValidParams<F, K>);

impl<F: Float> Default for GpParams<F, Rbf<F>> {
    fn default() -> GpParams<F, Rbf<F>> {
        GpParams(GpValidParams::default())
    }
}

impl<F: Float, K: Kernel<F>> GpParams<F, K> {
    /// A constructor for GP parameters given a kernel
    pub fn new(kernel: K) -> GpParams<F, K> {
        Self(GpValidParams {
            kernel,
            noise: VarianceConfig::default(),
            n_start: GP_OPTIM_N_START,
            max_eval: GP_COBYLA_MAX_EVAL,
            nugget: F::cast(100.0) * F::epsilon(),
            seed: None,
        })
    }

    /// A constructor for GP parameters from validated parameters
    pub fn new_from_valid(params: &GpValidParams<F, K>) -> Self {
        Self(params.clone())
    }

    /// Set kernel, its hyperparameters are used as initial guess
    pub fn kernel(mut self, kernel: K) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set noise variance configuration defining noise handling.
    pub fn noise_variance(mut self, config: VarianceConfig<F>) -> Self {
        self.0.noise = config;
        self
    }

    /// Set the number of internal hyperparameters optimization restarts
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.0.n_start = n_start;
        self
    }

    /// Set the max number of internal likelihood evaluations during one optimization
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.0.max_eval = max_eval;
        self
    }

    /// Set nugget value.
    ///
    /// Nugget is used to improve numerical stability
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }

    /// Set random generator seed, used to draw a single optimization restart point
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float, K: Kernel<F>> From<GpValidParams<F, K>> for GpParams<F, K> {
    fn from(valid: GpValidParams<F, K>) -> Self {
        GpParams(valid)
    }
}

impl<F: Float, K: Kernel<F>> ParamGuard for GpParams<F, K> {
    type Checked = GpValidParams<F, K>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        check_kernel(&self.0.kernel)?;
        self.0.noise.check()?;
        check_max_eval(self.0.max_eval)?;
        check_nugget(self.0.nugget)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_relative_noise_initial_value() {
        let y = array![[1.], [2.], [3.], [4.]];
        let noise = VarianceConfig::default();
        assert_abs_diff_eq!(noise.initial_value(&y), 0.0125, epsilon = 1e-12);
        assert_eq!(noise.bounds(), Some((1e-6, 10.)));
        assert_eq!(VarianceConfig::Constant(0.1).initial_value(&y), 0.1);
        assert_eq!(VarianceConfig::Constant(0.1).bounds(), None);
    }

    #[test]
    fn test_checks() {
        assert!(VarianceConfig::Constant(0.).check().is_err());
        assert!(VarianceConfig::<f64>::default().check().is_ok());
    }

    #[test]
    fn test_gp_params_guard() {
        assert!(GpParams::<f64, Rbf<f64>>::default().check_ref().is_ok());
        assert!(GpParams::new(Rbf::new(-1., 1.)).check_ref().is_err());
        assert!(GpParams::<f64, Rbf<f64>>::default()
            .max_eval(0)
            .check()
            .is_err());
        assert!(GpParams::<f64, Rbf<f64>>::default()
            .nugget(-1.)
            .check()
            .is_err());
    }
}
