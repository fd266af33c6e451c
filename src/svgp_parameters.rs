use crate::errors::{GpError, Result};
use crate::kernels::{Kernel, RbfLinearWhite};
use crate::likelihoods::{Likelihood, StudentT, GH_N_POINTS};
use crate::normalization::Standardization;
use crate::parameters::{check_kernel, check_nugget};
use crate::sparse_parameters::Inducings;
use linfa::{Float, ParamGuard};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default number of inducing points of the stochastic variational GP
pub const SVGP_N_INDUCINGS: usize = 100;
/// Default mini-batch size
pub const SVGP_BATCH_SIZE: usize = 100;
/// Default number of natural gradient rounds
pub const SVGP_N_ROUNDS: usize = 10;
/// Default number of natural gradient iterations per round
pub const SVGP_NATGRAD_ITERS: usize = 100;
/// Default natural gradient step size
pub const SVGP_LEARNING_RATE: f64 = 0.1;
/// Default max number of L-BFGS iterations on hyperparameters
pub const SVGP_MAX_ITERS: u64 = 1000;

/// A set of validated stochastic variational GP parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize, L: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>, L: Deserialize<'de>"
    ))
)]
pub struct SvgpValidParams<F: Float, K: Kernel<F>, L: Likelihood<F>> {
    pub(crate) kernel: K,
    pub(crate) likelihood: L,
    pub(crate) z: Inducings<F>,
    /// None means full batch
    pub(crate) batch_size: Option<usize>,
    pub(crate) n_rounds: usize,
    pub(crate) natgrad_iters: usize,
    pub(crate) learning_rate: F,
    pub(crate) max_iters: u64,
    pub(crate) gh_points: usize,
    pub(crate) nugget: F,
    pub(crate) seed: Option<u64>,
}

impl<F: Float> Default for SvgpValidParams<F, RbfLinearWhite<F>, StudentT<F>> {
    fn default() -> Self {
        SvgpValidParams::new(RbfLinearWhite::default(), StudentT::default())
    }
}

impl<F: Float, K: Kernel<F>, L: Likelihood<F>> SvgpValidParams<F, K, L> {
    fn new(kernel: K, likelihood: L) -> Self {
        SvgpValidParams {
            kernel,
            likelihood,
            z: Inducings::Randomized(SVGP_N_INDUCINGS),
            batch_size: Some(SVGP_BATCH_SIZE),
            n_rounds: SVGP_N_ROUNDS,
            natgrad_iters: SVGP_NATGRAD_ITERS,
            learning_rate: F::cast(SVGP_LEARNING_RATE),
            max_iters: SVGP_MAX_ITERS,
            gh_points: GH_N_POINTS,
            nugget: F::cast(1e-6),
            seed: None,
        }
    }

    /// Get covariance kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Get observation likelihood
    pub fn likelihood(&self) -> &L {
        &self.likelihood
    }

    /// Get inducing points specification
    pub fn inducings(&self) -> &Inducings<F> {
        &self.z
    }

    /// Get mini-batch size, none for full batch
    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    /// Get number of natural gradient rounds
    pub fn n_rounds(&self) -> usize {
        self.n_rounds
    }

    /// Get number of natural gradient iterations per round
    pub fn natgrad_iters(&self) -> usize {
        self.natgrad_iters
    }

    /// Get natural gradient step size
    pub fn learning_rate(&self) -> F {
        self.learning_rate
    }

    /// Get max number of L-BFGS iterations
    pub fn max_iters(&self) -> u64 {
        self.max_iters
    }

    /// Get number of Gauss-Hermite quadrature points
    pub fn gh_points(&self) -> usize {
        self.gh_points
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
/// the [stochastic variational GP algorithm](struct.StochasticVariationalGp.html).
pub struct SvgpParams<F: Float, K: Kernel<F>, L: Likelihood<F>>(SvgpValidParams<F, K, L>);

impl<F: Float> Default for SvgpParams<F, RbfLinearWhite<F>, StudentT<F>> {
    fn default() -> Self {
        SvgpParams(SvgpValidParams::default())
    }
}

impl<F: Float, K: Kernel<F>, L: Likelihood<F>> SvgpParams<F, K, L> {
    /// A constructor for SVGP parameters given a kernel and a likelihood
    pub fn new(kernel: K, likelihood: L) -> Self {
        SvgpParams(SvgpValidParams::new(kernel, likelihood))
    }

    /// A constructor for SVGP parameters from validated parameters
    pub fn new_from_valid(params: &SvgpValidParams<F, K, L>) -> Self {
        Self(params.clone())
    }

    /// Set kernel, its hyperparameters are used as initial guess
    pub fn kernel(mut self, kernel: K) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set likelihood, its hyperparameters are used as initial guess
    pub fn likelihood(mut self, likelihood: L) -> Self {
        self.0.likelihood = likelihood;
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

    /// Set mini-batch size, none to use the full training set at each step
    pub fn batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.0.batch_size = batch_size;
        self
    }

    /// Set number of natural gradient rounds
    pub fn n_rounds(mut self, n_rounds: usize) -> Self {
        self.0.n_rounds = n_rounds;
        self
    }

    /// Set number of natural gradient iterations per round
    pub fn natgrad_iters(mut self, natgrad_iters: usize) -> Self {
        self.0.natgrad_iters = natgrad_iters;
        self
    }

    /// Set natural gradient step size in ]0, 1]
    pub fn learning_rate(mut self, learning_rate: F) -> Self {
        self.0.learning_rate = learning_rate;
        self
    }

    /// Set max number of L-BFGS iterations, 0 keeps the initial hyperparameters
    pub fn max_iters(mut self, max_iters: u64) -> Self {
        self.0.max_iters = max_iters;
        self
    }

    /// Set number of Gauss-Hermite quadrature points
    pub fn gh_points(mut self, gh_points: usize) -> Self {
        self.0.gh_points = gh_points;
        self
    }

    /// Set nugget added to the inducing points covariance
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }

    /// Set random generator seed used for inducing points and mini-batches
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }

    /// Parameters with located inducing points mapped to the standardized input space
    pub(crate) fn with_normalized_inducings(&self, stats: &Standardization<F>) -> Result<Self> {
        let z = self.0.z.normalized(stats)?;
        Ok(self.clone().inducings(z))
    }
}

impl<F: Float, K: Kernel<F>, L: Likelihood<F>> From<SvgpValidParams<F, K, L>>
    for SvgpParams<F, K, L>
{
    fn from(valid: SvgpValidParams<F, K, L>) -> Self {
        SvgpParams(valid)
    }
}

impl<F: Float, K: Kernel<F>, L: Likelihood<F>> ParamGuard for SvgpParams<F, K, L> {
    type Checked = SvgpValidParams<F, K, L>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        check_kernel(&self.0.kernel)?;
        self.0.likelihood.check()?;
        self.0.z.check()?;
        check_nugget(self.0.nugget)?;
        if self.0.batch_size == Some(0) {
            return Err(GpError::InvalidValueError(
                "Mini-batch size should be positive".to_string(),
            ));
        }
        if self.0.learning_rate <= F::zero() || self.0.learning_rate > F::one() {
            return Err(GpError::InvalidValueError(format!(
                "Natural gradient step size should be in ]0, 1], got {}",
                self.0.learning_rate
            )));
        }
        if self.0.gh_points == 0 {
            return Err(GpError::InvalidValueError(
                "Gauss-Hermite quadrature needs at least one point".to_string(),
            ));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
