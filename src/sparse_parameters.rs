use crate::errors::{GpError, Result};
use crate::kernels::{Kernel, Rbf, RbfLinear};
use crate::normalization::Standardization;
use crate::parameters::{check_kernel, check_max_eval, check_nugget, VarianceConfig};
use crate::utils::make_inducings;
use linfa::{Float, ParamGuard};
use ndarray::{Array2, ArrayView2};
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default number of inducing points
pub const SGP_N_INDUCINGS: usize = 1000;
/// Default number of optimization restarts of sparse methods
pub const SGP_OPTIM_N_START: usize = 1;
/// Default nugget added to the inducing points covariance
pub const SGP_NUGGET: f64 = 1e-6;

/// Inducing points specification
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Inducings<F: Float> {
    /// usize points are selected randomly in the input training dataset
    Randomized(usize),
    /// Points are given as a (npoints, nx) matrix
    Located(Array2<F>),
}

impl<F: Float> Default for Inducings<F> {
    fn default() -> Inducings<F> {
        Self::Randomized(SGP_N_INDUCINGS)
    }
}

impl<F: Float> Inducings<F> {
    /// Inducing points in the (normalized) training input space
    pub(crate) fn select(
        &self,
        xtrain: &ArrayView2<F>,
        rng: &mut Xoshiro256Plus,
    ) -> Result<Array2<F>> {
        match self {
            Inducings::Randomized(n) => Ok(make_inducings(*n, xtrain, rng)),
            Inducings::Located(z) => {
                if z.ncols() != xtrain.ncols() {
                    return Err(GpError::DimensionMismatch {
                        expected: xtrain.ncols(),
                        actual: z.ncols(),
                        context: "inducing points dimension".to_string(),
                    });
                }
                Ok(z.to_owned())
            }
        }
    }

    /// Located points mapped to the space of inputs standardized with `stats`
    pub(crate) fn normalized(&self, stats: &Standardization<F>) -> Result<Inducings<F>> {
        match self {
            Inducings::Randomized(n) => Ok(Inducings::Randomized(*n)),
            Inducings::Located(z) => Ok(Inducings::Located(stats.normalize(z)?)),
        }
    }

    pub(crate) fn check(&self) -> Result<()> {
        let n = match self {
            Inducings::Randomized(n) => *n,
            Inducings::Located(z) => z.nrows(),
        };
        if n == 0 {
            return Err(GpError::InvalidValueError(
                "At least one inducing point is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sparse GP approximation method
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum SparseMethod {
    #[default]
    /// Fully Independent Training Conditional method
    Fitc,
    /// Variational Free Energy method
    Vfe,
}

/// A set of validated SGP parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct SgpValidParams<F: Float, K: Kernel<F>> {
    /// Covariance kernel, its hyperparameters are the starting point of the optimization
    pub(crate) kernel: K,
    /// Gaussian homoscedastic noise variance
    pub(crate) noise: VarianceConfig<F>,
    /// Inducing points
    pub(crate) z: Inducings<F>,
    /// Method
    pub(crate) method: SparseMethod,
    /// Number of optimization restarts
    pub(crate) n_start: usize,
    /// Max number of likelihood evaluations during one optimization
    pub(crate) max_eval: usize,
    /// Jitter added to the inducing points covariance
    pub(crate) nugget: F,
    /// Random generator seed
    pub(crate) seed: Option<u64>,
    /// Whether hyperparameters are optimized or kept at their initial values
    pub(crate) optimize: bool,
}

impl<F: Float> Default for SgpValidParams<F, RbfLinear<F>> {
    fn default() -> SgpValidParams<F, RbfLinear<F>> {
        SgpValidParams::new(RbfLinear::default(), Inducings::default(), SparseMethod::Vfe)
    }
}

impl<F: Float> Default for SgpValidParams<F, Rbf<F>> {
    fn default() -> SgpValidParams<F, Rbf<F>> {
        SgpValidParams::new(
            Rbf::ard(F::one(), F::one()),
            Inducings::default(),
            SparseMethod::Fitc,
        )
    }
}

impl<F: Float, K: Kernel<F>> SgpValidParams<F, K> {
    fn new(kernel: K, z: Inducings<F>, method: SparseMethod) -> Self {
        SgpValidParams {
            kernel,
            noise: VarianceConfig::default(),
            z,
            method,
            n_start: SGP_OPTIM_N_START,
            max_eval: crate::parameters::GP_COBYLA_MAX_EVAL,
            nugget: F::cast(SGP_NUGGET),
            seed: None,
            optimize: true,
        }
    }

    /// Get covariance kernel
    pub fn kernel(&self) -> &K {
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

    /// Get sparse method
    pub fn method(&self) -> SparseMethod {
        self.method
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

    /// Whether hyperparameters are optimized
    pub fn optimize(&self) -> bool {
        self.optimize
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [sparse GP algorithm](struct.SparseGaussianProcess.html).
pub struct SgpParams<F: Float, K: Kernel<F>>(SgpValidParams<F, K>);

impl<F: Float> Default for SgpParams<F, RbfLinear<F>> {
    fn default() -> SgpParams<F, RbfLinear<F>> {
        SgpParams(SgpValidParams::default())
    }
}

impl<F: Float> Default for SgpParams<F, Rbf<F>> {
    fn default() -> SgpParams<F, Rbf<F>> {
        SgpParams(SgpValidParams::default())
    }
}

impl<F: Float, K: Kernel<F>> SgpParams<F, K> {
    /// A constructor for SGP parameters given a kernel and inducing points specification
    pub fn new(kernel: K, inducings: Inducings<F>) -> SgpParams<F, K> {
        Self(SgpValidParams::new(kernel, inducings, SparseMethod::default()))
    }

    /// A constructor for SGP parameters from validated parameters
    pub fn new_from_valid(params: &SgpValidParams<F, K>) -> Self {
        Self(params.clone())
    }

    /// Set kernel, its hyperparameters are used as initial guess
    pub fn kernel(mut self, kernel: K) -> Self {
        self.0.kernel = kernel;
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

    /// Set the sparse approximation method
    pub fn sparse_method(mut self, method: SparseMethod) -> Self {
        self.0.method = method;
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

    /// Set nugget value added to the inducing points covariance.
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
    /// When disabled, the model is built with the initial kernel hyperparameters
    /// and the initial noise variance.
    pub fn optimize(mut self, optimize: bool) -> Self {
        self.0.optimize = optimize;
        self
    }

    pub(crate) fn sparse_method_kind(&self) -> SparseMethod {
        self.0.method
    }

    /// Parameters with located inducing points mapped to the standardized input space
    pub(crate) fn with_normalized_inducings(&self, stats: &Standardization<F>) -> Result<Self> {
        let z = self.0.z.normalized(stats)?;
        Ok(self.clone().inducings(z))
    }
}

impl<F: Float, K: Kernel<F>> From<SgpValidParams<F, K>> for SgpParams<F, K> {
    fn from(valid: SgpValidParams<F, K>) -> Self {
        SgpParams(valid)
    }
}

impl<F: Float, K: Kernel<F>> ParamGuard for SgpParams<F, K> {
    type Checked = SgpValidParams<F, K>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        check_kernel(&self.0.kernel)?;
        self.0.noise.check()?;
        self.0.z.check()?;
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
    use ndarray::array;

    #[test]
    fn test_sgp_params_defaults() {
        let vfe = SgpParams::<f64, RbfLinear<f64>>::default();
        let valid = vfe.check_ref().unwrap();
        assert_eq!(valid.method(), SparseMethod::Vfe);
        assert_eq!(valid.inducings(), &Inducings::Randomized(SGP_N_INDUCINGS));

        let fitc = SgpParams::<f64, Rbf<f64>>::default();
        let valid = fitc.check_ref().unwrap();
        assert_eq!(valid.method(), SparseMethod::Fitc);
        assert!(valid.kernel().is_ard());
        assert!(valid.optimize());
        assert!(!fitc.optimize(false).check_ref().unwrap().optimize());
    }

    #[test]
    fn test_sgp_params_checks() {
        assert!(Inducings::<f64>::Randomized(0).check().is_err());
        assert!(Inducings::<f64>::default().check().is_ok());
        assert!(SgpParams::<f64, Rbf<f64>>::default()
            .n_inducings(0)
            .check()
            .is_err());
        assert!(SgpParams::<f64, Rbf<f64>>::default()
            .noise_variance(VarianceConfig::Constant(-1.))
            .check()
            .is_err());
    }

    #[test]
    fn test_normalized_inducings() {
        let stats = Standardization::fit(&array![[100., 0.], [110., 4.]]).unwrap();
        let z = Inducings::Located(array![[100., 2.], [105., 4.]]);
        assert_eq!(
            z.normalized(&stats).unwrap(),
            Inducings::Located(array![[-1., 0.], [0., 1.]])
        );
        assert_eq!(
            Inducings::<f64>::Randomized(3).normalized(&stats).unwrap(),
            Inducings::Randomized(3)
        );
        assert!(Inducings::Located(array![[1.]]).normalized(&stats).is_err());
    }

    #[test]
    fn test_located_inducings_dim() {
        let xt = array![[0., 1.], [1., 2.]];
        let mut rng = crate::utils::make_rng(Some(0));
        let z = Inducings::Located(array![[0.5]]);
        assert!(z.select(&xt.view(), &mut rng).is_err());
        let z = Inducings::<f64>::Randomized(5);
        assert_eq!(z.select(&xt.view(), &mut rng).unwrap().dim(), (2, 2));
    }
}
