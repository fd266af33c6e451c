use thiserror::Error;

/// A result type for GP regression methods
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when fitting or using one of the [`RegressionMethod`](crate::RegressionMethod) variants
#[derive(Error, Debug)]
pub enum GpError {
    /// When likelihood or ELBO computation fails
    #[error("LikelihoodComputation computation error: {0}")]
    LikelihoodComputationError(String),
    #[error(transparent)]
    /// When linear algebra computation fails
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When training data has no rows
    #[error("Empty data: {0}")]
    EmptyData(String),
    /// When array shapes are not consistent
    #[error("Dimension mismatch: expected {expected}, got {actual} ({context})")]
    DimensionMismatch {
        /// expected size
        expected: usize,
        /// actual size
        actual: usize,
        /// what was checked
        context: String,
    },
    /// When a column can not be standardized
    #[error("Zero variance in column {0}: data can not be standardized")]
    ZeroVariance(usize),
    /// When prediction is requested before fit
    #[error("Model not fitted: {0}")]
    NotFitted(String),
    /// When the quasi-Newton optimizer fails
    #[error("Optimizer error: {0}")]
    OptimizerError(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
}

impl From<argmin::core::Error> for GpError {
    fn from(err: argmin::core::Error) -> Self {
        GpError::OptimizerError(err.to_string())
    }
}
