//! Per-column standardization of inputs and labels.
//!
//! Statistics are computed with the population standard deviation (ddof = 0),
//! i.e. `sqrt(mean((x - mean(x))^2))`, column by column.

use crate::errors::{GpError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Mean and standard deviation vectors of a (n, ncols) data matrix
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct Standardization<F: Float> {
    /// mean vector computed from data
    pub mean: Array1<F>,
    /// standard deviation vector computed from data
    pub std: Array1<F>,
}

impl<F: Float> Standardization<F> {
    /// Compute column statistics of `x`.
    ///
    /// Fails when `x` has no row or when a column is constant.
    pub fn fit(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Standardization<F>> {
        if x.nrows() == 0 {
            return Err(GpError::EmptyData(
                "can not compute statistics without any sample".to_string(),
            ));
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| GpError::EmptyData("no column to standardize".to_string()))?;
        let std = x.std_axis(Axis(0), F::zero());
        if let Some(col) = std.iter().position(|s| *s <= F::zero() || !s.is_finite()) {
            return Err(GpError::ZeroVariance(col));
        }
        Ok(Standardization { mean, std })
    }

    /// Number of columns the statistics were computed on
    pub fn ncols(&self) -> usize {
        self.mean.len()
    }

    /// Return `(x - mean) / std`
    pub fn normalize(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_ncols(x)?;
        Ok((x - &self.mean) / &self.std)
    }

    /// Return `y * std + mean`
    pub fn denormalize(&self, y: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_ncols(y)?;
        Ok(y * &self.std + &self.mean)
    }

    fn check_ncols(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
        if x.ncols() != self.ncols() {
            return Err(GpError::DimensionMismatch {
                expected: self.ncols(),
                actual: x.ncols(),
                context: "number of columns".to_string(),
            });
        }
        Ok(())
    }
}

/// A structure to store (n, xdim) matrix data along with its standardization.
#[derive(Debug, Clone)]
pub(crate) struct NormalizedData<F: Float> {
    /// normalized data
    pub data: Array2<F>,
    /// statistics used to normalize
    pub stats: Standardization<F>,
}

impl<F: Float> NormalizedData<F> {
    /// Constructor
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<NormalizedData<F>> {
        let stats = Standardization::fit(x)?;
        let data = stats.normalize(x)?;
        Ok(NormalizedData { data, stats })
    }
}
