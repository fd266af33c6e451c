//! Covariance kernels used by the regression methods.
//!
//! Hyperparameters are all positive; optimizers work on their log10 values
//! within the bounds given by [`Kernel::bounds`].
//!
//! * [`Rbf`]: `k(x, x') = s2 * exp(-0.5 * sum_j (x_j - x'_j)^2 / l_j^2)`
//! * [`Linear`]: `k(x, x') = sum_j v_j * x_j * x'_j`
//! * [`White`]: `k(x, x) = s2`, no cross-covariance between distinct point sets
//! * [`Sum`]: sum of two kernels

use linfa::Float;
use ndarray::{s, Array, Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

const VARIANCE_BOUNDS: (f64, f64) = (1e-4, 1e2);
const LENGTHSCALE_BOUNDS: (f64, f64) = (1e-3, 1e3);
const LINEAR_BOUNDS: (f64, f64) = (1e-6, 1e2);
const WHITE_BOUNDS: (f64, f64) = (1e-6, 1e1);

/// A trait for covariance functions k(x, x')
pub trait Kernel<F: Float>: Clone + fmt::Debug + fmt::Display + Send + Sync {
    /// Number of hyperparameters
    fn n_params(&self) -> usize;

    /// Current hyperparameter values
    fn hyperparameters(&self) -> Array1<F>;

    /// A copy of the kernel with the given hyperparameter values,
    /// ordered as returned by [`Kernel::hyperparameters`]
    fn with_hyperparameters(&self, params: &ArrayView1<F>) -> Self;

    /// (lower, upper) bounds for each hyperparameter
    fn bounds(&self) -> Vec<(F, F)>;

    /// A copy of the kernel whose per-dimension hyperparameters (if any)
    /// match the input dimension `dim`
    fn with_input_dim(&self, dim: usize) -> Self;

    /// Cross-covariance matrix (a.nrows(), b.nrows()) between two point sets
    fn cross(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F>;

    /// Covariance matrix of a point set with itself
    fn gram(&self, a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        self.cross(a, a)
    }

    /// Diagonal of the covariance matrix of a point set
    fn diag(&self, a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F>;
}

fn cast_bounds<F: Float>(bounds: (f64, f64)) -> (F, F) {
    (F::cast(bounds.0), F::cast(bounds.1))
}

/// Expand a single shared value to `dim` values
fn expand<F: Float>(values: &Array1<F>, dim: usize) -> Array1<F> {
    if values.len() == dim {
        values.to_owned()
    } else {
        Array1::from_elem(dim, values[0])
    }
}

/// Squared exponential kernel
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct Rbf<F: Float> {
    variance: F,
    lengthscales: Array1<F>,
    ard: bool,
}

impl<F: Float> Default for Rbf<F> {
    fn default() -> Rbf<F> {
        Rbf::new(F::one(), F::one())
    }
}

impl<F: Float> Rbf<F> {
    /// Isotropic kernel: one length-scale shared by all input dimensions
    pub fn new(variance: F, lengthscale: F) -> Rbf<F> {
        Rbf {
            variance,
            lengthscales: Array1::from_elem(1, lengthscale),
            ard: false,
        }
    }

    /// ARD kernel: one length-scale per input dimension, set up on fit
    pub fn ard(variance: F, lengthscale: F) -> Rbf<F> {
        Rbf {
            ard: true,
            ..Rbf::new(variance, lengthscale)
        }
    }

    /// Signal variance
    pub fn variance(&self) -> F {
        self.variance
    }

    /// Length-scales (one value when isotropic)
    pub fn lengthscales(&self) -> &Array1<F> {
        &self.lengthscales
    }

    /// Whether length-scales are per dimension
    pub fn is_ard(&self) -> bool {
        self.ard
    }

    /// Inverse squared length-scales expanded to `dim`
    pub(crate) fn inv_sq_lengthscales(&self, dim: usize) -> Array1<F> {
        expand(&self.lengthscales, dim).mapv(|l| F::one() / (l * l))
    }
}

impl<F: Float> fmt::Display for Rbf<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Rbf(variance={}, lengthscales={})",
            self.variance, self.lengthscales
        )
    }
}

impl<F: Float> Kernel<F> for Rbf<F> {
    fn n_params(&self) -> usize {
        1 + self.lengthscales.len()
    }

    fn hyperparameters(&self) -> Array1<F> {
        let mut params = Array1::zeros(self.n_params());
        params[0] = self.variance;
        params.slice_mut(s![1..]).assign(&self.lengthscales);
        params
    }

    fn with_hyperparameters(&self, params: &ArrayView1<F>) -> Self {
        Rbf {
            variance: params[0],
            lengthscales: params.slice(s![1..]).to_owned(),
            ard: self.ard,
        }
    }

    fn bounds(&self) -> Vec<(F, F)> {
        let mut bounds = vec![cast_bounds(VARIANCE_BOUNDS)];
        bounds.extend(vec![cast_bounds(LENGTHSCALE_BOUNDS); self.lengthscales.len()]);
        bounds
    }

    fn with_input_dim(&self, dim: usize) -> Self {
        if self.ard {
            Rbf {
                lengthscales: expand(&self.lengthscales, dim),
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }

    fn cross(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let w = self.inv_sq_lengthscales(a.ncols());
        let half = F::cast(0.5);
        Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
            let r2 = a
                .row(i)
                .iter()
                .zip(b.row(j).iter())
                .zip(w.iter())
                .fold(F::zero(), |acc, ((ai, bj), wk)| {
                    acc + (*ai - *bj) * (*ai - *bj) * *wk
                });
            self.variance * (-half * r2).exp()
        })
    }

    fn diag(&self, a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::from_elem(a.nrows(), self.variance)
    }
}

/// Linear (dot product) kernel
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct Linear<F: Float> {
    variances: Array1<F>,
    ard: bool,
}

impl<F: Float> Default for Linear<F> {
    fn default() -> Linear<F> {
        Linear::new(F::one())
    }
}

impl<F: Float> Linear<F> {
    /// One variance shared by all input dimensions
    pub fn new(variance: F) -> Linear<F> {
        Linear {
            variances: Array1::from_elem(1, variance),
            ard: false,
        }
    }

    /// One variance per input dimension, set up on fit
    pub fn ard(variance: F) -> Linear<F> {
        Linear {
            ard: true,
            ..Linear::new(variance)
        }
    }

    /// Variances (one value when shared)
    pub fn variances(&self) -> &Array1<F> {
        &self.variances
    }
}

impl<F: Float> fmt::Display for Linear<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Linear(variances={})", self.variances)
    }
}

impl<F: Float> Kernel<F> for Linear<F> {
    fn n_params(&self) -> usize {
        self.variances.len()
    }

    fn hyperparameters(&self) -> Array1<F> {
        self.variances.to_owned()
    }

    fn with_hyperparameters(&self, params: &ArrayView1<F>) -> Self {
        Linear {
            variances: params.to_owned(),
            ard: self.ard,
        }
    }

    fn bounds(&self) -> Vec<(F, F)> {
        vec![cast_bounds(LINEAR_BOUNDS); self.variances.len()]
    }

    fn with_input_dim(&self, dim: usize) -> Self {
        if self.ard {
            Linear {
                variances: expand(&self.variances, dim),
                ard: true,
            }
        } else {
            self.clone()
        }
    }

    fn cross(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let v = expand(&self.variances, a.ncols());
        (a * &v).dot(&b.t())
    }

    fn diag(&self, a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        let v = expand(&self.variances, a.ncols());
        a.rows().into_iter().map(|row| (&row * &row * &v).sum()).collect()
    }
}

/// White noise kernel
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct White<F: Float> {
    variance: F,
}

impl<F: Float> Default for White<F> {
    fn default() -> White<F> {
        White::new(F::cast(0.01))
    }
}

impl<F: Float> White<F> {
    /// Constructor
    pub fn new(variance: F) -> White<F> {
        White { variance }
    }

    /// Noise variance
    pub fn variance(&self) -> F {
        self.variance
    }
}

impl<F: Float> fmt::Display for White<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "White(variance={})", self.variance)
    }
}

impl<F: Float> Kernel<F> for White<F> {
    fn n_params(&self) -> usize {
        1
    }

    fn hyperparameters(&self) -> Array1<F> {
        Array1::from_elem(1, self.variance)
    }

    fn with_hyperparameters(&self, params: &ArrayView1<F>) -> Self {
        White::new(params[0])
    }

    fn bounds(&self) -> Vec<(F, F)> {
        vec![cast_bounds(WHITE_BOUNDS)]
    }

    fn with_input_dim(&self, _dim: usize) -> Self {
        self.clone()
    }

    fn cross(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        Array2::zeros((a.nrows(), b.nrows()))
    }

    fn gram(&self, a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        Array::eye(a.nrows()) * self.variance
    }

    fn diag(&self, a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::from_elem(a.nrows(), self.variance)
    }
}

/// Sum of two kernels, hyperparameters of `lhs` come first
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Sum<K1, K2> {
    lhs: K1,
    rhs: K2,
}

impl<K1, K2> Sum<K1, K2> {
    /// Constructor
    pub fn new(lhs: K1, rhs: K2) -> Sum<K1, K2> {
        Sum { lhs, rhs }
    }

    /// First kernel
    pub fn lhs(&self) -> &K1 {
        &self.lhs
    }

    /// Second kernel
    pub fn rhs(&self) -> &K2 {
        &self.rhs
    }
}

impl<K1: fmt::Display, K2: fmt::Display> fmt::Display for Sum<K1, K2> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} + {}", self.lhs, self.rhs)
    }
}

impl<F: Float, K1: Kernel<F>, K2: Kernel<F>> Kernel<F> for Sum<K1, K2> {
    fn n_params(&self) -> usize {
        self.lhs.n_params() + self.rhs.n_params()
    }

    fn hyperparameters(&self) -> Array1<F> {
        let mut params = self.lhs.hyperparameters().to_vec();
        params.extend(self.rhs.hyperparameters().iter());
        Array1::from_vec(params)
    }

    fn with_hyperparameters(&self, params: &ArrayView1<F>) -> Self {
        let n = self.lhs.n_params();
        Sum {
            lhs: self.lhs.with_hyperparameters(&params.slice(s![..n])),
            rhs: self.rhs.with_hyperparameters(&params.slice(s![n..])),
        }
    }

    fn bounds(&self) -> Vec<(F, F)> {
        let mut bounds = self.lhs.bounds();
        bounds.extend(self.rhs.bounds());
        bounds
    }

    fn with_input_dim(&self, dim: usize) -> Self {
        Sum {
            lhs: self.lhs.with_input_dim(dim),
            rhs: self.rhs.with_input_dim(dim),
        }
    }

    fn cross(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        self.lhs.cross(a, b) + self.rhs.cross(a, b)
    }

    fn gram(&self, a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        self.lhs.gram(a) + self.rhs.gram(a)
    }

    fn diag(&self, a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        self.lhs.diag(a) + self.rhs.diag(a)
    }
}

/// RBF(ARD) + Linear(ARD) kernel
pub type RbfLinear<F> = Sum<Rbf<F>, Linear<F>>;

impl<F: Float> Default for RbfLinear<F> {
    fn default() -> RbfLinear<F> {
        Sum::new(Rbf::ard(F::one(), F::one()), Linear::ard(F::one()))
    }
}

/// RBF(ARD) + Linear(ARD) + White kernel
pub type RbfLinearWhite<F> = Sum<RbfLinear<F>, White<F>>;

impl<F: Float> Default for RbfLinearWhite<F> {
    fn default() -> RbfLinearWhite<F> {
        Sum::new(RbfLinear::default(), White::default())
    }
}
