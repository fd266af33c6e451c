//! Observation models p(y | f) and Gauss-Hermite variational expectations.

use crate::errors::{GpError, Result};
use crate::utils::into_f64;
use linfa::Float;
use linfa_linalg::eigh::*;
use ndarray::{Array1, Array2, ArrayView1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of Gauss-Hermite quadrature points
pub const GH_N_POINTS: usize = 20;

/// A trait for scalar likelihoods p(y | f) of an observation y given the latent value f
pub trait Likelihood<F: Float>: Clone + fmt::Debug + fmt::Display + Send + Sync {
    /// Number of hyperparameters
    fn n_params(&self) -> usize;

    /// Current hyperparameter values
    fn hyperparameters(&self) -> Array1<F>;

    /// A copy with the given hyperparameter values
    fn with_hyperparameters(&self, params: &ArrayView1<F>) -> Self;

    /// (lower, upper) bounds for each hyperparameter
    fn bounds(&self) -> Vec<(F, F)>;

    /// log p(y | f)
    fn log_density(&self, y: F, f: F) -> F;

    /// d log p(y | f) / df
    fn dlog_density(&self, y: F, f: F) -> F;

    /// d^2 log p(y | f) / df^2
    fn d2log_density(&self, y: F, f: F) -> F;

    /// Check parameters are valid
    fn check(&self) -> Result<()> {
        if self.hyperparameters().iter().any(|v| *v <= F::zero()) {
            return Err(GpError::InvalidValueError(format!(
                "likelihood parameters should be positive, got {}",
                self
            )));
        }
        Ok(())
    }
}

/// Gaussian likelihood N(y | f, variance)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Gaussian<F: Float> {
    variance: F,
}

impl<F: Float> Default for Gaussian<F> {
    fn default() -> Gaussian<F> {
        Gaussian::new(F::one())
    }
}

impl<F: Float> Gaussian<F> {
    /// Constructor
    pub fn new(variance: F) -> Gaussian<F> {
        Gaussian { variance }
    }

    /// Noise variance
    pub fn variance(&self) -> F {
        self.variance
    }
}

impl<F: Float> fmt::Display for Gaussian<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Gaussian(variance={})", self.variance)
    }
}

impl<F: Float> Likelihood<F> for Gaussian<F> {
    fn n_params(&self) -> usize {
        1
    }

    fn hyperparameters(&self) -> Array1<F> {
        Array1::from_elem(1, self.variance)
    }

    fn with_hyperparameters(&self, params: &ArrayView1<F>) -> Self {
        Gaussian::new(params[0])
    }

    fn bounds(&self) -> Vec<(F, F)> {
        vec![(F::cast(1e-6), F::cast(1e2))]
    }

    fn log_density(&self, y: F, f: F) -> F {
        let r = y - f;
        -F::cast(0.5) * (F::cast(2. * std::f64::consts::PI) * self.variance).ln()
            - F::cast(0.5) * r * r / self.variance
    }

    fn dlog_density(&self, y: F, f: F) -> F {
        (y - f) / self.variance
    }

    fn d2log_density(&self, _y: F, _f: F) -> F {
        -F::one() / self.variance
    }
}

/// Student-t likelihood with fixed degrees of freedom, robust to outliers
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct StudentT<F: Float> {
    deg_free: F,
    scale2: F,
}

impl<F: Float> Default for StudentT<F> {
    fn default() -> StudentT<F> {
        StudentT::new(F::cast(3.), F::cast(2.))
    }
}

impl<F: Float> StudentT<F> {
    /// Constructor given degrees of freedom and squared scale
    pub fn new(deg_free: F, scale2: F) -> StudentT<F> {
        StudentT { deg_free, scale2 }
    }

    /// Degrees of freedom (not optimized)
    pub fn deg_free(&self) -> F {
        self.deg_free
    }

    /// Squared scale
    pub fn scale2(&self) -> F {
        self.scale2
    }
}

impl<F: Float> fmt::Display for StudentT<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "StudentT(deg_free={}, scale2={})",
            self.deg_free, self.scale2
        )
    }
}

impl<F: Float> Likelihood<F> for StudentT<F> {
    fn n_params(&self) -> usize {
        1
    }

    fn hyperparameters(&self) -> Array1<F> {
        Array1::from_elem(1, self.scale2)
    }

    fn with_hyperparameters(&self, params: &ArrayView1<F>) -> Self {
        StudentT::new(self.deg_free, params[0])
    }

    fn bounds(&self) -> Vec<(F, F)> {
        vec![(F::cast(1e-6), F::cast(1e2))]
    }

    fn log_density(&self, y: F, f: F) -> F {
        let (v, s2) = (self.deg_free, self.scale2);
        let half = F::cast(0.5);
        let r = y - f;
        let lg = |x: F| F::cast(libm::lgamma(into_f64(x)));
        lg((v + F::one()) * half) - lg(v * half)
            - half * (v * F::cast(std::f64::consts::PI) * s2).ln()
            - (v + F::one()) * half * (F::one() + r * r / (v * s2)).ln()
    }

    fn dlog_density(&self, y: F, f: F) -> F {
        let (v, s2) = (self.deg_free, self.scale2);
        let r = y - f;
        (v + F::one()) * r / (v * s2 + r * r)
    }

    fn d2log_density(&self, y: F, f: F) -> F {
        let (v, s2) = (self.deg_free, self.scale2);
        let r2 = (y - f) * (y - f);
        let den = v * s2 + r2;
        (v + F::one()) * (r2 - v * s2) / (den * den)
    }

    fn check(&self) -> Result<()> {
        if self.deg_free <= F::zero() || self.scale2 <= F::zero() {
            return Err(GpError::InvalidValueError(format!(
                "Student-t degrees of freedom and scale should be positive, got {}",
                self
            )));
        }
        Ok(())
    }
}

/// Gauss-Hermite quadrature rule to compute expectations under N(mean, var)
#[derive(Clone, Debug)]
pub struct GaussHermite<F: Float> {
    nodes: Array1<F>,
    weights: Array1<F>,
}

impl<F: Float> GaussHermite<F> {
    /// Build a `n` points rule from the eigen decomposition of the Hermite Jacobi matrix
    pub fn new(n: usize) -> Result<GaussHermite<F>> {
        if n == 0 {
            return Err(GpError::InvalidValueError(
                "Gauss-Hermite rule needs at least one point".to_string(),
            ));
        }
        let mut jacobi = Array2::<F>::zeros((n, n));
        for k in 1..n {
            let b = F::cast(k as f64 / 2.).sqrt();
            jacobi[[k - 1, k]] = b;
            jacobi[[k, k - 1]] = b;
        }
        let (nodes, vectors) = jacobi.eigh_into()?;
        // sqrt(pi) * v0^2 divided by the sqrt(pi) normalization of the gaussian measure
        let weights = vectors.row(0).mapv(|v| v * v);
        Ok(GaussHermite { nodes, weights })
    }

    /// Number of quadrature points
    pub fn n_points(&self) -> usize {
        self.nodes.len()
    }

    /// E[g(f)] with f ~ N(mean, var)
    pub fn integrate(&self, mean: F, var: F, g: impl Fn(F) -> F) -> F {
        let scale = (F::cast(2.) * var.max(F::zero())).sqrt();
        self.nodes
            .iter()
            .zip(self.weights.iter())
            .fold(F::zero(), |acc, (x, w)| acc + *w * g(mean + scale * *x))
    }

    /// Returns (E[log p(y|f)], E[d log p/df], E[d^2 log p/df^2]) under q(f) = N(mean, var)
    pub fn expectations<L: Likelihood<F>>(&self, lik: &L, y: F, mean: F, var: F) -> (F, F, F) {
        let scale = (F::cast(2.) * var.max(F::zero())).sqrt();
        let mut res = (F::zero(), F::zero(), F::zero());
        for (x, w) in self.nodes.iter().zip(self.weights.iter()) {
            let f = mean + scale * *x;
            res.0 += *w * lik.log_density(y, f);
            res.1 += *w * lik.dlog_density(y, f);
            res.2 += *w * lik.d2log_density(y, f);
        }
        res
    }
}
