//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! variants behind one fit/predict interface.
//!
//! Five variants are available, each one identified by a name:
//! * `GP_RBF`: exact GP with a RBF kernel, hyperparameters maximize the marginal likelihood
//! * `SparseGP_RBF`: inducing points GP with the variational free energy (VFE) approximation
//! and a RBF + linear kernel
//! * `SGP_FITC`: inducing points GP with the fully independent training conditional (FITC)
//! approximation and a RBF kernel
//! * `SVIGP_RBF`: stochastic variational GP with a Student-t likelihood, robust to outliers,
//! trained with natural gradient steps on mini-batches
//! * `BGPLVM`: Bayesian GP latent variable model where inputs are treated as
//! gaussian distributed latent points
//!
//! All of them are used through the [`RegressionMethod`] trait implemented by [`Regressor`]:
//!
//! ```no_run
//! use gp_regression::{GpRbf, RegressionMethod};
//! use linfa::Dataset;
//! use ndarray::{Array, Axis};
//!
//! let x = Array::linspace(0., 10., 20).insert_axis(Axis(1));
//! let y = x.mapv(|v: f64| v.sin());
//!
//! let mut gp = GpRbf::<f64>::default();
//! gp.fit(&Dataset::new(x, y)).expect("GP fitted");
//! let pred = gp.predict(&ndarray::array![[2.5], [7.5]].view()).expect("GP prediction");
//! ```
//!
//! By default, inputs and labels are standardized column by column (zero mean, unit
//! variance) before training and predictions are mapped back to the labels scale.
//! Located inducing points are given in the raw input space and standardized along
//! with the inputs. Noise variances apply to the standardized labels.
//!
//! A comparison of the five variants on synthetic data is available as a runnable
//! example under `demos/`: `cargo run --release --example benchmark`.
//!
//! Implementation highlights:
//! * This library is based on [ndarray](https://github.com/rust-ndarray/ndarray)
//! and [linfa](https://github.com/rust-ml/linfa) and strive to follow [linfa guidelines](https://github.com/rust-ml/linfa/blob/master/CONTRIBUTE.md)
//! * Hyperparameters are optimized in log10 space with COBYLA multistart or L-BFGS
//! * Parameters, kernels and likelihoods can be saved and loaded using [serde](https://serde.rs/)
//! with the `serializable` feature.
//!
//! References:
//!
//! * Titsias, Michalis. [Variational learning of inducing variables in sparse Gaussian processes](https://proceedings.mlr.press/v5/titsias09a.html)
//! AISTATS (2009).
//! * Hensman, James, et al. [Gaussian processes for big data](https://arxiv.org/abs/1309.6835)
//! UAI (2013).
//! * Titsias, Michalis and Lawrence, Neil. [Bayesian Gaussian process latent variable model](https://proceedings.mlr.press/v9/titsias10a.html)
//! AISTATS (2010).
//!
#![warn(missing_docs)]
mod algorithm;
mod bgplvm_algorithm;
mod bgplvm_parameters;
mod errors;
pub mod kernels;
pub mod likelihoods;
pub mod metrics;
mod normalization;
mod optimization;
mod parameters;
mod regression;
mod sparse_algorithm;
mod sparse_parameters;
mod svgp_algorithm;
mod svgp_parameters;
mod utils;

pub use algorithm::*;
pub use bgplvm_algorithm::*;
pub use bgplvm_parameters::*;
pub use errors::*;
pub use normalization::Standardization;
pub use parameters::*;
pub use regression::*;
pub use sparse_algorithm::*;
pub use sparse_parameters::*;
pub use svgp_algorithm::*;
pub use svgp_parameters::*;
