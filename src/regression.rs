//! Common regression interface over the gaussian process variants.
//!
//! A [`Regressor`] standardizes training inputs and labels, hands the normalized
//! data to the variant training routine ([`GpMethod::train`]) and maps predictions
//! of the fitted model ([`GpModel`]) back to the label space.

use crate::errors::{GpError, Result};
use crate::kernels::{Rbf, RbfLinear, RbfLinearWhite};
use crate::likelihoods::StudentT;
use crate::normalization::{NormalizedData, Standardization};
use crate::{BgplvmParams, GpParams, SgpParams, SvgpParams};

use linfa::prelude::{Dataset, Float};
use log::info;
use ndarray::{Array2, ArrayView2, Ix2};
use std::fmt;
use std::time::Instant;

/// A fitted gaussian process model working on normalized data
pub trait GpModel<F: Float>: fmt::Display + fmt::Debug + Clone {
    /// Predict (n, ny) output values at the given (n, nx) inputs
    fn predict(&self, x: &ArrayView2<F>) -> Result<Array2<F>>;

    /// Predict (n, ny) latent variances at the given (n, nx) inputs
    fn predict_var(&self, x: &ArrayView2<F>) -> Result<Array2<F>>;

    /// Input dimension the model was trained with
    fn input_dim(&self) -> usize;

    /// Output dimension the model was trained with
    fn output_dim(&self) -> usize;
}

/// A gaussian process variant: its parameters and how to train them
pub trait GpMethod<F: Float>: Clone {
    /// Fitted model type
    type Model: GpModel<F>;

    /// Variant identifier
    fn name(&self) -> &'static str;

    /// Train the variant on the given dataset
    fn train(&self, dataset: &Dataset<F, F, Ix2>) -> Result<Self::Model>;

    /// Parameters expressed in the space of inputs standardized with `input_stats`.
    ///
    /// Values given in the raw input space (e.g. located inducing points) are mapped
    /// before training on normalized data.
    fn normalized(&self, _input_stats: &Standardization<F>) -> Result<Self> {
        Ok(self.clone())
    }
}

/// Regression method interface, object safe to handle heterogeneous variants
pub trait RegressionMethod<F: Float> {
    /// Variant identifier
    fn name(&self) -> &'static str;

    /// Fit the method on (n, nx) inputs and (n, ny) labels.
    ///
    /// On error, the previously fitted state (if any) is kept.
    fn fit(&mut self, dataset: &Dataset<F, F, Ix2>) -> Result<bool>;

    /// Predict (n, ny) labels at (n, nx) inputs
    fn predict(&self, x: &ArrayView2<F>) -> Result<Array2<F>>;
}

#[derive(Debug, Clone)]
struct Fitted<F: Float, G> {
    /// (inputs, labels) statistics, none when preprocessing is disabled
    scalers: Option<(Standardization<F>, Standardization<F>)>,
    model: G,
}

/// Gaussian process regressor handling data standardization around a [`GpMethod`]
#[derive(Debug, Clone)]
pub struct Regressor<F: Float, M: GpMethod<F>> {
    method: M,
    preprocess: bool,
    fitted: Option<Fitted<F, M::Model>>,
}

/// Exact GP with an isotropic RBF kernel
pub type GpRbf<F = f64> = Regressor<F, GpParams<F, Rbf<F>>>;
/// Sparse GP, VFE approximation with an RBF + Linear kernel
pub type SparseGpRbf<F = f64> = Regressor<F, SgpParams<F, RbfLinear<F>>>;
/// Stochastic variational GP with Student-t likelihood
pub type SvigpRbf<F = f64> = Regressor<F, SvgpParams<F, RbfLinearWhite<F>, StudentT<F>>>;
/// Bayesian GPLVM regressor
pub type Bgplvm<F = f64> = Regressor<F, BgplvmParams<F>>;
/// Sparse GP, FITC approximation with an RBF ARD kernel
pub type SgpFitc<F = f64> = Regressor<F, SgpParams<F, Rbf<F>>>;

impl<F: Float, M: GpMethod<F> + Default> Default for Regressor<F, M> {
    fn default() -> Self {
        Regressor::new(M::default())
    }
}

impl<F: Float, M: GpMethod<F>> Regressor<F, M> {
    /// Regressor with the given variant parameters, preprocessing enabled.
    ///
    /// Inducing point locations are given in the raw input space. Noise variances
    /// (see [`VarianceConfig`](crate::VarianceConfig)) apply to the labels seen by the
    /// variant, standardized ones when preprocessing is enabled.
    pub fn new(method: M) -> Self {
        Regressor {
            method,
            preprocess: true,
            fitted: None,
        }
    }

    /// Enable or disable inputs and labels standardization
    pub fn preprocessing(mut self, preprocess: bool) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// Variant parameters
    pub fn params(&self) -> &M {
        &self.method
    }

    /// Whether `fit` succeeded at least once
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fitted model, none before fit
    pub fn model(&self) -> Option<&M::Model> {
        self.fitted.as_ref().map(|f| &f.model)
    }

    /// Training inputs statistics, none before fit or without preprocessing
    pub fn input_stats(&self) -> Option<&Standardization<F>> {
        self.scalers().map(|s| &s.0)
    }

    /// Training labels statistics, none before fit or without preprocessing
    pub fn label_stats(&self) -> Option<&Standardization<F>> {
        self.scalers().map(|s| &s.1)
    }

    fn scalers(&self) -> Option<&(Standardization<F>, Standardization<F>)> {
        self.fitted.as_ref().and_then(|f| f.scalers.as_ref())
    }

    fn fitted(&self, x: &ArrayView2<F>) -> Result<&Fitted<F, M::Model>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| {
            GpError::NotFitted(format!("{} should be fitted before predict", self.method.name()))
        })?;
        if x.ncols() != fitted.model.input_dim() {
            return Err(GpError::DimensionMismatch {
                expected: fitted.model.input_dim(),
                actual: x.ncols(),
                context: "number of input columns".to_string(),
            });
        }
        Ok(fitted)
    }

    /// Predict (n, ny) latent variances in the labels scale
    pub fn predict_var(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        let fitted = self.fitted(x)?;
        match &fitted.scalers {
            Some((xs, ys)) => {
                let var = fitted.model.predict_var(&xs.normalize(x)?.view())?;
                Ok(var * &ys.std.mapv(|s| s * s))
            }
            None => fitted.model.predict_var(x),
        }
    }
}

impl<F: Float, M: GpMethod<F>> RegressionMethod<F> for Regressor<F, M> {
    fn name(&self) -> &'static str {
        self.method.name()
    }

    fn fit(&mut self, dataset: &Dataset<F, F, Ix2>) -> Result<bool> {
        let (xtrain, ytrain) = (dataset.records(), dataset.targets());
        if xtrain.nrows() == 0 {
            return Err(GpError::EmptyData(format!(
                "{} training data has no sample",
                self.name()
            )));
        }
        if xtrain.nrows() != ytrain.nrows() {
            return Err(GpError::DimensionMismatch {
                expected: xtrain.nrows(),
                actual: ytrain.nrows(),
                context: "number of training labels".to_string(),
            });
        }
        info!(
            "{}: fit on {} samples ({} inputs, {} outputs)",
            self.name(),
            xtrain.nrows(),
            xtrain.ncols(),
            ytrain.ncols()
        );
        let now = Instant::now();

        let fitted = if self.preprocess {
            let xnorm = NormalizedData::new(xtrain)?;
            let ynorm = NormalizedData::new(ytrain)?;
            let method = self.method.normalized(&xnorm.stats)?;
            let model = method.train(&Dataset::new(xnorm.data, ynorm.data))?;
            Fitted {
                scalers: Some((xnorm.stats, ynorm.stats)),
                model,
            }
        } else {
            Fitted {
                scalers: None,
                model: self.method.train(dataset)?,
            }
        };
        info!(
            "{}: fitted in {}ms, {}",
            self.name(),
            now.elapsed().as_millis(),
            fitted.model
        );
        self.fitted = Some(fitted);
        Ok(true)
    }

    fn predict(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        let fitted = self.fitted(x)?;
        match &fitted.scalers {
            Some((xs, ys)) => {
                let pred = fitted.model.predict(&xs.normalize(x)?.view())?;
                ys.denormalize(&pred)
            }
            None => fitted.model.predict(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Inducings, VarianceConfig};
    use approx::assert_abs_diff_eq;
    use linfa::ParamGuard;
    use ndarray::{array, concatenate, Array, Array1, Axis};

    /// Model predicting the mean of the labels it was trained on
    #[derive(Debug, Clone)]
    struct MeanModel {
        x_seen: Array2<f64>,
        y_mean: Array1<f64>,
    }

    impl fmt::Display for MeanModel {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "Mean")
        }
    }

    impl GpModel<f64> for MeanModel {
        fn predict(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>> {
            Ok(Array2::from_shape_fn((x.nrows(), self.y_mean.len()), |(_, j)| {
                self.y_mean[j]
            }))
        }

        fn predict_var(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>> {
            Ok(Array2::ones((x.nrows(), self.y_mean.len())))
        }

        fn input_dim(&self) -> usize {
            self.x_seen.ncols()
        }

        fn output_dim(&self) -> usize {
            self.y_mean.len()
        }
    }

    #[derive(Debug, Clone, Default)]
    struct MeanMethod;

    impl GpMethod<f64> for MeanMethod {
        type Model = MeanModel;

        fn name(&self) -> &'static str {
            "MEAN"
        }

        fn train(&self, dataset: &Dataset<f64, f64, Ix2>) -> Result<MeanModel> {
            Ok(MeanModel {
                x_seen: dataset.records().to_owned(),
                y_mean: dataset.targets().mean_axis(Axis(0)).unwrap(),
            })
        }
    }

    fn mean_data() -> Dataset<f64, f64, Ix2> {
        let x = array![[1., 10.], [2., 30.], [3., 20.], [6., 40.]];
        let y = array![[5., -1.], [7., -3.], [9., -2.], [11., -6.]];
        Dataset::new(x, y)
    }

    #[test]
    fn test_stats_match_raw_data() {
        let ds = mean_data();
        let mut reg = Regressor::new(MeanMethod);
        assert!(reg.fit(&ds).unwrap());

        let xs = reg.input_stats().unwrap();
        assert_abs_diff_eq!(xs.mean, array![3., 25.], epsilon = 1e-12);
        assert_abs_diff_eq!(xs.std, array![3.5f64.sqrt(), 125f64.sqrt()], epsilon = 1e-12);
        let ys = reg.label_stats().unwrap();
        assert_abs_diff_eq!(ys.mean, array![8., -3.], epsilon = 1e-12);
        assert_abs_diff_eq!(ys.std, array![5f64.sqrt(), 3.5f64.sqrt()], epsilon = 1e-12);

        // the model sees standardized inputs
        let seen = &reg.model().unwrap().x_seen;
        assert_abs_diff_eq!(seen.mean_axis(Axis(0)).unwrap(), array![0., 0.], epsilon = 1e-12);
        assert_abs_diff_eq!(seen.std_axis(Axis(0), 0.), array![1., 1.], epsilon = 1e-12);

        // zero mean normalized predictions are mapped back to the labels mean
        let pred = reg.predict(&array![[0., 0.], [100., 100.]].view()).unwrap();
        assert_abs_diff_eq!(pred, array![[8., -3.], [8., -3.]], epsilon = 1e-12);
        let var = reg.predict_var(&array![[0., 0.]].view()).unwrap();
        assert_abs_diff_eq!(var, array![[5., 3.5]], epsilon = 1e-12);
    }

    #[test]
    fn test_preprocessing_disabled_is_identity() {
        let ds = mean_data();
        let mut reg = Regressor::new(MeanMethod).preprocessing(false);
        reg.fit(&ds).unwrap();
        assert!(reg.input_stats().is_none());
        assert!(reg.label_stats().is_none());
        assert_eq!(&reg.model().unwrap().x_seen, ds.records());
        let pred = reg.predict(&array![[0., 0.]].view()).unwrap();
        assert_abs_diff_eq!(pred, array![[8., -3.]], epsilon = 1e-12);
    }

    #[test]
    fn test_predict_errors() {
        let reg = Regressor::new(MeanMethod);
        assert!(matches!(
            reg.predict(&array![[0., 0.]].view()),
            Err(GpError::NotFitted(_))
        ));

        let mut reg = Regressor::new(MeanMethod);
        reg.fit(&mean_data()).unwrap();
        assert!(matches!(
            reg.predict(&array![[0., 0., 1.]].view()),
            Err(GpError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_fit_errors_keep_previous_state() {
        let mut reg = Regressor::new(MeanMethod);
        reg.fit(&mean_data()).unwrap();
        let before = reg.input_stats().unwrap().clone();

        let empty = Dataset::new(Array2::<f64>::zeros((0, 2)), Array2::<f64>::zeros((0, 1)));
        assert!(matches!(reg.fit(&empty), Err(GpError::EmptyData(_))));

        let constant = Dataset::new(array![[1., 1.], [1., 2.]], array![[0.], [1.]]);
        assert!(matches!(reg.fit(&constant), Err(GpError::ZeroVariance(0))));

        assert!(reg.is_fitted());
        assert_eq!(reg.input_stats().unwrap(), &before);
        assert_eq!(reg.model().unwrap().output_dim(), 2);
    }

    #[test]
    fn test_refit_replaces_state() {
        let mut reg = Regressor::new(MeanMethod);
        reg.fit(&mean_data()).unwrap();
        let x = array![[0.], [2.], [4.]];
        let y = array![[1.], [2.], [6.]];
        reg.fit(&Dataset::new(x, y)).unwrap();
        assert_abs_diff_eq!(reg.input_stats().unwrap().mean, array![2.], epsilon = 1e-12);
        assert_abs_diff_eq!(reg.label_stats().unwrap().mean, array![3.], epsilon = 1e-12);
        assert_eq!(reg.model().unwrap().input_dim(), 1);
        let pred = reg.predict(&array![[1.]].view()).unwrap();
        assert_abs_diff_eq!(pred, array![[3.]], epsilon = 1e-12);
    }

    #[test]
    fn test_gp_rbf_linear_data() {
        let x = Array::linspace(0., 9., 10).insert_axis(Axis(1));
        let noise = Array::from_shape_fn((10, 1), |(i, _)| 0.01 * (7. * i as f64).sin());
        let y = x.mapv(|v| 2. * v + 1.) + noise;

        let mut gp = GpRbf::<f64>::default();
        assert!(gp.fit(&Dataset::new(x, y)).unwrap());
        let xtest = array![[0.5], [4.5], [8.5]];
        let pred = gp.predict(&xtest.view()).unwrap();
        assert_abs_diff_eq!(pred, xtest.mapv(|v| 2. * v + 1.), epsilon = 0.2);
        let var = gp.predict_var(&xtest.view()).unwrap();
        assert!(var.iter().all(|v| *v >= 0.));
    }

    #[test]
    fn test_located_inducings_follow_input_normalization() {
        let x = Array::linspace(100f64, 110., 40).insert_axis(Axis(1));
        let y = x.mapv(|v| (v - 105.).sin());
        let ds = Dataset::new(x, y);
        let z = Array::linspace(100., 110., 10).insert_axis(Axis(1));

        let mut fitc = SgpFitc::<f64>::new(SgpParams::new(
            Rbf::ard(1., 1.),
            Inducings::Located(z.clone()),
        ));
        assert!(fitc.fit(&ds).unwrap());
        let znorm = fitc.input_stats().unwrap().normalize(&z).unwrap();
        assert_abs_diff_eq!(fitc.model().unwrap().inducings(), &znorm, epsilon = 1e-12);
        // user given locations are left untouched in the parameters
        assert_eq!(
            fitc.params().check_ref().unwrap().inducings(),
            &Inducings::Located(z.clone())
        );

        let xtest = array![[101.5], [104.2], [108.7]];
        let pred = fitc.predict(&xtest.view()).unwrap();
        assert_abs_diff_eq!(pred, xtest.mapv(|v| (v - 105.).sin()), epsilon = 0.25);

        let mut bgplvm = Bgplvm::<f64>::new(
            BgplvmParams::default().inducings(Inducings::Located(z.clone())),
        );
        bgplvm.fit(&ds).unwrap();
        assert_abs_diff_eq!(bgplvm.model().unwrap().inducings(), &znorm, epsilon = 1e-12);

        let mut svgp = SvigpRbf::<f64>::new(
            SvgpParams::default()
                .inducings(Inducings::Located(z.clone()))
                .n_rounds(1)
                .natgrad_iters(5)
                .max_iters(5)
                .seed(Some(0)),
        );
        svgp.fit(&ds).unwrap();
        assert_abs_diff_eq!(svgp.model().unwrap().inducings(), &znorm, epsilon = 1e-12);

        // without preprocessing, locations are used as given
        let mut raw = SgpFitc::<f64>::new(SgpParams::new(
            Rbf::ard(1., 1.),
            Inducings::Located(z.clone()),
        ))
        .preprocessing(false);
        raw.fit(&ds).unwrap();
        assert_eq!(raw.model().unwrap().inducings(), &z);
    }

    #[test]
    fn test_located_inducings_wrong_dim_keeps_state() {
        let ds = mean_data();
        let mut fitc = SgpFitc::<f64>::new(
            SgpParams::default()
                .inducings(Inducings::Located(array![[1.], [2.]]))
                .n_start(0),
        );
        assert!(matches!(
            fitc.fit(&ds),
            Err(GpError::DimensionMismatch { .. })
        ));
        assert!(!fitc.is_fitted());
    }

    #[test]
    fn test_noise_values_apply_to_standardized_labels() {
        let x = Array::linspace(0f64, 9., 10).insert_axis(Axis(1));
        let y = x.mapv(|v| 100. * (0.5 * v).sin());
        let ds = Dataset::new(x, y);
        let params = GpParams::default()
            .noise_variance(VarianceConfig::Constant(0.05))
            .n_start(1);

        let mut gp = GpRbf::<f64>::new(params.clone());
        gp.fit(&ds).unwrap();
        assert_eq!(gp.model().unwrap().noise(), 0.05);
        let ystd = gp.label_stats().unwrap().std[0];
        assert!(ystd > 50.);
        // latent variance in labels units is the normalized one scaled by std_y^2
        let xtest = array![[2.5]];
        let var = gp.predict_var(&xtest.view()).unwrap();
        let xnorm = gp.input_stats().unwrap().normalize(&xtest).unwrap();
        let var_norm = gp.model().unwrap().predict_var(&xnorm).unwrap();
        assert_abs_diff_eq!(var, var_norm * ystd * ystd, epsilon = 1e-8);

        let mut raw = GpRbf::<f64>::new(params).preprocessing(false);
        raw.fit(&ds).unwrap();
        assert_eq!(raw.model().unwrap().noise(), 0.05);
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(GpRbf::<f64>::default().name(), "GP_RBF");
        assert_eq!(SparseGpRbf::<f64>::default().name(), "SparseGP_RBF");
        assert_eq!(SvigpRbf::<f64>::default().name(), "SVIGP_RBF");
        assert_eq!(Bgplvm::<f64>::default().name(), "BGPLVM");
        assert_eq!(SgpFitc::<f64>::default().name(), "SGP_FITC");
    }

    #[test]
    fn test_heterogeneous_methods() {
        let x = Array::linspace(-1f64, 1., 30).insert_axis(Axis(1));
        let y = concatenate![Axis(1), x.mapv(|v| v * v), x.mapv(|v| v.sin())];
        let ds = Dataset::new(x, y);
        let mut methods: Vec<Box<dyn RegressionMethod<f64>>> = vec![
            Box::new(GpRbf::<f64>::new(GpParams::default().n_start(2))),
            Box::new(SparseGpRbf::<f64>::new(SgpParams::default().n_inducings(10).seed(Some(0)))),
            Box::new(SgpFitc::<f64>::new(SgpParams::default().n_inducings(10).seed(Some(0)))),
            Box::new(Bgplvm::<f64>::new(BgplvmParams::default().n_inducings(10).seed(Some(0)))),
            Box::new(SvigpRbf::<f64>::new(
                SvgpParams::default()
                    .n_inducings(10)
                    .n_rounds(2)
                    .natgrad_iters(20)
                    .max_iters(20)
                    .seed(Some(0)),
            )),
        ];
        let xtest = array![[-0.5], [0.25]];
        for method in methods.iter_mut() {
            assert!(method.fit(&ds).unwrap(), "{} fit", method.name());
            let pred = method.predict(&xtest.view()).unwrap();
            assert_eq!(pred.dim(), (2, 2), "{}", method.name());
            assert!(pred.iter().all(|v| v.is_finite()), "{}", method.name());
        }
    }
}
