//! Prediction scores and cross validation over any [`RegressionMethod`].

use crate::errors::{GpError, Result};
use crate::regression::RegressionMethod;
use linfa::prelude::{Dataset, Float};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};
use ndarray_stats::DeviationExt;

fn check_shapes<F: Float>(
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    pred: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<()> {
    if y.dim() != pred.dim() {
        return Err(GpError::DimensionMismatch {
            expected: y.len(),
            actual: pred.len(),
            context: format!("predicted shape {:?} vs {:?}", pred.dim(), y.dim()),
        });
    }
    if y.is_empty() {
        return Err(GpError::EmptyData("no value to score".to_string()));
    }
    Ok(())
}

/// Root mean squared error over all outputs
pub fn rmse<F: Float>(
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    pred: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<F> {
    check_shapes(y, pred)?;
    y.root_mean_sq_err(pred)
        .map(F::cast)
        .map_err(|e| GpError::InvalidValueError(e.to_string()))
}

/// Mean absolute error over all outputs
pub fn mae<F: Float>(
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    pred: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<F> {
    check_shapes(y, pred)?;
    y.mean_abs_err(pred)
        .map(F::cast)
        .map_err(|e| GpError::InvalidValueError(e.to_string()))
}

/// Coefficient of determination, averaged over the output columns.
///
/// Each column score is `1 - sum((y - pred)^2) / sum((y - mean(y))^2)`.
pub fn r2_score<F: Float>(
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    pred: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<F> {
    check_shapes(y, pred)?;
    let scores = y
        .columns()
        .into_iter()
        .zip(pred.columns())
        .enumerate()
        .map(|(j, (yj, pj))| {
            let mean = yj.sum() / F::cast(yj.len());
            let ss_tot = yj.mapv(|v| (v - mean) * (v - mean)).sum();
            if ss_tot <= F::zero() {
                return Err(GpError::ZeroVariance(j));
            }
            let ss_res = (&yj - &pj).mapv(|v| v * v).sum();
            Ok(F::one() - ss_res / ss_tot)
        })
        .collect::<Result<Array1<F>>>()?;
    Ok(scores.sum() / F::cast(scores.len()))
}

/// Q2 score from k-fold cross validation.
///
/// Sample `i` belongs to fold `i % kfold`. For each fold a fresh method
/// built by `make` is fitted on the other folds and predicts the held-out one,
/// the returned score is the [`r2_score`] of the gathered out-of-fold predictions.
pub fn q2_score<F, R, M>(make: M, dataset: &Dataset<F, F, Ix2>, kfold: usize) -> Result<F>
where
    F: Float,
    R: RegressionMethod<F>,
    M: Fn() -> R,
{
    let (x, y) = (dataset.records(), dataset.targets());
    let n = x.nrows();
    if kfold < 2 || kfold > n {
        return Err(GpError::InvalidValueError(format!(
            "k-fold needs 2 <= k <= {n} samples, got k = {kfold}"
        )));
    }

    let mut pred = Array2::zeros(y.raw_dim());
    for k in 0..kfold {
        let (test, train): (Vec<usize>, Vec<usize>) = (0..n).partition(|i| i % kfold == k);

        let train_ds = Dataset::new(x.select(Axis(0), &train), y.select(Axis(0), &train));
        let mut method = make();
        method.fit(&train_ds)?;
        let fold_pred = method.predict(&x.select(Axis(0), &test).view())?;
        for (row, i) in fold_pred.rows().into_iter().zip(test) {
            pred.row_mut(i).assign(&row);
        }
    }
    r2_score(y, &pred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GpParams, GpRbf};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};

    #[test]
    fn test_scores() {
        let y = array![[1., 2.], [3., 4.], [5., 6.]];
        let pred = array![[1., 3.], [3., 3.], [7., 6.]];
        // squared errors: 0, 1, 0, 1, 4, 0
        assert_abs_diff_eq!(rmse(&y, &pred).unwrap(), 1., epsilon = 1e-12);
        assert_abs_diff_eq!(mae(&y, &pred).unwrap(), 4. / 6., epsilon = 1e-12);
        // column 0: 1 - 4/8, column 1: 1 - 2/8
        assert_abs_diff_eq!(r2_score(&y, &pred).unwrap(), 0.625, epsilon = 1e-12);
        assert_abs_diff_eq!(r2_score(&y, &y).unwrap(), 1., epsilon = 1e-12);
    }

    #[test]
    fn test_scores_errors() {
        let y = array![[1.], [2.]];
        assert!(matches!(
            rmse(&y, &array![[1., 2.]]),
            Err(GpError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            r2_score(&array![[1.], [1.]], &y),
            Err(GpError::ZeroVariance(0))
        ));
    }

    #[test]
    fn test_q2_gp_rbf() {
        let x = Array::linspace(0., 4., 20).insert_axis(Axis(1));
        let y = x.mapv(|v: f64| v.sin());
        let ds = Dataset::new(x, y);
        let q2 = q2_score(|| GpRbf::<f64>::new(GpParams::default().n_start(2)), &ds, 4).unwrap();
        assert!(q2 > 0.9, "q2 = {q2}");

        assert!(q2_score(GpRbf::<f64>::default, &ds, 1).is_err());
    }
}
