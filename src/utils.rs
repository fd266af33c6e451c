use crate::errors::Result;
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array, Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2, Zip};
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

/// Random generator seeded from `seed` or from entropy if none
pub(crate) fn make_rng(seed: Option<u64>) -> Xoshiro256Plus {
    match seed {
        Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
        None => Xoshiro256Plus::from_entropy(),
    }
}

/// Pick `n_inducing` rows of `xt` (all rows if fewer) following a random permutation
pub(crate) fn make_inducings<F: Float>(
    n_inducing: usize,
    xt: &ArrayView2<F>,
    rng: &mut Xoshiro256Plus,
) -> Array2<F> {
    let mut indices = (0..xt.nrows()).collect::<Vec<_>>();
    indices.shuffle(rng);
    let n = n_inducing.min(xt.nrows());
    let mut z = Array2::zeros((n, xt.ncols()));
    let idx = indices[..n].to_vec();
    Zip::from(z.rows_mut())
        .and(&Array1::from_vec(idx))
        .for_each(|mut zi, i| zi.assign(&xt.row(*i)));
    z
}

/// Lower Cholesky factor of `a + jitter * I`
pub(crate) fn jittered_cholesky<F: Float>(
    a: &ArrayBase<impl Data<Elem = F>, Ix2>,
    jitter: F,
) -> Result<Array2<F>> {
    let a = a + &(Array::eye(a.nrows()) * jitter);
    Ok(a.cholesky()?)
}

/// Inverse of a lower triangular matrix
pub(crate) fn lower_inverse<F: Float>(l: &Array2<F>) -> Result<Array2<F>> {
    Ok(l.solve_triangular(&Array::eye(l.nrows()), UPLO::Lower)?)
}

/// Sum of squares by column: `diag(a^T a)`
pub(crate) fn col_sq_sum<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
    a.mapv(|v| v * v).sum_axis(Axis(0))
}

/// Sum of the log of the diagonal of a triangular factor
pub(crate) fn log_diag_sum<F: Float>(l: &Array2<F>) -> F {
    l.diag().mapv(|v| v.ln()).sum()
}

#[inline(always)]
pub(crate) fn into_f64<F: Float>(v: F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_make_inducings() {
        let xt = Array::linspace(0., 9., 10).insert_axis(Axis(1));
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let z = make_inducings(4, &xt.view(), &mut rng);
        assert_eq!(z.dim(), (4, 1));
        // all picked points are distinct training points
        let mut picked: Vec<f64> = z.iter().copied().collect();
        picked.sort_by(|a, b| a.partial_cmp(b).unwrap());
        picked.dedup();
        assert_eq!(picked.len(), 4);
        assert!(picked.iter().all(|v| xt.iter().any(|x| x == v)));

        let z = make_inducings(100, &xt.view(), &mut rng);
        assert_eq!(z.dim(), (10, 1));
    }

    #[test]
    fn test_make_inducings_seeded() {
        let xt = Array::linspace(0., 19., 20).insert_axis(Axis(1));
        let z1 = make_inducings(5, &xt.view(), &mut make_rng(Some(3)));
        let z2 = make_inducings(5, &xt.view(), &mut make_rng(Some(3)));
        assert_eq!(z1, z2);
    }

    #[test]
    fn test_lower_inverse() {
        let a = array![[4., 2.], [2., 3.]];
        let l = jittered_cholesky(&a, 0.).unwrap();
        let li = lower_inverse(&l).unwrap();
        assert_abs_diff_eq!(li.dot(&l), Array2::<f64>::eye(2), epsilon = 1e-12);
        assert_abs_diff_eq!(2. * log_diag_sum(&l), (4. * 3. - 4f64).ln(), epsilon = 1e-12);
    }
}
