//! Hyperparameter optimizers.
//!
//! Hyperparameters are optimized on a log10 scale: derivative free COBYLA with
//! multistart for marginal likelihood and sparse bounds, L-BFGS with finite
//! difference gradients for the variational ELBO.

use crate::utils::into_f64;
use argmin::core::{CostFunction, Error, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use egobox_doe::{Lhs, SamplingMethod};
use finitediff::FiniteDiff;
use linfa::Float;
use log::{debug, warn};
use ndarray::{arr1, s, Array, Array1, Array2, Zip};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;
use std::cell::RefCell;
use std::time::Instant;

/// Value returned instead of non finite objective values
const PENALTY: f64 = 1e10;

#[derive(Clone, Copy, Debug)]
pub(crate) struct CobylaParams {
    pub rhobeg: f64,
    pub ftol_rel: f64,
    pub maxeval: usize,
}

impl Default for CobylaParams {
    fn default() -> Self {
        CobylaParams {
            rhobeg: 0.5,
            ftol_rel: 1e-4,
            maxeval: 200,
        }
    }
}

impl CobylaParams {
    /// Evaluation budget scaled with the number of parameters
    pub fn with_budget(nparams: usize, max_eval: usize) -> Self {
        CobylaParams {
            maxeval: (10 * nparams).clamp(25, max_eval.max(1)),
            ..CobylaParams::default()
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct LbfgsParams {
    pub max_iters: u64,
    pub memory: usize,
}

impl Default for LbfgsParams {
    fn default() -> Self {
        LbfgsParams {
            max_iters: 1000,
            memory: 7,
        }
    }
}

/// Starting points in log10 space: the initial guess then `n_start` points spread within bounds
pub(crate) fn prepare_multistart<F: Float>(
    n_start: usize,
    theta0: &Array1<F>,
    bounds: &[(F, F)],
    rng: &mut Xoshiro256Plus,
) -> (Array2<F>, Vec<(F, F)>) {
    // Use log10 theta as optimization parameter
    let bounds: Vec<(F, F)> = bounds
        .iter()
        .map(|(lo, up)| (lo.log10(), up.log10()))
        .collect();

    let mut theta0s = Array2::zeros((n_start + 1, theta0.len()));
    theta0s.row_mut(0).assign(&theta0.mapv(|v| F::log10(v)));

    match n_start.cmp(&1) {
        std::cmp::Ordering::Equal => {
            let vals = bounds.iter().map(|(a, b)| rng.gen_range(*a..*b)).collect();
            theta0s.row_mut(1).assign(&Array::from_vec(vals))
        }
        std::cmp::Ordering::Greater => {
            let mut xlimits: Array2<F> = Array2::zeros((bounds.len(), 2));
            Zip::from(xlimits.rows_mut())
                .and(&bounds)
                .for_each(|mut row, limits| row.assign(&arr1(&[limits.0, limits.1])));
            // Seeded: starts only need to be spread over the bounds
            let seeds = Lhs::new(&xlimits)
                .kind(egobox_doe::LhsKind::Maximin)
                .with_rng(Xoshiro256Plus::seed_from_u64(42))
                .sample(n_start);
            Zip::from(theta0s.slice_mut(s![1.., ..]).rows_mut())
                .and(seeds.rows())
                .for_each(|mut theta, row| theta.assign(&row));
        }
        std::cmp::Ordering::Less => (),
    };
    (theta0s, bounds)
}

/// Hyperparameters from their log10 values, none if the optimizer gave nan values
pub(crate) fn from_log10<F: Float>(x: &[f64]) -> Option<Array1<F>> {
    if x.iter().any(|v| v.is_nan()) {
        return None;
    }
    let base: f64 = 10.;
    Some(x.iter().map(|v| F::cast(base.powf(*v))).collect())
}

/// Optimize hyperparameters given an initial guess and bounds with cobyla
pub(crate) fn optimize_params<ObjF, F>(
    objfn: ObjF,
    param0: &Array1<F>,
    bounds: &[(F, F)],
    cobyla: CobylaParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64], Option<&mut [f64]>, &mut ()) -> f64,
    F: Float,
{
    use cobyla::{minimize, Func, StopTols};

    let cons: Vec<&dyn Func<()>> = vec![];
    let param0 = param0.map(|v| into_f64(*v)).into_raw_vec();

    let bounds: Vec<_> = bounds
        .iter()
        .map(|(lo, up)| (into_f64(*lo), into_f64(*up)))
        .collect();

    match minimize(
        |x, u| objfn(x, None, u),
        &param0,
        &bounds,
        &cons,
        (),
        cobyla.maxeval,
        cobyla::RhoBeg::All(cobyla.rhobeg),
        Some(StopTols {
            ftol_rel: cobyla.ftol_rel,
            ..StopTols::default()
        }),
    ) {
        Ok((_, x_opt, fval)) => {
            let params_opt = arr1(&x_opt);
            let fval = if f64::is_nan(fval) {
                f64::INFINITY
            } else {
                fval
            };
            (fval, params_opt)
        }
        Err((status, x_opt, _)) => {
            warn!("ERROR Cobyla optimizer status={status:?}");
            (f64::INFINITY, arr1(&x_opt))
        }
    }
}

/// Run cobyla from every row of `theta0s` in parallel and return the best (fval, log10 params)
pub(crate) fn multistart_minimize<ObjF, F>(
    objfn: ObjF,
    theta0s: &Array2<F>,
    bounds: &[(F, F)],
    cobyla: CobylaParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64], Option<&mut [f64]>, &mut ()) -> f64 + Sync,
    F: Float,
{
    let now = Instant::now();
    let fallback = theta0s.row(0).mapv(into_f64);
    let opt = (0..theta0s.nrows())
        .into_par_iter()
        .map(|i| optimize_params(&objfn, &theta0s.row(i).to_owned(), bounds, cobyla))
        .reduce(
            || (f64::INFINITY, fallback.clone()),
            |a, b| if b.0 < a.0 { b } else { a },
        );
    debug!(
        "elapsed optim = {:?}ms, {} starts, best = {}",
        now.elapsed().as_millis(),
        theta0s.nrows(),
        opt.0
    );
    opt
}

fn clamp(x: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    x.iter()
        .zip(bounds.iter())
        .map(|(v, (lo, up))| v.max(*lo).min(*up))
        .collect()
}

/// Objective restricted to a box: parameters are clamped before evaluation.
/// The best evaluated point is recorded as line searches may fail near the optimum.
struct BoxedObjective<'a, O> {
    objective: O,
    bounds: Vec<(f64, f64)>,
    best: &'a RefCell<(f64, Vec<f64>)>,
}

impl<O: Fn(&[f64]) -> f64> BoxedObjective<'_, O> {
    fn value(&self, x: &[f64]) -> f64 {
        let x = clamp(x, &self.bounds);
        let fval = (self.objective)(&x);
        let fval = if fval.is_finite() { fval } else { PENALTY };
        let mut best = self.best.borrow_mut();
        if fval < best.0 {
            *best = (fval, x);
        }
        fval
    }
}

impl<O: Fn(&[f64]) -> f64> CostFunction for BoxedObjective<'_, O> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> std::result::Result<Self::Output, Error> {
        Ok(self.value(p))
    }
}

impl<O: Fn(&[f64]) -> f64> Gradient for BoxedObjective<'_, O> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, p: &Self::Param) -> std::result::Result<Self::Gradient, Error> {
        Ok(p.central_diff(&|x| self.value(x)))
    }
}

/// Minimize `objective` from `x0` within `bounds` with L-BFGS, returns (fval, x_opt).
///
/// The best point evaluated is returned, even when the solver stops on error.
pub(crate) fn lbfgs_minimize<O>(
    objective: O,
    x0: &[f64],
    bounds: &[(f64, f64)],
    params: LbfgsParams,
) -> (f64, Vec<f64>)
where
    O: Fn(&[f64]) -> f64,
{
    let now = Instant::now();
    let x0 = clamp(x0, bounds);
    let best = RefCell::new((f64::INFINITY, x0.clone()));
    let problem = BoxedObjective {
        objective,
        bounds: bounds.to_vec(),
        best: &best,
    };
    problem.value(&x0);

    let linesearch: MoreThuenteLineSearch<Vec<f64>, Vec<f64>, f64> = MoreThuenteLineSearch::new();
    let solver: LBFGS<_, Vec<f64>, Vec<f64>, f64> = LBFGS::new(linesearch, params.memory);
    match Executor::new(problem, solver)
        .configure(|state| state.param(x0).max_iters(params.max_iters))
        .run()
    {
        Ok(res) => debug!("L-BFGS stopped after {} iterations", res.state().get_iter()),
        Err(err) => warn!("L-BFGS optimizer stopped: {err}"),
    }
    let (fval, x_opt) = best.into_inner();
    debug!(
        "elapsed L-BFGS = {:?}ms, best = {}",
        now.elapsed().as_millis(),
        fval
    );
    (fval, x_opt)
}
