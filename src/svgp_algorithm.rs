//! Stochastic variational gaussian process.
//!
//! The variational distribution over inducing outputs `q(u) = N(m, S)` (one per output column,
//! `S = L_S L_S^T`) is learnt with natural gradient steps on mini-batches, then kernel and
//! likelihood hyperparameters maximize the full data evidence lower bound (ELBO) with `q(u)`
//! held fixed, and `q(u)` is finally refreshed for the optimized hyperparameters.
//!
//! Expectations of non gaussian likelihoods are computed with Gauss-Hermite quadrature.
//!
//! # Reference
//!
//! Hensman, J., Fusi, N., Lawrence, N. D.
//! [Gaussian Processes for Big Data](https://arxiv.org/abs/1309.6835), UAI 2013.
//!
//! Salimbeni, H., Eleftheriadis, S., Hensman, J.
//! [Natural Gradients in Practice](https://arxiv.org/abs/1803.09151), AISTATS 2018.

use crate::algorithm::check_training_data;
use crate::errors::{GpError, Result};
use crate::kernels::{Kernel, RbfLinearWhite};
use crate::likelihoods::{GaussHermite, Likelihood, StudentT};
use crate::optimization::{from_log10, lbfgs_minimize, LbfgsParams};
use crate::normalization::Standardization;
use crate::regression::{GpMethod, GpModel};
use crate::svgp_parameters::{SvgpParams, SvgpValidParams};
use crate::utils::{col_sq_sum, into_f64, jittered_cholesky, log_diag_sum, lower_inverse, make_rng};

use linfa::prelude::{Dataset, DatasetBase, Fit, Float};
use linfa::ParamGuard;
use linfa_linalg::triangular::*;
use log::debug;
use ndarray::{s, Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2, Zip};
use ndarray_rand::rand::seq::index;
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Gaussian variational distribution of the inducing outputs, one column per output
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub(crate) struct VariationalPosterior<F: Float> {
    /// (M, p) means
    q_mu: Array2<F>,
    /// Lower cholesky factors of the (M, M) covariances
    q_sqrt: Vec<Array2<F>>,
}

impl<F: Float> VariationalPosterior<F> {
    /// q(u) = p(u) = N(0, Kmm) for each output
    fn prior(lm: &Array2<F>, n_outputs: usize) -> Self {
        VariationalPosterior {
            q_mu: Array2::zeros((lm.nrows(), n_outputs)),
            q_sqrt: vec![lm.to_owned(); n_outputs],
        }
    }
}

/// Covariance quantities of the inducing points shared by all outputs
struct InducingConditional<F: Float> {
    /// cholesky of Kmm
    lm: Array2<F>,
    /// Lm^-1 Kmb
    a: Array2<F>,
    /// Kmm^-1 Kmb
    bm: Array2<F>,
    /// diag(Kbb)
    kdiag: Array1<F>,
}

impl<F: Float> InducingConditional<F> {
    fn new<K: Kernel<F>>(
        kernel: &K,
        z: &Array2<F>,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        nugget: F,
    ) -> Result<Self> {
        let lm = jittered_cholesky(&kernel.gram(z), nugget)?;
        let a = lm.solve_triangular(&kernel.cross(z, x), UPLO::Lower)?;
        let bm = lm.t().solve_triangular(&a, UPLO::Upper)?;
        Ok(InducingConditional {
            lm,
            a,
            bm,
            kdiag: kernel.diag(x),
        })
    }

    /// Marginals of q(f) at the conditioning points for output `j`
    fn marginals(&self, q: &VariationalPosterior<F>, j: usize) -> (Array1<F>, Array1<F>) {
        let mean = self.bm.t().dot(&q.q_mu.column(j));
        let var = &self.kdiag - &col_sq_sum(&self.a) + col_sq_sum(&q.q_sqrt[j].t().dot(&self.bm));
        (mean, var.mapv(|v| v.max(F::cast(1e-12))))
    }
}

/// Stochastic variational gaussian process with a general likelihood `L`
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize, L: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>, L: Deserialize<'de>"
    ))
)]
pub struct StochasticVariationalGp<F: Float, K: Kernel<F>, L: Likelihood<F>> {
    kernel: K,
    likelihood: L,
    /// Evidence lower bound on the training data
    elbo: F,
    /// Jitter added to Kmm
    nugget: F,
    /// Inducing points
    inducings: Array2<F>,
    q: VariationalPosterior<F>,
}

/// SVGP with RBF + Linear + White kernel and Student-t likelihood
pub type StudentTSvgp<F> = StochasticVariationalGp<F, RbfLinearWhite<F>, StudentT<F>>;

impl<F: Float> StudentTSvgp<F> {
    /// Default parameters
    pub fn params() -> SvgpParams<F, RbfLinearWhite<F>, StudentT<F>> {
        SvgpParams::default()
    }
}

impl<F: Float, K: Kernel<F>, L: Likelihood<F>> fmt::Display for StochasticVariationalGp<F, K, L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SVGP(kernel={}, likelihood={}, elbo={})",
            self.kernel, self.likelihood, self.elbo
        )
    }
}

impl<F: Float, K: Kernel<F>, L: Likelihood<F>> StochasticVariationalGp<F, K, L> {
    /// SVGP parameters constructor
    pub fn params_with(kernel: K, likelihood: L) -> SvgpParams<F, K, L> {
        SvgpParams::new(kernel, likelihood)
    }

    fn check_input_dim(&self, ncols: usize) -> Result<()> {
        if ncols != self.input_dim() {
            return Err(GpError::DimensionMismatch {
                expected: self.input_dim(),
                actual: ncols,
                context: "SVGP input dimension".to_string(),
            });
        }
        Ok(())
    }

    /// Predict latent mean values at n given `x` points specified as a (n, nx) matrix.
    /// The likelihood is not applied. Returns (n, ny) values.
    pub fn predict_values(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_input_dim(x.ncols())?;
        let cond = InducingConditional::new(&self.kernel, &self.inducings, x, self.nugget)?;
        Ok(cond.bm.t().dot(&self.q.q_mu))
    }

    /// Predict latent variances at n given `x` points specified as a (n, nx) matrix.
    /// Returns (n, ny) variances.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_input_dim(x.ncols())?;
        let cond = InducingConditional::new(&self.kernel, &self.inducings, x, self.nugget)?;
        let mut var = Array2::zeros((x.nrows(), self.output_dim()));
        for (j, mut col) in var.columns_mut().into_iter().enumerate() {
            col.assign(&cond.marginals(&self.q, j).1);
        }
        Ok(var)
    }

    /// Optimized kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Optimized likelihood
    pub fn likelihood(&self) -> &L {
        &self.likelihood
    }

    /// Evidence lower bound reached on the training data
    pub fn elbo(&self) -> F {
        self.elbo
    }

    /// Inducing points
    pub fn inducings(&self) -> &Array2<F> {
        &self.inducings
    }

    /// Means of the inducing outputs variational distribution, (M, ny)
    pub fn q_mu(&self) -> &Array2<F> {
        &self.q.q_mu
    }

    /// Retrieve input dimension
    pub fn input_dim(&self) -> usize {
        self.inducings.ncols()
    }

    /// Retrieve output dimension
    pub fn output_dim(&self) -> usize {
        self.q.q_mu.ncols()
    }
}

impl<F: Float, K: Kernel<F>, L: Likelihood<F>> SvgpValidParams<F, K, L> {
    /// One natural gradient step on q(u) using the given mini-batch,
    /// `scale` is the ratio between training set size and batch size.
    #[allow(clippy::too_many_arguments)]
    fn natgrad_step(
        &self,
        kernel: &K,
        lik: &L,
        gh: &GaussHermite<F>,
        z: &Array2<F>,
        xb: &ArrayView2<F>,
        yb: &ArrayView2<F>,
        scale: F,
        q: &mut VariationalPosterior<F>,
    ) -> Result<()> {
        let cond = InducingConditional::new(kernel, z, xb, self.nugget())?;
        let lmi = lower_inverse(&cond.lm)?;
        let kmm_inv = lmi.t().dot(&lmi);
        let rho = self.learning_rate();
        let two = F::cast(2.);

        for j in 0..yb.ncols() {
            let (mean, var) = cond.marginals(q, j);
            let mut gm = Array1::zeros(mean.len());
            let mut gv = Array1::zeros(mean.len());
            Zip::from(&mut gm)
                .and(&mut gv)
                .and(yb.column(j))
                .and(&mean)
                .and(&var)
                .for_each(|gm, gv, y, mu, s2| {
                    let (_, d1, d2) = gh.expectations(lik, *y, *mu, *s2);
                    *gm = d1;
                    *gv = (F::cast(0.5) * d2).min(F::zero());
                });

            let lsi = lower_inverse(&q.q_sqrt[j])?;
            let s_inv = lsi.t().dot(&lsi);
            let s_inv_m = s_inv.dot(&q.q_mu.column(j));

            let weighted = &cond.bm * &gv.mapv(|v| -two * v * scale).insert_axis(Axis(0));
            let target_prec = &kmm_inv + &weighted.dot(&cond.bm.t());
            let target_lin = cond.bm.dot(&((&gm - &(&gv * &mean * two)) * scale));

            let prec = s_inv.mapv(|v| (F::one() - rho) * v) + target_prec.mapv(|v| rho * v);
            let lin = s_inv_m.mapv(|v| (F::one() - rho) * v) + target_lin.mapv(|v| rho * v);

            // S = P^-1 and m = S lin
            let lp = jittered_cholesky(&prec, F::zero())?;
            let lpi = lower_inverse(&lp)?;
            let s = lpi.t().dot(&lpi);
            q.q_mu.column_mut(j).assign(&s.dot(&lin));
            q.q_sqrt[j] = jittered_cholesky(&s, self.nugget())?;
        }
        Ok(())
    }

    /// Runs `n_iters` natural gradient steps on random mini-batches
    #[allow(clippy::too_many_arguments)]
    fn natgrad_round(
        &self,
        kernel: &K,
        lik: &L,
        gh: &GaussHermite<F>,
        z: &Array2<F>,
        xtrain: &Array2<F>,
        ytrain: &Array2<F>,
        n_iters: usize,
        q: &mut VariationalPosterior<F>,
        rng: &mut Xoshiro256Plus,
    ) -> Result<()> {
        let n = xtrain.nrows();
        let batch_size = self.batch_size().unwrap_or(n).min(n);
        let scale = F::cast(n) / F::cast(batch_size);
        for _ in 0..n_iters {
            if batch_size == n {
                self.natgrad_step(
                    kernel,
                    lik,
                    gh,
                    z,
                    &xtrain.view(),
                    &ytrain.view(),
                    scale,
                    q,
                )?;
            } else {
                let idx = index::sample(rng, n, batch_size).into_vec();
                let xb = xtrain.select(Axis(0), &idx);
                let yb = ytrain.select(Axis(0), &idx);
                self.natgrad_step(kernel, lik, gh, z, &xb.view(), &yb.view(), scale, q)?;
            }
        }
        Ok(())
    }
}

/// Evidence lower bound: expected log likelihood of the data minus KL(q(u) || p(u))
pub(crate) fn elbo<F: Float, K: Kernel<F>, L: Likelihood<F>>(
    kernel: &K,
    lik: &L,
    gh: &GaussHermite<F>,
    z: &Array2<F>,
    xtrain: &ArrayView2<F>,
    ytrain: &ArrayView2<F>,
    q: &VariationalPosterior<F>,
    nugget: F,
) -> Result<F> {
    let cond = InducingConditional::new(kernel, z, xtrain, nugget)?;
    let half = F::cast(0.5);
    let nz = F::cast(z.nrows());
    let mut res = F::zero();
    for j in 0..ytrain.ncols() {
        let (mean, var) = cond.marginals(q, j);
        let ell = Zip::from(ytrain.column(j))
            .and(&mean)
            .and(&var)
            .fold(F::zero(), |acc, y, mu, s2| {
                acc + gh.expectations(lik, *y, *mu, *s2).0
            });

        let lmi_ls = cond.lm.solve_triangular(&q.q_sqrt[j], UPLO::Lower)?;
        let lmi_m = cond
            .lm
            .solve_triangular(&q.q_mu.slice(s![.., j..j + 1]), UPLO::Lower)?;
        let kl = half
            * (lmi_ls.mapv(|v| v * v).sum() + lmi_m.mapv(|v| v * v).sum() - nz
                + F::cast(2.) * log_diag_sum(&cond.lm)
                - F::cast(2.) * log_diag_sum(&q.q_sqrt[j]));
        res += ell - kl;
    }
    Ok(res)
}

impl<F: Float, K: Kernel<F>, L: Likelihood<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError> for SvgpValidParams<F, K, L>
{
    type Object = StochasticVariationalGp<F, K, L>;

    /// Fit q(u) with natural gradients and hyperparameters by ELBO maximization
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let xtrain = dataset.records().to_owned();
        let ytrain = dataset.targets().to_owned();
        check_training_data(&xtrain, &ytrain)?;

        let mut rng = make_rng(self.seed());
        let z = self.inducings().select(&xtrain.view(), &mut rng)?;
        let gh = GaussHermite::new(self.gh_points())?;
        let mut kernel = self.kernel().with_input_dim(xtrain.ncols());
        let mut lik = self.likelihood().clone();
        let nugget = self.nugget();

        let lm = jittered_cholesky(&kernel.gram(&z), nugget)?;
        let mut q = VariationalPosterior::prior(&lm, ytrain.ncols());

        // Phase 1: natural gradients on q(u) with mini-batches
        let now = Instant::now();
        for round in 0..self.n_rounds() {
            self.natgrad_round(
                &kernel,
                &lik,
                &gh,
                &z,
                &xtrain,
                &ytrain,
                self.natgrad_iters(),
                &mut q,
                &mut rng,
            )?;
            debug!(
                "SVGP natgrad round {} elbo={}",
                round,
                elbo(&kernel, &lik, &gh, &z, &xtrain.view(), &ytrain.view(), &q, nugget)?
            );
        }
        debug!("SVGP natgrad phase in {:?}ms", now.elapsed().as_millis());

        // Phase 2: hyperparameters with q(u) fixed
        if self.max_iters() > 0 {
            let nk = kernel.n_params();
            let mut params0 = kernel.hyperparameters().to_vec();
            params0.extend(lik.hyperparameters().iter());
            let mut bounds = kernel.bounds();
            bounds.extend(lik.bounds());
            let x0: Vec<f64> = params0.iter().map(|v| into_f64(v.log10())).collect();
            let log_bounds: Vec<(f64, f64)> = bounds
                .iter()
                .map(|(lo, up)| (into_f64(lo.log10()), into_f64(up.log10())))
                .collect();

            let split = |params: &Array1<F>| -> (K, L) {
                (
                    kernel.with_hyperparameters(&params.slice(s![..nk])),
                    lik.with_hyperparameters(&params.slice(s![nk..])),
                )
            };
            let objective = |x: &[f64]| -> f64 {
                let Some(params) = from_log10::<F>(x) else {
                    return f64::INFINITY;
                };
                let (k, l) = split(&params);
                match elbo(&k, &l, &gh, &z, &xtrain.view(), &ytrain.view(), &q, nugget) {
                    Ok(v) => -into_f64(v),
                    Err(_) => f64::INFINITY,
                }
            };
            let (fval, x_opt) = lbfgs_minimize(
                objective,
                &x0,
                &log_bounds,
                LbfgsParams {
                    max_iters: self.max_iters(),
                    ..LbfgsParams::default()
                },
            );
            if fval.is_finite() {
                if let Some(params) = from_log10::<F>(&x_opt) {
                    (kernel, lik) = split(&params);
                }
            }
            debug!("SVGP hyperparameters: kernel={}, likelihood={}", kernel, lik);
        }

        // Refresh q(u) for the optimized hyperparameters
        self.natgrad_round(
            &kernel,
            &lik,
            &gh,
            &z,
            &xtrain,
            &ytrain,
            self.natgrad_iters(),
            &mut q,
            &mut rng,
        )?;
        let elbo = elbo(&kernel, &lik, &gh, &z, &xtrain.view(), &ytrain.view(), &q, nugget)?;
        debug!("SVGP fitted in {:?}ms, elbo={}", now.elapsed().as_millis(), elbo);

        Ok(StochasticVariationalGp {
            kernel,
            likelihood: lik,
            elbo,
            nugget,
            inducings: z,
            q,
        })
    }
}

impl<F: Float, K: Kernel<F>, L: Likelihood<F>> GpModel<F> for StochasticVariationalGp<F, K, L> {
    fn predict(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        self.predict_values(x)
    }

    fn predict_var(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        StochasticVariationalGp::predict_var(self, x)
    }

    fn input_dim(&self) -> usize {
        StochasticVariationalGp::input_dim(self)
    }

    fn output_dim(&self) -> usize {
        StochasticVariationalGp::output_dim(self)
    }
}

impl<F: Float, K: Kernel<F>, L: Likelihood<F>> GpMethod<F> for SvgpParams<F, K, L> {
    type Model = StochasticVariationalGp<F, K, L>;

    fn name(&self) -> &'static str {
        "SVIGP_RBF"
    }

    fn train(&self, dataset: &Dataset<F, F, Ix2>) -> Result<Self::Model> {
        self.check_ref()?.fit(dataset)
    }

    fn normalized(&self, input_stats: &Standardization<F>) -> Result<Self> {
        self.with_normalized_inducings(input_stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::log_marginal_likelihood;
    use crate::kernels::Rbf;
    use crate::likelihoods::Gaussian;
    use crate::sparse_parameters::Inducings;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_npy::write_npy;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::{Normal, Uniform};
    use ndarray_rand::RandomExt;

    fn f_obj(x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Array2<f64> {
        x.mapv(|v| (2. * v).sin())
    }

    #[test]
    fn test_natgrad_full_step_gaussian_is_exact() {
        // With a gaussian likelihood, inducing points at the data and a unit step,
        // q(u) is the exact posterior and the ELBO is the log marginal likelihood.
        let xt = Array::linspace(-2., 2., 7).insert_axis(Axis(1));
        let yt = f_obj(&xt);
        let kernel = Rbf::new(1., 0.8);
        let noise = 0.1;
        let params = StochasticVariationalGp::params_with(kernel.clone(), Gaussian::new(noise))
            .inducings(Inducings::Located(xt.clone()))
            .learning_rate(1.)
            .batch_size(None)
            .nugget(1e-10);
        let valid = params.check_ref().unwrap();
        let gh = GaussHermite::new(20).unwrap();
        let lm = jittered_cholesky(&kernel.gram(&xt), 1e-10).unwrap();
        let mut q = VariationalPosterior::prior(&lm, 1);
        valid
            .natgrad_step(
                &kernel,
                &Gaussian::new(noise),
                &gh,
                &xt,
                &xt.view(),
                &yt.view(),
                1.,
                &mut q,
            )
            .unwrap();

        let lower = elbo(
            &kernel,
            &Gaussian::new(noise),
            &gh,
            &xt,
            &xt.view(),
            &yt.view(),
            &q,
            1e-10,
        )
        .unwrap();
        let (exact, _) = log_marginal_likelihood(&kernel, noise, 0., &xt, &yt).unwrap();
        assert_abs_diff_eq!(lower, exact, epsilon = 1e-5);
    }

    #[test]
    fn test_elbo_increases_with_natgrad() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let xt = Array::random_using((60, 1), Uniform::new(-2., 2.), &mut rng);
        let yt = f_obj(&xt);
        let kernel = Rbf::new(1., 1.);
        let lik = StudentT::new(3., 0.1);
        let params = StochasticVariationalGp::params_with(kernel.clone(), lik.clone())
            .n_inducings(10)
            .batch_size(Some(20));
        let valid = params.check_ref().unwrap();
        let gh = GaussHermite::new(20).unwrap();
        let z = crate::utils::make_inducings(10, &xt.view(), &mut make_rng(Some(1)));
        let lm = jittered_cholesky(&kernel.gram(&z), 1e-6).unwrap();
        let mut q = VariationalPosterior::prior(&lm, 1);
        let elbo0 = elbo(&kernel, &lik, &gh, &z, &xt.view(), &yt.view(), &q, 1e-6).unwrap();
        valid
            .natgrad_round(&kernel, &lik, &gh, &z, &xt, &yt, 50, &mut q, &mut rng)
            .unwrap();
        let elbo1 = elbo(&kernel, &lik, &gh, &z, &xt.view(), &yt.view(), &q, 1e-6).unwrap();
        assert!(elbo1 > elbo0, "{elbo1} <= {elbo0}");
    }

    #[test]
    fn test_svgp_student_t_with_outliers() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let nt = 150;
        let xt = Array::random_using((nt, 1), Uniform::new(-2., 2.), &mut rng);
        let normal = Normal::new(0., 0.05).unwrap();
        let mut yt = f_obj(&xt) + Array::random_using((nt, 1), normal, &mut rng);
        // a few gross outliers
        for i in [3, 40, 77, 120] {
            yt[[i, 0]] += 5.;
        }

        let svgp = StudentTSvgp::params()
            .n_inducings(20)
            .batch_size(Some(50))
            .n_rounds(5)
            .natgrad_iters(50)
            .max_iters(50)
            .seed(Some(42))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("SVGP fitted");

        let xtest = Array::linspace(-1.8, 1.8, 30).insert_axis(Axis(1));
        let vals = svgp.predict_values(&xtest).unwrap();
        let vars = svgp.predict_var(&xtest).unwrap();
        assert_abs_diff_eq!(vals, f_obj(&xtest), epsilon = 0.4);
        assert!(vars.iter().all(|v| *v > 0.));
        assert!(svgp.elbo().is_finite());

        let test_dir = "target/tests";
        std::fs::create_dir_all(test_dir).ok();
        write_npy(format!("{test_dir}/svgp_xt.npy"), &xt).expect("xt saved");
        write_npy(format!("{test_dir}/svgp_yt.npy"), &yt).expect("yt saved");
        write_npy(format!("{test_dir}/svgp_x.npy"), &xtest).expect("x saved");
        write_npy(format!("{test_dir}/svgp_vals.npy"), &vals).expect("svgp vals saved");
        write_npy(format!("{test_dir}/svgp_vars.npy"), &vars).expect("svgp vars saved");
    }

    #[test]
    fn test_svgp_predict_dims() {
        let xt = array![[0., 0.], [1., 0.5], [0.5, 1.], [0.2, 0.8], [0.9, 0.1]];
        let yt = array![[0., 1.], [1., 0.], [0.5, 0.5], [0.3, 0.7], [0.8, 0.2]];
        let svgp = StudentTSvgp::params()
            .n_rounds(1)
            .natgrad_iters(5)
            .max_iters(5)
            .seed(Some(0))
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        assert_eq!(svgp.inducings().nrows(), 5);
        assert_eq!(svgp.q_mu().dim(), (5, 2));
        assert_eq!(svgp.predict_values(&array![[0.1, 0.1]]).unwrap().dim(), (1, 2));
        assert!(svgp.predict_values(&array![[0.1]]).is_err());
        assert_eq!(StudentTSvgp::<f64>::params().name(), "SVIGP_RBF");
    }
}
