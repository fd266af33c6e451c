//! Fit every regression variant on a noisy 2D test function and print its
//! scores on held-out points.
//!
//! Run with `RUST_LOG=info cargo run --release --example benchmark`
use egobox_doe::{Lhs, SamplingMethod};
use gp_regression::metrics::{mae, r2_score, rmse};
use gp_regression::{
    Bgplvm, BgplvmParams, GpRbf, RegressionMethod, SgpFitc, SgpParams, SparseGpRbf, SvgpParams,
    SvigpRbf,
};
use linfa::Dataset;
use ndarray::{array, Array2, ArrayView2, Zip};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use std::time::Instant;

fn branin_like(x: &ArrayView2<f64>) -> Array2<f64> {
    let mut y = Array2::zeros((x.nrows(), 1));
    Zip::from(y.rows_mut()).and(x.rows()).for_each(|mut yi, xi| {
        yi[0] = (3. * xi[0]).sin() + 0.5 * xi[1] * xi[1] + 0.3 * xi[0] * xi[1];
    });
    y
}

fn main() {
    env_logger::init();

    let xlimits = array![[-2., 2.], [-1., 1.]];
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let xtrain = Lhs::new(&xlimits)
        .with_rng(Xoshiro256Plus::seed_from_u64(42))
        .sample(200);
    let noise = Array2::from_shape_fn((200, 1), |_| 0.05 * (rng.gen::<f64>() - 0.5));
    let ytrain = branin_like(&xtrain.view()) + noise;
    let dataset = Dataset::new(xtrain, ytrain);

    let xtest = Lhs::new(&xlimits)
        .with_rng(Xoshiro256Plus::seed_from_u64(0))
        .sample(100);
    let ytest = branin_like(&xtest.view());

    let mut methods: Vec<Box<dyn RegressionMethod<f64>>> = vec![
        Box::new(GpRbf::<f64>::default()),
        Box::new(SparseGpRbf::<f64>::new(
            SgpParams::default().n_inducings(50).seed(Some(42)),
        )),
        Box::new(SgpFitc::<f64>::new(
            SgpParams::default().n_inducings(50).seed(Some(42)),
        )),
        Box::new(SvigpRbf::<f64>::new(
            SvgpParams::default()
                .n_inducings(50)
                .batch_size(Some(50))
                .seed(Some(42)),
        )),
        Box::new(Bgplvm::<f64>::new(
            BgplvmParams::default().n_inducings(50).seed(Some(42)),
        )),
    ];

    println!(
        "{:<14}{:>10}{:>10}{:>10}{:>12}",
        "method", "rmse", "mae", "r2", "time (ms)"
    );
    for method in methods.iter_mut() {
        let now = Instant::now();
        let scores = method.fit(&dataset).and_then(|_| {
            let pred = method.predict(&xtest.view())?;
            Ok((
                rmse(&ytest, &pred)?,
                mae(&ytest, &pred)?,
                r2_score(&ytest, &pred)?,
            ))
        });
        match scores {
            Ok((rmse, mae, r2)) => println!(
                "{:<14}{:>10.4}{:>10.4}{:>10.4}{:>12}",
                method.name(),
                rmse,
                mae,
                r2,
                now.elapsed().as_millis()
            ),
            Err(err) => println!("{:<14} failed: {}", method.name(), err),
        }
    }
}
