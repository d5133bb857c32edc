use lentil::common::*;
use lentil::forward::softmax_columns;
use lentil::*;
use matrix_util::traits::SampleOps;
use rand::rngs::SmallRng;
use rand::SeedableRng;

const EPS: f64 = 1e-5;

/// Central finite differences of `U` against the analytic gradient
fn check_gradient(model: &SoftmaxModel, seed: u64) -> anyhow::Result<()> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let nn = 6;
    let x = Mat::rnorm_using(nn, model.num_features(), &mut rng);
    // soft targets: columns of a softmax, one row per point
    let y = softmax_columns(Mat::rnorm_using(model.num_classes(), nn, &mut rng)).reversed_axes();
    let data = TrainingData::new(model, &x, &y)?;

    let mut param = model.init_params(&mut rng);
    model.evaluate(&data, &mut param)?;

    for l in 1..=model.num_layers() {
        let analytic = param.gradient(l)?.clone();
        let (rows, cols) = analytic.dim();
        for i in 0..rows {
            for j in 0..cols {
                let mut plus = param.full_copy();
                let mut w = plus.get(l)?.clone();
                w[[i, j]] += EPS;
                plus.set(l, w)?;
                let u_plus = model.potential(&data, &mut plus)?;

                let mut minus = param.full_copy();
                let mut w = minus.get(l)?.clone();
                w[[i, j]] -= EPS;
                minus.set(l, w)?;
                let u_minus = model.potential(&data, &mut minus)?;

                let numeric = (u_plus - u_minus) / (2.0 * EPS);
                approx::assert_abs_diff_eq!(numeric, analytic[[i, j]], epsilon = 1e-5);
            }
        }
    }
    Ok(())
}

#[test]
fn single_layer_gradient_matches_finite_differences() -> anyhow::Result<()> {
    check_gradient(&SoftmaxModel::single_layer(4, 3, 1.0)?, 1)?;
    check_gradient(&SoftmaxModel::single_layer(2, 2, 100.0)?, 2)
}

#[test]
fn hidden_layer_gradient_matches_finite_differences() -> anyhow::Result<()> {
    check_gradient(&SoftmaxModel::new(vec![3, 4, 2], 1.5)?, 3)?;
    check_gradient(&SoftmaxModel::new(vec![3, 5, 4, 3], 0.7)?, 4)
}
