use crate::common::*;
use crate::data::TrainingData;
use crate::model::SoftmaxModel;
use crate::param::SoftmaxParams;

/// Plain gradient descent on `U / N` (mean cross-entropy plus the
/// prior penalty spread over the points), starting from `param`.
///
/// Returns the per-point potential recorded every 10 iterations.
/// The result is a MAP estimate, which can seed a sampler.
pub fn fit_map(
    model: &SoftmaxModel,
    data: &TrainingData,
    param: &mut SoftmaxParams,
    learning_rate: f64,
    num_iter: usize,
) -> anyhow::Result<Vec<f64>> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        anyhow::bail!("learning rate must be positive, got {}", learning_rate);
    }

    let nn = data.num_points() as f64;
    let mut costs = Vec::with_capacity(num_iter / 10 + 1);

    for iter in 0..num_iter {
        let u = model.evaluate(data, param)?;

        if iter % 10 == 0 {
            costs.push(u / nn);
        }
        if iter % 100 == 0 {
            info!(
                "MAP iter {}: cost {:.4}, train accuracy {:.1}%",
                iter,
                u / nn,
                100.0 * model.accuracy(data.x(), data.y(), param)?
            );
        }

        param.descend_gradient(learning_rate / nn);
    }

    model.potential(data, param)?;
    Ok(costs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descent_lowers_the_potential() -> anyhow::Result<()> {
        let model = SoftmaxModel::single_layer(2, 2, 100.0)?;
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![[0.8, 0.2], [0.2, 0.8]];
        let data = TrainingData::new(&model, &x, &y)?;

        let mut param = model.zero_params();
        let costs = fit_map(&model, &data, &mut param, 0.5, 500)?;

        assert_eq!(costs.len(), 50);
        assert!(costs.windows(2).all(|w| w[1] <= w[0] + 1e-12));
        assert_eq!(model.accuracy(&x, &y, &param)?, 1.0);

        // optimum of 0.8 log σ(d) + 0.2 log σ(-d) is d = log 4
        let w = param.get(1)?;
        let d = w[[0, 0]] - w[[1, 0]];
        approx::assert_abs_diff_eq!(d, 4f64.ln(), epsilon = 0.05);
        Ok(())
    }

    #[test]
    fn rejects_bad_learning_rate() -> anyhow::Result<()> {
        let model = SoftmaxModel::single_layer(2, 2, 1.0)?;
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![[0.8, 0.2], [0.2, 0.8]];
        let data = TrainingData::new(&model, &x, &y)?;
        let mut param = model.zero_params();
        assert!(fit_map(&model, &data, &mut param, 0.0, 10).is_err());
        Ok(())
    }
}
