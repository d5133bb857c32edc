use crate::common::*;
use crate::data::TrainingData;
use crate::forward::logistic;
use crate::model::SoftmaxModel;
use crate::param::SoftmaxParams;

/// `Σ_n Σ_b y[n,b] log p[b,n]` for probabilities `p (B × N)` and
/// targets `y (N × B)`. Zero targets contribute nothing, and a zero
/// probability is clamped to the smallest positive normal.
pub fn log_likelihood(probs: &Mat, y: &Mat) -> f64 {
    let mut llik = 0.0;
    for (n, y_n) in y.rows().into_iter().enumerate() {
        for (b, &y_nb) in y_n.iter().enumerate() {
            if y_nb != 0.0 {
                llik += y_nb * probs[[b, n]].max(f64::MIN_POSITIVE).ln();
            }
        }
    }
    llik
}

impl SoftmaxModel {
    /// `-Σ_l ‖W_l‖² / 2σ²`, dropping the normalizing constant
    pub fn log_prior(&self, param: &SoftmaxParams) -> f64 {
        let s2 = self.prior_sd() * self.prior_sd();
        -0.5 * param.squared_norm() / s2
    }

    /// `U = -(log-likelihood + log-prior)` at the weights of `param`.
    /// Runs a forward pass and stores `U` in `param`.
    pub fn potential(&self, data: &TrainingData, param: &mut SoftmaxParams) -> anyhow::Result<f64> {
        let probs = self.forward(data.x(), param)?;
        let llik = log_likelihood(probs, data.y());
        let u = -(llik + self.log_prior(param));
        param.set_potential(u);
        Ok(u)
    }

    /// Reverse-mode pass through the caches of the last forward pass
    /// on `x`, writing `dW_l = ∂U/∂W_l` for every layer.
    ///
    /// ```text
    /// δ_L = A_L - Yᵗ
    /// δ_l = (W_{l+1}ᵗ δ_{l+1}) ⊙ logistic'(Z_l)
    /// dW_l = δ_l A_{l-1}ᵗ + W_l / σ²
    /// ```
    ///
    /// The likelihood part is summed, not averaged, over points.
    pub fn backward(&self, x: &Mat, y: &Mat, param: &mut SoftmaxParams) -> anyhow::Result<()> {
        let nn = x.nrows();
        if nn == 0 {
            anyhow::bail!("cannot differentiate on an empty batch");
        }
        if y.nrows() != nn || y.ncols() != self.num_classes() {
            anyhow::bail!(
                "targets {:?} do not match {} points and {} classes",
                y.dim(),
                nn,
                self.num_classes()
            );
        }
        if param.output().dim() != (self.num_classes(), nn) {
            anyhow::bail!("no forward pass on this batch; output cache is {:?}", param.output().dim());
        }

        let prior_precision = 1.0 / (self.prior_sd() * self.prior_sd());
        let nlayers = param.num_layers();

        let mut delta: Mat = param.output() - &y.t();

        for i in (0..nlayers).rev() {
            let (dw, next_delta) = {
                let a_prev = if i == 0 {
                    x.t()
                } else {
                    param.caches(i - 1).1.view()
                };

                let mut dw = delta.dot(&a_prev.t());
                dw.scaled_add(prior_precision, &param.weights()[i]);

                let next_delta = if i > 0 {
                    let mut d = param.weights()[i].t().dot(&delta);
                    Zip::from(&mut d).and(param.caches(i - 1).0).for_each(|d, &z| {
                        let s = logistic(z);
                        *d *= s * (1.0 - s);
                    });
                    Some(d)
                } else {
                    None
                };
                (dw, next_delta)
            };

            param.gradients_mut()[i] = dw;
            if let Some(d) = next_delta {
                delta = d;
            }
        }

        Ok(())
    }

    /// Forward pass, potential, and gradient at the weights of `param`.
    /// Returns `U`.
    pub fn evaluate(&self, data: &TrainingData, param: &mut SoftmaxParams) -> anyhow::Result<f64> {
        let u = self.potential(data, param)?;
        self.backward(data.x(), data.y(), param)?;
        Ok(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn zero_targets_contribute_nothing() {
        let probs = array![[0.0, 0.5], [1.0, 0.5]];
        let y = array![[0.0, 1.0], [0.5, 0.5]];
        assert_abs_diff_eq!(log_likelihood(&probs, &y), 0.5f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn potential_at_zero_weights() -> anyhow::Result<()> {
        let model = SoftmaxModel::single_layer(2, 2, 1.0)?;
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![[0.8, 0.2], [0.2, 0.8]];
        let data = TrainingData::new(&model, &x, &y)?;
        let mut param = model.zero_params();
        let u = model.evaluate(&data, &mut param)?;

        // uniform predictions over two points
        assert_abs_diff_eq!(u, 2.0 * 2f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(param.potential(), u);

        // dW = (A - Yᵗ) X = [[0.5-0.8, 0.5-0.2], [0.5-0.2, 0.5-0.8]]
        let expected = array![[-0.3, 0.3], [0.3, -0.3]];
        assert_abs_diff_eq!(*param.gradient(1)?, expected, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn backward_needs_matching_forward() -> anyhow::Result<()> {
        let model = SoftmaxModel::single_layer(2, 2, 1.0)?;
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![[0.8, 0.2], [0.2, 0.8]];
        let mut param = model.zero_params();
        assert!(model.backward(&x, &y, &mut param).is_err());

        let empty = Mat::zeros((0, 2));
        assert!(model.backward(&empty, &empty, &mut param).is_err());
        Ok(())
    }
}
