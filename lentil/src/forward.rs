use crate::common::*;
use crate::model::SoftmaxModel;
use crate::param::SoftmaxParams;

/// `1 / (1 + exp(-z))`
#[inline]
pub fn logistic(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Column-wise softmax. Each column is shifted by its maximum before
/// exponentiation; entries that still come out non-finite are zeroed
/// before the column is renormalized.
pub fn softmax_columns(mut z: Mat) -> Mat {
    for mut col in z.columns_mut() {
        let zmax = col.fold(f64::NEG_INFINITY, |m, &v| if v > m { v } else { m });
        col.mapv_inplace(|v| {
            let e = (v - zmax).exp();
            if e.is_finite() {
                e
            } else {
                0.0
            }
        });
        let tot = col.sum();
        if tot > 0.0 {
            col.mapv_inplace(|v| v / tot);
        }
    }
    z
}

impl SoftmaxModel {
    /// Forward pass: fill `Z_l` and `A_l` for every layer of `param`
    /// and return the class probabilities `A_L`, shape `(B, N)`.
    ///
    /// * `x` - features `(N, D)`; a mini-batch is fine
    pub fn forward<'a>(&self, x: &Mat, param: &'a mut SoftmaxParams) -> anyhow::Result<&'a Mat> {
        if x.ncols() != self.num_features() {
            anyhow::bail!(
                "model expects {} features, got {}",
                self.num_features(),
                x.ncols()
            );
        }
        self.check_params(param)?;

        let nlayers = param.num_layers();

        for i in 0..nlayers {
            let z = if i == 0 {
                param.weights()[0].dot(&x.t())
            } else {
                param.weights()[i].dot(param.caches(i - 1).1)
            };

            let a = if i + 1 < nlayers {
                z.mapv(logistic)
            } else {
                softmax_columns(z.clone())
            };

            let (z_cache, a_cache) = param.caches_mut(i);
            *z_cache = z;
            *a_cache = a;
        }

        Ok(param.output())
    }

    /// Class probabilities `(B, N)` at the weights of `param`, without
    /// touching its caches
    pub fn predict_proba(&self, x: &Mat, param: &SoftmaxParams) -> anyhow::Result<Mat> {
        let mut scratch = param.shallow_copy();
        Ok(self.forward(x, &mut scratch)?.clone())
    }

    /// Most probable class of each row of `x`
    pub fn predict(&self, x: &Mat, param: &SoftmaxParams) -> anyhow::Result<Vec<usize>> {
        let probs = self.predict_proba(x, param)?;
        Ok(crate::data::argmax_columns(&probs))
    }

    /// Fraction of rows whose predicted class matches the argmax of
    /// the corresponding target row
    pub fn accuracy(&self, x: &Mat, y: &Mat, param: &SoftmaxParams) -> anyhow::Result<f64> {
        if x.nrows() != y.nrows() {
            anyhow::bail!("{} feature rows vs. {} target rows", x.nrows(), y.nrows());
        }
        if x.nrows() == 0 {
            anyhow::bail!("accuracy of an empty data set");
        }
        let yhat = self.predict(x, param)?;
        let ytrue = crate::data::argmax_rows(y);
        let ncorrect = yhat.iter().zip(ytrue.iter()).filter(|(a, b)| a == b).count();
        Ok(ncorrect as f64 / x.nrows() as f64)
    }
}
