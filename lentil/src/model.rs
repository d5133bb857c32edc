use crate::common::*;
use crate::param::SoftmaxParams;
use serde::Serialize;

/// Shape of the network and scale of the Gaussian weight prior.
///
/// `layer_sizes = [D, h_1, ..., B]` gives `L = layer_sizes.len() - 1`
/// affine layers with no bias terms; a constant input column plays
/// that role if needed. Every weight entry has an independent
/// `N(0, prior_sd²)` prior.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftmaxModel {
    layer_sizes: Vec<usize>,
    prior_sd: f64,
}

impl SoftmaxModel {
    pub fn new(layer_sizes: Vec<usize>, prior_sd: f64) -> anyhow::Result<Self> {
        if layer_sizes.len() < 2 {
            anyhow::bail!(
                "need at least input and output sizes, got {:?}",
                layer_sizes
            );
        }
        if layer_sizes.contains(&0) {
            anyhow::bail!("zero-sized layer in {:?}", layer_sizes);
        }
        if !(prior_sd.is_finite() && prior_sd > 0.0) {
            anyhow::bail!("prior scale σ must be positive, got {}", prior_sd);
        }
        Ok(Self {
            layer_sizes,
            prior_sd,
        })
    }

    /// A single affine layer from `D` features to `B` classes
    pub fn single_layer(num_features: usize, num_classes: usize, prior_sd: f64) -> anyhow::Result<Self> {
        Self::new(vec![num_features, num_classes], prior_sd)
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    /// `L`
    pub fn num_layers(&self) -> usize {
        self.layer_sizes.len() - 1
    }

    /// `D`
    pub fn num_features(&self) -> usize {
        self.layer_sizes[0]
    }

    /// `B`
    pub fn num_classes(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    /// `σ`
    pub fn prior_sd(&self) -> f64 {
        self.prior_sd
    }

    /// `W_l[i,j] ~ N(0,1) / sqrt(units_{l-1})`
    pub fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> SoftmaxParams {
        let weights = self
            .layer_sizes
            .windows(2)
            .map(|w| {
                let (fan_in, fan_out) = (w[0], w[1]);
                let scale = 1.0 / (fan_in as f64).sqrt();
                Mat::from_shape_simple_fn((fan_out, fan_in), || {
                    let eps: f64 = StandardNormal.sample(rng);
                    eps * scale
                })
            })
            .collect();
        Self::wrap(weights)
    }

    /// All-zero weights
    pub fn zero_params(&self) -> SoftmaxParams {
        let weights = self
            .layer_sizes
            .windows(2)
            .map(|w| Mat::zeros((w[1], w[0])))
            .collect();
        Self::wrap(weights)
    }

    fn wrap(weights: Vec<Mat>) -> SoftmaxParams {
        // Shapes are built from consecutive layer sizes, so they chain
        match SoftmaxParams::from_weights(weights) {
            Ok(param) => param,
            Err(e) => unreachable!("{}", e),
        }
    }

    /// True if `param` has exactly this model's layer shapes
    pub fn check_params(&self, param: &SoftmaxParams) -> anyhow::Result<()> {
        if param.num_layers() != self.num_layers() {
            anyhow::bail!(
                "model has {} layers, parameters have {}",
                self.num_layers(),
                param.num_layers()
            );
        }
        for (l, (w, sz)) in param.weights().iter().zip(self.layer_sizes.windows(2)).enumerate() {
            if w.dim() != (sz[1], sz[0]) {
                anyhow::bail!(
                    "layer {}: expected shape {:?}, got {:?}",
                    l + 1,
                    (sz[1], sz[0]),
                    w.dim()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn configuration_errors() {
        assert!(SoftmaxModel::new(vec![3], 1.0).is_err());
        assert!(SoftmaxModel::new(vec![3, 0, 2], 1.0).is_err());
        assert!(SoftmaxModel::new(vec![3, 2], 0.0).is_err());
        assert!(SoftmaxModel::new(vec![3, 2], -1.0).is_err());
        assert!(SoftmaxModel::new(vec![3, 2], f64::NAN).is_err());
    }

    #[test]
    fn initial_shapes_follow_layer_sizes() {
        let model = SoftmaxModel::new(vec![5, 4, 3], 10.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(11);
        let param = model.init_params(&mut rng);
        assert_eq!(model.num_layers(), 2);
        assert_eq!(param.get(1).unwrap().dim(), (4, 5));
        assert_eq!(param.get(2).unwrap().dim(), (3, 4));
        assert!(model.check_params(&param).is_ok());

        let other = SoftmaxModel::single_layer(5, 3, 10.0).unwrap();
        assert!(other.check_params(&param).is_err());
    }
}
