use crate::common::*;
use mcmc_util::ChainSample;

/// Parameter/state container for an `L`-layer softmax network.
///
/// Layers are addressed `1..=L`. Every per-layer slot (weights, caches,
/// gradients) is allocated once at construction; weight shapes never
/// change afterwards.
///
/// * `weights[l-1]` - `W_l`, shape `(units_l, units_{l-1})`
/// * `pre_activations[l-1]` - `Z_l = W_l A_{l-1}`, shape `(units_l, N)`
/// * `activations[l-1]` - `A_l`, shape `(units_l, N)`
/// * `gradients[l-1]` - `∂U/∂W_l`, same shape as `W_l`
/// * `potential` - `U` at the current weights
///
#[derive(Debug, Clone)]
pub struct SoftmaxParams {
    weights: Vec<Mat>,
    pre_activations: Vec<Mat>,
    activations: Vec<Mat>,
    gradients: Vec<Mat>,
    potential: f64,
}

impl SoftmaxParams {
    /// Wrap a stack of weight matrices. Consecutive layers must
    /// agree: `W_l.ncols() == W_{l-1}.nrows()`.
    pub fn from_weights(weights: Vec<Mat>) -> anyhow::Result<Self> {
        if weights.is_empty() {
            anyhow::bail!("need at least one layer");
        }
        for (l, w) in weights.iter().enumerate().skip(1) {
            let prev = &weights[l - 1];
            if w.ncols() != prev.nrows() {
                anyhow::bail!(
                    "layer {} takes {} inputs but layer {} has {} units",
                    l + 1,
                    w.ncols(),
                    l,
                    prev.nrows()
                );
            }
        }

        let gradients = weights.iter().map(|w| Mat::zeros(w.dim())).collect();
        let pre_activations = empty_caches(&weights);
        let activations = empty_caches(&weights);

        Ok(Self {
            weights,
            pre_activations,
            activations,
            gradients,
            potential: f64::NAN,
        })
    }

    /// Number of layers `L`
    pub fn num_layers(&self) -> usize {
        self.weights.len()
    }

    fn slot(&self, l: usize) -> anyhow::Result<usize> {
        if l == 0 || l > self.num_layers() {
            anyhow::bail!(
                "layer index {} out of range [1, {}]",
                l,
                self.num_layers()
            );
        }
        Ok(l - 1)
    }

    /// `W_l`
    pub fn get(&self, l: usize) -> anyhow::Result<&Mat> {
        Ok(&self.weights[self.slot(l)?])
    }

    /// Replace `W_l`; the new matrix must have the same shape
    pub fn set(&mut self, l: usize, w: Mat) -> anyhow::Result<()> {
        let i = self.slot(l)?;
        if w.dim() != self.weights[i].dim() {
            anyhow::bail!(
                "layer {} has shape {:?}, cannot set {:?}",
                l,
                self.weights[i].dim(),
                w.dim()
            );
        }
        self.weights[i] = w;
        Ok(())
    }

    /// `∂U/∂W_l` from the last backward pass
    pub fn gradient(&self, l: usize) -> anyhow::Result<&Mat> {
        Ok(&self.gradients[self.slot(l)?])
    }

    /// `A_l` from the last forward pass
    pub fn activation(&self, l: usize) -> anyhow::Result<&Mat> {
        Ok(&self.activations[self.slot(l)?])
    }

    /// `Z_l` from the last forward pass
    pub fn pre_activation(&self, l: usize) -> anyhow::Result<&Mat> {
        Ok(&self.pre_activations[self.slot(l)?])
    }

    /// Class probabilities `A_L`, shape `(B, N)`
    pub fn output(&self) -> &Mat {
        &self.activations[self.num_layers() - 1]
    }

    pub fn weights(&self) -> &[Mat] {
        &self.weights
    }

    pub(crate) fn gradients(&self) -> &[Mat] {
        &self.gradients
    }

    pub(crate) fn gradients_mut(&mut self) -> &mut [Mat] {
        &mut self.gradients
    }

    pub(crate) fn caches_mut(&mut self, i: usize) -> (&mut Mat, &mut Mat) {
        (&mut self.pre_activations[i], &mut self.activations[i])
    }

    pub(crate) fn caches(&self, i: usize) -> (&Mat, &Mat) {
        (&self.pre_activations[i], &self.activations[i])
    }

    /// `U`; `NaN` until the potential has been evaluated
    pub fn potential(&self) -> f64 {
        self.potential
    }

    pub(crate) fn set_potential(&mut self, u: f64) {
        self.potential = u;
    }

    /// Weights and potential only. Activation and gradient caches of
    /// the copy are empty; run a backward pass before descending.
    pub fn shallow_copy(&self) -> Self {
        Self {
            weights: self.weights.clone(),
            pre_activations: empty_caches(&self.weights),
            activations: empty_caches(&self.weights),
            gradients: empty_gradients(&self.weights),
            potential: self.potential,
        }
    }

    /// Independent copy of weights, caches, gradients, and potential
    pub fn full_copy(&self) -> Self {
        self.clone()
    }

    /// `W_l ← W_l - step · dW_l` for every layer; a layer with no
    /// gradient yet (shallow copy) is left unchanged
    pub fn descend_gradient(&mut self, step: f64) {
        for (w, dw) in self.weights.iter_mut().zip(self.gradients.iter()) {
            if dw.dim() == w.dim() {
                w.scaled_add(-step, dw);
            }
        }
    }

    /// `W_l[i,j] += sd · ε`, `ε ~ N(0,1)` independently per entry
    pub fn add_gaussian_noise<R: Rng + ?Sized>(&mut self, sd: f64, rng: &mut R) {
        for w in self.weights.iter_mut() {
            w.mapv_inplace(|x| {
                let eps: f64 = StandardNormal.sample(rng);
                x + sd * eps
            });
        }
    }

    /// One discretised Langevin move of step `h`:
    /// `W ← W - h ∇U + sqrt(2h) ε`
    pub fn langevin_iterate<R: Rng + ?Sized>(&mut self, h: f64, rng: &mut R) {
        self.descend_gradient(h);
        self.add_gaussian_noise((2.0 * h).sqrt(), rng);
    }

    /// `Σ_l ‖W_l‖²`
    pub fn squared_norm(&self) -> f64 {
        self.weights.iter().map(|w| w.iter().map(|x| x * x).sum::<f64>()).sum()
    }
}

fn empty_caches(weights: &[Mat]) -> Vec<Mat> {
    weights.iter().map(|w| Mat::zeros((w.nrows(), 0))).collect()
}

fn empty_gradients(weights: &[Mat]) -> Vec<Mat> {
    weights.iter().map(|_| Mat::zeros((0, 0))).collect()
}

impl ChainSample for SoftmaxParams {
    fn potential(&self) -> f64 {
        self.potential
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn two_layer() -> SoftmaxParams {
        SoftmaxParams::from_weights(vec![
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            array![[1.0, -1.0], [0.5, 0.5], [0.0, 2.0], [3.0, 1.0]],
        ])
        .unwrap()
    }

    #[test]
    fn layer_index_is_one_based_and_checked() {
        let mut param = two_layer();
        assert_eq!(param.num_layers(), 2);
        assert!(param.get(0).is_err());
        assert!(param.get(3).is_err());
        assert_eq!(param.get(1).unwrap().dim(), (2, 3));
        assert!(param.set(2, Mat::zeros((2, 2))).is_err());
        assert!(param.set(2, Mat::zeros((4, 2))).is_ok());
        assert!(param.set(0, Mat::zeros((2, 3))).is_err());
    }

    #[test]
    fn inconsistent_layers_are_rejected() {
        let bad = SoftmaxParams::from_weights(vec![Mat::zeros((2, 3)), Mat::zeros((4, 3))]);
        assert!(bad.is_err());
        assert!(SoftmaxParams::from_weights(vec![]).is_err());
    }

    #[test]
    fn copies_do_not_share_storage() {
        let mut param = two_layer();
        param.set_potential(1.5);
        param.gradients_mut()[0].fill(1.0);

        let shallow = param.shallow_copy();
        let full = param.full_copy();

        param.descend_gradient(1.0);

        assert_eq!(shallow.get(1).unwrap()[[0, 0]], 1.0);
        assert_eq!(full.get(1).unwrap()[[0, 0]], 1.0);
        assert_eq!(param.get(1).unwrap()[[0, 0]], 0.0);

        assert_eq!(shallow.potential(), 1.5);
        assert!(full.gradient(1).unwrap().iter().all(|&g| g == 1.0));
    }

    #[test]
    fn shallow_copy_keeps_no_caches() {
        let mut param = SoftmaxParams::from_weights(vec![Mat::zeros((20, 500))]).unwrap();
        param.gradients_mut()[0].fill(1.0);
        param.set_potential(3.0);

        let shallow = param.shallow_copy();
        assert_eq!(shallow.get(1).unwrap().dim(), (20, 500));
        assert_eq!(shallow.gradient(1).unwrap().len(), 0);
        assert_eq!(shallow.activation(1).unwrap().len(), 0);
        assert_eq!(shallow.pre_activation(1).unwrap().len(), 0);
        assert_eq!(shallow.potential(), 3.0);

        // a fresh container starts with zero gradients of full size
        assert_eq!(param.full_copy().gradient(1).unwrap().len(), 20 * 500);

        let mut moved = shallow.full_copy();
        moved.descend_gradient(1.0);
        assert_eq!(moved.weights(), shallow.weights());
    }

    #[test]
    fn zero_noise_is_a_no_op() {
        let mut param = two_layer();
        let before = param.weights().to_vec();
        let mut rng = SmallRng::seed_from_u64(3);
        param.add_gaussian_noise(0.0, &mut rng);
        assert_eq!(param.weights(), &before[..]);
    }

    #[test]
    fn langevin_move_without_noise_is_gradient_descent() {
        let mut param = two_layer();
        param.gradients_mut()[1].fill(2.0);
        let mut rng = SmallRng::seed_from_u64(3);
        param.langevin_iterate(0.0, &mut rng);
        assert_eq!(param.get(2).unwrap()[[0, 0]], 1.0);

        param.descend_gradient(0.25);
        assert_eq!(param.get(2).unwrap()[[0, 0]], 0.5);
    }
}
