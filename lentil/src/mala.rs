use crate::common::*;
use crate::data::TrainingData;
use crate::model::SoftmaxModel;
use crate::param::SoftmaxParams;
use crate::sampler::{LangevinSampler, LangevinStep, SamplerArgs};
use mcmc_util::StepSchedule;

/// Metropolis-adjusted Langevin algorithm.
///
/// Proposal: `W' = W - h ∇U(W) + sqrt(2h) ε`. The move is accepted
/// with probability `min(1, π(W') q(W | W') / π(W) q(W' | W))`, so the
/// chain targets the posterior exactly for any `h`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mala;

pub type MalaSampler = LangevinSampler<Mala>;

/// `log q(to | from)` up to a constant: the Gaussian density of the
/// Langevin proposal centred at `from - h ∇U(from)` with variance
/// `2h` per coordinate. `from` must carry its gradient.
pub fn log_transition(to: &SoftmaxParams, from: &SoftmaxParams, h: f64) -> f64 {
    let mut sq = 0.0;
    for ((w_to, w_from), dw_from) in to
        .weights()
        .iter()
        .zip(from.weights().iter())
        .zip(from.gradients().iter())
    {
        Zip::from(w_to)
            .and(w_from)
            .and(dw_from)
            .for_each(|&x, &y, &g| {
                let r = x - (y - h * g);
                sq += r * r;
            });
    }
    -sq / (4.0 * h)
}

/// `log α` for moving from `current` to `candidate`; never positive
pub fn log_acceptance(current: &SoftmaxParams, candidate: &SoftmaxParams, h: f64) -> f64 {
    let forward = -current.potential() + log_transition(candidate, current, h);
    let backward = -candidate.potential() + log_transition(current, candidate, h);
    let log_alpha = backward - forward;
    if log_alpha.is_nan() {
        f64::NEG_INFINITY
    } else {
        log_alpha.min(0.0)
    }
}

/// Metropolis test against a uniform draw `u ∈ [0, 1)`. A candidate
/// with a non-finite potential is never accepted, even when `u = 0`.
fn accepts(u: f64, log_alpha: f64, candidate_potential: f64) -> bool {
    candidate_potential.is_finite() && u.ln() < log_alpha
}

impl LangevinStep for Mala {
    fn name(&self) -> &'static str {
        "MALA"
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        model: &SoftmaxModel,
        data: &TrainingData,
        current: &mut SoftmaxParams,
        h: f64,
        rng: &mut R,
    ) -> anyhow::Result<bool> {
        let mut candidate = current.full_copy();
        candidate.langevin_iterate(h, rng);
        model.evaluate(data, &mut candidate)?;

        let log_alpha = log_acceptance(current, &candidate, h);
        let u: f64 = rng.random();

        if accepts(u, log_alpha, candidate.potential()) {
            *current = candidate;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl MalaSampler {
    pub fn mala(
        model: SoftmaxModel,
        schedule: StepSchedule,
        args: SamplerArgs,
        init: SoftmaxParams,
    ) -> anyhow::Result<Self> {
        Self::new(model, schedule, args, Mala, init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn transition_density_peaks_at_the_langevin_mean() -> anyhow::Result<()> {
        let model = SoftmaxModel::single_layer(2, 2, 1.0)?;
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![[0.8, 0.2], [0.2, 0.8]];
        let data = TrainingData::new(&model, &x, &y)?;

        let mut from = model.zero_params();
        model.evaluate(&data, &mut from)?;

        let h = 0.1;
        let mut mean = from.full_copy();
        mean.descend_gradient(h);
        assert_abs_diff_eq!(log_transition(&mean, &from, h), 0.0);

        let mut off = mean.full_copy();
        off.set(1, off.get(1)? + 1.0)?;
        assert_abs_diff_eq!(log_transition(&off, &from, h), -4.0 / (4.0 * h), epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn undefined_candidates_are_always_rejected() {
        assert!(!accepts(0.0, f64::NEG_INFINITY, f64::NAN));
        assert!(!accepts(0.0, 0.0, f64::NAN));
        assert!(!accepts(0.0, 0.0, f64::INFINITY));
        assert!(!accepts(0.0, f64::NEG_INFINITY, 1.0));
        assert!(accepts(0.0, -50.0, 1.0));
        assert!(accepts(0.5, 0.0, 1.0));
        assert!(!accepts(0.5, 0.5f64.ln() - 1e-9, 1.0));
    }

    #[test]
    fn acceptance_is_never_above_one() -> anyhow::Result<()> {
        let model = SoftmaxModel::single_layer(2, 2, 1.0)?;
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![[0.8, 0.2], [0.2, 0.8]];
        let data = TrainingData::new(&model, &x, &y)?;

        let mut a = model.zero_params();
        model.evaluate(&data, &mut a)?;
        let mut b = model.zero_params();
        b.set(1, array![[1.0, -1.0], [-1.0, 1.0]])?;
        model.evaluate(&data, &mut b)?;

        for h in [1e-4, 0.1, 1.0, 10.0] {
            assert!(log_acceptance(&a, &b, h) <= 0.0);
            assert!(log_acceptance(&b, &a, h) <= 0.0);
        }
        Ok(())
    }
}
