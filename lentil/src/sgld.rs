use crate::common::*;
use crate::data::TrainingData;
use crate::model::SoftmaxModel;
use crate::param::SoftmaxParams;
use crate::sampler::{LangevinSampler, LangevinStep, SamplerArgs};
use mcmc_util::StepSchedule;

/// Unadjusted Langevin dynamics on the full data.
///
/// ```text
/// W ← W - (h/2) ∇U(W) + sqrt(h) ε,   ε ~ N(0, I)
/// ```
///
/// Every move is kept; the stationary distribution is the posterior
/// only as `h → 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sgld;

pub type SgldSampler = LangevinSampler<Sgld>;

impl LangevinStep for Sgld {
    fn name(&self) -> &'static str {
        "SGLD"
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        model: &SoftmaxModel,
        data: &TrainingData,
        current: &mut SoftmaxParams,
        h: f64,
        rng: &mut R,
    ) -> anyhow::Result<bool> {
        current.descend_gradient(0.5 * h);
        current.add_gaussian_noise(h.sqrt(), rng);
        model.evaluate(data, current)?;
        Ok(true)
    }
}

impl SgldSampler {
    pub fn sgld(
        model: SoftmaxModel,
        schedule: StepSchedule,
        args: SamplerArgs,
        init: SoftmaxParams,
    ) -> anyhow::Result<Self> {
        Self::new(model, schedule, args, Sgld, init)
    }
}
