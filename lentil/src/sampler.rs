use crate::common::*;
use crate::data::TrainingData;
use crate::diagnostics;
use crate::model::SoftmaxModel;
use crate::param::SoftmaxParams;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mcmc_util::{McmcChain, StepSchedule, ThinArgs};
use serde::Serialize;

/// One Langevin transition. Implementations differ only in how they
/// propose and whether they accept; the forward/backward evaluation
/// is shared through [`SoftmaxModel::evaluate`].
pub trait LangevinStep {
    /// Short name for log messages
    fn name(&self) -> &'static str;

    /// Advance `current` by one transition of step size `h`.
    ///
    /// On entry `current` holds caches, gradient, and `U` evaluated on
    /// `data` at its weights, and the same must hold on exit. Returns
    /// whether the proposal was accepted.
    fn step<R: Rng + ?Sized>(
        &mut self,
        model: &SoftmaxModel,
        data: &TrainingData,
        current: &mut SoftmaxParams,
        h: f64,
        rng: &mut R,
    ) -> anyhow::Result<bool>;
}

/// Hyperparameters of one sampling run
#[derive(Debug, Clone, Serialize)]
pub struct SamplerArgs {
    /// multiplies the annealed step size
    pub step_scaling: f64,
    /// number of transitions
    pub num_iter: usize,
    /// record every `record_stride`-th state into the history
    pub record_stride: usize,
    /// log progress every this many iterations (0 = never)
    pub report_interval: usize,
    /// show a progress bar
    pub verbose: bool,
}

impl Default for SamplerArgs {
    fn default() -> Self {
        Self {
            step_scaling: 1.0,
            num_iter: 1000,
            record_stride: 1,
            report_interval: 100,
            verbose: false,
        }
    }
}

impl SamplerArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.step_scaling.is_finite() && self.step_scaling > 0.0) {
            anyhow::bail!("step scaling must be positive, got {}", self.step_scaling);
        }
        if self.record_stride == 0 {
            anyhow::bail!("record stride must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SamplerState {
    Initialized,
    Iterating,
    Finished,
}

/// Diagnostics of a completed run; neither feeds back into the chain
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub sampler: &'static str,
    pub num_iter: usize,
    pub num_recorded: usize,
    /// accepted / attempted transitions
    pub acceptance_ratio: f64,
    /// in-sample accuracy of the final state
    pub final_accuracy: f64,
    pub final_potential: f64,
}

/// A single Markov chain over softmax weights driven by a Langevin
/// transition `S`.
///
/// `Initialized → Iterating → Finished`. The chain owns its current
/// state and its sample history; nothing is shared with other chains.
pub struct LangevinSampler<S: LangevinStep> {
    model: SoftmaxModel,
    schedule: StepSchedule,
    args: SamplerArgs,
    strategy: S,
    current: SoftmaxParams,
    history: McmcChain<SoftmaxParams>,
    state: SamplerState,
    t: usize,
    n_attempted: usize,
    n_accepted: usize,
}

impl<S: LangevinStep> LangevinSampler<S> {
    /// Set up a chain starting from `init`.
    ///
    /// Configuration is validated here, before any iteration.
    pub fn new(
        model: SoftmaxModel,
        schedule: StepSchedule,
        args: SamplerArgs,
        strategy: S,
        init: SoftmaxParams,
    ) -> anyhow::Result<Self> {
        schedule.validate()?;
        args.validate()?;
        model.check_params(&init)?;

        let capacity = args.num_iter.div_ceil(args.record_stride);

        Ok(Self {
            model,
            schedule,
            args,
            strategy,
            current: init,
            history: McmcChain::with_capacity(capacity),
            state: SamplerState::Initialized,
            t: 0,
            n_attempted: 0,
            n_accepted: 0,
        })
    }

    pub fn model(&self) -> &SoftmaxModel {
        &self.model
    }

    pub fn args(&self) -> &SamplerArgs {
        &self.args
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Current position of the chain
    pub fn current(&self) -> &SoftmaxParams {
        &self.current
    }

    pub fn history(&self) -> &McmcChain<SoftmaxParams> {
        &self.history
    }

    /// Iterations taken so far
    pub fn iteration(&self) -> usize {
        self.t
    }

    /// Accepted / attempted transitions so far (1 before any attempt)
    pub fn acceptance_ratio(&self) -> f64 {
        if self.n_attempted == 0 {
            1.0
        } else {
            self.n_accepted as f64 / self.n_attempted as f64
        }
    }

    /// One transition. Fails once the chain has finished, after `run`
    /// or after thinning.
    pub fn iterate<R: Rng + ?Sized>(
        &mut self,
        data: &TrainingData,
        rng: &mut R,
    ) -> anyhow::Result<bool> {
        self.history.ensure_open()?;
        if self.state == SamplerState::Finished {
            anyhow::bail!("[{}] chain already finished", self.strategy.name());
        }

        if self.state != SamplerState::Iterating {
            self.model.evaluate(data, &mut self.current)?;
            self.state = SamplerState::Iterating;
        }

        let h = self.args.step_scaling * self.schedule.step_size(self.t, data.num_points());
        let iter = self.t;
        self.t += 1;

        let accepted = self
            .strategy
            .step(&self.model, data, &mut self.current, h, rng)?;

        self.n_attempted += 1;
        if accepted {
            self.n_accepted += 1;
        }

        if iter % self.args.record_stride == 0 {
            self.history.push(self.current.shallow_copy())?;
        }

        debug!(
            "[{}] iter {}: h = {:.3e}, U = {:.4}, accepted = {}",
            self.strategy.name(),
            iter,
            h,
            self.current.potential(),
            accepted
        );

        if self.args.report_interval > 0 && (iter + 1) % self.args.report_interval == 0 {
            info!(
                "[{}] iter {} / {}: U = {:.4}, h = {:.3e}, acceptance = {:.3}",
                self.strategy.name(),
                iter + 1,
                self.args.num_iter,
                self.current.potential(),
                h,
                self.acceptance_ratio()
            );
        }

        Ok(accepted)
    }

    /// Run `num_iter` transitions and report the acceptance ratio and
    /// the in-sample accuracy of the final state.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        data: &TrainingData,
        rng: &mut R,
    ) -> anyhow::Result<RunSummary> {
        let pb = ProgressBar::new(self.args.num_iter as u64);
        if self.args.verbose {
            pb.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} iterations ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
        } else {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }

        info!(
            "[{}] {} iterations on {} points, step scaling {}",
            self.strategy.name(),
            self.args.num_iter,
            data.num_points(),
            self.args.step_scaling
        );

        for _ in 0..self.args.num_iter {
            self.iterate(data, rng)?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        self.state = SamplerState::Finished;

        let final_accuracy = self.model.accuracy(data.x(), data.y(), &self.current)?;

        let summary = RunSummary {
            sampler: self.strategy.name(),
            num_iter: self.t,
            num_recorded: self.history.n_samples(),
            acceptance_ratio: self.acceptance_ratio(),
            final_accuracy,
            final_potential: self.current.potential(),
        };

        info!(
            "[{}] finished: acceptance {:.3}, final accuracy {:.1}%",
            summary.sampler,
            summary.acceptance_ratio,
            100.0 * summary.final_accuracy
        );

        Ok(summary)
    }

    /// Burn-in removal and thinning; at most once per chain. Further
    /// iterations fail afterwards.
    pub fn thin(&mut self, args: &ThinArgs) -> anyhow::Result<usize> {
        let n = self.history.thin(args)?;
        self.state = SamplerState::Finished;
        Ok(n)
    }

    /// Posterior mean and standard deviation of the output layer
    pub fn posterior_summary(&self) -> anyhow::Result<diagnostics::PosteriorSummary> {
        diagnostics::posterior_mean_and_sd(&self.history)
    }

    pub fn into_history(self) -> McmcChain<SoftmaxParams> {
        self.history
    }
}
