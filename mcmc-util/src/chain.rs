use crate::traits::ChainSample;
use log::info;
use serde::Serialize;

/// Burn-in and thinning applied once sampling has finished.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThinArgs {
    /// fraction of the chain, from the start, to discard (`0 ≤ burn_in < 1`)
    pub burn_in: f64,
    /// keep every `thin_factor`-th remaining sample (`≥ 1`)
    pub thin_factor: usize,
}

impl Default for ThinArgs {
    fn default() -> Self {
        Self {
            burn_in: 0.4,
            thin_factor: 10,
        }
    }
}

impl ThinArgs {
    /// Reject a burn-in outside `[0, 1)` or a zero thinning factor
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..1.0).contains(&self.burn_in) {
            anyhow::bail!("burn-in fraction must be in [0, 1), got {}", self.burn_in);
        }
        if self.thin_factor == 0 {
            anyhow::bail!("thinning factor must be at least 1");
        }
        Ok(())
    }
}

/// Collected MCMC samples in the order they were recorded.
///
/// The chain is append-only while sampling. [`McmcChain::thin`] may be
/// applied exactly once; afterwards the chain is read-only and any
/// further `push` or `thin` is an error.
#[derive(Debug, Clone)]
pub struct McmcChain<P: ChainSample> {
    samples: Vec<P>,
    thinned: bool,
}

impl<P: ChainSample> Default for McmcChain<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ChainSample> McmcChain<P> {
    /// Empty chain
    pub fn new() -> Self {
        Self {
            samples: vec![],
            thinned: false,
        }
    }

    /// Empty chain with room for `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            thinned: false,
        }
    }

    /// Number of recorded samples
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True once [`McmcChain::thin`] has been applied
    pub fn is_thinned(&self) -> bool {
        self.thinned
    }

    /// Fail if the chain no longer accepts samples
    pub fn ensure_open(&self) -> anyhow::Result<()> {
        if self.thinned {
            anyhow::bail!("history already thinned; the chain is read-only");
        }
        Ok(())
    }

    /// Append a sample
    pub fn push(&mut self, sample: P) -> anyhow::Result<()> {
        self.ensure_open()?;
        self.samples.push(sample);
        Ok(())
    }

    /// Recorded samples, oldest first
    pub fn samples(&self) -> &[P] {
        &self.samples
    }

    /// The potential `U` of every recorded sample
    pub fn potentials(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.potential()).collect()
    }

    /// Drop the first `burn_in` fraction of samples, then keep every
    /// `thin_factor`-th of the rest, starting with the first one.
    ///
    /// A non-empty chain stays non-empty. Returns the number of
    /// samples kept.
    pub fn thin(&mut self, args: &ThinArgs) -> anyhow::Result<usize> {
        self.ensure_open()?;
        args.validate()?;

        let ntot = self.samples.len();
        let nburn = ((ntot as f64) * args.burn_in).floor() as usize;
        let nburn = nburn.min(ntot.saturating_sub(1));

        let kept: Vec<P> = self
            .samples
            .drain(..)
            .skip(nburn)
            .step_by(args.thin_factor)
            .collect();

        self.samples = kept;
        self.thinned = true;

        info!(
            "thinned the chain: {} -> {} samples (burn-in {}, every {})",
            ntot,
            self.samples.len(),
            nburn,
            args.thin_factor
        );

        Ok(self.samples.len())
    }
}
