//! Sampler-agnostic MCMC plumbing: sample histories with burn-in and
//! thinning, and step-size annealing schedules.

#![deny(missing_docs)]

/// Append-only sample history with one-shot thinning
pub mod chain;

/// Robbins-Monro step-size schedule
pub mod schedule;

/// What a sample must provide to be stored in a chain
pub mod traits;

pub use chain::{McmcChain, ThinArgs};
pub use schedule::StepSchedule;
pub use traits::ChainSample;
