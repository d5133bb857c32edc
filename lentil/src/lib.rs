//! Bayesian softmax classification by Langevin posterior sampling.
//!
//! Given per-entity features `X (N × D)` and soft class-membership
//! targets `Y (N × B)`, draw samples of the classifier weights from
//! their posterior under an isotropic Gaussian prior, then summarise
//! the chain: posterior mean and spread per `(class, feature)`,
//! credible-interval feature selection, Monte-Carlo loss and accuracy.
//!
//! # Model
//!
//! ```text
//! A_0 = Xᵗ
//! A_l = logistic(W_l A_{l-1})        l = 1..L-1
//! A_L = softmax(W_L A_{L-1})
//! U(θ) = -Σ_n Σ_b Y_nb log A_L[b,n] + Σ_l ‖W_l‖² / 2σ²
//! ```
//!
//! Two samplers share the same forward/backward evaluation: SGLD
//! (unadjusted, every proposal accepted) and MALA (Metropolis-adjusted).

pub mod common;

/// Training data and target-matrix helpers
pub mod data;

/// Posterior summaries, losses, and accuracies over a sample history
pub mod diagnostics;

/// Gradient descent to a point estimate
pub mod fit;

/// Forward evaluation of class probabilities
pub mod forward;

/// Potential `U` and its gradient
pub mod gradient;

/// Metropolis-adjusted Langevin transitions
pub mod mala;

/// Network shape and prior
pub mod model;

/// Weights, cached activations, gradients, and potential
pub mod param;

/// The sampling loop shared by every Langevin variant
pub mod sampler;

/// Credible-interval feature selection
pub mod selection;

/// Unadjusted Langevin transitions
pub mod sgld;

pub use data::TrainingData;
pub use mala::{Mala, MalaSampler};
pub use model::SoftmaxModel;
pub use param::SoftmaxParams;
pub use sampler::{LangevinSampler, LangevinStep, RunSummary, SamplerArgs};
pub use sgld::{Sgld, SgldSampler};
