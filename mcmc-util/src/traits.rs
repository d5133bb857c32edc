/// A single state recorded in an [`McmcChain`](crate::McmcChain).
///
/// The potential is the negative log of the unnormalized target
/// density, `U(θ) = -log π(θ)`, evaluated at the recorded state.
pub trait ChainSample: Clone {
    /// `U` at this state
    fn potential(&self) -> f64;
}

impl ChainSample for f64 {
    fn potential(&self) -> f64 {
        *self
    }
}
