use serde::Serialize;

/// Polynomially decaying step size
///
/// ```text
/// h(t) = a * (b + t)^(-γ) / n
/// ```
///
/// With `0.5 < γ ≤ 1` the sequence satisfies `Σ h(t) = ∞` and
/// `Σ h(t)² < ∞`, so the Langevin discretisation error vanishes as
/// `t → ∞`. `n` is the number of training points: the potential is a
/// sum over points, so its gradient grows linearly in `n`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepSchedule {
    /// scale
    pub a: f64,
    /// offset; keeps early steps from being too large
    pub b: f64,
    /// decay exponent
    pub gamma: f64,
}

impl Default for StepSchedule {
    fn default() -> Self {
        Self {
            a: 250.0,
            b: 1000.0,
            gamma: 0.8,
        }
    }
}

impl StepSchedule {
    /// Schedule with given constants
    pub fn new(a: f64, b: f64, gamma: f64) -> anyhow::Result<Self> {
        let ret = Self { a, b, gamma };
        ret.validate()?;
        Ok(ret)
    }

    /// Reject constants that do not give a positive, decreasing sequence
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.a.is_finite() && self.a > 0.0) {
            anyhow::bail!("step schedule: a must be positive, got {}", self.a);
        }
        if !(self.b.is_finite() && self.b > 0.0) {
            anyhow::bail!("step schedule: b must be positive, got {}", self.b);
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            anyhow::bail!("step schedule: gamma must be positive, got {}", self.gamma);
        }
        Ok(())
    }

    /// Step size at iteration `t` for a training set of `n` points
    pub fn step_size(&self, t: usize, n: usize) -> f64 {
        self.a * (self.b + t as f64).powf(-self.gamma) / (n.max(1) as f64)
    }
}
