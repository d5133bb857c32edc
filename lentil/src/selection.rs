//! Feature selection from posterior credible intervals.
//!
//! For class `b` and feature `d` the credible interval is
//! `[m - k·s, m + k·s]` with `m`, `s` the posterior mean and standard
//! deviation of `W[b,d]`. The class shows an effect of the feature if
//! the interval clears the null band `[-c, c]` entirely.

use crate::common::*;
use crate::diagnostics::PosteriorSummary;
use serde::Serialize;

/// How to decide which features to keep
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SelectionPolicy {
    /// keep a feature iff at least one class shows an effect outside
    /// `[-null_width, null_width]`
    AllOrNothing { null_width: f64 },
    /// keep the `num_keep` features with the strongest effect
    Top { num_keep: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSelection {
    /// kept feature indices, ascending
    pub kept: Vec<usize>,
    /// under [`SelectionPolicy::Top`], the smallest kept score `c*`
    pub cutoff: Option<f64>,
}

fn check_multiplier(k: f64) -> anyhow::Result<()> {
    if !(k.is_finite() && k >= 0.0) {
        anyhow::bail!("credible-interval multiplier must be non-negative, got {}", k);
    }
    Ok(())
}

/// Distance of each `(class, feature)` interval from zero; 0 when the
/// interval contains zero
pub fn inner_bounds(summary: &PosteriorSummary, k: f64) -> Mat {
    let mut inner = Mat::zeros(summary.mean.dim());
    Zip::from(&mut inner)
        .and(&summary.mean)
        .and(&summary.sd)
        .for_each(|x, &m, &s| {
            let lb = m - k * s;
            let ub = m + k * s;
            *x = if lb > 0.0 {
                lb
            } else if ub < 0.0 {
                -ub
            } else {
                0.0
            };
        });
    inner
}

/// Strongest effect of each feature across classes
pub fn feature_scores(summary: &PosteriorSummary, k: f64) -> Vec<f64> {
    inner_bounds(summary, k)
        .columns()
        .into_iter()
        .map(|col| col.fold(0.0_f64, |acc, &v| acc.max(v)))
        .collect()
}

/// Keep feature `d` iff some class has its interval entirely above
/// `c` or entirely below `-c`
pub fn select_all_or_nothing(
    summary: &PosteriorSummary,
    k: f64,
    null_width: f64,
) -> anyhow::Result<Vec<usize>> {
    check_multiplier(k)?;
    if !(null_width.is_finite() && null_width >= 0.0) {
        anyhow::bail!("null width must be non-negative, got {}", null_width);
    }
    let kept: Vec<usize> = feature_scores(summary, k)
        .into_iter()
        .enumerate()
        .filter(|&(_, score)| score > null_width)
        .map(|(d, _)| d)
        .collect();

    info!(
        "kept {} / {} features (k = {}, c = {})",
        kept.len(),
        summary.num_features(),
        k,
        null_width
    );
    Ok(kept)
}

/// Keep the `num_keep` highest-scoring features; ties go to the lower
/// index. Returns the kept indices in ascending order and the implied
/// cutoff `c*`, the smallest kept score.
pub fn select_top(
    summary: &PosteriorSummary,
    k: f64,
    num_keep: usize,
) -> anyhow::Result<(Vec<usize>, f64)> {
    check_multiplier(k)?;
    if num_keep == 0 {
        anyhow::bail!("must keep at least one feature");
    }

    let scores = feature_scores(summary, k);
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order.truncate(num_keep.min(scores.len()));

    let cutoff = order
        .iter()
        .map(|&d| scores[d])
        .fold(f64::INFINITY, f64::min);

    order.sort_unstable();

    info!(
        "kept the top {} / {} features, c* = {:.4}",
        order.len(),
        scores.len(),
        cutoff
    );
    Ok((order, cutoff))
}

pub fn select_features(
    summary: &PosteriorSummary,
    k: f64,
    policy: SelectionPolicy,
) -> anyhow::Result<FeatureSelection> {
    match policy {
        SelectionPolicy::AllOrNothing { null_width } => Ok(FeatureSelection {
            kept: select_all_or_nothing(summary, k, null_width)?,
            cutoff: None,
        }),
        SelectionPolicy::Top { num_keep } => {
            let (kept, cutoff) = select_top(summary, k, num_keep)?;
            Ok(FeatureSelection {
                kept,
                cutoff: Some(cutoff),
            })
        }
    }
}
