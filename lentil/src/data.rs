use crate::common::*;
use crate::model::SoftmaxModel;
use rand::seq::SliceRandom;

/// Row sums of a target matrix may deviate from one by this much
pub const TARGET_ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Features `X (N × D)` and soft targets `Y (N × B)` checked against
/// a model. Both are borrowed and never modified, so one data set can
/// back any number of independent chains.
#[derive(Debug, Clone, Copy)]
pub struct TrainingData<'a> {
    x: &'a Mat,
    y: &'a Mat,
}

impl<'a> TrainingData<'a> {
    /// Reject empty or mis-shaped data before any iteration begins.
    /// Target rows that do not sum to one are only reported.
    pub fn new(model: &SoftmaxModel, x: &'a Mat, y: &'a Mat) -> anyhow::Result<Self> {
        if x.nrows() == 0 {
            anyhow::bail!("empty training set");
        }
        if x.nrows() != y.nrows() {
            anyhow::bail!(
                "features have {} rows but targets have {}",
                x.nrows(),
                y.nrows()
            );
        }
        if x.ncols() != model.num_features() {
            anyhow::bail!(
                "model expects {} features, data have {}",
                model.num_features(),
                x.ncols()
            );
        }
        if y.ncols() != model.num_classes() {
            anyhow::bail!(
                "model expects {} classes, targets have {}",
                model.num_classes(),
                y.ncols()
            );
        }

        let nbad = count_malformed_rows(y, TARGET_ROW_SUM_TOLERANCE);
        if nbad > 0 {
            warn!(
                "{} of {} target rows are not probability vectors",
                nbad,
                y.nrows()
            );
        }

        Ok(Self { x, y })
    }

    pub fn x(&self) -> &'a Mat {
        self.x
    }

    pub fn y(&self) -> &'a Mat {
        self.y
    }

    /// `N`
    pub fn num_points(&self) -> usize {
        self.x.nrows()
    }
}

/// Rows with a negative entry or a sum away from one
pub fn count_malformed_rows(y: &Mat, tol: f64) -> usize {
    y.rows()
        .into_iter()
        .filter(|row| row.iter().any(|&v| !(v >= 0.0)) || (row.sum() - 1.0).abs() > tol)
        .count()
}

/// Turn a hard partition into a target matrix with a single one per row
pub fn one_hot(labels: &[usize], num_classes: usize) -> anyhow::Result<Mat> {
    let mut y = Mat::zeros((labels.len(), num_classes));
    for (i, &k) in labels.iter().enumerate() {
        if k >= num_classes {
            anyhow::bail!("label {} at row {} exceeds {} classes", k, i, num_classes);
        }
        y[[i, k]] = 1.0;
    }
    Ok(y)
}

/// Index of the largest entry in each row (first one on ties)
pub fn argmax_rows(y: &Mat) -> Vec<usize> {
    y.rows().into_iter().map(|row| argmax(row.iter())).collect()
}

/// Index of the largest entry in each column (first one on ties)
pub fn argmax_columns(a: &Mat) -> Vec<usize> {
    a.columns().into_iter().map(|col| argmax(col.iter())).collect()
}

fn argmax<'b>(values: impl Iterator<Item = &'b f64>) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (k, &v) in values.enumerate() {
        if v > best_val {
            best = k;
            best_val = v;
        }
    }
    best
}

/// Randomly split `0..n` into `⌊n · fraction⌋` training indices and
/// the remaining test indices
pub fn random_split<R: Rng + ?Sized>(
    n: usize,
    fraction: f64,
    rng: &mut R,
) -> anyhow::Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..=1.0).contains(&fraction) {
        anyhow::bail!("training fraction must be in [0, 1], got {}", fraction);
    }
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let m = ((n as f64) * fraction).floor() as usize;
    let test = indices.split_off(m);
    Ok((indices, test))
}
