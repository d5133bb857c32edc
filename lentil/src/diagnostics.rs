use crate::common::*;
use crate::data::{argmax_columns, argmax_rows};
use crate::gradient::log_likelihood;
use crate::model::SoftmaxModel;
use crate::param::SoftmaxParams;
use matrix_util::ndarray_stat::RunningStatistics;
use matrix_util::traits::{IoOps, RunningStatOps};
use mcmc_util::McmcChain;
use rayon::prelude::*;
use serde::Serialize;

/// Elementwise posterior mean and (population) standard deviation of
/// one weight matrix; rows are classes, columns are features for the
/// output layer of a single-layer classifier.
#[derive(Debug, Clone, Serialize)]
pub struct PosteriorSummary {
    pub mean: Mat,
    pub sd: Mat,
}

impl PosteriorSummary {
    pub fn num_classes(&self) -> usize {
        self.mean.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.mean.ncols()
    }

    /// Write `{prefix}.mean.tsv` and `{prefix}.sd.tsv`, one row per
    /// class, with feature names as the header
    pub fn to_tsv(&self, prefix: &str, feature_names: &[Box<str>]) -> anyhow::Result<()> {
        self.mean
            .write_file_delim(&format!("{}.mean.tsv", prefix), "\t", Some(feature_names))?;
        self.sd
            .write_file_delim(&format!("{}.sd.tsv", prefix), "\t", Some(feature_names))?;
        Ok(())
    }
}

fn check_not_empty(chain: &McmcChain<SoftmaxParams>) -> anyhow::Result<()> {
    if chain.is_empty() {
        anyhow::bail!("no samples in the history");
    }
    Ok(())
}

fn check_xy(model: &SoftmaxModel, x: &Mat, y: &Mat) -> anyhow::Result<()> {
    if x.nrows() == 0 {
        anyhow::bail!("empty data set");
    }
    if x.nrows() != y.nrows() {
        anyhow::bail!("{} feature rows vs. {} target rows", x.nrows(), y.nrows());
    }
    if y.ncols() != model.num_classes() {
        anyhow::bail!(
            "model has {} classes, targets have {}",
            model.num_classes(),
            y.ncols()
        );
    }
    Ok(())
}

/// Posterior summary of `W_l` across the history
pub fn posterior_mean_and_sd_layer(
    chain: &McmcChain<SoftmaxParams>,
    l: usize,
) -> anyhow::Result<PosteriorSummary> {
    check_not_empty(chain)?;
    let samples = chain.samples();
    let shape = samples[0].get(l)?.raw_dim();

    let mut stat = RunningStatistics::new(shape);
    for s in samples {
        stat.add(s.get(l)?)?;
    }

    Ok(PosteriorSummary {
        mean: stat.mean(),
        sd: stat.std(),
    })
}

/// Posterior summary of the output layer `W_L`, one entry per
/// `(class, input)` pair
pub fn posterior_mean_and_sd(chain: &McmcChain<SoftmaxParams>) -> anyhow::Result<PosteriorSummary> {
    check_not_empty(chain)?;
    let nlayers = chain.samples()[0].num_layers();
    posterior_mean_and_sd_layer(chain, nlayers)
}

/// Monte-Carlo estimate of the expected per-point negative
/// log-likelihood, optionally with the prior penalty spread over the
/// points, averaged over every sample in the history
pub fn average_loss_per_point(
    model: &SoftmaxModel,
    chain: &McmcChain<SoftmaxParams>,
    x: &Mat,
    y: &Mat,
    include_prior: bool,
) -> anyhow::Result<f64> {
    check_not_empty(chain)?;
    check_xy(model, x, y)?;
    let nn = x.nrows() as f64;

    let losses = chain
        .samples()
        .par_iter()
        .map(|s| -> anyhow::Result<f64> {
            let probs = model.predict_proba(x, s)?;
            let mut loss = -log_likelihood(&probs, y);
            if include_prior {
                loss -= model.log_prior(s);
            }
            Ok(loss / nn)
        })
        .collect::<anyhow::Result<Vec<f64>>>()?;

    Ok(losses.iter().sum::<f64>() / losses.len() as f64)
}

/// Per-class cross-entropy and accuracy; points belong to the class
/// their target row puts the most weight on
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub num_points: Vec<usize>,
    pub loss: Vec<f64>,
    pub accuracy: Vec<f64>,
}

/// Per-class Monte-Carlo loss and accuracy over the history. Classes
/// with no points report `NaN`.
pub fn per_class_loss_and_accuracy(
    model: &SoftmaxModel,
    chain: &McmcChain<SoftmaxParams>,
    x: &Mat,
    y: &Mat,
) -> anyhow::Result<ClassReport> {
    check_not_empty(chain)?;
    check_xy(model, x, y)?;

    let kk = model.num_classes();
    let membership = argmax_rows(y);
    let mut num_points = vec![0_usize; kk];
    for &k in membership.iter() {
        num_points[k] += 1;
    }

    // (Σ loss, Σ correct) per class for each sample
    let per_sample = chain
        .samples()
        .par_iter()
        .map(|s| -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
            let probs = model.predict_proba(x, s)?;
            let yhat = argmax_columns(&probs);
            let mut loss = vec![0.0; kk];
            let mut correct = vec![0.0; kk];
            for (n, &k) in membership.iter().enumerate() {
                let ce: f64 = y
                    .row(n)
                    .iter()
                    .enumerate()
                    .filter(|&(_, &y_nb)| y_nb != 0.0)
                    .map(|(b, &y_nb)| -y_nb * probs[[b, n]].max(f64::MIN_POSITIVE).ln())
                    .sum();
                loss[k] += ce;
                if yhat[n] == k {
                    correct[k] += 1.0;
                }
            }
            Ok((loss, correct))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let ns = per_sample.len() as f64;
    let mut loss = vec![0.0; kk];
    let mut accuracy = vec![0.0; kk];
    for (l, c) in per_sample.iter() {
        for k in 0..kk {
            loss[k] += l[k];
            accuracy[k] += c[k];
        }
    }

    for k in 0..kk {
        if num_points[k] == 0 {
            loss[k] = f64::NAN;
            accuracy[k] = f64::NAN;
        } else {
            let denom = ns * num_points[k] as f64;
            loss[k] /= denom;
            accuracy[k] /= denom;
        }
    }

    Ok(ClassReport {
        num_points,
        loss,
        accuracy,
    })
}

/// Per-class reports on a training and a held-out split
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub train: ClassReport,
    pub test: ClassReport,
}

pub fn per_class_split_report(
    model: &SoftmaxModel,
    chain: &McmcChain<SoftmaxParams>,
    train: (&Mat, &Mat),
    test: (&Mat, &Mat),
) -> anyhow::Result<SplitReport> {
    Ok(SplitReport {
        train: per_class_loss_and_accuracy(model, chain, train.0, train.1)?,
        test: per_class_loss_and_accuracy(model, chain, test.0, test.1)?,
    })
}

/// Class probabilities `(B × N)` averaged over the history
pub fn posterior_predictive(
    model: &SoftmaxModel,
    chain: &McmcChain<SoftmaxParams>,
    x: &Mat,
) -> anyhow::Result<Mat> {
    check_not_empty(chain)?;
    let probs = chain
        .samples()
        .par_iter()
        .map(|s| model.predict_proba(x, s))
        .collect::<anyhow::Result<Vec<Mat>>>()?;

    let mut avg = Mat::zeros((model.num_classes(), x.nrows()));
    for p in probs.iter() {
        avg += p;
    }
    avg /= probs.len() as f64;
    Ok(avg)
}

/// Accuracy of the posterior-averaged class probabilities
pub fn posterior_accuracy(
    model: &SoftmaxModel,
    chain: &McmcChain<SoftmaxParams>,
    x: &Mat,
    y: &Mat,
) -> anyhow::Result<f64> {
    check_xy(model, x, y)?;
    let yhat = argmax_columns(&posterior_predictive(model, chain, x)?);
    let ytrue = argmax_rows(y);
    let ncorrect = yhat.iter().zip(ytrue.iter()).filter(|(a, b)| a == b).count();
    Ok(ncorrect as f64 / x.nrows() as f64)
}
