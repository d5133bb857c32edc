use crate::run_common::*;
use clap::Args;
use lentil::common::*;
use lentil::data::random_split;
use lentil::diagnostics::*;
use lentil::selection::select_top;
use lentil::{SoftmaxModel, TrainingData};
use matrix_util::common_io::mkdir;
use matrix_util::ndarray_stat::RunningStatistics;
use matrix_util::traits::{RunningStatOps, SelectOps};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

#[derive(Args, Debug, Clone)]
pub struct ReduceArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub chain: ChainArgs,

    /// standard deviation `σ` of the Gaussian prior on every weight
    #[arg(long, default_value_t = 10.0)]
    pub prior_sd: f64,

    /// sampler for both the full and the reduced classifier
    #[arg(short, long, value_enum, default_value_t = Method::Mala)]
    pub method: Method,

    /// fraction of entities used for training; the rest are held out
    #[arg(short = 'f', long, default_value_t = 0.7)]
    pub train_fraction: f64,

    /// credible-interval half width in posterior standard deviations
    #[arg(short = 'k', long, default_value_t = 1.0)]
    pub sd_multiplier: f64,

    /// number of features `D'` kept for the reduced classifier
    #[arg(short = 'd', long, required = true)]
    pub num_keep: usize,

    /// step-size scaling of the reduced classifier (default: same as
    /// the full one)
    #[arg(long)]
    pub reduced_step_scaling: Option<f64>,

    /// repeat the whole experiment on fresh splits
    #[arg(short, long, default_value_t = 1)]
    pub repeats: usize,

    /// output file header
    #[arg(short, long, required = true)]
    pub out: Box<str>,

    /// show a progress bar and info-level logs
    #[arg(short, long)]
    pub verbose: bool,
}

/// One experiment: full classifier, top-`D'` selection, reduced
/// classifier, losses on both splits
#[derive(Serialize)]
struct RepeatReport {
    /// `[L0, L1, c*, L0', L1']`
    results: [f64; 5],
    full_acceptance: f64,
    reduced_acceptance: f64,
    kept_features: Vec<Box<str>>,
    per_class: SplitReport,
}

#[derive(Serialize)]
struct ReduceReport<'a> {
    method: Method,
    num_points: usize,
    num_features: usize,
    num_classes: usize,
    num_keep: usize,
    train_fraction: f64,
    seed: u64,
    result_names: [&'a str; 5],
    mean: Vec<f64>,
    sd: Vec<f64>,
    repeats: &'a [RepeatReport],
}

const RESULT_NAMES: [&str; 5] = ["L0", "L1", "c*", "L0'", "L1'"];

fn reduce_once(
    args: &ReduceArgs,
    x: &Mat,
    y: &Mat,
    feature_names: &[Box<str>],
    rng: &mut SmallRng,
) -> anyhow::Result<RepeatReport> {
    let (train, test) = random_split(x.nrows(), args.train_fraction, rng)?;
    if train.is_empty() || test.is_empty() {
        anyhow::bail!(
            "training fraction {} leaves {} training and {} test points",
            args.train_fraction,
            train.len(),
            test.len()
        );
    }

    let (x_train, y_train) = (x.select_rows(&train)?, y.select_rows(&train)?);
    let (x_test, y_test) = (x.select_rows(&test)?, y.select_rows(&test)?);

    // full classifier
    let model = SoftmaxModel::single_layer(x.ncols(), y.ncols(), args.prior_sd)?;
    let data = TrainingData::new(&model, &x_train, &y_train)?;
    let full = run_chain(args.method, &model, &data, &args.chain, args.verbose, rng)?;

    let l0 = average_loss_per_point(&model, &full.history, &x_train, &y_train, false)?;
    let l1 = average_loss_per_point(&model, &full.history, &x_test, &y_test, false)?;

    let per_class = per_class_split_report(
        &model,
        &full.history,
        (&x_train, &y_train),
        (&x_test, &y_test),
    )?;

    let summary = posterior_mean_and_sd(&full.history)?;
    let (kept, c_star) = select_top(&summary, args.sd_multiplier, args.num_keep)?;

    // reduced classifier on the kept features only
    let (rx_train, rx_test) = (x_train.select_columns(&kept)?, x_test.select_columns(&kept)?);
    let reduced_model = SoftmaxModel::single_layer(kept.len(), y.ncols(), args.prior_sd)?;
    let reduced_data = TrainingData::new(&reduced_model, &rx_train, &y_train)?;

    let mut reduced_chain = args.chain.clone();
    if let Some(s) = args.reduced_step_scaling {
        reduced_chain.step_scaling = s;
    }
    let reduced = run_chain(
        args.method,
        &reduced_model,
        &reduced_data,
        &reduced_chain,
        args.verbose,
        rng,
    )?;

    let rl0 = average_loss_per_point(&reduced_model, &reduced.history, &rx_train, &y_train, false)?;
    let rl1 = average_loss_per_point(&reduced_model, &reduced.history, &rx_test, &y_test, false)?;

    let results = [l0, l1, c_star, rl0, rl1];
    info!("{:?} = {:?}", RESULT_NAMES, results);

    Ok(RepeatReport {
        results,
        full_acceptance: full.run.acceptance_ratio,
        reduced_acceptance: reduced.run.acceptance_ratio,
        kept_features: kept.iter().map(|&d| feature_names[d].clone()).collect(),
        per_class,
    })
}

pub fn run_reduce(args: &ReduceArgs) -> anyhow::Result<()> {
    let InputData {
        x,
        y,
        feature_names,
    } = read_input_data(&args.input)?;

    if feature_names.len() != x.ncols() {
        anyhow::bail!(
            "{} feature names for {} feature columns",
            feature_names.len(),
            x.ncols()
        );
    }
    if args.num_keep == 0 {
        anyhow::bail!("must keep at least one feature");
    }
    if args.repeats == 0 {
        anyhow::bail!("need at least one repeat");
    }

    let mut rng = SmallRng::seed_from_u64(args.chain.seed);
    let mut stat = RunningStatistics::new(Ix1(RESULT_NAMES.len()));
    let mut repeats = Vec::with_capacity(args.repeats);

    for r in 0..args.repeats {
        info!("experiment {} / {}", r + 1, args.repeats);
        let rep = reduce_once(args, &x, &y, &feature_names, &mut rng)?;
        stat.add(&arr1(&rep.results))?;
        repeats.push(rep);
    }

    mkdir(&args.out)?;

    let names: Vec<Box<str>> = RESULT_NAMES.iter().map(|&s| s.into()).collect();
    stat.save(&format!("{}.results.tsv", args.out), &names, "\t")?;

    let report = ReduceReport {
        method: args.method,
        num_points: x.nrows(),
        num_features: x.ncols(),
        num_classes: y.ncols(),
        num_keep: args.num_keep,
        train_fraction: args.train_fraction,
        seed: args.chain.seed,
        result_names: RESULT_NAMES,
        mean: stat.mean().to_vec(),
        sd: stat.std().to_vec(),
        repeats: &repeats,
    };
    write_json(&report, &format!("{}.json", args.out))?;

    Ok(())
}
