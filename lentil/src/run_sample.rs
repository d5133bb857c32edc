use crate::run_common::*;
use clap::Args;
use lentil::common::*;
use lentil::diagnostics::*;
use lentil::selection::{select_features, FeatureSelection, SelectionPolicy};
use lentil::{RunSummary, SoftmaxModel, TrainingData};
use matrix_util::common_io::{mkdir, write_lines, write_types};
use mcmc_util::{StepSchedule, ThinArgs};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

#[derive(Args, Debug, Clone)]
pub struct SampleArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub chain: ChainArgs,

    /// credible-interval half width in posterior standard deviations
    #[arg(short = 'k', long, default_value_t = 1.0)]
    pub sd_multiplier: f64,

    #[arg(
        short = 'c',
        long,
        default_value_t = 0.0,
        conflicts_with = "num_keep",
        help = "Null width `c` of the all-or-nothing selection",
        long_help = "Keep a feature if, for at least one class, its credible interval\n\
		     lies entirely above `c` or entirely below `-c`."
    )]
    pub null_width: f64,

    /// keep the `D'` features with the strongest effect instead
    #[arg(short = 'd', long)]
    pub num_keep: Option<usize>,

    /// output file header
    #[arg(short, long, required = true)]
    pub out: Box<str>,

    /// show a progress bar and info-level logs
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Serialize)]
struct SampleReport<'a> {
    method: Method,
    model: &'a SoftmaxModel,
    schedule: StepSchedule,
    thin: ThinArgs,
    seed: u64,
    run: &'a RunSummary,
    num_thinned_samples: usize,
    average_loss_per_point: f64,
    posterior_accuracy: f64,
    per_class: &'a ClassReport,
    selection: &'a FeatureSelection,
    kept_features: &'a [Box<str>],
}

pub fn run_sample(method: Method, args: &SampleArgs) -> anyhow::Result<()> {
    let InputData {
        x,
        y,
        feature_names,
    } = read_input_data(&args.input)?;

    let model = args.model.build(x.ncols(), y.ncols())?;
    let data = TrainingData::new(&model, &x, &y)?;

    if feature_names.len() != x.ncols() {
        anyhow::bail!(
            "{} feature names for {} feature columns",
            feature_names.len(),
            x.ncols()
        );
    }

    let policy = match args.num_keep {
        Some(num_keep) => SelectionPolicy::Top { num_keep },
        None => SelectionPolicy::AllOrNothing {
            null_width: args.null_width,
        },
    };

    let mut rng = SmallRng::seed_from_u64(args.chain.seed);

    let ChainOutput { run, history } =
        run_chain(method, &model, &data, &args.chain, args.verbose, &mut rng)?;

    let summary = posterior_mean_and_sd(&history)?;
    let loss = average_loss_per_point(&model, &history, &x, &y, false)?;
    let accuracy = posterior_accuracy(&model, &history, &x, &y)?;
    let per_class = per_class_loss_and_accuracy(&model, &history, &x, &y)?;

    info!(
        "posterior: {} samples, loss per point {:.4}, accuracy {:.1}%",
        history.n_samples(),
        loss,
        100.0 * accuracy
    );

    let selection = select_features(&summary, args.sd_multiplier, policy)?;

    let column_names = output_layer_names(&model, &feature_names);
    let kept_features: Vec<Box<str>> = selection
        .kept
        .iter()
        .map(|&d| column_names[d].clone())
        .collect();

    mkdir(&args.out)?;

    summary.to_tsv(&format!("{}.posterior", args.out), &column_names)?;
    write_lines(&kept_features, &format!("{}.kept.txt", args.out))?;
    write_types(&history.potentials(), &format!("{}.potential.tsv", args.out))?;

    let report = SampleReport {
        method,
        model: &model,
        schedule: args.chain.schedule()?,
        thin: args.chain.thin_args()?,
        seed: args.chain.seed,
        run: &run,
        num_thinned_samples: history.n_samples(),
        average_loss_per_point: loss,
        posterior_accuracy: accuracy,
        per_class: &per_class,
        selection: &selection,
        kept_features: &kept_features,
    };
    write_json(&report, &format!("{}.json", args.out))?;

    Ok(())
}
