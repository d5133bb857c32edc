use clap::{Args, ValueEnum};
use lentil::common::*;
use lentil::data::one_hot;
use lentil::fit::fit_map;
use lentil::{
    LangevinSampler, LangevinStep, MalaSampler, RunSummary, SamplerArgs, SgldSampler,
    SoftmaxModel, SoftmaxParams, TrainingData,
};
use matrix_util::common_io::{open_buf_writer, read_lines};
use matrix_util::traits::{IoOps, MatOps};
use mcmc_util::{McmcChain, StepSchedule, ThinArgs};
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    #[arg(
        short = 'x',
        long,
        required = true,
        help = "Feature matrix file (`N x D`, header line of feature names)",
        long_help = "Feature matrix file, one row per entity and one column per feature.\n\
		     The first line holds the feature names. Gzipped files (`.gz`) are fine."
    )]
    pub features: Box<str>,

    #[arg(
        short = 'y',
        long,
        required = true,
        help = "Target matrix file (`N x B`, rows summing to one)",
        long_help = "Soft class-membership targets, one row per entity and one column\n\
		     per class, without a header. Each row should be a probability vector.\n\
		     With `--hard-labels` the file instead holds one class index per line."
    )]
    pub targets: Box<str>,

    /// targets file holds 0-based class labels, one per line
    #[arg(long, default_value_t = false)]
    pub hard_labels: bool,

    /// column delimiter of the input files
    #[arg(long, default_value_t = '\t')]
    pub delim: char,

    /// standardize each feature column before sampling
    #[arg(long, default_value_t = false)]
    pub scale_features: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// hidden layer sizes (comma-separated); none for a plain softmax
    /// regression
    #[arg(long, value_delimiter = ',')]
    pub hidden: Vec<usize>,

    /// standard deviation `σ` of the Gaussian prior on every weight
    #[arg(long, default_value_t = 10.0)]
    pub prior_sd: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    #[arg(
        short = 's',
        long,
        default_value_t = 1.0,
        help = "Step-size scaling",
        long_help = "Multiplies the annealed step size `a (b + t)^-gamma / N`.\n\
		     Smaller values raise the MALA acceptance rate at the cost of mixing."
    )]
    pub step_scaling: f64,

    /// annealing scale `a`
    #[arg(long, default_value_t = 250.0)]
    pub anneal_a: f64,

    /// annealing offset `b`
    #[arg(long, default_value_t = 1000.0)]
    pub anneal_b: f64,

    /// annealing exponent `gamma`
    #[arg(long, default_value_t = 0.8)]
    pub anneal_gamma: f64,

    /// number of sampling iterations
    #[arg(short = 't', long, default_value_t = 10000)]
    pub num_iter: usize,

    /// record every this many iterations while sampling
    #[arg(long, default_value_t = 1)]
    pub record_stride: usize,

    /// fraction of the recorded chain discarded as burn-in
    #[arg(long, default_value_t = 0.4)]
    pub burn_in: f64,

    /// keep every this many samples after burn-in
    #[arg(long, default_value_t = 10)]
    pub thin_factor: usize,

    /// log progress every this many iterations (0 = never)
    #[arg(long, default_value_t = 1000)]
    pub report_interval: usize,

    #[arg(
        long,
        default_value_t = 0,
        help = "Gradient-descent iterations before sampling",
        long_help = "Number of gradient-descent iterations on the per-point potential\n\
		     run before sampling, starting the chain near the MAP estimate.\n\
		     0 starts from a random initialisation."
    )]
    pub map_iter: usize,

    /// learning rate of the warm-start gradient descent
    #[arg(long, default_value_t = 0.1)]
    pub map_learning_rate: f64,

    /// random seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Method {
    Sgld,
    Mala,
}

impl ChainArgs {
    pub fn schedule(&self) -> anyhow::Result<StepSchedule> {
        StepSchedule::new(self.anneal_a, self.anneal_b, self.anneal_gamma)
    }

    pub fn sampler_args(&self, verbose: bool) -> SamplerArgs {
        SamplerArgs {
            step_scaling: self.step_scaling,
            num_iter: self.num_iter,
            record_stride: self.record_stride,
            report_interval: self.report_interval,
            verbose,
        }
    }

    pub fn thin_args(&self) -> anyhow::Result<ThinArgs> {
        let ret = ThinArgs {
            burn_in: self.burn_in,
            thin_factor: self.thin_factor,
        };
        ret.validate()?;
        Ok(ret)
    }
}

impl ModelArgs {
    /// `[D, hidden..., B]`
    pub fn build(&self, num_features: usize, num_classes: usize) -> anyhow::Result<SoftmaxModel> {
        let mut sizes = vec![num_features];
        sizes.extend(self.hidden.iter().copied());
        sizes.push(num_classes);
        SoftmaxModel::new(sizes, self.prior_sd)
    }
}

pub struct InputData {
    pub x: Mat,
    pub y: Mat,
    pub feature_names: Vec<Box<str>>,
}

fn read_hard_labels(file: &str) -> anyhow::Result<Mat> {
    let labels = read_lines(file)?
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .map(|s| {
            s.parse::<usize>()
                .map_err(|e| anyhow::anyhow!("invalid class label {:?} in {}: {}", s, file, e))
        })
        .collect::<anyhow::Result<Vec<usize>>>()?;

    let num_classes = labels.iter().max().map_or(0, |&k| k + 1);
    one_hot(&labels, num_classes)
}

pub fn read_input_data(args: &InputArgs) -> anyhow::Result<InputData> {
    let delim = [args.delim];

    let (mut x, feature_names) = Mat::read_file_delim_header(&args.features, &delim)?;

    let y = if args.hard_labels {
        read_hard_labels(&args.targets)?
    } else {
        Mat::read_file_delim(&args.targets, &delim, None)?
    };

    if args.scale_features {
        x.scale_columns_inplace();
    }

    info!(
        "read {} x {} features and {} x {} targets",
        x.nrows(),
        x.ncols(),
        y.nrows(),
        y.ncols()
    );

    Ok(InputData {
        x,
        y,
        feature_names,
    })
}

/// Column labels of the output layer: feature names for a plain
/// softmax regression, hidden-unit indices otherwise
pub fn output_layer_names(model: &SoftmaxModel, feature_names: &[Box<str>]) -> Vec<Box<str>> {
    if model.num_layers() == 1 {
        feature_names.to_vec()
    } else {
        let units = model.layer_sizes()[model.num_layers() - 1];
        (0..units)
            .map(|j| format!("h{}", j).into_boxed_str())
            .collect()
    }
}

/// A thinned chain with the diagnostics of the run that produced it
pub struct ChainOutput {
    pub run: RunSummary,
    pub history: McmcChain<SoftmaxParams>,
}

fn run_and_thin<S: LangevinStep, R: Rng + ?Sized>(
    mut sampler: LangevinSampler<S>,
    data: &TrainingData,
    thin: &ThinArgs,
    rng: &mut R,
) -> anyhow::Result<ChainOutput> {
    let run = sampler.run(data, rng)?;
    sampler.thin(thin)?;
    Ok(ChainOutput {
        run,
        history: sampler.into_history(),
    })
}

/// Initialise (optionally by gradient descent), sample, and thin one
/// chain
pub fn run_chain<R: Rng + ?Sized>(
    method: Method,
    model: &SoftmaxModel,
    data: &TrainingData,
    chain: &ChainArgs,
    verbose: bool,
    rng: &mut R,
) -> anyhow::Result<ChainOutput> {
    let schedule = chain.schedule()?;
    let args = chain.sampler_args(verbose);
    let thin = chain.thin_args()?;

    let mut init = model.init_params(rng);
    if chain.map_iter > 0 {
        fit_map(model, data, &mut init, chain.map_learning_rate, chain.map_iter)?;
    }

    match method {
        Method::Sgld => run_and_thin(
            SgldSampler::sgld(model.clone(), schedule, args, init)?,
            data,
            &thin,
            rng,
        ),
        Method::Mala => run_and_thin(
            MalaSampler::mala(model.clone(), schedule, args, init)?,
            data,
            &thin,
            rng,
        ),
    }
}

pub fn write_json<T: Serialize>(value: &T, file: &str) -> anyhow::Result<()> {
    let mut buf = open_buf_writer(file)?;
    serde_json::to_writer_pretty(&mut buf, value)?;
    writeln!(buf)?;
    buf.flush()?;
    info!("wrote {}", file);
    Ok(())
}
