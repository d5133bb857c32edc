mod run_common;
mod run_reduce;
mod run_sample;

use clap::{Parser, Subcommand};
use log::info;
use run_common::Method;
use run_reduce::*;
use run_sample::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LENTIL",
    long_about = "Langevin samplers for Bayesian softmax classification\n\
		  Sample the posterior of classifier weights given per-entity features\n\
		  and soft class-membership targets, then select the features whose\n\
		  credible intervals clear a null band."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Sample with unadjusted Langevin dynamics (SGLD)",
        long_about = "Sample the weight posterior by unadjusted Langevin dynamics:\n\
		      (1) Take annealed gradient steps with Gaussian noise\n\
		      (2) Discard burn-in and thin the chain\n\
		      (3) Summarise the posterior and select features.\n"
    )]
    Sgld(SampleArgs),

    #[command(
        about = "Sample with Metropolis-adjusted Langevin (MALA)",
        long_about = "Sample the weight posterior by Metropolis-adjusted Langevin:\n\
		      (1) Propose Langevin moves and accept or reject them\n\
		      (2) Discard burn-in and thin the chain\n\
		      (3) Summarise the posterior and select features.\n"
    )]
    Mala(SampleArgs),

    #[command(
        about = "Feature-reduction experiment on a train/test split",
        long_about = "Split the data, sample a classifier on all features, keep the\n\
		      top D' features by credible interval, sample a reduced classifier,\n\
		      and report [L0, L1, c*, L0', L1'] with per-class loss and accuracy.\n"
    )]
    Reduce(ReduceArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Sgld(args) | Commands::Mala(args) => args.verbose,
            Commands::Reduce(args) => args.verbose,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.commands.verbose() && std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    match &cli.commands {
        Commands::Sgld(args) => {
            run_sample(Method::Sgld, args)?;
        }
        Commands::Mala(args) => {
            run_sample(Method::Mala, args)?;
        }
        Commands::Reduce(args) => {
            run_reduce(args)?;
        }
    }

    info!("Done");
    Ok(())
}
