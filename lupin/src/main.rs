use lupin::run_fit::*;
use lupin::run_simulate::*;

use clap::{Parser, Subcommand};
use log::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LUPIN",
    long_about = "Lower-bound Updates for Posterior Inference in mixtures of Normals\n\
		  Fits a K-component Gaussian mixture by coordinate-ascent\n\
		  variational inference and reports the variational posterior."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit a Gaussian mixture to a dataset by CAVI
    Fit(FitArgs),

    /// Simulate a synthetic mixture dataset
    Simulate(SimulateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Fit(args) => {
            run_fit(args.clone())?;
        }
        Commands::Simulate(args) => {
            run_simulate(args.clone())?;
        }
    }

    info!("Done");
    Ok(())
}
