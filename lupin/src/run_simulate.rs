//! `lupin simulate`: draw a synthetic mixture dataset for testing and
//! benchmarking.

use crate::common::*;

use clap::Parser;
use mixture_util::common_io::{mkdir, open_buf_writer, write_lines};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use std::io::Write;

#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// number of points
    #[arg(long, short = 'n', default_value_t = 1000)]
    num_points: usize,

    /// number of generating components
    #[arg(long, short = 'k', default_value_t = 8)]
    num_components: usize,

    /// dimensionality
    #[arg(long, short = 'd', default_value_t = 2)]
    num_dims: usize,

    /// component centres are drawn uniformly from `[-spread, spread]^D`
    #[arg(long, default_value_t = 10.0)]
    spread: f64,

    /// isotropic noise standard deviation around each centre
    #[arg(long, default_value_t = 1.0)]
    noise: f64,

    /// random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// output directory
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Serialize)]
struct SimulatedDataset {
    xn: Vec<Vec<f64>>,
}

/// Write `data.json` (the `xn` matrix) and `labels.tsv` (generating
/// component per point) under the output directory.
pub fn run_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    if args.num_components < 1 || args.num_dims < 1 {
        anyhow::bail!("need at least one component and one dimension");
    }
    if args.noise <= 0.0 {
        anyhow::bail!("noise standard deviation must be > 0");
    }

    let (xn, labels) = simulate(
        args.num_points,
        args.num_components,
        args.num_dims,
        args.spread,
        args.noise,
        args.seed,
    );

    info!(
        "simulated {} points x {} dims from {} components",
        args.num_points, args.num_dims, args.num_components
    );

    mkdir(&args.out)?;
    let mut buf = open_buf_writer(&format!("{}/data.json", args.out))?;
    serde_json::to_writer(&mut buf, &SimulatedDataset { xn })?;
    buf.flush()?;

    write_lines(&labels, &format!("{}/labels.tsv", args.out))?;

    info!("wrote dataset under {}", args.out);
    Ok(())
}

fn simulate(
    n: usize,
    k: usize,
    d: usize,
    spread: f64,
    noise: f64,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = SmallRng::seed_from_u64(seed);

    let centers: Vec<Vec<f64>> = (0..k)
        .map(|_| (0..d).map(|_| rng.random_range(-spread..spread)).collect())
        .collect();

    // noise sd validated > 0 by the caller
    let gauss = Normal::new(0.0, noise).unwrap();

    let mut xn = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let c = rng.random_range(0..k);
        labels.push(c);
        xn.push(
            centers[c]
                .iter()
                .map(|&m| m + gauss.sample(&mut rng))
                .collect(),
        );
    }
    (xn, labels)
}
