//! `lupin fit`: run CAVI on a dataset and write the posterior
//! summaries.

use crate::cavi::{fit, CaviOptions, LogObserver, MixtureResult, SweepObserver};
use crate::common::*;
use crate::init::InitMethod;
use crate::input::read_dataset;
use crate::prior::PriorSpecification;

use clap::Parser;
use mixture_util::common_io::{mkdir, open_buf_writer, write_lines};
use mixture_util::dmatrix_io::DelimOps;
use serde::Serialize;
use std::io::Write;

#[derive(Parser, Debug, Clone)]
pub struct FitArgs {
    /// dataset file: JSON `{"xn": [[..], ..]}` (optionally gzipped),
    /// `.csv`, or tab-delimited text with one point per row
    #[arg(required = true)]
    data_file: Box<str>,

    /// number of mixture components
    #[arg(long, short = 'k', default_value_t = 8)]
    num_components: usize,

    /// maximum number of coordinate-ascent sweeps
    #[arg(long, default_value_t = 100)]
    max_iter: usize,

    /// convergence threshold on the bound delta
    #[arg(long, default_value_t = 1e-10)]
    threshold: f64,

    /// initialize responsibilities from Dirichlet draws instead of
    /// k-means
    #[arg(long, default_value_t = false)]
    random_init: bool,

    /// warm-start confidence on the k-means label
    #[arg(long, default_value_t = 0.9)]
    warm_confidence: f64,

    /// random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// recover degenerate scale matrices by adding a small multiple
    /// of the identity instead of aborting
    #[arg(long, default_value_t = false)]
    regularize: bool,

    /// Dirichlet concentration prior on mixture weights
    #[arg(long, default_value_t = 1.0)]
    alpha0: f64,

    /// prior precision scale
    #[arg(long, default_value_t = 0.7)]
    beta0: f64,

    /// Wishart degrees-of-freedom prior; defaults to D + 1
    #[arg(long)]
    nu0: Option<f64>,

    /// prior scale matrix is `w_scale * I`
    #[arg(long, default_value_t = 1.0)]
    w_scale: f64,

    /// output directory
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

/// Fit the mixture and write `elbo_trace.tsv`, `means.tsv`,
/// `covariances.tsv`, `responsibilities.tsv`, and `summary.json`
/// under the output directory.
pub fn run_fit(args: FitArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let data = read_dataset(&args.data_file)?;
    let (n, d) = (data.nrows(), data.ncols());
    info!("dataset: {} points x {} dims", n, d);

    let k = args.num_components;
    let prior = PriorSpecification::build(
        DVec::from_element(k, args.alpha0),
        args.nu0.unwrap_or((d + 1) as f64),
        Mat::identity(d, d) * args.w_scale,
        DVec::zeros(d),
        args.beta0,
    )?;

    let opts = CaviOptions {
        num_components: k,
        max_iter: args.max_iter,
        threshold: args.threshold,
        init: if args.random_init {
            InitMethod::Random
        } else {
            InitMethod::WarmStart
        },
        warm_confidence: args.warm_confidence,
        seed: args.seed,
        regularize: args.regularize,
    };

    let mut logger = LogObserver;
    let observer: Option<&mut dyn SweepObserver> = if args.verbose {
        Some(&mut logger)
    } else {
        None
    };

    let result = fit(&data, &prior, &opts, observer)?;

    log_results(&result);
    write_outputs(&result, &args.out)?;

    Ok(())
}

fn log_results(result: &MixtureResult) {
    let state = &result.state;
    info!(
        "{} after {} iterations, final elbo {:?}",
        result.termination,
        result.num_iterations,
        result.elbo_trace.last()
    );

    for k in 0..state.num_components() {
        let mu = state.posterior_mean(k);
        let sd: Vec<f64> = state
            .posterior_covariance(k)
            .diagonal()
            .iter()
            .map(|v| v.max(0.0).sqrt())
            .collect();
        info!("mu k{}: {:?}", k, mu.as_slice());
        info!("sd k{}: {:?}", k, sd);
    }
}

#[derive(Serialize)]
struct FitSummary {
    num_points: usize,
    num_dims: usize,
    num_components: usize,
    num_iterations: usize,
    termination: String,
    final_elbo: Option<f64>,
}

fn write_outputs(result: &MixtureResult, out_dir: &str) -> anyhow::Result<()> {
    mkdir(out_dir)?;
    let state = &result.state;
    let path = |file: &str| format!("{}/{}", out_dir, file);

    let trace: Vec<String> = result.elbo_trace.iter().map(|x| format!("{}", x)).collect();
    write_lines(&trace, &path("elbo_trace.tsv"))?;

    state.lambda_m.write_delim(&path("means.tsv"), "\t")?;
    state
        .lambda_phi
        .write_delim(&path("responsibilities.tsv"), "\t")?;

    // covariance point estimates, one commented block per component
    let mut cov_lines: Vec<String> = vec![];
    for k in 0..state.num_components() {
        cov_lines.push(format!("# component {}", k));
        for row in state.posterior_covariance(k).row_iter() {
            cov_lines.push(
                row.iter()
                    .map(|x| format!("{}", x))
                    .collect::<Vec<_>>()
                    .join("\t"),
            );
        }
    }
    write_lines(&cov_lines, &path("covariances.tsv"))?;

    let summary = FitSummary {
        num_points: state.num_points(),
        num_dims: state.num_dims(),
        num_components: state.num_components(),
        num_iterations: result.num_iterations,
        termination: result.termination.to_string(),
        final_elbo: result.elbo_trace.last().copied(),
    };
    let mut buf = open_buf_writer(&path("summary.json"))?;
    serde_json::to_writer_pretty(&mut buf, &summary)?;
    buf.flush()?;

    info!("wrote results under {}", out_dir);
    Ok(())
}
