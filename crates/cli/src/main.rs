//! Estimator results CLI
//!
//! A command-line tool for inspecting, summarising and validating
//! classifier, clusterer and regressor results files.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use commands::{check, show, summarize};
use evalstore::{EstimatorKind, ResultsConfig};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Estimator results CLI
#[derive(Parser)]
#[command(name = "evalstore")]
#[command(author, version, about = "Inspect and validate estimator results files", long_about = None)]
pub struct Cli {
    /// Kind of estimator that produced the files (falls back to the config file, then classification)
    #[arg(long, short, env = "EVALSTORE_KIND")]
    pub kind: Option<KindArg>,

    /// Output format (falls back to the config file, then table)
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Reject zero or negative timings
    #[arg(long)]
    pub strict_timing: bool,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the metadata and statistics of a results file
    Show {
        /// Results file to read
        path: PathBuf,
    },

    /// Compute all statistics and write them as a summary (METRICS) file
    Summarize {
        /// Predictions file to read
        path: PathBuf,

        /// Where to write the summary; printed to stdout if not given
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Validate many results files concurrently
    Check {
        /// Results files to validate
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

/// Estimator kind as accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Classification,
    Clustering,
    Regression,
}

impl From<KindArg> for EstimatorKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Classification => EstimatorKind::Classification,
            KindArg::Clustering => EstimatorKind::Clustering,
            KindArg::Regression => EstimatorKind::Regression,
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let defaults = config::Config::load()?;
    let kind = match cli.kind {
        Some(kind) => kind.into(),
        None => defaults.kind()?,
    };
    let format = match cli.format {
        Some(format) => format,
        None => defaults.format()?,
    };
    let results_config = ResultsConfig::load()
        .context("Failed to read EVALSTORE_* configuration")?
        .with_strict_zero_timing(cli.strict_timing || defaults.strict_zero_timing.unwrap_or(false));
    debug!(kind = %kind, ?format, "Resolved CLI settings");

    match cli.command {
        Commands::Show { path } => {
            show::show_results(kind, &path, results_config, format)?;
        }
        Commands::Summarize { path, output } => {
            summarize::summarize_results(kind, &path, output.as_deref(), results_config, format)?;
        }
        Commands::Check { paths } => {
            check::check_files(kind, paths, results_config, format).await?;
        }
    }

    Ok(())
}
