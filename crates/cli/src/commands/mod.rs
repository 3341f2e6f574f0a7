//! CLI subcommands

pub mod check;
pub mod show;
pub mod summarize;

use anyhow::{Context, Result};
use evalstore::{EstimatorKind, EstimatorResults, EvalContext, ResultsConfig};
use std::path::Path;

/// Load a results file of the given kind with a fresh evaluation context
pub fn load(kind: EstimatorKind, path: &Path, config: ResultsConfig) -> Result<EstimatorResults> {
    let mut ctx = EvalContext::new(config);
    EstimatorResults::load_from_file(kind, path, &mut ctx)
        .with_context(|| format!("Failed to load {} results from {}", kind, path.display()))
}
