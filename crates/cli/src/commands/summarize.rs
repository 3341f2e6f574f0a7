//! Turn a predictions file into a summary (METRICS) file

use anyhow::{Context, Result};
use evalstore::{EstimatorKind, ResultsConfig, ScoredRun, TimedRun};
use serde_json::json;
use std::path::Path;

use crate::output::{print_success, OutputFormat};

/// Compute all stats of a results file and write or print the summary
pub fn summarize_results(
    kind: EstimatorKind,
    path: &Path,
    output: Option<&Path>,
    config: ResultsConfig,
    format: OutputFormat,
) -> Result<()> {
    let mut loaded = super::load(kind, path, config)?;
    let results = loaded.as_scored_mut();

    match output {
        Some(target) => {
            results
                .write_summary_results_to_file(target)
                .with_context(|| format!("Failed to write summary to {}", target.display()))?;
            match format {
                OutputFormat::Json => {
                    let value = json!({
                        "source": path,
                        "summary": target,
                        "num_instances": results.num_instances(),
                    });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                OutputFormat::Table => {
                    print_success(&format!("Summary written to {}", target.display()));
                }
            }
        }
        None => {
            let summary = results.write_summary_results_to_string()?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&results.stats_json())?);
                }
                OutputFormat::Table => print!("{}", summary),
            }
        }
    }

    Ok(())
}
