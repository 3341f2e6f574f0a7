//! Validate many results files concurrently

use anyhow::{bail, Result};
use evalstore::{EstimatorKind, ResultsConfig, ResultsError, TimedRun};
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;
use tracing::warn;

use crate::output::{color_status, format_score, print_error, print_success, print_table, OutputFormat};

/// Outcome of checking one file
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct CheckRow {
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Status", display_with = "color_status")]
    pub status: String,
    #[tabled(rename = "Instances")]
    pub instances: usize,
    #[tabled(rename = "Score")]
    pub score: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

fn check_one(kind: EstimatorKind, path: PathBuf, config: ResultsConfig) -> CheckRow {
    let file = path.display().to_string();
    match super::load(kind, &path, config) {
        Ok(results) => {
            let results = results.as_scored();
            CheckRow {
                file,
                status: "ok".to_string(),
                instances: results.num_instances(),
                score: format_score(results.primary_score()),
                detail: String::new(),
            }
        }
        Err(err) => {
            let missing = err
                .downcast_ref::<ResultsError>()
                .is_some_and(ResultsError::is_not_found);
            CheckRow {
                file,
                status: if missing { "missing" } else { "invalid" }.to_string(),
                instances: 0,
                score: format_score(None),
                detail: format!("{:#}", err),
            }
        }
    }
}

/// Check every file on the blocking pool and report in input order
pub async fn check_files(
    kind: EstimatorKind,
    paths: Vec<PathBuf>,
    config: ResultsConfig,
    format: OutputFormat,
) -> Result<()> {
    let handles: Vec<_> = paths
        .into_iter()
        .map(|path| tokio::task::spawn_blocking(move || check_one(kind, path, config)))
        .collect();

    let mut rows = Vec::with_capacity(handles.len());
    for handle in handles {
        rows.push(handle.await?);
    }

    print_table(&rows, format);

    let failed = rows.iter().filter(|r| r.status != "ok").count();
    if failed > 0 {
        warn!(failed, total = rows.len(), "Results check failed");
        if matches!(format, OutputFormat::Table) {
            print_error(&format!("{} of {} files failed", failed, rows.len()));
        }
        bail!("{} results file(s) failed validation", failed);
    }
    if matches!(format, OutputFormat::Table) {
        print_success(&format!("All {} files valid", rows.len()));
    }
    Ok(())
}
