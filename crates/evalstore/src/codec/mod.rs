//! Line-oriented results file format
//!
//! Provides:
//! - Three header lines (run identity, parameters, scores and timings)
//! - One body line per prediction, or a metrics block for summary files
//! - The load-time consistency check between the declared and recomputed score
//! - File I/O with missing files reported apart from other failures

pub mod body;
pub mod header;
pub mod summary;


pub use header::Header;

use crate::config::{EvalContext, Warning};
use crate::error::{Result, ResultsError};
use crate::metrics::{self, ClassificationStats, ClusteringStats, RegressionStats};
use crate::models::{EstimatorKind, FileType, PredictionRecord};
use crate::observability::{ResultsMetrics, StructuredLogger};
use crate::predictions::PredictionLog;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

/// Tolerance between the score written on line 3 and the one recomputed from the body
pub const SCORE_EPS: f64 = 1e-8;

/// Stats read from a summary file
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryStats {
    Classification(ClassificationStats),
    Clustering(ClusteringStats),
    Regression(RegressionStats),
}

impl std::fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryStats::Classification(s) => s.fmt(f),
            SummaryStats::Clustering(s) => s.fmt(f),
            SummaryStats::Regression(s) => s.fmt(f),
        }
    }
}

/// A parsed results file
#[derive(Debug, Clone)]
pub struct ResultsFile {
    pub header: Header,
    /// Finalised for prediction files, record-free for summary files
    pub log: PredictionLog,
    /// Present only for summary files
    pub summary: Option<SummaryStats>,
}

/// Header plus one line per record
pub fn render_full(kind: EstimatorKind, header: &Header, records: &[PredictionRecord]) -> String {
    let mut out = header.render(kind);
    out.push_str(&body::render_all(kind, records));
    out
}

/// Header plus the metrics block
pub fn render_summary(kind: EstimatorKind, header: &Header, stats: &SummaryStats) -> String {
    let mut out = header.render(kind);
    out.push_str(&stats.to_string());
    out
}

/// Parse a complete results file held in memory
pub fn read_str(kind: EstimatorKind, text: &str, ctx: &mut EvalContext) -> Result<ResultsFile> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 3 {
        return Err(ResultsError::malformed(
            lines.len() + 1,
            "expected three header lines",
        ));
    }
    let header = Header::parse(kind, lines[0], lines[1], lines[2], ctx)?;

    match header.file_type {
        FileType::Compact => Err(ResultsError::UnsupportedFormat(FileType::Compact)),
        FileType::Metrics => read_summary(kind, header, &lines[3..], ctx),
        FileType::Predictions => read_predictions(kind, header, &lines[3..], ctx),
    }
}

fn read_summary(
    kind: EstimatorKind,
    header: Header,
    lines: &[&str],
    ctx: &EvalContext,
) -> Result<ResultsFile> {
    let (summary, num_instances, num_classes) = match kind {
        EstimatorKind::Classification => {
            let stats = summary::parse_classification(lines, 4)?;
            let (n, k) = (stats.num_instances, stats.num_classes);
            (SummaryStats::Classification(stats), n, k)
        }
        EstimatorKind::Clustering => {
            let stats = summary::parse_clustering(lines, 4)?;
            let (n, k) = (stats.num_instances, stats.num_clusters);
            (SummaryStats::Clustering(stats), n, k)
        }
        EstimatorKind::Regression => {
            let stats = summary::parse_regression(lines, 4)?;
            let n = stats.num_instances;
            (SummaryStats::Regression(stats), n, 0)
        }
    };
    let log = PredictionLog::without_records(
        ctx.config.clone(),
        header.metadata.clone(),
        num_instances,
        num_classes,
    );
    Ok(ResultsFile {
        header,
        log,
        summary: Some(summary),
    })
}

fn read_predictions(
    kind: EstimatorKind,
    header: Header,
    lines: &[&str],
    ctx: &mut EvalContext,
) -> Result<ResultsFile> {
    let mut expected_len = match kind {
        EstimatorKind::Classification => header.num_classes,
        EstimatorKind::Clustering => header.num_clusters,
        EstimatorKind::Regression => 0,
    };
    let mut log = PredictionLog::with_num_classes(ctx.config.clone(), expected_len);
    *log.metadata_mut() = header.metadata.clone();

    for (offset, line) in lines.iter().enumerate() {
        // Trailing blank lines end the body.
        if line.trim().is_empty() {
            break;
        }
        let record = body::parse(kind, offset + 4, line, expected_len)?;
        if expected_len == 0 {
            if let Some(dist) = &record.distribution {
                expected_len = dist.len();
            }
        }
        log.push_loaded(record)?;
    }
    log.finalize(None)?;

    let computed = match kind {
        EstimatorKind::Classification => log.label_match_accuracy()?,
        EstimatorKind::Clustering => metrics::clustering::accuracy(&log, header.num_classes)?,
        EstimatorKind::Regression => {
            metrics::regression::mse(&log.true_labels()?, &log.predicted_labels()?)
        }
    };
    let consistent = (header.score - computed).abs() <= SCORE_EPS;
    if !consistent {
        if kind == EstimatorKind::Regression {
            warn!(
                declared = header.score,
                computed = computed,
                "Calculated MSE differs from written MSE by more than {SCORE_EPS}"
            );
        } else {
            return Err(ResultsError::AccuracyMismatch {
                declared: header.score,
                computed,
                eps: SCORE_EPS,
            });
        }
    }

    if kind.has_distributions()
        && !log.has_probability_distribution_information()
        && ctx.config.print_dist_missing_warning
        && ctx.warnings.first_time(Warning::DistributionsMissing)
    {
        warn!(
            estimator = %header.metadata.estimator_name,
            dataset = %header.metadata.dataset_name,
            "Probability distributions missing from results, distribution-based stats cannot be computed"
        );
    }

    Ok(ResultsFile {
        header,
        log,
        summary: None,
    })
}

/// True when `path` is a regular, non-empty file
pub fn exists(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

fn read_to_string(path: &Path) -> Result<String> {
    if !exists(path) {
        return Err(ResultsError::FileNotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ResultsError::FileNotFound(path.to_path_buf())
        } else {
            ResultsError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Load and parse a results file, recording the outcome
pub fn read_file(kind: EstimatorKind, path: &Path, ctx: &mut EvalContext) -> Result<ResultsFile> {
    let outcome = read_to_string(path).and_then(|text| read_str(kind, &text, ctx));

    let metrics = ResultsMetrics::new();
    let logger = StructuredLogger::default();
    match &outcome {
        Ok(file) => {
            metrics.inc_files_loaded();
            logger.log_results_loaded(path, kind, file.header.file_type, file.log.num_instances());
        }
        Err(e) => {
            metrics.inc_load_failures();
            if ctx.config.print_on_load_failure {
                logger.log_load_failure(path, e.is_not_found(), &e.to_string());
            }
        }
    }
    outcome
}

/// Write rendered results to `path`, replacing any existing file
pub fn write_file(
    path: &Path,
    contents: &str,
    file_type: FileType,
    num_instances: usize,
) -> Result<()> {
    fs::write(path, contents).map_err(|source| ResultsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ResultsMetrics::new().inc_files_written();
    StructuredLogger::default().log_results_written(path, file_type, num_instances);
    Ok(())
}
