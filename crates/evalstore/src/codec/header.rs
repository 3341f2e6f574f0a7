//! The three metadata lines at the top of every results file

use crate::config::{EvalContext, Warning};
use crate::error::{Result, ResultsError};
use crate::models::{EstimatorKind, FileType, RunMetadata, TimeUnit};
use std::str::FromStr;
use tracing::warn;

const LEGACY_BUILD_TIME_KEY: &str = "BuildTime";

/// Parsed header lines
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub metadata: RunMetadata,
    pub file_type: FileType,
    /// Accuracy for classification/clustering, MSE for regression
    pub score: f64,
    /// Classes for classification and clustering, 0 when unknown
    pub num_classes: usize,
    /// Clusters for clustering, 0 otherwise
    pub num_clusters: usize,
}

impl Header {
    pub fn new(metadata: RunMetadata, file_type: FileType) -> Self {
        Self {
            metadata,
            file_type,
            score: -1.0,
            num_classes: 0,
            num_clusters: 0,
        }
    }

    /// Render all three lines, each newline-terminated
    pub fn render(&self, kind: EstimatorKind) -> String {
        let m = &self.metadata;
        let third = match kind {
            EstimatorKind::Classification => format!(
                "{},{},{},{},{},{},{},{},{}",
                self.score,
                m.build_time,
                m.test_time,
                m.benchmark_time,
                m.memory_bytes,
                self.num_classes,
                m.error_estimate_method,
                m.error_estimate_time,
                m.build_plus_estimate_time
            ),
            EstimatorKind::Clustering => format!(
                "{},{},{},{},{},{},{}",
                self.score,
                m.build_time,
                m.test_time,
                m.benchmark_time,
                m.memory_bytes,
                self.num_classes,
                self.num_clusters
            ),
            EstimatorKind::Regression => format!(
                "{},{},{},{},{},{},{},{}",
                self.score,
                m.build_time,
                m.test_time,
                m.benchmark_time,
                m.memory_bytes,
                m.error_estimate_method,
                m.error_estimate_time,
                m.build_plus_estimate_time
            ),
        };
        format!(
            "{},{},{},{},{},{},{}\n{}\n{}\n",
            m.dataset_name,
            m.estimator_name,
            m.split,
            m.fold_id,
            m.time_unit.name(),
            self.file_type.name(),
            m.description,
            m.parameters,
            third
        )
    }

    /// Parse lines 1-3
    pub fn parse(
        kind: EstimatorKind,
        first: &str,
        second: &str,
        third: &str,
        ctx: &mut EvalContext,
    ) -> Result<Self> {
        let mut header = Header::new(RunMetadata::default(), FileType::default());
        header.file_type = parse_first_line(first, &mut header.metadata)?;
        let legacy_build_time = parse_second_line(second, &mut header.metadata)?;
        parse_third_line(kind, third, &mut header, legacy_build_time, ctx)?;
        Ok(header)
    }
}

fn field<T: FromStr>(line: usize, name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ResultsError::malformed(line, format!("invalid {name} '{raw}'")))
}

/// `dataset,estimator,split,fold,unit,type,description...`
///
/// Older files may stop early: a lone field is the estimator name, a missing
/// time unit means milliseconds and a missing type means predictions.
fn parse_first_line(line: &str, metadata: &mut RunMetadata) -> Result<FileType> {
    let parts: Vec<&str> = line.split(',').collect();

    if parts.len() == 1 {
        metadata.estimator_name = parts[0].to_string();
    } else {
        metadata.dataset_name = parts[0].to_string();
        metadata.estimator_name = parts[1].to_string();
    }
    if let Some(split) = parts.get(2) {
        metadata.split = split.to_string();
    }
    if let Some(fold) = parts.get(3) {
        metadata.fold_id = field(1, "fold id", fold)?;
    }
    metadata.time_unit = match parts.get(4) {
        Some(unit) => TimeUnit::from_str(unit.trim()).map_err(|e| ResultsError::malformed(1, e))?,
        None => TimeUnit::Milliseconds,
    };
    let file_type = match parts.get(5) {
        Some(ft) => FileType::from_str(ft.trim()).map_err(|e| ResultsError::malformed(1, e))?,
        None => FileType::Predictions,
    };
    if parts.len() > 6 {
        metadata.description = parts[6..].join(",");
    }
    Ok(file_type)
}

/// Free-form parameters; returns whether a legacy `BuildTime,<v>` prefix was extracted
fn parse_second_line(line: &str, metadata: &mut RunMetadata) -> Result<bool> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() > 1 && parts[0].contains(LEGACY_BUILD_TIME_KEY) {
        let value: f64 = field(2, "build time", parts[1])?;
        metadata.build_time = value as i64;
        metadata.parameters = parts[2..].join(",");
        return Ok(true);
    }
    metadata.parameters = line.to_string();
    Ok(false)
}

fn parse_third_line(
    kind: EstimatorKind,
    line: &str,
    header: &mut Header,
    legacy_build_time: bool,
    ctx: &mut EvalContext,
) -> Result<()> {
    let parts: Vec<&str> = line.split(',').collect();
    header.score = field(3, "score", parts[0])?;

    let m = &mut header.metadata;
    if let Some(build) = parts.get(1) {
        if legacy_build_time && ctx.warnings.first_time(Warning::BuildTimeDuplicated) {
            warn!(
                previous = m.build_time,
                "Build time reported on both the second and third line, using the third"
            );
        }
        m.build_time = field(3, "build time", build)?;
    }
    if let Some(test) = parts.get(2) {
        m.test_time = field(3, "test time", test)?;
    }
    if let Some(bench) = parts.get(3) {
        m.benchmark_time = field(3, "benchmark time", bench)?;
    }
    if let Some(memory) = parts.get(4) {
        m.memory_bytes = field(3, "memory", memory)?;
    }

    let estimate_fields = match kind {
        EstimatorKind::Classification => {
            if let Some(classes) = parts.get(5) {
                header.num_classes = parse_count(classes)?;
            }
            6
        }
        EstimatorKind::Clustering => {
            if let Some(classes) = parts.get(5) {
                header.num_classes = parse_count(classes)?;
            }
            if let Some(clusters) = parts.get(6) {
                header.num_clusters = parse_count(clusters)?;
            }
            return Ok(());
        }
        EstimatorKind::Regression => 5,
    };

    let m = &mut header.metadata;
    if let Some(method) = parts.get(estimate_fields) {
        m.error_estimate_method = method.to_string();
    }
    if let Some(time) = parts.get(estimate_fields + 1) {
        m.error_estimate_time = field(3, "error estimate time", time)?;
    }
    if let Some(time) = parts.get(estimate_fields + 2) {
        m.build_plus_estimate_time = field(3, "build plus estimate time", time)?;
    }
    Ok(())
}

/// Class/cluster counts are written as -1 or 0 when unknown
fn parse_count(raw: &str) -> Result<usize> {
    let value: i64 = field(3, "class count", raw)?;
    Ok(if value > 0 { value as usize } else { 0 })
}
