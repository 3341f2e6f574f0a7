//! Results containers for the three estimator kinds
//!
//! Provides:
//! - `ClassifierResults`, `ClustererResults`, `RegressorResults`
//! - `TimedRun`: metadata and timing shared by every container
//! - `ScoredRun`: lifecycle, primary score and serialisation
//! - `EstimatorResults`: a loaded container of any kind

mod classifier;
mod clusterer;
mod regressor;

pub use classifier::ClassifierResults;
pub use clusterer::ClustererResults;
pub use regressor::RegressorResults;

use crate::codec;
use crate::config::EvalContext;
use crate::error::{Result, ResultsError};
use crate::models::{
    to_double_millis, EstimatorKind, FileType, LifecycleState, RunMetadata, TimeUnit,
};
use crate::observability::{ResultsMetrics, StructuredLogger};
use crate::predictions::PredictionLog;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Run identity and timing, shared by every container
pub trait TimedRun {
    fn log(&self) -> &PredictionLog;

    fn log_mut(&mut self) -> &mut PredictionLog;

    fn metadata(&self) -> &RunMetadata {
        self.log().metadata()
    }

    fn dataset_name(&self) -> &str {
        &self.metadata().dataset_name
    }

    fn estimator_name(&self) -> &str {
        &self.metadata().estimator_name
    }

    fn split(&self) -> &str {
        &self.metadata().split
    }

    fn fold_id(&self) -> i32 {
        self.metadata().fold_id
    }

    fn time_unit(&self) -> TimeUnit {
        self.metadata().time_unit
    }

    fn num_instances(&self) -> usize {
        self.log().num_instances()
    }

    fn set_dataset_name(&mut self, name: &str) {
        self.log_mut().metadata_mut().dataset_name = name.to_string();
    }

    fn set_estimator_name(&mut self, name: &str) {
        self.log_mut().metadata_mut().estimator_name = name.to_string();
    }

    fn set_split(&mut self, split: &str) {
        self.log_mut().metadata_mut().split = split.to_string();
    }

    fn set_fold_id(&mut self, fold_id: i32) {
        self.log_mut().metadata_mut().fold_id = fold_id;
    }

    fn set_time_unit(&mut self, unit: TimeUnit) {
        self.log_mut().metadata_mut().time_unit = unit;
    }

    /// Descriptions must not contain newlines; they are replaced with spaces
    fn set_description(&mut self, description: &str) {
        self.log_mut().metadata_mut().description = description.replace(['\n', '\r'], " ");
    }

    fn set_parameters(&mut self, parameters: &str) {
        self.log_mut().metadata_mut().parameters = parameters.replace(['\n', '\r'], " ");
    }

    fn set_build_time(&mut self, build_time: i64) -> Result<()> {
        self.log_mut().set_build_time(build_time)
    }

    fn set_test_time(&mut self, test_time: i64) -> Result<()> {
        self.log_mut().set_test_time(test_time)
    }

    fn set_benchmark_time(&mut self, benchmark_time: i64) {
        self.log_mut().metadata_mut().benchmark_time = benchmark_time;
    }

    fn set_memory(&mut self, memory_bytes: i64) {
        self.log_mut().metadata_mut().memory_bytes = memory_bytes;
    }

    fn set_error_estimate_method(&mut self, method: &str) {
        self.log_mut().metadata_mut().error_estimate_method = method.to_string();
    }

    fn set_error_estimate_time(&mut self, time: i64) {
        self.log_mut().metadata_mut().error_estimate_time = time;
    }

    fn set_build_plus_estimate_time(&mut self, time: i64) {
        self.log_mut().metadata_mut().build_plus_estimate_time = time;
    }

    fn build_time_in_nanos(&self) -> i64 {
        self.time_unit().to_nanos(self.metadata().build_time)
    }

    fn test_time_in_nanos(&self) -> i64 {
        self.time_unit().to_nanos(self.metadata().test_time)
    }

    fn build_time_millis(&self) -> f64 {
        to_double_millis(self.metadata().build_time, self.time_unit())
    }

    fn total_test_time_millis(&self) -> f64 {
        to_double_millis(self.metadata().test_time, self.time_unit())
    }

    fn error_estimate_time_millis(&self) -> f64 {
        to_double_millis(self.metadata().error_estimate_time, self.time_unit())
    }

    fn build_plus_estimate_time_millis(&self) -> f64 {
        to_double_millis(self.metadata().build_plus_estimate_time, self.time_unit())
    }

    /// Time spent on the error estimate beyond the plain build
    fn additional_estimate_time_millis(&self) -> f64 {
        let m = self.metadata();
        to_double_millis(m.build_plus_estimate_time - m.build_time, self.time_unit())
    }
}

/// Lifecycle, scoring and serialisation shared by every container
pub trait ScoredRun: TimedRun {
    fn kind(&self) -> EstimatorKind;

    /// Accuracy for classification and clustering, MSE for regression; `None` until finalised
    fn primary_score(&self) -> Option<f64>;

    /// Attach true labels if given, freeze the predictions and compute the primary score
    fn finalize(&mut self, true_labels: Option<&[f64]>) -> Result<()>;

    /// Run the full metric suite over the stored predictions
    fn compute_all_stats(&mut self) -> Result<()>;

    /// Human-readable `key,value` block of the computed stats
    fn stats_to_string(&self) -> Option<String>;

    /// Computed stats as JSON
    fn stats_json(&self) -> Option<serde_json::Value>;

    fn write_full_results_to_string(&mut self) -> Result<String>;

    fn write_summary_results_to_string(&mut self) -> Result<String>;

    fn state(&self) -> LifecycleState {
        self.log().state()
    }

    /// Compute stats unless they already are
    fn compute_all_stats_once(&mut self) -> Result<()> {
        if self.state() == LifecycleState::StatsComputed {
            debug!("Stats already computed, skipping");
            return Ok(());
        }
        self.compute_all_stats()
    }

    /// Drop per-instance predictions, keeping metadata and any computed stats
    fn clean_prediction_info(&mut self) {
        self.log_mut().clean_prediction_info();
    }

    fn has_probability_distribution_information(&self) -> bool {
        self.log().has_probability_distribution_information()
    }

    fn write_compact_results_to_string(&mut self) -> Result<String> {
        Err(ResultsError::UnsupportedFormat(FileType::Compact))
    }

    fn write_full_results_to_file(&mut self, path: &Path) -> Result<()> {
        let contents = self.write_full_results_to_string()?;
        codec::write_file(path, &contents, FileType::Predictions, self.num_instances())
    }

    fn write_summary_results_to_file(&mut self, path: &Path) -> Result<()> {
        let contents = self.write_summary_results_to_string()?;
        codec::write_file(path, &contents, FileType::Metrics, self.num_instances())
    }
}

/// Reject operations on a container that has not been finalised
fn require_finalized(log: &PredictionLog, operation: &'static str) -> Result<()> {
    if !log.is_finalized() {
        return Err(ResultsError::InvalidState {
            operation,
            state: log.state(),
        });
    }
    Ok(())
}

/// Finalise if still open, so writers can be called directly after adding predictions
fn ensure_finalized<R: ScoredRun + ?Sized>(results: &mut R) -> Result<()> {
    if results.state() == LifecycleState::Open {
        results.finalize(None)?;
    }
    Ok(())
}

/// Time a stat computation and record it
fn record_stats<R: ScoredRun + ?Sized>(results: &R, started: Instant) {
    ResultsMetrics::new().observe_stats_computed(started.elapsed().as_secs_f64());
    let m = results.metadata();
    StructuredLogger::default().log_stats_computed(
        results.kind(),
        &m.estimator_name,
        &m.dataset_name,
        m.fold_id,
        results.primary_score().unwrap_or(f64::NAN),
    );
}

/// A container of any kind, as produced by kind-agnostic loading
#[derive(Debug, Clone)]
pub enum EstimatorResults {
    Classification(ClassifierResults),
    Clustering(ClustererResults),
    Regression(RegressorResults),
}

impl EstimatorResults {
    pub fn load_from_file(kind: EstimatorKind, path: &Path, ctx: &mut EvalContext) -> Result<Self> {
        Ok(match kind {
            EstimatorKind::Classification => {
                Self::Classification(ClassifierResults::load_from_file_with(path, ctx)?)
            }
            EstimatorKind::Clustering => {
                Self::Clustering(ClustererResults::load_from_file_with(path, ctx)?)
            }
            EstimatorKind::Regression => {
                Self::Regression(RegressorResults::load_from_file_with(path, ctx)?)
            }
        })
    }

    pub fn as_scored(&self) -> &dyn ScoredRun {
        match self {
            Self::Classification(r) => r,
            Self::Clustering(r) => r,
            Self::Regression(r) => r,
        }
    }

    pub fn as_scored_mut(&mut self) -> &mut dyn ScoredRun {
        match self {
            Self::Classification(r) => r,
            Self::Clustering(r) => r,
            Self::Regression(r) => r,
        }
    }

    pub fn kind(&self) -> EstimatorKind {
        self.as_scored().kind()
    }
}

/// Check whether a results file exists and is non-empty
pub fn exists(path: &Path) -> bool {
    codec::exists(path)
}

#[cfg(test)]
mod tests;
