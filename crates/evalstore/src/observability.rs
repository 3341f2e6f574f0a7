//! Observability for results storage
//!
//! Provides:
//! - Prometheus counters (files loaded/written, load failures, predictions, stat runs)
//! - A latency histogram for metric computation
//! - Structured logging of load/write/evaluation events with tracing

use crate::models::{EstimatorKind, FileType};
use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for stat computation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ResultsMetricsInner> = OnceLock::new();

struct ResultsMetricsInner {
    files_loaded: IntCounter,
    load_failures: IntCounter,
    files_written: IntCounter,
    predictions_recorded: IntCounter,
    stats_computed: IntCounter,
    stats_latency_seconds: Histogram,
}

impl ResultsMetricsInner {
    fn new() -> Self {
        Self {
            files_loaded: register_int_counter!(
                "evalstore_files_loaded_total",
                "Results files successfully loaded"
            )
            .expect("Failed to register files_loaded"),

            load_failures: register_int_counter!(
                "evalstore_load_failures_total",
                "Results files that failed to load"
            )
            .expect("Failed to register load_failures"),

            files_written: register_int_counter!(
                "evalstore_files_written_total",
                "Results files written"
            )
            .expect("Failed to register files_written"),

            predictions_recorded: register_int_counter!(
                "evalstore_predictions_recorded_total",
                "Predictions appended to results containers"
            )
            .expect("Failed to register predictions_recorded"),

            stats_computed: register_int_counter!(
                "evalstore_stats_computed_total",
                "Full metric suites computed"
            )
            .expect("Failed to register stats_computed"),

            stats_latency_seconds: register_histogram!(
                "evalstore_stats_latency_seconds",
                "Time spent computing a full metric suite",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register stats_latency_seconds"),
        }
    }
}

/// Handle to the process-wide results metrics
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct ResultsMetrics {
    _private: (),
}

impl Default for ResultsMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ResultsMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ResultsMetricsInner {
        GLOBAL_METRICS.get_or_init(ResultsMetricsInner::new)
    }

    pub fn inc_files_loaded(&self) {
        self.inner().files_loaded.inc();
    }

    pub fn inc_load_failures(&self) {
        self.inner().load_failures.inc();
    }

    pub fn inc_files_written(&self) {
        self.inner().files_written.inc();
    }

    pub fn add_predictions_recorded(&self, count: u64) {
        self.inner().predictions_recorded.inc_by(count);
    }

    /// Count one metric-suite computation and its latency
    pub fn observe_stats_computed(&self, duration_secs: f64) {
        self.inner().stats_computed.inc();
        self.inner().stats_latency_seconds.observe(duration_secs);
    }

    pub fn files_loaded(&self) -> u64 {
        self.inner().files_loaded.get()
    }

    pub fn load_failures(&self) -> u64 {
        self.inner().load_failures.get()
    }

    pub fn files_written(&self) -> u64 {
        self.inner().files_written.get()
    }

    pub fn stats_computed(&self) -> u64 {
        self.inner().stats_computed.get()
    }
}

/// Structured logger for results events
///
/// Every event carries the component name so logs from several tools
/// sharing the library can be told apart.
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("evalstore")
    }
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Log a successfully loaded results file
    pub fn log_results_loaded(
        &self,
        path: &Path,
        kind: EstimatorKind,
        file_type: FileType,
        num_instances: usize,
    ) {
        info!(
            event = "results_loaded",
            component = %self.component,
            path = %path.display(),
            kind = %kind,
            file_type = %file_type,
            num_instances = num_instances,
            "Loaded results file"
        );
    }

    /// Log a failed load; missing files are reported separately from broken ones
    pub fn log_load_failure(&self, path: &Path, not_found: bool, reason: &str) {
        if not_found {
            warn!(
                event = "results_not_found",
                component = %self.component,
                path = %path.display(),
                "Results file not found"
            );
        } else {
            warn!(
                event = "results_load_failed",
                component = %self.component,
                path = %path.display(),
                reason = %reason,
                "Results file failed to load"
            );
        }
    }

    /// Log a written results file
    pub fn log_results_written(&self, path: &Path, file_type: FileType, num_instances: usize) {
        info!(
            event = "results_written",
            component = %self.component,
            path = %path.display(),
            file_type = %file_type,
            num_instances = num_instances,
            "Wrote results file"
        );
    }

    /// Log completion of a metric suite
    pub fn log_stats_computed(
        &self,
        kind: EstimatorKind,
        estimator: &str,
        dataset: &str,
        fold_id: i32,
        primary_score: f64,
    ) {
        info!(
            event = "stats_computed",
            component = %self.component,
            kind = %kind,
            estimator = %estimator,
            dataset = %dataset,
            fold_id = fold_id,
            primary_score = primary_score,
            "Computed performance metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_state() {
        let a = ResultsMetrics::new();
        let b = a.clone();
        let before = a.files_written();
        b.inc_files_written();
        assert!(a.files_written() > before);
    }

    #[test]
    fn test_stats_observation_counts() {
        let metrics = ResultsMetrics::default();
        let before = metrics.stats_computed();
        metrics.observe_stats_computed(0.002);
        assert!(metrics.stats_computed() > before);
    }

    #[test]
    fn test_logger_does_not_panic_without_subscriber() {
        let logger = StructuredLogger::new("test");
        logger.log_results_loaded(
            Path::new("a.csv"),
            EstimatorKind::Classification,
            FileType::Predictions,
            3,
        );
        logger.log_load_failure(Path::new("b.csv"), true, "missing");
        logger.log_load_failure(Path::new("c.csv"), false, "bad header");
        logger.log_results_written(Path::new("d.csv"), FileType::Metrics, 0);
        logger.log_stats_computed(EstimatorKind::Regression, "ridge", "iris", 0, 0.5);
    }
}
