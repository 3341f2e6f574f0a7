//! Results storage and evaluation for machine-learning estimators
//!
//! This crate provides the core functionality for:
//! - Accumulating per-instance predictions of classifiers, clusterers and regressors
//! - Reading and writing the line-oriented results file format
//! - Computing classification, clustering and regression performance metrics
//! - Structured logging and Prometheus counters for load/write activity

pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod predictions;
pub mod results;

pub use config::{EvalContext, ResultsConfig, Warning, WarningsEmitted};
pub use error::{ResultsError, Result};
pub use metrics::{
    ClassificationMetric, ClassificationStats, ClusteringStats, PerClassStats, RegressionStats,
};
pub use models::*;
pub use observability::{ResultsMetrics, StructuredLogger};
pub use predictions::PredictionLog;
pub use results::{
    ClassifierResults, ClustererResults, EstimatorResults, RegressorResults, ScoredRun, TimedRun,
};
