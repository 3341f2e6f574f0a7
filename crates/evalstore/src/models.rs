//! Core data models for stored results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel used for timing and memory fields that have not been recorded
pub const UNSET: i64 = -1;

/// Unit shared by every timing field of one results container
///
/// No field is ever converted automatically when the unit changes; the unit
/// only says how the stored integers should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    /// Assumed for legacy files that do not declare a unit
    #[default]
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    /// Name as written on the first line of a results file
    pub fn name(&self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "NANOSECONDS",
            TimeUnit::Microseconds => "MICROSECONDS",
            TimeUnit::Milliseconds => "MILLISECONDS",
            TimeUnit::Seconds => "SECONDS",
        }
    }

    fn nanos_per_unit(&self) -> i64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
        }
    }

    /// Convert a duration in this unit to nanoseconds, saturating on overflow
    pub fn to_nanos(&self, value: i64) -> i64 {
        value.saturating_mul(self.nanos_per_unit())
    }

    /// Convert `value` expressed in `from` into this unit, truncating like integer division
    pub fn convert(&self, value: i64, from: TimeUnit) -> i64 {
        let from_scale = from.nanos_per_unit();
        let to_scale = self.nanos_per_unit();
        if from_scale >= to_scale {
            value.saturating_mul(from_scale / to_scale)
        } else {
            value / (to_scale / from_scale)
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "NANOSECONDS" => Ok(TimeUnit::Nanoseconds),
            "MICROSECONDS" => Ok(TimeUnit::Microseconds),
            "MILLISECONDS" => Ok(TimeUnit::Milliseconds),
            "SECONDS" => Ok(TimeUnit::Seconds),
            other => Err(format!("unknown time unit '{}'", other)),
        }
    }
}

/// Convert a stored time to fractional milliseconds for reporting
///
/// Negative (unset) times map to -1 and zero stays zero. Sub-millisecond units
/// keep their fractional part; coarser units are scaled exactly.
pub fn to_double_millis(time: i64, unit: TimeUnit) -> f64 {
    if time < 0 {
        return -1.0;
    }
    if time == 0 {
        return 0.0;
    }
    match unit {
        TimeUnit::Nanoseconds => (time / 1_000_000) as f64 + (time % 1_000_000) as f64 / 1_000_000.0,
        TimeUnit::Microseconds => (time / 1_000) as f64 + (time % 1_000) as f64 / 1_000.0,
        TimeUnit::Milliseconds => time as f64,
        TimeUnit::Seconds => time.saturating_mul(1_000) as f64,
    }
}

/// What follows the three header lines of a results file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    /// One line per prediction
    #[default]
    Predictions,
    /// A fixed block of summary metrics instead of predictions
    Metrics,
    /// Reserved, never read or written
    Compact,
}

impl FileType {
    pub fn name(&self) -> &'static str {
        match self {
            FileType::Predictions => "PREDICTIONS",
            FileType::Metrics => "METRICS",
            FileType::Compact => "COMPACT",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PREDICTIONS" => Ok(FileType::Predictions),
            "METRICS" => Ok(FileType::Metrics),
            "COMPACT" => Ok(FileType::Compact),
            other => Err(format!("unknown file type '{}'", other)),
        }
    }
}

/// Which kind of estimator produced a set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    Classification,
    Clustering,
    Regression,
}

impl EstimatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            EstimatorKind::Classification => "classification",
            EstimatorKind::Clustering => "clustering",
            EstimatorKind::Regression => "regression",
        }
    }

    /// Whether predictions of this kind carry a probability distribution
    pub fn has_distributions(&self) -> bool {
        !matches!(self, EstimatorKind::Regression)
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle of a results container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Predictions may still be appended
    Open,
    /// Labels attached and primary score computed; no more appends
    Finalized,
    /// The full metric suite has been computed at least once
    StatsComputed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Open => "open",
            LifecycleState::Finalized => "finalized",
            LifecycleState::StatsComputed => "stats-computed",
        };
        f.write_str(s)
    }
}

/// Descriptive and timing information about one estimator run on one data split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub dataset_name: String,
    pub estimator_name: String,
    /// e.g. "train", "test", "validation"
    pub split: String,
    pub fold_id: i32,
    pub time_unit: TimeUnit,
    /// Free text, may contain commas but never newlines
    pub description: String,
    /// Free-form parameter string written on line 2
    pub parameters: String,
    pub build_time: i64,
    /// Cumulative prediction time over all stored predictions
    pub test_time: i64,
    /// Time of a reference benchmark operation on the same hardware
    pub benchmark_time: i64,
    pub memory_bytes: i64,
    /// Loosely formed, e.g. "cv_10"
    pub error_estimate_method: String,
    pub error_estimate_time: i64,
    pub build_plus_estimate_time: i64,
}

impl Default for RunMetadata {
    fn default() -> Self {
        Self {
            dataset_name: String::new(),
            estimator_name: String::new(),
            split: String::new(),
            fold_id: -1,
            time_unit: TimeUnit::default(),
            description: String::new(),
            parameters: "No parameter info".to_string(),
            build_time: UNSET,
            test_time: UNSET,
            benchmark_time: UNSET,
            memory_bytes: UNSET,
            error_estimate_method: String::new(),
            error_estimate_time: UNSET,
            build_plus_estimate_time: UNSET,
        }
    }
}

/// One scored instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Attached either on insertion or in bulk at finalisation
    pub true_label: Option<f64>,
    /// Class index, cluster index or regression value
    pub predicted_label: f64,
    pub distribution: Option<Vec<f64>>,
    /// -1 when unknown
    pub prediction_time: i64,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_unit_names_round_trip() {
        for unit in [
            TimeUnit::Nanoseconds,
            TimeUnit::Microseconds,
            TimeUnit::Milliseconds,
            TimeUnit::Seconds,
        ] {
            assert_eq!(unit.name().parse::<TimeUnit>().unwrap(), unit);
        }
        assert!("HOURS".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_time_unit_conversion() {
        assert_eq!(TimeUnit::Milliseconds.to_nanos(3), 3_000_000);
        assert_eq!(TimeUnit::Nanoseconds.convert(2, TimeUnit::Seconds), 2_000_000_000);
        assert_eq!(TimeUnit::Milliseconds.convert(1_999_999, TimeUnit::Nanoseconds), 1);
        assert_eq!(TimeUnit::Seconds.to_nanos(i64::MAX), i64::MAX);
    }

    #[test]
    fn test_to_double_millis() {
        assert_eq!(to_double_millis(-1, TimeUnit::Nanoseconds), -1.0);
        assert_eq!(to_double_millis(0, TimeUnit::Seconds), 0.0);
        assert!((to_double_millis(1_500_000, TimeUnit::Nanoseconds) - 1.5).abs() < 1e-12);
        assert!((to_double_millis(2_250, TimeUnit::Microseconds) - 2.25).abs() < 1e-12);
        assert_eq!(to_double_millis(7, TimeUnit::Milliseconds), 7.0);
        assert_eq!(to_double_millis(2, TimeUnit::Seconds), 2000.0);
    }

    #[test]
    fn test_metadata_defaults_are_unset() {
        let meta = RunMetadata::default();
        assert_eq!(meta.fold_id, -1);
        assert_eq!(meta.build_time, UNSET);
        assert_eq!(meta.test_time, UNSET);
        assert_eq!(meta.memory_bytes, UNSET);
        assert_eq!(meta.time_unit, TimeUnit::Milliseconds);
    }

    #[test]
    fn test_file_type_parse() {
        assert_eq!("METRICS".parse::<FileType>().unwrap(), FileType::Metrics);
        assert!(" PREDICTIONS ".parse::<FileType>().is_ok());
        assert!("CSV".parse::<FileType>().is_err());
    }
}
