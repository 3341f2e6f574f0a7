//! Error types for results storage, parsing and evaluation

use crate::models::{FileType, LifecycleState};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the results containers and the file codec
#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("No predictions stored, cannot finalise results")]
    EmptyResults,

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(
        "{field} has invalid value {value}; use a finer time unit (e.g. nanoseconds) \
         or disable strict zero-timing mode"
    )]
    InvalidTiming { field: &'static str, value: i64 },

    #[error("Malformed results file at line {line}: {reason}")]
    MalformedFile { line: usize, reason: String },

    #[error("Calculated accuracy ({computed}) differs from written accuracy ({declared}) by more than {eps}")]
    AccuracyMismatch {
        declared: f64,
        computed: f64,
        eps: f64,
    },

    #[error("File {} not found", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} results files are not supported")]
    UnsupportedFormat(FileType),

    #[error("Label {label} at instance {index} is outside the valid range [0, {bound})")]
    InvalidLabel { index: usize, label: f64, bound: usize },

    #[error("Cannot {operation} while results are {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("Prediction information has been cleaned from these results")]
    PredictionInfoCleared,

    #[error("No true labels attached to the stored predictions")]
    MissingTrueLabels,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ResultsError {
    /// Shorthand for a malformed-file error on a 1-based line number
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedFile {
            line,
            reason: reason.into(),
        }
    }

    /// Whether this error means the results file simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound(_))
    }
}

/// Result type for results operations
pub type Result<T> = std::result::Result<T, ResultsError>;
