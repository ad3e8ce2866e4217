//! Error types for feature extraction and collection

use crate::data::BookSide;
use thiserror::Error;

/// Snapshot-level failure raised by the feature engine
///
/// Per-metric unavailability is not an error; it is reported on the
/// returned [`FeatureRecord`](crate::features::FeatureRecord). Only input
/// that cannot be trusted as numeric fails a whole snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("Malformed {side} level at index {index}: {field} {defect} (raw: {raw:?})")]
    MalformedLevel {
        side: BookSide,
        index: usize,
        field: LevelField,
        raw: String,
        defect: LevelDefect,
    },

    #[error("Invalid feature configuration: {0}")]
    Configuration(String),
}

/// Which half of a `[price, volume]` pair was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelField {
    Price,
    Volume,
}

impl std::fmt::Display for LevelField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelField::Price => write!(f, "price"),
            LevelField::Volume => write!(f, "volume"),
        }
    }
}

/// Why a level value was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelDefect {
    /// Not parseable as a number
    NotNumeric,
    /// NaN or infinite
    NotFinite,
    /// Price <= 0 or volume < 0
    OutOfRange,
}

impl std::fmt::Display for LevelDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelDefect::NotNumeric => write!(f, "is not numeric"),
            LevelDefect::NotFinite => write!(f, "is not finite"),
            LevelDefect::OutOfRange => write!(f, "is out of range"),
        }
    }
}

/// Main error type for the collector
#[derive(Error, Debug, Clone)]
pub enum CollectorError {
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Merge conflict: {0}")]
    MergeConflict(String),
}

impl CollectorError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            CollectorError::Network(_) => true,
            CollectorError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CollectorError::Parse(err.to_string())
        } else {
            CollectorError::Network(err.to_string())
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    Low,      // Skippable for one cycle
    Medium,   // Recoverable errors
    High,     // Data-integrity faults
    Critical, // Collector cannot run
}

impl ErrorSeverity {
    pub fn from_error(error: &CollectorError) -> Self {
        match error {
            CollectorError::Configuration(_) => ErrorSeverity::Critical,
            CollectorError::Feature(FeatureError::Configuration(_)) => ErrorSeverity::Critical,
            CollectorError::Feature(FeatureError::MalformedLevel { .. }) => ErrorSeverity::High,
            CollectorError::MergeConflict(_) => ErrorSeverity::High,
            CollectorError::Http { status, .. } if *status >= 500 || *status == 429 => ErrorSeverity::Low,
            CollectorError::Http { .. } => ErrorSeverity::Medium,
            CollectorError::Network(_) => ErrorSeverity::Low,
            CollectorError::Parse(_) => ErrorSeverity::Medium,
        }
    }
}

/// Error reporter for structured logging
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn report_error(error: &CollectorError, operation: &str) {
        let severity = ErrorSeverity::from_error(error);

        match severity {
            ErrorSeverity::Critical => {
                tracing::error!(operation, "CRITICAL ERROR: {}", error);
            }
            ErrorSeverity::High => {
                tracing::error!(operation, "HIGH SEVERITY: {}", error);
            }
            ErrorSeverity::Medium => {
                tracing::warn!(operation, "MEDIUM SEVERITY: {}", error);
            }
            ErrorSeverity::Low => {
                tracing::debug!(operation, "LOW SEVERITY: {}", error);
            }
        }
    }
}
