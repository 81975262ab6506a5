//! Error types for the insight discovery engine.
//!
//! Only two kinds of failure ever reach a caller: invalid configuration and
//! genuinely unusable input (for example a column name that does not exist).
//! Data insufficiency is never an error; checks that cannot run return
//! `None` or an explicit "insufficient data" value instead.
//!
//! Errors are serializable so the surrounding API layer can pass them
//! through unchanged as `{ "code": ..., "message": ... }`.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the insight engine.
#[derive(Error, Debug)]
pub enum InsightError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Anomaly detection was asked for a method the engine does not know.
    #[error("Unknown anomaly detection method '{0}' (expected isolation_forest, robust_z_score or z_score)")]
    UnknownAnomalyMethod(String),

    /// Column could not be interpreted as the requested logical type.
    #[error("Column '{column}' cannot be read as {expected}: {reason}")]
    ColumnTypeMismatch {
        column: String,
        expected: String,
        reason: String,
    },

    /// A remote question generator failed or replied with nothing usable.
    #[error("Question generator error: {0}")]
    QuestionGeneration(String),

    /// Internal error (e.g., background task join failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<InsightError>,
    },
}

impl InsightError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        InsightError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for API consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::UnknownAnomalyMethod(_) => "UNKNOWN_ANOMALY_METHOD",
            Self::ColumnTypeMismatch { .. } => "COLUMN_TYPE_MISMATCH",
            Self::QuestionGeneration(_) => "QUESTION_GENERATION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error was caused by the caller's configuration rather
    /// than by the data or the engine.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::InvalidConfig(_) | Self::UnknownAnomalyMethod(_) => true,
            Self::WithContext { source, .. } => source.is_configuration_error(),
            _ => false,
        }
    }

    /// Check if this error is recoverable by the caller (fix the request and retry).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ColumnNotFound(_)
            | Self::InvalidConfig(_)
            | Self::UnknownAnomalyMethod(_)
            | Self::ColumnTypeMismatch { .. } => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

impl From<crate::config::ConfigValidationError> for InsightError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        InsightError::InvalidConfig(err.to_string())
    }
}

impl Serialize for InsightError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("InsightError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, InsightError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| InsightError::Polars(e).with_context(context))
    }
}
