//! stancelab error types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// stancelab error types
#[derive(Debug, thiserror::Error)]
pub enum StanceError {
    // Generative service errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("empty response from model")]
    EmptyResponse,

    // Response interpretation
    #[error("no stance value in response: {0}")]
    Parse(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Prediction references an unknown document, or ids are duplicated.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an error, used when recording per-document failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or empty required input, invalid configuration. Aborts the run.
    Configuration,
    /// The generative service was unreachable, failed, or timed out.
    Call,
    /// The service replied but no stance value could be extracted.
    Parse,
    /// Unknown or duplicate document ids. Aborts evaluation.
    DataIntegrity,
}

impl StanceError {
    /// The kind this error is reported as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StanceError::Http(_)
            | StanceError::Api { .. }
            | StanceError::Timeout(_)
            | StanceError::RateLimited { .. }
            | StanceError::ModelNotFound(_)
            | StanceError::EmptyResponse => ErrorKind::Call,
            StanceError::Parse(_) => ErrorKind::Parse,
            StanceError::DataIntegrity(_) => ErrorKind::DataIntegrity,
            StanceError::Configuration(_) | StanceError::Json(_) | StanceError::Io(_) => {
                ErrorKind::Configuration
            }
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, timeouts, rate limits, 5xx responses and empty
    /// replies are transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            StanceError::Http(_)
            | StanceError::Timeout(_)
            | StanceError::RateLimited { .. }
            | StanceError::EmptyResponse => true,
            StanceError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-provided delay hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            StanceError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether this error must abort the whole run rather than one document.
    ///
    /// An unknown model fails every call the same way, so it is fatal too.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StanceError::ModelNotFound(_))
            || matches!(
                self.kind(),
                ErrorKind::Configuration | ErrorKind::DataIntegrity
            )
    }
}

/// Result type alias for stancelab operations
pub type Result<T> = std::result::Result<T, StanceError>;
