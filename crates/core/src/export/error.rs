//! Export errors.

use quire_shared::AppError;
use thiserror::Error;

/// Errors from the export streamer.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filter compares a field with a value of the wrong kind.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Repository/database error, including cursor failures mid-stream.
    #[error("Repository error: {0}")]
    Repository(String),
}

impl ExportError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::InvalidFilter(_) => Self::Validation(err.to_string()),
            ExportError::Repository(msg) => Self::Database(msg),
        }
    }
}
