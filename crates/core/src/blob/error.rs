//! Blob error types.

use std::path::PathBuf;

use thiserror::Error;

/// Blob operation errors.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The source file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The hashing task did not complete.
    #[error("content hashing failed: {0}")]
    Hashing(String),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl BlobError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}
