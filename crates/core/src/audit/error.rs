//! Audit and audit-worker errors.

use quire_shared::AppError;
use quire_shared::types::{AuditId, BlobId};
use thiserror::Error;

use crate::blob::BlobError;

/// Errors from the audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Action string outside the vocabulary.
    #[error("Unknown audit action: {0}")]
    UnknownAction(String),

    /// Entry not found.
    #[error("Audit entry not found: {0}")]
    NotFound(AuditId),

    /// Repository/database error.
    #[error("Repository error: {0}")]
    Repository(String),
}

impl AuditError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<AuditError> for AppError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::UnknownAction(_) => Self::Validation(err.to_string()),
            AuditError::NotFound(_) => Self::NotFound(err.to_string()),
            AuditError::Repository(msg) => Self::Database(msg),
        }
    }
}

/// Errors raised while processing one audit entry.
#[derive(Debug, Error)]
pub enum JobError {
    /// Entry details could not be interpreted.
    #[error("Invalid details on audit {audit_id}: {message}")]
    InvalidDetails {
        /// Offending entry.
        audit_id: AuditId,
        /// Parse failure.
        message: String,
    },

    /// Referenced blob does not exist.
    #[error("Blob {0} is missing")]
    MissingBlob(BlobId),

    /// Stored content no longer hashes to its digest.
    #[error("Blob {blob_id} content does not match digest {sha}")]
    DigestMismatch {
        /// Offending blob.
        blob_id: BlobId,
        /// Recorded digest.
        sha: String,
    },

    /// Blob lookup failed.
    #[error(transparent)]
    Blob(#[from] BlobError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_action_is_validation() {
        let err: AppError = AuditError::UnknownAction("x".into()).into();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_repository_is_database() {
        let err: AppError = AuditError::repository("boom").into();
        assert!(matches!(err, AppError::Database(msg) if msg == "boom"));
    }
}
