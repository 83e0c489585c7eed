//! Attachment error types.

use quire_shared::AppError;
use quire_shared::types::SubmissionDefId;
use thiserror::Error;

use crate::blob::BlobError;
use crate::xml::XmlError;

/// Attachment operation errors.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// The submission XML could not be traversed.
    #[error("submission XML could not be parsed: {0}")]
    Xml(#[from] XmlError),

    /// An uploaded file could not be read or stored.
    #[error("blob error: {0}")]
    Blob(#[from] BlobError),

    /// Encrypted submission without a name for its payload attachment.
    #[error("encrypted submission {0} has no encrypted data attachment name")]
    MissingEncryptedPayloadName(SubmissionDefId),

    /// A listed encrypted file reuses the encrypted payload's name.
    #[error("encrypted file list reuses the payload name {0}")]
    PayloadNameReused(String),

    /// No such attachment is expected for the submission.
    #[error("attachment not found: {name} on submission {submission_def_id}")]
    NotFound {
        /// Owning submission version.
        submission_def_id: SubmissionDefId,
        /// Expected file name.
        name: String,
    },

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl AttachmentError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(submission_def_id: SubmissionDefId, name: impl Into<String>) -> Self {
        Self::NotFound {
            submission_def_id,
            name: name.into(),
        }
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<AttachmentError> for AppError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::Xml(_)
            | AttachmentError::MissingEncryptedPayloadName(_)
            | AttachmentError::PayloadNameReused(_) => Self::Validation(err.to_string()),
            AttachmentError::NotFound { .. } => Self::NotFound(err.to_string()),
            AttachmentError::Blob(BlobError::Repository(msg)) | AttachmentError::Repository(msg) => {
                Self::Database(msg)
            }
            AttachmentError::Blob(_) => Self::Internal(err.to_string()),
        }
    }
}
