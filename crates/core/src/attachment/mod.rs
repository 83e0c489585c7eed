//! Submission attachments.
//!
//! This module provides the attachment-resolution pipeline:
//! - Deriving the expected attachment set from submission XML (plain or encrypted)
//! - Matching expected names against uploaded files
//! - Persisting attachments, blobs and audit entries as one unit
//! - Re-uploads, targeted attach and clear

mod error;
mod resolver;
mod service;
mod types;

pub use error::AttachmentError;
pub use resolver::{CLIENT_AUDIT_PATH, MEDIA_FILE_PATH, derive_expected};
pub use service::{AttachmentRepository, AttachmentService};
pub use types::{
    AttachmentAudit, AttachmentUpdateDetails, ExpectedAttachment, IngestionBatch, NewAttachment,
    SubmissionAttachment, SubmissionDef, UploadSet, UploadedFile,
};
