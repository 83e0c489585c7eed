//! Attachment types and data structures.

use std::collections::HashMap;
use std::path::PathBuf;

use quire_shared::types::{ActeeId, ActorId, BlobId, SubmissionDefId};
use serde::{Deserialize, Serialize};

use crate::audit::{Action, NewAudit};
use crate::blob::Blob;

/// The parts of a submission version the resolver needs.
#[derive(Debug, Clone)]
pub struct SubmissionDef {
    /// Submission version ID.
    pub id: SubmissionDefId,
    /// Instance identifier of the submission.
    pub instance_id: String,
    /// Raw submission XML.
    pub xml: String,
    /// Per-submission key material; present iff the submission is encrypted.
    pub local_key: Option<String>,
    /// Name of the attachment carrying the encrypted submission payload.
    pub enc_data_attachment_name: Option<String>,
}

impl SubmissionDef {
    /// Whether attachments follow the encrypted `<media><file>` layout.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.local_key.is_some()
    }
}

/// A file received alongside a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Where the upload was staged.
    pub path: PathBuf,
    /// MIME type declared by the client.
    pub content_type: Option<String>,
}

/// Uploaded files keyed by their declared field name.
#[derive(Debug, Clone, Default)]
pub struct UploadSet {
    files: HashMap<String, UploadedFile>,
}

impl UploadSet {
    /// Create an empty upload set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file under its declared field name.
    pub fn insert(
        &mut self,
        field_name: impl Into<String>,
        path: impl Into<PathBuf>,
        content_type: Option<&str>,
    ) {
        self.files.insert(
            field_name.into(),
            UploadedFile {
                path: path.into(),
                content_type: content_type.map(str::to_owned),
            },
        );
    }

    /// Look up a file by exact field name.
    #[must_use]
    pub fn get(&self, field_name: &str) -> Option<&UploadedFile> {
        self.files.get(field_name)
    }

    /// Iterate over `(field name, file)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UploadedFile)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of uploaded files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files were uploaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// An attachment the submission XML says should exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedAttachment {
    /// Expected file name.
    pub name: String,
    /// Ordinal within an encrypted attachment list.
    pub index: Option<i32>,
    /// Whether this is the client audit log. Unknown for encrypted submissions.
    pub is_client_audit: Option<bool>,
}

/// An attachment row about to be written, with its content if it was uploaded.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    /// Expected file name.
    pub name: String,
    /// Ordinal within an encrypted attachment list.
    pub index: Option<i32>,
    /// Client audit flag.
    pub is_client_audit: Option<bool>,
    /// Uploaded content, not yet stored.
    pub blob: Option<Blob>,
}

impl NewAttachment {
    /// Attach uploaded content (or none) to an expected attachment.
    #[must_use]
    pub fn new(expected: ExpectedAttachment, blob: Option<Blob>) -> Self {
        Self {
            name: expected.name,
            index: expected.index,
            is_client_audit: expected.is_client_audit,
            blob,
        }
    }
}

/// A persisted submission attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAttachment {
    /// Owning submission version.
    pub submission_def_id: SubmissionDefId,
    /// Expected file name.
    pub name: String,
    /// Ordinal within an encrypted attachment list.
    pub index: Option<i32>,
    /// Client audit flag.
    pub is_client_audit: Option<bool>,
    /// Stored content; `None` until the file is uploaded.
    pub blob_id: Option<BlobId>,
}

/// Payload of a `submission.attachment.update` audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentUpdateDetails {
    /// Instance identifier of the submission.
    pub instance_id: String,
    /// Submission version whose attachment changed.
    pub submission_def_id: SubmissionDefId,
    /// Attachment name.
    pub name: String,
    /// Blob before the change.
    #[serde(default)]
    pub old_blob_id: Option<BlobId>,
    /// Blob after the change.
    #[serde(default)]
    pub new_blob_id: Option<BlobId>,
}

/// Who changed attachments of which submission, for the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentAudit {
    /// Acting user, if any.
    pub actor_id: Option<ActorId>,
    /// The form the submission belongs to.
    pub actee_id: Option<ActeeId>,
    /// Submission version being changed.
    pub submission_def_id: SubmissionDefId,
    /// Instance identifier of the submission.
    pub instance_id: String,
}

impl AttachmentAudit {
    /// Audit entry for one attachment's blob changing from `old` to `new`.
    #[must_use]
    pub fn entry(&self, name: &str, old: Option<BlobId>, new: Option<BlobId>) -> NewAudit {
        let details = AttachmentUpdateDetails {
            instance_id: self.instance_id.clone(),
            submission_def_id: self.submission_def_id,
            name: name.to_string(),
            old_blob_id: old,
            new_blob_id: new,
        };

        NewAudit {
            actor_id: self.actor_id,
            action: Action::SubmissionAttachmentUpdate,
            actee_id: self.actee_id,
            details: serde_json::to_value(details).ok(),
        }
    }
}

/// Everything one ingestion writes, committed together or not at all.
#[derive(Debug, Clone)]
pub struct IngestionBatch {
    /// Submission version the attachments belong to.
    pub submission_def_id: SubmissionDefId,
    /// Every expected attachment, uploaded or not.
    pub attachments: Vec<NewAttachment>,
    /// Audit context for attachments that received content.
    pub audit: AttachmentAudit,
}
