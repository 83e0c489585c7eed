//! Attachment service implementation.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use quire_shared::types::{BlobId, SubmissionDefId};
use tracing::{debug, info};

use super::error::AttachmentError;
use super::resolver::derive_expected;
use super::types::{
    AttachmentAudit, ExpectedAttachment, IngestionBatch, NewAttachment, SubmissionAttachment,
    SubmissionDef, UploadSet,
};
use crate::audit::{ActorRef, FormRef};
use crate::blob::{Blob, BlobRepository};
use crate::xml::FieldSchema;

/// Repository trait for attachment persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait AttachmentRepository: Send + Sync {
    /// Write a whole ingestion atomically.
    ///
    /// Within one transaction: ensure a blob for every attachment carrying
    /// content, insert every attachment row, and insert one audit entry per
    /// attachment that received a blob.
    fn create_all(
        &self,
        batch: IngestionBatch,
    ) -> impl std::future::Future<Output = Result<Vec<SubmissionAttachment>, AttachmentError>> + Send;

    /// List attachments of a submission version, ordered by name.
    fn get_all_by_def_id(
        &self,
        submission_def_id: SubmissionDefId,
    ) -> impl std::future::Future<Output = Result<Vec<SubmissionAttachment>, AttachmentError>> + Send;

    /// Find one attachment by submission version and name.
    fn get_by_def_id_and_name(
        &self,
        submission_def_id: SubmissionDefId,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Option<SubmissionAttachment>, AttachmentError>> + Send;

    /// Point an attachment at `blob_id` (or at nothing) and log the change.
    ///
    /// The update and its audit entry, carrying the previous and the new
    /// blob, commit together. Returns `None` if the attachment is not
    /// expected for the submission.
    fn set_blob(
        &self,
        name: &str,
        blob_id: Option<BlobId>,
        audit: AttachmentAudit,
    ) -> impl std::future::Future<Output = Result<Option<SubmissionAttachment>, AttachmentError>> + Send;
}

/// Attachment service for resolving and mutating submission attachments.
pub struct AttachmentService<R: AttachmentRepository, B: BlobRepository> {
    repo: Arc<R>,
    blobs: Arc<B>,
    channel_capacity: usize,
}

impl<R: AttachmentRepository, B: BlobRepository> AttachmentService<R, B> {
    /// Create a new attachment service.
    #[must_use]
    pub fn new(repo: Arc<R>, blobs: Arc<B>, channel_capacity: usize) -> Self {
        Self {
            repo,
            blobs,
            channel_capacity,
        }
    }

    /// Work out which attachments a submission expects.
    ///
    /// # Errors
    ///
    /// Returns an error if the XML is malformed or the encrypted payload
    /// name is missing or reused.
    pub async fn expected(
        &self,
        def: &SubmissionDef,
        fields: &[FieldSchema],
    ) -> Result<Vec<ExpectedAttachment>, AttachmentError> {
        derive_expected(def, fields, self.channel_capacity).await
    }

    /// Create the full attachment set of a freshly ingested submission.
    ///
    /// Every expected name gets a row; those with a matching upload also get
    /// a blob and an audit entry. Nothing is written if the XML is malformed
    /// or nothing is expected.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The submission XML cannot be parsed
    /// - An uploaded file cannot be read
    /// - The database write fails
    pub async fn create(
        &self,
        def: &SubmissionDef,
        form: &FormRef,
        actor: Option<&ActorRef>,
        fields: &[FieldSchema],
        uploads: &UploadSet,
    ) -> Result<Vec<SubmissionAttachment>, AttachmentError> {
        let expected = self.expected(def, fields).await?;
        if expected.is_empty() {
            debug!(submission_def_id = %def.id, "no attachments expected");
            return Ok(Vec::new());
        }

        let attachments = try_join_all(expected.into_iter().map(|e| async move {
            let blob = match uploads.get(&e.name) {
                Some(file) => Some(Blob::from_path(&file.path, file.content_type.as_deref()).await?),
                None => None,
            };
            Ok::<_, AttachmentError>(NewAttachment::new(e, blob))
        }))
        .await?;

        let uploaded = attachments.iter().filter(|a| a.blob.is_some()).count();
        let expected_count = attachments.len();

        let batch = IngestionBatch {
            submission_def_id: def.id,
            attachments,
            audit: audit_context(def, form, actor),
        };
        let created = self.repo.create_all(batch).await?;

        info!(
            submission_def_id = %def.id,
            expected = expected_count,
            uploaded,
            "submission attachments created"
        );
        Ok(created)
    }

    /// Store re-uploaded files for attachments the submission already expects.
    ///
    /// Files whose field name is not an expected attachment are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or a database write fails.
    pub async fn upsert(
        &self,
        def: &SubmissionDef,
        form: &FormRef,
        actor: Option<&ActorRef>,
        uploads: &UploadSet,
    ) -> Result<Vec<SubmissionAttachment>, AttachmentError> {
        let expected: HashSet<String> = self
            .repo
            .get_all_by_def_id(def.id)
            .await?
            .into_iter()
            .map(|a| a.name)
            .collect();

        let audit = audit_context(def, form, actor);
        let present = uploads.iter().filter(|(name, _)| expected.contains(*name));

        let updated = try_join_all(present.map(|(name, file)| {
            let audit = audit.clone();
            async move {
                let blob = Blob::from_path(&file.path, file.content_type.as_deref()).await?;
                let blob_id = self.blobs.ensure(&blob).await?;
                self.repo
                    .set_blob(name, Some(blob_id), audit)
                    .await?
                    .ok_or_else(|| AttachmentError::not_found(def.id, name))
            }
        }))
        .await?;

        debug!(submission_def_id = %def.id, updated = updated.len(), "attachments upserted");
        Ok(updated)
    }

    /// Point an expected attachment at a stored blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment is not expected or the update fails.
    pub async fn attach(
        &self,
        def: &SubmissionDef,
        name: &str,
        blob_id: BlobId,
        form: &FormRef,
        actor: Option<&ActorRef>,
    ) -> Result<SubmissionAttachment, AttachmentError> {
        self.repo
            .set_blob(name, Some(blob_id), audit_context(def, form, actor))
            .await?
            .ok_or_else(|| AttachmentError::not_found(def.id, name))
    }

    /// Detach the stored content of an attachment, keeping it expected.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment is not expected or the update fails.
    pub async fn clear(
        &self,
        def: &SubmissionDef,
        name: &str,
        form: &FormRef,
        actor: Option<&ActorRef>,
    ) -> Result<SubmissionAttachment, AttachmentError> {
        self.repo
            .set_blob(name, None, audit_context(def, form, actor))
            .await?
            .ok_or_else(|| AttachmentError::not_found(def.id, name))
    }

    /// List attachments of a submission version, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails.
    pub async fn list(
        &self,
        submission_def_id: SubmissionDefId,
    ) -> Result<Vec<SubmissionAttachment>, AttachmentError> {
        self.repo.get_all_by_def_id(submission_def_id).await
    }

    /// Get one attachment by name.
    ///
    /// # Errors
    ///
    /// Returns an error if attachment not found or database operation fails.
    pub async fn get(
        &self,
        submission_def_id: SubmissionDefId,
        name: &str,
    ) -> Result<SubmissionAttachment, AttachmentError> {
        self.repo
            .get_by_def_id_and_name(submission_def_id, name)
            .await?
            .ok_or_else(|| AttachmentError::not_found(submission_def_id, name))
    }
}

fn audit_context(def: &SubmissionDef, form: &FormRef, actor: Option<&ActorRef>) -> AttachmentAudit {
    AttachmentAudit {
        actor_id: actor.map(|a| a.id),
        actee_id: Some(form.actee_id),
        submission_def_id: def.id,
        instance_id: def.instance_id.clone(),
    }
}
