//! Audit jobs.

use std::sync::Arc;

use tracing::debug;

use super::action::Action;
use super::error::JobError;
use super::types::Audit;
use super::worker::AuditJob;
use crate::attachment::AttachmentUpdateDetails;
use crate::blob::BlobRepository;

/// Re-hashes blobs newly attached to submissions.
///
/// Blobs are deduplicated by digest alone, so content that does not hash to
/// its recorded digest would be silently shared. This job catches that after
/// the fact. Entries other than `submission.attachment.update` are
/// acknowledged without work.
pub struct BlobIntegrityJob<B: BlobRepository> {
    blobs: Arc<B>,
}

impl<B: BlobRepository> BlobIntegrityJob<B> {
    /// Create a new job.
    #[must_use]
    pub fn new(blobs: Arc<B>) -> Self {
        Self { blobs }
    }
}

impl<B: BlobRepository> AuditJob for BlobIntegrityJob<B> {
    async fn run(&self, audit: &Audit) -> Result<(), JobError> {
        if audit.action != Action::SubmissionAttachmentUpdate {
            return Ok(());
        }

        let details: AttachmentUpdateDetails =
            serde_json::from_value(audit.details.clone().unwrap_or_default()).map_err(|e| {
                JobError::InvalidDetails {
                    audit_id: audit.id,
                    message: e.to_string(),
                }
            })?;

        // cleared attachment
        let Some(blob_id) = details.new_blob_id else {
            return Ok(());
        };

        let blob = self
            .blobs
            .find_by_id(blob_id)
            .await?
            .ok_or(JobError::MissingBlob(blob_id))?;

        if !blob.verify() {
            return Err(JobError::DigestMismatch {
                blob_id,
                sha: blob.sha,
            });
        }

        debug!(audit_id = %audit.id, blob_id = %blob_id, "blob digest verified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentAudit;
    use crate::audit::NewAudit;
    use crate::blob::tests::MockBlobRepository;
    use crate::blob::Blob;
    use chrono::Utc;
    use quire_shared::types::{AuditId, BlobId, SubmissionDefId};

    fn audit_of(entry: NewAudit) -> Audit {
        Audit {
            id: AuditId(1),
            actor_id: entry.actor_id,
            action: entry.action,
            actee_id: entry.actee_id,
            details: entry.details,
            logged_at: Utc::now(),
            processed: None,
            failures: 0,
        }
    }

    fn attachment_update(new: Option<BlobId>) -> Audit {
        let ctx = AttachmentAudit {
            actor_id: None,
            actee_id: None,
            submission_def_id: SubmissionDefId(1),
            instance_id: "uuid:1".to_string(),
        };
        audit_of(ctx.entry("a.jpg", None, new))
    }

    #[tokio::test]
    async fn test_valid_blob_passes() {
        let blobs = Arc::new(MockBlobRepository::default());
        let id = blobs
            .ensure(&Blob::from_bytes(&b"content"[..], None))
            .await
            .unwrap();
        let job = BlobIntegrityJob::new(blobs);
        assert!(job.run(&attachment_update(Some(id))).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_blob_fails() {
        let job = BlobIntegrityJob::new(Arc::new(MockBlobRepository::default()));
        let result = job.run(&attachment_update(Some(BlobId(99)))).await;
        assert!(matches!(result, Err(JobError::MissingBlob(BlobId(99)))));
    }

    #[tokio::test]
    async fn test_tampered_blob_fails() {
        let blobs = Arc::new(MockBlobRepository::default());
        let mut blob = Blob::from_bytes(&b"original"[..], None);
        blob.content = bytes::Bytes::from_static(b"tampered");
        let id = blobs.ensure(&blob).await.unwrap();

        let job = BlobIntegrityJob::new(blobs);
        let result = job.run(&attachment_update(Some(id))).await;
        assert!(matches!(result, Err(JobError::DigestMismatch { .. })));
    }

    #[tokio::test]
    async fn test_cleared_attachment_and_other_actions_pass() {
        let job = BlobIntegrityJob::new(Arc::new(MockBlobRepository::default()));
        assert!(job.run(&attachment_update(None)).await.is_ok());

        let other = audit_of(NewAudit::of(None, Action::SubmissionCreate, None, None));
        assert!(job.run(&other).await.is_ok());
    }

    #[tokio::test]
    async fn test_garbage_details_fail() {
        let job = BlobIntegrityJob::new(Arc::new(MockBlobRepository::default()));
        let mut audit = attachment_update(None);
        audit.details = Some(serde_json::json!({"nope": true}));
        assert!(matches!(
            job.run(&audit).await,
            Err(JobError::InvalidDetails { .. })
        ));
    }
}
