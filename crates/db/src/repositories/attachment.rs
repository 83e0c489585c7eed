//! Attachment repository for database operations.
//!
//! Every write here runs in one transaction together with the blob ensures
//! and audit entries it implies.

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use super::{audit, blob};
use crate::entities::submission_attachments;
use quire_core::blob::Blob;
use quire_core::attachment::{
    AttachmentAudit, AttachmentError, AttachmentRepository as AttachmentRepoTrait,
    IngestionBatch, SubmissionAttachment,
};
use quire_shared::types::{BlobId, SubmissionDefId};

/// Attachment repository implementation.
#[derive(Debug, Clone)]
pub struct AttachmentRepository {
    db: DatabaseConnection,
}

impl AttachmentRepository {
    /// Create a new attachment repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl AttachmentRepoTrait for AttachmentRepository {
    async fn create_all(
        &self,
        batch: IngestionBatch,
    ) -> Result<Vec<SubmissionAttachment>, AttachmentError> {
        let txn = self.db.begin().await.map_err(repository)?;

        // Ensure in digest order so concurrent ingestions sharing blobs take
        // the `sha` index entries in the same order.
        let mut pending: Vec<&Blob> = batch
            .attachments
            .iter()
            .filter_map(|a| a.blob.as_ref())
            .collect();
        pending.sort_by(|a, b| a.sha.cmp(&b.sha));
        pending.dedup_by(|a, b| a.sha == b.sha);

        let mut ensured = HashMap::with_capacity(pending.len());
        for content in pending {
            let id = blob::ensure_on(&txn, content).await.map_err(repository)?;
            ensured.insert(content.sha.clone(), id);
        }

        let mut created = Vec::with_capacity(batch.attachments.len());
        for attachment in &batch.attachments {
            let blob_id = attachment
                .blob
                .as_ref()
                .and_then(|content| ensured.get(&content.sha).copied());

            let model = submission_attachments::ActiveModel {
                submission_def_id: Set(batch.submission_def_id.into_inner()),
                name: Set(attachment.name.clone()),
                blob_id: Set(blob_id.map(BlobId::into_inner)),
                index: Set(attachment.index),
                is_client_audit: Set(attachment.is_client_audit),
            }
            .insert(&txn)
            .await
            .map_err(repository)?;

            if let Some(blob_id) = blob_id {
                let entry = batch.audit.entry(&attachment.name, None, Some(blob_id));
                audit::insert_on(&txn, entry).await.map_err(repository)?;
            }

            created.push(to_domain(model));
        }

        txn.commit().await.map_err(repository)?;
        Ok(created)
    }

    async fn get_all_by_def_id(
        &self,
        submission_def_id: SubmissionDefId,
    ) -> Result<Vec<SubmissionAttachment>, AttachmentError> {
        let models = submission_attachments::Entity::find()
            .filter(
                submission_attachments::Column::SubmissionDefId.eq(submission_def_id.into_inner()),
            )
            .order_by_asc(submission_attachments::Column::Name)
            .all(&self.db)
            .await
            .map_err(repository)?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn get_by_def_id_and_name(
        &self,
        submission_def_id: SubmissionDefId,
        name: &str,
    ) -> Result<Option<SubmissionAttachment>, AttachmentError> {
        let key = (submission_def_id.into_inner(), name.to_string());
        let model = submission_attachments::Entity::find_by_id(key)
            .one(&self.db)
            .await
            .map_err(repository)?;

        Ok(model.map(to_domain))
    }

    async fn set_blob(
        &self,
        name: &str,
        blob_id: Option<BlobId>,
        audit: AttachmentAudit,
    ) -> Result<Option<SubmissionAttachment>, AttachmentError> {
        let txn = self.db.begin().await.map_err(repository)?;

        let Some(current) = submission_attachments::Entity::find()
            .filter(
                submission_attachments::Column::SubmissionDefId
                    .eq(audit.submission_def_id.into_inner()),
            )
            .filter(submission_attachments::Column::Name.eq(name))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(repository)?
        else {
            return Ok(None);
        };

        let old = current.blob_id.map(BlobId);
        let mut active: submission_attachments::ActiveModel = current.into();
        active.blob_id = Set(blob_id.map(BlobId::into_inner));
        let updated = active.update(&txn).await.map_err(repository)?;

        audit::insert_on(&txn, audit.entry(name, old, blob_id))
            .await
            .map_err(repository)?;

        txn.commit().await.map_err(repository)?;
        debug!(
            submission_def_id = %audit.submission_def_id,
            name,
            old_blob_id = ?old,
            new_blob_id = ?blob_id,
            "attachment blob set"
        );
        Ok(Some(to_domain(updated)))
    }
}

fn repository(err: DbErr) -> AttachmentError {
    AttachmentError::Repository(err.to_string())
}

/// Convert database model to domain model.
fn to_domain(model: submission_attachments::Model) -> SubmissionAttachment {
    SubmissionAttachment {
        submission_def_id: SubmissionDefId(model.submission_def_id),
        name: model.name,
        index: model.index,
        is_client_audit: model.is_client_audit,
        blob_id: model.blob_id.map(BlobId),
    }
}
