//! Blob repository for database operations.
//!
//! A blob is looked up by `sha` first; only a miss sends the content. The
//! insert uses `ON CONFLICT (sha) DO NOTHING` and is re-read when it yields no
//! row, so two writers racing on the same digest both end up with the
//! winner's id and neither sees an error.

use bytes::Bytes;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect,
    Set, TryInsertResult,
};

use crate::entities::blobs;
use quire_core::blob::{Blob, BlobError, BlobRepository as BlobRepoTrait, StoredBlob};
use quire_shared::types::BlobId;

/// Blob repository implementation.
#[derive(Debug, Clone)]
pub struct BlobRepository {
    db: DatabaseConnection,
}

impl BlobRepository {
    /// Create a new blob repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl BlobRepoTrait for BlobRepository {
    async fn ensure(&self, blob: &Blob) -> Result<BlobId, BlobError> {
        ensure_on(&self.db, blob)
            .await
            .map_err(|e| BlobError::repository(e.to_string()))
    }

    async fn find_by_id(&self, id: BlobId) -> Result<Option<StoredBlob>, BlobError> {
        let model = blobs::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(|e| BlobError::repository(e.to_string()))?;

        Ok(model.map(to_domain))
    }
}

/// Ensure `blob` exists on `conn`, which may be an open transaction.
pub(crate) async fn ensure_on<C: ConnectionTrait>(conn: &C, blob: &Blob) -> Result<BlobId, DbErr> {
    if let Some(id) = find_id_by_sha(conn, &blob.sha).await? {
        return Ok(id);
    }

    let model = blobs::ActiveModel {
        sha: Set(blob.sha.clone()),
        content: Set(blob.content.to_vec()),
        content_type: Set(blob.content_type.clone()),
        ..Default::default()
    };

    let inserted = blobs::Entity::insert(model)
        .on_conflict(OnConflict::column(blobs::Column::Sha).do_nothing().to_owned())
        .do_nothing()
        .exec(conn)
        .await?;

    match inserted {
        TryInsertResult::Inserted(result) => Ok(BlobId(result.last_insert_id)),
        TryInsertResult::Conflicted | TryInsertResult::Empty => find_id_by_sha(conn, &blob.sha)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("blob {}", blob.sha))),
    }
}

async fn find_id_by_sha<C: ConnectionTrait>(conn: &C, sha: &str) -> Result<Option<BlobId>, DbErr> {
    let id = blobs::Entity::find()
        .select_only()
        .column(blobs::Column::Id)
        .filter(blobs::Column::Sha.eq(sha))
        .into_tuple::<i64>()
        .one(conn)
        .await?;
    Ok(id.map(BlobId))
}

/// Convert database model to domain model.
fn to_domain(model: blobs::Model) -> StoredBlob {
    StoredBlob {
        id: BlobId(model.id),
        sha: model.sha,
        content_type: model.content_type,
        content: Bytes::from(model.content),
    }
}
