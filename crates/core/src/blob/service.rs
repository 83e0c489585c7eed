//! Blob service implementation.

use std::sync::Arc;

use quire_shared::types::BlobId;
use tracing::debug;

use super::error::BlobError;
use super::types::{Blob, BlobSource, StoredBlob};

/// Repository trait for blob persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait BlobRepository: Send + Sync {
    /// Return the identity of the row holding `blob.sha`, inserting it if absent.
    ///
    /// Concurrent calls with the same digest must converge on one row and
    /// must not fail because of each other.
    fn ensure(
        &self,
        blob: &Blob,
    ) -> impl std::future::Future<Output = Result<BlobId, BlobError>> + Send;

    /// Find a blob by ID.
    fn find_by_id(
        &self,
        id: BlobId,
    ) -> impl std::future::Future<Output = Result<Option<StoredBlob>, BlobError>> + Send;
}

/// Blob service: reads sources and stores them deduplicated.
pub struct BlobService<R: BlobRepository> {
    repo: Arc<R>,
}

impl<R: BlobRepository> BlobService<R> {
    /// Create a new blob service.
    #[must_use]
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Read, hash and store content, returning the durable blob identity.
    pub async fn store(
        &self,
        source: BlobSource,
        content_type: Option<&str>,
    ) -> Result<BlobId, BlobError> {
        let blob = Blob::from_content(source, content_type).await?;
        let id = self.repo.ensure(&blob).await?;
        debug!(blob_id = %id, sha = %blob.sha, size = blob.content.len(), "blob ensured");
        Ok(id)
    }

    /// Get a stored blob by ID.
    pub async fn get(&self, id: BlobId) -> Result<Option<StoredBlob>, BlobError> {
        self.repo.find_by_id(id).await
    }
}
