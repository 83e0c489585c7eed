//! Blob values.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use quire_shared::types::BlobId;
use sha2::{Digest, Sha256};

use super::error::BlobError;

/// Content type recorded when the uploader did not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Hex-encoded SHA-256 digest of `content`.
#[must_use]
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Where blob content comes from.
#[derive(Debug, Clone)]
pub enum BlobSource {
    /// A file on local disk, typically a staged upload.
    Path(PathBuf),
    /// Bytes already in memory.
    Buffer(Bytes),
}

/// An unsaved blob: content plus its digest.
///
/// Call [`BlobRepository::ensure`](super::BlobRepository::ensure) to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Hex SHA-256 of `content`.
    pub sha: String,
    /// Declared MIME type.
    pub content_type: String,
    /// Raw bytes.
    pub content: Bytes,
}

impl Blob {
    /// Build a blob from in-memory bytes.
    #[must_use]
    pub fn from_bytes(content: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        let content = content.into();
        Self {
            sha: sha256_hex(&content),
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
            content,
        }
    }

    /// Read a file fully and hash it.
    ///
    /// The read uses async file I/O and the digest is computed on the
    /// blocking pool, so large uploads do not stall the executor.
    pub async fn from_path(path: &Path, content_type: Option<&str>) -> Result<Self, BlobError> {
        let content = Bytes::from(tokio::fs::read(path).await.map_err(|source| {
            BlobError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?);

        let hashed = content.clone();
        let sha = tokio::task::spawn_blocking(move || sha256_hex(&hashed))
            .await
            .map_err(|e| BlobError::Hashing(e.to_string()))?;

        Ok(Self {
            sha,
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
            content,
        })
    }

    /// Build a blob from either kind of source.
    pub async fn from_content(source: BlobSource, content_type: Option<&str>) -> Result<Self, BlobError> {
        match source {
            BlobSource::Path(path) => Self::from_path(&path, content_type).await,
            BlobSource::Buffer(bytes) => Ok(Self::from_bytes(bytes, content_type)),
        }
    }
}

/// A persisted blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Row identity.
    pub id: BlobId,
    /// Hex SHA-256 recorded at insert time.
    pub sha: String,
    /// Declared MIME type.
    pub content_type: String,
    /// Raw bytes.
    pub content: Bytes,
}

impl StoredBlob {
    /// Whether the stored content still hashes to the recorded digest.
    #[must_use]
    pub fn verify(&self) -> bool {
        sha256_hex(&self.content) == self.sha
    }
}
