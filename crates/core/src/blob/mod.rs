//! Content-addressable blob storage.
//!
//! Blobs are immutable byte payloads identified by the SHA-256 digest of
//! their content. Identical uploads across unrelated submissions resolve to
//! a single stored row.
//!
//! # Dedup contract
//!
//! `ensure` trusts the digest: when a row with the same `sha` exists its
//! identity is returned without comparing bytes. A digest collision would
//! therefore alias two different payloads. The audit worker's integrity job
//! re-hashes stored content to surface such cases; it does not change which
//! row `ensure` returns.

mod error;
mod service;
mod types;

#[cfg(test)]
pub(crate) use service::tests;

pub use error::BlobError;
pub use service::{BlobRepository, BlobService};
pub use types::{Blob, BlobSource, DEFAULT_CONTENT_TYPE, StoredBlob, sha256_hex};
