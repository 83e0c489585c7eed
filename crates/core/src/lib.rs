//! Core business logic for Quire.
//!
//! This crate contains pure domain logic with ZERO web or database dependencies.
//! Persistence is reached through the repository traits each module defines;
//! the db crate implements them.
//!
//! # Modules
//!
//! - `xml` - Field extraction from submission XML
//! - `blob` - Content-addressable blob storage
//! - `attachment` - Expected attachment derivation and ingestion
//! - `audit` - Audit log, categories and the background worker
//! - `export` - Streaming attachment export

pub mod attachment;
pub mod audit;
pub mod blob;
pub mod export;
pub mod xml;
