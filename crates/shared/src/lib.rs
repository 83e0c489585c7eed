//! Shared types, errors, and configuration for Quire.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Offset/limit paging windows for list queries
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
