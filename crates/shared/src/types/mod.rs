//! Common types used across the application.

pub mod id;
pub mod page;

pub use id::*;
pub use page::Page;
