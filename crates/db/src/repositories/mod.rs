//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod attachment;
pub mod audit;
pub mod blob;
pub mod export;

pub use attachment::AttachmentRepository;
pub use audit::AuditRepository;
pub use blob::BlobRepository;
pub use export::ExportRepository;
