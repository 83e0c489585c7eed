//! Streaming export of submission attachments.
//!
//! Rows come straight from a database cursor and are never collected.
//! Dropping an [`ExportStream`] releases the cursor.

mod error;
mod service;
mod types;

pub use error::ExportError;
pub use service::{ExportRepository, ExportStream, ExportStreamer, RowStream};
pub use types::{
    Comparison, ExportQuery, ExportRow, FilterValue, KeyScope, SubmissionField, SubmissionFilter,
};
