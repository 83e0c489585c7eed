//! Streaming extraction of field values from submission XML.
//!
//! Submissions arrive as XML instances of a form. The form schema tells us
//! which field paths hold binary (file) references; this module walks the
//! instance once, depth-first in document order, and yields the text of
//! every element whose path is in the schema. The parse tree is never
//! materialized, so arbitrarily large payloads cost only the depth of the
//! element stack.
//!
//! Two ways to consume the traversal:
//!
//! - [`FieldStream`] is a plain pull iterator over a borrowed document.
//! - [`spawn_field_stream`] moves an owned document onto the blocking pool
//!   and hands occurrences over a bounded channel, so a slow consumer
//!   throttles the parser.

mod error;
mod extractor;

pub use error::XmlError;
pub use extractor::{FieldOccurrence, FieldSchema, FieldStream, spawn_field_stream};
