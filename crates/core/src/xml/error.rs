//! XML traversal errors.

use thiserror::Error;

/// Fatal submission XML errors.
///
/// Any of these aborts the ingestion that triggered the traversal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    /// The reader rejected the document.
    #[error("malformed XML at byte {position}: {message}")]
    Malformed {
        /// Byte offset where the problem was detected.
        position: u64,
        /// Reader diagnostic.
        message: String,
    },

    /// The document ended with elements still open.
    #[error("unexpected end of XML: <{open}> is not closed")]
    UnexpectedEof {
        /// Innermost element left open.
        open: String,
    },

    /// The document has no root element.
    #[error("XML document has no root element")]
    Empty,
}

impl XmlError {
    /// Create a malformed document error.
    #[must_use]
    pub fn malformed(position: u64, message: impl Into<String>) -> Self {
        Self::Malformed {
            position,
            message: message.into(),
        }
    }
}
