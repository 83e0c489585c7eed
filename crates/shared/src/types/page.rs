//! Offset/limit windows for list queries.

use serde::{Deserialize, Serialize};

/// A window over an ordered result set.
///
/// `limit = None` means "everything after `offset`".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Number of rows to skip.
    #[serde(default)]
    pub offset: u64,
    /// Maximum number of rows to return.
    #[serde(default)]
    pub limit: Option<u64>,
}

impl Page {
    /// A window with both bounds set.
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}
