//! Export queries, filters and rows.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use quire_shared::types::{BlobId, FormId, KeyId, SubmissionDefId};
use serde::{Deserialize, Serialize};

use super::error::ExportError;

/// Submission columns a filter may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionField {
    /// Actor that submitted.
    SubmitterId,
    /// When the submission was first received.
    CreatedAt,
    /// Review state, e.g. `approved`.
    ReviewState,
    /// Submitting device.
    DeviceId,
    /// Instance identifier.
    InstanceId,
}

/// A literal on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// SQL `NULL`.
    Null,
    /// Integer.
    Int(i64),
    /// Timestamp.
    Timestamp(DateTime<Utc>),
    /// Text.
    Text(String),
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// `=`; against `Null` means `IS NULL`.
    Eq,
    /// `<>`; against `Null` means `IS NOT NULL`.
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Typed predicate over submission columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionFilter {
    /// `field op value`
    Compare {
        /// Column.
        field: SubmissionField,
        /// Operator.
        op: Comparison,
        /// Literal.
        value: FilterValue,
    },
    /// Both hold.
    And(Box<SubmissionFilter>, Box<SubmissionFilter>),
    /// Either holds.
    Or(Box<SubmissionFilter>, Box<SubmissionFilter>),
    /// Negation.
    Not(Box<SubmissionFilter>),
}

impl SubmissionFilter {
    /// `field op value`
    #[must_use]
    pub fn compare(field: SubmissionField, op: Comparison, value: FilterValue) -> Self {
        Self::Compare { field, op, value }
    }

    /// `field = value`
    #[must_use]
    pub fn eq(field: SubmissionField, value: FilterValue) -> Self {
        Self::compare(field, Comparison::Eq, value)
    }

    /// `self AND other`
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// `self OR other`
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// `NOT self`
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Check that every comparison pairs a column with a literal of its type.
    pub fn validate(&self) -> Result<(), ExportError> {
        match self {
            Self::Compare { field, op, value } => {
                let ok = match value {
                    FilterValue::Null => matches!(op, Comparison::Eq | Comparison::Ne),
                    FilterValue::Int(_) => *field == SubmissionField::SubmitterId,
                    FilterValue::Timestamp(_) => *field == SubmissionField::CreatedAt,
                    FilterValue::Text(_) => matches!(
                        field,
                        SubmissionField::ReviewState
                            | SubmissionField::DeviceId
                            | SubmissionField::InstanceId
                    ),
                };
                if ok {
                    Ok(())
                } else {
                    Err(ExportError::InvalidFilter(format!(
                        "cannot compare {field:?} {op:?} {value:?}"
                    )))
                }
            }
            Self::And(a, b) | Self::Or(a, b) => {
                a.validate()?;
                b.validate()
            }
            Self::Not(inner) => inner.validate(),
        }
    }
}

/// Which encryption keys a caller can decrypt with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyScope {
    /// No keys: unencrypted rows only.
    UnencryptedOnly,
    /// Unencrypted rows plus rows under these keys.
    UnencryptedOr(Vec<KeyId>),
}

impl KeyScope {
    /// Build from an optional allow-list. Absent and empty lists both mean
    /// unencrypted rows only.
    #[must_use]
    pub fn from_allow_list(keys: Option<&[KeyId]>) -> Self {
        match keys {
            Some(keys) if !keys.is_empty() => Self::UnencryptedOr(keys.to_vec()),
            _ => Self::UnencryptedOnly,
        }
    }
}

/// What to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportQuery {
    /// Form whose submissions are exported.
    pub form_id: FormId,
    /// Draft (test) submissions instead of live ones.
    pub draft: bool,
    /// Decryptable keys.
    pub keys: KeyScope,
    /// Optional submission predicate.
    pub filter: Option<SubmissionFilter>,
}

impl ExportQuery {
    /// Live submissions of a form, unencrypted only, unfiltered.
    #[must_use]
    pub fn new(form_id: FormId) -> Self {
        Self {
            form_id,
            draft: false,
            keys: KeyScope::UnencryptedOnly,
            filter: None,
        }
    }

    /// Set the decryptable keys.
    #[must_use]
    pub fn with_keys(mut self, keys: Option<&[KeyId]>) -> Self {
        self.keys = KeyScope::from_allow_list(keys);
        self
    }

    /// Set the submission predicate.
    #[must_use]
    pub fn with_filter(mut self, filter: SubmissionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Export drafts instead of live submissions.
    #[must_use]
    pub fn drafts(mut self) -> Self {
        self.draft = true;
        self
    }
}

/// One exported attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    /// Instance identifier of the submission.
    pub instance_id: String,
    /// Submission version.
    pub submission_def_id: SubmissionDefId,
    /// Attachment name.
    pub name: String,
    /// Blob identity.
    pub blob_id: BlobId,
    /// Blob MIME type.
    pub content_type: String,
    /// Blob bytes.
    pub content: Bytes,
    /// Encryption key, for encrypted submissions.
    pub key_id: Option<KeyId>,
}
