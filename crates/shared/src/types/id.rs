//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `BlobId` where a
//! `SubmissionDefId` is expected. Row identities are database sequences,
//! so the wrappers hold `i64`; actee identities are UUIDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed sequence ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the inner row identity.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

typed_id!(BlobId, "Unique identifier for a stored blob.");
typed_id!(AuditId, "Unique identifier for an audit log entry.");
typed_id!(ActorId, "Unique identifier for an actor (user or app user).");
typed_id!(ProjectId, "Unique identifier for a project.");
typed_id!(FormId, "Unique identifier for a form.");
typed_id!(FormDefId, "Unique identifier for one version of a form definition.");
typed_id!(SubmissionId, "Unique identifier for a submission.");
typed_id!(
    SubmissionDefId,
    "Unique identifier for one version of a submission."
);
typed_id!(KeyId, "Unique identifier for a decryption key.");

/// Identity of anything an audit entry can be about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActeeId(pub Uuid);

impl ActeeId {
    /// Creates a new random actee ID using UUID v7 (time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ActeeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_display() {
        assert_eq!(BlobId(42).to_string(), "42");
    }

    #[test]
    fn test_typed_id_from_str() {
        assert_eq!(SubmissionDefId::from_str("17").unwrap(), SubmissionDefId(17));
        assert!(SubmissionDefId::from_str("seventeen").is_err());
    }

    #[test]
    fn test_typed_id_serializes_transparently() {
        assert_eq!(serde_json::to_string(&BlobId(7)).unwrap(), "7");
        let back: BlobId = serde_json::from_str("7").unwrap();
        assert_eq!(back, BlobId(7));
    }

    #[test]
    fn test_actee_id_is_time_ordered() {
        let a = ActeeId::new();
        let b = ActeeId::new();
        assert!(a.into_inner() <= b.into_inner());
    }
}
