//! The audit action vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::AuditError;

/// Every action the audit log accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// `user.create`
    UserCreate,
    /// `user.update`
    UserUpdate,
    /// `user.delete`
    UserDelete,
    /// `assignment.create`
    AssignmentCreate,
    /// `assignment.delete`
    AssignmentDelete,
    /// `project.create`
    ProjectCreate,
    /// `project.update`
    ProjectUpdate,
    /// `project.delete`
    ProjectDelete,
    /// `form.create`
    FormCreate,
    /// `form.update`
    FormUpdate,
    /// `form.delete`
    FormDelete,
    /// `form.attachment.update`
    FormAttachmentUpdate,
    /// `form.update.draft.set`
    FormUpdateDraftSet,
    /// `form.update.draft.delete`
    FormUpdateDraftDelete,
    /// `form.update.publish`
    FormUpdatePublish,
    /// `submission.create`
    SubmissionCreate,
    /// `submission.update.version`
    SubmissionUpdateVersion,
    /// `submission.attachment.update`
    SubmissionAttachmentUpdate,
    /// `backup`
    Backup,
}

impl Action {
    /// Every action, in vocabulary order.
    pub const ALL: [Self; 19] = [
        Self::UserCreate,
        Self::UserUpdate,
        Self::UserDelete,
        Self::AssignmentCreate,
        Self::AssignmentDelete,
        Self::ProjectCreate,
        Self::ProjectUpdate,
        Self::ProjectDelete,
        Self::FormCreate,
        Self::FormUpdate,
        Self::FormDelete,
        Self::FormAttachmentUpdate,
        Self::FormUpdateDraftSet,
        Self::FormUpdateDraftDelete,
        Self::FormUpdatePublish,
        Self::SubmissionCreate,
        Self::SubmissionUpdateVersion,
        Self::SubmissionAttachmentUpdate,
        Self::Backup,
    ];

    /// Actions that need follow-up work by the audit worker.
    pub const ACTIONABLE: [Self; 3] = [
        Self::SubmissionCreate,
        Self::SubmissionUpdateVersion,
        Self::SubmissionAttachmentUpdate,
    ];

    /// Convert to database string value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UserCreate => "user.create",
            Self::UserUpdate => "user.update",
            Self::UserDelete => "user.delete",
            Self::AssignmentCreate => "assignment.create",
            Self::AssignmentDelete => "assignment.delete",
            Self::ProjectCreate => "project.create",
            Self::ProjectUpdate => "project.update",
            Self::ProjectDelete => "project.delete",
            Self::FormCreate => "form.create",
            Self::FormUpdate => "form.update",
            Self::FormDelete => "form.delete",
            Self::FormAttachmentUpdate => "form.attachment.update",
            Self::FormUpdateDraftSet => "form.update.draft.set",
            Self::FormUpdateDraftDelete => "form.update.draft.delete",
            Self::FormUpdatePublish => "form.update.publish",
            Self::SubmissionCreate => "submission.create",
            Self::SubmissionUpdateVersion => "submission.update.version",
            Self::SubmissionAttachmentUpdate => "submission.attachment.update",
            Self::Backup => "backup",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }

    /// Whether entries with this action wait for the audit worker.
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        Self::ACTIONABLE.contains(self)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| AuditError::UnknownAction(s.to_string()))
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
