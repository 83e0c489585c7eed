//! Named categories usable in place of a literal action when querying.

use super::action::Action;

/// How a category selects actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRule {
    /// Only these actions.
    Only(&'static [Action]),
    /// Every action except these.
    Except(&'static [Action]),
}

/// Category name to rule. Anything not listed here is an exact action match.
pub const CATEGORIES: &[(&str, CategoryRule)] = &[
    (
        "nonverbose",
        CategoryRule::Except(&[
            Action::SubmissionCreate,
            Action::SubmissionAttachmentUpdate,
            Action::Backup,
        ]),
    ),
    (
        "user",
        CategoryRule::Only(&[
            Action::UserCreate,
            Action::UserUpdate,
            Action::UserDelete,
            Action::AssignmentCreate,
            Action::AssignmentDelete,
        ]),
    ),
    (
        "project",
        CategoryRule::Only(&[
            Action::ProjectCreate,
            Action::ProjectUpdate,
            Action::ProjectDelete,
        ]),
    ),
    (
        "form",
        CategoryRule::Only(&[
            Action::FormCreate,
            Action::FormUpdate,
            Action::FormDelete,
            Action::FormAttachmentUpdate,
            Action::FormUpdateDraftSet,
            Action::FormUpdateDraftDelete,
            Action::FormUpdatePublish,
        ]),
    ),
    (
        "submission",
        CategoryRule::Only(&[Action::SubmissionCreate, Action::SubmissionAttachmentUpdate]),
    ),
];

/// A resolved action filter, ready to be turned into a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionFilter {
    /// Action is one of these.
    In(Vec<&'static str>),
    /// Action is none of these.
    NotIn(Vec<&'static str>),
    /// Action equals this literal.
    Exact(String),
}

impl ActionFilter {
    /// Expand a category name, or fall back to a literal action match.
    ///
    /// Unknown literals are not rejected; they simply match nothing.
    #[must_use]
    pub fn resolve(name: &str) -> Self {
        let rule = CATEGORIES
            .iter()
            .find(|(category, _)| *category == name)
            .map(|(_, rule)| *rule);

        match rule {
            Some(CategoryRule::Only(actions)) => Self::In(names(actions)),
            Some(CategoryRule::Except(actions)) => Self::NotIn(names(actions)),
            None => Self::Exact(name.to_string()),
        }
    }
}

fn names(actions: &[Action]) -> Vec<&'static str> {
    actions.iter().map(Action::as_str).collect()
}
