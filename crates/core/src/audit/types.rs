//! Audit entries, queries and joined context.

use chrono::{DateTime, Utc};
use quire_shared::types::{
    ActeeId, ActorId, AuditId, FormDefId, FormId, KeyId, Page, ProjectId,
};
use serde::{Deserialize, Serialize};

use super::action::Action;

/// Anything an audit entry can be about.
pub trait Actee {
    /// The actee identity of this entity.
    fn actee_id(&self) -> ActeeId;
}

/// Reference to the acting actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorRef {
    /// Actor row id.
    pub id: ActorId,
    /// Actor's own actee identity.
    pub actee_id: ActeeId,
}

/// Reference to a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormRef {
    /// Form row id.
    pub id: FormId,
    /// Form's actee identity.
    pub actee_id: ActeeId,
}

/// Reference to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectRef {
    /// Project row id.
    pub id: ProjectId,
    /// Project's actee identity.
    pub actee_id: ActeeId,
}

impl Actee for ActorRef {
    fn actee_id(&self) -> ActeeId {
        self.actee_id
    }
}

impl Actee for FormRef {
    fn actee_id(&self) -> ActeeId {
        self.actee_id
    }
}

impl Actee for ProjectRef {
    fn actee_id(&self) -> ActeeId {
        self.actee_id
    }
}

/// An audit entry about to be appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAudit {
    /// Acting actor.
    pub actor_id: Option<ActorId>,
    /// What happened.
    pub action: Action,
    /// What it happened to.
    pub actee_id: Option<ActeeId>,
    /// Free-form payload.
    pub details: Option<serde_json::Value>,
}

impl NewAudit {
    /// Build an entry from optional references.
    #[must_use]
    pub fn of(
        actor: Option<&ActorRef>,
        action: Action,
        actee: Option<&dyn Actee>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            actor_id: actor.map(|a| a.id),
            action,
            actee_id: actee.map(Actee::actee_id),
            details,
        }
    }

    /// `processed` value to store on insert: `logged_at` unless a worker must
    /// handle the entry first.
    #[must_use]
    pub fn processed_at(&self, logged_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (!self.action.is_actionable()).then_some(logged_at)
    }
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    /// Entry id.
    pub id: AuditId,
    /// Acting actor.
    pub actor_id: Option<ActorId>,
    /// What happened.
    pub action: Action,
    /// What it happened to.
    pub actee_id: Option<ActeeId>,
    /// Free-form payload.
    pub details: Option<serde_json::Value>,
    /// When the entry was appended.
    pub logged_at: DateTime<Utc>,
    /// When follow-up work completed, if it has.
    pub processed: Option<DateTime<Utc>>,
    /// Failed processing attempts.
    pub failures: i32,
}

/// Read-side filter over the audit log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    /// Inclusive lower bound on `logged_at`.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `logged_at`.
    pub end: Option<DateTime<Utc>>,
    /// Category name or literal action.
    pub action: Option<String>,
    /// Result window.
    pub page: Page,
    /// Join actor and actee context.
    pub extended: bool,
}

/// Acting or acted-upon actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorSummary {
    /// Actor row id.
    pub id: ActorId,
    /// Actor's own actee identity.
    pub actee_id: ActeeId,
    /// Name shown in listings.
    pub display_name: String,
    /// `user`, `field_key`, ...
    #[serde(rename = "type")]
    pub kind: String,
}

/// Project as seen from an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    /// Project row id.
    pub id: ProjectId,
    /// Project's actee identity.
    pub actee_id: ActeeId,
    /// Display name.
    pub name: String,
}

/// Form as seen from an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    /// Form row id.
    pub id: FormId,
    /// Form's actee identity.
    pub actee_id: ActeeId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Form identifier declared in the form XML.
    pub xml_form_id: String,
    /// Published version, if any.
    pub current_def_id: Option<FormDefId>,
}

/// One version of a form definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefSummary {
    /// Version row id.
    pub id: FormDefId,
    /// Title declared in the form XML.
    pub name: Option<String>,
    /// Version string; empty when undeclared.
    pub version: String,
    /// Encryption key, for encrypted forms.
    pub key_id: Option<KeyId>,
    /// When this version was published.
    pub published_at: Option<DateTime<Utc>>,
}

/// A form together with its current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormContext {
    /// The form.
    #[serde(flatten)]
    pub form: FormSummary,
    /// Current version, absent for forms that were never published.
    pub def: Option<FormDefSummary>,
}

/// The entity an audit entry is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuditActee {
    /// An actor, e.g. a user whose role changed.
    Actor(ActorSummary),
    /// A project.
    Project(ProjectSummary),
    /// A form, with its current version.
    Form(FormContext),
}

/// Joined context of one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    /// Who acted.
    pub actor: Option<ActorSummary>,
    /// What was acted upon.
    pub actee: Option<AuditActee>,
}

impl AuditContext {
    /// Assemble context from independently joined parts.
    ///
    /// An actee id names at most one entity; when several joins hit anyway,
    /// projects win over actors, which win over forms.
    #[must_use]
    pub fn assemble(
        actor: Option<ActorSummary>,
        actee_actor: Option<ActorSummary>,
        project: Option<ProjectSummary>,
        form: Option<FormSummary>,
        def: Option<FormDefSummary>,
    ) -> Self {
        let actee = project
            .map(AuditActee::Project)
            .or_else(|| actee_actor.map(AuditActee::Actor))
            .or_else(|| form.map(|form| AuditActee::Form(FormContext { form, def })));
        Self { actor, actee }
    }
}

/// An entry with optional joined context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// The entry.
    #[serde(flatten)]
    pub audit: Audit,
    /// Present only for extended queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<AuditContext>,
}
