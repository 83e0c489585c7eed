//! Audit log service implementation.

use std::sync::Arc;

use quire_shared::types::AuditId;
use tracing::debug;

use super::action::Action;
use super::error::AuditError;
use super::types::{Actee, ActorRef, Audit, AuditQuery, AuditRecord, NewAudit};

/// Repository trait for audit persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait AuditRepository: Send + Sync {
    /// Append an entry, stamping `processed` for non-actionable actions.
    fn insert(
        &self,
        entry: NewAudit,
    ) -> impl std::future::Future<Output = Result<Audit, AuditError>> + Send;

    /// Entries matching `query`, newest first.
    fn find(
        &self,
        query: &AuditQuery,
    ) -> impl std::future::Future<Output = Result<Vec<AuditRecord>, AuditError>> + Send;

    /// Most recent entry with exactly this action.
    fn latest_by_action(
        &self,
        action: &str,
    ) -> impl std::future::Future<Output = Result<Option<Audit>, AuditError>> + Send;

    /// Unprocessed entries with fewer than `max_failures` failures, oldest first.
    fn pending(
        &self,
        limit: u64,
        max_failures: i32,
    ) -> impl std::future::Future<Output = Result<Vec<Audit>, AuditError>> + Send;

    /// Mark an entry processed if nobody has yet. Returns whether this call did.
    fn mark_processed(
        &self,
        id: AuditId,
    ) -> impl std::future::Future<Output = Result<bool, AuditError>> + Send;

    /// Count one failed processing attempt.
    fn record_failure(
        &self,
        id: AuditId,
    ) -> impl std::future::Future<Output = Result<(), AuditError>> + Send;
}

/// Audit log service.
pub struct AuditLog<R: AuditRepository> {
    repo: Arc<R>,
}

impl<R: AuditRepository> AuditLog<R> {
    /// Create a new audit log service.
    #[must_use]
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Append one entry.
    pub async fn log(
        &self,
        actor: Option<&ActorRef>,
        action: Action,
        actee: Option<&dyn Actee>,
        details: Option<serde_json::Value>,
    ) -> Result<Audit, AuditError> {
        let entry = NewAudit::of(actor, action, actee, details);
        let audit = self.repo.insert(entry).await?;
        debug!(audit_id = %audit.id, action = %audit.action, "audit logged");
        Ok(audit)
    }

    /// Append one entry given its action name.
    pub async fn log_named(
        &self,
        actor: Option<&ActorRef>,
        action: &str,
        actee: Option<&dyn Actee>,
        details: Option<serde_json::Value>,
    ) -> Result<Audit, AuditError> {
        let action: Action = action.parse()?;
        self.log(actor, action, actee, details).await
    }

    /// Query the log.
    pub async fn get(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, AuditError> {
        self.repo.find(query).await
    }

    /// Most recent entry for an exact action, e.g. the last `backup`.
    pub async fn get_latest_by_action(&self, action: &str) -> Result<Option<Audit>, AuditError> {
        self.repo.latest_by_action(action).await
    }
}
