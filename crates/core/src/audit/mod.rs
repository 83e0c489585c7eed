//! Append-only audit log.
//!
//! Every attachment mutation is recorded here, in the same transaction as
//! the mutation itself. Entries are never edited afterwards except for the
//! two bookkeeping columns owned by the background worker:
//!
//! - `processed` is stamped at insert time for non-actionable actions and
//!   left empty for actionable ones until a worker has handled them.
//! - `failures` counts failed processing attempts.

mod action;
mod category;
mod error;
mod jobs;
mod service;
mod types;
mod worker;

pub use action::Action;
pub use category::{ActionFilter, CATEGORIES, CategoryRule};
pub use error::{AuditError, JobError};
pub use jobs::BlobIntegrityJob;
pub use service::{AuditLog, AuditRepository};
pub use types::{
    Actee, ActorRef, ActorSummary, Audit, AuditActee, AuditContext, AuditQuery, AuditRecord,
    FormContext, FormDefSummary, FormRef, FormSummary, NewAudit, ProjectRef, ProjectSummary,
};
pub use worker::{AuditJob, AuditWorker, WorkerReport};
