//! Background processing of actionable audit entries.
//!
//! Workers share no state besides the `processed` and `failures` columns, so
//! any number of them may run against the same database. An entry may be
//! handled more than once if two workers pick it up together; jobs must be
//! idempotent.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::{AuditError, JobError};
use super::service::AuditRepository;
use super::types::Audit;

/// Follow-up work for one actionable audit entry.
pub trait AuditJob: Send + Sync {
    /// Handle an entry. Must be safe to repeat.
    fn run(&self, audit: &Audit) -> impl std::future::Future<Output = Result<(), JobError>> + Send;
}

/// Outcome of one polling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Entries this worker marked processed.
    pub processed: usize,
    /// Entries some other worker finished first.
    pub skipped: usize,
    /// Entries whose job failed.
    pub failed: usize,
}

impl WorkerReport {
    /// Whether the pass found nothing to do.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.processed + self.skipped + self.failed == 0
    }
}

/// Polls the audit log for pending entries and runs a job on each.
pub struct AuditWorker<R: AuditRepository, J: AuditJob> {
    repo: Arc<R>,
    job: Arc<J>,
    batch_size: u64,
    max_failures: i32,
    poll_interval: Duration,
}

impl<R: AuditRepository, J: AuditJob> AuditWorker<R, J> {
    /// Create a new worker.
    #[must_use]
    pub fn new(
        repo: Arc<R>,
        job: Arc<J>,
        batch_size: u64,
        max_failures: i32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            repo,
            job,
            batch_size,
            max_failures,
            poll_interval,
        }
    }

    /// Process one batch of pending entries.
    pub async fn run_once(&self) -> Result<WorkerReport, AuditError> {
        let pending = self.repo.pending(self.batch_size, self.max_failures).await?;
        let mut report = WorkerReport::default();

        for audit in pending {
            match self.job.run(&audit).await {
                Ok(()) => {
                    if self.repo.mark_processed(audit.id).await? {
                        report.processed += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        audit_id = %audit.id,
                        action = %audit.action,
                        failures = audit.failures + 1,
                        error = %e,
                        "audit job failed"
                    );
                    self.repo.record_failure(audit.id).await?;
                    report.failed += 1;
                }
            }
        }

        if !report.is_idle() {
            debug!(?report, "audit batch done");
        }
        Ok(report)
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Full batches are followed immediately by another pass; idle or failed
    /// passes wait one poll interval.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            batch_size = self.batch_size,
            max_failures = self.max_failures,
            poll_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "audit worker started"
        );

        loop {
            let pass = tokio::select! {
                () = shutdown.cancelled() => break,
                pass = self.run_once() => pass,
            };

            let busy = match pass {
                Ok(report) => {
                    let handled = report.processed + report.skipped + report.failed;
                    u64::try_from(handled).is_ok_and(|n| n >= self.batch_size)
                }
                Err(e) => {
                    error!(error = %e, "audit poll failed");
                    false
                }
            };

            if !busy {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }

        info!("audit worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::service::tests::MockAuditRepository;
    use crate::audit::{Action, NewAudit};
    use quire_shared::types::AuditId;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Fails for chosen entries, records the rest.
    #[derive(Default)]
    struct RecordingJob {
        fail: HashSet<AuditId>,
        seen: Mutex<Vec<AuditId>>,
    }

    impl AuditJob for RecordingJob {
        async fn run(&self, audit: &Audit) -> Result<(), JobError> {
            self.seen.lock().unwrap().push(audit.id);
            if self.fail.contains(&audit.id) {
                return Err(JobError::MissingBlob(quire_shared::types::BlobId(0)));
            }
            Ok(())
        }
    }

    async fn seed(repo: &MockAuditRepository, actions: &[Action]) {
        for action in actions {
            repo.insert(NewAudit::of(None, *action, None, None))
                .await
                .unwrap();
        }
    }

    fn worker(
        repo: &Arc<MockAuditRepository>,
        job: &Arc<RecordingJob>,
        max_failures: i32,
    ) -> AuditWorker<MockAuditRepository, RecordingJob> {
        AuditWorker::new(
            repo.clone(),
            job.clone(),
            10,
            max_failures,
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_run_once_processes_only_actionable() {
        let repo = Arc::new(MockAuditRepository::default());
        seed(
            &repo,
            &[
                Action::FormCreate,
                Action::SubmissionCreate,
                Action::SubmissionAttachmentUpdate,
            ],
        )
        .await;
        let job = Arc::new(RecordingJob::default());

        let report = worker(&repo, &job, 5).run_once().await.unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(*job.seen.lock().unwrap(), vec![AuditId(2), AuditId(3)]);
        assert!(repo.get(AuditId(2)).unwrap().processed.is_some());
        assert!(worker(&repo, &job, 5).run_once().await.unwrap().is_idle());
    }

    #[tokio::test]
    async fn test_failures_count_until_max() {
        let repo = Arc::new(MockAuditRepository::default());
        seed(&repo, &[Action::SubmissionCreate]).await;
        let job = Arc::new(RecordingJob {
            fail: HashSet::from([AuditId(1)]),
            ..RecordingJob::default()
        });
        let worker = worker(&repo, &job, 2);

        assert_eq!(worker.run_once().await.unwrap().failed, 1);
        assert_eq!(worker.run_once().await.unwrap().failed, 1);
        // exhausted: no longer picked up
        assert!(worker.run_once().await.unwrap().is_idle());

        let row = repo.get(AuditId(1)).unwrap();
        assert_eq!(row.failures, 2);
        assert!(row.processed.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let repo = Arc::new(MockAuditRepository::default());
        seed(&repo, &[Action::SubmissionUpdateVersion]).await;
        let job = Arc::new(RecordingJob::default());
        let worker = Arc::new(worker(&repo, &job, 5));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let worker = worker.clone();
            let shutdown = shutdown.clone();
            async move { worker.run(shutdown).await }
        });

        for _ in 0..100 {
            if repo.get(AuditId(1)).unwrap().processed.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
        handle.await.unwrap();

        assert!(repo.get(AuditId(1)).unwrap().processed.is_some());
    }
}
