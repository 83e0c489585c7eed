//! Quire audit worker
//!
//! Polls the audit log for actionable entries and runs follow-up jobs on
//! them until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quire_core::audit::{AuditWorker, BlobIntegrityJob};
use quire_db::{AuditRepository, BlobRepository, connect_with};
use quire_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quire=debug,sea_orm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    let audits = Arc::new(AuditRepository::new(db.clone()));
    let job = Arc::new(BlobIntegrityJob::new(Arc::new(BlobRepository::new(db))));
    let worker = AuditWorker::new(
        audits,
        job,
        config.worker.batch_size,
        config.worker.max_failures,
        Duration::from_millis(config.worker.poll_interval_ms),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    shutdown.cancel();
                }
                Err(e) => warn!(error = %e, "Cannot listen for shutdown signal"),
            }
        }
    });

    worker.run(shutdown).await;
    Ok(())
}
