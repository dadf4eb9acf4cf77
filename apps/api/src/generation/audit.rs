//! Generation audit trail.
//!
//! Attempts are recorded through `AuditQueue`, which hands entries to a
//! background worker. A slow or failing sink can never delay or fail generation:
//! `record` does not await and sink errors stop at the worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::generation_log::{GenerationLogEntry, GenerationLogRow};

#[async_trait]
pub trait GenerationLogSink: Send + Sync {
    async fn log_attempt(&self, entry: &GenerationLogEntry) -> Result<(), AppError>;
}

/// Persists attempts to the `cv_generation_logs` table.
pub struct PgGenerationLogSink {
    pool: PgPool,
}

impl PgGenerationLogSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenerationLogSink for PgGenerationLogSink {
    async fn log_attempt(&self, entry: &GenerationLogEntry) -> Result<(), AppError> {
        let gaps = serde_json::to_value(&entry.gaps)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize gaps: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO cv_generation_logs (id, user_id, resume_id, job_id, score, gaps, iteration)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.resume_id)
        .bind(&entry.job_id)
        .bind(entry.score.map(|s| s as i32))
        .bind(&gaps)
        .bind(entry.iteration as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Returns the audit trail of a resume, oldest first.
pub async fn list_generation_logs(
    pool: &PgPool,
    resume_id: Uuid,
) -> Result<Vec<GenerationLogRow>, AppError> {
    let rows = sqlx::query_as::<_, GenerationLogRow>(
        r#"
        SELECT id, user_id, resume_id, job_id, score, gaps, iteration, created_at
        FROM cv_generation_logs
        WHERE resume_id = $1
        ORDER BY created_at, iteration
        "#,
    )
    .bind(resume_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fire-and-forget handle onto the audit worker. Cheap to clone.
#[derive(Clone)]
pub struct AuditQueue {
    sender: UnboundedSender<GenerationLogEntry>,
    failures: Arc<AtomicU64>,
}

impl AuditQueue {
    /// Starts the worker task. It runs until every `AuditQueue` clone is dropped,
    /// then drains what is still queued and exits.
    pub fn spawn(sink: Arc<dyn GenerationLogSink>) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = unbounded_channel();
        let failures = Arc::new(AtomicU64::new(0));
        let worker = tokio::spawn(run_worker(receiver, sink, failures.clone()));
        (Self { sender, failures }, worker)
    }

    /// Queues an entry without waiting. Dropped with a warning if the worker is gone.
    pub fn record(&self, entry: GenerationLogEntry) {
        if let Err(e) = self.sender.send(entry) {
            warn!(
                resume_id = %e.0.resume_id,
                iteration = e.0.iteration,
                "Audit worker stopped; generation log entry dropped"
            );
        }
    }

    /// Number of entries the sink failed to store since startup.
    pub fn failed_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

async fn run_worker(
    mut receiver: UnboundedReceiver<GenerationLogEntry>,
    sink: Arc<dyn GenerationLogSink>,
    failures: Arc<AtomicU64>,
) {
    while let Some(entry) = receiver.recv().await {
        match sink.log_attempt(&entry).await {
            Ok(()) => debug!(
                resume_id = %entry.resume_id,
                iteration = entry.iteration,
                "Generation attempt logged"
            ),
            Err(e) => {
                failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    resume_id = %entry.resume_id,
                    iteration = entry.iteration,
                    "Failed to log generation attempt: {e}"
                );
            }
        }
    }
    debug!("Audit worker stopped");
}
