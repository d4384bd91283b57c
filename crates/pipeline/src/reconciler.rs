//! Completion reconciler: the single state machine every completion signal
//! flows through.
//!
//! Webhook callbacks, poll results, and watchdog timeouts all converge on
//! the same conditional-UPDATE claim in `JobRepo`. Whoever wins the claim
//! owns the side effects (debit, events); everyone else observes a
//! [`Reconciliation::Duplicate`] and does nothing. The debit is bundled
//! with the claim in one transaction so a lost race writes nothing at all.

use std::sync::Arc;

use sqlx::PgPool;

use melodia_core::policy::{credits_spent_for_tier, CreditPool, GENERATION_COST};
use melodia_db::models::job::{Job, JobArtifacts};
use melodia_db::models::status::LedgerSource;
use melodia_db::repositories::{JobRepo, LedgerRepo, UserRepo};
use melodia_events::{EventBus, PlatformEvent, GENERATION_DELIVERED, GENERATION_FAILED};
use melodia_suno::{TaskOutcome, TrackArtifact, CONTENT_POLICY};

use crate::error::PipelineError;

/// What a completion signal resolved to.
#[derive(Debug)]
pub enum Reconciliation {
    /// This signal won the claim; the job is now `complete` and the caller
    /// should hand the tracks to the delivery orchestrator.
    Completed { job: Job, tracks: Vec<TrackArtifact> },
    /// This signal won the claim into `error`.
    Failed { job: Job, error: String },
    /// Another producer already terminalized the job. Defined no-op.
    Duplicate,
    /// No job carries this task id. Acknowledged, never an error.
    UnknownTask,
    /// An intermediate signal; the job stays in flight.
    Pending,
}

/// Normalizes webhook and poll signals into exactly-once state transitions.
pub struct Reconciler {
    pool: PgPool,
    bus: Arc<EventBus>,
}

impl Reconciler {
    pub fn new(pool: PgPool, bus: Arc<EventBus>) -> Self {
        Self { pool, bus }
    }

    /// Apply one completion signal for `task_id`.
    ///
    /// Safe to call arbitrarily many times for the same task, concurrently
    /// from any producer.
    pub async fn handle_signal(
        &self,
        task_id: &str,
        outcome: TaskOutcome,
    ) -> Result<Reconciliation, PipelineError> {
        let Some(job) = JobRepo::find_by_task_id(&self.pool, task_id).await? else {
            tracing::warn!(task_id, "Completion signal for unknown task, ignoring");
            return Ok(Reconciliation::UnknownTask);
        };

        if job.status.is_terminal() {
            tracing::debug!(
                job_id = job.id,
                task_id,
                status = job.status.as_str(),
                "Duplicate completion signal, job already terminal"
            );
            return Ok(Reconciliation::Duplicate);
        }

        match outcome {
            TaskOutcome::Pending => Ok(Reconciliation::Pending),
            TaskOutcome::Complete(tracks) => self.complete(job, tracks).await,
            TaskOutcome::Error(detail) => self.fail(job, detail).await,
        }
    }

    /// Force a job into `error` without a task-level signal. Used by the
    /// watchdog and for submission failures; same claim, never a debit.
    pub async fn force_error(
        &self,
        job: Job,
        detail: &str,
    ) -> Result<Reconciliation, PipelineError> {
        self.fail(job, detail.to_string()).await
    }

    // ---- claim paths ----

    async fn complete(
        &self,
        job: Job,
        tracks: Vec<TrackArtifact>,
    ) -> Result<Reconciliation, PipelineError> {
        let artifacts = artifacts_from(&tracks);
        let credits_spent = credits_spent_for_tier(job.is_free_tier);

        let mut tx = self.pool.begin().await?;
        let won = JobRepo::claim_complete(&mut tx, job.id, &artifacts, credits_spent).await?;
        if !won {
            tx.rollback().await?;
            tracing::debug!(job_id = job.id, "Lost completion claim, no debit");
            return Ok(Reconciliation::Duplicate);
        }

        let charged_pool = if job.is_free_tier {
            CreditPool::Free
        } else {
            CreditPool::Paid
        };
        let debited = LedgerRepo::debit(
            &mut tx,
            job.user_id,
            charged_pool,
            GENERATION_COST,
            LedgerSource::GenerationDebit,
            &format!("generation job {}", job.id),
        )
        .await?;
        tx.commit().await?;

        if !debited {
            // The pool was drained between submission and completion. The
            // completed work is still delivered; the shortfall is only
            // logged.
            tracing::warn!(
                job_id = job.id,
                user_id = job.user_id,
                pool = ?charged_pool,
                "Completion debit found an empty pool"
            );
        }

        UserRepo::touch_last_generation(&self.pool, job.user_id).await?;

        tracing::info!(
            job_id = job.id,
            user_id = job.user_id,
            track_count = tracks.len(),
            free_tier = job.is_free_tier,
            "Job completed"
        );
        self.bus.publish(
            PlatformEvent::new(GENERATION_DELIVERED)
                .for_job(job.id)
                .for_user(job.user_id)
                .with_payload(serde_json::json!({ "track_count": tracks.len() })),
        );

        let job = JobRepo::find_by_id(&self.pool, job.id)
            .await?
            .unwrap_or(job);
        Ok(Reconciliation::Completed { job, tracks })
    }

    async fn fail(&self, job: Job, detail: String) -> Result<Reconciliation, PipelineError> {
        let mut conn = self.pool.acquire().await?;
        let won = JobRepo::claim_error(&mut conn, job.id, &detail).await?;
        drop(conn);
        if !won {
            tracing::debug!(job_id = job.id, "Lost error claim");
            return Ok(Reconciliation::Duplicate);
        }

        if detail == CONTENT_POLICY {
            let (violations, blocked) =
                UserRepo::increment_violations(&self.pool, job.user_id).await?;
            tracing::warn!(
                job_id = job.id,
                user_id = job.user_id,
                violations,
                blocked,
                "Content policy violation recorded"
            );
        }

        tracing::info!(job_id = job.id, error = %detail, "Job failed");
        self.bus.publish(
            PlatformEvent::new(GENERATION_FAILED)
                .for_job(job.id)
                .for_user(job.user_id)
                .with_payload(serde_json::json!({ "error": detail })),
        );

        Ok(Reconciliation::Failed { job, error: detail })
    }
}

/// Flatten tracks into the parallel arrays persisted on the job row.
///
/// A missing image is stored as an empty string so the arrays stay
/// index-aligned.
fn artifacts_from(tracks: &[TrackArtifact]) -> JobArtifacts {
    let mut artifacts = JobArtifacts::default();
    for track in tracks {
        artifacts.audio_urls.push(track.audio_url.clone());
        artifacts
            .image_urls
            .push(track.image_url.clone().unwrap_or_default());
        artifacts.titles.push(track.title.clone());
    }
    artifacts
}
