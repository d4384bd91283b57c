//! Stuck-job watchdog.
//!
//! A single periodic sweep that force-fails jobs the provider never
//! reported on. It uses the exact same error claim as the reconciler, so a
//! late webhook racing the sweep still resolves to exactly one terminal
//! state. Timed-out jobs are never debited.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use melodia_db::repositories::JobRepo;
use melodia_events::{EventBus, PlatformEvent, GENERATION_FAILED};

use crate::settings::PipelineSettings;

/// Error detail recorded on watchdog-claimed jobs.
pub const TIMEOUT_ERROR: &str = "timeout";

/// Periodic sweep over non-terminal jobs older than the timeout.
pub struct Watchdog {
    pool: PgPool,
    bus: Arc<EventBus>,
    settings: PipelineSettings,
}

impl Watchdog {
    pub fn new(pool: PgPool, bus: Arc<EventBus>, settings: PipelineSettings) -> Self {
        Self {
            pool,
            bus,
            settings,
        }
    }

    /// Run the sweep loop until `cancel` is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.settings.watchdog_interval);
        tracing::info!(
            interval_secs = self.settings.watchdog_interval.as_secs(),
            timeout_mins = self.settings.watchdog_timeout.num_minutes(),
            "Watchdog started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Watchdog shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = %e, "Watchdog sweep failed");
                    }
                }
            }
        }
    }

    /// One sweep: claim every overdue job into `error("timeout")`.
    ///
    /// Only jobs whose claim this sweep actually won get a failure event; a
    /// job completed between the list and the claim is left alone.
    pub async fn sweep(&self) -> Result<usize, sqlx::Error> {
        let cutoff = Utc::now() - self.settings.watchdog_timeout;
        let stuck = JobRepo::list_stuck(&self.pool, cutoff).await?;
        if stuck.is_empty() {
            return Ok(0);
        }

        let mut claimed = 0;
        for job in stuck {
            let mut conn = self.pool.acquire().await?;
            let won = JobRepo::claim_error(&mut conn, job.id, TIMEOUT_ERROR).await?;
            drop(conn);
            if !won {
                continue;
            }

            claimed += 1;
            tracing::warn!(
                job_id = job.id,
                user_id = job.user_id,
                age_mins = (Utc::now() - job.created_at).num_minutes(),
                "Job timed out"
            );
            self.bus.publish(
                PlatformEvent::new(GENERATION_FAILED)
                    .for_job(job.id)
                    .for_user(job.user_id)
                    .with_payload(serde_json::json!({ "error": TIMEOUT_ERROR })),
            );
        }

        Ok(claimed)
    }
}
