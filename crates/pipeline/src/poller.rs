//! Polling fallback for deployments without a public callback URL.
//!
//! One lightweight task per in-flight job, spawned at submission. It feeds
//! poll results through the same reconciler as the webhook path; if the
//! deadline passes without a terminal outcome the task just stops, and the
//! watchdog owns the forced timeout.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::time::Instant;

use melodia_core::types::DbId;
use melodia_events::EventBus;
use melodia_suno::{SunoClient, TaskOutcome};

use crate::delivery::DeliveryOrchestrator;
use crate::reconciler::{Reconciler, Reconciliation};
use crate::settings::PipelineSettings;

/// Spawn the poll loop for one submitted job.
pub fn spawn(
    pool: PgPool,
    bus: Arc<EventBus>,
    client: Arc<SunoClient>,
    settings: PipelineSettings,
    job_id: DbId,
    task_id: String,
) {
    tokio::spawn(async move {
        run(pool, bus, client, settings, job_id, task_id).await;
    });
}

async fn run(
    pool: PgPool,
    bus: Arc<EventBus>,
    client: Arc<SunoClient>,
    settings: PipelineSettings,
    job_id: DbId,
    task_id: String,
) {
    let reconciler = Reconciler::new(pool.clone(), bus.clone());
    let delivery = DeliveryOrchestrator::new(
        pool,
        bus,
        client.clone(),
        settings.video_generation_enabled,
    );
    let deadline = Instant::now() + settings.generation_timeout;

    tracing::debug!(job_id, task_id = %task_id, "Poll loop started");
    tokio::time::sleep(settings.poll_initial_delay).await;

    let mut ticker = tokio::time::interval(settings.poll_interval);
    loop {
        ticker.tick().await;
        if Instant::now() >= deadline {
            // The watchdog will claim the timeout if the job is still open.
            tracing::debug!(job_id, task_id = %task_id, "Poll deadline reached");
            return;
        }

        let outcome = match client.poll(&task_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(job_id, task_id = %task_id, error = %e, "Poll request failed");
                continue;
            }
        };
        if matches!(outcome, TaskOutcome::Pending) {
            continue;
        }

        match reconciler.handle_signal(&task_id, outcome).await {
            Ok(Reconciliation::Completed { job, tracks }) => {
                delivery.deliver(&job, &tracks).await;
                return;
            }
            Ok(Reconciliation::Pending) => continue,
            Ok(_) => return,
            Err(e) => {
                tracing::error!(job_id, task_id = %task_id, error = %e, "Poll reconciliation failed");
                continue;
            }
        }
    }
}
