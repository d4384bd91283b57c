//! Submission flow: gate checks, job creation, provider submit.
//!
//! The credit pool is chosen exactly once here, recorded on the job as
//! `is_free_tier`, and never re-evaluated. No money moves at submission;
//! the debit belongs to the completion claim.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;

use melodia_core::policy::select_pool;
use melodia_core::types::DbId;
use melodia_core::CoreError;
use melodia_db::models::job::{Job, NewJob};
use melodia_db::repositories::{JobRepo, UserRepo};
use melodia_events::EventBus;
use melodia_suno::{GenerationParams, SunoApiError, SunoClient, CONTENT_POLICY};

use crate::error::PipelineError;
use crate::poller;
use crate::reconciler::Reconciler;
use crate::settings::PipelineSettings;

/// Accepts generation requests and hands them to the provider.
pub struct Submitter {
    pool: PgPool,
    bus: Arc<EventBus>,
    client: Arc<SunoClient>,
    settings: PipelineSettings,
}

impl Submitter {
    pub fn new(
        pool: PgPool,
        bus: Arc<EventBus>,
        client: Arc<SunoClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            pool,
            bus,
            client,
            settings,
        }
    }

    /// Submit one generation for `user_id`.
    ///
    /// Returns the job in `submitted` status with its provider task id
    /// attached. Completion arrives later through the webhook or, when no
    /// callback URL is configured, the polling fallback this method spawns.
    pub async fn submit(
        &self,
        user_id: DbId,
        params: GenerationParams,
    ) -> Result<Job, PipelineError> {
        if params.prompt.trim().is_empty() {
            return Err(CoreError::Validation("prompt must not be empty".into()).into());
        }

        let user = UserRepo::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "user",
                id: user_id,
            })?;
        if user.is_blocked {
            return Err(CoreError::UserBlocked { user_id }.into());
        }

        self.check_rate_limits(user_id).await?;

        let snapshot = user.balance_snapshot();
        let Some(charged_pool) = select_pool(&snapshot, &self.settings.free_tier, Utc::now())
        else {
            return Err(CoreError::InsufficientCredits { user_id }.into());
        };
        let is_free_tier = charged_pool == melodia_core::policy::CreditPool::Free;

        let job = JobRepo::create(
            &self.pool,
            user_id,
            &NewJob {
                prompt: params.prompt.clone(),
                style: params.style.clone(),
                voice_gender: params.voice_gender.clone(),
                mode: params.mode.as_str().to_string(),
                is_free_tier,
            },
        )
        .await?;
        tracing::info!(
            job_id = job.id,
            user_id,
            free_tier = is_free_tier,
            mode = params.mode.as_str(),
            "Job created"
        );

        let task_id = match self.client.submit(&params).await {
            Ok(task_id) => task_id,
            Err(e) => {
                self.fail_submission(job, &e).await?;
                return Err(e.into());
            }
        };

        if !JobRepo::mark_submitted(&self.pool, job.id, &task_id).await? {
            // Only possible if something else terminalized the job between
            // create and submit, e.g. an aggressive watchdog timeout.
            tracing::warn!(job_id = job.id, "Job left created state before submit ack");
        }
        tracing::info!(job_id = job.id, task_id = %task_id, "Job submitted to provider");

        if !self.client.has_webhook_channel() {
            poller::spawn(
                self.pool.clone(),
                self.bus.clone(),
                self.client.clone(),
                self.settings,
                job.id,
                task_id,
            );
        }

        let job = JobRepo::find_by_id(&self.pool, job.id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "job",
                id: job.id,
            })?;
        Ok(job)
    }

    /// Terminalize a job whose provider submission failed. Content-policy
    /// rejections count as violations; nothing is ever charged.
    async fn fail_submission(&self, job: Job, error: &SunoApiError) -> Result<(), PipelineError> {
        let detail = match error {
            SunoApiError::ContentPolicy(_) => CONTENT_POLICY.to_string(),
            other => format!("submission failed: {other}"),
        };
        tracing::warn!(job_id = job.id, error = %error, "Provider rejected submission");

        let reconciler = Reconciler::new(self.pool.clone(), self.bus.clone());
        reconciler.force_error(job, &detail).await?;
        Ok(())
    }

    async fn check_rate_limits(&self, user_id: DbId) -> Result<(), PipelineError> {
        let today = JobRepo::count_user_jobs_today(&self.pool, user_id).await?;
        if today >= self.settings.max_jobs_per_user_per_day {
            return Err(
                CoreError::RateLimited(format!("daily limit of {today} generations reached"))
                    .into(),
            );
        }

        let last_hour = JobRepo::count_jobs_last_hour(&self.pool).await?;
        if last_hour >= self.settings.max_jobs_per_hour {
            return Err(CoreError::RateLimited("service is busy, try again later".into()).into());
        }

        Ok(())
    }
}
