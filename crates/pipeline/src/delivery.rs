//! Delivery orchestrator: turns a won completion claim into per-track
//! delivery events and optional video sub-tasks.
//!
//! Runs as fire-and-forget work spawned by whichever producer won the
//! claim, so the webhook handler can acknowledge immediately. A fetch
//! failure here skips that track; it never reverts the completion or the
//! debit.

use std::sync::Arc;

use sqlx::PgPool;

use melodia_core::policy::MAX_TRACK_VARIANTS;
use melodia_db::models::job::Job;
use melodia_db::repositories::{JobRepo, VideoTaskRepo};
use melodia_events::{EventBus, PlatformEvent, DELIVERY_TRACK, DELIVERY_VIDEO_READY};
use melodia_suno::{SunoClient, TrackArtifact};

use crate::error::PipelineError;

/// Rendering fidelity hint for the presentation layer.
///
/// Free-tier deliveries are flagged for clipped playback; the actual audio
/// trimming is the media collaborator's job, not ours.
fn fidelity_for(is_free_tier: bool) -> &'static str {
    if is_free_tier {
        "clipped"
    } else {
        "full"
    }
}

/// Fetches finished artifacts and hands them to the output channel.
pub struct DeliveryOrchestrator {
    pool: PgPool,
    bus: Arc<EventBus>,
    client: Arc<SunoClient>,
    video_enabled: bool,
}

impl DeliveryOrchestrator {
    pub fn new(
        pool: PgPool,
        bus: Arc<EventBus>,
        client: Arc<SunoClient>,
        video_enabled: bool,
    ) -> Self {
        Self {
            pool,
            bus,
            client,
            video_enabled,
        }
    }

    /// Deliver every fetched track of a completed job.
    ///
    /// Best effort per track: a failed download logs and skips, the rest
    /// still go out.
    pub async fn deliver(&self, job: &Job, tracks: &[TrackArtifact]) {
        let fidelity = fidelity_for(job.is_free_tier);

        for (index, track) in tracks.iter().take(MAX_TRACK_VARIANTS).enumerate() {
            let audio = match self.client.fetch_audio(&track.audio_url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(
                        job_id = job.id,
                        variant_index = index,
                        url = %track.audio_url,
                        error = %e,
                        "Audio fetch failed, skipping track"
                    );
                    continue;
                }
            };

            tracing::info!(
                job_id = job.id,
                variant_index = index,
                bytes = audio.len(),
                fidelity,
                "Track ready for delivery"
            );
            self.bus.publish(
                PlatformEvent::new(DELIVERY_TRACK)
                    .for_job(job.id)
                    .for_user(job.user_id)
                    .with_payload(serde_json::json!({
                        "variant_index": index,
                        "title": track.title,
                        "audio_url": track.audio_url,
                        "image_url": track.image_url,
                        "audio_bytes": audio.len(),
                        "fidelity": fidelity,
                    })),
            );

            if self.video_enabled {
                self.submit_video(job, index, track).await;
            }
        }
    }

    /// Submit one video sub-task and persist it for the later callback.
    /// Errors are logged and swallowed; video is strictly additive.
    async fn submit_video(&self, job: &Job, index: usize, track: &TrackArtifact) {
        let Some(task_id) = job.provider_task_id.as_deref() else {
            return;
        };

        let video_task_id = match self.client.generate_video(task_id, &track.id).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    job_id = job.id,
                    variant_index = index,
                    error = %e,
                    "Video submission failed"
                );
                return;
            }
        };

        if let Err(e) = VideoTaskRepo::create(
            &self.pool,
            &video_task_id,
            job.id,
            index as i32,
            &track.title,
        )
        .await
        {
            tracing::error!(
                job_id = job.id,
                video_task_id = %video_task_id,
                error = %e,
                "Failed to persist video task"
            );
            return;
        }

        tracing::info!(
            job_id = job.id,
            variant_index = index,
            video_task_id = %video_task_id,
            "Video sub-task submitted"
        );
    }

    /// Resolve a video sub-task from its provider callback.
    ///
    /// Same claim discipline as jobs: only the first resolution for a task
    /// id mutates the row and emits an event. Returns `false` for unknown
    /// task ids and lost claims.
    pub async fn resolve_video(
        &self,
        provider_task_id: &str,
        video_url: Option<&str>,
        error: Option<&str>,
    ) -> Result<bool, PipelineError> {
        let Some(task) = VideoTaskRepo::find_by_task_id(&self.pool, provider_task_id).await? else {
            tracing::warn!(
                video_task_id = provider_task_id,
                "Video callback for unknown task, ignoring"
            );
            return Ok(false);
        };

        match (video_url, error) {
            (Some(url), _) => {
                let won =
                    VideoTaskRepo::claim_complete(&self.pool, provider_task_id, url).await?;
                if !won {
                    return Ok(false);
                }

                let user_id = JobRepo::find_by_id(&self.pool, task.job_id)
                    .await?
                    .map(|job| job.user_id);
                tracing::info!(
                    job_id = task.job_id,
                    variant_index = task.variant_index,
                    "Video ready"
                );
                let mut event = PlatformEvent::new(DELIVERY_VIDEO_READY)
                    .for_job(task.job_id)
                    .with_payload(serde_json::json!({
                        "variant_index": task.variant_index,
                        "title": task.title,
                        "video_url": url,
                    }));
                if let Some(user_id) = user_id {
                    event = event.for_user(user_id);
                }
                self.bus.publish(event);
                Ok(true)
            }
            (None, detail) => {
                let detail = detail.unwrap_or("video generation failed");
                let won =
                    VideoTaskRepo::claim_error(&self.pool, provider_task_id, detail).await?;
                if won {
                    tracing::warn!(
                        job_id = task.job_id,
                        variant_index = task.variant_index,
                        error = detail,
                        "Video sub-task failed"
                    );
                }
                Ok(won)
            }
        }
    }
}
