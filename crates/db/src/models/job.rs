//! Generation job entity and DTOs.

use melodia_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::JobStatus;

/// A row from the `jobs` table.
///
/// Rows are never deleted — completed and failed jobs are retained for
/// audit and history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub user_id: DbId,
    pub prompt: String,
    pub style: String,
    pub voice_gender: Option<String>,
    pub mode: String,
    pub status: JobStatus,
    /// External task id, absent until the job is submitted to the provider.
    pub provider_task_id: Option<String>,
    pub audio_urls: Vec<String>,
    pub image_urls: Vec<String>,
    pub titles: Vec<String>,
    /// 0 or 1, assigned exactly once at the transition into `Complete`.
    pub credits_spent: i32,
    /// Fixed at creation; never re-evaluated even if the live balance moves.
    pub is_free_tier: bool,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Input for creating a new job.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub prompt: String,
    pub style: String,
    pub voice_gender: Option<String>,
    pub mode: String,
    pub is_free_tier: bool,
}

/// Artifact set written by the winning completion claim.
///
/// Parallel arrays, bounded to the provider's two variants.
#[derive(Debug, Clone, Default)]
pub struct JobArtifacts {
    pub audio_urls: Vec<String>,
    pub image_urls: Vec<String>,
    pub titles: Vec<String>,
}
