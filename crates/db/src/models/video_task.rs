//! Durable tracking for secondary video generation sub-tasks.
//!
//! Replaces a volatile in-process task map: the provider's video task id is
//! keyed to its delivery context here so a restart cannot orphan a pending
//! video.

use melodia_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::VideoTaskStatus;

/// A row from the `video_tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VideoTask {
    pub id: DbId,
    /// External video task id assigned by the provider.
    pub provider_task_id: String,
    pub job_id: DbId,
    /// Which of the job's track variants this video belongs to.
    pub variant_index: i32,
    pub title: String,
    pub status: VideoTaskStatus,
    pub video_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}
