//! Repository for the `video_tasks` table.
//!
//! Video sub-tasks follow the same claim discipline as jobs: a conditional
//! UPDATE guarded on the pending status, so a retried video callback is a
//! no-op.

use sqlx::PgPool;

use melodia_core::types::DbId;

use crate::models::status::VideoTaskStatus;
use crate::models::video_task::VideoTask;

/// Column list for `video_tasks` queries.
const COLUMNS: &str = "\
    id, provider_task_id, job_id, variant_index, title, status, \
    video_url, error_message, created_at, completed_at";

/// Durable keyed store: provider video task id -> delivery context.
pub struct VideoTaskRepo;

impl VideoTaskRepo {
    /// Register a newly submitted video sub-task in `pending` status.
    pub async fn create(
        pool: &PgPool,
        provider_task_id: &str,
        job_id: DbId,
        variant_index: i32,
        title: &str,
    ) -> Result<VideoTask, sqlx::Error> {
        let query = format!(
            "INSERT INTO video_tasks (provider_task_id, job_id, variant_index, title) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VideoTask>(&query)
            .bind(provider_task_id)
            .bind(job_id)
            .bind(variant_index)
            .bind(title)
            .fetch_one(pool)
            .await
    }

    /// Find a video task by its provider task id.
    pub async fn find_by_task_id(
        pool: &PgPool,
        provider_task_id: &str,
    ) -> Result<Option<VideoTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM video_tasks WHERE provider_task_id = $1");
        sqlx::query_as::<_, VideoTask>(&query)
            .bind(provider_task_id)
            .fetch_optional(pool)
            .await
    }

    /// Claim `pending -> complete` with the playable URL. Returns `false`
    /// if another callback already resolved this task.
    pub async fn claim_complete(
        pool: &PgPool,
        provider_task_id: &str,
        video_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE video_tasks \
             SET status = $2, video_url = $3, completed_at = NOW() \
             WHERE provider_task_id = $1 AND status = $4",
        )
        .bind(provider_task_id)
        .bind(VideoTaskStatus::Complete)
        .bind(video_url)
        .bind(VideoTaskStatus::Pending)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Claim `pending -> error` with a detail message.
    pub async fn claim_error(
        pool: &PgPool,
        provider_task_id: &str,
        message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE video_tasks \
             SET status = $2, error_message = $3, completed_at = NOW() \
             WHERE provider_task_id = $1 AND status = $4",
        )
        .bind(provider_task_id)
        .bind(VideoTaskStatus::Error)
        .bind(message)
        .bind(VideoTaskStatus::Pending)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
