//! Repository for the `jobs` table.
//!
//! The two `claim_*` methods are the single conditional-write primitive the
//! reconciler and the watchdog share: an UPDATE guarded by "status is not
//! yet terminal", with the win/lose outcome reported through
//! `rows_affected`. Everything money-relevant hangs off that primitive.

use sqlx::{PgConnection, PgPool};

use melodia_core::types::{DbId, Timestamp};

use crate::models::job::{Job, JobArtifacts, NewJob};
use crate::models::status::JobStatus;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, user_id, prompt, style, voice_gender, mode, status, \
    provider_task_id, audio_urls, image_urls, titles, \
    credits_spent, is_free_tier, error_message, created_at, completed_at";

/// Provides CRUD and claim operations for generation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create a new job in `created` status.
    ///
    /// `is_free_tier` is fixed here and never re-evaluated afterwards.
    pub async fn create(pool: &PgPool, user_id: DbId, input: &NewJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (user_id, prompt, style, voice_gender, mode, status, is_free_tier) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(user_id)
            .bind(&input.prompt)
            .bind(&input.style)
            .bind(&input.voice_gender)
            .bind(&input.mode)
            .bind(JobStatus::Created)
            .bind(input.is_free_tier)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by its external provider task id.
    pub async fn find_by_task_id(
        pool: &PgPool,
        task_id: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE provider_task_id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    /// Attach the provider task id and move `created -> submitted`.
    ///
    /// Returns `false` if the job was not in `created` status (submit is
    /// invoked exactly once per job; anything else is a caller bug).
    pub async fn mark_submitted(
        pool: &PgPool,
        id: DbId,
        task_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = $2, provider_task_id = $3 \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(JobStatus::Submitted)
        .bind(task_id)
        .bind(JobStatus::Created)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically claim the transition into `complete`, attaching artifacts
    /// and the credit cost.
    ///
    /// Succeeds only if the current status is not already terminal. Returns
    /// `true` when this execution won the claim; `false` means another
    /// producer (webhook, poller, or watchdog) got there first and the
    /// caller must not debit or deliver.
    ///
    /// Takes a connection so the caller can bundle the claim and the ledger
    /// debit into one transaction.
    pub async fn claim_complete(
        conn: &mut PgConnection,
        id: DbId,
        artifacts: &JobArtifacts,
        credits_spent: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status = $2, audio_urls = $3, image_urls = $4, titles = $5, \
                 credits_spent = $6, completed_at = NOW() \
             WHERE id = $1 AND status NOT IN ($7, $8)",
        )
        .bind(id)
        .bind(JobStatus::Complete)
        .bind(&artifacts.audio_urls)
        .bind(&artifacts.image_urls)
        .bind(&artifacts.titles)
        .bind(credits_spent)
        .bind(JobStatus::Complete)
        .bind(JobStatus::Error)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically claim the transition into `error` with a detail message.
    ///
    /// Same guard as [`claim_complete`](Self::claim_complete): exactly one
    /// of the racing producers wins the row, the rest observe `false`.
    pub async fn claim_error(
        conn: &mut PgConnection,
        id: DbId,
        message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1 AND status NOT IN ($4, $5)",
        )
        .bind(id)
        .bind(JobStatus::Error)
        .bind(message)
        .bind(JobStatus::Complete)
        .bind(JobStatus::Error)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Jobs still in a non-terminal state older than `cutoff`, oldest first.
    pub async fn list_stuck(pool: &PgPool, cutoff: Timestamp) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status NOT IN ($1, $2) AND created_at < $3 \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Complete)
            .bind(JobStatus::Error)
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    /// A user's most recent completed jobs (history view).
    pub async fn list_recent_by_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE user_id = $1 AND status = $2 \
             ORDER BY created_at DESC LIMIT $3"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(user_id)
            .bind(JobStatus::Complete)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Number of jobs a user created since local midnight (daily rate cap).
    pub async fn count_user_jobs_today(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE user_id = $1 AND created_at >= CURRENT_DATE",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Number of jobs created across all users in the last hour (global cap).
    pub async fn count_jobs_last_hour(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE created_at >= NOW() - INTERVAL '1 hour'",
        )
        .fetch_one(pool)
        .await
    }
}
