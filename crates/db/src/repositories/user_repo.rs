//! Repository for the `users` table.

use sqlx::PgPool;

use melodia_core::policy::VIOLATION_BLOCK_THRESHOLD;
use melodia_core::types::DbId;

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "\
    id, display_name, paid_credits, free_credits, content_violations, \
    is_blocked, referred_by, created_at, last_generation_at";

/// Provides query and mutation operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Create a user, optionally with a signup free-credit grant and a
    /// referrer.
    pub async fn create(
        pool: &PgPool,
        display_name: Option<&str>,
        free_credits: i32,
        referred_by: Option<DbId>,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (display_name, free_credits, referred_by) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(display_name)
            .bind(free_credits)
            .bind(referred_by)
            .fetch_one(pool)
            .await
    }

    /// Find a user by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Increment the content-violation counter, auto-blocking the user once
    /// the threshold is reached. Returns `(violations, is_blocked)`.
    ///
    /// One statement so two concurrent violations cannot lose an increment.
    pub async fn increment_violations(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<(i32, bool), sqlx::Error> {
        let row: (i32, bool) = sqlx::query_as(
            "UPDATE users \
             SET content_violations = content_violations + 1, \
                 is_blocked = CASE \
                     WHEN content_violations + 1 >= $2 THEN TRUE \
                     ELSE is_blocked \
                 END \
             WHERE id = $1 \
             RETURNING content_violations, is_blocked",
        )
        .bind(user_id)
        .bind(VIOLATION_BLOCK_THRESHOLD)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// Stamp the user's last successful generation time.
    pub async fn touch_last_generation(pool: &PgPool, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_generation_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
