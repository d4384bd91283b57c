//! Download charging: full-quality downloads cost one credit, free pool
//! first, refunded if the downstream send fails.

use chrono::Utc;
use sqlx::PgPool;

use melodia_core::policy::{select_pool, CreditPool, FreeTierPolicy, GENERATION_COST};
use melodia_core::types::DbId;
use melodia_core::CoreError;
use melodia_db::models::status::LedgerSource;
use melodia_db::repositories::{LedgerRepo, UserRepo};

use crate::error::PipelineError;

/// Debit one credit for a full-quality download of `job_id`.
///
/// Returns the pool that was charged so a failed send can be refunded to
/// the same place.
pub async fn charge_download(
    pool: &PgPool,
    policy: &FreeTierPolicy,
    user_id: DbId,
    job_id: DbId,
) -> Result<CreditPool, PipelineError> {
    let user = UserRepo::find_by_id(pool, user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "user",
            id: user_id,
        })?;

    let snapshot = user.balance_snapshot();
    let Some(charged_pool) = select_pool(&snapshot, policy, Utc::now()) else {
        return Err(CoreError::InsufficientCredits { user_id }.into());
    };

    let mut conn = pool.acquire().await?;
    let debited = LedgerRepo::debit(
        &mut conn,
        user_id,
        charged_pool,
        GENERATION_COST,
        LedgerSource::DownloadDebit,
        &format!("download job {job_id}"),
    )
    .await?;
    if !debited {
        // Lost a race with a concurrent debit since the snapshot.
        return Err(CoreError::InsufficientCredits { user_id }.into());
    }

    tracing::info!(user_id, job_id, pool = ?charged_pool, "Download charged");
    Ok(charged_pool)
}

/// Return a download charge after a failed send.
pub async fn refund_download(
    pool: &PgPool,
    user_id: DbId,
    charged_pool: CreditPool,
    job_id: DbId,
) -> Result<(), PipelineError> {
    let mut conn = pool.acquire().await?;
    LedgerRepo::credit(
        &mut conn,
        user_id,
        charged_pool,
        GENERATION_COST,
        LedgerSource::Refund,
        &format!("refund download job {job_id}"),
    )
    .await?;
    tracing::info!(user_id, job_id, pool = ?charged_pool, "Download refunded");
    Ok(())
}
