//! Integration tests for download charging and ledger reconciliation.

use sqlx::PgPool;

use melodia_core::policy::{CreditPool, FreeTierPolicy};
use melodia_core::CoreError;
use melodia_db::models::status::LedgerSource;
use melodia_db::repositories::{LedgerRepo, UserRepo};
use melodia_pipeline::download::{charge_download, refund_download};
use melodia_pipeline::PipelineError;

#[sqlx::test(migrations = "../db/migrations")]
async fn download_draws_free_pool_first(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("dl"), 1, None)
        .await
        .expect("create user");
    {
        let mut conn = pool.acquire().await.expect("acquire");
        LedgerRepo::credit(
            &mut conn,
            user.id,
            CreditPool::Paid,
            2,
            LedgerSource::Purchase,
            "purchase",
        )
        .await
        .expect("grant");
    }

    let charged = charge_download(&pool, &FreeTierPolicy::permissive(), user.id, 1)
        .await
        .expect("charge");
    assert_eq!(charged, CreditPool::Free);

    // Free pool is spent, the next download moves to paid.
    let charged = charge_download(&pool, &FreeTierPolicy::permissive(), user.id, 2)
        .await
        .expect("charge");
    assert_eq!(charged, CreditPool::Paid);

    let user = UserRepo::find_by_id(&pool, user.id)
        .await
        .expect("reload")
        .expect("exists");
    assert_eq!(user.free_credits, 0);
    assert_eq!(user.paid_credits, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn download_refund_restores_the_charged_pool(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("dl"), 1, None)
        .await
        .expect("create user");

    let charged = charge_download(&pool, &FreeTierPolicy::permissive(), user.id, 7)
        .await
        .expect("charge");
    refund_download(&pool, user.id, charged, 7)
        .await
        .expect("refund");

    let user = UserRepo::find_by_id(&pool, user.id)
        .await
        .expect("reload")
        .expect("exists");
    assert_eq!(user.free_credits, 1);

    let entries = LedgerRepo::entries(&pool, user.id).await.expect("entries");
    let sources: Vec<LedgerSource> = entries.iter().map(|e| e.source).collect();
    assert!(sources.contains(&LedgerSource::DownloadDebit));
    assert!(sources.contains(&LedgerSource::Refund));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn broke_user_cannot_download(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("broke"), 0, None)
        .await
        .expect("create user");

    let err = charge_download(&pool, &FreeTierPolicy::permissive(), user.id, 1)
        .await
        .expect_err("must fail");
    assert!(matches!(
        err,
        PipelineError::Core(CoreError::InsufficientCredits { .. })
    ));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn ledger_sums_reconcile_with_balances(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("audit"), 0, None)
        .await
        .expect("create user");
    {
        let mut conn = pool.acquire().await.expect("acquire");
        LedgerRepo::credit(
            &mut conn,
            user.id,
            CreditPool::Free,
            3,
            LedgerSource::SignupBonus,
            "signup",
        )
        .await
        .expect("grant");
        LedgerRepo::credit(
            &mut conn,
            user.id,
            CreditPool::Paid,
            5,
            LedgerSource::Purchase,
            "purchase",
        )
        .await
        .expect("grant");
        LedgerRepo::debit(
            &mut conn,
            user.id,
            CreditPool::Paid,
            2,
            LedgerSource::GenerationDebit,
            "job 1",
        )
        .await
        .expect("debit");
    }

    let (free_sum, paid_sum) = LedgerRepo::pool_sums(&pool, user.id).await.expect("sums");
    assert_eq!(free_sum, 3);
    assert_eq!(paid_sum, 3);
}
