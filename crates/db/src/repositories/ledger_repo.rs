//! Repository for the `credit_ledger` table and the cached pool balances
//! on `users`.
//!
//! Debits and credits are single conditional UPDATEs plus an appended
//! ledger row — never read-modify-write — so concurrent completions, admin
//! grants, and referral bonuses for the same user stay consistent. Both
//! take `&mut PgConnection` so the reconciler can bundle the debit with its
//! status claim in one transaction.

use sqlx::PgConnection;

use melodia_core::policy::CreditPool;
use melodia_core::types::DbId;

use crate::models::ledger::CreditLedgerEntry;
use crate::models::status::LedgerSource;

/// Column list for `credit_ledger` queries.
const COLUMNS: &str = "id, user_id, delta, pool, source, description, created_at";

fn pool_column(pool: CreditPool) -> &'static str {
    match pool {
        CreditPool::Free => "free_credits",
        CreditPool::Paid => "paid_credits",
    }
}

fn pool_tag(pool: CreditPool) -> &'static str {
    match pool {
        CreditPool::Free => "free",
        CreditPool::Paid => "paid",
    }
}

/// Atomic balance mutations with an append-only audit trail.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Debit one unit from the given pool and append a ledger entry.
    ///
    /// Returns `false` (and writes nothing) if the pool is already empty —
    /// the conditional UPDATE is the only balance check, so two racing
    /// debits can never drive a pool negative.
    pub async fn debit(
        conn: &mut PgConnection,
        user_id: DbId,
        pool: CreditPool,
        amount: i32,
        source: LedgerSource,
        description: &str,
    ) -> Result<bool, sqlx::Error> {
        let column = pool_column(pool);
        let query = format!(
            "UPDATE users SET {column} = {column} - $2 \
             WHERE id = $1 AND {column} >= $2"
        );
        let result = sqlx::query(&query)
            .bind(user_id)
            .bind(amount)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        Self::append(conn, user_id, -amount, pool, source, description).await?;
        Ok(true)
    }

    /// Credit `amount` units to the given pool and append a ledger entry.
    pub async fn credit(
        conn: &mut PgConnection,
        user_id: DbId,
        pool: CreditPool,
        amount: i32,
        source: LedgerSource,
        description: &str,
    ) -> Result<(), sqlx::Error> {
        let column = pool_column(pool);
        let query = format!("UPDATE users SET {column} = {column} + $2 WHERE id = $1");
        sqlx::query(&query)
            .bind(user_id)
            .bind(amount)
            .execute(&mut *conn)
            .await?;

        Self::append(conn, user_id, amount, pool, source, description).await
    }

    /// Append one ledger row. Internal — balances are only ever moved
    /// through [`debit`](Self::debit) / [`credit`](Self::credit).
    async fn append(
        conn: &mut PgConnection,
        user_id: DbId,
        delta: i32,
        pool: CreditPool,
        source: LedgerSource,
        description: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO credit_ledger (user_id, delta, pool, source, description) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id)
        .bind(delta)
        .bind(pool_tag(pool))
        .bind(source)
        .bind(description)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// All ledger entries for a user, newest first.
    pub async fn entries(
        pool: &sqlx::PgPool,
        user_id: DbId,
    ) -> Result<Vec<CreditLedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM credit_ledger \
             WHERE user_id = $1 ORDER BY id DESC"
        );
        sqlx::query_as::<_, CreditLedgerEntry>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Sum of a user's deltas per pool: `(free_sum, paid_sum)`.
    ///
    /// Used to reconcile the append-only log against the cached balance.
    pub async fn pool_sums(
        pool: &sqlx::PgPool,
        user_id: DbId,
    ) -> Result<(i64, i64), sqlx::Error> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT \
                 COALESCE(SUM(delta) FILTER (WHERE pool = 'free'), 0), \
                 COALESCE(SUM(delta) FILTER (WHERE pool = 'paid'), 0) \
             FROM credit_ledger WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }
}
