//! Append-only credit ledger entry.

use melodia_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::LedgerSource;

/// A row from the `credit_ledger` table.
///
/// Entries are never updated or deleted; the sum of a user's deltas per
/// pool must reconcile with the cached balance on `users`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditLedgerEntry {
    pub id: DbId,
    pub user_id: DbId,
    /// Signed credit delta: negative for debits, positive for grants.
    pub delta: i32,
    /// Which pool the delta applied to: `"free"` or `"paid"`.
    pub pool: String,
    pub source: LedgerSource,
    pub description: String,
    pub created_at: Timestamp,
}
