//! User entity with the two-pool credit balance.

use melodia_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub display_name: Option<String>,
    /// Purchased credits — always usable.
    pub paid_credits: i32,
    /// Granted credits — drawn first, gated by the free-tier policy.
    pub free_credits: i32,
    pub content_violations: i32,
    pub is_blocked: bool,
    pub referred_by: Option<DbId>,
    pub created_at: Timestamp,
    pub last_generation_at: Option<Timestamp>,
}

impl User {
    /// Point-in-time balance snapshot for policy decisions.
    pub fn balance_snapshot(&self) -> melodia_core::policy::BalanceSnapshot {
        melodia_core::policy::BalanceSnapshot {
            user_id: self.id,
            paid_credits: self.paid_credits,
            free_credits: self.free_credits,
            account_created_at: self.created_at,
        }
    }
}
