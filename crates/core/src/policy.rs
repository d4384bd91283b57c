//! Credit pool selection, free-tier eligibility gates, and violation policy.
//!
//! Pure logic only — the atomic balance updates themselves live in
//! `melodia-db`. Everything here is decided from a snapshot and a clock so
//! it can be unit-tested without a database.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Content-policy violations at which a user is automatically blocked.
pub const VIOLATION_BLOCK_THRESHOLD: i32 = 3;

/// The provider returns at most two track variants per generation; anything
/// past this index is never fetched or delivered.
pub const MAX_TRACK_VARIANTS: usize = 2;

/// Every generation consumes exactly one unit from one pool.
pub const GENERATION_COST: i32 = 1;

// ---------------------------------------------------------------------------
// Credit pools
// ---------------------------------------------------------------------------

/// Which balance pool a debit or credit applies to.
///
/// The two pools are tracked independently: free credits are granted
/// (signup, referral) and drawn first; paid credits come from purchases and
/// are always usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditPool {
    Free,
    Paid,
}

/// A point-in-time view of a user's balance and free-tier standing.
#[derive(Debug, Clone, Copy)]
pub struct BalanceSnapshot {
    pub user_id: DbId,
    pub paid_credits: i32,
    pub free_credits: i32,
    pub account_created_at: Timestamp,
}

/// Anti-abuse gates for the free pool, loaded from configuration.
#[derive(Debug, Clone, Copy)]
pub struct FreeTierPolicy {
    /// Minimum account age before free credits unlock. Zero disables the gate.
    pub min_account_age_hours: i64,
    /// Accounts with an id above this ceiling never qualify for free credits
    /// (freshly farmed accounts have high ids). Zero disables the gate.
    pub max_account_id: DbId,
}

impl FreeTierPolicy {
    /// A policy with both gates disabled.
    pub fn permissive() -> Self {
        Self {
            min_account_age_hours: 0,
            max_account_id: 0,
        }
    }
}

/// Whether the user's free pool is currently usable.
///
/// The free pool requires a positive balance *and* passing both anti-abuse
/// gates. Paid credits are never gated.
pub fn free_pool_usable(snapshot: &BalanceSnapshot, policy: &FreeTierPolicy, now: Timestamp) -> bool {
    if snapshot.free_credits <= 0 {
        return false;
    }
    if policy.min_account_age_hours > 0 {
        let min_age = Duration::hours(policy.min_account_age_hours);
        if now - snapshot.account_created_at < min_age {
            return false;
        }
    }
    if policy.max_account_id > 0 && snapshot.user_id > policy.max_account_id {
        return false;
    }
    true
}

/// Pick the pool a new job will charge, or `None` if the user cannot afford
/// a generation at all.
///
/// This decision is made once, at job creation, and recorded on the job as
/// `is_free_tier`. The completion path charges whatever pool was fixed here
/// regardless of how the live balance has moved since.
pub fn select_pool(
    snapshot: &BalanceSnapshot,
    policy: &FreeTierPolicy,
    now: Timestamp,
) -> Option<CreditPool> {
    if free_pool_usable(snapshot, policy, now) {
        Some(CreditPool::Free)
    } else if snapshot.paid_credits > 0 {
        Some(CreditPool::Paid)
    } else {
        None
    }
}

/// Credit cost recorded on the job row at completion.
///
/// Free-tier completions record 0 even though a free unit is consumed; only
/// paid completions show up as spent credits in the job history.
pub fn credits_spent_for_tier(is_free_tier: bool) -> i32 {
    if is_free_tier {
        0
    } else {
        GENERATION_COST
    }
}

/// Whether a violation count has crossed the auto-block threshold.
pub fn should_block(violations: i32) -> bool {
    violations >= VIOLATION_BLOCK_THRESHOLD
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
