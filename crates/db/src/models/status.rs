//! Lifecycle status enums, stored as lowercase strings.

use serde::{Deserialize, Serialize};

/// Status of a generation job.
///
/// Transitions only move forward: `Created -> Submitted -> {Complete, Error}`.
/// `Complete` and `Error` are terminal; once entered, no further transition
/// is possible and repeated signals are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Submitted,
    Complete,
    Error,
}

impl JobStatus {
    /// Whether this status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Submitted => "submitted",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }
}

/// Status of a secondary video sub-task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VideoTaskStatus {
    Pending,
    Complete,
    Error,
}

/// Origin of a credit ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerSource {
    SignupBonus,
    Referral,
    Purchase,
    GenerationDebit,
    DownloadDebit,
    Refund,
    AdminGrant,
}
