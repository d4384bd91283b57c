//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Methods that must compose into
//! a caller's transaction (the claim/debit pair) accept `&mut PgConnection`
//! instead.

pub mod job_repo;
pub mod ledger_repo;
pub mod user_repo;
pub mod video_task_repo;

pub use job_repo::JobRepo;
pub use ledger_repo::LedgerRepo;
pub use user_repo::UserRepo;
pub use video_task_repo::VideoTaskRepo;
