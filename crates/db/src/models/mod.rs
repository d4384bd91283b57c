//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts where one is needed

pub mod job;
pub mod ledger;
pub mod status;
pub mod user;
pub mod video_task;
