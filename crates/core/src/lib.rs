//! Shared domain types, errors, and credit policy for the melodia backend.

pub mod error;
pub mod policy;
pub mod types;

pub use error::CoreError;
