//! Provider gateway for the Suno music-generation API (KIE.ai v1).
//!
//! Wraps submission, polling, artifact fetching, and video sub-task
//! submission behind [`SunoClient`], and normalizes both the polling
//! response and the inbound webhook payload into one [`TaskOutcome`] so the
//! two completion channels converge on a single result type.

pub mod client;
pub mod error;
pub mod outcome;
pub mod params;

pub use client::{SunoClient, SunoConfig};
pub use error::SunoApiError;
pub use outcome::{TaskOutcome, TrackArtifact, CONTENT_POLICY};
pub use params::{GenerationMode, GenerationParams};
