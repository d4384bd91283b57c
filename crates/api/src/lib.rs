//! HTTP surface of the melodia generation service.
//!
//! Hosts the provider callbacks that feed the completion reconciler, the
//! presentation-layer API (submission, history, downloads, grants), and the
//! health endpoint. The watchdog runs as a background task owned by the
//! binary in `main.rs`.

pub mod config;
pub mod error;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;

pub use error::{AppError, AppResult};
