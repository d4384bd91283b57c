//! Generation pipeline: submission, completion reconciliation, delivery,
//! and the stuck-job watchdog.
//!
//! All completion producers (webhook handler, poll loop, watchdog) route
//! through [`reconciler::Reconciler`], whose conditional-UPDATE claim makes
//! duplicate and racing signals a defined no-op.

pub mod delivery;
pub mod download;
pub mod error;
pub mod poller;
pub mod reconciler;
pub mod settings;
pub mod submit;
pub mod watchdog;

pub use delivery::DeliveryOrchestrator;
pub use error::PipelineError;
pub use reconciler::{Reconciler, Reconciliation};
pub use settings::PipelineSettings;
pub use submit::Submitter;
pub use watchdog::Watchdog;
