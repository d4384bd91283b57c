//! Output-channel events for the melodia core.
//!
//! The presentation layer (bot frontend, admin dashboard) subscribes to the
//! [`EventBus`] and renders these events; the core never talks to a user
//! directly.

pub mod bus;

pub use bus::{EventBus, PlatformEvent};

/// A generation completed and its artifacts are ready for delivery.
/// Emitted exactly once per job, by the execution that won the claim.
pub const GENERATION_DELIVERED: &str = "generation.delivered";

/// A generation ended in an error state (provider failure, content policy,
/// or watchdog timeout). Payload carries `error` detail.
pub const GENERATION_FAILED: &str = "generation.failed";

/// One fetched track variant is ready to hand to the presentation layer.
/// Payload carries `variant_index`, `title`, and `fidelity` (full/clipped).
pub const DELIVERY_TRACK: &str = "delivery.track";

/// A secondary video sub-task resolved with a playable URL.
pub const DELIVERY_VIDEO_READY: &str = "delivery.video_ready";
