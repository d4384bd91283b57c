//! Tunables for the pipeline's background loops and submission gates.

use std::time::Duration;

use melodia_core::policy::FreeTierPolicy;

/// Knobs shared by the submitter, poller, and watchdog.
///
/// Built from the environment by the API crate; defaults match a small
/// single-instance deployment.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// How often the polling fallback checks an in-flight task.
    pub poll_interval: Duration,
    /// Grace period before the first poll; generations never finish faster.
    pub poll_initial_delay: Duration,
    /// How long the poller keeps checking before giving up silently. The
    /// watchdog owns the forced timeout, not the poller.
    pub generation_timeout: Duration,
    /// How often the watchdog sweeps for stuck jobs.
    pub watchdog_interval: Duration,
    /// Age after which a non-terminal job is force-failed.
    pub watchdog_timeout: chrono::Duration,
    /// Anti-abuse gates on the free credit pool.
    pub free_tier: FreeTierPolicy,
    /// Per-user daily submission cap.
    pub max_jobs_per_user_per_day: i64,
    /// Global hourly submission cap.
    pub max_jobs_per_hour: i64,
    /// Whether completed tracks also get a video sub-task.
    pub video_generation_enabled: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            poll_initial_delay: Duration::from_secs(5),
            generation_timeout: Duration::from_secs(300),
            watchdog_interval: Duration::from_secs(60),
            watchdog_timeout: chrono::Duration::minutes(10),
            free_tier: FreeTierPolicy::permissive(),
            max_jobs_per_user_per_day: 10,
            max_jobs_per_hour: 30,
            video_generation_enabled: false,
        }
    }
}
