use std::time::Duration;

use melodia_core::policy::FreeTierPolicy;
use melodia_pipeline::PipelineSettings;
use melodia_suno::SunoConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the
/// provider API key. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Provider endpoint settings.
    pub suno: SunoSettings,
    /// Pipeline tunables.
    pub pipeline: PipelineConfig,
}

/// Generation provider settings.
#[derive(Debug, Clone)]
pub struct SunoSettings {
    /// Provider base URL (default: `https://api.kie.ai`).
    pub api_url: String,
    /// Bearer token. Empty in tests; required in production.
    pub api_key: String,
    /// Model tag (default: `V5`).
    pub model: String,
    /// Public base URL for provider callbacks. Unset means completions are
    /// polled instead.
    pub callback_base_url: Option<String>,
}

impl SunoSettings {
    pub fn to_client_config(&self) -> SunoConfig {
        SunoConfig {
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            callback_base_url: self.callback_base_url.clone(),
        }
    }
}

/// Pipeline tunables loaded from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub poll_interval_secs: u64,
    pub poll_initial_delay_secs: u64,
    pub generation_timeout_secs: u64,
    pub watchdog_interval_secs: u64,
    pub watchdog_timeout_minutes: i64,
    pub free_credits_on_signup: i32,
    pub min_account_age_hours: i64,
    pub max_account_id: i64,
    pub max_generations_per_user_per_day: i64,
    pub max_generations_per_hour: i64,
    pub video_generation_enabled: bool,
}

impl PipelineConfig {
    pub fn to_settings(&self) -> PipelineSettings {
        PipelineSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            poll_initial_delay: Duration::from_secs(self.poll_initial_delay_secs),
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
            watchdog_interval: Duration::from_secs(self.watchdog_interval_secs),
            watchdog_timeout: chrono::Duration::minutes(self.watchdog_timeout_minutes),
            free_tier: FreeTierPolicy {
                min_account_age_hours: self.min_account_age_hours,
                max_account_id: self.max_account_id,
            },
            max_jobs_per_user_per_day: self.max_generations_per_user_per_day,
            max_jobs_per_hour: self.max_generations_per_hour,
            video_generation_enabled: self.video_generation_enabled,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                            | Default                 |
    /// |------------------------------------|-------------------------|
    /// | `HOST`                             | `0.0.0.0`               |
    /// | `PORT`                             | `3000`                  |
    /// | `CORS_ORIGINS`                     | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`             | `30`                    |
    /// | `SUNO_API_URL`                     | `https://api.kie.ai`    |
    /// | `SUNO_API_KEY`                     | (empty)                 |
    /// | `SUNO_MODEL`                       | `V5`                    |
    /// | `CALLBACK_BASE_URL`                | (unset: polling mode)   |
    /// | `POLL_INTERVAL_SECS`               | `10`                    |
    /// | `POLL_INITIAL_DELAY_SECS`          | `5`                     |
    /// | `GENERATION_TIMEOUT_SECS`          | `300`                   |
    /// | `WATCHDOG_INTERVAL_SECS`           | `60`                    |
    /// | `WATCHDOG_TIMEOUT_MINUTES`         | `10`                    |
    /// | `FREE_CREDITS_ON_SIGNUP`           | `2`                     |
    /// | `MIN_ACCOUNT_AGE_HOURS`            | `0` (gate disabled)     |
    /// | `MAX_ACCOUNT_ID`                   | `0` (gate disabled)     |
    /// | `MAX_GENERATIONS_PER_USER_PER_DAY` | `10`                    |
    /// | `MAX_GENERATIONS_PER_HOUR`         | `30`                    |
    /// | `VIDEO_GENERATION_ENABLED`         | `false`                 |
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            suno: SunoSettings {
                api_url: std::env::var("SUNO_API_URL")
                    .unwrap_or_else(|_| "https://api.kie.ai".into()),
                api_key: std::env::var("SUNO_API_KEY").unwrap_or_default(),
                model: std::env::var("SUNO_MODEL").unwrap_or_else(|_| "V5".into()),
                callback_base_url: std::env::var("CALLBACK_BASE_URL")
                    .ok()
                    .filter(|v| !v.trim().is_empty()),
            },
            pipeline: PipelineConfig {
                poll_interval_secs: env_or("POLL_INTERVAL_SECS", 10),
                poll_initial_delay_secs: env_or("POLL_INITIAL_DELAY_SECS", 5),
                generation_timeout_secs: env_or("GENERATION_TIMEOUT_SECS", 300),
                watchdog_interval_secs: env_or("WATCHDOG_INTERVAL_SECS", 60),
                watchdog_timeout_minutes: env_or("WATCHDOG_TIMEOUT_MINUTES", 10),
                free_credits_on_signup: env_or("FREE_CREDITS_ON_SIGNUP", 2),
                min_account_age_hours: env_or("MIN_ACCOUNT_AGE_HOURS", 0),
                max_account_id: env_or("MAX_ACCOUNT_ID", 0),
                max_generations_per_user_per_day: env_or("MAX_GENERATIONS_PER_USER_PER_DAY", 10),
                max_generations_per_hour: env_or("MAX_GENERATIONS_PER_HOUR", 30),
                video_generation_enabled: env_or("VIDEO_GENERATION_ENABLED", false),
            },
        }
    }
}
