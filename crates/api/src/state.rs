use std::sync::Arc;

use melodia_pipeline::{
    DeliveryOrchestrator, PipelineSettings, Reconciler, Submitter,
};
use melodia_suno::SunoClient;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: melodia_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus the presentation layer subscribes to.
    pub event_bus: Arc<melodia_events::EventBus>,
    /// Generation provider client.
    pub suno: Arc<SunoClient>,
    /// Pipeline tunables derived from the configuration.
    pub settings: PipelineSettings,
}

impl AppState {
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.pool.clone(), self.event_bus.clone())
    }

    pub fn delivery(&self) -> DeliveryOrchestrator {
        DeliveryOrchestrator::new(
            self.pool.clone(),
            self.event_bus.clone(),
            self.suno.clone(),
            self.settings.video_generation_enabled,
        )
    }

    pub fn submitter(&self) -> Submitter {
        Submitter::new(
            self.pool.clone(),
            self.event_bus.clone(),
            self.suno.clone(),
            self.settings,
        )
    }
}
