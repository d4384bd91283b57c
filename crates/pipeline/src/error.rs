use melodia_core::CoreError;
use melodia_suno::SunoApiError;

/// Errors surfaced by the generation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Provider error: {0}")]
    Provider(#[from] SunoApiError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
