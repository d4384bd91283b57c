//! Generation endpoints for the presentation layer (bot frontend).

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use melodia_core::policy::CreditPool;
use melodia_core::types::DbId;
use melodia_core::CoreError;
use melodia_db::models::job::Job;
use melodia_db::repositories::JobRepo;
use melodia_pipeline::download::{charge_download, refund_download};
use melodia_suno::{GenerationMode, GenerationParams};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for POST /generations.
#[derive(Debug, Deserialize)]
pub struct CreateGenerationRequest {
    pub user_id: DbId,
    pub prompt: String,
    #[serde(default)]
    pub style: String,
    pub voice_gender: Option<String>,
    pub mode: GenerationMode,
}

/// POST /generations -- submit a generation job.
///
/// Returns the job in `submitted` status; completion is reported later on
/// the event bus.
async fn create_generation(
    State(state): State<AppState>,
    Json(body): Json<CreateGenerationRequest>,
) -> AppResult<Json<DataResponse<Job>>> {
    let params = GenerationParams {
        prompt: body.prompt,
        style: body.style,
        voice_gender: body.voice_gender,
        mode: body.mode,
    };
    let job = state.submitter().submit(body.user_id, params).await?;
    Ok(Json(DataResponse { data: job }))
}

/// GET /generations/{id} -- fetch one job.
async fn get_generation(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "job", id })?;
    Ok(Json(DataResponse { data: job }))
}

/// Response for a charged download.
#[derive(Debug, Serialize)]
pub struct DownloadCharge {
    pub job_id: DbId,
    pub charged_pool: CreditPool,
    pub audio_urls: Vec<String>,
}

/// Request body for POST /generations/{id}/download.
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub user_id: DbId,
}

/// POST /generations/{id}/download -- charge one credit for a full-quality
/// download and return the artifact URLs.
///
/// The charge is refunded if the artifacts turn out to be missing, so a
/// broken job never costs anything.
async fn charge_generation_download(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<DownloadRequest>,
) -> AppResult<Json<DataResponse<DownloadCharge>>> {
    let job = JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "job", id })?;
    if job.user_id != body.user_id {
        return Err(AppError::Core(CoreError::NotFound { entity: "job", id }));
    }
    if !job.status.is_terminal() {
        return Err(AppError::Core(CoreError::Conflict(
            "job is still in flight".into(),
        )));
    }

    let charged_pool =
        charge_download(&state.pool, &state.settings.free_tier, body.user_id, id).await?;

    if job.audio_urls.is_empty() {
        refund_download(&state.pool, body.user_id, charged_pool, id).await?;
        return Err(AppError::Core(CoreError::Conflict(
            "job has no downloadable artifacts".into(),
        )));
    }

    Ok(Json(DataResponse {
        data: DownloadCharge {
            job_id: id,
            charged_pool,
            audio_urls: job.audio_urls,
        },
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generations", post(create_generation))
        .route("/generations/{id}", get(get_generation))
        .route(
            "/generations/{id}/download",
            post(charge_generation_download),
        )
}
