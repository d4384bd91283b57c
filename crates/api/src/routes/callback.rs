//! Provider-facing callback endpoints.
//!
//! The provider expects a fast 200 and retries otherwise, which is exactly
//! the duplicate-signal scenario the reconciler's claim absorbs. So these
//! handlers acknowledge everything that parses as JSON: partial callbacks,
//! unknown task ids, and duplicates all get `{"status":"ok"}` without
//! mutation. Only an unparseable body is a 400, and that happens in the
//! `Json` extractor before the handler runs.

use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};

use melodia_pipeline::Reconciliation;
use melodia_suno::outcome::parse_webhook;

use crate::error::AppResult;
use crate::state::AppState;

/// POST /callback/suno -- generation completion webhook.
async fn suno_callback(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<Json<Value>> {
    let Some((task_id, outcome)) = parse_webhook(&payload) else {
        tracing::warn!("Provider callback without a task id, acknowledging");
        return Ok(Json(json!({ "status": "ok" })));
    };

    let result = state.reconciler().handle_signal(&task_id, outcome).await?;
    if let Reconciliation::Completed { job, tracks } = result {
        // Deliver in the background so the provider gets its ack now.
        let delivery = state.delivery();
        tokio::spawn(async move {
            delivery.deliver(&job, &tracks).await;
        });
    }

    Ok(Json(json!({ "status": "ok" })))
}

/// POST /callback/video -- video sub-task resolution webhook.
async fn video_callback(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<Json<Value>> {
    let data = &payload["data"];
    let Some(task_id) = data["taskId"]
        .as_str()
        .or_else(|| data["task_id"].as_str())
        .or_else(|| payload["taskId"].as_str())
    else {
        tracing::warn!("Video callback without a task id, acknowledging");
        return Ok(Json(json!({ "status": "ok" })));
    };

    let succeeded = payload["code"].as_i64().unwrap_or(200) == 200;
    let video_url = data["videoUrl"]
        .as_str()
        .or_else(|| data["video_url"].as_str())
        .filter(|_| succeeded);
    let error = if succeeded {
        None
    } else {
        Some(payload["msg"].as_str().unwrap_or("video generation failed"))
    };

    state
        .delivery()
        .resolve_video(task_id, video_url, error)
        .await?;

    Ok(Json(json!({ "status": "ok" })))
}

/// Mount callback routes (root-level; the provider knows nothing of `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/callback/suno", post(suno_callback))
        .route("/callback/video", post(video_callback))
}
