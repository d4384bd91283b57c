use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use melodia_api::config::{PipelineConfig, ServerConfig, SunoSettings};
use melodia_api::router::build_app_router;
use melodia_api::state::AppState;
use melodia_suno::SunoClient;

/// Build a test `ServerConfig` with safe defaults.
///
/// The provider URL points at an unroutable local port so any test that
/// accidentally reaches the network fails fast instead of calling out.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        suno: SunoSettings {
            api_url: "http://127.0.0.1:9".to_string(),
            api_key: "test-key".to_string(),
            model: "V5".to_string(),
            callback_base_url: Some("http://127.0.0.1:9".to_string()),
        },
        pipeline: PipelineConfig {
            poll_interval_secs: 10,
            poll_initial_delay_secs: 5,
            generation_timeout_secs: 300,
            watchdog_interval_secs: 60,
            watchdog_timeout_minutes: 10,
            free_credits_on_signup: 2,
            min_account_age_hours: 0,
            max_account_id: 0,
            max_generations_per_user_per_day: 10,
            max_generations_per_hour: 30,
            video_generation_enabled: false,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// Mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let suno = Arc::new(SunoClient::new(config.suno.to_client_config()));
    let settings = config.pipeline.to_settings();

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::new(melodia_events::EventBus::default()),
        suno,
        settings,
    };

    build_app_router(state, &config)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Issue a POST request with a JSON body against the app.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the response status and return the parsed JSON body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
