//! HTTP client for the KIE.ai v1 Suno endpoints.

use std::time::Duration;

use crate::error::{is_content_policy_text, SunoApiError};
use crate::outcome::{parse_poll_data, TaskOutcome};
use crate::params::GenerationParams;

/// Provider endpoint configuration.
#[derive(Debug, Clone)]
pub struct SunoConfig {
    /// Base HTTP URL, e.g. `https://api.kie.ai`.
    pub api_url: String,
    /// Bearer token for the KIE.ai account.
    pub api_key: String,
    /// Suno model tag, e.g. `V5`.
    pub model: String,
    /// Public base URL the provider POSTs completion callbacks to.
    /// `None` means no webhook channel — completion arrives via polling.
    pub callback_base_url: Option<String>,
}

/// Hard cap on any single provider call; generation submissions can be slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the Suno generation API.
pub struct SunoClient {
    client: reqwest::Client,
    config: SunoConfig,
}

impl SunoClient {
    pub fn new(config: SunoConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self { client, config }
    }

    /// The callback URL sent with submissions, if a webhook channel is
    /// configured.
    pub fn callback_url(&self) -> Option<String> {
        self.config
            .callback_base_url
            .as_ref()
            .map(|base| format!("{}/callback/suno", base.trim_end_matches('/')))
    }

    /// Whether completions arrive via webhook (true) or only by polling.
    pub fn has_webhook_channel(&self) -> bool {
        self.config.callback_base_url.is_some()
    }

    /// Submit a generation. Returns the provider task id.
    ///
    /// Invoked exactly once per job; the task id is the correlation key for
    /// every later completion signal.
    pub async fn submit(&self, params: &GenerationParams) -> Result<String, SunoApiError> {
        let callback_url = self.callback_url();
        let payload = params.to_payload(&self.config.model, callback_url.as_deref());

        tracing::info!(mode = params.mode.as_str(), "Submitting generation to provider");

        let response = self
            .client
            .post(format!("{}/api/v1/generate", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let body = Self::classify_response(response).await?;
        if body["code"].as_i64() != Some(200) {
            return Err(Self::api_error(&body));
        }

        body["data"]["taskId"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| SunoApiError::Malformed(format!("no taskId in response: {body}")))
    }

    /// Check task status via the polling endpoint.
    ///
    /// Safe to invoke arbitrarily many times for the same task.
    pub async fn poll(&self, task_id: &str) -> Result<TaskOutcome, SunoApiError> {
        let response = self
            .client
            .get(format!(
                "{}/api/v1/generate/record-info",
                self.config.api_url
            ))
            .query(&[("taskId", task_id)])
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let body = Self::classify_response(response).await?;
        if body["code"].as_i64() != Some(200) {
            return Err(Self::api_error(&body));
        }

        Ok(parse_poll_data(&body["data"]))
    }

    /// Submit a secondary video generation for one track of a finished
    /// task. Returns the video task id.
    pub async fn generate_video(
        &self,
        task_id: &str,
        audio_id: &str,
    ) -> Result<String, SunoApiError> {
        let mut payload = serde_json::json!({
            "taskId": task_id,
            "audioId": audio_id,
        });
        if let Some(base) = &self.config.callback_base_url {
            payload["callBackUrl"] = serde_json::Value::String(format!(
                "{}/callback/video",
                base.trim_end_matches('/')
            ));
        }

        let response = self
            .client
            .post(format!("{}/api/v1/mp4/generate", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let body = Self::classify_response(response).await?;
        if body["code"].as_i64() != Some(200) {
            return Err(Self::api_error(&body));
        }

        body["data"]["taskId"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| SunoApiError::Malformed(format!("no video taskId in response: {body}")))
    }

    /// Download one audio (or video) artifact for delivery.
    pub async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>, SunoApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SunoApiError::Api {
                status: status.as_u16(),
                body: format!("artifact fetch failed for {url}"),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    /// Turn a non-2xx response into the error taxonomy; parse a 2xx body as
    /// JSON.
    async fn classify_response(
        response: reqwest::Response,
    ) -> Result<serde_json::Value, SunoApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            if is_content_policy_text(&body) {
                return Err(SunoApiError::ContentPolicy(body));
            }
            if status.as_u16() == 429 {
                return Err(SunoApiError::RateLimit(body));
            }
            return Err(SunoApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<serde_json::Value>().await?)
    }

    /// Map an API-level error envelope (`code != 200` in a 2xx response).
    fn api_error(body: &serde_json::Value) -> SunoApiError {
        let msg = body["msg"].as_str().unwrap_or("Unknown error");
        if is_content_policy_text(msg) {
            SunoApiError::ContentPolicy(msg.to_string())
        } else {
            SunoApiError::Api {
                status: body["code"].as_u64().unwrap_or(0) as u16,
                body: msg.to_string(),
            }
        }
    }
}
