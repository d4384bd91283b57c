//! The single three-way completion result shared by the polling and webhook
//! channels.
//!
//! Both `SunoClient::poll` and the webhook payload parser produce a
//! [`TaskOutcome`], so the reconciler only ever sees one signal shape no
//! matter which channel fired first (or whether both did).

use serde::{Deserialize, Serialize};

/// Error detail marker for moderation rejections. The reconciler keys the
/// violation counter off this exact value.
pub const CONTENT_POLICY: &str = "content_policy";

/// The provider returns at most two track variants per task.
const MAX_TRACKS: usize = 2;

/// Poll statuses that mean the task finished successfully. `FIRST_SUCCESS`
/// already carries a playable first variant.
const SUCCESS_STATUSES: [&str; 2] = ["SUCCESS", "FIRST_SUCCESS"];

/// Poll statuses that mean the task failed for non-moderation reasons.
const FAILURE_STATUSES: [&str; 3] = [
    "CREATE_TASK_FAILED",
    "GENERATE_AUDIO_FAILED",
    "CALLBACK_EXCEPTION",
];

/// One generated track variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackArtifact {
    /// Provider-side song id, needed for video sub-task submission.
    pub id: String,
    pub audio_url: String,
    pub image_url: Option<String>,
    pub title: String,
}

/// Normalized status of a generation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Still generating — nothing to do.
    Pending,
    /// Finished with playable artifacts (1..=2 variants).
    Complete(Vec<TrackArtifact>),
    /// Finished unsuccessfully. `CONTENT_POLICY` as the detail marks a
    /// moderation rejection.
    Error(String),
}

/// Parse the task data object from `GET /api/v1/generate/record-info`.
///
/// Unknown statuses are treated as still-pending: the poll loop keeps
/// waiting and the watchdog bounds the wait.
pub fn parse_poll_data(data: &serde_json::Value) -> TaskOutcome {
    let status = data["status"].as_str().unwrap_or("");

    if SUCCESS_STATUSES.contains(&status) {
        let tracks = extract_tracks(&data["response"]["sunoData"]);
        return if tracks.is_empty() {
            TaskOutcome::Error("missing_artifacts".to_string())
        } else {
            TaskOutcome::Complete(tracks)
        };
    }

    if status == "SENSITIVE_WORD_ERROR" {
        return TaskOutcome::Error(CONTENT_POLICY.to_string());
    }

    if FAILURE_STATUSES.contains(&status) {
        let detail = data["errorMessage"]
            .as_str()
            .unwrap_or(status)
            .to_string();
        return TaskOutcome::Error(detail);
    }

    if status != "PENDING" && !status.is_empty() {
        tracing::warn!(status, "Unknown provider task status; treating as pending");
    }
    TaskOutcome::Pending
}

/// Parse an inbound webhook body into `(task_id, outcome)`.
///
/// Returns `None` when the payload carries no task id — there is nothing to
/// correlate, so the caller acknowledges and drops it. Intermediate
/// callbacks (`text`, `first`) map to [`TaskOutcome::Pending`]: acknowledged
/// without any job mutation. Safe to call any number of times for the same
/// task.
pub fn parse_webhook(payload: &serde_json::Value) -> Option<(String, TaskOutcome)> {
    let data = &payload["data"];
    let task_id = data["taskId"]
        .as_str()
        .or_else(|| data["task_id"].as_str())?
        .to_string();

    let code = payload["code"].as_i64().unwrap_or(0);
    if code != 200 {
        let msg = payload["msg"].as_str().unwrap_or("Unknown error");
        let detail = if crate::error::is_content_policy_text(msg) {
            CONTENT_POLICY.to_string()
        } else {
            msg.to_string()
        };
        return Some((task_id, TaskOutcome::Error(detail)));
    }

    // Partial notifications: lyrics done ("text") or first track ready
    // ("first"). Only "complete" mutates a job.
    let callback_type = data["callbackType"].as_str().unwrap_or("complete");
    if callback_type != "complete" {
        return Some((task_id, TaskOutcome::Pending));
    }

    // Track list may arrive as data.data or nested as data.response.sunoData.
    let mut tracks = extract_tracks(&data["data"]);
    if tracks.is_empty() {
        tracks = extract_tracks(&data["response"]["sunoData"]);
    }

    let outcome = if tracks.is_empty() {
        TaskOutcome::Error("missing_artifacts".to_string())
    } else {
        TaskOutcome::Complete(tracks)
    };
    Some((task_id, outcome))
}

/// Extract up to [`MAX_TRACKS`] artifacts from a provider track array,
/// tolerating the camelCase/snake_case field drift seen in the wild.
/// Entries without any audio URL are skipped.
fn extract_tracks(value: &serde_json::Value) -> Vec<TrackArtifact> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let audio_url = item["audioUrl"]
                .as_str()
                .or_else(|| item["streamAudioUrl"].as_str())
                .or_else(|| item["audio_url"].as_str())
                .filter(|u| !u.is_empty())?;
            let image_url = item["imageUrl"]
                .as_str()
                .or_else(|| item["image_url"].as_str())
                .filter(|u| !u.is_empty())
                .map(String::from);
            Some(TrackArtifact {
                id: item["id"].as_str().unwrap_or("").to_string(),
                audio_url: audio_url.to_string(),
                image_url,
                title: item["title"].as_str().unwrap_or("Untitled").to_string(),
            })
        })
        .take(MAX_TRACKS)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
