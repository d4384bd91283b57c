//! Provider error taxonomy.

/// Errors from the Suno API layer.
#[derive(Debug, thiserror::Error)]
pub enum SunoApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    /// Retryable at the caller's discretion.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The prompt was rejected by the provider's content moderation.
    /// Terminal — never retried, never charged.
    #[error("Content policy violation: {0}")]
    ContentPolicy(String),

    /// The provider asked us to slow down. Advisory.
    #[error("Provider rate limit: {0}")]
    RateLimit(String),

    /// The provider returned a non-success status or error code.
    #[error("Suno API error ({status}): {body}")]
    Api {
        /// HTTP status code (or API-level `code` field).
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response was 2xx but structurally unusable.
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// Whether an error body reads as a content-moderation rejection.
///
/// The provider does not use a dedicated status code for moderation; these
/// substrings are the markers observed in practice.
pub fn is_content_policy_text(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("content policy") || lower.contains("moderation") || lower.contains("sensitive")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_content_policy_markers() {
        assert!(is_content_policy_text("Rejected: Content Policy violation"));
        assert!(is_content_policy_text("flagged by moderation"));
        assert!(is_content_policy_text("Contains SENSITIVE words"));
        assert!(!is_content_policy_text("internal server error"));
    }
}
