//! Generation request parameters and payload assembly.
//!
//! The v1 API takes three distinct payload shapes depending on mode; the
//! voice gender is folded into the style tag rather than sent as its own
//! field.

use serde::{Deserialize, Serialize};

/// Provider-side prompt length ceiling (V5 models).
const MAX_PROMPT_CHARS: usize = 5000;
/// Provider-side style length ceiling (V5 models).
const MAX_STYLE_CHARS: usize = 1000;
/// Auto-generated title length ceiling.
const MAX_TITLE_CHARS: usize = 100;

/// How the user's input should drive the generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Free-form idea; the provider writes lyrics itself.
    Description,
    /// The prompt is the finished lyrics (provider "custom" mode).
    Lyrics,
    /// No vocals at all.
    Instrumental,
}

impl GenerationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::Description => "description",
            GenerationMode::Lyrics => "lyrics",
            GenerationMode::Instrumental => "instrumental",
        }
    }
}

/// Everything needed to submit one generation to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub style: String,
    pub voice_gender: Option<String>,
    pub mode: GenerationMode,
}

impl GenerationParams {
    /// Style tag with the voice gender folded in, e.g. `"female vocal, pop"`.
    /// Instrumental requests never carry a vocal tag.
    fn full_style(&self) -> String {
        match (&self.voice_gender, self.mode) {
            (Some(gender), GenerationMode::Description | GenerationMode::Lyrics) => {
                if self.style.is_empty() {
                    format!("{gender} vocal")
                } else {
                    format!("{gender} vocal, {}", self.style)
                }
            }
            _ => self.style.clone(),
        }
    }

    /// Build the JSON body for `POST /api/v1/generate`.
    pub fn to_payload(&self, model: &str, callback_url: Option<&str>) -> serde_json::Value {
        let full_style = self.full_style();

        let mut payload = match self.mode {
            GenerationMode::Lyrics => serde_json::json!({
                "prompt": self.prompt,
                "customMode": true,
                "instrumental": false,
                "model": model,
                "style": non_empty_or(&full_style, "Pop"),
                "title": auto_title(&self.prompt),
            }),
            GenerationMode::Instrumental => serde_json::json!({
                "prompt": if self.style.is_empty() {
                    self.prompt.clone()
                } else {
                    format!("{}, {}", self.prompt, self.style)
                },
                "customMode": false,
                "instrumental": true,
                "model": model,
            }),
            GenerationMode::Description => serde_json::json!({
                "customMode": true,
                "instrumental": false,
                "model": model,
                "prompt": truncate_chars(&self.prompt, MAX_PROMPT_CHARS),
                "style": non_empty_or(&truncate_chars(&full_style, MAX_STYLE_CHARS), "Pop"),
                "title": auto_title(&self.prompt),
            }),
        };

        if let Some(url) = callback_url {
            payload["callBackUrl"] = serde_json::Value::String(url.to_string());
        }
        payload
    }
}

/// First [`MAX_TITLE_CHARS`] characters of the prompt, with an ellipsis when
/// truncated. Falls back to `"Untitled"` for an empty prompt.
fn auto_title(prompt: &str) -> String {
    if prompt.is_empty() {
        return "Untitled".to_string();
    }
    if prompt.chars().count() <= MAX_TITLE_CHARS {
        prompt.to_string()
    } else {
        let head: String = prompt.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{head}...")
    }
}

/// Character-safe prefix truncation (the prompt may be non-ASCII).
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn non_empty_or(s: &str, fallback: &str) -> String {
    if s.is_empty() {
        fallback.to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mode: GenerationMode) -> GenerationParams {
        GenerationParams {
            prompt: "a song about rain".to_string(),
            style: "jazz".to_string(),
            voice_gender: Some("female".to_string()),
            mode,
        }
    }

    #[test]
    fn description_payload_is_custom_mode_with_vocal_style() {
        let p = params(GenerationMode::Description).to_payload("V5", None);
        assert_eq!(p["customMode"], true);
        assert_eq!(p["instrumental"], false);
        assert_eq!(p["model"], "V5");
        assert_eq!(p["style"], "female vocal, jazz");
        assert_eq!(p["prompt"], "a song about rain");
        assert_eq!(p["title"], "a song about rain");
        assert!(p.get("callBackUrl").is_none());
    }

    #[test]
    fn lyrics_payload_carries_lyrics_as_prompt() {
        let p = params(GenerationMode::Lyrics).to_payload("V5", None);
        assert_eq!(p["customMode"], true);
        assert_eq!(p["instrumental"], false);
        assert_eq!(p["prompt"], "a song about rain");
        assert_eq!(p["style"], "female vocal, jazz");
    }

    #[test]
    fn instrumental_payload_has_no_vocal_tag() {
        let p = params(GenerationMode::Instrumental).to_payload("V4", None);
        assert_eq!(p["customMode"], false);
        assert_eq!(p["instrumental"], true);
        assert_eq!(p["prompt"], "a song about rain, jazz");
        assert!(p.get("style").is_none());
    }

    #[test]
    fn callback_url_is_attached_when_configured() {
        let p = params(GenerationMode::Description)
            .to_payload("V5", Some("https://bot.example/callback/suno"));
        assert_eq!(p["callBackUrl"], "https://bot.example/callback/suno");
    }

    #[test]
    fn empty_style_falls_back_to_pop() {
        let mut base = params(GenerationMode::Description);
        base.style = String::new();
        base.voice_gender = None;
        let p = base.to_payload("V5", None);
        assert_eq!(p["style"], "Pop");
    }

    #[test]
    fn gender_without_style_becomes_bare_vocal_tag() {
        let mut base = params(GenerationMode::Description);
        base.style = String::new();
        let p = base.to_payload("V5", None);
        assert_eq!(p["style"], "female vocal");
    }

    #[test]
    fn long_prompt_title_is_truncated_with_ellipsis() {
        let mut base = params(GenerationMode::Description);
        base.prompt = "x".repeat(300);
        let p = base.to_payload("V5", None);
        let title = p["title"].as_str().unwrap();
        assert_eq!(title.chars().count(), 100);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Multi-byte characters must not be split.
        let s = "бесконечная песня ".repeat(400);
        let out = truncate_chars(&s, MAX_PROMPT_CHARS);
        assert_eq!(out.chars().count(), MAX_PROMPT_CHARS);
    }

    #[test]
    fn empty_prompt_titles_as_untitled() {
        assert_eq!(auto_title(""), "Untitled");
    }
}
