use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

pub const TEMPERATURE_MIN: f32 = 0.0;
pub const TEMPERATURE_MAX: f32 = 2.0;
pub const TOP_P_MIN: f32 = 0.0;
pub const TOP_P_MAX: f32 = 1.0;
pub const MAX_TOKENS_MIN: u32 = 100;
pub const MAX_TOKENS_MAX: u32 = 2000;

/// Base instruction prepended to every upstream call; the selected tone
/// appends one clause to it.
pub const SYSTEM_INSTRUCTION: &str =
    "Convert robotic or technical text into natural, human-like language.";

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("input text must not be empty")]
    EmptyText,
    #[error("request body carries neither `text` nor `prompt`")]
    MissingText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    #[default]
    Friendly,
    Conversational,
    Poetic,
    Simplified,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Professional,
        Tone::Friendly,
        Tone::Conversational,
        Tone::Poetic,
        Tone::Simplified,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tone::Professional => "Professional",
            Tone::Friendly => "Friendly",
            Tone::Conversational => "Conversational",
            Tone::Poetic => "Poetic",
            Tone::Simplified => "Simplified",
        }
    }

    fn instruction_clause(self) -> &'static str {
        match self {
            Tone::Professional => "Keep the result polished and professional.",
            Tone::Friendly => "Keep the tone warm and friendly.",
            Tone::Conversational => "Write the way people actually talk to each other.",
            Tone::Poetic => "A lyrical, slightly poetic turn of phrase is welcome.",
            Tone::Simplified => "Prefer short sentences and simple everyday words.",
        }
    }
}

/// Full instruction sent as the upstream system message.
pub fn build_system_instruction(tone: Tone) -> String {
    format!("{SYSTEM_INSTRUCTION} {}", tone.instruction_clause())
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f32 {
    DEFAULT_TOP_P
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl SamplingParams {
    /// Force every field into its documented range.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            temperature: self.temperature.clamp(TEMPERATURE_MIN, TEMPERATURE_MAX),
            top_p: self.top_p.clamp(TOP_P_MIN, TOP_P_MAX),
            max_tokens: self.max_tokens.clamp(MAX_TOKENS_MIN, MAX_TOKENS_MAX),
        }
    }
}

/// One validated submission. Constructed fresh per user action; the stored
/// text is already trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct HumanizeRequest {
    pub text: String,
    pub tone: Tone,
    pub params: SamplingParams,
}

impl HumanizeRequest {
    pub fn new(
        text: impl Into<String>,
        tone: Tone,
        params: SamplingParams,
    ) -> Result<Self, CoreError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyText);
        }
        Ok(Self {
            text: trimmed.to_owned(),
            tone,
            params: params.clamped(),
        })
    }
}

/// Outcome of one completed submission, success or failure alike. Lives only
/// in client memory until the next submission replaces it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HumanizeResult {
    pub original: String,
    pub humanized: String,
    pub confidence: Option<f32>,
    pub changes: Option<u32>,
}

impl HumanizeResult {
    pub fn success(original: String, humanized: String) -> Self {
        Self {
            original,
            humanized,
            confidence: None,
            changes: None,
        }
    }

    /// Failure outcome: `humanized` carries the message shown to the user.
    pub fn failure(original: String, message: String) -> Self {
        Self {
            original,
            humanized: message,
            confidence: None,
            changes: None,
        }
    }
}

/// Body of `POST /api/humanize`.
///
/// `prompt` is a tolerated legacy alias for `text`; when both are present
/// `text` wins. Tone and settings are optional and default server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HumanizeRequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SamplingParams>,
}

impl HumanizeRequestBody {
    pub fn from_request(request: &HumanizeRequest) -> Self {
        Self {
            text: Some(request.text.clone()),
            prompt: None,
            tone: Some(request.tone),
            settings: Some(request.params),
        }
    }

    pub fn into_request(self) -> Result<HumanizeRequest, CoreError> {
        let text = self.text.or(self.prompt).ok_or(CoreError::MissingText)?;
        let tone = self.tone.unwrap_or_default();
        let params = self.settings.unwrap_or_default();
        HumanizeRequest::new(text, tone, params)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HumanizeResponseBody {
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_serializes_lowercase() {
        let json = serde_json::to_string(&Tone::Conversational).unwrap();
        assert_eq!(json, "\"conversational\"");
        let parsed: Tone = serde_json::from_str("\"poetic\"").unwrap();
        assert_eq!(parsed, Tone::Poetic);
    }

    #[test]
    fn sampling_params_are_clamped_into_range() {
        let params = SamplingParams {
            temperature: 5.0,
            top_p: -0.3,
            max_tokens: 50,
        }
        .clamped();
        assert_eq!(params.temperature, TEMPERATURE_MAX);
        assert_eq!(params.top_p, TOP_P_MIN);
        assert_eq!(params.max_tokens, MAX_TOKENS_MIN);
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        let err = HumanizeRequest::new("  \n\t ", Tone::Friendly, SamplingParams::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyText));
    }

    #[test]
    fn request_text_is_stored_trimmed() {
        let request =
            HumanizeRequest::new("  hello  ", Tone::Friendly, SamplingParams::default()).unwrap();
        assert_eq!(request.text, "hello");
    }

    #[test]
    fn prompt_alias_resolves_to_text() {
        let body = HumanizeRequestBody {
            prompt: Some("legacy field".to_owned()),
            ..Default::default()
        };
        let request = body.into_request().unwrap();
        assert_eq!(request.text, "legacy field");
        assert_eq!(request.tone, Tone::Friendly);
        assert_eq!(request.params, SamplingParams::default());
    }

    #[test]
    fn text_wins_over_prompt_when_both_present() {
        let body = HumanizeRequestBody {
            text: Some("canonical".to_owned()),
            prompt: Some("legacy".to_owned()),
            ..Default::default()
        };
        assert_eq!(body.into_request().unwrap().text, "canonical");
    }

    #[test]
    fn body_without_any_text_field_errors() {
        let body = HumanizeRequestBody {
            tone: Some(Tone::Poetic),
            ..Default::default()
        };
        assert!(matches!(
            body.into_request().unwrap_err(),
            CoreError::MissingText
        ));
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let body: HumanizeRequestBody =
            serde_json::from_str(r#"{"text":"hi","settings":{"temperature":1.5}}"#).unwrap();
        let request = body.into_request().unwrap();
        assert_eq!(request.params.temperature, 1.5);
        assert_eq!(request.params.top_p, DEFAULT_TOP_P);
        assert_eq!(request.params.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn request_body_round_trips() {
        let request = HumanizeRequest::new(
            "some stiff text",
            Tone::Simplified,
            SamplingParams {
                temperature: 1.2,
                top_p: 0.5,
                max_tokens: 400,
            },
        )
        .unwrap();
        let body = HumanizeRequestBody::from_request(&request);
        assert_eq!(body.into_request().unwrap(), request);
    }

    #[test]
    fn system_instruction_carries_tone_clause() {
        for tone in Tone::ALL {
            let instruction = build_system_instruction(tone);
            assert!(instruction.starts_with(SYSTEM_INSTRUCTION));
            assert!(instruction.len() > SYSTEM_INSTRUCTION.len());
        }
    }
}
