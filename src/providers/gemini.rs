//! Gemini generateContent dialect.

use super::{
    ModelInfo, ProviderAdapter, ProviderDescriptor, WireRequest, parse_json, reported_error,
    require_credential,
};
use crate::error::{AcquisitionError, AcquisitionErrorKind};
use crate::prompt::ChessPrompt;
use crate::seat::PlayerSeatConfig;
use serde_json::{Value, json};
use tracing::instrument;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const MODELS: &[ModelInfo] = &[
    ModelInfo::new("gemini-2.0-flash", "Gemini 2.0 Flash"),
    ModelInfo::new("gemini-2.5-flash", "Gemini 2.5 Flash"),
    ModelInfo::new("gemini-2.5-pro", "Gemini 2.5 Pro"),
    ModelInfo::new("gemma-3-27b-it", "Gemma 3 27B"),
];

/// Query-string-key adapter with a `contents`/`parts` envelope.
///
/// Gemma models reject `systemInstruction` and JSON mode, so they receive a
/// single combined user turn.
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    descriptor: ProviderDescriptor,
}

impl GeminiAdapter {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self {
            descriptor: ProviderDescriptor {
                id: "gemini",
                display_name: "Google Gemini",
                api_key_env: "GEMINI_API_KEY",
                models: MODELS,
            },
        }
    }

    fn is_gemma(model: &str) -> bool {
        model.starts_with("gemma")
    }
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    #[instrument(skip(self, prompt, seat), fields(model = seat.effective_model()))]
    fn build_request(
        &self,
        prompt: &ChessPrompt,
        seat: &PlayerSeatConfig,
    ) -> Result<WireRequest, AcquisitionError> {
        let api_key = require_credential(seat, &self.descriptor)?;
        let model = seat.effective_model();
        let url = format!("{BASE_URL}/{model}:generateContent?key={api_key}");

        let body = if Self::is_gemma(model) {
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt.combined() }] }],
                "generationConfig": { "temperature": seat.temperature() }
            })
        } else {
            json!({
                "systemInstruction": { "parts": [{ "text": prompt.system }] },
                "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
                "generationConfig": {
                    "temperature": seat.temperature(),
                    "responseMimeType": "application/json"
                }
            })
        };

        Ok(WireRequest::post(url, body))
    }

    #[instrument(skip(self, body), fields(length = body.len()))]
    fn parse_response(&self, body: &str) -> Result<String, AcquisitionError> {
        let value = parse_json(body, "Gemini")?;
        if let Some(message) = reported_error(&value) {
            return Err(AcquisitionError::new(AcquisitionErrorKind::Provider(message)));
        }

        if let Some(reason) = value
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
        {
            return Err(AcquisitionError::new(AcquisitionErrorKind::Provider(
                format!("prompt blocked: {reason}"),
            )));
        }

        let text: Vec<&str> = value
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        let text = text.join("");
        if text.trim().is_empty() {
            return Err(AcquisitionError::new(AcquisitionErrorKind::EmptyResponse(
                "Gemini returned no text parts".to_string(),
            )));
        }
        Ok(text)
    }
}
