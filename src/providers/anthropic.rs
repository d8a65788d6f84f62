//! Anthropic messages dialect.

use super::{
    ModelInfo, ProviderAdapter, ProviderDescriptor, WireRequest, parse_json, reported_error,
    require_credential,
};
use crate::error::{AcquisitionError, AcquisitionErrorKind};
use crate::prompt::ChessPrompt;
use crate::seat::PlayerSeatConfig;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

const MODELS: &[ModelInfo] = &[
    ModelInfo::new("claude-sonnet-4-20250514", "Claude Sonnet 4"),
    ModelInfo::new("claude-opus-4-20250514", "Claude Opus 4"),
    ModelInfo::new("claude-3-7-sonnet-20250219", "Claude 3.7 Sonnet"),
    ModelInfo::new("claude-3-5-haiku-20241022", "Claude 3.5 Haiku"),
];

#[derive(Deserialize)]
struct CreateMessageResponse {
    #[serde(default)]
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// `x-api-key` adapter with a top-level `system` field.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    descriptor: ProviderDescriptor,
}

impl AnthropicAdapter {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self {
            descriptor: ProviderDescriptor {
                id: "anthropic",
                display_name: "Anthropic",
                api_key_env: "ANTHROPIC_API_KEY",
                models: MODELS,
            },
        }
    }
}

impl Default for AnthropicAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for AnthropicAdapter {
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
        let body = json!({
            "model": seat.effective_model(),
            "max_tokens": MAX_TOKENS,
            "temperature": seat.temperature(),
            "system": prompt.system,
            "messages": [
                { "role": "user", "content": prompt.user }
            ]
        });

        Ok(WireRequest::post(BASE_URL, body)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION))
    }

    #[instrument(skip(self, body), fields(length = body.len()))]
    fn parse_response(&self, body: &str) -> Result<String, AcquisitionError> {
        let value = parse_json(body, "Anthropic")?;
        if let Some(message) = reported_error(&value) {
            return Err(AcquisitionError::new(AcquisitionErrorKind::Provider(message)));
        }

        let parsed: CreateMessageResponse = serde_json::from_value(value).map_err(|e| {
            AcquisitionError::new(AcquisitionErrorKind::Provider(format!(
                "unexpected Anthropic response shape: {e}"
            )))
        })?;

        let text: Vec<String> = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlockResponse::Text { text } => Some(text),
                ContentBlockResponse::Other => None,
            })
            .collect();

        let text = text.join("\n");
        if text.trim().is_empty() {
            return Err(AcquisitionError::new(AcquisitionErrorKind::EmptyResponse(
                "Anthropic returned no text in the response content".to_string(),
            )));
        }
        Ok(text)
    }
}
