//! Chat-completions dialect (OpenAI and compatible backends).

use super::{
    ModelInfo, ProviderAdapter, ProviderDescriptor, WireRequest, parse_json, reported_error,
    require_credential,
};
use crate::error::{AcquisitionError, AcquisitionErrorKind};
use crate::prompt::ChessPrompt;
use crate::seat::PlayerSeatConfig;
use serde_json::{Value, json};
use tracing::{debug, instrument};

const OPENAI_MODELS: &[ModelInfo] = &[
    ModelInfo::new("gpt-4o-mini", "GPT-4o mini"),
    ModelInfo::new("gpt-4o", "GPT-4o"),
    ModelInfo::new("gpt-4.1", "GPT-4.1"),
    ModelInfo::new("gpt-4.1-mini", "GPT-4.1 mini"),
    ModelInfo::new("o1-mini", "o1 mini"),
    ModelInfo::new("o1-preview", "o1 preview"),
];

const OPENROUTER_MODELS: &[ModelInfo] = &[
    ModelInfo::new("meta-llama/llama-3.3-70b-instruct", "Llama 3.3 70B Instruct"),
    ModelInfo::new("mistralai/mistral-large", "Mistral Large"),
    ModelInfo::new("qwen/qwen-2.5-72b-instruct", "Qwen 2.5 72B Instruct"),
    ModelInfo::new("google/gemma-2-27b-it", "Gemma 2 27B"),
];

const DEEPSEEK_MODELS: &[ModelInfo] = &[
    ModelInfo::new("deepseek-chat", "DeepSeek V3"),
    ModelInfo::new("deepseek-reasoner", "DeepSeek R1"),
];

/// What a particular model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelQuirks {
    /// Accepts a `system` message.
    pub system_role: bool,
    /// Accepts a `temperature` parameter.
    pub temperature: bool,
    /// Accepts `response_format: json_object`.
    pub json_mode: bool,
}

impl ModelQuirks {
    const FULL: Self = Self {
        system_role: true,
        temperature: true,
        json_mode: true,
    };
}

fn openai_quirks(model: &str) -> ModelQuirks {
    if model.starts_with("o1") {
        ModelQuirks {
            system_role: false,
            temperature: false,
            json_mode: false,
        }
    } else {
        ModelQuirks::FULL
    }
}

fn openrouter_quirks(model: &str) -> ModelQuirks {
    ModelQuirks {
        system_role: !model.contains("gemma"),
        temperature: true,
        json_mode: false,
    }
}

fn deepseek_quirks(model: &str) -> ModelQuirks {
    if model == "deepseek-reasoner" {
        ModelQuirks {
            system_role: true,
            temperature: false,
            json_mode: false,
        }
    } else {
        ModelQuirks::FULL
    }
}

/// Bearer-token chat-completions adapter.
#[derive(Debug, Clone)]
pub struct ChatCompletionsAdapter {
    descriptor: ProviderDescriptor,
    endpoint: &'static str,
    quirks: fn(&str) -> ModelQuirks,
    extra_headers: &'static [(&'static str, &'static str)],
}

impl ChatCompletionsAdapter {
    /// OpenAI.
    pub fn openai() -> Self {
        Self {
            descriptor: ProviderDescriptor {
                id: "openai",
                display_name: "OpenAI",
                api_key_env: "OPENAI_API_KEY",
                models: OPENAI_MODELS,
            },
            endpoint: "https://api.openai.com/v1/chat/completions",
            quirks: openai_quirks,
            extra_headers: &[],
        }
    }

    /// OpenRouter.
    pub fn openrouter() -> Self {
        Self {
            descriptor: ProviderDescriptor {
                id: "openrouter",
                display_name: "OpenRouter",
                api_key_env: "OPENROUTER_API_KEY",
                models: OPENROUTER_MODELS,
            },
            endpoint: "https://openrouter.ai/api/v1/chat/completions",
            quirks: openrouter_quirks,
            extra_headers: &[("X-Title", "strictly_chess")],
        }
    }

    /// DeepSeek.
    pub fn deepseek() -> Self {
        Self {
            descriptor: ProviderDescriptor {
                id: "deepseek",
                display_name: "DeepSeek",
                api_key_env: "DEEPSEEK_API_KEY",
                models: DEEPSEEK_MODELS,
            },
            endpoint: "https://api.deepseek.com/chat/completions",
            quirks: deepseek_quirks,
            extra_headers: &[],
        }
    }

    /// Capabilities of `model` on this backend.
    pub fn quirks(&self, model: &str) -> ModelQuirks {
        (self.quirks)(model)
    }
}

impl ProviderAdapter for ChatCompletionsAdapter {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    #[instrument(skip(self, prompt, seat), fields(provider = self.descriptor.id, model = seat.effective_model()))]
    fn build_request(
        &self,
        prompt: &ChessPrompt,
        seat: &PlayerSeatConfig,
    ) -> Result<WireRequest, AcquisitionError> {
        let api_key = require_credential(seat, &self.descriptor)?;
        let model = seat.effective_model();
        let quirks = self.quirks(model);
        debug!(?quirks, "Building chat-completions request");

        let messages = if quirks.system_role {
            json!([
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ])
        } else {
            json!([{ "role": "user", "content": prompt.combined() }])
        };

        let mut body = json!({ "model": model, "messages": messages });
        if quirks.temperature {
            body["temperature"] = json!(seat.temperature());
        }
        if quirks.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let mut request = WireRequest::post(self.endpoint, body)
            .header("authorization", format!("Bearer {api_key}"));
        for (name, value) in self.extra_headers {
            request = request.header(*name, *value);
        }
        Ok(request)
    }

    #[instrument(skip(self, body), fields(provider = self.descriptor.id, length = body.len()))]
    fn parse_response(&self, body: &str) -> Result<String, AcquisitionError> {
        let value = parse_json(body, self.descriptor.display_name)?;
        if let Some(message) = reported_error(&value) {
            return Err(AcquisitionError::new(AcquisitionErrorKind::Provider(message)));
        }

        let message = value.pointer("/choices/0/message");
        let text = ["content", "reasoning_content"]
            .iter()
            .filter_map(|key| message.and_then(|m| m.get(*key)).and_then(Value::as_str))
            .find(|text| !text.trim().is_empty());

        text.map(str::to_string).ok_or_else(|| {
            AcquisitionError::new(AcquisitionErrorKind::EmptyResponse(format!(
                "{} returned no message content",
                self.descriptor.display_name
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> ChessPrompt {
        ChessPrompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        }
    }

    #[test]
    fn test_o1_models_get_combined_prompt() {
        let adapter = ChatCompletionsAdapter::openai();
        let seat = PlayerSeatConfig::ai("openai", "o1-mini").with_api_key("k");
        let request = adapter.build_request(&prompt(), &seat).unwrap();

        let messages = request.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["content"], "sys\n\nusr");
        assert!(request.body.get("temperature").is_none());
        assert!(request.body.get("response_format").is_none());
    }

    #[test]
    fn test_reasoning_content_is_a_fallback() {
        let adapter = ChatCompletionsAdapter::deepseek();
        let body = r#"{"choices":[{"message":{"content":"","reasoning_content":"e2e4"}}]}"#;
        assert_eq!(adapter.parse_response(body).unwrap(), "e2e4");
    }
}
