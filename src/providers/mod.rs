//! Provider adapters: translation between [`ChessPrompt`]s and each backend's
//! HTTP/JSON dialect.
//!
//! Adapters are pure. They build a [`WireRequest`] and parse a response body;
//! the [`Transport`] does the I/O. The [`ProviderRegistry`] selects an adapter
//! by its runtime id.

mod anthropic;
mod chat_completions;
mod gemini;
mod registry;
mod transport;

pub use anthropic::AnthropicAdapter;
pub use chat_completions::{ChatCompletionsAdapter, ModelQuirks};
pub use gemini::GeminiAdapter;
pub use registry::ProviderRegistry;
pub use transport::{HttpTransport, Transport, WireResponse};

use crate::error::AcquisitionError;
use crate::prompt::ChessPrompt;
use crate::seat::PlayerSeatConfig;
use serde::Serialize;

/// A model offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Id sent on the wire.
    pub id: &'static str,
    /// Name shown to users.
    pub display_name: &'static str,
}

impl ModelInfo {
    const fn new(id: &'static str, display_name: &'static str) -> Self {
        Self { id, display_name }
    }
}

/// Static description of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    /// Registry id, e.g. `"openai"`.
    pub id: &'static str,
    /// Name shown to users.
    pub display_name: &'static str,
    /// Environment variable consulted when a seat has no credential.
    pub api_key_env: &'static str,
    /// Model catalog, in presentation order.
    pub models: &'static [ModelInfo],
}

impl ProviderDescriptor {
    /// Returns `true` if `model` is in the catalog.
    pub fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m.id == model)
    }
}

/// HTTP method of a [`WireRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    /// POST.
    Post,
}

/// A fully-built provider request.
#[derive(Clone)]
pub struct WireRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Endpoint, including any query-string credential.
    pub url: String,
    /// Headers, including any header credential.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: serde_json::Value,
}

impl WireRequest {
    /// A JSON POST to `url`.
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up a header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// URL with the query string removed, safe to log.
    pub fn redacted_url(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

// Credentials live in headers and the query string; keep them out of logs.
impl std::fmt::Debug for WireRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("WireRequest")
            .field("method", &self.method)
            .field("url", &self.redacted_url())
            .field("headers", &header_names)
            .finish_non_exhaustive()
    }
}

/// Translation between the engine's prompt model and one backend dialect.
pub trait ProviderAdapter: Send + Sync {
    /// Static description and model catalog.
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Builds the wire request for `prompt` with the seat's model, temperature
    /// and credential.
    fn build_request(
        &self,
        prompt: &ChessPrompt,
        seat: &PlayerSeatConfig,
    ) -> Result<WireRequest, AcquisitionError>;

    /// Extracts the reply text from a successful response body.
    ///
    /// A provider-reported error payload is returned as
    /// [`AcquisitionErrorKind::Provider`](crate::AcquisitionErrorKind::Provider);
    /// a body without text is an
    /// [`AcquisitionErrorKind::EmptyResponse`](crate::AcquisitionErrorKind::EmptyResponse).
    fn parse_response(&self, body: &str) -> Result<String, AcquisitionError>;

    /// Pulls a readable message out of a non-2xx body, if it has one.
    fn parse_error(&self, body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .pointer("/error/message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    }
}

/// Reads a credential or fails with a provider error naming the variable.
fn require_credential<'a>(
    seat: &'a PlayerSeatConfig,
    descriptor: &ProviderDescriptor,
) -> Result<&'a str, AcquisitionError> {
    seat.credential().ok_or_else(|| {
        AcquisitionError::new(crate::error::AcquisitionErrorKind::Provider(format!(
            "missing API key for {} (set {} or api_key)",
            descriptor.display_name, descriptor.api_key_env
        )))
    })
}

/// Parses a JSON body, mapping failures to provider errors.
fn parse_json(body: &str, provider: &str) -> Result<serde_json::Value, AcquisitionError> {
    serde_json::from_str(body).map_err(|e| {
        AcquisitionError::new(crate::error::AcquisitionErrorKind::Provider(format!(
            "failed to parse {provider} response: {e}"
        )))
    })
}

/// Surfaces `{"error": {"message": ...}}` payloads.
fn reported_error(value: &serde_json::Value) -> Option<String> {
    let error = value.get("error")?;
    if error.is_null() {
        return None;
    }
    Some(
        error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    )
}
