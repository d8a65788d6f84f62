//! HTTP transport for provider requests.

use super::{HttpMethod, WireRequest};
use crate::error::{AcquisitionError, AcquisitionErrorKind};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Raw response from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl WireResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends [`WireRequest`]s.
///
/// Errors are always [`AcquisitionErrorKind::Transport`]; HTTP status handling
/// belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns whatever the server answered.
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, AcquisitionError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport whose requests time out after `timeout`.
    #[instrument]
    pub fn new(timeout: Duration) -> Result<Self, AcquisitionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build HTTP client");
                AcquisitionError::new(AcquisitionErrorKind::Transport(format!(
                    "failed to build HTTP client: {e}"
                )))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(url = request.redacted_url()))]
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, AcquisitionError> {
        let mut builder = match request.method {
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!("Sending provider request");
        let response = builder.json(&request.body).send().await.map_err(|e| {
            let e = e.without_url();
            error!(error = %e, "Provider request failed");
            AcquisitionError::new(AcquisitionErrorKind::Transport(format!(
                "request to {} failed: {e}",
                request.redacted_url()
            )))
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            let e = e.without_url();
            error!(error = %e, "Failed to read provider response");
            AcquisitionError::new(AcquisitionErrorKind::Transport(format!(
                "failed to read response body: {e}"
            )))
        })?;

        debug!(status, length = body.len(), "Provider responded");
        Ok(WireResponse { status, body })
    }
}
