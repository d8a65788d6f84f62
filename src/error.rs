//! Move-acquisition error types.

use derive_more::{Display, Error};
use tracing::instrument;

/// Categories of move-acquisition failure.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum AcquisitionErrorKind {
    /// Network failure, timeout or unreadable body.
    #[display("Transport error: {}", _0)]
    Transport(String),
    /// Non-2xx HTTP status.
    #[display("HTTP {}: {}", status, message)]
    Http {
        /// Status code.
        status: u16,
        /// Provider message or raw body.
        message: String,
    },
    /// Error payload reported by the provider in a successful response.
    #[display("Provider error: {}", _0)]
    Provider(String),
    /// Response parsed but carried no text.
    #[display("Empty response: {}", _0)]
    EmptyResponse(String),
    /// No move token could be found in the text.
    #[display("No move found in response")]
    Extraction,
    /// Extracted token is not legal in the position.
    #[display("Illegal move suggested: {}", _0)]
    IllegalMove(String),
    /// Seat names a provider the registry does not know.
    #[display("Unknown provider: {}", _0)]
    UnknownProvider(String),
    /// Every attempt failed.
    #[display("Gave up after {} attempts: {}", attempts, last)]
    ExhaustedRetries {
        /// Attempts made.
        attempts: u32,
        /// The final attempt's error.
        last: String,
    },
}

impl AcquisitionErrorKind {
    /// Whether the pipeline should spend another attempt after this failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AcquisitionErrorKind::UnknownProvider(_) | AcquisitionErrorKind::ExhaustedRetries { .. }
        )
    }
}

/// Move-acquisition error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{} at {}:{}", kind, file, line)]
pub struct AcquisitionError {
    /// What went wrong.
    pub kind: AcquisitionErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl AcquisitionError {
    /// Creates a new error with caller location tracking.
    #[track_caller]
    #[instrument]
    pub fn new(kind: AcquisitionErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
