//! One AI move: prompt, dispatch, retry, extract, validate.

use crate::error::{AcquisitionError, AcquisitionErrorKind};
use crate::extract::ResponseExtractor;
use crate::observer::{DebugEvent, DebugEventKind, DebugSink};
use crate::prompt::{ChessPrompt, PromptBuilder};
use crate::providers::{ProviderAdapter, ProviderRegistry, Transport};
use crate::rules::{Position, RulesOracle};
use crate::seat::{PlayerSeatConfig, Seat};
use crate::token::MoveToken;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default base delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// A validated move from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredMove {
    /// Legal token for the captured position.
    pub token: MoveToken,
    /// The model's rationale, if it gave one.
    pub thoughts: Option<String>,
    /// Attempt that succeeded (1-based).
    pub attempts: u32,
}

/// Turns a position and a seat config into a legal move, or an error after
/// the seat's attempt budget is spent.
pub struct MoveRequestPipeline {
    registry: Arc<ProviderRegistry>,
    transport: Arc<dyn Transport>,
    rules: Arc<dyn RulesOracle>,
    prompts: PromptBuilder,
    extractor: ResponseExtractor,
    backoff_base: Duration,
    sink: DebugSink,
}

impl MoveRequestPipeline {
    /// Creates a pipeline with the default prompt window and backoff.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        transport: Arc<dyn Transport>,
        rules: Arc<dyn RulesOracle>,
    ) -> Self {
        Self {
            registry,
            transport,
            rules,
            prompts: PromptBuilder::default(),
            extractor: ResponseExtractor::new(),
            backoff_base: DEFAULT_BACKOFF_BASE,
            sink: DebugSink::none(),
        }
    }

    /// Sets the base delay; attempt `n` waits `base * 2^n` before retrying.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets how many recent plies the prompt shows.
    pub fn with_context_window(mut self, plies: usize) -> Self {
        self.prompts = PromptBuilder::new(plies);
        self
    }

    /// Attaches a debug sink.
    pub fn with_sink(mut self, sink: DebugSink) -> Self {
        self.sink = sink;
        self
    }

    /// The debug sink shared with the session.
    pub fn sink(&self) -> &DebugSink {
        &self.sink
    }

    /// The rules oracle moves are validated against.
    pub fn rules(&self) -> &Arc<dyn RulesOracle> {
        &self.rules
    }

    /// Delay after failed attempt `attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }

    /// Builds the prompt for `seat` to move in `position`.
    pub fn build_prompt(&self, position: &Position, seat: Seat) -> ChessPrompt {
        let legal = self.rules.legal_move_tokens(position);
        self.prompts
            .build(&position.fen(), seat, position.san_history(), &legal)
    }

    /// Asks `config`'s provider for a move in `position`.
    ///
    /// Every failure short of an unknown provider consumes one attempt; the
    /// last attempt's error is reported inside
    /// [`AcquisitionErrorKind::ExhaustedRetries`].
    #[instrument(skip(self, position, config), fields(provider = %config.provider(), model = config.effective_model()))]
    pub async fn acquire_move(
        &self,
        position: &Position,
        seat: Seat,
        config: &PlayerSeatConfig,
    ) -> Result<AcquiredMove, AcquisitionError> {
        let adapter = self.registry.get(config.provider())?;
        let prompt = self.build_prompt(position, seat);
        let max_attempts = (*config.max_retry_attempts()).max(1);

        let mut last_error = None;
        for attempt in 1..=max_attempts {
            match self
                .attempt(adapter.as_ref(), &prompt, position, seat, config)
                .await
            {
                Ok((token, thoughts)) => {
                    info!(attempt, token = %token, "Acquired move");
                    return Ok(AcquiredMove {
                        token,
                        thoughts,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e.kind, "Move attempt failed");
                    self.sink.emit(DebugEvent::new(
                        DebugEventKind::Error,
                        seat,
                        format!("Attempt {attempt}/{max_attempts}: {}", e.kind),
                    ));
                    if !e.kind.is_retryable() {
                        return Err(e);
                    }
                    last_error = Some(e);
                    if attempt < max_attempts {
                        let delay = self.backoff_delay(attempt);
                        debug!(?delay, "Backing off");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let last = last_error
            .map(|e| e.kind.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        Err(AcquisitionError::new(
            AcquisitionErrorKind::ExhaustedRetries {
                attempts: max_attempts,
                last,
            },
        ))
    }

    async fn attempt(
        &self,
        adapter: &dyn ProviderAdapter,
        prompt: &ChessPrompt,
        position: &Position,
        seat: Seat,
        config: &PlayerSeatConfig,
    ) -> Result<(MoveToken, Option<String>), AcquisitionError> {
        let request = adapter.build_request(prompt, config)?;
        self.sink.emit(
            DebugEvent::new(
                DebugEventKind::Prompt,
                seat,
                format!(
                    "{} {} ({})",
                    request.method,
                    request.redacted_url(),
                    config.effective_model()
                ),
            )
            .with_raw(prompt.combined()),
        );

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            let message = adapter
                .parse_error(&response.body)
                .unwrap_or_else(|| response.body.clone());
            return Err(AcquisitionError::new(AcquisitionErrorKind::Http {
                status: response.status,
                message,
            }));
        }

        let text = adapter.parse_response(&response.body)?;
        self.sink.emit(
            DebugEvent::new(DebugEventKind::Response, seat, text.clone())
                .with_raw(response.body.clone()),
        );

        let extraction = self
            .extractor
            .extract(&text)
            .ok_or_else(|| AcquisitionError::new(AcquisitionErrorKind::Extraction))?;

        if !self.rules.is_legal(position, &extraction.token) {
            return Err(AcquisitionError::new(AcquisitionErrorKind::IllegalMove(
                extraction.token.to_string(),
            )));
        }

        Ok((extraction.token, extraction.thoughts))
    }
}

impl std::fmt::Debug for MoveRequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoveRequestPipeline")
            .field("registry", &self.registry)
            .field("prompts", &self.prompts)
            .field("backoff_base", &self.backoff_base)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{WireRequest, WireResponse};
    use crate::rules::StandardRules;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn send(&self, _request: &WireRequest) -> Result<WireResponse, AcquisitionError> {
            unreachable!("no request expected")
        }
    }

    fn pipeline() -> MoveRequestPipeline {
        MoveRequestPipeline::new(
            Arc::new(ProviderRegistry::with_builtin()),
            Arc::new(Unreachable),
            Arc::new(StandardRules::new()),
        )
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let p = pipeline().with_backoff_base(Duration::from_millis(500));
        assert_eq!(p.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(p.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(p.backoff_delay(3), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_unknown_provider_fails_without_dispatch() {
        let p = pipeline();
        let position = p.rules().new_position(None).unwrap();
        let seat = PlayerSeatConfig::ai("nope", "model").with_api_key("k");
        let err = p.acquire_move(&position, Seat::White, &seat).await.unwrap_err();
        assert!(matches!(err.kind, AcquisitionErrorKind::UnknownProvider(_)));
    }
}
