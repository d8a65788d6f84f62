//! Arena configuration loaded from TOML.

use crate::observer::DebugSink;
use crate::pipeline::MoveRequestPipeline;
use crate::providers::{HttpTransport, ProviderRegistry};
use crate::rules::StandardRules;
use crate::seat::{PlayerSeatConfig, Seat, Seats};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Engine timing and prompt settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Base delay for retry backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    backoff_base_ms: u64,

    /// Recent plies shown in the prompt.
    #[serde(default = "default_context_window")]
    context_window: usize,

    /// Pause between chained auto-play moves, in milliseconds.
    #[serde(default = "default_auto_play_delay_ms")]
    auto_play_delay_ms: u64,

    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_context_window() -> usize {
    crate::prompt::DEFAULT_CONTEXT_WINDOW
}

fn default_auto_play_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backoff_base_ms: default_backoff_base_ms(),
            context_window: default_context_window(),
            auto_play_delay_ms: default_auto_play_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EngineSettings {
    /// Backoff base as a duration.
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Auto-play delay as a duration.
    pub fn auto_play_delay(&self) -> Duration {
        Duration::from_millis(self.auto_play_delay_ms)
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Everything needed to set up a game: engine settings and both seats.
#[derive(Debug, Clone, Default, PartialEq, Getters, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Engine settings.
    #[serde(default)]
    engine: EngineSettings,

    /// White seat.
    #[serde(default)]
    white: PlayerSeatConfig,

    /// Black seat.
    #[serde(default)]
    black: PlayerSeatConfig,
}

impl ArenaConfig {
    /// Creates a config from seats with default engine settings.
    pub fn new(white: PlayerSeatConfig, black: PlayerSeatConfig) -> Self {
        Self {
            engine: EngineSettings::default(),
            white,
            black,
        }
    }

    /// Loads configuration from TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(
            white = %config.white.label(),
            black = %config.black.label(),
            "Config loaded successfully"
        );
        Ok(config)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Checks every AI seat against `registry`.
    ///
    /// Unknown providers and a zero attempt budget are errors. A model missing
    /// from the provider's catalog only warns, since custom model ids are
    /// allowed.
    #[instrument(skip(self, registry))]
    pub fn validate(&self, registry: &ProviderRegistry) -> Result<(), ConfigError> {
        for (seat, config) in [(Seat::White, &self.white), (Seat::Black, &self.black)] {
            if !config.is_ai() {
                continue;
            }
            let adapter = registry.get(config.provider()).map_err(|_| {
                ConfigError::new(format!(
                    "{} seat uses unknown provider '{}'",
                    seat,
                    config.provider()
                ))
            })?;
            if *config.max_retry_attempts() == 0 {
                return Err(ConfigError::new(format!(
                    "{} seat needs at least one attempt",
                    seat
                )));
            }
            if !adapter.descriptor().has_model(config.effective_model()) {
                warn!(
                    %seat,
                    model = config.effective_model(),
                    "Model not in provider catalog; using it as a custom id"
                );
            }
        }
        Ok(())
    }

    /// Seats with missing credentials filled from the environment.
    #[instrument(skip(self, registry))]
    pub fn seats(&self, registry: &ProviderRegistry) -> Seats {
        let mut seats = Seats::new(self.white.clone(), self.black.clone());
        registry.fill_credentials_from_env(&mut seats);
        seats
    }

    /// Builds a live pipeline with an HTTP transport.
    #[instrument(skip(self, registry, sink))]
    pub fn build_pipeline(
        &self,
        registry: Arc<ProviderRegistry>,
        sink: DebugSink,
    ) -> Result<MoveRequestPipeline, ConfigError> {
        let transport = HttpTransport::new(self.engine.request_timeout())
            .map_err(|e| ConfigError::new(format!("Failed to create transport: {}", e.kind)))?;
        Ok(MoveRequestPipeline::new(
            registry,
            Arc::new(transport),
            Arc::new(StandardRules::new()),
        )
        .with_backoff_base(self.engine.backoff_base())
        .with_context_window(self.engine.context_window)
        .with_sink(sink))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
