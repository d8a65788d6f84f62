//! Seats and per-seat player configuration.

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// One of the two turn-order slots.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    /// Moves first.
    White,
    /// Moves second.
    Black,
}

impl Seat {
    /// Returns the other seat.
    pub fn opponent(self) -> Self {
        match self {
            Seat::White => Seat::Black,
            Seat::Black => Seat::White,
        }
    }
}

impl From<shakmaty::Color> for Seat {
    fn from(color: shakmaty::Color) -> Self {
        match color {
            shakmaty::Color::White => Seat::White,
            shakmaty::Color::Black => Seat::Black,
        }
    }
}

/// Who controls a seat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SeatKind {
    /// Moves come from `submit_human_move`.
    #[default]
    Human,
    /// Moves come from a language-model provider.
    Ai,
}

/// Configuration for one seat.
///
/// Human seats ignore every field except `kind`.
#[derive(Clone, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct PlayerSeatConfig {
    /// Human or AI.
    #[serde(default)]
    kind: SeatKind,

    /// Registry id of the provider (e.g. "openai").
    #[serde(default = "default_provider")]
    #[setters(into)]
    provider: String,

    /// Model id from the provider's catalog.
    #[serde(default = "default_model")]
    #[setters(into)]
    model: String,

    /// Free-form model id that takes precedence over `model` when non-empty.
    #[serde(default)]
    #[setters(strip_option, into)]
    custom_model: Option<String>,

    /// Sampling temperature sent to the provider.
    #[serde(default = "default_temperature")]
    temperature: f32,

    /// Attempts per move before giving up.
    #[serde(default = "default_max_retry_attempts")]
    max_retry_attempts: u32,

    /// Provider credential. Never serialized back out.
    #[serde(default, skip_serializing)]
    #[setters(strip_option, into)]
    api_key: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_retry_attempts() -> u32 {
    3
}

impl PlayerSeatConfig {
    /// A human-controlled seat.
    pub fn human() -> Self {
        Self {
            kind: SeatKind::Human,
            provider: default_provider(),
            model: default_model(),
            custom_model: None,
            temperature: default_temperature(),
            max_retry_attempts: default_max_retry_attempts(),
            api_key: None,
        }
    }

    /// An AI-controlled seat using `provider` and `model`.
    #[instrument(skip(provider, model))]
    pub fn ai(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind: SeatKind::Ai,
            provider: provider.into(),
            model: model.into(),
            ..Self::human()
        }
    }

    /// Returns `true` for AI-controlled seats.
    pub fn is_ai(&self) -> bool {
        self.kind == SeatKind::Ai
    }

    /// The model actually sent to the provider.
    pub fn effective_model(&self) -> &str {
        match self.custom_model.as_deref().map(str::trim) {
            Some(custom) if !custom.is_empty() => custom,
            _ => &self.model,
        }
    }

    /// The credential, if present and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Fills a missing credential from the environment variable `var`.
    #[instrument(skip(self), fields(provider = %self.provider))]
    pub fn fill_credential_from_env(&mut self, var: &str) {
        if self.credential().is_some() {
            return;
        }
        if let Ok(key) = std::env::var(var) {
            debug!(var, "Using credential from environment");
            self.api_key = Some(key);
        }
    }

    /// Short label used in game notation and status messages.
    pub fn label(&self) -> String {
        match self.kind {
            SeatKind::Human => "Human".to_string(),
            SeatKind::Ai => format!("{}/{}", self.provider, self.effective_model()),
        }
    }
}

impl Default for PlayerSeatConfig {
    fn default() -> Self {
        Self::human()
    }
}

// Manual Debug so the credential never reaches logs.
impl std::fmt::Debug for PlayerSeatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSeatConfig")
            .field("kind", &self.kind)
            .field("provider", &self.provider)
            .field("model", &self.effective_model())
            .field("temperature", &self.temperature)
            .field("max_retry_attempts", &self.max_retry_attempts)
            .field("has_credential", &self.credential().is_some())
            .finish()
    }
}

/// The pair of seat configurations for a game.
#[derive(Debug, Clone, Default, PartialEq, Getters, Serialize, Deserialize)]
pub struct Seats {
    /// First to move.
    #[serde(default)]
    white: PlayerSeatConfig,
    /// Second to move.
    #[serde(default)]
    black: PlayerSeatConfig,
}

impl Seats {
    /// Creates a seat pair.
    pub fn new(white: PlayerSeatConfig, black: PlayerSeatConfig) -> Self {
        Self { white, black }
    }

    /// Config for `seat`.
    pub fn get(&self, seat: Seat) -> &PlayerSeatConfig {
        match seat {
            Seat::White => &self.white,
            Seat::Black => &self.black,
        }
    }

    /// Mutable config for `seat`.
    pub fn get_mut(&mut self, seat: Seat) -> &mut PlayerSeatConfig {
        match seat {
            Seat::White => &mut self.white,
            Seat::Black => &mut self.black,
        }
    }

    /// Returns `true` when neither seat is human.
    pub fn both_ai(&self) -> bool {
        self.white.is_ai() && self.black.is_ai()
    }
}
