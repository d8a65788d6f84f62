//! Strictly Chess library - AI move acquisition and game orchestration
//!
//! Seats a human or a language model on each side of a chess game, asks
//! providers for moves, pulls a move out of whatever text comes back and
//! commits it only if it is legal and the game it was requested for is still
//! the current one.
//!
//! # Architecture
//!
//! - **Session**: turn ownership, status and stale-result discard
//! - **Pipeline**: prompt, dispatch, retry with backoff, extract, validate
//! - **Providers**: per-backend request/response adapters behind a registry
//! - **Rules**: the chess rules contract and a `shakmaty` implementation
//! - **Auto-play**: chained AI moves with a delay
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use strictly_chess::{
//!     ArenaConfig, DebugSink, GameSession, PlayerSeatConfig, ProviderRegistry,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ArenaConfig::new(
//!     PlayerSeatConfig::human(),
//!     PlayerSeatConfig::ai("openai", "gpt-4o"),
//! );
//! let registry = Arc::new(ProviderRegistry::with_builtin());
//! let pipeline = config.build_pipeline(registry.clone(), DebugSink::none())?;
//! let session = GameSession::new(Arc::new(pipeline), config.seats(&registry))?;
//!
//! session.start_new_game();
//! session.submit_human_move("e2e4");
//! session.request_ai_move().await;
//! println!("{}", session.export_pgn());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod autoplay;
mod config;
mod error;
mod observer;
mod pipeline;
mod prompt;
mod rules;
mod seat;
mod session;
mod token;

// Public modules
pub mod extract;
pub mod providers;

// Crate-level exports - Configuration
pub use config::{ArenaConfig, ConfigError, EngineSettings};

// Crate-level exports - Errors
pub use error::{AcquisitionError, AcquisitionErrorKind};

// Crate-level exports - Debug observation
pub use observer::{
    DebugEvent, DebugEventKind, DebugObserver, DebugSink, RecordingObserver, TracingObserver,
};

// Crate-level exports - Move acquisition
pub use extract::{Extraction, ResponseExtractor};
pub use pipeline::{AcquiredMove, DEFAULT_BACKOFF_BASE, MoveRequestPipeline};
pub use prompt::{ChessPrompt, DEFAULT_CONTEXT_WINDOW, PromptBuilder, TRUNCATION_MARKER};
pub use providers::{
    HttpTransport, ProviderAdapter, ProviderDescriptor, ProviderRegistry, Transport, WireRequest,
    WireResponse,
};

// Crate-level exports - Rules
pub use rules::{
    AppliedMove, Position, RulesError, RulesErrorKind, RulesOracle, StandardRules,
    TerminalReason, TerminalStatus,
};
pub use token::{MoveToken, TokenError};

// Crate-level exports - Seats and session
pub use autoplay::{AutoPlayScheduler, AutoPlayStop, DEFAULT_AUTO_PLAY_DELAY};
pub use seat::{PlayerSeatConfig, Seat, SeatKind, Seats};
pub use session::{
    AiMoveOutcome, GameSession, HumanMoveOutcome, MoveRecord, Rejection, SessionIdentity,
    SessionState, SessionStatus,
};
