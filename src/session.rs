//! Game session: turn ownership, status and race-safe commits.
//!
//! A [`GameSession`] is a cheap cloneable handle. State sits behind a mutex
//! that is never held across an `.await`, so a reset can land while a
//! provider request is still in flight. Every new or reset game gets a fresh
//! [`SessionIdentity`]; an AI result whose captured identity no longer
//! matches is dropped without touching the new game.

use crate::observer::{DebugEvent, DebugEventKind};
use crate::pipeline::MoveRequestPipeline;
use crate::rules::{AppliedMove, Position, RulesError, RulesOracle, TerminalReason};
use crate::seat::{PlayerSeatConfig, Seat, SeatKind, Seats};
use crate::token::MoveToken;
use derive_getters::Getters;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Generation counter identifying one game within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[display("#{}", _0)]
pub struct SessionIdentity(u64);

impl SessionIdentity {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Lifecycle of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No game running.
    Idle,
    /// Game in progress.
    Active,
    /// White delivered mate.
    WhiteWins,
    /// Black delivered mate.
    BlackWins,
    /// Drawn.
    Draw,
}

impl SessionStatus {
    /// Returns `true` once the game has a result.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::WhiteWins | SessionStatus::BlackWins | SessionStatus::Draw
        )
    }
}

/// One committed move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Standard algebraic notation.
    pub san: String,
    /// Coordinate token.
    pub token: MoveToken,
    /// FEN after the move.
    pub fen_after: String,
    /// Who moved.
    pub seat: Seat,
    /// Full-move number the move belongs to.
    pub move_number: u32,
}

/// Why an operation was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Rejection {
    /// No game in progress.
    #[display("no game in progress")]
    NotActive,
    /// An AI reply is still pending.
    #[display("waiting for the AI to move")]
    AwaitingAi,
    /// The seat to move is AI-controlled.
    #[display("it is not a human's turn")]
    NotHumanTurn,
    /// The seat to move is human-controlled.
    #[display("it is not an AI's turn")]
    NotAiTurn,
    /// The AI seat to move has no credential.
    #[display("{} has no API key", _0)]
    MissingCredential(Seat),
    /// Input is not a move token.
    #[display("malformed move: {}", _0)]
    MalformedMove(String),
    /// Token is not legal here.
    #[display("illegal move: {}", _0)]
    IllegalMove(MoveToken),
    /// Seats cannot change during a game.
    #[display("cannot change seats while a game is in progress")]
    GameInProgress,
}

/// Result of [`GameSession::submit_human_move`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HumanMoveOutcome {
    /// The move was committed.
    Applied(MoveRecord),
    /// Nothing changed.
    Rejected(Rejection),
}

impl HumanMoveOutcome {
    /// Returns `true` if the move was committed.
    pub fn is_applied(&self) -> bool {
        matches!(self, HumanMoveOutcome::Applied(_))
    }
}

/// Result of [`GameSession::request_ai_move`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiMoveOutcome {
    /// The move was committed.
    Applied {
        /// The committed move.
        record: MoveRecord,
        /// The model's rationale.
        thoughts: Option<String>,
    },
    /// The request never started.
    Rejected(Rejection),
    /// The provider could not produce a legal move; the status message says
    /// why and auto-play is off.
    Failed(String),
    /// The game was replaced while the request was in flight.
    Discarded,
}

impl AiMoveOutcome {
    /// Returns `true` if the move was committed.
    pub fn is_applied(&self) -> bool {
        matches!(self, AiMoveOutcome::Applied { .. })
    }
}

/// Everything a renderer needs, copied out of the session.
#[derive(Debug, Clone, Getters)]
pub struct SessionState {
    identity: SessionIdentity,
    position: Position,
    move_history: Vec<MoveRecord>,
    status: SessionStatus,
    status_message: String,
    awaiting_ai: Option<Seat>,
    auto_play: bool,
    auto_play_epoch: u64,
    seats: Seats,
    last_thoughts: Option<String>,
}

impl SessionState {
    /// Seat to move.
    pub fn turn(&self) -> Seat {
        self.position.turn()
    }

    /// Whether an AI reply is pending.
    pub fn is_awaiting_ai(&self) -> bool {
        self.awaiting_ai.is_some()
    }

    /// Controller of the seat to move.
    pub fn kind_to_move(&self) -> SeatKind {
        *self.seats.get(self.turn()).kind()
    }

    /// Turns auto-play off and invalidates any run started before.
    fn disable_auto_play(&mut self) {
        self.auto_play = false;
        self.auto_play_epoch += 1;
    }

    fn to_move_message(&self) -> String {
        let seat = self.turn();
        let check = if self.position.is_check() { " (check)" } else { "" };
        format!("{seat} to move{check}")
    }
}

/// Handle to one running game.
#[derive(Clone)]
pub struct GameSession {
    state: Arc<Mutex<SessionState>>,
    pipeline: Arc<MoveRequestPipeline>,
    initial: Position,
}

impl GameSession {
    /// Creates an idle session with the standard starting position.
    #[instrument(skip(pipeline))]
    pub fn new(pipeline: Arc<MoveRequestPipeline>, seats: Seats) -> Result<Self, RulesError> {
        let initial = pipeline.rules().new_position(None)?;
        info!("Creating game session");
        let state = SessionState {
            identity: SessionIdentity(0),
            position: initial.clone(),
            move_history: Vec::new(),
            status: SessionStatus::Idle,
            status_message: "No game in progress".to_string(),
            awaiting_ai: None,
            auto_play: false,
            auto_play_epoch: 0,
            seats,
            last_thoughts: None,
        };
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            pipeline,
            initial,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rules(&self) -> &dyn RulesOracle {
        self.pipeline.rules().as_ref()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    /// Current game identity.
    pub fn identity(&self) -> SessionIdentity {
        self.lock().identity
    }

    /// Whether auto-play is on.
    pub fn is_auto_play(&self) -> bool {
        self.lock().auto_play
    }

    /// Starts a fresh game from the standard position.
    #[instrument(skip(self))]
    pub fn start_new_game(&self) -> SessionIdentity {
        self.begin(self.initial.clone(), SessionStatus::Active)
    }

    /// Starts a fresh game from `fen`. The session is untouched on error.
    #[instrument(skip(self))]
    pub fn start_new_game_from(&self, fen: &str) -> Result<SessionIdentity, RulesError> {
        let position = self.rules().new_position(Some(fen))?;
        Ok(self.begin(position, SessionStatus::Active))
    }

    /// Abandons the current game and returns to idle.
    #[instrument(skip(self))]
    pub fn reset_game(&self) -> SessionIdentity {
        self.begin(self.initial.clone(), SessionStatus::Idle)
    }

    fn begin(&self, position: Position, status: SessionStatus) -> SessionIdentity {
        let mut state = self.lock();
        state.identity = state.identity.next();
        state.position = position;
        state.move_history.clear();
        state.status = status;
        state.awaiting_ai = None;
        state.disable_auto_play();
        state.last_thoughts = None;

        // A game that starts already finished (custom FEN) gets its result now.
        if status == SessionStatus::Active {
            Self::refresh_status(self.rules(), &mut state);
        } else {
            state.status_message = "No game in progress".to_string();
        }

        info!(identity = %state.identity, status = %state.status, "Game started");
        state.identity
    }

    /// Replaces the configuration of `seat`. Rejected while a game is active.
    #[instrument(skip(self, config))]
    pub fn set_seat_config(&self, seat: Seat, config: PlayerSeatConfig) -> Result<(), Rejection> {
        let mut state = self.lock();
        if state.status == SessionStatus::Active {
            warn!("Seat change rejected during active game");
            return Err(Rejection::GameInProgress);
        }
        *state.seats.get_mut(seat) = config;
        Ok(())
    }

    /// Plays `token` for the human seat to move.
    #[instrument(skip(self))]
    pub fn submit_human_move(&self, token: &str) -> HumanMoveOutcome {
        let mut state = self.lock();

        if state.status != SessionStatus::Active {
            return HumanMoveOutcome::Rejected(Rejection::NotActive);
        }
        if state.is_awaiting_ai() {
            return HumanMoveOutcome::Rejected(Rejection::AwaitingAi);
        }
        if state.kind_to_move() != SeatKind::Human {
            return HumanMoveOutcome::Rejected(Rejection::NotHumanTurn);
        }

        let token = match MoveToken::parse(token) {
            Ok(token) => token,
            Err(_) => {
                debug!("Malformed human move");
                return HumanMoveOutcome::Rejected(Rejection::MalformedMove(token.to_string()));
            }
        };

        match self.rules().apply_move(&state.position, &token) {
            Ok(applied) => {
                let record = Self::commit(self.rules(), &mut state, token, applied);
                HumanMoveOutcome::Applied(record)
            }
            Err(e) => {
                debug!(error = %e, "Illegal human move");
                HumanMoveOutcome::Rejected(Rejection::IllegalMove(token))
            }
        }
    }

    /// Asks the AI seat to move for a move and commits it if this game is
    /// still current when the reply arrives.
    #[instrument(skip(self))]
    pub async fn request_ai_move(&self) -> AiMoveOutcome {
        let (identity, position, seat, config) = {
            let mut state = self.lock();

            if state.status != SessionStatus::Active {
                return AiMoveOutcome::Rejected(Rejection::NotActive);
            }
            if state.is_awaiting_ai() {
                return AiMoveOutcome::Rejected(Rejection::AwaitingAi);
            }

            let seat = state.turn();
            let config = state.seats.get(seat).clone();
            if !config.is_ai() {
                return AiMoveOutcome::Rejected(Rejection::NotAiTurn);
            }
            if config.credential().is_none() {
                warn!(%seat, provider = %config.provider(), "AI seat has no credential");
                state.status_message = format!(
                    "{seat} ({}) needs an API key before it can move",
                    config.provider()
                );
                state.disable_auto_play();
                return AiMoveOutcome::Rejected(Rejection::MissingCredential(seat));
            }

            state.awaiting_ai = Some(seat);
            state.status_message = format!("{seat} ({}) is thinking...", config.label());
            (state.identity, state.position.clone(), seat, config)
        };

        let mut pending = PendingRequest {
            session: self,
            identity,
            armed: true,
        };
        let result = self
            .pipeline
            .acquire_move(&position, seat, &config)
            .await;

        let outcome = {
            let mut state = self.lock();
            pending.armed = false;
            if state.identity != identity {
                debug!(
                    captured = %identity,
                    current = %state.identity,
                    "Discarding stale AI result"
                );
                return AiMoveOutcome::Discarded;
            }
            state.awaiting_ai = None;

            let applied = result
                .map_err(|e| e.kind.to_string())
                .and_then(|acquired| {
                    self.rules()
                        .apply_move(&state.position, &acquired.token)
                        .map(|applied| (acquired, applied))
                        .map_err(|e| e.kind.to_string())
                });

            match applied {
                Ok((acquired, applied)) => {
                    let record =
                        Self::commit(self.rules(), &mut state, acquired.token, applied);
                    state.last_thoughts = acquired.thoughts.clone();
                    AiMoveOutcome::Applied {
                        record,
                        thoughts: acquired.thoughts,
                    }
                }
                Err(message) => {
                    warn!(%seat, error = %message, "AI move failed");
                    state.status_message = format!("AI error ({seat}): {message}");
                    state.disable_auto_play();
                    AiMoveOutcome::Failed(message)
                }
            }
        };

        // Emitted after the lock is released so observers may read the session.
        if let AiMoveOutcome::Applied { record, thoughts } = &outcome {
            let mut event = DebugEvent::new(
                DebugEventKind::Move,
                seat,
                format!("{}. {} ({})", record.move_number, record.san, record.token),
            );
            if let Some(thoughts) = thoughts {
                event = event.with_raw(thoughts.clone());
            }
            self.pipeline.sink().emit(event);
        }

        outcome
    }

    /// Flips auto-play. Turning it on outside an active game does nothing.
    /// Returns the new state.
    #[instrument(skip(self))]
    pub fn toggle_auto_play(&self) -> bool {
        let mut state = self.lock();
        if state.auto_play {
            state.disable_auto_play();
        } else if state.status == SessionStatus::Active {
            state.auto_play = true;
            state.auto_play_epoch += 1;
        } else {
            debug!("Auto-play not enabled: no active game");
            return false;
        }
        info!(auto_play = state.auto_play, epoch = state.auto_play_epoch, "Auto-play toggled");
        state.auto_play
    }

    /// Turns auto-play off.
    #[instrument(skip(self))]
    pub fn stop_auto_play(&self) {
        self.lock().disable_auto_play();
    }

    /// Hands auto-play to a new run and returns its epoch, or `None` when
    /// auto-play is off. Any earlier run sees a stale epoch and stops.
    pub fn claim_auto_play(&self) -> Option<u64> {
        let mut state = self.lock();
        if !state.auto_play {
            return None;
        }
        state.auto_play_epoch += 1;
        Some(state.auto_play_epoch)
    }

    /// PGN of the current game.
    #[instrument(skip(self))]
    pub fn export_pgn(&self) -> String {
        let state = self.lock();
        self.rules().export_game_notation(
            &state.position,
            &state.seats.white().label(),
            &state.seats.black().label(),
        )
    }

    fn commit(
        rules: &dyn RulesOracle,
        state: &mut SessionState,
        token: MoveToken,
        applied: AppliedMove,
    ) -> MoveRecord {
        let record = MoveRecord {
            san: applied.san,
            token,
            fen_after: applied.position.fen(),
            seat: state.position.turn(),
            move_number: state.position.fullmove_number(),
        };
        state.position = applied.position;
        state.move_history.push(record.clone());
        Self::refresh_status(rules, state);

        info!(
            seat = %record.seat,
            san = %record.san,
            status = %state.status,
            "Move committed"
        );
        record
    }

    fn refresh_status(rules: &dyn RulesOracle, state: &mut SessionState) {
        let terminal = rules.terminal_status(&state.position);
        if !terminal.is_over {
            state.status = SessionStatus::Active;
            state.status_message = state.to_move_message();
            return;
        }

        state.status = match terminal.winner {
            Some(Seat::White) => SessionStatus::WhiteWins,
            Some(Seat::Black) => SessionStatus::BlackWins,
            None => SessionStatus::Draw,
        };
        state.status_message = match (terminal.reason, terminal.winner) {
            (TerminalReason::Checkmate, Some(winner)) => format!("Checkmate: {winner} wins"),
            (reason, _) => format!("Draw by {reason}"),
        };
        state.disable_auto_play();
        info!(status = %state.status, reason = %terminal.reason, "Game over");
    }
}

/// Clears the pending-AI marker if a request future is dropped before its
/// reply is committed.
struct PendingRequest<'a> {
    session: &'a GameSession,
    identity: SessionIdentity,
    armed: bool,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.session.lock();
        if state.identity == self.identity && state.awaiting_ai.is_some() {
            warn!(identity = %self.identity, "AI request abandoned");
            state.awaiting_ai = None;
            state.status_message = state.to_move_message();
        }
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("GameSession")
            .field("identity", &state.identity)
            .field("status", &state.status)
            .field("moves", &state.move_history.len())
            .finish_non_exhaustive()
    }
}
