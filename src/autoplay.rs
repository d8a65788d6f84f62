//! Chains AI moves while auto-play is on.

use crate::seat::SeatKind;
use crate::session::{AiMoveOutcome, GameSession, Rejection, SessionStatus};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Default pause between chained AI moves.
pub const DEFAULT_AUTO_PLAY_DELAY: Duration = Duration::from_millis(1000);

/// How often a run re-checks while another request is still in flight.
const PENDING_POLL: Duration = Duration::from_millis(50);

/// Why an auto-play run ended.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum AutoPlayStop {
    /// The flag was turned off.
    #[display("auto-play turned off")]
    Disabled,
    /// The game has a result.
    #[display("game over")]
    GameOver,
    /// A human seat is to move.
    #[display("human to move")]
    HumanToMove,
    /// The game was reset or replaced mid-request.
    #[display("game replaced")]
    Superseded,
    /// The session refused the request.
    #[display("request rejected: {}", _0)]
    Rejected(Rejection),
    /// The provider failed.
    #[display("AI failed: {}", _0)]
    Failed(String),
}

/// Issues AI move requests for a session, one after another, with a delay
/// between them.
///
/// Every request is preceded by a fresh read of the session, so turning
/// auto-play off or resetting the game during the delay prevents the next
/// request. Each run owns the auto-play epoch it claimed when it started;
/// starting another run retires the previous one, so at most one chain is
/// ever live.
#[derive(Debug, Clone)]
pub struct AutoPlayScheduler {
    session: GameSession,
    delay: Duration,
}

impl AutoPlayScheduler {
    /// Creates a scheduler for `session`.
    pub fn new(session: GameSession, delay: Duration) -> Self {
        Self { session, delay }
    }

    /// Flips auto-play. When it turns on, spawns a run that starts right away
    /// if an AI seat is to move.
    #[instrument(skip(self))]
    pub fn toggle(&self) -> Option<JoinHandle<AutoPlayStop>> {
        if !self.session.toggle_auto_play() {
            return None;
        }
        self.resume()
    }

    /// Starts a run if auto-play is already on, e.g. after a human reply in a
    /// human-vs-AI game.
    #[instrument(skip(self))]
    pub fn resume(&self) -> Option<JoinHandle<AutoPlayStop>> {
        let epoch = self.session.claim_auto_play()?;
        Some(tokio::spawn(self.clone().drive(epoch)))
    }

    /// Runs on the current task until auto-play stops for any reason.
    #[instrument(skip(self))]
    pub async fn run(self) -> AutoPlayStop {
        match self.session.claim_auto_play() {
            Some(epoch) => self.drive(epoch).await,
            None => AutoPlayStop::Disabled,
        }
    }

    async fn drive(self, epoch: u64) -> AutoPlayStop {
        let mut moves = 0u32;
        let stop = loop {
            if let Some(stop) = self.stop_reason(epoch) {
                break stop;
            }

            match self.session.request_ai_move().await {
                AiMoveOutcome::Applied { record, .. } => {
                    moves += 1;
                    debug!(san = %record.san, "Auto-play move applied");
                }
                AiMoveOutcome::Discarded => break AutoPlayStop::Superseded,
                // A retired run still owns the request; wait for it to land.
                AiMoveOutcome::Rejected(Rejection::AwaitingAi) => {
                    tokio::time::sleep(PENDING_POLL).await;
                    continue;
                }
                AiMoveOutcome::Rejected(rejection) => break AutoPlayStop::Rejected(rejection),
                AiMoveOutcome::Failed(message) => break AutoPlayStop::Failed(message),
            }

            // Only AI-vs-AI games chain past a single move.
            if !self.session.snapshot().seats().both_ai() {
                break self
                    .stop_reason(epoch)
                    .unwrap_or(AutoPlayStop::HumanToMove);
            }

            tokio::time::sleep(self.delay).await;
        };

        info!(epoch, moves, %stop, "Auto-play stopped");
        stop
    }

    fn stop_reason(&self, epoch: u64) -> Option<AutoPlayStop> {
        let state = self.session.snapshot();
        if state.status().is_terminal() {
            return Some(AutoPlayStop::GameOver);
        }
        if !*state.auto_play()
            || *state.auto_play_epoch() != epoch
            || *state.status() != SessionStatus::Active
        {
            return Some(AutoPlayStop::Disabled);
        }
        if state.kind_to_move() == SeatKind::Human {
            return Some(AutoPlayStop::HumanToMove);
        }
        None
    }
}
