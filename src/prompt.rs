//! Provider-agnostic prompt construction.

use crate::seat::Seat;
use crate::token::MoveToken;
use tracing::instrument;

/// Default number of recent plies shown to the model.
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

/// Marker placed before the move list when older moves were cut.
pub const TRUNCATION_MARKER: &str = "...";

const SYSTEM_PROMPT: &str = "You are a strong chess player. You will be given a chess position \
in FEN notation, the recent moves of the game and the complete list of legal moves. Choose the \
best move for the side to move.\n\n\
Answer with a JSON code block of the form:\n\
```json\n{\"move\": \"e2e4\", \"explanation\": \"one or two sentences\"}\n```\n\
The move MUST be copied exactly from the list of legal moves, in coordinate notation: source \
square, destination square and, for promotions, the piece letter (q, r, b or n).";

/// A system/user instruction pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChessPrompt {
    /// Role and output-format instructions.
    pub system: String,
    /// The position-specific request.
    pub user: String,
}

impl ChessPrompt {
    /// Both parts joined, for models without a system role.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Builds [`ChessPrompt`]s with a bounded move-history window.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    context_window: usize,
}

impl PromptBuilder {
    /// Creates a builder showing at most `context_window` recent plies.
    pub fn new(context_window: usize) -> Self {
        Self { context_window }
    }

    /// Number of recent plies included.
    pub fn context_window(&self) -> usize {
        self.context_window
    }

    /// Builds the prompt for `seat` to move in the position `fen`.
    #[instrument(skip(self, recent_moves, legal_moves), fields(history = recent_moves.len(), legal = legal_moves.len()))]
    pub fn build(
        &self,
        fen: &str,
        seat: Seat,
        recent_moves: &[String],
        legal_moves: &[MoveToken],
    ) -> ChessPrompt {
        let mut user = String::new();
        user.push_str(&format!("You are playing {seat}. It is your move.\n\n"));
        user.push_str(&format!("Position (FEN): {fen}\n\n"));
        user.push_str(&format!(
            "Recent moves: {}\n\n",
            self.recent_moves_text(recent_moves)
        ));

        let legal: Vec<&str> = legal_moves.iter().map(MoveToken::as_str).collect();
        user.push_str(&format!("Legal moves: {}\n\n", legal.join(", ")));
        user.push_str("Reply with your chosen move in the JSON format described above.");

        ChessPrompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }

    /// The last `context_window` moves, prefixed with the truncation marker
    /// when older moves were dropped.
    pub fn recent_moves_text(&self, moves: &[String]) -> String {
        if moves.is_empty() {
            return "(none, this is the first move)".to_string();
        }
        let start = moves.len().saturating_sub(self.context_window);
        let shown = moves[start..].join(" ");
        if start > 0 {
            format!("{TRUNCATION_MARKER} {shown}")
        } else {
            shown
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_WINDOW)
    }
}
