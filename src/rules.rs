//! Rules oracle: legality, move application and terminal-state queries.
//!
//! The engine never inspects board internals. Everything it needs goes
//! through [`RulesOracle`], and [`StandardRules`] answers those questions for
//! standard chess using `shakmaty`.

use crate::seat::Seat;
use crate::token::MoveToken;
use derive_more::{Display, Error};
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::Uci;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _};
use std::str::FromStr;
use tracing::{debug, instrument};

/// Game position handle.
///
/// Besides the board it remembers how it was reached (SAN moves and
/// repetition keys), so notation export and repetition detection only need
/// the position itself.
#[derive(Debug, Clone)]
pub struct Position {
    chess: Chess,
    initial_fen: Option<String>,
    initial_turn: Seat,
    initial_fullmove: u32,
    san_history: Vec<String>,
    repetition_keys: Vec<String>,
}

impl Position {
    fn from_chess(chess: Chess, initial_fen: Option<String>) -> Self {
        let key = repetition_key(&chess);
        Self {
            initial_turn: chess.turn().into(),
            initial_fullmove: chess.fullmoves().get(),
            chess,
            initial_fen,
            san_history: Vec::new(),
            repetition_keys: vec![key],
        }
    }

    /// FEN of the current board.
    pub fn fen(&self) -> String {
        Fen::from_position(self.chess.clone(), EnPassantMode::Legal).to_string()
    }

    /// Seat to move.
    pub fn turn(&self) -> Seat {
        self.chess.turn().into()
    }

    /// Current full-move number.
    pub fn fullmove_number(&self) -> u32 {
        self.chess.fullmoves().get()
    }

    /// SAN of every move played since the initial position.
    pub fn san_history(&self) -> &[String] {
        &self.san_history
    }

    /// Returns `true` if the side to move is in check.
    pub fn is_check(&self) -> bool {
        self.chess.is_check()
    }

    fn repetitions_of_current(&self) -> usize {
        match self.repetition_keys.last() {
            Some(current) => self
                .repetition_keys
                .iter()
                .filter(|key| *key == current)
                .count(),
            None => 0,
        }
    }
}

// Board, side to move, castling rights and legal en passant square.
fn repetition_key(chess: &Chess) -> String {
    Fen::from_position(chess.clone(), EnPassantMode::Legal)
        .to_string()
        .split(' ')
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of a successful [`RulesOracle::apply_move`].
#[derive(Debug, Clone)]
pub struct AppliedMove {
    /// Position after the move.
    pub position: Position,
    /// Standard algebraic notation of the move, with check suffix.
    pub san: String,
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum TerminalReason {
    /// The game is still going.
    #[strum(to_string = "in progress")]
    Ongoing,
    /// Side to move is mated.
    #[strum(to_string = "checkmate")]
    Checkmate,
    /// Side to move has no legal move and is not in check.
    #[strum(to_string = "stalemate")]
    Stalemate,
    /// Neither side can mate.
    #[strum(to_string = "insufficient material")]
    InsufficientMaterial,
    /// Same position occurred three times.
    #[strum(to_string = "threefold repetition")]
    ThreefoldRepetition,
    /// A hundred plies without capture or pawn move.
    #[strum(to_string = "fifty-move rule")]
    FiftyMoveRule,
}

/// Answer to [`RulesOracle::terminal_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalStatus {
    /// Whether the game is over.
    pub is_over: bool,
    /// Winning seat, if decisive.
    pub winner: Option<Seat>,
    /// Reason the game ended.
    pub reason: TerminalReason,
}

impl TerminalStatus {
    fn ongoing() -> Self {
        Self {
            is_over: false,
            winner: None,
            reason: TerminalReason::Ongoing,
        }
    }

    fn draw(reason: TerminalReason) -> Self {
        Self {
            is_over: true,
            winner: None,
            reason,
        }
    }

    /// PGN result marker.
    pub fn result_marker(&self) -> &'static str {
        match (self.is_over, self.winner) {
            (false, _) => "*",
            (true, Some(Seat::White)) => "1-0",
            (true, Some(Seat::Black)) => "0-1",
            (true, None) => "1/2-1/2",
        }
    }
}

/// Contract the orchestration engine needs from a chess rules implementation.
pub trait RulesOracle: Send + Sync + std::fmt::Debug {
    /// Starting position, or the position described by `fen`.
    fn new_position(&self, fen: Option<&str>) -> Result<Position, RulesError>;

    /// Every legal move in `position`, sorted.
    fn legal_move_tokens(&self, position: &Position) -> Vec<MoveToken>;

    /// Whether `token` is legal in `position`.
    fn is_legal(&self, position: &Position, token: &MoveToken) -> bool;

    /// Plays `token`, returning the new position and the move's SAN.
    fn apply_move(&self, position: &Position, token: &MoveToken)
    -> Result<AppliedMove, RulesError>;

    /// Whether the game is over and why.
    fn terminal_status(&self, position: &Position) -> TerminalStatus;

    /// PGN for the game that led to `position`.
    fn export_game_notation(&self, position: &Position, white: &str, black: &str) -> String;
}

/// Standard chess rules backed by `shakmaty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl StandardRules {
    /// Creates the standard rules oracle.
    pub fn new() -> Self {
        Self
    }

    fn to_move(position: &Position, token: &MoveToken) -> Result<shakmaty::Move, RulesError> {
        let uci = Uci::from_str(token.as_str())
            .map_err(|e| RulesError::new(RulesErrorKind::IllegalMove(format!("{token}: {e}"))))?;
        uci.to_move(&position.chess)
            .map_err(|e| RulesError::new(RulesErrorKind::IllegalMove(format!("{token}: {e}"))))
    }
}

impl RulesOracle for StandardRules {
    #[instrument(skip(self))]
    fn new_position(&self, fen: Option<&str>) -> Result<Position, RulesError> {
        let Some(fen) = fen.map(str::trim).filter(|f| !f.is_empty()) else {
            return Ok(Position::from_chess(Chess::default(), None));
        };

        let parsed = Fen::from_str(fen)
            .map_err(|e| RulesError::new(RulesErrorKind::InvalidFen(format!("{fen}: {e}"))))?;
        let chess: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::new(RulesErrorKind::InvalidFen(format!("{fen}: {e}"))))?;

        debug!(fen, "Loaded custom starting position");
        Ok(Position::from_chess(chess, Some(fen.to_string())))
    }

    fn legal_move_tokens(&self, position: &Position) -> Vec<MoveToken> {
        let mut tokens: Vec<MoveToken> = position
            .chess
            .legal_moves()
            .iter()
            .filter_map(|m| MoveToken::parse(&Uci::from_standard(m).to_string()).ok())
            .collect();
        tokens.sort();
        tokens
    }

    fn is_legal(&self, position: &Position, token: &MoveToken) -> bool {
        Self::to_move(position, token).is_ok()
    }

    #[instrument(skip(self, position), fields(token = %token))]
    fn apply_move(
        &self,
        position: &Position,
        token: &MoveToken,
    ) -> Result<AppliedMove, RulesError> {
        let chess_move = Self::to_move(position, token)?;
        let san = San::from_move(&position.chess, &chess_move);

        let chess = position
            .chess
            .clone()
            .play(&chess_move)
            .map_err(|e| RulesError::new(RulesErrorKind::IllegalMove(format!("{token}: {e}"))))?;

        let suffix = if chess.is_checkmate() {
            "#"
        } else if chess.is_check() {
            "+"
        } else {
            ""
        };
        let san = format!("{san}{suffix}");

        let mut next = position.clone();
        next.repetition_keys.push(repetition_key(&chess));
        next.san_history.push(san.clone());
        next.chess = chess;

        debug!(san = %san, "Move applied");
        Ok(AppliedMove {
            position: next,
            san,
        })
    }

    fn terminal_status(&self, position: &Position) -> TerminalStatus {
        let chess = &position.chess;
        if chess.is_checkmate() {
            return TerminalStatus {
                is_over: true,
                winner: Some(Seat::from(chess.turn()).opponent()),
                reason: TerminalReason::Checkmate,
            };
        }
        if chess.is_stalemate() {
            return TerminalStatus::draw(TerminalReason::Stalemate);
        }
        if chess.is_insufficient_material() {
            return TerminalStatus::draw(TerminalReason::InsufficientMaterial);
        }
        if position.repetitions_of_current() >= 3 {
            return TerminalStatus::draw(TerminalReason::ThreefoldRepetition);
        }
        if chess.halfmoves() >= 100 {
            return TerminalStatus::draw(TerminalReason::FiftyMoveRule);
        }
        TerminalStatus::ongoing()
    }

    #[instrument(skip(self, position))]
    fn export_game_notation(&self, position: &Position, white: &str, black: &str) -> String {
        let result = self.terminal_status(position).result_marker();
        let date = chrono::Local::now().format("%Y.%m.%d");

        let mut pgn = String::new();
        pgn.push_str("[Event \"Casual Game\"]\n");
        pgn.push_str("[Site \"strictly_chess\"]\n");
        pgn.push_str(&format!("[Date \"{date}\"]\n"));
        pgn.push_str("[Round \"-\"]\n");
        pgn.push_str(&format!("[White \"{}\"]\n", escape_tag(white)));
        pgn.push_str(&format!("[Black \"{}\"]\n", escape_tag(black)));
        pgn.push_str(&format!("[Result \"{result}\"]\n"));
        if let Some(fen) = &position.initial_fen {
            pgn.push_str("[SetUp \"1\"]\n");
            pgn.push_str(&format!("[FEN \"{fen}\"]\n"));
        }
        pgn.push('\n');

        let mut movetext = Vec::new();
        let mut number = position.initial_fullmove;
        let mut turn = position.initial_turn;
        for (i, san) in position.san_history.iter().enumerate() {
            match turn {
                Seat::White => movetext.push(format!("{number}. {san}")),
                Seat::Black if i == 0 => movetext.push(format!("{number}... {san}")),
                Seat::Black => movetext.push(san.clone()),
            }
            if turn == Seat::Black {
                number += 1;
            }
            turn = turn.opponent();
        }
        movetext.push(result.to_string());

        pgn.push_str(&movetext.join(" "));
        pgn.push('\n');
        pgn
    }
}

fn escape_tag(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Rules error categories.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RulesErrorKind {
    /// Unparseable or impossible FEN.
    #[display("Invalid FEN: {}", _0)]
    InvalidFen(String),
    /// Move not legal in the given position.
    #[display("Illegal move: {}", _0)]
    IllegalMove(String),
}

/// Rules oracle error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Rules error: {} at {}:{}", kind, file, line)]
pub struct RulesError {
    /// What went wrong.
    pub kind: RulesErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl RulesError {
    /// Creates a new rules error with caller location tracking.
    #[track_caller]
    pub fn new(kind: RulesErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
