//! Command-line interface for strictly_chess.

use clap::{Parser, Subcommand};

/// Strictly Chess - play chess against language models, or watch them play
#[derive(Parser, Debug)]
#[command(name = "strictly_chess")]
#[command(about = "Chess arena for humans and LLM providers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play an interactive game in the terminal
    Play {
        /// Path to arena config file
        #[arg(short, long, default_value = "arena.toml")]
        config: std::path::PathBuf,

        /// Start from this FEN instead of the standard position
        #[arg(long)]
        fen: Option<String>,

        /// Turn auto-play on as soon as the game starts
        #[arg(long)]
        auto: bool,

        /// Print prompts, raw responses and attempt errors
        #[arg(long)]
        debug: bool,
    },

    /// List providers and their models
    Providers,

    /// Run the move extractor on a model response
    Extract {
        /// File holding the response text (reads stdin if omitted)
        file: Option<std::path::PathBuf>,
    },
}

/// Commands accepted on stdin during `play`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayCommand {
    /// A move token for the human seat.
    Move(String),
    /// Ask the AI seat to move.
    Ai,
    /// Toggle auto-play.
    Auto,
    /// Stop auto-play.
    Stop,
    /// Start a new game.
    New,
    /// Reset to idle.
    Reset,
    /// Print the PGN.
    Pgn,
    /// Print the FEN.
    Fen,
    /// Print the session status.
    Status,
    /// Print the command list.
    Help,
    /// Exit.
    Quit,
}

impl PlayCommand {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let word = line.trim();
        if word.is_empty() {
            return None;
        }
        Some(match word.to_ascii_lowercase().as_str() {
            "ai" => PlayCommand::Ai,
            "auto" => PlayCommand::Auto,
            "stop" => PlayCommand::Stop,
            "new" => PlayCommand::New,
            "reset" => PlayCommand::Reset,
            "pgn" => PlayCommand::Pgn,
            "fen" => PlayCommand::Fen,
            "status" => PlayCommand::Status,
            "help" | "?" => PlayCommand::Help,
            "quit" | "exit" | "q" => PlayCommand::Quit,
            _ => PlayCommand::Move(word.to_string()),
        })
    }
}

/// Help text for the `play` loop.
pub const PLAY_HELP: &str = "\
Commands:
  <move>   play a move in coordinate notation, e.g. e2e4 or e7e8q
  ai       ask the AI seat to move
  auto     toggle auto-play
  stop     stop auto-play
  new      start a new game
  reset    abandon the game
  pgn      print the game in PGN
  fen      print the current position
  status   print the session status
  quit     exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_command_parsing() {
        assert_eq!(PlayCommand::parse("  "), None);
        assert_eq!(PlayCommand::parse("AI"), Some(PlayCommand::Ai));
        assert_eq!(PlayCommand::parse("q"), Some(PlayCommand::Quit));
        assert_eq!(
            PlayCommand::parse(" e2e4 "),
            Some(PlayCommand::Move("e2e4".to_string()))
        );
    }

    #[test]
    fn test_cli_parses_play_flags() {
        let cli = Cli::parse_from([
            "strictly_chess",
            "play",
            "--auto",
            "--fen",
            "8/8/8/8/8/8/8/K6k w - - 0 1",
        ]);
        match cli.command {
            Command::Play { auto, fen, .. } => {
                assert!(auto);
                assert!(fen.is_some());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
