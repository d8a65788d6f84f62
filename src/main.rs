//! Strictly Chess - Unified CLI
//!
//! Terminal front end for the move acquisition engine.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, PLAY_HELP, PlayCommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strictly_chess::{
    AiMoveOutcome, ArenaConfig, AutoPlayScheduler, DebugEvent, DebugEventKind, DebugObserver,
    DebugSink, GameSession, HumanMoveOutcome, PlayerSeatConfig, ProviderRegistry,
    ResponseExtractor, SeatKind, SessionStatus,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{info, instrument, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    initialize_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            fen,
            auto,
            debug,
        } => run_play(config, fen, auto, debug).await,
        Command::Providers => run_providers(),
        Command::Extract { file } => run_extract(file).await,
    }
}

/// Logs go to stderr so the game stays readable on stdout.
fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,strictly_chess=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Prints committed AI moves, and everything else when verbose.
struct ConsoleObserver {
    verbose: bool,
}

impl DebugObserver for ConsoleObserver {
    fn observe(&self, event: DebugEvent) {
        match event.kind {
            DebugEventKind::Move => println!("{} plays {}", event.seat, event.text),
            kind if self.verbose => {
                println!("[{} {}] {}", kind, event.seat, event.text);
                if let Some(raw) = &event.raw_text {
                    println!("{raw}");
                }
            }
            _ => {}
        }
    }
}

/// Run an interactive game on stdin/stdout
#[instrument(skip_all, fields(config_path = %config_path.display()))]
async fn run_play(
    config_path: PathBuf,
    fen: Option<String>,
    auto: bool,
    debug: bool,
) -> Result<()> {
    let registry = Arc::new(ProviderRegistry::with_builtin());
    let config = load_arena_config(&config_path)?;
    config.validate(&registry)?;

    let sink = DebugSink::new(Arc::new(ConsoleObserver { verbose: debug }));
    let pipeline = config.build_pipeline(registry.clone(), sink)?;
    let session = GameSession::new(Arc::new(pipeline), config.seats(&registry))?;
    let scheduler = AutoPlayScheduler::new(session.clone(), config.engine().auto_play_delay());

    match fen {
        Some(fen) => session.start_new_game_from(&fen)?,
        None => session.start_new_game(),
    };
    info!("Game ready");
    print_status(&session);
    println!("Type 'help' for commands.");

    if auto && scheduler.toggle().is_some() {
        println!("Auto-play on");
    } else {
        follow_up(&session, &scheduler).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = PlayCommand::parse(&line) else {
            continue;
        };

        match command {
            PlayCommand::Move(token) => match session.submit_human_move(&token) {
                HumanMoveOutcome::Applied(record) => {
                    println!("{} plays {}", record.seat, record.san);
                    print_status(&session);
                    follow_up(&session, &scheduler).await;
                }
                HumanMoveOutcome::Rejected(rejection) => println!("Rejected: {rejection}"),
            },
            PlayCommand::Ai => {
                let outcome = session.request_ai_move().await;
                report_ai_outcome(&session, &outcome);
            }
            PlayCommand::Auto => match scheduler.toggle() {
                Some(_) => println!("Auto-play on"),
                None => println!("Auto-play off"),
            },
            PlayCommand::Stop => {
                session.stop_auto_play();
                println!("Auto-play off");
            }
            PlayCommand::New => {
                session.start_new_game();
                print_status(&session);
                follow_up(&session, &scheduler).await;
            }
            PlayCommand::Reset => {
                session.reset_game();
                print_status(&session);
            }
            PlayCommand::Pgn => println!("{}", session.export_pgn()),
            PlayCommand::Fen => println!("{}", session.snapshot().position().fen()),
            PlayCommand::Status => print_status(&session),
            PlayCommand::Help => println!("{PLAY_HELP}"),
            PlayCommand::Quit => break,
        }
    }

    session.stop_auto_play();
    info!("Leaving game");
    Ok(())
}

/// After a human move or a new game, lets an AI seat answer: through the
/// scheduler when auto-play is on, directly otherwise.
async fn follow_up(session: &GameSession, scheduler: &AutoPlayScheduler) {
    if scheduler.resume().is_some() {
        return;
    }
    let state = session.snapshot();
    if *state.status() == SessionStatus::Active && state.kind_to_move() == SeatKind::Ai {
        let outcome = session.request_ai_move().await;
        report_ai_outcome(session, &outcome);
    }
}

fn report_ai_outcome(session: &GameSession, outcome: &AiMoveOutcome) {
    match outcome {
        AiMoveOutcome::Applied { thoughts, .. } => {
            if let Some(thoughts) = thoughts {
                println!("  \"{thoughts}\"");
            }
            print_status(session);
        }
        AiMoveOutcome::Rejected(rejection) => println!("Rejected: {rejection}"),
        AiMoveOutcome::Failed(_) => print_status(session),
        AiMoveOutcome::Discarded => {}
    }
}

fn print_status(session: &GameSession) {
    let state = session.snapshot();
    println!("[{}] {}", state.status(), state.status_message());
}

#[instrument]
fn load_arena_config(path: &Path) -> Result<ArenaConfig> {
    if path.exists() {
        return Ok(ArenaConfig::from_file(path)?);
    }
    info!(
        "Config file not found at {}, using defaults",
        path.display()
    );
    Ok(ArenaConfig::new(
        PlayerSeatConfig::human(),
        PlayerSeatConfig::ai("openai", "gpt-4o"),
    ))
}

/// List providers and models
fn run_providers() -> Result<()> {
    let registry = ProviderRegistry::with_builtin();
    for provider in registry.list() {
        println!(
            "{} ({}) - key from {}",
            provider.id, provider.display_name, provider.api_key_env
        );
        for model in provider.models {
            println!("    {:<36} {}", model.id, model.display_name);
        }
    }
    Ok(())
}

/// Run the extractor over a saved response
#[instrument]
async fn run_extract(file: Option<PathBuf>) -> Result<()> {
    let text = match file {
        Some(path) => tokio::fs::read_to_string(&path).await?,
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        }
    };

    match ResponseExtractor::new().extract(&text) {
        Some(found) => {
            println!("move: {}", found.token);
            if let Some(thoughts) = found.thoughts {
                println!("thoughts: {thoughts}");
            }
        }
        None => {
            warn!("No move found");
            println!("no move found");
        }
    }
    Ok(())
}
