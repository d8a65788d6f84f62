//! Tests for the auto-play scheduler.

mod common;

use common::{GatedTransport, ScriptedTransport, ai_seat, json_move, session};
use std::sync::Arc;
use std::time::Duration;
use strictly_chess::{
    AutoPlayScheduler, AutoPlayStop, GameSession, HumanMoveOutcome, PlayerSeatConfig,
    SessionStatus,
};

async fn wait_for_moves(session: &GameSession, count: usize) {
    for _ in 0..400 {
        if session.snapshot().move_history().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never reached {count} moves");
}

#[tokio::test]
async fn test_ai_vs_ai_chains_until_failure() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .say(&json_move("e2e4"))
            .say(&json_move("e7e5"))
            .say(&json_move("g1f3")),
    );
    let session = session(transport.clone(), ai_seat(1), ai_seat(1));
    session.start_new_game();
    let scheduler = AutoPlayScheduler::new(session.clone(), Duration::ZERO);

    let stop = scheduler.toggle().expect("auto-play starts").await.unwrap();

    assert!(matches!(stop, AutoPlayStop::Failed(_)));
    let state = session.snapshot();
    assert_eq!(state.move_history().len(), 3);
    assert!(!*state.auto_play());
    assert_eq!(transport.count(), 4);
}

#[tokio::test]
async fn test_stop_during_delay_prevents_next_request() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .say(&json_move("e2e4"))
            .say(&json_move("e7e5")),
    );
    let session = session(transport.clone(), ai_seat(1), ai_seat(1));
    session.start_new_game();
    let scheduler = AutoPlayScheduler::new(session.clone(), Duration::from_millis(500));

    let handle = scheduler.toggle().expect("auto-play starts");
    wait_for_moves(&session, 1).await;
    session.stop_auto_play();

    assert_eq!(handle.await.unwrap(), AutoPlayStop::Disabled);
    assert_eq!(transport.count(), 1);
    assert_eq!(session.snapshot().move_history().len(), 1);
}

#[tokio::test]
async fn test_human_opponent_gets_single_reply() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .say(&json_move("e2e4"))
            .say(&json_move("g1f3")),
    );
    let session = session(transport.clone(), ai_seat(1), PlayerSeatConfig::human());
    session.start_new_game();
    let scheduler = AutoPlayScheduler::new(session.clone(), Duration::ZERO);

    let stop = scheduler.toggle().expect("auto-play starts").await.unwrap();
    assert_eq!(stop, AutoPlayStop::HumanToMove);
    assert!(session.is_auto_play());
    assert_eq!(transport.count(), 1);

    assert!(matches!(
        session.submit_human_move("e7e5"),
        HumanMoveOutcome::Applied(_)
    ));
    let stop = scheduler.resume().expect("auto-play still on").await.unwrap();
    assert_eq!(stop, AutoPlayStop::HumanToMove);
    assert_eq!(session.snapshot().move_history()[2].san, "Nf3");
}

#[tokio::test]
async fn test_toggle_without_game_does_nothing() {
    let session = session(
        Arc::new(ScriptedTransport::new()),
        ai_seat(1),
        ai_seat(1),
    );
    let scheduler = AutoPlayScheduler::new(session.clone(), Duration::ZERO);
    assert!(scheduler.toggle().is_none());
    assert!(!session.is_auto_play());
}

#[tokio::test]
async fn test_reset_mid_request_supersedes_run() {
    let transport = Arc::new(GatedTransport::new(&json_move("e2e4")));
    let session = session(transport.clone(), ai_seat(1), ai_seat(1));
    session.start_new_game();
    let scheduler = AutoPlayScheduler::new(session.clone(), Duration::ZERO);

    let handle = scheduler.toggle().expect("auto-play starts");
    transport.wait_for_request().await;
    session.reset_game();
    transport.open();

    assert_eq!(handle.await.unwrap(), AutoPlayStop::Superseded);
    let state = session.snapshot();
    assert_eq!(*state.status(), SessionStatus::Idle);
    assert!(state.move_history().is_empty());
}

#[tokio::test]
async fn test_checkmate_ends_run() {
    let transport = Arc::new(ScriptedTransport::new().say(&json_move("d8h4")));
    let session = session(transport.clone(), ai_seat(1), ai_seat(1));
    session
        .start_new_game_from("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2")
        .unwrap();
    let scheduler = AutoPlayScheduler::new(session.clone(), Duration::ZERO);

    let stop = scheduler.toggle().expect("auto-play starts").await.unwrap();
    assert_eq!(stop, AutoPlayStop::GameOver);
    assert_eq!(session.status(), SessionStatus::BlackWins);
    assert_eq!(transport.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_off_and_on_during_delay_keeps_one_run() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .say(&json_move("e2e4"))
            .say(&json_move("e7e5"))
            .say(&json_move("g1f3")),
    );
    let session = session(transport.clone(), ai_seat(1), ai_seat(1));
    session.start_new_game();
    let scheduler = AutoPlayScheduler::new(session.clone(), Duration::from_millis(400));

    let first = scheduler.toggle().expect("auto-play starts");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(scheduler.toggle().is_none());
    let second = scheduler.toggle().expect("auto-play restarts");

    // The first run wakes at 400ms and must not play again.
    assert_eq!(first.await.unwrap(), AutoPlayStop::Disabled);
    assert!(!second.is_finished());
    assert_eq!(session.snapshot().move_history().len(), 2);
    assert_eq!(transport.count(), 2);

    session.stop_auto_play();
    assert_eq!(second.await.unwrap(), AutoPlayStop::Disabled);
    assert_eq!(session.snapshot().move_history().len(), 2);
}
