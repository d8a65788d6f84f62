//! Tests for the move request pipeline's retry and validation loop.

mod common;

use common::{ScriptedTransport, ai_seat, json_move, pipeline};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use strictly_chess::{
    AcquisitionErrorKind, DebugEventKind, PlayerSeatConfig, RulesOracle, Seat, StandardRules,
};

fn start() -> strictly_chess::Position {
    StandardRules::new().new_position(None).unwrap()
}

#[tokio::test]
async fn test_first_valid_reply_wins() {
    let transport = Arc::new(ScriptedTransport::new().say(&json_move("e2e4")));
    let (pipeline, _) = pipeline(transport.clone());

    let acquired = pipeline
        .acquire_move(&start(), Seat::White, &ai_seat(3))
        .await
        .unwrap();
    assert_eq!(acquired.token.as_str(), "e2e4");
    assert_eq!(acquired.attempts, 1);
    assert_eq!(transport.count(), 1);
}

#[tokio::test]
async fn test_gives_up_after_exactly_max_attempts() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .say("hmm")
            .say("hmm")
            .say("hmm")
            .say(&json_move("e2e4")),
    );
    let (pipeline, observer) = pipeline(transport.clone());

    let err = pipeline
        .acquire_move(&start(), Seat::White, &ai_seat(3))
        .await
        .unwrap_err();
    assert_eq!(transport.count(), 3);
    match err.kind {
        AcquisitionErrorKind::ExhaustedRetries { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last, AcquisitionErrorKind::Extraction.to_string());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(observer.events_of(DebugEventKind::Error).len(), 3);
}

#[tokio::test]
async fn test_persistent_transport_failure_gives_up_after_three_calls() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail("connection refused")
            .fail("connection refused")
            .fail("connection refused")
            .say(&json_move("e2e4")),
    );
    let (pipeline, _) = pipeline(transport.clone());

    let err = pipeline
        .acquire_move(&start(), Seat::White, &ai_seat(3))
        .await
        .unwrap_err();
    assert_eq!(transport.count(), 3);
    match err.kind {
        AcquisitionErrorKind::ExhaustedRetries { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(last.contains("connection refused"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_backoff_only_between_attempts() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail("timeout")
            .fail("timeout")
            .fail("timeout"),
    );
    let (pipeline, _) = pipeline(transport.clone());
    let pipeline = Arc::try_unwrap(pipeline)
        .unwrap()
        .with_backoff_base(Duration::from_millis(100));

    let started = tokio::time::Instant::now();
    pipeline
        .acquire_move(&start(), Seat::White, &ai_seat(3))
        .await
        .unwrap_err();

    // 200ms after the first failure, 400ms after the second, none after the last.
    assert_eq!(started.elapsed(), Duration::from_millis(600));
    assert_eq!(transport.count(), 3);
}

#[tokio::test]
async fn test_illegal_suggestion_consumes_an_attempt() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .say(&json_move("e2e5"))
            .say(&json_move("d2d4")),
    );
    let (pipeline, observer) = pipeline(transport.clone());

    let acquired = pipeline
        .acquire_move(&start(), Seat::White, &ai_seat(3))
        .await
        .unwrap();
    assert_eq!(acquired.token.as_str(), "d2d4");
    assert_eq!(acquired.attempts, 2);

    let errors = observer.events_of(DebugEventKind::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].text.contains("e2e5"));
}

#[tokio::test]
async fn test_transport_and_http_failures_are_retried() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail("connection reset")
            .reply(
                429,
                json!({ "error": { "message": "Rate limit reached" } }).to_string(),
            )
            .say("After some thought, my move is g1f3."),
    );
    let (pipeline, observer) = pipeline(transport.clone());

    let acquired = pipeline
        .acquire_move(&start(), Seat::White, &ai_seat(3))
        .await
        .unwrap();
    assert_eq!(acquired.token.as_str(), "g1f3");
    assert_eq!(acquired.attempts, 3);

    let errors = observer.events_of(DebugEventKind::Error);
    assert!(errors[0].text.contains("connection reset"));
    assert!(errors[1].text.contains("429"));
    assert!(errors[1].text.contains("Rate limit reached"));
}

#[tokio::test]
async fn test_provider_error_payload_is_retried() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(200, json!({ "error": { "message": "overloaded" } }).to_string())
            .say(&json_move("e2e4")),
    );
    let (pipeline, _) = pipeline(transport.clone());

    let acquired = pipeline
        .acquire_move(&start(), Seat::White, &ai_seat(2))
        .await
        .unwrap();
    assert_eq!(acquired.attempts, 2);
}

#[tokio::test]
async fn test_single_attempt_seat_fails_fast() {
    let transport = Arc::new(ScriptedTransport::new().say("no idea").say(&json_move("e2e4")));
    let (pipeline, _) = pipeline(transport.clone());

    let err = pipeline
        .acquire_move(&start(), Seat::White, &ai_seat(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind,
        AcquisitionErrorKind::ExhaustedRetries { attempts: 1, .. }
    ));
    assert_eq!(transport.count(), 1);
}

#[tokio::test]
async fn test_unknown_provider_sends_nothing() {
    let transport = Arc::new(ScriptedTransport::new());
    let (pipeline, _) = pipeline(transport.clone());
    let seat = PlayerSeatConfig::ai("mystery", "m1").with_api_key("k");

    let err = pipeline
        .acquire_move(&start(), Seat::White, &seat)
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        AcquisitionErrorKind::UnknownProvider("mystery".to_string())
    );
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn test_request_carries_prompt_and_credential() {
    let transport = Arc::new(ScriptedTransport::new().say(&json_move("e2e4")));
    let (pipeline, observer) = pipeline(transport.clone());

    pipeline
        .acquire_move(&start(), Seat::White, &ai_seat(1))
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent[0].header_value("authorization"), Some("Bearer test-key"));
    assert_eq!(sent[0].body["model"], "gpt-4o");
    let user = sent[0].body["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"));
    assert!(user.contains("e2e4"));

    let prompts = observer.events_of(DebugEventKind::Prompt);
    assert_eq!(prompts.len(), 1);
    assert!(!prompts[0].text.contains("test-key"));
    assert_eq!(observer.events_of(DebugEventKind::Response).len(), 1);
}

#[tokio::test]
async fn test_prompt_window_truncates_history() {
    let rules = StandardRules::new();
    let mut position = start();
    for token in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5"] {
        position = rules
            .apply_move(&position, &token.parse::<strictly_chess::MoveToken>().unwrap())
            .unwrap()
            .position;
    }
    let (pipeline, _) = pipeline(Arc::new(ScriptedTransport::new()));
    let pipeline = Arc::try_unwrap(pipeline).unwrap().with_context_window(2);

    let prompt = pipeline.build_prompt(&position, Seat::White);
    assert!(prompt.user.contains("... Bc4 Bc5"));
    assert!(!prompt.user.contains("Nf3"));
}
