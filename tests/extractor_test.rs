//! Tests for layered move extraction from model replies.

use strictly_chess::ResponseExtractor;
use strictly_chess::extract::{fenced_json, inline_json, last_mention, lead_in, move_pair};

fn token(text: &str) -> Option<String> {
    ResponseExtractor::new()
        .extract(text)
        .map(|found| found.token.to_string())
}

#[test]
fn test_fenced_json_beats_later_prose() {
    let reply = "```json\n{\"move\": \"e2e4\", \"explanation\": \"Center.\"}\n```\n\
                 Actually my move is d2d4.";
    assert_eq!(token(reply).as_deref(), Some("e2e4"));

    let found = ResponseExtractor::new().extract(reply).unwrap();
    assert_eq!(found.thoughts.as_deref(), Some("Center."));
}

#[test]
fn test_inline_json_is_second_choice() {
    let reply = "I considered c2c4. Final answer: {\"move\": \"g1f3\", \"reasoning\": \"Flexible.\"}";
    let found = ResponseExtractor::new().extract(reply).unwrap();
    assert_eq!(found.token.as_str(), "g1f3");
    assert_eq!(found.thoughts.as_deref(), Some("Flexible."));
}

#[test]
fn test_move_pair_survives_broken_json() {
    let reply = "{\"move\": \"b1c3\", \"explanation\": \"unterminated";
    assert!(inline_json(reply).is_none());
    assert_eq!(
        move_pair(reply).map(|f| f.token.to_string()).as_deref(),
        Some("b1c3")
    );
    assert_eq!(token(reply).as_deref(), Some("b1c3"));
}

#[test]
fn test_lead_in_phrase_beats_last_mention() {
    let reply = "Therefore I play e2e4, since e2e3 and d2d3 are passive.";
    assert_eq!(token(reply).as_deref(), Some("e2e4"));
}

#[test]
fn test_last_mention_prefers_final_candidate() {
    let reply = "Options are e2e4 and d2d4. After comparing them, d2d4.";
    assert_eq!(token(reply).as_deref(), Some("d2d4"));
    assert_eq!(
        last_mention(reply).map(|f| f.token.to_string()).as_deref(),
        Some("d2d4")
    );
}

#[test]
fn test_promotion_suffix_is_kept() {
    assert_eq!(token("My move is e7e8q.").as_deref(), Some("e7e8q"));
    assert_eq!(token("I play A7A8N").as_deref(), Some("a7a8n"));
}

#[test]
fn test_prose_strategies_keep_full_text_as_thoughts() {
    let reply = "  The knight is strong here. I play g1f3.  ";
    let found = lead_in(reply).unwrap();
    assert_eq!(found.thoughts.as_deref(), Some("The knight is strong here. I play g1f3."));
}

#[test]
fn test_nothing_found_in_plain_text() {
    assert!(token("I resign. Good game!").is_none());
    assert!(token("").is_none());
    assert!(fenced_json("```json\n{\"move\": \"castle\"}\n```").is_none());
}

#[test]
fn test_grammar_rejects_off_board_squares() {
    assert!(token("Maybe i9j1 or z2z4?").is_none());
}

#[test]
fn test_ellipsis_between_candidates_takes_the_last() {
    assert_eq!(token("e2e4 ... d7d5").as_deref(), Some("d7d5"));
}
