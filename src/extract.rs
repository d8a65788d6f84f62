//! Move extraction from free-form model output.
//!
//! Strategies run in a fixed priority order and the first one that yields a
//! grammatical token wins:
//!
//! 1. fenced JSON code block with a `move` field
//! 2. inline JSON object with a `move` field
//! 3. bare `"move": "<token>"` pair
//! 4. lead-in phrase ("my move is", "I play", ...) followed by a token
//! 5. the last token anywhere in the text
//!
//! Models often list candidates before committing, which is why the final
//! fallback prefers the last mention.

use crate::token::MoveToken;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(\{.*?\})\s*```").expect("valid regex"));

static INLINE_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}]*\}").expect("valid regex"));

static MOVE_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"move"\s*:\s*"([a-h][1-8][a-h][1-8][qrbn]?)""#).expect("valid regex")
});

static LEAD_IN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:my move is|my move:|i play|i will play|i'll play|best move is|therefore,? i play|i choose|final move is|final move:)\s*[:\-]?\s*[*`"']*\s*([a-h][1-8][a-h][1-8][qrbn]?)\b"#,
    )
    .expect("valid regex")
});

static BARE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([a-h][1-8][a-h][1-8][qrbn]?)\b").expect("valid regex"));

/// A move candidate pulled out of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// The grammatical (not yet legality-checked) token.
    pub token: MoveToken,
    /// The model's rationale, when it gave one.
    pub thoughts: Option<String>,
}

type Strategy = fn(&str) -> Option<Extraction>;

const STRATEGIES: [(&str, Strategy); 5] = [
    ("fenced_json", fenced_json),
    ("inline_json", inline_json),
    ("move_pair", move_pair),
    ("lead_in", lead_in),
    ("last_mention", last_mention),
];

/// Runs the extraction strategies in priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    /// Creates an extractor.
    pub fn new() -> Self {
        Self
    }

    /// Returns the first candidate any strategy finds, or `None`.
    #[instrument(skip(self, text), fields(length = text.len()))]
    pub fn extract(&self, text: &str) -> Option<Extraction> {
        for (name, strategy) in STRATEGIES {
            if let Some(found) = strategy(text) {
                debug!(strategy = name, token = %found.token, "Extracted move");
                return Some(found);
            }
        }
        debug!("No move found in response");
        None
    }
}

/// Reads `move` plus an optional rationale out of a JSON object.
fn from_json_object(json: &str) -> Option<Extraction> {
    let value: Value = serde_json::from_str(json).ok()?;
    let token = MoveToken::parse(value.get("move")?.as_str()?).ok()?;
    let thoughts = ["explanation", "thoughts", "reasoning"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    Some(Extraction { token, thoughts })
}

fn prose(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Strategy 1: a fenced code block holding a JSON object.
pub fn fenced_json(text: &str) -> Option<Extraction> {
    FENCED_JSON
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|body| from_json_object(body.as_str()))
}

/// Strategy 2: a flat JSON object anywhere in the text.
pub fn inline_json(text: &str) -> Option<Extraction> {
    INLINE_JSON
        .find_iter(text)
        .find_map(|object| from_json_object(object.as_str()))
}

/// Strategy 3: a `"move": "<token>"` pair outside any parseable object.
pub fn move_pair(text: &str) -> Option<Extraction> {
    let caps = MOVE_PAIR.captures(text)?;
    let token = MoveToken::parse(caps.get(1)?.as_str()).ok()?;
    Some(Extraction {
        token,
        thoughts: prose(text),
    })
}

/// Strategy 4: a token right after an explicit lead-in phrase.
///
/// When the phrase appears several times the last one is taken.
pub fn lead_in(text: &str) -> Option<Extraction> {
    let caps = LEAD_IN.captures_iter(text).last()?;
    let token = MoveToken::parse(caps.get(1)?.as_str()).ok()?;
    Some(Extraction {
        token,
        thoughts: prose(text),
    })
}

/// Strategy 5: the last token anywhere in the text.
pub fn last_mention(text: &str) -> Option<Extraction> {
    let last = BARE_TOKEN.captures_iter(text).last()?;
    let token = MoveToken::parse(last.get(1)?.as_str()).ok()?;
    Some(Extraction {
        token,
        thoughts: prose(text),
    })
}
