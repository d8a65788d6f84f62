//! Compact coordinate move tokens (`e2e4`, `e7e8q`).

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;

/// A move in coordinate notation: source square, destination square and an
/// optional promotion piece.
///
/// Always stored lowercase. Grammar: `[a-h][1-8][a-h][1-8][qrbn]?`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MoveToken(String);

impl MoveToken {
    /// Parses and normalizes a token, rejecting anything outside the grammar.
    #[instrument]
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let normalized = raw.trim().to_ascii_lowercase();
        if Self::is_grammatical(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(TokenError::new(raw))
        }
    }

    /// Returns `true` if `candidate` matches the grammar (case-insensitive).
    pub fn is_grammatical(candidate: &str) -> bool {
        let bytes = candidate.as_bytes();
        if bytes.len() != 4 && bytes.len() != 5 {
            return false;
        }
        let file = |b: u8| matches!(b.to_ascii_lowercase(), b'a'..=b'h');
        let rank = |b: u8| matches!(b, b'1'..=b'8');
        let squares = file(bytes[0]) && rank(bytes[1]) && file(bytes[2]) && rank(bytes[3]);
        let promotion = bytes
            .get(4)
            .is_none_or(|b| matches!(b.to_ascii_lowercase(), b'q' | b'r' | b'b' | b'n'));
        squares && promotion
    }

    /// The token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MoveToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MoveToken {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MoveToken> for String {
    fn from(token: MoveToken) -> Self {
        token.0
    }
}

impl AsRef<str> for MoveToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A string that does not match the move-token grammar.
#[derive(Debug, Clone, Display, Error)]
#[display("Malformed move token {:?} at {}:{}", input, file, line)]
pub struct TokenError {
    /// The rejected input.
    pub input: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl TokenError {
    /// Creates a new token error with caller location tracking.
    #[track_caller]
    pub fn new(input: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            input: input.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        let token = MoveToken::parse(" E7E8Q ").unwrap();
        assert_eq!(token.as_str(), "e7e8q");
    }

    #[test]
    fn test_rejects_out_of_grammar() {
        for bad in ["e2e9", "i2e4", "e2e4k", "e2", "e2-e4", "", "e2e4qq"] {
            assert!(MoveToken::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_serde_validates() {
        let ok: MoveToken = serde_json::from_str("\"G1F3\"").unwrap();
        assert_eq!(ok.as_str(), "g1f3");
        assert!(serde_json::from_str::<MoveToken>("\"castle\"").is_err());
    }
}
