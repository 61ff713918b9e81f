//! Stable identifiers
//!
//! Every node, keyframe series, execution block, and child of an animation carries a
//! [`Token`] assigned at creation. Tokens survive cloning and optimization, so an edited
//! blueprint can be matched back onto the live animation entry by entry.

use crate::error::TokenError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// The kind of entry a token identifies, which fixes its textual prefix.
pub trait TokenKind {
    const PREFIX: &'static str;
}

pub enum AnimationKind {}
pub enum SeriesKind {}
pub enum ExecutionKind {}
pub enum ChildKind {}

impl TokenKind for AnimationKind {
    const PREFIX: &'static str = "ANM";
}

impl TokenKind for SeriesKind {
    const PREFIX: &'static str = "KFS";
}

impl TokenKind for ExecutionKind {
    const PREFIX: &'static str = "EXB";
}

impl TokenKind for ChildKind {
    const PREFIX: &'static str = "CHD";
}

pub type AnimationToken = Token<AnimationKind>;
pub type SeriesToken = Token<SeriesKind>;
pub type ExecutionToken = Token<ExecutionKind>;
pub type ChildToken = Token<ChildKind>;

/// Identifier rendered as `<PREFIX>-<hex id>`
pub struct Token<K> {
    id: u64,
    kind: PhantomData<fn() -> K>,
}

impl<K: TokenKind> Token<K> {
    /// Allocate a process-unique token.
    pub fn new() -> Self {
        Self {
            id: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
            kind: PhantomData,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let id = raw
            .strip_prefix(K::PREFIX)
            .and_then(|rest| rest.strip_prefix('-'))
            .ok_or_else(|| TokenError::IncorrectPrefix {
                token: raw.to_string(),
                expected_prefix: K::PREFIX,
            })?;
        let id =
            u64::from_str_radix(id, 16).map_err(|_| TokenError::InvalidToken(raw.to_string()))?;
        Ok(Self {
            id,
            kind: PhantomData,
        })
    }
}

impl<K: TokenKind> Default for Token<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for Token<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Token<K> {}

impl<K> PartialEq for Token<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K> Eq for Token<K> {}

impl<K> Hash for Token<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<K: TokenKind> fmt::Display for Token<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:08x}", K::PREFIX, self.id)
    }
}

impl<K: TokenKind> fmt::Debug for Token<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({self})")
    }
}

impl<K: TokenKind> Serialize for Token<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, K: TokenKind> Deserialize<'de> for Token<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Token::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = SeriesToken::new();
        let b = SeriesToken::new();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_display_and_parse_round_trip() {
        let token = ChildToken::new();
        let text = token.to_string();
        assert!(text.starts_with("CHD-"));
        assert_eq!(ChildToken::parse(&text), Ok(token));
    }

    #[test]
    fn test_parse_rejects_wrong_prefix() {
        let series = SeriesToken::new().to_string();
        assert!(matches!(
            ExecutionToken::parse(&series),
            Err(TokenError::IncorrectPrefix {
                expected_prefix: "EXB",
                ..
            })
        ));
        assert!(matches!(
            ExecutionToken::parse("EXB-not-hex"),
            Err(TokenError::InvalidToken(_))
        ));
    }
}
