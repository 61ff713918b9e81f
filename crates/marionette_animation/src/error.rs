//! Animation error types

use thiserror::Error;

/// Errors raised while composing an animation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// A property path already holds keyframes of another value type
    #[error("Property {path} is animated as {existing}, cannot add {requested} keyframes")]
    PropertyTypeMismatch {
        path: String,
        existing: &'static str,
        requested: &'static str,
    },
}

/// Errors raised while merging an edited blueprint into a live animation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlueprintError {
    /// An edited payload carries a different value type than the live series
    #[error("Keyframe type mismatch for {series}: expected {expected}, found {found}")]
    KeyframeTypeMismatch {
        series: String,
        expected: &'static str,
        found: &'static str,
    },

    /// An edited payload has no keyframes
    #[error("Keyframe series {0} cannot be empty")]
    EmptyKeyframeSeries(String),

    /// The edit changes something other than enable flags or keyframe payloads
    #[error("Structural edit rejected: {0}")]
    StructuralEdit(String),
}

/// Errors raised while decoding a token
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("Token {token} does not start with {expected_prefix}-")]
    IncorrectPrefix {
        token: String,
        expected_prefix: &'static str,
    },

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Result type for animation composition
pub type Result<T> = std::result::Result<T, AnimationError>;
