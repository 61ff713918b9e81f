//! Stage error types

use marionette_animation::{AnimationToken, BlueprintError};
use thiserror::Error;

/// Errors raised while handling stage traffic
#[derive(Error, Debug)]
pub enum StageError {
    /// An incoming payload exceeds the configured limit
    #[error("Payload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Edits arrived while the stage is configured read-only
    #[error("Edits are disabled for this stage")]
    EditsDisabled,

    /// An edit names an animation that is not registered
    #[error("No registered animation with id {0}")]
    UnknownAnimation(AnimationToken),

    /// The animation is borrowed elsewhere, typically mid-render
    #[error("Animation {0} is in use")]
    AnimationBusy(AnimationToken),

    /// The edit could not be merged
    #[error("Failed to merge edit: {0}")]
    Merge(#[from] BlueprintError),

    /// A message failed to encode or decode
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// A transceiver failed to deliver a payload
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// Result type for stage operations
pub type Result<T> = std::result::Result<T, StageError>;
