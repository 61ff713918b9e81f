//! Wire messages exchanged with editing tools
//!
//! Both directions are externally tagged JSON objects with a single key naming the
//! message, e.g. `{"updateAnimation": {...}}`.

use marionette_animation::{AnimationBlueprint, AnimationToken};
use serde::{Deserialize, Serialize};

/// Sent from the stage to a connected tool
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    /// Announces a managed animation and its current shape
    RegisterAnimation {
        name: String,
        blueprint: AnimationBlueprint,
    },
    /// A managed animation was unregistered
    UnregisterAnimation { id: AnimationToken },
}

/// Sent from a tool to the stage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// An edited blueprint to merge into the live animation with the same id
    UpdateAnimation(AnimationBlueprint),
}
