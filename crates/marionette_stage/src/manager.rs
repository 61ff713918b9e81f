//! Registry of managed animations and dispatch of tool traffic

use crate::config::StageConfig;
use crate::error::{Result, StageError};
use crate::frame::Transceiver;
use crate::message::{ClientMessage, ServerMessage};
use indexmap::IndexMap;
use marionette_animation::{Animation, AnimationBlueprint, AnimationToken};
use rustc_hash::FxBuildHasher;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// A live animation the stage can describe and edit
pub trait ManagedAnimation {
    /// Current blueprint, or `None` while the animation is mutably borrowed.
    fn blueprint(&self) -> Option<AnimationBlueprint>;

    /// Merge an edited blueprint into the live animation.
    fn merge(&self, blueprint: &AnimationBlueprint) -> Result<()>;
}

impl<E: 'static> ManagedAnimation for Rc<RefCell<Animation<E>>> {
    fn blueprint(&self) -> Option<AnimationBlueprint> {
        self.try_borrow().ok().map(|animation| animation.blueprint())
    }

    fn merge(&self, blueprint: &AnimationBlueprint) -> Result<()> {
        let mut animation = self
            .try_borrow_mut()
            .map_err(|_| StageError::AnimationBusy(blueprint.id))?;
        animation.merge_blueprint(blueprint)?;
        Ok(())
    }
}

struct Registration {
    name: String,
    animation: Box<dyn ManagedAnimation>,
}

/// Registry of named animations exposed to editing tools.
///
/// Edits change the registered animation itself. Playbacks already in flight keep the
/// tree they started with; the next playback picks up the edit.
pub struct StageManager {
    config: StageConfig,
    animations: IndexMap<AnimationToken, Registration, FxBuildHasher>,
    transceivers: Vec<Box<dyn Transceiver>>,
}

impl StageManager {
    pub fn new(config: StageConfig) -> Self {
        debug!(
            "Stage {} configured on port {} (edits {})",
            config.service_name,
            config.port,
            if config.accept_edits { "accepted" } else { "ignored" }
        );
        Self {
            config,
            animations: IndexMap::default(),
            transceivers: Vec::new(),
        }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Register an animation under `name` and announce it to connected tools.
    ///
    /// Returns the shared handle the application plays from; edits land in it.
    pub fn register_animation<E: 'static>(
        &mut self,
        name: impl Into<String>,
        animation: Animation<E>,
    ) -> Rc<RefCell<Animation<E>>> {
        let name = name.into();
        let id = animation.token();
        let message = ServerMessage::RegisterAnimation {
            name: name.clone(),
            blueprint: animation.blueprint(),
        };
        let shared = Rc::new(RefCell::new(animation));

        debug!("Registered animation {name} as {id}");
        self.animations.insert(
            id,
            Registration {
                name,
                animation: Box::new(shared.clone()),
            },
        );
        self.broadcast(&message);
        shared
    }

    /// Remove an animation from the stage. Returns whether it was registered.
    pub fn unregister_animation(&mut self, id: AnimationToken) -> bool {
        let Some(registration) = self.animations.shift_remove(&id) else {
            return false;
        };
        debug!("Unregistered animation {} ({id})", registration.name);
        self.broadcast(&ServerMessage::UnregisterAnimation { id });
        true
    }

    /// Attach a tool, sending it every registered animation.
    ///
    /// Animations that are mutably borrowed are skipped with a warning. Every announcement
    /// is encoded before anything is sent, so an error means either nothing was sent or the
    /// peer is gone. Either way the connection is not kept.
    pub fn connect(&mut self, mut transceiver: Box<dyn Transceiver>) -> Result<()> {
        let mut payloads = Vec::with_capacity(self.animations.len());
        for (id, registration) in &self.animations {
            let Some(blueprint) = registration.animation.blueprint() else {
                warn!("Not announcing busy animation {id} to new tool");
                continue;
            };
            payloads.push(self.encode(&ServerMessage::RegisterAnimation {
                name: registration.name.clone(),
                blueprint,
            })?);
        }

        for payload in &payloads {
            if let Err(error) = transceiver.send(payload) {
                warn!("Dropping stage connection during announcement: {error}");
                return Err(error.into());
            }
        }
        self.transceivers.push(transceiver);
        debug!(
            "Tool connected ({} of {} animations announced, {} connections)",
            payloads.len(),
            self.animations.len(),
            self.transceivers.len()
        );
        Ok(())
    }

    /// Decode and apply one payload received from a tool.
    ///
    /// Returns the id of the animation the message addressed.
    pub fn handle_payload(&mut self, payload: &[u8]) -> Result<AnimationToken> {
        let result = self.dispatch(payload);
        if let Err(error) = &result {
            warn!("Failed to handle stage payload: {error}");
        }
        result
    }

    fn dispatch(&mut self, payload: &[u8]) -> Result<AnimationToken> {
        if payload.len() > self.config.max_payload_bytes {
            return Err(StageError::PayloadTooLarge {
                size: payload.len(),
                limit: self.config.max_payload_bytes,
            });
        }

        let message: ClientMessage = serde_json::from_slice(payload)?;
        match message {
            ClientMessage::UpdateAnimation(blueprint) => {
                self.update_animation(&blueprint)?;
                Ok(blueprint.id)
            }
        }
    }

    /// Merge an edited blueprint into the registered animation with the same id.
    pub fn update_animation(&mut self, blueprint: &AnimationBlueprint) -> Result<()> {
        if !self.config.accept_edits {
            return Err(StageError::EditsDisabled);
        }
        let registration = self
            .animations
            .get(&blueprint.id)
            .ok_or(StageError::UnknownAnimation(blueprint.id))?;
        registration.animation.merge(blueprint)?;
        debug!("Applied edit to {}", registration.name);
        Ok(())
    }

    /// Current blueprint of a registered animation.
    pub fn blueprint(&self, id: AnimationToken) -> Option<AnimationBlueprint> {
        self.animations
            .get(&id)
            .and_then(|registration| registration.animation.blueprint())
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.animations
            .values()
            .map(|registration| registration.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn connection_count(&self) -> usize {
        self.transceivers.len()
    }

    /// Encode a message per the configured JSON style.
    pub fn encode(&self, message: &ServerMessage) -> Result<Vec<u8>> {
        let payload = if self.config.pretty_json {
            serde_json::to_vec_pretty(message)?
        } else {
            serde_json::to_vec(message)?
        };
        Ok(payload)
    }

    /// Send to every connected tool, dropping connections that fail.
    fn broadcast(&mut self, message: &ServerMessage) {
        if self.transceivers.is_empty() {
            return;
        }
        let payload = match self.encode(message) {
            Ok(payload) => payload,
            Err(error) => {
                warn!("Failed to encode stage message: {error}");
                return;
            }
        };
        self.transceivers.retain_mut(|transceiver| match transceiver.send(&payload) {
            Ok(()) => true,
            Err(error) => {
                warn!("Dropping stage connection: {error}");
                false
            }
        });
    }
}

impl Default for StageManager {
    fn default() -> Self {
        Self::new(StageConfig::default())
    }
}
