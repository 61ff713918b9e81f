//! Marionette Stage
//!
//! The boundary between live animations and remote editing tools. Applications register
//! animations by name; connected tools receive a blueprint of each one and send back
//! edited blueprints, which are merged into the live animation.
//!
//! The crate does not own a socket. Anything that can deliver bytes implements
//! [`Transceiver`], and incoming payloads are handed to [`StageManager::handle_payload`].
//! [`frame`] provides the length-prefixed framing used over byte streams.

pub mod config;
pub mod error;
pub mod frame;
pub mod manager;
pub mod message;

pub use config::StageConfig;
pub use error::{Result, StageError};
pub use frame::{read_frame, write_frame, FramedTransceiver, Transceiver};
pub use manager::{ManagedAnimation, StageManager};
pub use message::{ClientMessage, ServerMessage};
