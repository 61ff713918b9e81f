//! Marionette Animation Engine
//!
//! Curves, keyframe composition trees, tree optimization, and frame-driven playback.
//!
//! # Features
//!
//! - **Curves**: parabolic, sinusoidal, cubic Bézier, and spring timing curves, each
//!   invertible so execution blocks can be placed on the root timeline
//! - **Composition**: animations nest, each child animating a sub-element within a window
//!   of its parent's timeline
//! - **Optimization**: curve elevation, obsolete keyframe removal, and absent-color
//!   endpoint synthesis, run once per playback
//! - **Interactive playback**: scrub with `set_progress` or animate towards a target on a
//!   frame clock, with direction-aware execution blocks
//! - **Blueprints**: serializable descriptions that accept enable-flag and keyframe edits

pub mod animation;
pub mod blueprint;
pub mod curve;
mod driver;
pub mod error;
mod execution;
pub mod instance;
pub mod keyframe;
mod optimize;
mod render;
pub mod scheduler;
mod series;
pub mod spring;
pub mod token;

pub use animation::{Animation, ChildAnimation, FrameProgress, RepeatStyle};
pub use blueprint::{
    AnimationBlueprint, ChildBlueprint, CurveDescriptor, ExecutionBlueprint, ManagedSeriesBlueprint,
    UnmanagedSeriesBlueprint,
};
pub use curve::{AnimationCurve, CubicBezier, Curve, RawProgress};
pub use error::{AnimationError, BlueprintError, Result, TokenError};
pub use instance::{
    AnimationInstance, AnimationStatus, CancelBehavior, InteractiveAnimationInstance,
};
pub use keyframe::{Keyframe, KeyframeSeries, KeyframeValue};
pub use scheduler::{AnimationScheduler, InstanceId, PerformOptions};
pub use spring::SpringCurve;
pub use token::{AnimationToken, ChildToken, ExecutionToken, SeriesToken, Token};
