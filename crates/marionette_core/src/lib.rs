//! Marionette Core
//!
//! Foundational types shared by the animation engine and the stage tooling.
//!
//! # Features
//!
//! - **Animatable values**: the [`AnimatableProperty`] contract and its built-in impls
//! - **Property lenses**: bound accessors that address a property, or a composite path
//!   through sub-elements, from a root element type
//! - **3D transforms**: decomposition, spherical interpolation, and recomposition
//! - **Frame clocks**: the vsync-style callback source that drives playback

pub mod clock;
pub mod property;
pub mod transform;
pub mod value;

pub use clock::{FrameCallback, FrameClock, FrameToken, ManualFrameClock};
pub use property::{Lens, PropertyPath};
pub use transform::{DecomposedTransform, Quaternion, Transform3D};
pub use value::{AnimatableProperty, Color, KeyframeSample, KeyframeSequence, Point};
