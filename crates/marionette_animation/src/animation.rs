//! Animation composition trees
//!
//! An [`Animation`] is one node of a composition tree. It owns keyframe series for
//! properties of its element, execution blocks that fire when playback crosses a
//! timestamp, per-frame blocks, a curve, and child animations. Each child animates a
//! sub-element and occupies a sub-range of the parent's timeline.
//!
//! ```
//! use marionette_animation::Animation;
//! use marionette_core::Lens;
//!
//! #[derive(Default)]
//! struct Dot { x: f64, alpha: f64 }
//!
//! let x = Lens::new("x", |d: &Dot| &d.x, |d: &mut Dot| &mut d.x);
//! let mut animation = Animation::new();
//! animation.add_keyframe(&x, 0.0, 0.0);
//! animation.add_keyframe(&x, 1.0, 100.0);
//!
//! let mut dot = Dot::default();
//! animation.apply(&mut dot, 0.25);
//! assert_eq!(dot.x, 25.0);
//! ```

use crate::curve::Curve;
use crate::error::{AnimationError, Result};
use crate::keyframe::KeyframeValue;
use crate::render::Snapshot;
use crate::series::{AnimatedSeries, PropertySeries, Rerooted};
use crate::token::{AnimationToken, ChildToken, ExecutionToken, SeriesToken};
use indexmap::IndexMap;
use marionette_core::{AnimatableProperty, Lens, PropertyPath};
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::rc::Rc;
use tracing::warn;

/// How many times an animation plays, and whether alternate passes run backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatStyle {
    /// Number of passes; 0 repeats forever.
    pub count: u32,
    pub autoreverses: bool,
}

impl RepeatStyle {
    /// A single forward pass.
    pub const NONE: RepeatStyle = RepeatStyle {
        count: 1,
        autoreverses: false,
    };

    pub const fn repeating(count: u32, autoreverses: bool) -> Self {
        Self {
            count,
            autoreverses,
        }
    }

    pub const fn infinitely(autoreverses: bool) -> Self {
        Self::repeating(0, autoreverses)
    }

    pub fn is_infinite(&self) -> bool {
        self.count == 0
    }
}

impl Default for RepeatStyle {
    fn default() -> Self {
        Self::NONE
    }
}

/// Progress handed to per-frame blocks, in the timeline of the node that owns them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameProgress {
    /// Progress before the node's curve is applied.
    pub uncurved: f64,
    /// Progress after the node's curve is applied.
    pub progress: f64,
}

pub(crate) type ElementBlock<E> = Rc<dyn Fn(&mut E)>;
pub(crate) type FrameBlock<E> = Rc<dyn Fn(&mut E, FrameProgress)>;

pub(crate) struct SeriesEntry<E: 'static> {
    pub(crate) token: SeriesToken,
    pub(crate) series: Box<dyn AnimatedSeries<E>>,
}

impl<E: 'static> Clone for SeriesEntry<E> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            series: self.series.clone_box(),
        }
    }
}

pub(crate) struct ExecutionBlock<E> {
    pub(crate) token: ExecutionToken,
    pub(crate) timestamp: f64,
    pub(crate) on_forward: ElementBlock<E>,
    pub(crate) on_reverse: ElementBlock<E>,
    pub(crate) enabled: bool,
}

impl<E> Clone for ExecutionBlock<E> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            timestamp: self.timestamp,
            on_forward: Rc::clone(&self.on_forward),
            on_reverse: Rc::clone(&self.on_reverse),
            enabled: self.enabled,
        }
    }
}

/// A child animation placed within its parent's timeline
pub struct ChildAnimation<E: 'static> {
    pub(crate) token: ChildToken,
    pub(crate) subelement: PropertyPath,
    pub(crate) animation: Animation<E>,
    pub(crate) relative_start: f64,
    pub(crate) relative_duration: f64,
    pub(crate) enabled: bool,
}

impl<E: 'static> ChildAnimation<E> {
    pub fn token(&self) -> ChildToken {
        self.token
    }

    /// Path of the sub-element the child animates.
    pub fn subelement(&self) -> &PropertyPath {
        &self.subelement
    }

    /// The child, with every path resolved from the parent's element.
    pub fn animation(&self) -> &Animation<E> {
        &self.animation
    }

    pub fn relative_start(&self) -> f64 {
        self.relative_start
    }

    pub fn relative_duration(&self) -> f64 {
        self.relative_duration
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the child spans the parent's whole timeline.
    pub fn covers_parent(&self) -> bool {
        self.relative_start == 0.0 && self.relative_duration == 1.0
    }

    /// Map the parent's curved progress into the child's timeline.
    pub(crate) fn local_progress(&self, parent_progress: f64) -> f64 {
        if self.relative_duration <= 0.0 {
            return if parent_progress < self.relative_start {
                0.0
            } else {
                1.0
            };
        }
        ((parent_progress - self.relative_start) / self.relative_duration).clamp(0.0, 1.0)
    }
}

impl<E: 'static> Clone for ChildAnimation<E> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            subelement: self.subelement.clone(),
            animation: self.animation.clone(),
            relative_start: self.relative_start,
            relative_duration: self.relative_duration,
            enabled: self.enabled,
        }
    }
}

/// A node of an animation composition tree
pub struct Animation<E: 'static> {
    /// Duration in seconds used when playback does not specify one.
    pub implicit_duration: f64,
    pub implicit_repeat_style: RepeatStyle,
    pub curve: Curve,
    pub(crate) token: AnimationToken,
    pub(crate) series: IndexMap<PropertyPath, SeriesEntry<E>>,
    pub(crate) execution_blocks: Vec<ExecutionBlock<E>>,
    pub(crate) per_frame_blocks: Vec<FrameBlock<E>>,
    pub(crate) children: Vec<ChildAnimation<E>>,
}

impl<E: 'static> Animation<E> {
    pub fn new() -> Self {
        Self {
            implicit_duration: 1.0,
            implicit_repeat_style: RepeatStyle::NONE,
            curve: Curve::Linear,
            token: AnimationToken::new(),
            series: IndexMap::new(),
            execution_blocks: Vec::new(),
            per_frame_blocks: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn token(&self) -> AnimationToken {
        self.token
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Keyframes
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a literal keyframe. A keyframe at an existing timestamp replaces it.
    ///
    /// Keyframes for a path that already animates a different value type are dropped
    /// with a warning; use [`Animation::try_add_keyframe`] to observe the error.
    pub fn add_keyframe<V: AnimatableProperty>(
        &mut self,
        property: &Lens<E, V>,
        timestamp: f64,
        value: V,
    ) {
        let value = KeyframeValue::Literal(value);
        if let Err(error) = self.try_add_keyframe(property, timestamp, value) {
            warn!("Ignoring keyframe: {error}");
        }
    }

    /// Add a keyframe computed from the property's value before the animation starts.
    pub fn add_relative_keyframe<V, F>(
        &mut self,
        property: &Lens<E, V>,
        timestamp: f64,
        resolve: F,
    ) where
        V: AnimatableProperty,
        F: Fn(&V) -> V + 'static,
    {
        let value = KeyframeValue::relative(resolve);
        if let Err(error) = self.try_add_keyframe(property, timestamp, value) {
            warn!("Ignoring keyframe: {error}");
        }
    }

    pub fn try_add_keyframe<V: AnimatableProperty>(
        &mut self,
        property: &Lens<E, V>,
        timestamp: f64,
        value: KeyframeValue<V>,
    ) -> Result<()> {
        debug_assert!(
            (0.0..=1.0).contains(&timestamp),
            "keyframe timestamp {timestamp} outside [0, 1]"
        );

        let path = property.path().clone();
        match self.series.get_mut(&path) {
            Some(entry) => {
                let existing = entry.series.value_type_name();
                let series = (entry.series.value_type() == TypeId::of::<V>())
                    .then(|| entry.series.as_any_mut().downcast_mut::<PropertySeries<E, V>>())
                    .flatten()
                    .ok_or_else(|| AnimationError::PropertyTypeMismatch {
                        path: path.to_string(),
                        existing,
                        requested: std::any::type_name::<V>(),
                    })?;
                series.series.insert(timestamp, value);
            }
            None => {
                let series = PropertySeries::new(property.clone(), timestamp, value);
                self.series.insert(
                    path,
                    SeriesEntry {
                        token: SeriesToken::new(),
                        series: Box::new(series),
                    },
                );
            }
        }
        Ok(())
    }

    /// Enable or disable the series for `path`. Returns false if there is none.
    pub fn set_keyframe_series_enabled(&mut self, path: &PropertyPath, enabled: bool) -> bool {
        match self.series.get_mut(path) {
            Some(entry) => {
                entry.series.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Paths with a series directly on this node.
    pub fn keyframe_paths(&self) -> impl Iterator<Item = &PropertyPath> {
        self.series.keys()
    }

    pub fn has_keyframes(&self, path: &PropertyPath) -> bool {
        self.series.contains_key(path)
    }

    /// Keyframe timestamps of the series for `path` on this node.
    pub fn keyframe_timestamps(&self, path: &PropertyPath) -> Option<Vec<f64>> {
        self.series
            .get(path)
            .map(|entry| entry.series.timestamps().into_vec())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Execution blocks
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `on_forward` when playback crosses `timestamp` moving forwards, and
    /// `on_reverse` when it crosses moving backwards.
    pub fn add_execution<F, R>(
        &mut self,
        timestamp: f64,
        on_forward: F,
        on_reverse: R,
    ) -> ExecutionToken
    where
        F: Fn(&mut E) + 'static,
        R: Fn(&mut E) + 'static,
    {
        debug_assert!(
            (0.0..=1.0).contains(&timestamp),
            "execution timestamp {timestamp} outside [0, 1]"
        );
        let token = ExecutionToken::new();
        self.execution_blocks.push(ExecutionBlock {
            token,
            timestamp,
            on_forward: Rc::new(on_forward),
            on_reverse: Rc::new(on_reverse),
            enabled: true,
        });
        token
    }

    pub fn set_execution_enabled(&mut self, token: ExecutionToken, enabled: bool) -> bool {
        match self.execution_blocks.iter_mut().find(|block| block.token == token) {
            Some(block) => {
                block.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn execution_block_count(&self) -> usize {
        self.execution_blocks.len()
    }

    /// Run `block` after every rendered frame of an interactive or timed playback.
    ///
    /// The block sees this node's own progress, not the root's. `uncurved` is the position
    /// in this node's timeline, which for a child is already mapped through its start and
    /// duration and every ancestor's curve. `progress` is `uncurved` after this node's curve.
    pub fn add_per_frame_execution(&mut self, block: impl Fn(&mut E, FrameProgress) + 'static) {
        self.per_frame_blocks.push(Rc::new(block));
    }

    pub fn per_frame_block_count(&self) -> usize {
        self.per_frame_blocks.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Children
    // ─────────────────────────────────────────────────────────────────────────

    /// Play `child` on the sub-element addressed by `subelement`, mapping its timeline
    /// onto `[relative_start, relative_start + relative_duration]` of this node's.
    pub fn add_child<S: 'static>(
        &mut self,
        child: Animation<S>,
        subelement: &Lens<E, S>,
        relative_start: f64,
        relative_duration: f64,
    ) -> ChildToken {
        debug_assert!(
            relative_start >= 0.0
                && relative_duration >= 0.0
                && relative_start + relative_duration <= 1.0 + 1e-9,
            "child range [{relative_start}, {}] outside [0, 1]",
            relative_start + relative_duration
        );
        let token = ChildToken::new();
        self.children.push(ChildAnimation {
            token,
            subelement: subelement.path().clone(),
            animation: child.rerooted(subelement),
            relative_start,
            relative_duration,
            enabled: true,
        });
        token
    }

    pub fn set_child_enabled(&mut self, token: ChildToken, enabled: bool) -> bool {
        match self.children.iter_mut().find(|child| child.token == token) {
            Some(child) => {
                child.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn children(&self) -> &[ChildAnimation<E>] {
        &self.children
    }

    /// Whether this node has nothing to render or run.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
            && self.execution_blocks.is_empty()
            && self.per_frame_blocks.is_empty()
            && self.children.is_empty()
    }

    /// Re-address this animation from a parent element type.
    fn rerooted<P: 'static>(self, subelement: &Lens<P, E>) -> Animation<P> {
        let series = self
            .series
            .into_values()
            .map(|entry| {
                let series: Box<dyn AnimatedSeries<P>> =
                    Box::new(Rerooted::new(subelement.clone(), entry.series));
                let path = series.path().clone();
                (
                    path,
                    SeriesEntry {
                        token: entry.token,
                        series,
                    },
                )
            })
            .collect();

        let execution_blocks = self
            .execution_blocks
            .into_iter()
            .map(|block| ExecutionBlock {
                token: block.token,
                timestamp: block.timestamp,
                on_forward: reroot_block(subelement, block.on_forward),
                on_reverse: reroot_block(subelement, block.on_reverse),
                enabled: block.enabled,
            })
            .collect();

        let per_frame_blocks = self
            .per_frame_blocks
            .into_iter()
            .map(|block| {
                let lens = subelement.clone();
                let rerooted: FrameBlock<P> = Rc::new(move |element: &mut P, progress| {
                    block(lens.get_mut(element), progress)
                });
                rerooted
            })
            .collect();

        let children = self
            .children
            .into_iter()
            .map(|child| ChildAnimation {
                token: child.token,
                subelement: subelement.path().join(&child.subelement),
                animation: child.animation.rerooted(subelement),
                relative_start: child.relative_start,
                relative_duration: child.relative_duration,
                enabled: child.enabled,
            })
            .collect();

        Animation {
            implicit_duration: self.implicit_duration,
            implicit_repeat_style: self.implicit_repeat_style,
            curve: self.curve,
            token: self.token,
            series,
            execution_blocks,
            per_frame_blocks,
            children,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // One-shot application
    // ─────────────────────────────────────────────────────────────────────────

    /// Write the optimized animation's property values at `timestamp` onto `element`,
    /// resolving relative keyframes against the element's current values.
    ///
    /// The tree is only copied and optimized when it has a color series with a single
    /// absent endpoint. Otherwise it renders in place. Relative keyframes are resolved
    /// against a fresh capture on every call.
    ///
    /// Execution blocks and per-frame blocks do not run.
    pub fn apply(&self, element: &mut E, timestamp: f64) {
        if self.needs_optimization() {
            let optimized = self.optimized();
            optimized.apply_in_place(element, timestamp);
        } else {
            self.apply_in_place(element, timestamp);
        }
    }

    fn apply_in_place(&self, element: &mut E, timestamp: f64) {
        let snapshot = Snapshot::capture(self, element);
        crate::render::render_frame(self, &snapshot, element, timestamp, false);
    }
}

fn reroot_block<P: 'static, E: 'static>(
    subelement: &Lens<P, E>,
    block: ElementBlock<E>,
) -> ElementBlock<P> {
    let lens = subelement.clone();
    Rc::new(move |element: &mut P| block(lens.get_mut(element)))
}

impl<E: 'static> Default for Animation<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> Clone for Animation<E> {
    fn clone(&self) -> Self {
        Self {
            implicit_duration: self.implicit_duration,
            implicit_repeat_style: self.implicit_repeat_style,
            curve: self.curve.clone(),
            token: self.token,
            series: self.series.clone(),
            execution_blocks: self.execution_blocks.clone(),
            per_frame_blocks: self.per_frame_blocks.clone(),
            children: self.children.clone(),
        }
    }
}

impl<E: 'static> std::fmt::Debug for Animation<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animation")
            .field("token", &self.token)
            .field("curve", &self.curve)
            .field("keyframes", &self.series.keys().collect::<Vec<_>>())
            .field("execution_blocks", &self.execution_blocks.len())
            .field("children", &self.children.len())
            .finish()
    }
}
