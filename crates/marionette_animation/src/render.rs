//! Static application of an animation tree onto an element
//!
//! For an incoming timestamp, every node applies its curve, renders its children in their
//! own timelines, and then writes its own series. Writing a node's series after its
//! children's is what lets a parent override a descendant animating the same path.

use crate::animation::{Animation, FrameProgress};
use std::any::Any;

/// Pre-animation property values, laid out like the animation tree they were captured for.
pub(crate) struct Snapshot {
    series: Vec<Box<dyn Any>>,
    children: Vec<Snapshot>,
}

impl Snapshot {
    pub(crate) fn capture<E: 'static>(animation: &Animation<E>, element: &E) -> Self {
        Self {
            series: animation
                .series
                .values()
                .map(|entry| entry.series.capture(element))
                .collect(),
            children: animation
                .children
                .iter()
                .map(|child| Snapshot::capture(&child.animation, element))
                .collect(),
        }
    }
}

/// Render the tree at uncurved `timestamp`.
pub(crate) fn render_frame<E: 'static>(
    animation: &Animation<E>,
    snapshot: &Snapshot,
    element: &mut E,
    timestamp: f64,
    run_per_frame_blocks: bool,
) {
    let progress = animation.curve.adjusted_progress(timestamp);

    for (child, captured) in animation.children.iter().zip(&snapshot.children) {
        if child.enabled {
            let local = child.local_progress(progress);
            render_frame(&child.animation, captured, element, local, run_per_frame_blocks);
        }
    }

    for (entry, initial) in animation.series.values().zip(&snapshot.series) {
        if entry.series.is_enabled() {
            entry.series.apply(element, progress, &**initial);
        }
    }

    if run_per_frame_blocks {
        let frame = FrameProgress {
            uncurved: timestamp,
            progress,
        };
        for block in &animation.per_frame_blocks {
            block(&mut *element, frame);
        }
    }
}

/// Render each property's keyframe at 0, or its captured value when it has none.
pub(crate) fn render_initial_frame<E: 'static>(
    animation: &Animation<E>,
    snapshot: &Snapshot,
    element: &mut E,
) {
    for (child, captured) in animation.children.iter().zip(&snapshot.children) {
        if child.enabled {
            render_initial_frame(&child.animation, captured, element);
        }
    }

    for (entry, initial) in animation.series.values().zip(&snapshot.series) {
        if entry.series.is_enabled() {
            entry.series.apply_initial(element, &**initial);
        }
    }
}
