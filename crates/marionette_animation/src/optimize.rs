//! Behavior-preserving tree rewrites
//!
//! Playback optimizes a copy of the animation once, when an instance is created. The
//! passes run in order:
//!
//! 1. Disabled series, execution blocks, and children are dropped.
//! 2. Obsolete keyframe removal drops descendant series whose path a node animates
//!    directly. A node's own series are always applied after its descendants', so those
//!    descendant values are never observed. Children left empty are dropped.
//! 3. Curve elevation hoists a curve shared by every full-span child onto a linear parent,
//!    so it is evaluated once instead of at every level. It runs after removal, which can
//!    leave only children that agree on a curve, and repeats until nothing moves, since a
//!    hoist can leave a child linear with grandchildren that share a curve.
//! 4. Absent-endpoint synthesis turns a series that fades from or to "no color" into a
//!    fade from or to the transparent version of the other endpoint.
//!
//! Running [`Animation::optimized`] on an already optimized tree changes nothing.

use crate::animation::Animation;
use crate::curve::Curve;
use marionette_core::PropertyPath;
use rustc_hash::FxHashSet;
use tracing::debug;

#[derive(Debug, Default)]
struct OptimizationReport {
    elevated: usize,
    removed_series: usize,
    dropped_children: usize,
    synthesized: usize,
}

impl<E: 'static> Animation<E> {
    /// A copy of this animation with every optimization pass applied.
    pub fn optimized(&self) -> Animation<E> {
        let mut animation = self.clone();
        let mut report = OptimizationReport::default();

        animation.prune_disabled();
        animation.remove_obsolete_keyframes(&FxHashSet::default(), &mut report);
        // Each hoist moves a curve one level up, so this terminates.
        while animation.elevate_curves(&mut report) {}
        animation.synthesize_absent_endpoints(&mut report);

        debug!(
            "Optimized animation {}: {} curves elevated, {} series removed, \
             {} children dropped, {} endpoints synthesized",
            animation.token,
            report.elevated,
            report.removed_series,
            report.dropped_children,
            report.synthesized
        );
        animation
    }

    fn prune_disabled(&mut self) {
        self.series.retain(|_, entry| entry.series.is_enabled());
        self.execution_blocks.retain(|block| block.enabled);
        self.children.retain(|child| child.enabled);
        for child in &mut self.children {
            child.animation.prune_disabled();
        }
    }

    /// Returns whether any curve moved in this subtree.
    fn elevate_curves(&mut self, report: &mut OptimizationReport) -> bool {
        let mut elevated = false;
        for child in &mut self.children {
            elevated |= child.animation.elevate_curves(report);
        }

        let hoistable = self.series.is_empty()
            && self.execution_blocks.is_empty()
            && self.per_frame_blocks.is_empty()
            && self.curve.is_linear()
            && !self.children.is_empty()
            && self.children.iter().all(|child| {
                // Per-frame blocks observe their node's uncurved progress, which elevation
                // would change.
                child.covers_parent() && child.animation.per_frame_blocks.is_empty()
            });
        if !hoistable {
            return elevated;
        }

        let shared = &self.children[0].animation.curve;
        if shared.is_linear()
            || !self
                .children
                .iter()
                .all(|child| &child.animation.curve == shared)
        {
            return elevated;
        }

        self.curve = shared.clone();
        for child in &mut self.children {
            child.animation.curve = Curve::Linear;
        }
        report.elevated += 1;
        true
    }

    /// Returns whether anything was removed from this subtree.
    fn remove_obsolete_keyframes(
        &mut self,
        overridden: &FxHashSet<PropertyPath>,
        report: &mut OptimizationReport,
    ) -> bool {
        let before = self.series.len();
        self.series.retain(|path, _| !overridden.contains(path));
        let mut removed = self.series.len() != before;
        report.removed_series += before - self.series.len();

        if self.children.is_empty() {
            return removed;
        }

        let mut scope = overridden.clone();
        scope.extend(self.series.keys().cloned());

        let mut emptied = Vec::new();
        for (index, child) in self.children.iter_mut().enumerate() {
            if child.animation.remove_obsolete_keyframes(&scope, report) {
                removed = true;
                if child.animation.is_empty() {
                    emptied.push(index);
                }
            }
        }
        for index in emptied.into_iter().rev() {
            self.children.remove(index);
            report.dropped_children += 1;
        }
        removed
    }

    /// Whether rendering this tree differs from rendering its optimized copy. Pruning,
    /// removal and elevation leave rendered values unchanged, so only synthesis counts.
    pub(crate) fn needs_optimization(&self) -> bool {
        self.series
            .values()
            .any(|entry| entry.series.is_enabled() && entry.series.has_absent_endpoint())
            || self
                .children
                .iter()
                .any(|child| child.enabled && child.animation.needs_optimization())
    }

    fn synthesize_absent_endpoints(&mut self, report: &mut OptimizationReport) {
        for entry in self.series.values_mut() {
            if entry.series.synthesize_absent_endpoint() {
                report.synthesized += 1;
            }
        }
        for child in &mut self.children {
            child.animation.synthesize_absent_endpoints(report);
        }
    }
}
