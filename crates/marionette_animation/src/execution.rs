//! Execution-block scheduling
//!
//! Blocks and keyframes are declared in the timeline of the node that owns them. Playback
//! moves along the root's uncurved timeline, so both are flattened once per instance:
//! each timestamp is lifted through the owning node's curve (inverted, which may yield
//! several raw values), then through the child window that places the node in its
//! parent, and so on up to the root.

use crate::animation::{Animation, ElementBlock};
use crate::curve::Curve;
use smallvec::{smallvec, SmallVec};

const LIFT_TOLERANCE: f64 = 1e-9;

/// Direction of travel along the root timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    fn between(from: f64, to: f64) -> Option<Direction> {
        if to > from {
            Some(Direction::Forward)
        } else if to < from {
            Some(Direction::Reverse)
        } else {
            None
        }
    }
}

/// The last rendered position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Frame {
    pub(crate) timestamp: f64,
    pub(crate) direction: Option<Direction>,
}

/// Blocks to run before rendering a move, with the frame the move ends on.
pub(crate) struct Crossing<E> {
    pub(crate) blocks: Vec<ElementBlock<E>>,
    pub(crate) frame: Frame,
}

struct ScheduledBlock<E> {
    timestamp: f64,
    on_forward: ElementBlock<E>,
    on_reverse: ElementBlock<E>,
}

/// Where a node sits: its curve, and its window in the parent's curved timeline.
#[derive(Clone, Copy)]
struct Window<'a> {
    curve: &'a Curve,
    start: f64,
    duration: f64,
}

pub(crate) struct ExecutionSchedule<E> {
    // Sorted by timestamp; ties keep tree order.
    blocks: Vec<ScheduledBlock<E>>,
    keyframes: Vec<f64>,
}

impl<E: 'static> ExecutionSchedule<E> {
    pub(crate) fn build(animation: &Animation<E>) -> Self {
        let mut schedule = Self {
            blocks: Vec::new(),
            keyframes: Vec::new(),
        };
        let mut chain = vec![Window {
            curve: &animation.curve,
            start: 0.0,
            duration: 1.0,
        }];
        schedule.collect(animation, &mut chain);

        schedule
            .blocks
            .sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        schedule.keyframes.sort_by(f64::total_cmp);
        schedule
            .keyframes
            .dedup_by(|a, b| (*a - *b).abs() <= LIFT_TOLERANCE);
        schedule
    }

    fn collect<'a>(&mut self, node: &'a Animation<E>, chain: &mut Vec<Window<'a>>) {
        for block in node.execution_blocks.iter().filter(|block| block.enabled) {
            for timestamp in lift(chain, block.timestamp) {
                self.blocks.push(ScheduledBlock {
                    timestamp,
                    on_forward: block.on_forward.clone(),
                    on_reverse: block.on_reverse.clone(),
                });
            }
        }

        for entry in node.series.values().filter(|entry| entry.series.is_enabled()) {
            for timestamp in entry.series.timestamps() {
                self.keyframes.extend(lift(chain, timestamp));
            }
        }

        for child in node.children.iter().filter(|child| child.enabled) {
            chain.push(Window {
                curve: &child.animation.curve,
                start: child.relative_start,
                duration: child.relative_duration,
            });
            self.collect(&child.animation, chain);
            chain.pop();
        }
    }

    pub(crate) fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Flattened keyframe timestamps, ascending.
    pub(crate) fn keyframes(&self) -> &[f64] {
        &self.keyframes
    }

    /// Blocks crossed moving from `previous` to `to`, in firing order.
    ///
    /// The end of the move is inclusive. Its start is exclusive, except on the first
    /// render (which starts at 0 inclusive) and when the direction of travel reversed.
    pub(crate) fn crossing(&self, previous: Option<Frame>, to: f64) -> Crossing<E> {
        let (from, inclusive, direction) = match previous {
            None => (0.0, true, Some(Direction::Forward)),
            Some(frame) => {
                let direction = Direction::between(frame.timestamp, to);
                let reversed = frame.direction.is_some()
                    && direction.is_some()
                    && frame.direction != direction;
                (frame.timestamp, reversed, direction.or(frame.direction))
            }
        };

        let mut blocks = Vec::new();
        if previous.is_none() || from != to {
            let (low, high) = if from <= to { (from, to) } else { (to, from) };
            let contains = |t: f64| t >= low && t <= high && (inclusive || t != from);
            match direction {
                Some(Direction::Reverse) => blocks.extend(
                    self.blocks
                        .iter()
                        .rev()
                        .filter(|block| contains(block.timestamp))
                        .map(|block| block.on_reverse.clone()),
                ),
                _ => blocks.extend(
                    self.blocks
                        .iter()
                        .filter(|block| contains(block.timestamp))
                        .map(|block| block.on_forward.clone()),
                ),
            }
        }

        Crossing {
            blocks,
            frame: Frame {
                timestamp: to,
                direction,
            },
        }
    }

    /// Keyframe timestamps strictly between `from` and `to`, in travel order.
    pub(crate) fn keyframes_between(&self, from: f64, to: f64) -> Vec<f64> {
        let (low, high) = if from <= to { (from, to) } else { (to, from) };
        let skipped = self.keyframes.iter().copied().filter(|t| *t > low && *t < high);
        if from <= to {
            skipped.collect()
        } else {
            skipped.rev().collect()
        }
    }
}

/// Map a timestamp in the innermost node's curved timeline onto the root's uncurved one.
fn lift(chain: &[Window<'_>], timestamp: f64) -> SmallVec<[f64; 4]> {
    let mut values: SmallVec<[f64; 4]> = smallvec![timestamp];
    for window in chain.iter().rev() {
        let mut lifted: SmallVec<[f64; 4]> = SmallVec::new();
        for value in values {
            for raw in window.curve.raw_progress(value) {
                if raw < -LIFT_TOLERANCE || raw > 1.0 + LIFT_TOLERANCE {
                    continue;
                }
                let mapped = window.start + window.duration * raw.clamp(0.0, 1.0);
                if !lifted.iter().any(|t| (t - mapped).abs() <= LIFT_TOLERANCE) {
                    lifted.push(mapped);
                }
            }
        }
        values = lifted;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{AnimationCurve, RawProgress};
    use marionette_core::Lens;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Track {
        log: Vec<String>,
        level: f64,
    }

    fn logging(animation: &mut Animation<Track>, timestamp: f64) {
        animation.add_execution(
            timestamp,
            move |t: &mut Track| t.log.push(format!("+{timestamp}")),
            move |t: &mut Track| t.log.push(format!("-{timestamp}")),
        );
    }

    fn fire(
        schedule: &ExecutionSchedule<Track>,
        track: &mut Track,
        previous: Option<Frame>,
        to: f64,
    ) -> Frame {
        let crossing = schedule.crossing(previous, to);
        for block in crossing.blocks {
            block(track);
        }
        crossing.frame
    }

    /// Rises to 1 at the midpoint and falls back.
    struct Tent;

    impl AnimationCurve for Tent {
        fn adjusted_progress(&self, progress: f64) -> f64 {
            1.0 - (2.0 * progress - 1.0).abs()
        }

        fn raw_progress(&self, adjusted_progress: f64) -> RawProgress {
            smallvec![adjusted_progress / 2.0, 1.0 - adjusted_progress / 2.0]
        }
    }

    #[test]
    fn test_scrub_fires_each_crossing_once() {
        let mut animation = Animation::<Track>::new();
        for timestamp in [0.25, 0.5, 0.75] {
            logging(&mut animation, timestamp);
        }
        let schedule = ExecutionSchedule::build(&animation);
        let mut track = Track::default();

        let frame = fire(&schedule, &mut track, None, 0.0);
        let frame = fire(&schedule, &mut track, Some(frame), 0.6);
        fire(&schedule, &mut track, Some(frame), 0.3);
        assert_eq!(track.log, vec!["+0.25", "+0.5", "-0.5"]);
    }

    #[test]
    fn test_stopping_on_a_threshold() {
        let mut animation = Animation::<Track>::new();
        logging(&mut animation, 0.5);
        let schedule = ExecutionSchedule::build(&animation);
        let mut track = Track::default();

        let frame = fire(&schedule, &mut track, None, 0.5);
        let frame = fire(&schedule, &mut track, Some(frame), 0.5);
        let frame = fire(&schedule, &mut track, Some(frame), 0.8);
        // Reversing from the far side crosses it again; reversing on it re-fires it.
        let frame = fire(&schedule, &mut track, Some(frame), 0.5);
        fire(&schedule, &mut track, Some(frame), 0.7);
        assert_eq!(track.log, vec!["+0.5", "-0.5", "+0.5"]);
    }

    #[test]
    fn test_first_render_includes_zero() {
        let mut animation = Animation::<Track>::new();
        logging(&mut animation, 0.0);
        let schedule = ExecutionSchedule::build(&animation);
        let mut track = Track::default();

        let frame = fire(&schedule, &mut track, None, 0.0);
        fire(&schedule, &mut track, Some(frame), 0.4);
        assert_eq!(track.log, vec!["+0"]);
    }

    #[test]
    fn test_blocks_are_lifted_through_curves_and_windows() {
        let mut child = Animation::<Track>::new();
        logging(&mut child, 0.5);

        let mut parent = Animation::<Track>::new();
        parent.curve = Curve::ParabolicEaseIn;
        parent.add_child(child, &Lens::identity(), 0.0, 0.5);

        // 0.5 in the child is 0.25 of the parent's curved timeline, reached at t = 0.5.
        let schedule = ExecutionSchedule::build(&parent);
        assert_eq!(schedule.blocks.len(), 1);
        assert!((schedule.blocks[0].timestamp - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_non_monotonic_curves_schedule_every_crossing() {
        let level = Lens::new("level", |t: &Track| &t.level, |t: &mut Track| &mut t.level);
        let mut animation = Animation::<Track>::new();
        animation.curve = Curve::custom(Tent);
        logging(&mut animation, 0.5);
        animation.add_keyframe(&level, 0.5, 1.0);

        let schedule = ExecutionSchedule::build(&animation);
        assert_eq!(schedule.block_count(), 2);
        assert_eq!(schedule.keyframes(), &[0.25, 0.75]);

        let mut track = Track::default();
        let frame = fire(&schedule, &mut track, None, 0.0);
        fire(&schedule, &mut track, Some(frame), 1.0);
        assert_eq!(track.log, vec!["+0.5", "+0.5"]);
    }

    #[test]
    fn test_keyframes_between_follow_travel_order() {
        let level = Lens::new("level", |t: &Track| &t.level, |t: &mut Track| &mut t.level);
        let mut animation = Animation::<Track>::new();
        for timestamp in [0.0, 0.2, 0.4, 1.0] {
            animation.add_keyframe(&level, timestamp, timestamp);
        }
        let schedule = ExecutionSchedule::build(&animation);

        assert_eq!(schedule.keyframes_between(0.0, 1.0), vec![0.2, 0.4]);
        assert_eq!(schedule.keyframes_between(0.9, 0.2), vec![0.4]);
        assert!(schedule.keyframes_between(0.4, 0.4).is_empty());
    }

    #[test]
    fn test_disabled_blocks_never_fire() {
        let fired = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&fired);
        let mut animation = Animation::<Track>::new();
        let token = animation.add_execution(0.5, move |_| *sink.borrow_mut() += 1, |_| {});
        animation.set_execution_enabled(token, false);

        let schedule = ExecutionSchedule::build(&animation);
        let mut track = Track::default();
        fire(&schedule, &mut track, None, 1.0);
        assert_eq!(*fired.borrow(), 0);
    }
}
