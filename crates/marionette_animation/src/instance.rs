//! Live animation handles
//!
//! [`InteractiveAnimationInstance`] is scrubbed with [`set_progress`] or driven towards a
//! target with [`animate`]. [`AnimationInstance`] is the handle for timed, fire-and-forget
//! playback. Both are cheap to clone and share one driver; dropping every handle does not
//! stop playback, because the scheduler keeps in-flight instances alive until they finish.
//!
//! [`set_progress`]: InteractiveAnimationInstance::set_progress
//! [`animate`]: InteractiveAnimationInstance::animate

use crate::curve::Curve;
use crate::driver::InstanceCore;
use std::rc::Rc;

/// What cancellation does to the element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CancelBehavior {
    /// Render the start of the animation.
    Revert,
    /// Leave the element as last rendered.
    Halt,
    /// Render the end of the animation.
    Complete,
}

/// Lifecycle state of an instance
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnimationStatus {
    /// Nothing has rendered yet.
    Pending,
    /// Under manual control at the given progress.
    Interactive(f64),
    /// Running an automatic segment, last rendered at the given progress.
    Animating(f64),
    Complete,
    Canceled(CancelBehavior),
}

impl AnimationStatus {
    /// Whether the instance is complete or canceled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnimationStatus::Complete | AnimationStatus::Canceled(_))
    }

    /// Whether completion callbacks see `finished = true`.
    pub fn is_successful(&self) -> bool {
        matches!(
            self,
            AnimationStatus::Complete | AnimationStatus::Canceled(CancelBehavior::Complete)
        )
    }

    pub fn progress(&self) -> Option<f64> {
        match self {
            AnimationStatus::Interactive(progress) | AnimationStatus::Animating(progress) => {
                Some(*progress)
            }
            _ => None,
        }
    }
}

/// Handle to an interactive playback session
pub struct InteractiveAnimationInstance<E: 'static> {
    core: Rc<InstanceCore<E>>,
}

impl<E: 'static> InteractiveAnimationInstance<E> {
    pub(crate) fn new(core: Rc<InstanceCore<E>>) -> Self {
        Self { core }
    }

    pub fn status(&self) -> AnimationStatus {
        self.core.status()
    }

    /// Last rendered timestamp.
    pub fn progress(&self) -> Option<f64> {
        self.core.progress()
    }

    /// Render `progress` now, interrupting any automatic segment.
    pub fn set_progress(&self, progress: f64) {
        self.core.set_progress(progress);
    }

    /// Animate from the last rendered timestamp to `to`.
    ///
    /// Without an explicit `duration`, the segment takes its share of the instance's
    /// end-to-end duration, or else of the animation's implicit duration. `completion`
    /// receives `true` when the target is reached and `false` if the segment is
    /// interrupted or the instance ends first.
    pub fn animate(
        &self,
        to: f64,
        curve: impl Into<Curve>,
        duration: Option<f64>,
        completion: impl FnOnce(bool) + 'static,
    ) {
        self.core
            .animate(to, curve.into(), duration, Box::new(completion));
    }

    pub fn animate_to_beginning(&self, completion: impl FnOnce(bool) + 'static) {
        self.animate(0.0, Curve::Linear, None, completion);
    }

    pub fn animate_to_end(&self, completion: impl FnOnce(bool) + 'static) {
        self.animate(1.0, Curve::Linear, None, completion);
    }

    /// Stop an automatic segment where it is.
    pub fn pause(&self) {
        self.core.pause();
    }

    /// Finish in place; instance completions report success.
    pub fn mark_as_complete(&self) {
        self.core.mark_as_complete();
    }

    pub fn cancel(&self, behavior: CancelBehavior) {
        self.core.cancel(behavior);
    }

    /// Call `completion` once the instance completes or is canceled. Runs immediately if
    /// it already has.
    pub fn on_completion(&self, completion: impl FnOnce(bool) + 'static) {
        self.core.on_completion(Box::new(completion));
    }
}

impl<E: 'static> Clone for InteractiveAnimationInstance<E> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

/// Handle to a timed playback
pub struct AnimationInstance<E: 'static> {
    core: Rc<InstanceCore<E>>,
}

impl<E: 'static> AnimationInstance<E> {
    pub(crate) fn new(core: Rc<InstanceCore<E>>) -> Self {
        Self { core }
    }

    pub fn status(&self) -> AnimationStatus {
        self.core.status()
    }

    pub fn cancel(&self, behavior: CancelBehavior) {
        self.core.cancel(behavior);
    }

    pub fn on_completion(&self, completion: impl FnOnce(bool) + 'static) {
        self.core.on_completion(Box::new(completion));
    }
}

impl<E: 'static> Clone for AnimationInstance<E> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}
