//! Animation scheduler
//!
//! Creates instances and keeps them alive while they play. Every instance is registered in
//! a slot map and removes itself exactly once, when it completes or is canceled.

use crate::animation::{Animation, RepeatStyle};
use crate::driver::{InstanceCore, LiveInstance};
use crate::instance::{AnimationInstance, CancelBehavior, InteractiveAnimationInstance};
use marionette_core::FrameClock;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

new_key_type! {
    pub struct InstanceId;
}

type Registry = RefCell<SlotMap<InstanceId, Rc<dyn LiveInstance>>>;

/// Options for timed playback
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerformOptions {
    /// Seconds per pass; the animation's implicit duration when unset.
    pub duration: Option<f64>,
    /// Seconds to wait before the first pass.
    pub delay: f64,
    /// The animation's implicit repeat style when unset.
    pub repeat_style: Option<RepeatStyle>,
}

impl PerformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn delay(mut self, seconds: f64) -> Self {
        self.delay = seconds;
        self
    }

    pub fn repeat_style(mut self, repeat_style: RepeatStyle) -> Self {
        self.repeat_style = Some(repeat_style);
        self
    }
}

/// Owner of every in-flight instance
pub struct AnimationScheduler {
    clock: Rc<dyn FrameClock>,
    instances: Rc<Registry>,
}

impl AnimationScheduler {
    pub fn new(clock: Rc<dyn FrameClock>) -> Self {
        Self {
            clock,
            instances: Rc::new(RefCell::new(SlotMap::with_key())),
        }
    }

    pub fn clock(&self) -> &Rc<dyn FrameClock> {
        &self.clock
    }

    /// Start an interactive session. Nothing renders until the first `set_progress` or
    /// `animate`.
    ///
    /// `duration` is the end-to-end duration segments take their share of; the
    /// animation's implicit duration applies when unset.
    pub fn perform_interactive<E: 'static>(
        &self,
        animation: &Animation<E>,
        element: &Rc<RefCell<E>>,
        duration: Option<f64>,
    ) -> InteractiveAnimationInstance<E> {
        let core = InstanceCore::new(animation, element, Rc::clone(&self.clock), duration);
        self.register(&core);
        InteractiveAnimationInstance::new(core)
    }

    /// Play the animation from start to end, honoring the repeat style.
    ///
    /// `completion` receives `true` once every pass has played, or when the instance is
    /// canceled with [`CancelBehavior::Complete`].
    pub fn perform<E: 'static>(
        &self,
        animation: &Animation<E>,
        element: &Rc<RefCell<E>>,
        options: PerformOptions,
        completion: impl FnOnce(bool) + 'static,
    ) -> AnimationInstance<E> {
        let core = InstanceCore::new(animation, element, Rc::clone(&self.clock), None);
        self.register(&core);
        core.on_completion(Box::new(completion));

        let repeat_style = options
            .repeat_style
            .unwrap_or(animation.implicit_repeat_style);
        core.perform(options.duration, options.delay, repeat_style);
        AnimationInstance::new(core)
    }

    fn register<E: 'static>(&self, core: &Rc<InstanceCore<E>>) {
        let live: Rc<dyn LiveInstance> = Rc::clone(core) as Rc<dyn LiveInstance>;
        let id = self.instances.borrow_mut().insert(live);
        debug!("Registered instance {id:?}, {} in flight", self.active_count());

        let registry = Rc::downgrade(&self.instances);
        core.set_on_finish(Box::new(move || {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            // Drop the instance after releasing the registry borrow.
            let removed = registry.borrow_mut().remove(id);
            drop(removed);
        }));
    }

    /// Whether any instance is still pending or playing.
    pub fn has_active_animations(&self) -> bool {
        !self.instances.borrow().is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.instances.borrow().len()
    }

    /// Cancel every in-flight instance.
    pub fn cancel_all(&self, behavior: CancelBehavior) {
        let live: Vec<Rc<dyn LiveInstance>> = self.instances.borrow().values().cloned().collect();
        debug!("Canceling {} instances with {behavior:?}", live.len());
        for instance in live {
            if !instance.status().is_terminal() {
                instance.cancel(behavior);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::AnimationStatus;
    use marionette_core::{Lens, ManualFrameClock};
    use std::cell::Cell;

    #[derive(Default)]
    struct Gauge {
        needle: f64,
    }

    fn needle() -> Lens<Gauge, f64> {
        Lens::new("needle", |g: &Gauge| &g.needle, |g: &mut Gauge| &mut g.needle)
    }

    fn sweep() -> Animation<Gauge> {
        let mut animation = Animation::new();
        animation.add_keyframe(&needle(), 0.0, 0.0);
        animation.add_keyframe(&needle(), 1.0, 10.0);
        animation
    }

    #[test]
    fn test_instances_deregister_when_finished() {
        let clock = Rc::new(ManualFrameClock::new());
        let scheduler = AnimationScheduler::new(clock.clone());
        let gauge = Rc::new(RefCell::new(Gauge::default()));

        let first = scheduler.perform_interactive(&sweep(), &gauge, None);
        let second = scheduler.perform_interactive(&sweep(), &gauge, None);
        assert_eq!(scheduler.active_count(), 2);

        first.cancel(CancelBehavior::Halt);
        assert_eq!(scheduler.active_count(), 1);
        second.mark_as_complete();
        assert!(!scheduler.has_active_animations());
    }

    #[test]
    fn test_dropped_handles_keep_playing() {
        let clock = Rc::new(ManualFrameClock::new());
        let scheduler = AnimationScheduler::new(clock.clone());
        let gauge = Rc::new(RefCell::new(Gauge::default()));
        let done = Rc::new(Cell::new(None));
        let sink = Rc::clone(&done);

        drop(scheduler.perform(
            &sweep(),
            &gauge,
            PerformOptions::new().duration(1.0),
            move |finished| sink.set(Some(finished)),
        ));

        clock.tick(0.5);
        assert_eq!(gauge.borrow().needle, 5.0);
        clock.tick(1.0);
        assert_eq!(gauge.borrow().needle, 10.0);
        assert_eq!(done.get(), Some(true));
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(clock.registered_count(), 0);
    }

    #[test]
    fn test_cancel_all() {
        let clock = Rc::new(ManualFrameClock::new());
        let scheduler = AnimationScheduler::new(clock.clone());
        let gauge = Rc::new(RefCell::new(Gauge::default()));

        let instance = scheduler.perform(&sweep(), &gauge, PerformOptions::new(), |_| {});
        clock.tick(0.25);
        scheduler.cancel_all(CancelBehavior::Revert);

        assert_eq!(instance.status(), AnimationStatus::Canceled(CancelBehavior::Revert));
        assert_eq!(gauge.borrow().needle, 0.0);
        assert_eq!(scheduler.active_count(), 0);
    }
}
