//! Playback driver
//!
//! One driver backs every live instance. It runs in one of three modes:
//!
//! - **Manual**: `set_progress` renders synchronously.
//! - **Automatic**: a segment from the last rendered timestamp to a target, advanced by
//!   frame-clock ticks.
//! - **Delayed**: waiting out a timed playback's start delay.
//!
//! No `RefCell` borrow of driver state is held while execution blocks, per-frame blocks,
//! or completions run.

use crate::animation::{Animation, RepeatStyle};
use crate::curve::Curve;
use crate::execution::{ExecutionSchedule, Frame};
use crate::instance::{AnimationStatus, CancelBehavior};
use crate::render::{self, Snapshot};
use marionette_core::{FrameClock, FrameToken};
use std::cell::{OnceCell, RefCell};
use std::mem;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

pub(crate) type Completion = Box<dyn FnOnce(bool)>;

/// Type-erased view of an instance held by the in-flight registry.
pub(crate) trait LiveInstance {
    fn status(&self) -> AnimationStatus;

    fn cancel(self: Rc<Self>, behavior: CancelBehavior);
}

struct Segment {
    token: FrameToken,
    start_time: f64,
    duration: f64,
    curve: Curve,
    from: f64,
    to: f64,
    completion: Option<Completion>,
}

enum Mode {
    Manual,
    Automatic(Segment),
    Delayed(FrameToken),
}

/// Timed playback settings, fixed when playback starts.
#[derive(Clone, Copy, Debug)]
struct Playback {
    duration: f64,
    repeat: RepeatStyle,
}

struct DriverState {
    status: AnimationStatus,
    mode: Mode,
    last_frame: Option<Frame>,
    completions: Vec<Completion>,
    on_finish: Option<Box<dyn FnOnce()>>,
}

impl DriverState {
    /// Stop any segment or delay, returning the segment's pending completion.
    fn take_active(&mut self, clock: &dyn FrameClock) -> Option<Completion> {
        match mem::replace(&mut self.mode, Mode::Manual) {
            Mode::Manual => None,
            Mode::Automatic(segment) => {
                clock.invalidate(segment.token);
                segment.completion
            }
            Mode::Delayed(token) => {
                clock.invalidate(token);
                None
            }
        }
    }
}

pub(crate) struct InstanceCore<E: 'static> {
    element: Weak<RefCell<E>>,
    animation: Animation<E>,
    schedule: ExecutionSchedule<E>,
    // Captured on the first render.
    snapshot: OnceCell<Snapshot>,
    clock: Rc<dyn FrameClock>,
    end_to_end_duration: Option<f64>,
    state: RefCell<DriverState>,
}

impl<E: 'static> InstanceCore<E> {
    pub(crate) fn new(
        animation: &Animation<E>,
        element: &Rc<RefCell<E>>,
        clock: Rc<dyn FrameClock>,
        end_to_end_duration: Option<f64>,
    ) -> Rc<Self> {
        let animation = animation.optimized();
        let schedule = ExecutionSchedule::build(&animation);
        debug!(
            "Created instance of {}: {} execution blocks, {} keyframe stops",
            animation.token,
            schedule.block_count(),
            schedule.keyframes().len()
        );

        Rc::new(Self {
            element: Rc::downgrade(element),
            animation,
            schedule,
            snapshot: OnceCell::new(),
            clock,
            end_to_end_duration,
            state: RefCell::new(DriverState {
                status: AnimationStatus::Pending,
                mode: Mode::Manual,
                last_frame: None,
                completions: Vec::new(),
                on_finish: None,
            }),
        })
    }

    pub(crate) fn status(&self) -> AnimationStatus {
        self.state.borrow().status
    }

    /// Last rendered timestamp, if anything has rendered yet.
    pub(crate) fn progress(&self) -> Option<f64> {
        self.state.borrow().last_frame.map(|frame| frame.timestamp)
    }

    pub(crate) fn set_on_finish(&self, on_finish: Box<dyn FnOnce()>) {
        self.state.borrow_mut().on_finish = Some(on_finish);
    }

    pub(crate) fn on_completion(&self, completion: Completion) {
        let status = self.status();
        if status.is_terminal() {
            completion(status.is_successful());
        } else {
            self.state.borrow_mut().completions.push(completion);
        }
    }

    pub(crate) fn set_progress(self: &Rc<Self>, progress: f64) {
        let interrupted = {
            let mut state = self.state.borrow_mut();
            if state.status.is_terminal() {
                debug!(
                    "Ignoring progress {progress} on finished instance of {}",
                    self.animation.token
                );
                return;
            }
            state.take_active(&*self.clock)
        };

        self.render(progress.clamp(0.0, 1.0));
        if let Some(completion) = interrupted {
            completion(false);
        }
    }

    /// Start an automatic segment from the last rendered timestamp to `to`.
    pub(crate) fn animate(
        self: &Rc<Self>,
        to: f64,
        curve: Curve,
        duration: Option<f64>,
        completion: Completion,
    ) {
        if self.status().is_terminal() {
            completion(false);
            return;
        }

        let interrupted = self.state.borrow_mut().take_active(&*self.clock);
        if let Some(interrupted) = interrupted {
            interrupted(false);
        }
        // The interrupted completion may have finished the instance.
        if self.status().is_terminal() {
            completion(false);
            return;
        }

        let to = to.clamp(0.0, 1.0);
        let from = self.progress().unwrap_or(0.0);
        let distance = (to - from).abs();
        let duration = duration
            .or_else(|| self.end_to_end_duration.map(|total| total * distance))
            .unwrap_or(self.animation.implicit_duration * distance);

        if duration <= 0.0 {
            self.render(to);
            completion(!self.status().is_terminal());
            return;
        }

        let weak = Rc::downgrade(self);
        let token = self.clock.register(Box::new(move |now| {
            if let Some(core) = weak.upgrade() {
                core.tick(now);
            }
        }));

        debug!(
            "Animating {} from {from:.3} to {to:.3} over {duration:.3}s",
            self.animation.token
        );
        let mut state = self.state.borrow_mut();
        state.mode = Mode::Automatic(Segment {
            token,
            start_time: self.clock.now(),
            duration,
            curve,
            from,
            to,
            completion: Some(completion),
        });
        state.status = AnimationStatus::Animating(from);
    }

    /// Freeze an automatic segment at the last rendered timestamp.
    pub(crate) fn pause(self: &Rc<Self>) {
        let interrupted = {
            let mut state = self.state.borrow_mut();
            if !matches!(state.mode, Mode::Automatic(_)) {
                return;
            }
            let interrupted = state.take_active(&*self.clock);
            if let AnimationStatus::Animating(progress) = state.status {
                state.status = AnimationStatus::Interactive(progress);
            }
            interrupted
        };
        if let Some(completion) = interrupted {
            completion(false);
        }
    }

    pub(crate) fn cancel(self: &Rc<Self>, behavior: CancelBehavior) {
        let interrupted = {
            let mut state = self.state.borrow_mut();
            if state.status.is_terminal() {
                return;
            }
            state.take_active(&*self.clock)
        };

        match behavior {
            CancelBehavior::Revert => {
                self.render(0.0);
            }
            CancelBehavior::Complete => {
                self.render(1.0);
            }
            CancelBehavior::Halt => {}
        }
        self.finish(
            AnimationStatus::Canceled(behavior),
            interrupted,
            behavior == CancelBehavior::Complete,
        );
    }

    /// Finish without rendering. Instance completions report success; an active segment
    /// reports that it was interrupted.
    pub(crate) fn mark_as_complete(self: &Rc<Self>) {
        self.finish(AnimationStatus::Complete, None, false);
    }

    /// Start timed playback of every pass, after `delay` seconds.
    pub(crate) fn perform(self: &Rc<Self>, duration: Option<f64>, delay: f64, repeat: RepeatStyle) {
        let playback = Playback {
            duration: duration.unwrap_or(self.animation.implicit_duration),
            repeat,
        };
        if delay <= 0.0 {
            self.play_pass(playback, 0);
            return;
        }

        let until = self.clock.now() + delay;
        let weak = Rc::downgrade(self);
        let token = self.clock.register(Box::new(move |now| {
            if now < until {
                return;
            }
            if let Some(core) = weak.upgrade() {
                core.end_delay(playback);
            }
        }));
        self.state.borrow_mut().mode = Mode::Delayed(token);
    }

    fn end_delay(self: &Rc<Self>, playback: Playback) {
        {
            let mut state = self.state.borrow_mut();
            if !matches!(state.mode, Mode::Delayed(_)) {
                return;
            }
            state.take_active(&*self.clock);
        }
        self.play_pass(playback, 0);
    }

    fn play_pass(self: &Rc<Self>, playback: Playback, pass: u32) {
        let RepeatStyle { count, autoreverses } = playback.repeat;
        let target = if autoreverses && pass % 2 == 1 { 0.0 } else { 1.0 };
        if pass > 0 && !autoreverses {
            // Each pass replays from the initial frame.
            self.state.borrow_mut().last_frame = None;
        }
        trace!("Pass {pass} of {} towards {target}", self.animation.token);

        let weak = Rc::downgrade(self);
        let on_pass_end: Completion = Box::new(move |finished| {
            let Some(core) = weak.upgrade() else {
                return;
            };
            if !finished {
                return;
            }
            let next = pass.saturating_add(1);
            // A zero-length pass cannot repeat without spinning.
            if playback.duration > 0.0 && (count == 0 || next < count) {
                core.play_pass(playback, next);
            } else {
                core.finish(AnimationStatus::Complete, None, false);
            }
        });
        self.animate(target, Curve::Linear, Some(playback.duration), on_pass_end);
    }

    fn tick(self: &Rc<Self>, now: f64) {
        let (token, timestamp, arrived) = {
            let state = self.state.borrow();
            let Mode::Automatic(segment) = &state.mode else {
                return;
            };
            let elapsed = (now - segment.start_time).max(0.0);
            let raw = (elapsed / segment.duration).clamp(0.0, 1.0);
            if raw >= 1.0 {
                (segment.token, segment.to, true)
            } else {
                let progress = segment.curve.adjusted_progress(raw);
                let timestamp =
                    (segment.from + (segment.to - segment.from) * progress).clamp(0.0, 1.0);
                (segment.token, timestamp, false)
            }
        };

        trace!("Tick at {now:.4}s renders {timestamp:.4}");
        if self.render(timestamp) && arrived {
            self.arrive(token);
        }
    }

    /// Hand control back to manual mode at the end of the segment registered as `token`.
    fn arrive(self: &Rc<Self>, token: FrameToken) {
        let completion = {
            let mut state = self.state.borrow_mut();
            if !matches!(&state.mode, Mode::Automatic(segment) if segment.token == token) {
                return;
            }
            let completion = state.take_active(&*self.clock);
            if let AnimationStatus::Animating(progress) = state.status {
                state.status = AnimationStatus::Interactive(progress);
            }
            completion
        };
        if let Some(completion) = completion {
            completion(true);
        }
    }

    /// Render `timestamp`. Returns false once the element is gone.
    fn render(self: &Rc<Self>, timestamp: f64) -> bool {
        let Some(handle) = self.element.upgrade() else {
            debug!("Element of {} was dropped, halting", self.animation.token);
            self.finish(AnimationStatus::Canceled(CancelBehavior::Halt), None, false);
            return false;
        };
        let Ok(mut guard) = handle.try_borrow_mut() else {
            warn!(
                "Element of {} is already borrowed, skipping frame at {timestamp:.4}",
                self.animation.token
            );
            return true;
        };
        let element: &mut E = &mut guard;

        let previous = self.state.borrow().last_frame;
        let snapshot = self
            .snapshot
            .get_or_init(|| Snapshot::capture(&self.animation, &*element));

        let crossing = self.schedule.crossing(previous, timestamp);
        for block in &crossing.blocks {
            block(&mut *element);
        }

        if previous.is_none() {
            render::render_initial_frame(&self.animation, snapshot, element);
        }
        let from = previous.map_or(0.0, |frame| frame.timestamp);
        for skipped in self.schedule.keyframes_between(from, timestamp) {
            render::render_frame(&self.animation, snapshot, element, skipped, false);
        }
        render::render_frame(&self.animation, snapshot, element, timestamp, true);
        drop(guard);

        let mut state = self.state.borrow_mut();
        state.last_frame = Some(crossing.frame);
        if !state.status.is_terminal() {
            state.status = if matches!(state.mode, Mode::Automatic(_)) {
                AnimationStatus::Animating(timestamp)
            } else {
                AnimationStatus::Interactive(timestamp)
            };
        }
        true
    }

    /// Move to a terminal `status` and run every completion once.
    ///
    /// `interrupted` is a segment completion already detached by the caller. It and any
    /// still-active segment receive `segment_finished`.
    fn finish(
        self: &Rc<Self>,
        status: AnimationStatus,
        interrupted: Option<Completion>,
        segment_finished: bool,
    ) {
        let taken = {
            let mut state = self.state.borrow_mut();
            if state.status.is_terminal() {
                None
            } else {
                state.status = status;
                let active = state.take_active(&*self.clock);
                Some((active, mem::take(&mut state.completions), state.on_finish.take()))
            }
        };

        let Some((active, completions, on_finish)) = taken else {
            if let Some(completion) = interrupted {
                completion(false);
            }
            return;
        };

        debug!("Instance of {} finished: {status:?}", self.animation.token);
        if let Some(on_finish) = on_finish {
            on_finish();
        }
        for completion in interrupted.into_iter().chain(active) {
            completion(segment_finished);
        }
        let successful = status.is_successful();
        for completion in completions {
            completion(successful);
        }
    }
}

impl<E: 'static> LiveInstance for InstanceCore<E> {
    fn status(&self) -> AnimationStatus {
        InstanceCore::status(self)
    }

    fn cancel(self: Rc<Self>, behavior: CancelBehavior) {
        InstanceCore::cancel(&self, behavior);
    }
}
