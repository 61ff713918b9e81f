//! Frame clocks
//!
//! A frame clock is the host's vsync-style callback source. Playback registers a callback
//! for every automatic segment and invalidates it synchronously when the segment ends, is
//! interrupted, or is canceled.

use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use tracing::trace;

new_key_type! {
    /// Handle to a registered frame callback
    pub struct FrameToken;
}

/// Callback invoked once per frame with the frame's timestamp in seconds.
pub type FrameCallback = Box<dyn FnMut(f64)>;

/// Source of frame callbacks.
///
/// Implementations must tolerate callbacks that register or invalidate other callbacks,
/// including their own registration, while a frame is being dispatched.
pub trait FrameClock {
    /// Current time in seconds.
    fn now(&self) -> f64;

    fn register(&self, callback: FrameCallback) -> FrameToken;

    /// Stop delivering frames to `token`. Invalidating an unknown token is a no-op.
    fn invalidate(&self, token: FrameToken);
}

/// A clock that only advances when told to.
///
/// Used by hosts that own their own frame loop and by tests.
#[derive(Default)]
pub struct ManualFrameClock {
    now: Cell<f64>,
    // A slot is `None` while its callback is running.
    callbacks: RefCell<SlotMap<FrameToken, Option<FrameCallback>>>,
}

impl ManualFrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a frame at `now` to every registered callback.
    ///
    /// Callbacks registered during the frame first run on the next one.
    pub fn tick(&self, now: f64) {
        self.now.set(now);
        let tokens: Vec<FrameToken> = self.callbacks.borrow().keys().collect();
        trace!("frame at {now:.4}s for {} callbacks", tokens.len());

        for token in tokens {
            let callback = match self.callbacks.borrow_mut().get_mut(token) {
                Some(slot) => slot.take(),
                None => continue,
            };
            let Some(mut callback) = callback else {
                continue;
            };

            callback(now);

            // Only restore callbacks that were not invalidated while running.
            if let Some(slot) = self.callbacks.borrow_mut().get_mut(token) {
                *slot = Some(callback);
            }
        }
    }

    /// Advance the clock by `dt` seconds and deliver a frame.
    pub fn advance(&self, dt: f64) {
        self.tick(self.now.get() + dt);
    }

    /// Number of live registrations.
    pub fn registered_count(&self) -> usize {
        self.callbacks.borrow().len()
    }
}

impl FrameClock for ManualFrameClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn register(&self, callback: FrameCallback) -> FrameToken {
        self.callbacks.borrow_mut().insert(Some(callback))
    }

    fn invalidate(&self, token: FrameToken) {
        self.callbacks.borrow_mut().remove(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_tick_runs_registered_callbacks() {
        let clock = ManualFrameClock::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        clock.register(Box::new(move |now| sink.borrow_mut().push(now)));

        clock.tick(0.5);
        clock.advance(0.25);
        assert_eq!(*seen.borrow(), vec![0.5, 0.75]);
        assert_eq!(clock.now(), 0.75);
    }

    #[test]
    fn test_invalidate_stops_delivery() {
        let clock = ManualFrameClock::new();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let token = clock.register(Box::new(move |_| counter.set(counter.get() + 1)));

        clock.tick(1.0);
        clock.invalidate(token);
        clock.tick(2.0);
        assert_eq!(count.get(), 1);
        assert_eq!(clock.registered_count(), 0);

        // Unknown tokens are ignored.
        clock.invalidate(token);
    }

    #[test]
    fn test_callback_can_invalidate_itself_and_register_others() {
        let clock = Rc::new(ManualFrameClock::new());
        let token_cell: Rc<Cell<Option<FrameToken>>> = Rc::new(Cell::new(None));
        let follow_up_runs = Rc::new(Cell::new(0));

        let weak_clock = Rc::downgrade(&clock);
        let own_token = Rc::clone(&token_cell);
        let runs = Rc::clone(&follow_up_runs);
        let token = clock.register(Box::new(move |_| {
            let Some(clock) = weak_clock.upgrade() else {
                return;
            };
            if let Some(token) = own_token.get() {
                clock.invalidate(token);
            }
            let runs = Rc::clone(&runs);
            clock.register(Box::new(move |_| runs.set(runs.get() + 1)));
        }));
        token_cell.set(Some(token));

        clock.tick(1.0);
        assert_eq!(follow_up_runs.get(), 0);
        assert_eq!(clock.registered_count(), 1);

        clock.tick(2.0);
        assert_eq!(follow_up_runs.get(), 1);
    }
}
