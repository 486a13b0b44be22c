//! Deterministic host for tests and headless tooling.
//!
//! `HeadlessHost` owns a manual clock and a FIFO queue of frame callbacks.
//! `step(dt)` advances the clock by `dt` milliseconds and fires exactly the
//! callbacks that were queued before the step began; callbacks scheduled
//! while a frame is running land in the next frame, matching how a real
//! display loop batches requests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::host::{FrameCallback, FrameToken, Host, InteractionHandle};
use crate::interaction::InteractionRegistry;

/// Manual-clock, manual-frame `Host` implementation.
pub struct HeadlessHost {
    clock_ms: Cell<f64>,
    next_token: Cell<u64>,
    queue: RefCell<VecDeque<(FrameToken, FrameCallback)>>,
    interactions: InteractionRegistry,
}

impl HeadlessHost {
    /// Create a host with the clock at zero.
    pub fn new() -> Rc<Self> {
        Self::with_start_time(0.0)
    }

    /// Create a host with the clock at `start_ms`.
    pub fn with_start_time(start_ms: f64) -> Rc<Self> {
        Rc::new(Self {
            clock_ms: Cell::new(start_ms),
            next_token: Cell::new(0),
            queue: RefCell::new(VecDeque::new()),
            interactions: InteractionRegistry::new(),
        })
    }

    /// Number of frame callbacks waiting for the next step.
    pub fn pending_frames(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Advance the clock by `dt_ms` and run one frame.
    ///
    /// Returns the number of callbacks fired. Callbacks scheduled during the
    /// frame are deferred to the next `step` call.
    pub fn step(&self, dt_ms: f64) -> usize {
        self.clock_ms.set(self.clock_ms.get() + dt_ms);
        let now = self.clock_ms.get();

        let batch: Vec<(FrameToken, FrameCallback)> =
            self.queue.borrow_mut().drain(..).collect();
        let fired = batch.len();
        log::debug!("headless frame at {now}ms, {fired} callbacks");
        for (_, callback) in batch {
            callback(now);
        }
        fired
    }

    /// Step repeatedly until no callbacks remain or `max_frames` is hit.
    ///
    /// Returns the number of frames run.
    pub fn run_until_idle(&self, dt_ms: f64, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.pending_frames() > 0 {
            self.step(dt_ms);
            frames += 1;
        }
        frames
    }

    /// Registry tracking in-flight animations.
    pub fn interactions(&self) -> &InteractionRegistry {
        &self.interactions
    }
}

impl Host for HeadlessHost {
    fn request_frame(&self, callback: FrameCallback) -> FrameToken {
        let token = FrameToken(self.next_token.get());
        self.next_token.set(token.0 + 1);
        self.queue.borrow_mut().push_back((token, callback));
        token
    }

    fn cancel_frame(&self, token: FrameToken) {
        self.queue.borrow_mut().retain(|(t, _)| *t != token);
    }

    fn now(&self) -> f64 {
        self.clock_ms.get()
    }

    fn create_interaction(&self) -> InteractionHandle {
        self.interactions.acquire()
    }

    fn clear_interaction(&self, handle: InteractionHandle) {
        self.interactions.release(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_advances_clock() {
        let host = HeadlessHost::new();
        assert_eq!(host.now(), 0.0);
        host.step(16.0);
        host.step(16.0);
        assert_eq!(host.now(), 32.0);
    }

    #[test]
    fn test_callbacks_fire_with_frame_time() {
        let host = HeadlessHost::new();
        let seen = Rc::new(Cell::new(0.0));

        let seen2 = seen.clone();
        host.request_frame(Box::new(move |now| seen2.set(now)));
        host.step(16.0);
        assert_eq!(seen.get(), 16.0);
    }

    #[test]
    fn test_reschedule_lands_in_next_frame() {
        let host = HeadlessHost::new();
        let count = Rc::new(Cell::new(0u32));

        let host2 = host.clone();
        let count2 = count.clone();
        host.request_frame(Box::new(move |_| {
            count2.set(count2.get() + 1);
            let count3 = count2.clone();
            host2.request_frame(Box::new(move |_| count3.set(count3.get() + 1)));
        }));

        assert_eq!(host.step(16.0), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(host.pending_frames(), 1);
        assert_eq!(host.step(16.0), 1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_cancel_frame() {
        let host = HeadlessHost::new();
        let fired = Rc::new(Cell::new(false));

        let fired2 = fired.clone();
        let token = host.request_frame(Box::new(move |_| fired2.set(true)));
        host.cancel_frame(token);
        host.step(16.0);
        assert!(!fired.get());
    }

    #[test]
    fn test_run_until_idle_respects_cap() {
        let host = HeadlessHost::new();

        fn forever(host: &Rc<HeadlessHost>) {
            let host2 = host.clone();
            host.request_frame(Box::new(move |_| forever(&host2)));
        }
        forever(&host);

        assert_eq!(host.run_until_idle(16.0, 10), 10);
        assert_eq!(host.pending_frames(), 1);
    }
}
