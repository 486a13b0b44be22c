//! Composition operators over the animation start/stop contract.
//!
//! Operators wrap pluggable `Animation` handles and express ordering and
//! concurrency policy without knowing what their members are; a member can
//! be a single driver, another composed animation, or a no-op. Internal
//! state (current index, done count, per-member ended flags) is private to
//! the handle an operator returns and resets on restart.
//!
//! Completion discipline matches the drivers': each composed handle fires
//! its overall completion callback exactly once per start, with
//! `finished: false` propagated from the first failing member.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::drivers::{TimingConfig, timing};
use crate::types::{EndCallback, EndResult, HostHandle};
use crate::value::Value;

/// Start/stop contract shared by drivers and composed animations.
pub trait Animation {
    /// Begin the animation. `on_end` fires exactly once: `finished: true`
    /// on natural completion, `finished: false` on `stop`.
    fn start(&self, on_end: Option<EndCallback>);

    /// Stop the animation, firing its completion callback with
    /// `finished: false` before returning.
    fn stop(&self);
}

/// Shared animation handle.
pub type Anim = Rc<dyn Animation>;

/// Configuration for `parallel`.
#[derive(Debug, Clone, Copy)]
pub struct ParallelConfig {
    /// Stop every other member as soon as one ends unfinished.
    ///
    /// Turn this off when members must not be interrupted by each other's
    /// cancellation, e.g. independent tracking animations per axis.
    pub stop_together: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            stop_together: true,
        }
    }
}

struct Sequence {
    members: Vec<Anim>,
    current: Cell<usize>,
}

impl Sequence {
    fn run(self: &Rc<Self>, on_end: Rc<RefCell<Option<EndCallback>>>) {
        let index = self.current.get();
        let member = self.members[index].clone();
        let this = self.clone();
        member.start(Some(Box::new(move |result| {
            if !result.finished {
                if let Some(mut on_end) = on_end.borrow_mut().take() {
                    on_end(result);
                }
                return;
            }
            let next = this.current.get() + 1;
            this.current.set(next);
            if next == this.members.len() {
                if let Some(mut on_end) = on_end.borrow_mut().take() {
                    on_end(result);
                }
                return;
            }
            this.run(on_end.clone());
        })));
    }
}

struct SequenceHandle {
    inner: Rc<Sequence>,
}

impl Animation for SequenceHandle {
    fn start(&self, on_end: Option<EndCallback>) {
        self.inner.current.set(0);
        if self.inner.members.is_empty() {
            if let Some(mut on_end) = on_end {
                on_end(EndResult::FINISHED);
            }
            return;
        }
        self.inner.run(Rc::new(RefCell::new(on_end)));
    }

    fn stop(&self) {
        if let Some(member) = self.inner.members.get(self.inner.current.get()) {
            member.stop();
        }
    }
}

/// Run `members` one after another.
///
/// Each member starts when its predecessor finishes; the first member to
/// end unfinished aborts the rest and propagates its result. `stop` stops
/// only the currently active member.
pub fn sequence(members: Vec<Anim>) -> Anim {
    Rc::new(SequenceHandle {
        inner: Rc::new(Sequence {
            members,
            current: Cell::new(0),
        }),
    })
}

struct Parallel {
    members: Vec<Option<Anim>>,
    config: ParallelConfig,
    ended: RefCell<Vec<bool>>,
    done_count: Cell<usize>,
    on_end: RefCell<Option<EndCallback>>,
}

impl Parallel {
    fn member_ended(self: &Rc<Self>, index: usize, result: EndResult) {
        {
            let mut ended = self.ended.borrow_mut();
            if ended[index] {
                return;
            }
            ended[index] = true;
        }
        self.done_count.set(self.done_count.get() + 1);

        if self.done_count.get() == self.members.len() {
            if let Some(mut on_end) = self.on_end.borrow_mut().take() {
                on_end(result);
            }
            return;
        }

        if !result.finished && self.config.stop_together {
            self.stop_members();
        }
    }

    fn stop_members(self: &Rc<Self>) {
        for index in 0..self.members.len() {
            let already_ended = self.ended.borrow()[index];
            if !already_ended
                && let Some(member) = &self.members[index]
            {
                // Fires the member's end callback synchronously, which
                // marks it ended through member_ended.
                member.stop();
            }
            self.ended.borrow_mut()[index] = true;
        }
    }
}

struct ParallelHandle {
    inner: Rc<Parallel>,
}

impl Animation for ParallelHandle {
    fn start(&self, on_end: Option<EndCallback>) {
        let inner = &self.inner;
        *inner.ended.borrow_mut() = vec![false; inner.members.len()];
        inner.done_count.set(0);
        *inner.on_end.borrow_mut() = on_end;

        if inner.members.is_empty() {
            if let Some(mut on_end) = inner.on_end.borrow_mut().take() {
                on_end(EndResult::FINISHED);
            }
            return;
        }

        for index in 0..inner.members.len() {
            let member = inner.members[index].clone();
            match member {
                // An absent member is an already-finished no-op.
                None => inner.member_ended(index, EndResult::FINISHED),
                Some(member) => {
                    let this = inner.clone();
                    member.start(Some(Box::new(move |result| {
                        this.member_ended(index, result);
                    })));
                }
            }
        }
    }

    fn stop(&self) {
        self.inner.stop_members();
    }
}

/// Run `members` simultaneously.
///
/// Completion fires once, after every member has ended; per-member ended
/// flags guard against double counting. With `stop_together` (the default),
/// the first member to end unfinished stops all the others.
pub fn parallel(members: Vec<Option<Anim>>, config: ParallelConfig) -> Anim {
    Rc::new(ParallelHandle {
        inner: Rc::new(Parallel {
            ended: RefCell::new(vec![false; members.len()]),
            done_count: Cell::new(0),
            on_end: RefCell::new(None),
            members,
            config,
        }),
    })
}

/// Pure scheduling pause: a zero-duration timing on a throwaway value,
/// started after `delay_ms`.
pub fn delay(host: &HostHandle, delay_ms: f64) -> Anim {
    timing(
        host,
        &Value::new(0.0),
        TimingConfig::to(0.0).with_duration(0.0).with_delay(delay_ms),
    )
}

/// Run `members` in parallel, offsetting member `i`'s start by
/// `i * stagger_ms`.
pub fn stagger(host: &HostHandle, stagger_ms: f64, members: Vec<Anim>) -> Anim {
    let staggered = members
        .into_iter()
        .enumerate()
        .map(|(index, member)| {
            Some(sequence(vec![
                delay(host, stagger_ms * index as f64),
                member,
            ]))
        })
        .collect();
    parallel(staggered, ParallelConfig::default())
}
