//! The leaf value node.
//!
//! `Value` is the only node external code mutates directly. It holds a base
//! scalar plus an additive offset; the effective value read by the rest of
//! the graph is `value + offset`. Drivers write the base value, offsets are
//! the domain of gesture code (set an offset at grab, flatten it at release).
//!
//! A value owns at most one running driver. Starting a new animation stops
//! the old driver synchronously (its completion callback fires with
//! `finished: false`) before the replacement is installed, and a direct
//! `set_value` cancels whatever is running. Listeners observe every
//! effective-value change after propagation has run.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::drivers::{ActiveDriver, DriverSpec};
use crate::interpolation::{Interpolation, InterpolationConfig};
use crate::node::{AnimNode, ChildSet, NodeKey, flush};
use crate::tracking::Tracking;
use crate::types::{EndCallback, HostHandle, ListenerId};

/// A mutable scalar leaf in the animation graph.
///
/// Handles are cheap to clone and share one underlying state.
#[derive(Clone)]
pub struct Value {
    inner: Rc<RefCell<ValueState>>,
}

pub(crate) struct ValueState {
    value: f64,
    offset: f64,
    children: ChildSet,
    listeners: BTreeMap<u64, Rc<dyn Fn(f64)>>,
    next_listener_id: u64,
    driver: Option<ActiveDriver>,
    tracking: Option<Tracking>,
}

/// Weak handle used for downstream edges and driver back-references.
#[derive(Clone)]
pub(crate) struct WeakValue(Weak<RefCell<ValueState>>);

impl WeakValue {
    pub(crate) fn upgrade(&self) -> Option<Value> {
        self.0.upgrade().map(|inner| Value { inner })
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(self.0.as_ptr() as *const () as usize)
    }
}

impl Value {
    /// Create a value starting at `initial` with no offset.
    pub fn new(initial: f64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ValueState {
                value: initial,
                offset: 0.0,
                children: ChildSet::default(),
                listeners: BTreeMap::new(),
                next_listener_id: 0,
                driver: None,
                tracking: None,
            })),
        }
    }

    /// Effective value: base plus offset.
    pub fn get_value(&self) -> f64 {
        let state = self.inner.borrow();
        state.value + state.offset
    }

    /// Base value without the offset applied.
    pub fn raw_value(&self) -> f64 {
        self.inner.borrow().value
    }

    /// Current offset.
    pub fn offset(&self) -> f64 {
        self.inner.borrow().offset
    }

    /// Set the base value directly, cancelling any running driver.
    ///
    /// The driver's completion callback fires with `finished: false` before
    /// the new value propagates.
    pub fn set_value(&self, value: f64) {
        let driver = self.inner.borrow_mut().driver.take();
        if let Some(driver) = driver {
            driver.stop();
        }
        self.update_value(value);
    }

    /// Replace the offset. The new effective value propagates downstream.
    pub fn set_offset(&self, offset: f64) {
        self.inner.borrow_mut().offset = offset;
        flush(&AnimNode::from(self));
    }

    /// Fold the offset into the base value, leaving the effective value
    /// unchanged and the offset at zero.
    pub fn flatten_offset(&self) {
        let mut state = self.inner.borrow_mut();
        state.value += state.offset;
        state.offset = 0.0;
    }

    /// Move the base value into the offset, leaving the effective value
    /// unchanged and the base at zero.
    pub fn extract_offset(&self) {
        let mut state = self.inner.borrow_mut();
        state.offset += state.value;
        state.value = 0.0;
    }

    /// Register a listener observing every effective-value change.
    pub fn add_listener(&self, listener: impl Fn(f64) + 'static) -> ListenerId {
        let mut state = self.inner.borrow_mut();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.insert(id, Rc::new(listener));
        ListenerId(id)
    }

    /// Remove a listener. Removing an unknown id warns and does nothing.
    pub fn remove_listener(&self, id: ListenerId) {
        if self.inner.borrow_mut().listeners.remove(&id.0).is_none() {
            warn!("removed unknown value listener {:?}", id);
        }
    }

    /// Drop every registered listener.
    pub fn remove_all_listeners(&self) {
        self.inner.borrow_mut().listeners.clear();
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Stop any running driver and tracking binding.
    ///
    /// The driver's completion callback fires with `finished: false` before
    /// this returns. Returns the effective value at the stopping point.
    pub fn stop_animation(&self) -> f64 {
        self.stop_tracking();
        let driver = self.inner.borrow_mut().driver.take();
        if let Some(driver) = driver {
            driver.stop();
        }
        self.get_value()
    }

    /// True while a driver is advancing this value.
    pub fn is_animating(&self) -> bool {
        self.inner.borrow().driver.is_some()
    }

    /// Continuously re-target a driver at this value whenever `source`
    /// changes.
    ///
    /// Each upstream change starts a fresh driver from `spec` aimed at the
    /// source's current value, replacing the previous cycle's driver. The
    /// binding lives until `stop_animation` or a replacement `track`.
    pub fn track(&self, host: &HostHandle, source: impl Into<AnimNode>, spec: DriverSpec) {
        let tracking = Tracking::new(host.clone(), self, source.into(), spec, None);
        self.install_tracking(tracking);
    }

    /// Install a tracking binding, replacing any existing one.
    pub(crate) fn install_tracking(&self, tracking: Tracking) {
        self.stop_tracking();
        tracking.install();
        self.inner.borrow_mut().tracking = Some(tracking);
    }

    /// Tear down the tracking binding, if any.
    pub(crate) fn stop_tracking(&self) {
        let tracking = self.inner.borrow_mut().tracking.take();
        if let Some(tracking) = tracking {
            tracking.teardown();
        }
    }

    /// Derive a node mapping this value through a piecewise range.
    pub fn interpolate(
        &self,
        config: InterpolationConfig,
    ) -> crate::error::Result<Interpolation> {
        Interpolation::new(self, config)
    }

    /// Start a driver on this value, displacing the current one.
    ///
    /// The outgoing driver is stopped synchronously (its own callback fires
    /// `finished: false`) and its kinematic state is offered to the new
    /// driver for inheritance. `spec` must carry a fixed destination;
    /// tracked destinations are routed through `install_tracking` by the
    /// driver helpers.
    pub(crate) fn animate(&self, host: &HostHandle, spec: DriverSpec, on_end: Option<EndCallback>) {
        let previous = self.inner.borrow_mut().driver.take();
        let handoff = previous.as_ref().and_then(|d| d.handoff());
        if let Some(previous) = previous {
            previous.stop();
        }

        let driver = ActiveDriver::new(host.clone(), self, &spec, handoff, on_end);
        self.inner.borrow_mut().driver = Some(driver.clone());
        driver.begin(self);
    }

    /// Driver-side write: update the base value and propagate, without
    /// cancelling the driver doing the writing.
    pub(crate) fn update_from_driver(&self, value: f64) {
        self.update_value(value);
    }

    /// Clear the driver slot if it still holds the driver identified by
    /// `key` (it may already hold a replacement).
    pub(crate) fn clear_driver_if(&self, key: usize) {
        let mut state = self.inner.borrow_mut();
        if state.driver.as_ref().map(|d| d.ptr_key()) == Some(key) {
            state.driver = None;
        }
    }

    fn update_value(&self, value: f64) {
        self.inner.borrow_mut().value = value;
        flush(&AnimNode::from(self));

        let (effective, listeners): (f64, Vec<Rc<dyn Fn(f64)>>) = {
            let state = self.inner.borrow();
            (
                state.value + state.offset,
                state.listeners.values().cloned().collect(),
            )
        };
        for listener in listeners {
            listener(effective);
        }
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    pub(crate) fn downgrade(&self) -> WeakValue {
        WeakValue(Rc::downgrade(&self.inner))
    }

    pub(crate) fn with_children<R>(&self, f: impl FnOnce(&mut ChildSet) -> R) -> R {
        f(&mut self.inner.borrow_mut().children)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Value")
            .field("value", &state.value)
            .field("offset", &state.offset)
            .field("animating", &state.driver.is_some())
            .finish()
    }
}

// The graph is single-threaded by design; a Value handle must never cross
// threads.
static_assertions::assert_not_impl_any!(Value: Send, Sync);
