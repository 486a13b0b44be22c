//! Tracking: re-target a driver whenever a source node changes.
//!
//! A tracking binding sits in the graph as a recomputable sink downstream
//! of its source. Each time propagation reaches it, it starts a *fresh*
//! driver on the target value, aimed at the source's current scalar; the
//! driver displaced from the target's slot is stopped through the usual
//! exclusive-slot discipline, so kinematic state carries across cycles per
//! the driver's inheritance policy.
//!
//! Used when an animation's destination is itself animated: springing one
//! value toward another that is still in flight.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::drivers::DriverSpec;
use crate::node::{AnimNode, ChildSet, NodeKey};
use crate::types::{EndCallback, HostHandle, PropertyValue};
use crate::value::{Value, WeakValue};

/// Binding that re-targets a driver at `target` on every `source` change.
#[derive(Clone)]
pub struct Tracking {
    inner: Rc<RefCell<TrackingState>>,
}

struct TrackingState {
    host: HostHandle,
    target: WeakValue,
    source: AnimNode,
    spec: DriverSpec,
    on_cycle: Option<Rc<RefCell<EndCallback>>>,
    children: ChildSet,
}

#[derive(Clone)]
pub(crate) struct WeakTracking(Weak<RefCell<TrackingState>>);

impl WeakTracking {
    pub(crate) fn upgrade(&self) -> Option<Tracking> {
        self.0.upgrade().map(|inner| Tracking { inner })
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(self.0.as_ptr() as *const () as usize)
    }
}

impl Tracking {
    /// Build a binding driving `target` toward `source` with `spec`.
    ///
    /// `on_cycle` fires at the end of every tracking cycle with that
    /// cycle's driver result.
    pub(crate) fn new(
        host: HostHandle,
        target: &Value,
        source: AnimNode,
        spec: DriverSpec,
        on_cycle: Option<EndCallback>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TrackingState {
                host,
                target: target.downgrade(),
                source,
                spec,
                on_cycle: on_cycle.map(|cb| Rc::new(RefCell::new(cb))),
                children: ChildSet::default(),
            })),
        }
    }

    /// Register downstream of the source so propagation reaches us.
    pub(crate) fn install(&self) {
        let node = AnimNode::Tracking(self.clone());
        for input in node.inputs() {
            input.add_child(&node);
        }
    }

    /// Deregister from the source.
    pub(crate) fn teardown(&self) {
        let node = AnimNode::Tracking(self.clone());
        for input in node.inputs() {
            input.remove_child(&node);
        }
    }

    /// One tracking cycle: start a fresh driver at the source's current
    /// value, replacing the previous cycle's driver.
    pub(crate) fn refresh(&self) {
        let (host, target, source, spec, on_cycle) = {
            let state = self.inner.borrow();
            (
                state.host.clone(),
                state.target.clone(),
                state.source.clone(),
                state.spec.clone(),
                state.on_cycle.clone(),
            )
        };
        let Some(target) = target.upgrade() else {
            return;
        };
        let Some(to) = source.scalar() else {
            return;
        };

        let on_end: Option<EndCallback> = on_cycle.map(|cb| {
            Box::new(move |result| {
                let mut callback = cb.borrow_mut();
                (*callback)(result);
            }) as EndCallback
        });
        target.animate(&host, spec.with_fixed_to(to), on_end);
    }

    pub(crate) fn current(&self) -> PropertyValue {
        self.inner.borrow().source.current()
    }

    pub(crate) fn scalar(&self) -> Option<f64> {
        self.inner.borrow().source.scalar()
    }

    pub(crate) fn inputs(&self) -> Vec<AnimNode> {
        vec![self.inner.borrow().source.clone()]
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    pub(crate) fn downgrade(&self) -> WeakTracking {
        WeakTracking(Rc::downgrade(&self.inner))
    }

    pub(crate) fn with_children<R>(&self, f: impl FnOnce(&mut ChildSet) -> R) -> R {
        f(&mut self.inner.borrow_mut().children)
    }
}

impl fmt::Debug for Tracking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracking").finish_non_exhaustive()
    }
}
