//! Drivers: stateful processes advancing a value until a stop condition.
//!
//! A driver is created when an animation handle starts, runs on host frame
//! callbacks (one request per tick, rescheduling itself while active), and
//! dies in one of two terminal states: `Finished` when its own termination
//! condition held, `Stopped` when something stopped it externally. The
//! completion callback is consumed with `Option::take`, so it fires at most
//! once no matter how many code paths reach termination.
//!
//! Re-entrancy note: a value listener running inside the update path may
//! stop the very driver that triggered it. Every tick re-checks the running
//! state after emitting and aborts rescheduling if it was torn down
//! mid-callback.

pub mod decay;
pub mod spring;
pub mod timing;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use motive_core::{FrameToken, Host, InteractionHandle};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compose::{Anim, Animation, ParallelConfig, parallel};
use crate::node::AnimNode;
use crate::tracking::Tracking;
use crate::types::{DriverState, EndCallback, EndResult, HostHandle, Vec2};
use crate::value::{Value, WeakValue};
use crate::vector::VectorValue;

pub use decay::{DecayConfig, DecayVecConfig};
pub use spring::{SpringConfig, SpringVecConfig};
pub use timing::{TimingConfig, TimingVecConfig};

use decay::DecayState;
use spring::SpringState;
use timing::TimingState;

/// Destination of a timing or spring driver.
#[derive(Clone)]
pub enum To {
    /// Animate to a fixed scalar.
    Fixed(f64),
    /// Continuously re-target at another value as it moves.
    Track(Value),
}

impl From<f64> for To {
    fn from(value: f64) -> Self {
        Self::Fixed(value)
    }
}

impl From<&Value> for To {
    fn from(value: &Value) -> Self {
        Self::Track(value.clone())
    }
}

impl Default for To {
    fn default() -> Self {
        Self::Fixed(0.0)
    }
}

impl fmt::Debug for To {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            Self::Track(v) => f.debug_tuple("Track").field(v).finish(),
        }
    }
}

/// Destination of a vector driver.
#[derive(Debug, Clone)]
pub enum ToVec {
    Fixed(Vec2),
    Track(VectorValue),
}

impl From<Vec2> for ToVec {
    fn from(value: Vec2) -> Self {
        Self::Fixed(value)
    }
}

impl From<&VectorValue> for ToVec {
    fn from(value: &VectorValue) -> Self {
        Self::Track(value.clone())
    }
}

impl ToVec {
    fn split(self) -> (To, To) {
        match self {
            Self::Fixed(v) => (To::Fixed(v.x), To::Fixed(v.y)),
            Self::Track(v) => (To::Track(v.x().clone()), To::Track(v.y().clone())),
        }
    }
}

/// Whether a fresh driver inherits the displaced driver's kinematic state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateInheritance {
    /// Inherit position/velocity/time only from a driver of the same kind.
    SameKind,
    /// Inherit from any displaced driver that exposes kinematics.
    Any,
    /// Always start from the value's rest state.
    Never,
}

impl Default for StateInheritance {
    fn default() -> Self {
        Self::SameKind
    }
}

/// Driver configuration, one variant per driver kind.
#[derive(Debug, Clone)]
pub enum DriverSpec {
    Timing(TimingConfig),
    Decay(DecayConfig),
    Spring(SpringConfig),
}

/// Kind discriminant used by the inheritance policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DriverTag {
    Timing,
    Decay,
    Spring,
}

/// Kinematic state captured from a displaced driver.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Kinematics {
    pub position: f64,
    pub velocity: f64,
    pub time: f64,
}

/// State offered to the replacement driver when a value is re-targeted.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Handoff {
    pub tag: DriverTag,
    pub kinematics: Kinematics,
}

impl DriverSpec {
    /// The tracked destination, when this spec follows another value.
    pub(crate) fn tracked_source(&self) -> Option<Value> {
        let to = match self {
            Self::Timing(c) => &c.to_value,
            Self::Spring(c) => &c.to_value,
            Self::Decay(_) => return None,
        };
        match to {
            To::Track(source) => Some(source.clone()),
            To::Fixed(_) => None,
        }
    }

    /// Copy of this spec with the destination pinned to `to`.
    pub(crate) fn with_fixed_to(&self, to: f64) -> Self {
        match self {
            Self::Timing(c) => {
                let mut c = c.clone();
                c.to_value = To::Fixed(to);
                Self::Timing(c)
            }
            Self::Spring(c) => {
                let mut c = c.clone();
                c.to_value = To::Fixed(to);
                Self::Spring(c)
            }
            Self::Decay(c) => Self::Decay(c.clone()),
        }
    }

    fn is_interaction(&self) -> bool {
        match self {
            Self::Timing(c) => c.is_interaction.unwrap_or(c.duration_ms > 0.0),
            Self::Decay(c) => c.is_interaction.unwrap_or(true),
            Self::Spring(c) => c.is_interaction.unwrap_or(true),
        }
    }
}

/// Per-kind integration state.
enum DriverKind {
    Timing(TimingState),
    Decay(DecayState),
    Spring(SpringState),
}

impl DriverKind {
    fn tick(&mut self, now: f64) -> TickOutcome {
        match self {
            Self::Timing(s) => s.tick(now),
            Self::Decay(s) => s.tick(now),
            Self::Spring(s) => s.tick(now),
        }
    }

    fn kinematics(&self) -> Option<Kinematics> {
        match self {
            Self::Timing(_) => None,
            Self::Decay(s) => Some(s.kinematics()),
            Self::Spring(s) => Some(s.kinematics()),
        }
    }

    fn tag(&self) -> DriverTag {
        match self {
            Self::Timing(_) => DriverTag::Timing,
            Self::Decay(_) => DriverTag::Decay,
            Self::Spring(_) => DriverTag::Spring,
        }
    }

    /// Whether the first evaluation runs inside `begin` rather than on the
    /// next frame. Springs always evaluate immediately (a spring at rest
    /// must finish without waiting for a frame); zero-duration timings with
    /// no delay emit and finish synchronously.
    fn starts_synchronously(&self) -> bool {
        match self {
            Self::Timing(s) => s.starts_synchronously(),
            Self::Decay(_) => false,
            Self::Spring(_) => true,
        }
    }
}

/// One tick's result: values to emit and whether the driver is done.
///
/// `snap` is an extra exact emission right before natural completion (a
/// spring snapping to its destination).
pub(crate) struct TickOutcome {
    pub emit: Option<f64>,
    pub snap: Option<f64>,
    pub done: bool,
}

impl TickOutcome {
    pub(crate) fn reschedule() -> Self {
        Self {
            emit: None,
            snap: None,
            done: false,
        }
    }
}

/// Shared handle to a running driver instance.
#[derive(Clone)]
pub(crate) struct ActiveDriver {
    inner: Rc<RefCell<DriverBox>>,
}

struct DriverBox {
    state: DriverState,
    host: HostHandle,
    target: WeakValue,
    kind: DriverKind,
    is_interaction: bool,
    interaction: Option<InteractionHandle>,
    frame: Option<FrameToken>,
    on_end: Option<EndCallback>,
}

impl ActiveDriver {
    /// Build an idle driver for `value` from `spec`.
    ///
    /// `handoff` is the displaced driver's kinematic state; the spec's
    /// inheritance policy decides whether it is applied.
    pub(crate) fn new(
        host: HostHandle,
        value: &Value,
        spec: &DriverSpec,
        handoff: Option<Handoff>,
        on_end: Option<EndCallback>,
    ) -> Self {
        let from_value = value.raw_value();
        let now = host.now();

        let kind = match spec {
            DriverSpec::Timing(config) => {
                DriverKind::Timing(TimingState::new(config, from_value, now))
            }
            DriverSpec::Decay(config) => {
                DriverKind::Decay(DecayState::new(config, from_value, now))
            }
            DriverSpec::Spring(config) => {
                DriverKind::Spring(SpringState::new(config, from_value, now, handoff))
            }
        };

        Self {
            inner: Rc::new(RefCell::new(DriverBox {
                state: DriverState::Idle,
                host,
                target: value.downgrade(),
                kind,
                is_interaction: spec.is_interaction(),
                interaction: None,
                frame: None,
                on_end,
            })),
        }
    }

    /// Transition to `Running` and perform the first evaluation.
    ///
    /// Must be called after the driver is installed in the value's driver
    /// slot: a synchronous first evaluation may already finish and clear it.
    pub(crate) fn begin(&self, value: &Value) {
        let (sync, tag) = {
            let mut b = self.inner.borrow_mut();
            b.state = DriverState::Running;
            if b.is_interaction {
                b.interaction = Some(b.host.create_interaction());
            }
            (b.kind.starts_synchronously(), b.kind.tag())
        };
        debug!("driver {:?} started on {:?}", tag, value);

        if sync {
            let now = self.inner.borrow().host.now();
            Self::tick(&self.inner, now);
        } else {
            Self::schedule(&self.inner);
        }
    }

    /// Stop externally: terminal state, callback fires `finished: false`
    /// before this returns.
    pub(crate) fn stop(&self) {
        Self::complete(&self.inner, EndResult::STOPPED);
    }

    /// Kinematic state offered to a replacement driver.
    pub(crate) fn handoff(&self) -> Option<Handoff> {
        let b = self.inner.borrow();
        b.kind.kinematics().map(|kinematics| Handoff {
            tag: b.kind.tag(),
            kinematics,
        })
    }

    /// Identity of this driver instance, for slot comparison.
    pub(crate) fn ptr_key(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    fn schedule(this: &Rc<RefCell<DriverBox>>) {
        let weak = Rc::downgrade(this);
        let token = {
            let host = this.borrow().host.clone();
            host.request_frame(Box::new(move |now| {
                if let Some(driver) = weak.upgrade() {
                    Self::tick(&driver, now);
                }
            }))
        };
        this.borrow_mut().frame = Some(token);
    }

    fn tick(this: &Rc<RefCell<DriverBox>>, now: f64) {
        let outcome = {
            let mut b = this.borrow_mut();
            if b.state != DriverState::Running {
                return;
            }
            b.frame = None;
            b.kind.tick(now)
        };

        let target = this.borrow().target.upgrade();

        if let Some(value) = outcome.emit
            && let Some(target) = &target
        {
            target.update_from_driver(value);
        }
        // A listener may have stopped this driver from inside the update.
        if this.borrow().state != DriverState::Running {
            return;
        }

        if outcome.done {
            if let Some(value) = outcome.snap
                && let Some(target) = &target
            {
                target.update_from_driver(value);
            }
            if this.borrow().state != DriverState::Running {
                return;
            }
            Self::complete(this, EndResult::FINISHED);
        } else {
            Self::schedule(this);
        }
    }

    fn complete(this: &Rc<RefCell<DriverBox>>, result: EndResult) {
        let (on_end, interaction, host, target) = {
            let mut b = this.borrow_mut();
            if b.state.is_terminal() {
                return;
            }
            b.state = if result.finished {
                DriverState::Finished
            } else {
                DriverState::Stopped
            };
            if let Some(token) = b.frame.take() {
                b.host.cancel_frame(token);
            }
            (
                b.on_end.take(),
                b.interaction.take(),
                b.host.clone(),
                b.target.clone(),
            )
        };

        if let Some(target) = target.upgrade() {
            target.clear_driver_if(Rc::as_ptr(this) as *const () as usize);
        }
        if let Some(handle) = interaction {
            host.clear_interaction(handle);
        }
        if let Some(mut on_end) = on_end {
            on_end(result);
        }
    }
}

/// Animation handle over a single driver spec.
///
/// Each `start` builds a fresh driver (handles are restartable even though
/// driver instances are not); a tracked destination installs a tracking
/// binding instead.
struct DriverAnimation {
    host: HostHandle,
    value: Value,
    spec: DriverSpec,
}

impl Animation for DriverAnimation {
    fn start(&self, on_end: Option<EndCallback>) {
        self.value.stop_tracking();
        if let Some(source) = self.spec.tracked_source() {
            let tracking = Tracking::new(
                self.host.clone(),
                &self.value,
                AnimNode::from(&source),
                self.spec.clone(),
                on_end,
            );
            self.value.install_tracking(tracking);
        } else {
            self.value.animate(&self.host, self.spec.clone(), on_end);
        }
    }

    fn stop(&self) {
        self.value.stop_animation();
    }
}

/// Animate `value` along an eased timing curve.
pub fn timing(host: &HostHandle, value: &Value, config: TimingConfig) -> Anim {
    Rc::new(DriverAnimation {
        host: host.clone(),
        value: value.clone(),
        spec: DriverSpec::Timing(config),
    })
}

/// Let `value` coast to rest under exponential decay.
pub fn decay(host: &HostHandle, value: &Value, config: DecayConfig) -> Anim {
    Rc::new(DriverAnimation {
        host: host.clone(),
        value: value.clone(),
        spec: DriverSpec::Decay(config),
    })
}

/// Animate `value` on a damped spring.
///
/// # Panics
/// Panics when the config supplies both spring parameter sets; use
/// [`SpringConfig::validate`] first when the config is untrusted.
pub fn spring(host: &HostHandle, value: &Value, config: SpringConfig) -> Anim {
    if let Err(error) = config.validate() {
        panic!("invalid spring configuration: {error}");
    }
    Rc::new(DriverAnimation {
        host: host.clone(),
        value: value.clone(),
        spec: DriverSpec::Spring(config),
    })
}

/// Fan a timing animation out over both axes of a vector value.
///
/// The two scalar drivers run as a non-stop-together parallel group, so one
/// axis finishing (or being re-targeted by tracking) never interrupts the
/// other.
pub fn timing_vec(host: &HostHandle, value: &VectorValue, config: TimingVecConfig) -> Anim {
    let (x, y) = config.split();
    parallel(
        vec![
            Some(timing(host, value.x(), x)),
            Some(timing(host, value.y(), y)),
        ],
        ParallelConfig {
            stop_together: false,
        },
    )
}

/// Fan a decay animation out over both axes of a vector value.
pub fn decay_vec(host: &HostHandle, value: &VectorValue, config: DecayVecConfig) -> Anim {
    let (x, y) = config.split();
    parallel(
        vec![
            Some(decay(host, value.x(), x)),
            Some(decay(host, value.y(), y)),
        ],
        ParallelConfig {
            stop_together: false,
        },
    )
}

/// Fan a spring animation out over both axes of a vector value.
///
/// # Panics
/// Panics when the config supplies both spring parameter sets.
pub fn spring_vec(host: &HostHandle, value: &VectorValue, config: SpringVecConfig) -> Anim {
    let (x, y) = config.split();
    parallel(
        vec![
            Some(spring(host, value.x(), x)),
            Some(spring(host, value.y(), y)),
        ],
        ParallelConfig {
            stop_together: false,
        },
    )
}
