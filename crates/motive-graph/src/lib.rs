//! Motive: a declarative animation graph.
//!
//! Numeric leaf values drive visual properties through a dependency graph:
//! - **Values** (`Value`, `VectorValue`): mutable scalars with offsets,
//!   listeners, and an exclusive driver slot
//! - **Derived nodes**: `Interpolation` (piecewise range mapping),
//!   `StyleNode`/`TransformNode`/`PropsNode` (structured fan-in aggregates)
//! - **Drivers**: `timing`, `decay`, `spring` advance a value on host
//!   frames until a termination condition, then signal completion exactly
//!   once
//! - **Operators**: `sequence`, `parallel`, `stagger`, `delay`, `event_map`
//!   compose drivers into larger behaviors
//!
//! # Architecture
//!
//! ```text
//! Value ──┬── Interpolation ── StyleNode ──┐
//!         │                                ├── PropsNode ── RenderTarget
//!         └── TransformNode ───────────────┘
//!
//! Driver ── writes ──> Value ── flush ──> distinct sinks, once each
//! ```
//!
//! Mutating a value (directly or from a driver) runs two-phase
//! propagation: discover the distinct recomputable sinks downstream, then
//! recompute each once and push fresh snapshots to their consumers. The
//! graph is a DAG; one value feeding several composites still updates each
//! exactly once per mutation.
//!
//! Everything is single-threaded and frame-driven; the embedding supplies
//! scheduling and time through `motive_core::Host`.

pub mod compose;
pub mod composite;
pub mod drivers;
pub mod easing;
pub mod error;
pub mod event;
pub mod interpolation;
pub mod node;
pub mod tracking;
pub mod types;
pub mod value;
pub mod vector;

#[cfg(test)]
mod tests;

pub use compose::{Anim, Animation, ParallelConfig, delay, parallel, sequence, stagger};
pub use composite::{
    CompositeEntry, PropsBuilder, PropsNode, RenderTarget, StyleBuilder, StyleNode,
    TransformBuilder, TransformNode,
};
pub use drivers::{
    DecayConfig, DecayVecConfig, DriverSpec, SpringConfig, SpringVecConfig, StateInheritance,
    TimingConfig, TimingVecConfig, To, ToVec, decay, decay_vec, spring, spring_vec, timing,
    timing_vec,
};
pub use easing::EasingFunction;
pub use error::{ConfigError, EventError};
pub use event::{ArgMapping, EventHandler, event_map};
pub use interpolation::{Extrapolate, Interpolation, InterpolationConfig, OutputRange};
pub use node::AnimNode;
pub use tracking::Tracking;
pub use types::{
    EndCallback, EndResult, HostHandle, ListenerId, PropertyBag, PropertyValue, StyleSnapshot,
    TransformKind, TransformOp, Vec2,
};
pub use value::Value;
pub use vector::{VectorListenerId, VectorValue};
