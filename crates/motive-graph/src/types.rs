//! Core value types shared across the animation graph.
//!
//! This module defines:
//! - `PropertyValue`: the structured output a node produces
//! - `StyleSnapshot` / `TransformOp` / `PropertyBag`: composite snapshots
//! - `Vec2`: the two-axis value used by `VectorValue` and vector drivers
//! - `EndResult` / `EndCallback`: driver completion signalling
//! - `DriverState`: the driver lifecycle state machine

use std::collections::BTreeMap;
use std::rc::Rc;

use motive_core::Host;
use serde::{Deserialize, Serialize};

/// Shared handle to the embedding's scheduling and clock services.
pub type HostHandle = Rc<dyn Host>;

/// Outcome delivered to a driver's completion callback.
///
/// `finished` is true when the driver reached its own termination condition,
/// false when it was stopped externally (or displaced by a newer driver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndResult {
    pub finished: bool,
}

impl EndResult {
    pub const FINISHED: Self = Self { finished: true };
    pub const STOPPED: Self = Self { finished: false };
}

/// Completion callback. A single driver invokes it at most once regardless
/// of how termination is reached; a tracking binding reuses one callback
/// across its cycles, which is why this is `FnMut` rather than `FnOnce`.
pub type EndCallback = Box<dyn FnMut(EndResult)>;

/// Two-axis value for `VectorValue` operations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both axes set to `value`.
    pub fn splat(value: f64) -> Self {
        Self { x: value, y: value }
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Lifecycle state of a driver instance.
///
/// A driver never leaves `Stopped` or `Finished`; restarting an animation
/// creates a fresh instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    /// Created but not yet started.
    Idle,
    /// Advancing its target value on frame callbacks.
    Running,
    /// Terminated externally via `stop()`.
    Stopped,
    /// Reached its own termination condition.
    Finished,
}

impl DriverState {
    /// True for the terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Finished)
    }
}

/// Identifier for a value listener, scoped to the node that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

/// A single resolved transform operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformOp {
    pub kind: TransformKind,
    pub value: PropertyValue,
}

/// The transform operations a `TransformNode` can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    TranslateX,
    TranslateY,
    Scale,
    ScaleX,
    ScaleY,
    Rotate,
    RotateX,
    RotateY,
    SkewX,
    SkewY,
    Perspective,
}

/// Structured output of a style composite: key to resolved value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleSnapshot {
    pub entries: BTreeMap<String, PropertyValue>,
}

impl StyleSnapshot {
    /// Look up a resolved entry.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }
}

/// Full property set produced by a props composite for one renderable
/// element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyBag {
    pub props: BTreeMap<String, PropertyValue>,
}

impl PropertyBag {
    /// Look up a resolved property.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.props.get(key)
    }
}

/// Value produced by a graph node when read through the property pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    /// Plain scalar (opacity, a coordinate, a font size).
    Number { value: f64 },
    /// String output of an interpolation ("45deg", "rgba(…)").
    Text { value: String },
    /// Ordered transform operation list.
    Transform { ops: Vec<TransformOp> },
    /// Nested style snapshot.
    Style { style: StyleSnapshot },
}

impl PropertyValue {
    /// Build a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    /// Try to extract a scalar.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number { value } => Some(*value),
            _ => None,
        }
    }

    /// Try to extract a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { value } => Some(value),
            _ => None,
        }
    }

    /// Try to extract a transform list.
    pub fn as_transform(&self) -> Option<&[TransformOp]> {
        match self {
            Self::Transform { ops } => Some(ops),
            _ => None,
        }
    }

    /// Try to extract a nested style snapshot.
    pub fn as_style(&self) -> Option<&StyleSnapshot> {
        match self {
            Self::Style { style } => Some(style),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Number { .. } => "number",
            Self::Text { .. } => "text",
            Self::Transform { .. } => "transform",
            Self::Style { .. } => "style",
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number { value }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text { value }
    }
}
