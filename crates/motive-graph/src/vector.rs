//! Two-axis value: a pair of `Value`s with mirrored operations.
//!
//! `VectorValue` is the unit gesture code works with for positions. The
//! axes are full, independent `Value` nodes; vector drivers fan out into
//! one scalar driver per axis, and the convenience accessors below wire the
//! pair into the common style shapes (left/top layout, translate
//! transforms).

use std::fmt;

use crate::composite::{StyleNode, TransformNode};
use crate::types::{ListenerId, Vec2};
use crate::value::Value;

/// A pair of animated values forming a 2D point.
#[derive(Clone)]
pub struct VectorValue {
    x: Value,
    y: Value,
}

/// Listener registration across both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorListenerId {
    x: ListenerId,
    y: ListenerId,
}

impl VectorValue {
    /// Create a vector value at `(x, y)`.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Value::new(x),
            y: Value::new(y),
        }
    }

    /// Create a vector value at `point`.
    pub fn from_vec(point: Vec2) -> Self {
        Self::new(point.x, point.y)
    }

    /// The x-axis value node.
    pub fn x(&self) -> &Value {
        &self.x
    }

    /// The y-axis value node.
    pub fn y(&self) -> &Value {
        &self.y
    }

    /// Effective position.
    pub fn get_value(&self) -> Vec2 {
        Vec2::new(self.x.get_value(), self.y.get_value())
    }

    /// Set both axes, cancelling any running drivers.
    pub fn set_value(&self, value: Vec2) {
        self.x.set_value(value.x);
        self.y.set_value(value.y);
    }

    /// Replace both offsets.
    pub fn set_offset(&self, offset: Vec2) {
        self.x.set_offset(offset.x);
        self.y.set_offset(offset.y);
    }

    /// Fold both offsets into the base values.
    pub fn flatten_offset(&self) {
        self.x.flatten_offset();
        self.y.flatten_offset();
    }

    /// Move both base values into the offsets.
    pub fn extract_offset(&self) {
        self.x.extract_offset();
        self.y.extract_offset();
    }

    /// Stop drivers and tracking on both axes. Returns the resting point.
    pub fn stop_animation(&self) -> Vec2 {
        Vec2::new(self.x.stop_animation(), self.y.stop_animation())
    }

    /// Observe every change of either axis with the full current point.
    pub fn add_listener(&self, listener: impl Fn(Vec2) + 'static) -> VectorListenerId {
        let listener = std::rc::Rc::new(listener);

        let x_axis = self.x.clone();
        let y_axis = self.y.clone();
        let on_x = listener.clone();
        let x = self.x.add_listener(move |x| {
            on_x(Vec2::new(x, y_axis.get_value()));
        });
        let on_y = listener;
        let y = self.y.add_listener(move |y| {
            on_y(Vec2::new(x_axis.get_value(), y));
        });

        VectorListenerId { x, y }
    }

    /// Remove a listener registered with `add_listener`.
    pub fn remove_listener(&self, id: VectorListenerId) {
        self.x.remove_listener(id.x);
        self.y.remove_listener(id.y);
    }

    /// Style aggregate placing an element at this point: `{left, top}`.
    pub fn layout_style(&self) -> StyleNode {
        StyleNode::builder()
            .node("left", &self.x)
            .node("top", &self.y)
            .build()
    }

    /// Transform aggregate translating an element to this point.
    pub fn translate_transform(&self) -> TransformNode {
        TransformNode::builder()
            .translate_x(&self.x)
            .translate_y(&self.y)
            .build()
    }
}

impl fmt::Debug for VectorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorValue")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}
