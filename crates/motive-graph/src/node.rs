//! Graph plumbing: node handles, child edges, and propagation.
//!
//! The dependency graph is a DAG. Edges run in two directions with different
//! strengths: a node holds *strong* references to the inputs it reads from,
//! and *weak* references to the downstream nodes it feeds ("children"), so
//! shared values feeding several composites never form reference cycles and
//! dropping a consumer prunes its edges automatically.
//!
//! Attachment cascades on child-count transitions: the moment a node gains
//! its first child it registers itself as a child of each of its inputs, and
//! the moment it loses its last one it deregisters. Leaf values therefore
//! only carry live edges into graph regions something downstream actually
//! observes.
//!
//! Propagation (`flush`) is two-phase. Phase one walks downstream from a
//! mutated value, depth-first, deduplicating via a visited set keyed on node
//! identity, and collects the distinct recomputable sinks without descending
//! past them. Phase two recomputes each collected sink once, which reads
//! current input values and pushes a fresh snapshot to its consumer. A
//! value feeding the same sink along several paths still recomputes it
//! exactly once per mutation.

use std::collections::HashSet;

use crate::composite::{PropsNode, StyleNode, TransformNode, WeakProps, WeakStyle, WeakTransform};
use crate::interpolation::{Interpolation, WeakInterpolation};
use crate::tracking::{Tracking, WeakTracking};
use crate::types::PropertyValue;
use crate::value::{Value, WeakValue};

/// Identity of a node, derived from its shared state allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(pub(crate) usize);

/// Handle to any vertex in the animation graph.
#[derive(Clone)]
pub enum AnimNode {
    Value(Value),
    Interpolation(Interpolation),
    Style(StyleNode),
    Transform(TransformNode),
    Props(PropsNode),
    Tracking(Tracking),
}

/// Weak counterpart of `AnimNode`, used for downstream edges.
#[derive(Clone)]
pub(crate) enum WeakNode {
    Value(WeakValue),
    Interpolation(WeakInterpolation),
    Style(WeakStyle),
    Transform(WeakTransform),
    Props(WeakProps),
    Tracking(WeakTracking),
}

impl WeakNode {
    pub(crate) fn key(&self) -> NodeKey {
        match self {
            Self::Value(n) => n.key(),
            Self::Interpolation(n) => n.key(),
            Self::Style(n) => n.key(),
            Self::Transform(n) => n.key(),
            Self::Props(n) => n.key(),
            Self::Tracking(n) => n.key(),
        }
    }

    pub(crate) fn upgrade(&self) -> Option<AnimNode> {
        match self {
            Self::Value(n) => n.upgrade().map(AnimNode::Value),
            Self::Interpolation(n) => n.upgrade().map(AnimNode::Interpolation),
            Self::Style(n) => n.upgrade().map(AnimNode::Style),
            Self::Transform(n) => n.upgrade().map(AnimNode::Transform),
            Self::Props(n) => n.upgrade().map(AnimNode::Props),
            Self::Tracking(n) => n.upgrade().map(AnimNode::Tracking),
        }
    }
}

/// Downstream edge list owned by a node.
///
/// Edges are weak; dead ones are pruned whenever the set is consulted, so a
/// dropped consumer costs nothing beyond the stale slot it briefly leaves.
#[derive(Default)]
pub(crate) struct ChildSet {
    edges: Vec<WeakNode>,
}

impl ChildSet {
    /// Live children, pruning dead edges as a side effect.
    pub(crate) fn live(&mut self) -> Vec<AnimNode> {
        let mut out = Vec::with_capacity(self.edges.len());
        self.edges.retain(|edge| match edge.upgrade() {
            Some(node) => {
                out.push(node);
                true
            }
            None => false,
        });
        out
    }

    /// Number of live children.
    pub(crate) fn live_count(&mut self) -> usize {
        self.edges.retain(|edge| edge.upgrade().is_some());
        self.edges.len()
    }

    pub(crate) fn push(&mut self, edge: WeakNode) {
        self.edges.push(edge);
    }

    /// Remove one edge to `key`. Returns whether anything was removed.
    pub(crate) fn remove(&mut self, key: NodeKey) -> bool {
        if let Some(pos) = self.edges.iter().position(|edge| edge.key() == key) {
            self.edges.swap_remove(pos);
            true
        } else {
            false
        }
    }
}

impl AnimNode {
    /// Identity key for visited-set deduplication.
    pub(crate) fn key(&self) -> NodeKey {
        match self {
            Self::Value(n) => n.key(),
            Self::Interpolation(n) => n.key(),
            Self::Style(n) => n.key(),
            Self::Transform(n) => n.key(),
            Self::Props(n) => n.key(),
            Self::Tracking(n) => n.key(),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakNode {
        match self {
            Self::Value(n) => WeakNode::Value(n.downgrade()),
            Self::Interpolation(n) => WeakNode::Interpolation(n.downgrade()),
            Self::Style(n) => WeakNode::Style(n.downgrade()),
            Self::Transform(n) => WeakNode::Transform(n.downgrade()),
            Self::Props(n) => WeakNode::Props(n.downgrade()),
            Self::Tracking(n) => WeakNode::Tracking(n.downgrade()),
        }
    }

    fn with_children<R>(&self, f: impl FnOnce(&mut ChildSet) -> R) -> R {
        match self {
            Self::Value(n) => n.with_children(f),
            Self::Interpolation(n) => n.with_children(f),
            Self::Style(n) => n.with_children(f),
            Self::Transform(n) => n.with_children(f),
            Self::Props(n) => n.with_children(f),
            Self::Tracking(n) => n.with_children(f),
        }
    }

    /// Upstream nodes this node reads from.
    pub(crate) fn inputs(&self) -> Vec<AnimNode> {
        match self {
            Self::Value(_) => Vec::new(),
            Self::Interpolation(n) => n.inputs(),
            Self::Style(n) => n.inputs(),
            Self::Transform(n) => n.inputs(),
            Self::Props(n) => n.inputs(),
            Self::Tracking(n) => n.inputs(),
        }
    }

    /// Snapshot of live downstream children.
    pub(crate) fn children(&self) -> Vec<AnimNode> {
        self.with_children(|c| c.live())
    }

    /// Register `child` as downstream of this node.
    ///
    /// Gaining the first child attaches this node to its own inputs,
    /// recursively activating the path up to the leaf values.
    pub(crate) fn add_child(&self, child: &AnimNode) {
        let first = self.with_children(|c| {
            let was_empty = c.live_count() == 0;
            c.push(child.downgrade());
            was_empty
        });
        if first {
            for input in self.inputs() {
                input.add_child(self);
            }
        }
    }

    /// Drop the edge to `child`.
    ///
    /// Losing the last child detaches this node from its inputs.
    pub(crate) fn remove_child(&self, child: &AnimNode) {
        let emptied = self.with_children(|c| c.remove(child.key()) && c.live_count() == 0);
        if emptied {
            for input in self.inputs() {
                input.remove_child(self);
            }
        }
    }

    /// Structural marker: does this node recompute on demand?
    ///
    /// Sinks terminate phase-one discovery; everything else is traversed
    /// through.
    pub(crate) fn is_recomputable(&self) -> bool {
        match self {
            Self::Value(_) | Self::Interpolation(_) => false,
            Self::Style(n) => n.has_consumer(),
            Self::Transform(n) => n.has_consumer(),
            Self::Props(_) | Self::Tracking(_) => true,
        }
    }

    /// Recompute a sink, pushing a fresh snapshot to its consumer.
    pub(crate) fn recompute(&self) {
        match self {
            Self::Value(_) | Self::Interpolation(_) => {}
            Self::Style(n) => n.publish(),
            Self::Transform(n) => n.publish(),
            Self::Props(n) => n.publish(),
            Self::Tracking(n) => n.refresh(),
        }
    }

    /// Current output of this node as a property value.
    pub(crate) fn current(&self) -> PropertyValue {
        match self {
            Self::Value(n) => PropertyValue::Number {
                value: n.get_value(),
            },
            Self::Interpolation(n) => n.current(),
            Self::Style(n) => PropertyValue::Style {
                style: n.snapshot(),
            },
            Self::Transform(n) => PropertyValue::Transform { ops: n.ops() },
            Self::Props(n) => PropertyValue::Style {
                style: n.bag_as_style(),
            },
            Self::Tracking(n) => n.current(),
        }
    }

    /// Current scalar output, for nodes that produce one.
    pub(crate) fn scalar(&self) -> Option<f64> {
        match self {
            Self::Value(n) => Some(n.get_value()),
            Self::Interpolation(n) => n.scalar(),
            Self::Tracking(n) => n.scalar(),
            Self::Style(_) | Self::Transform(_) | Self::Props(_) => None,
        }
    }
}

impl From<&Value> for AnimNode {
    fn from(node: &Value) -> Self {
        Self::Value(node.clone())
    }
}

impl From<Value> for AnimNode {
    fn from(node: Value) -> Self {
        Self::Value(node)
    }
}

impl From<&Interpolation> for AnimNode {
    fn from(node: &Interpolation) -> Self {
        Self::Interpolation(node.clone())
    }
}

impl From<Interpolation> for AnimNode {
    fn from(node: Interpolation) -> Self {
        Self::Interpolation(node)
    }
}

impl From<&StyleNode> for AnimNode {
    fn from(node: &StyleNode) -> Self {
        Self::Style(node.clone())
    }
}

impl From<StyleNode> for AnimNode {
    fn from(node: StyleNode) -> Self {
        Self::Style(node)
    }
}

impl From<&TransformNode> for AnimNode {
    fn from(node: &TransformNode) -> Self {
        Self::Transform(node.clone())
    }
}

impl From<TransformNode> for AnimNode {
    fn from(node: TransformNode) -> Self {
        Self::Transform(node)
    }
}

impl From<&PropsNode> for AnimNode {
    fn from(node: &PropsNode) -> Self {
        Self::Props(node.clone())
    }
}

impl From<PropsNode> for AnimNode {
    fn from(node: PropsNode) -> Self {
        Self::Props(node)
    }
}

/// Two-phase propagation from a mutated value.
pub(crate) fn flush(root: &AnimNode) {
    let mut visited = HashSet::new();
    let mut sinks = Vec::new();
    collect_sinks(root, &mut visited, &mut sinks);
    for sink in &sinks {
        sink.recompute();
    }
}

fn collect_sinks(node: &AnimNode, visited: &mut HashSet<NodeKey>, sinks: &mut Vec<AnimNode>) {
    if !visited.insert(node.key()) {
        return;
    }
    if node.is_recomputable() {
        sinks.push(node.clone());
        return;
    }
    for child in node.children() {
        collect_sinks(&child, visited, sinks);
    }
}
