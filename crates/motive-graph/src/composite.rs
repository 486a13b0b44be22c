//! Fan-in composite nodes: style, transform, and props aggregates.
//!
//! Composites mix literal values with animated nodes and recompute a fresh
//! structured snapshot on demand; recomputation never mutates siblings. A
//! props node is the graph's boundary with the rendering collaborator: it
//! pushes its property bag straight onto a `RenderTarget`, falling back to a
//! full re-render request when direct application is unsupported (composite,
//! non-leaf renderables).
//!
//! Style and transform nodes become propagation sinks only once they have a
//! consumer of their own; nested under a props node they are plain
//! pass-throughs and the props node is the sink.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::node::{AnimNode, ChildSet, NodeKey};
use crate::types::{PropertyBag, PropertyValue, StyleSnapshot, TransformKind, TransformOp};

/// One entry of a composite: a fixed literal or a live node.
#[derive(Clone)]
pub enum CompositeEntry {
    Literal(PropertyValue),
    Node(AnimNode),
}

impl CompositeEntry {
    fn resolve(&self) -> PropertyValue {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Node(node) => node.current(),
        }
    }

    fn node(&self) -> Option<&AnimNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Literal(_) => None,
        }
    }
}

impl fmt::Debug for CompositeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Node(_) => f.write_str("Node(..)"),
        }
    }
}

/// Renderable element collaborator receiving computed property bags.
pub trait RenderTarget {
    /// Apply `props` directly, bypassing a full re-render.
    ///
    /// Returns false when direct application is unavailable for this
    /// element; the caller then requests a full re-render instead.
    fn try_apply_props(&self, props: &PropertyBag) -> bool;

    /// Fallback path: ask the host to re-render this element.
    fn request_render(&self);
}

// ---------------------------------------------------------------------------
// StyleNode
// ---------------------------------------------------------------------------

/// Aggregates named entries into a `StyleSnapshot`.
#[derive(Clone)]
pub struct StyleNode {
    inner: Rc<RefCell<StyleState>>,
}

struct StyleState {
    entries: BTreeMap<String, CompositeEntry>,
    consumer: Option<Rc<dyn Fn(&StyleSnapshot)>>,
    children: ChildSet,
}

#[derive(Clone)]
pub(crate) struct WeakStyle(Weak<RefCell<StyleState>>);

impl WeakStyle {
    pub(crate) fn upgrade(&self) -> Option<StyleNode> {
        self.0.upgrade().map(|inner| StyleNode { inner })
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(self.0.as_ptr() as *const () as usize)
    }
}

/// Builder for `StyleNode`.
#[derive(Default)]
pub struct StyleBuilder {
    entries: BTreeMap<String, CompositeEntry>,
}

impl StyleBuilder {
    /// Add an animated entry.
    pub fn node(mut self, key: impl Into<String>, node: impl Into<AnimNode>) -> Self {
        self.entries
            .insert(key.into(), CompositeEntry::Node(node.into()));
        self
    }

    /// Add a fixed entry.
    pub fn literal(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.entries
            .insert(key.into(), CompositeEntry::Literal(value.into()));
        self
    }

    /// Nest a transform list under the `transform` key.
    pub fn transform(self, transform: &TransformNode) -> Self {
        self.node("transform", transform)
    }

    pub fn build(self) -> StyleNode {
        StyleNode {
            inner: Rc::new(RefCell::new(StyleState {
                entries: self.entries,
                consumer: None,
                children: ChildSet::default(),
            })),
        }
    }
}

impl StyleNode {
    pub fn builder() -> StyleBuilder {
        StyleBuilder::default()
    }

    /// Fresh snapshot of every entry at its current value.
    pub fn snapshot(&self) -> StyleSnapshot {
        let state = self.inner.borrow();
        StyleSnapshot {
            entries: state
                .entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.resolve()))
                .collect(),
        }
    }

    /// Register a consumer, turning this node into a propagation sink.
    pub fn set_consumer(&self, consumer: impl Fn(&StyleSnapshot) + 'static) {
        let attach = {
            let mut state = self.inner.borrow_mut();
            let first = state.consumer.is_none() && state.children.live_count() == 0;
            state.consumer = Some(Rc::new(consumer));
            first
        };
        if attach {
            let node = AnimNode::from(self);
            for input in node.inputs() {
                input.add_child(&node);
            }
        }
    }

    pub(crate) fn has_consumer(&self) -> bool {
        self.inner.borrow().consumer.is_some()
    }

    /// Recompute and push to the consumer.
    pub(crate) fn publish(&self) {
        let snapshot = self.snapshot();
        let consumer = self.inner.borrow().consumer.clone();
        if let Some(consumer) = consumer {
            consumer(&snapshot);
        }
    }

    pub(crate) fn inputs(&self) -> Vec<AnimNode> {
        let state = self.inner.borrow();
        state
            .entries
            .values()
            .filter_map(|entry| entry.node().cloned())
            .collect()
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    pub(crate) fn downgrade(&self) -> WeakStyle {
        WeakStyle(Rc::downgrade(&self.inner))
    }

    pub(crate) fn with_children<R>(&self, f: impl FnOnce(&mut ChildSet) -> R) -> R {
        f(&mut self.inner.borrow_mut().children)
    }
}

impl fmt::Debug for StyleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleNode")
            .field("entries", &self.inner.borrow().entries)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// TransformNode
// ---------------------------------------------------------------------------

/// Aggregates an ordered list of transform operations.
#[derive(Clone)]
pub struct TransformNode {
    inner: Rc<RefCell<TransformState>>,
}

struct TransformState {
    ops: Vec<(TransformKind, CompositeEntry)>,
    consumer: Option<Rc<dyn Fn(&[TransformOp])>>,
    children: ChildSet,
}

#[derive(Clone)]
pub(crate) struct WeakTransform(Weak<RefCell<TransformState>>);

impl WeakTransform {
    pub(crate) fn upgrade(&self) -> Option<TransformNode> {
        self.0.upgrade().map(|inner| TransformNode { inner })
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(self.0.as_ptr() as *const () as usize)
    }
}

/// Builder for `TransformNode`. Operation order is preserved.
#[derive(Default)]
pub struct TransformBuilder {
    ops: Vec<(TransformKind, CompositeEntry)>,
}

impl TransformBuilder {
    /// Append an animated operation.
    pub fn op(mut self, kind: TransformKind, node: impl Into<AnimNode>) -> Self {
        self.ops.push((kind, CompositeEntry::Node(node.into())));
        self
    }

    /// Append a fixed operation.
    pub fn literal(mut self, kind: TransformKind, value: impl Into<PropertyValue>) -> Self {
        self.ops.push((kind, CompositeEntry::Literal(value.into())));
        self
    }

    pub fn translate_x(self, node: impl Into<AnimNode>) -> Self {
        self.op(TransformKind::TranslateX, node)
    }

    pub fn translate_y(self, node: impl Into<AnimNode>) -> Self {
        self.op(TransformKind::TranslateY, node)
    }

    pub fn scale(self, node: impl Into<AnimNode>) -> Self {
        self.op(TransformKind::Scale, node)
    }

    pub fn rotate(self, node: impl Into<AnimNode>) -> Self {
        self.op(TransformKind::Rotate, node)
    }

    pub fn build(self) -> TransformNode {
        TransformNode {
            inner: Rc::new(RefCell::new(TransformState {
                ops: self.ops,
                consumer: None,
                children: ChildSet::default(),
            })),
        }
    }
}

impl TransformNode {
    pub fn builder() -> TransformBuilder {
        TransformBuilder::default()
    }

    /// Fresh operation list at current values.
    pub fn ops(&self) -> Vec<TransformOp> {
        let state = self.inner.borrow();
        state
            .ops
            .iter()
            .map(|(kind, entry)| TransformOp {
                kind: *kind,
                value: entry.resolve(),
            })
            .collect()
    }

    /// Register a consumer, turning this node into a propagation sink.
    pub fn set_consumer(&self, consumer: impl Fn(&[TransformOp]) + 'static) {
        let attach = {
            let mut state = self.inner.borrow_mut();
            let first = state.consumer.is_none() && state.children.live_count() == 0;
            state.consumer = Some(Rc::new(consumer));
            first
        };
        if attach {
            let node = AnimNode::from(self);
            for input in node.inputs() {
                input.add_child(&node);
            }
        }
    }

    pub(crate) fn has_consumer(&self) -> bool {
        self.inner.borrow().consumer.is_some()
    }

    pub(crate) fn publish(&self) {
        let ops = self.ops();
        let consumer = self.inner.borrow().consumer.clone();
        if let Some(consumer) = consumer {
            consumer(&ops);
        }
    }

    pub(crate) fn inputs(&self) -> Vec<AnimNode> {
        let state = self.inner.borrow();
        state
            .ops
            .iter()
            .filter_map(|(_, entry)| entry.node().cloned())
            .collect()
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    pub(crate) fn downgrade(&self) -> WeakTransform {
        WeakTransform(Rc::downgrade(&self.inner))
    }

    pub(crate) fn with_children<R>(&self, f: impl FnOnce(&mut ChildSet) -> R) -> R {
        f(&mut self.inner.borrow_mut().children)
    }
}

impl fmt::Debug for TransformNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformNode")
            .field("ops", &self.inner.borrow().ops.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// PropsNode
// ---------------------------------------------------------------------------

/// Full property set for one renderable element.
///
/// Always a propagation sink: any upstream change recomputes the bag and
/// pushes it to the connected target and/or consumer.
#[derive(Clone)]
pub struct PropsNode {
    inner: Rc<RefCell<PropsState>>,
}

struct PropsState {
    entries: BTreeMap<String, CompositeEntry>,
    target: Option<Rc<dyn RenderTarget>>,
    consumer: Option<Rc<dyn Fn(&PropertyBag)>>,
    children: ChildSet,
}

#[derive(Clone)]
pub(crate) struct WeakProps(Weak<RefCell<PropsState>>);

impl WeakProps {
    pub(crate) fn upgrade(&self) -> Option<PropsNode> {
        self.0.upgrade().map(|inner| PropsNode { inner })
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(self.0.as_ptr() as *const () as usize)
    }
}

/// Builder for `PropsNode`.
#[derive(Default)]
pub struct PropsBuilder {
    entries: BTreeMap<String, CompositeEntry>,
}

impl PropsBuilder {
    /// Add an animated property.
    pub fn node(mut self, key: impl Into<String>, node: impl Into<AnimNode>) -> Self {
        self.entries
            .insert(key.into(), CompositeEntry::Node(node.into()));
        self
    }

    /// Add a fixed property.
    pub fn literal(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.entries
            .insert(key.into(), CompositeEntry::Literal(value.into()));
        self
    }

    /// Nest a style aggregate under the `style` key.
    pub fn style(self, style: &StyleNode) -> Self {
        self.node("style", style)
    }

    pub fn build(self) -> PropsNode {
        PropsNode {
            inner: Rc::new(RefCell::new(PropsState {
                entries: self.entries,
                target: None,
                consumer: None,
                children: ChildSet::default(),
            })),
        }
    }
}

impl PropsNode {
    pub fn builder() -> PropsBuilder {
        PropsBuilder::default()
    }

    /// Fresh property bag at current values.
    pub fn bag(&self) -> PropertyBag {
        let state = self.inner.borrow();
        PropertyBag {
            props: state
                .entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.resolve()))
                .collect(),
        }
    }

    /// Attach to a renderable element and push the current bag once.
    ///
    /// Activates the edges from every upstream value down to this node, so
    /// subsequent mutations propagate here.
    pub fn connect(&self, target: Rc<dyn RenderTarget>) {
        self.inner.borrow_mut().target = Some(target);
        let node = AnimNode::from(self);
        for input in node.inputs() {
            input.add_child(&node);
        }
        self.publish();
    }

    /// Detach from the renderable element and deactivate edges.
    pub fn disconnect(&self) {
        self.inner.borrow_mut().target = None;
        let node = AnimNode::from(self);
        for input in node.inputs() {
            input.remove_child(&node);
        }
    }

    /// Register an additional bag consumer (diagnostics, test probes).
    pub fn set_consumer(&self, consumer: impl Fn(&PropertyBag) + 'static) {
        let attach = {
            let mut state = self.inner.borrow_mut();
            let first = state.consumer.is_none()
                && state.target.is_none()
                && state.children.live_count() == 0;
            state.consumer = Some(Rc::new(consumer));
            first
        };
        if attach {
            let node = AnimNode::from(self);
            for input in node.inputs() {
                input.add_child(&node);
            }
        }
    }

    /// Recompute the bag and push it out.
    pub(crate) fn publish(&self) {
        let bag = self.bag();
        let (target, consumer) = {
            let state = self.inner.borrow();
            (state.target.clone(), state.consumer.clone())
        };
        if let Some(consumer) = consumer {
            consumer(&bag);
        }
        if let Some(target) = target
            && !target.try_apply_props(&bag)
        {
            target.request_render();
        }
    }

    pub(crate) fn bag_as_style(&self) -> StyleSnapshot {
        StyleSnapshot {
            entries: self.bag().props,
        }
    }

    pub(crate) fn inputs(&self) -> Vec<AnimNode> {
        let state = self.inner.borrow();
        state
            .entries
            .values()
            .filter_map(|entry| entry.node().cloned())
            .collect()
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    pub(crate) fn downgrade(&self) -> WeakProps {
        WeakProps(Rc::downgrade(&self.inner))
    }

    pub(crate) fn with_children<R>(&self, f: impl FnOnce(&mut ChildSet) -> R) -> R {
        f(&mut self.inner.borrow_mut().children)
    }
}

impl fmt::Debug for PropsNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropsNode")
            .field("entries", &self.inner.borrow().entries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell as StdRefCell;

    use super::*;
    use crate::value::Value;

    #[test]
    fn test_style_snapshot_mixes_literals_and_nodes() {
        let opacity = Value::new(0.25);
        let style = StyleNode::builder()
            .node("opacity", &opacity)
            .literal("background_color", "black")
            .build();

        let snapshot = style.snapshot();
        assert_eq!(snapshot.get("opacity").and_then(|v| v.as_number()), Some(0.25));
        assert_eq!(
            snapshot.get("background_color").and_then(|v| v.as_text()),
            Some("black")
        );
    }

    #[test]
    fn test_style_consumer_sees_upstream_changes() {
        let opacity = Value::new(0.0);
        let style = StyleNode::builder().node("opacity", &opacity).build();

        let seen = Rc::new(StdRefCell::new(Vec::new()));
        let seen2 = seen.clone();
        style.set_consumer(move |snapshot| {
            seen2
                .borrow_mut()
                .push(snapshot.get("opacity").and_then(|v| v.as_number()).unwrap());
        });

        opacity.set_value(0.5);
        opacity.set_value(1.0);
        assert_eq!(*seen.borrow(), vec![0.5, 1.0]);
    }

    #[test]
    fn test_composite_updates_when_either_input_changes() {
        let width = Value::new(10.0);
        let height = Value::new(20.0);
        let style = StyleNode::builder()
            .node("width", &width)
            .node("height", &height)
            .build();

        let last = Rc::new(StdRefCell::new(StyleSnapshot::default()));
        let last2 = last.clone();
        style.set_consumer(move |snapshot| *last2.borrow_mut() = snapshot.clone());

        width.set_value(11.0);
        {
            let snapshot = last.borrow();
            assert_eq!(snapshot.get("width").and_then(|v| v.as_number()), Some(11.0));
            assert_eq!(snapshot.get("height").and_then(|v| v.as_number()), Some(20.0));
        }

        height.set_value(21.0);
        let snapshot = last.borrow();
        assert_eq!(snapshot.get("width").and_then(|v| v.as_number()), Some(11.0));
        assert_eq!(snapshot.get("height").and_then(|v| v.as_number()), Some(21.0));
    }

    #[test]
    fn test_transform_preserves_op_order() {
        let x = Value::new(5.0);
        let scale = Value::new(2.0);
        let transform = TransformNode::builder()
            .translate_x(&x)
            .scale(&scale)
            .literal(TransformKind::Rotate, "45deg")
            .build();

        let ops = transform.ops();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].kind, TransformKind::TranslateX);
        assert_eq!(ops[0].value.as_number(), Some(5.0));
        assert_eq!(ops[1].kind, TransformKind::Scale);
        assert_eq!(ops[2].value.as_text(), Some("45deg"));
    }

    struct Probe {
        applied: StdRefCell<Vec<PropertyBag>>,
        accepts: bool,
        renders: StdRefCell<usize>,
    }

    impl Probe {
        fn new(accepts: bool) -> Rc<Self> {
            Rc::new(Self {
                applied: StdRefCell::new(Vec::new()),
                accepts,
                renders: StdRefCell::new(0),
            })
        }
    }

    impl RenderTarget for Probe {
        fn try_apply_props(&self, props: &PropertyBag) -> bool {
            if self.accepts {
                self.applied.borrow_mut().push(props.clone());
            }
            self.accepts
        }

        fn request_render(&self) {
            *self.renders.borrow_mut() += 1;
        }
    }

    #[test]
    fn test_props_push_to_target() {
        let opacity = Value::new(0.0);
        let style = StyleNode::builder().node("opacity", &opacity).build();
        let props = PropsNode::builder()
            .style(&style)
            .literal("test_id", "card")
            .build();

        let probe = Probe::new(true);
        props.connect(probe.clone());
        assert_eq!(probe.applied.borrow().len(), 1);

        opacity.set_value(1.0);
        let applied = probe.applied.borrow();
        assert_eq!(applied.len(), 2);
        let style_snapshot = applied[1].get("style").and_then(|v| v.as_style()).unwrap();
        assert_eq!(
            style_snapshot.get("opacity").and_then(|v| v.as_number()),
            Some(1.0)
        );
    }

    #[test]
    fn test_props_fallback_requests_render() {
        let opacity = Value::new(0.0);
        let props = PropsNode::builder().node("opacity", &opacity).build();

        let probe = Probe::new(false);
        props.connect(probe.clone());
        opacity.set_value(0.5);
        assert_eq!(*probe.renders.borrow(), 2);
        assert!(probe.applied.borrow().is_empty());
    }

    #[test]
    fn test_disconnect_stops_updates() {
        let opacity = Value::new(0.0);
        let props = PropsNode::builder().node("opacity", &opacity).build();

        let probe = Probe::new(true);
        props.connect(probe.clone());
        props.disconnect();

        opacity.set_value(0.5);
        assert_eq!(probe.applied.borrow().len(), 1);
    }

    #[test]
    fn test_shared_value_updates_both_sinks_once() {
        let shared = Value::new(0.0);
        let style_a = StyleNode::builder().node("opacity", &shared).build();
        let style_b = StyleNode::builder().node("translate", &shared).build();

        let count = Rc::new(StdRefCell::new((0usize, 0usize)));
        let count_a = count.clone();
        style_a.set_consumer(move |_| count_a.borrow_mut().0 += 1);
        let count_b = count.clone();
        style_b.set_consumer(move |_| count_b.borrow_mut().1 += 1);

        shared.set_value(1.0);
        assert_eq!(*count.borrow(), (1, 1));
    }
}
