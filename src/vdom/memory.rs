// ============================================================================
// spark-view - Memory Backend
// In-memory node arena with an operation log
// ============================================================================
//
// Used by tests and headless hosts. Every mutating call is appended to an
// op log so callers can assert exactly what a patch did; `to_html` renders
// a subtree for readable assertions.
// ============================================================================

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::rc::Rc;

use tracing::trace;

use super::backend::{Backend, Event, Handler, NodeId, NodeType};
use crate::error::BackendError;
use crate::store::Value;

// =============================================================================
// OPERATION LOG
// =============================================================================

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    CreateComment { node: NodeId, text: String },
    InsertBefore { parent: NodeId, node: NodeId, reference: Option<NodeId> },
    AppendChild { parent: NodeId, node: NodeId },
    RemoveChild { parent: NodeId, node: NodeId },
    SetText { node: NodeId, text: String },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetProperty { node: NodeId, name: String, value: Value },
    RemoveProperty { node: NodeId, name: String },
    SetStyle { node: NodeId, name: String, value: String },
    RemoveStyle { node: NodeId, name: String },
    AddListener { node: NodeId, name: String },
    RemoveListener { node: NodeId, name: String },
}

impl Op {
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            Op::CreateElement { .. } | Op::CreateText { .. } | Op::CreateComment { .. }
        )
    }
}

// =============================================================================
// NODES
// =============================================================================

struct MemNode {
    kind: NodeType,
    tag: Option<Rc<str>>,
    text: String,
    attrs: BTreeMap<String, String>,
    props: BTreeMap<String, Value>,
    style: BTreeMap<String, String>,
    listeners: BTreeMap<String, Handler>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl MemNode {
    fn new(kind: NodeType, tag: Option<Rc<str>>, text: &str) -> Self {
        MemNode {
            kind,
            tag,
            text: text.to_string(),
            attrs: BTreeMap::new(),
            props: BTreeMap::new(),
            style: BTreeMap::new(),
            listeners: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-backed [`Backend`].
#[derive(Default)]
pub struct MemoryBackend {
    nodes: RefCell<Vec<MemNode>>,
    ops: RefCell<Vec<Op>>,
    rejected: RefCell<HashSet<String>>,
}

impl MemoryBackend {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn record(&self, op: Op) {
        trace!(?op, "backend op");
        self.ops.borrow_mut().push(op);
    }

    fn alloc(&self, node: MemNode) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        NodeId((nodes.len() - 1) as u32)
    }

    fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&MemNode) -> R) -> Option<R> {
        self.nodes.borrow().get(id.0 as usize).map(f)
    }

    fn with_node_mut<R>(&self, id: NodeId, f: impl FnOnce(&mut MemNode) -> R) -> Option<R> {
        self.nodes.borrow_mut().get_mut(id.0 as usize).map(f)
    }

    fn detach(nodes: &mut [MemNode], node: NodeId) {
        let parent = nodes.get(node.0 as usize).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(p) = nodes.get_mut(parent.0 as usize) {
                p.children.retain(|c| *c != node);
            }
        }
        if let Some(n) = nodes.get_mut(node.0 as usize) {
            n.parent = None;
        }
    }

    // =========================================================================
    // OP LOG
    // =========================================================================

    /// Every recorded call since the last [`clear_ops`](Self::clear_ops).
    pub fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    /// Recorded calls that changed an existing tree (everything but creation).
    pub fn mutation_count(&self) -> usize {
        self.ops.borrow().iter().filter(|op| !op.is_create()).count()
    }

    /// Recorded node creations.
    pub fn created_count(&self) -> usize {
        self.ops.borrow().iter().filter(|op| op.is_create()).count()
    }

    // =========================================================================
    // FIXTURES & INSPECTION
    // =========================================================================

    /// Make `set_attribute(name, ..)` fail from now on.
    pub fn reject_attribute(&self, name: &str) {
        self.rejected.borrow_mut().insert(name.to_string());
    }

    /// Build an element with `children` already appended (hydration fixtures).
    pub fn build_element(&self, tag: &str, attrs: &[(&str, &str)], children: &[NodeId]) -> NodeId {
        let el = self.create_element(tag);
        for (name, value) in attrs {
            self.with_node_mut(el, |n| n.attrs.insert(name.to_string(), value.to_string()));
        }
        for child in children {
            self.append_child(el, *child);
        }
        el
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.with_node(node, |n| n.children.clone()).unwrap_or_default()
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.parent_node(node).is_some()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.get_attribute(node, name)
    }

    pub fn property(&self, node: NodeId, name: &str) -> Option<Value> {
        self.with_node(node, |n| n.props.get(name).cloned()).flatten()
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.with_node(node, |n| n.listeners.len()).unwrap_or(0)
    }

    /// Invoke the listener for `name` on `node`. Returns whether one ran.
    pub fn dispatch_event(&self, node: NodeId, name: &str, detail: Value) -> bool {
        let listener = self.with_node(node, |n| n.listeners.get(name).cloned()).flatten();
        match listener {
            Some(listener) => {
                listener(&Event {
                    name: Rc::from(name),
                    target: node,
                    detail,
                });
                true
            }
            None => false,
        }
    }

    /// Serialize a subtree. Attributes render sorted, followed by `style`.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let nodes = self.nodes.borrow();
        let Some(n) = nodes.get(node.0 as usize) else {
            return;
        };
        match n.kind {
            NodeType::Text => out.push_str(&n.text),
            NodeType::Comment => {
                let _ = write!(out, "<!--{}-->", n.text);
            }
            NodeType::Element => {
                let tag = n.tag.clone().unwrap_or_else(|| Rc::from("div"));
                let _ = write!(out, "<{tag}");
                for (name, value) in &n.attrs {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                if !n.style.is_empty() {
                    let style: Vec<String> = n.style.iter().map(|(k, v)| format!("{k}:{v}")).collect();
                    let _ = write!(out, " style=\"{}\"", style.join(";"));
                }
                out.push('>');
                let children = n.children.clone();
                let text = n.text.clone();
                drop(nodes);
                if children.is_empty() {
                    out.push_str(&text);
                }
                for child in children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

// =============================================================================
// BACKEND
// =============================================================================

impl Backend for MemoryBackend {
    fn create_element(&self, tag: &str) -> NodeId {
        let node = self.alloc(MemNode::new(NodeType::Element, Some(Rc::from(tag)), ""));
        self.record(Op::CreateElement {
            node,
            tag: tag.to_string(),
        });
        node
    }

    fn create_text_node(&self, text: &str) -> NodeId {
        let node = self.alloc(MemNode::new(NodeType::Text, None, text));
        self.record(Op::CreateText {
            node,
            text: text.to_string(),
        });
        node
    }

    fn create_comment(&self, text: &str) -> NodeId {
        let node = self.alloc(MemNode::new(NodeType::Comment, None, text));
        self.record(Op::CreateComment {
            node,
            text: text.to_string(),
        });
        node
    }

    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        {
            let mut nodes = self.nodes.borrow_mut();
            let len = nodes.len() as u32;
            if parent.0 >= len || node.0 >= len || parent == node {
                return;
            }
            Self::detach(&mut nodes, node);
            let siblings = &mut nodes[parent.0 as usize].children;
            let at = reference
                .and_then(|r| siblings.iter().position(|c| *c == r))
                .unwrap_or(siblings.len());
            siblings.insert(at, node);
            nodes[node.0 as usize].parent = Some(parent);
        }
        self.record(Op::InsertBefore {
            parent,
            node,
            reference,
        });
    }

    fn remove_child(&self, parent: NodeId, node: NodeId) {
        if self.parent_node(node) != Some(parent) {
            return;
        }
        Self::detach(&mut self.nodes.borrow_mut(), node);
        self.record(Op::RemoveChild { parent, node });
    }

    fn append_child(&self, parent: NodeId, node: NodeId) {
        {
            let mut nodes = self.nodes.borrow_mut();
            let len = nodes.len() as u32;
            if parent.0 >= len || node.0 >= len || parent == node {
                return;
            }
            Self::detach(&mut nodes, node);
            nodes[parent.0 as usize].children.push(node);
            nodes[node.0 as usize].parent = Some(parent);
        }
        self.record(Op::AppendChild { parent, node });
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.with_node(node, |n| n.parent).flatten()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent_node(node)?;
        let siblings = self.children(parent);
        let at = siblings.iter().position(|c| *c == node)?;
        siblings.get(at + 1).copied()
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.with_node(node, |n| n.children.first().copied()).flatten()
    }

    fn node_type(&self, node: NodeId) -> Option<NodeType> {
        self.with_node(node, |n| n.kind)
    }

    fn tag_name(&self, node: NodeId) -> Option<Rc<str>> {
        self.with_node(node, |n| n.tag.clone()).flatten()
    }

    fn set_text_content(&self, node: NodeId, text: &str) {
        {
            let mut nodes = self.nodes.borrow_mut();
            let Some(n) = nodes.get_mut(node.0 as usize) else {
                return;
            };
            n.text = text.to_string();
            let children = std::mem::take(&mut n.children);
            for child in children {
                if let Some(c) = nodes.get_mut(child.0 as usize) {
                    c.parent = None;
                }
            }
        }
        self.record(Op::SetText {
            node,
            text: text.to_string(),
        });
    }

    fn text_content(&self, node: NodeId) -> String {
        let (own, children) = self
            .with_node(node, |n| (n.text.clone(), n.children.clone()))
            .unwrap_or_default();
        if children.is_empty() {
            return own;
        }
        children.into_iter().map(|c| self.text_content(c)).collect()
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), BackendError> {
        if self.rejected.borrow().contains(name) {
            return Err(BackendError::InvalidAttribute {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        self.with_node_mut(node, |n| n.attrs.insert(name.to_string(), value.to_string()))
            .ok_or(BackendError::UnknownNode(node.0))?;
        self.record(Op::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        if self.with_node_mut(node, |n| n.attrs.remove(name)).flatten().is_some() {
            self.record(Op::RemoveAttribute {
                node,
                name: name.to_string(),
            });
        }
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.with_node(node, |n| n.attrs.get(name).cloned()).flatten()
    }

    fn set_property(&self, node: NodeId, name: &str, value: &Value) -> Result<(), BackendError> {
        self.with_node_mut(node, |n| n.props.insert(name.to_string(), value.clone()))
            .ok_or(BackendError::UnknownNode(node.0))?;
        self.record(Op::SetProperty {
            node,
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn remove_property(&self, node: NodeId, name: &str) {
        if self.with_node_mut(node, |n| n.props.remove(name)).flatten().is_some() {
            self.record(Op::RemoveProperty {
                node,
                name: name.to_string(),
            });
        }
    }

    fn set_style(&self, node: NodeId, name: &str, value: &str) -> Result<(), BackendError> {
        self.with_node_mut(node, |n| n.style.insert(name.to_string(), value.to_string()))
            .ok_or(BackendError::UnknownNode(node.0))?;
        self.record(Op::SetStyle {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_style(&self, node: NodeId, name: &str) {
        if self.with_node_mut(node, |n| n.style.remove(name)).flatten().is_some() {
            self.record(Op::RemoveStyle {
                node,
                name: name.to_string(),
            });
        }
    }

    fn add_event_listener(&self, node: NodeId, name: &str, listener: Handler) {
        if self
            .with_node_mut(node, |n| n.listeners.insert(name.to_string(), listener))
            .is_some()
        {
            self.record(Op::AddListener {
                node,
                name: name.to_string(),
            });
        }
    }

    fn remove_event_listener(&self, node: NodeId, name: &str) {
        if self.with_node_mut(node, |n| n.listeners.remove(name)).flatten().is_some() {
            self.record(Op::RemoveListener {
                node,
                name: name.to_string(),
            });
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
