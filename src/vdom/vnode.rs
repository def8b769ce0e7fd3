// ============================================================================
// spark-view - Tree Snapshot
// Virtual nodes, their builders, and the "same logical node" test
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::backend::{Event, Handler, NodeId};
use crate::render::component::{Component, MountedComponent};
use crate::store::Value;

// =============================================================================
// KEYS & KINDS
// =============================================================================

/// Identity of a node among its siblings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
}

impl Key {
    /// Key from a value: strings and integral numbers qualify.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Str(s) => Some(Key::Str(s.clone())),
            Value::Number(_) => value.as_i64().map(Key::Int),
            _ => None,
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Rc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(Rc::from(s))
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Int(n.into())
    }
}

/// Indices beyond `i64::MAX` become string keys instead of wrapping.
impl From<usize> for Key {
    fn from(n: usize) -> Self {
        match i64::try_from(n) {
            Ok(n) => Key::Int(n),
            Err(_) => Key::Str(Rc::from(n.to_string())),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => write!(f, "{s}"),
            Key::Int(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VNodeKind {
    Element,
    Text,
    Comment,
    /// Placeholder that instantiates a child component
    Component,
    /// Sibling list; flattened into the parent's children when attached
    Fragment,
}

// =============================================================================
// DATA
// =============================================================================

/// Attributes, properties, classes, styles and listeners of an element.
/// Ordered maps keep the emitted backend operations deterministic.
#[derive(Clone, Default)]
pub struct VNodeData {
    pub attrs: BTreeMap<Rc<str>, Rc<str>>,
    pub props: BTreeMap<Rc<str>, Value>,
    pub class: BTreeMap<Rc<str>, bool>,
    pub style: BTreeMap<Rc<str>, Rc<str>>,
    pub on: BTreeMap<Rc<str>, Handler>,
}

impl fmt::Debug for VNodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNodeData")
            .field("attrs", &self.attrs)
            .field("props", &self.props)
            .field("class", &self.class)
            .field("style", &self.style)
            .field("on", &self.on.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A component placeholder's definition, props and, once patched, the
/// live child instance.
#[derive(Clone)]
pub struct ComponentSlot {
    pub def: Rc<dyn Component>,
    pub props: BTreeMap<Rc<str>, Value>,
    pub instance: Option<Rc<dyn MountedComponent>>,
}

impl ComponentSlot {
    fn def_addr(&self) -> usize {
        Rc::as_ptr(&self.def) as *const () as usize
    }
}

// =============================================================================
// VNODE
// =============================================================================

/// One node of a tree snapshot.
///
/// Snapshots are built fresh by every render; only `elm` (and a component's
/// `instance`) are filled in by the patcher when the node is materialized.
#[derive(Clone)]
pub struct VNode {
    pub kind: VNodeKind,
    pub tag: Option<Rc<str>>,
    pub key: Option<Key>,
    pub data: Option<VNodeData>,
    pub children: Vec<VNode>,
    pub text: Option<Rc<str>>,
    pub elm: Option<NodeId>,
    pub is_static: bool,
    pub component: Option<ComponentSlot>,
}

impl VNode {
    fn blank(kind: VNodeKind) -> Self {
        VNode {
            kind,
            tag: None,
            key: None,
            data: None,
            children: Vec::new(),
            text: None,
            elm: None,
            is_static: false,
            component: None,
        }
    }

    pub fn element(tag: impl Into<Rc<str>>) -> Self {
        VNode {
            tag: Some(tag.into()),
            ..Self::blank(VNodeKind::Element)
        }
    }

    pub fn text(text: impl Into<Rc<str>>) -> Self {
        VNode {
            text: Some(text.into()),
            ..Self::blank(VNodeKind::Text)
        }
    }

    pub fn comment(text: impl Into<Rc<str>>) -> Self {
        VNode {
            text: Some(text.into()),
            ..Self::blank(VNodeKind::Comment)
        }
    }

    /// Placeholder for "nothing rendered".
    pub fn empty() -> Self {
        Self::comment("")
    }

    /// A sibling list. Unkeyed elements in it get positional keys when it
    /// is attached to a parent.
    pub fn fragment(children: impl IntoIterator<Item = VNode>) -> Self {
        VNode {
            children: children.into_iter().collect(),
            ..Self::blank(VNodeKind::Fragment)
        }
    }

    /// Placeholder for a child component.
    pub fn component(def: Rc<dyn Component>) -> Self {
        VNode {
            tag: Some(Rc::from(def.name())),
            component: Some(ComponentSlot {
                def,
                props: BTreeMap::new(),
                instance: None,
            }),
            ..Self::blank(VNodeKind::Component)
        }
    }

    // =========================================================================
    // BUILDERS
    // =========================================================================

    fn data_mut(&mut self) -> &mut VNodeData {
        self.data.get_or_insert_with(VNodeData::default)
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<Rc<str>>, value: impl Into<Rc<str>>) -> Self {
        self.data_mut().attrs.insert(name.into(), value.into());
        self
    }

    /// A backend property on elements, a prop on component placeholders.
    pub fn prop(mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        match self.component.as_mut() {
            Some(slot) => {
                slot.props.insert(name.into(), value.into());
            }
            None => {
                self.data_mut().props.insert(name.into(), value.into());
            }
        }
        self
    }

    pub fn class(mut self, name: impl Into<Rc<str>>, enabled: bool) -> Self {
        self.data_mut().class.insert(name.into(), enabled);
        self
    }

    pub fn style(mut self, name: impl Into<Rc<str>>, value: impl Into<Rc<str>>) -> Self {
        self.data_mut().style.insert(name.into(), value.into());
        self
    }

    pub fn on(mut self, event: impl Into<Rc<str>>, handler: impl Fn(&Event) + 'static) -> Self {
        self.data_mut().on.insert(event.into(), Rc::new(handler));
        self
    }

    /// Element whose whole content is `text` (no child nodes).
    pub fn text_content(mut self, text: impl Into<Rc<str>>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Mark the subtree as never changing; a patch reuses it untouched.
    pub fn mark_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn child(self, child: VNode) -> Self {
        self.children([child])
    }

    /// Append children, flattening fragments and merging adjacent text.
    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        let base = self.children.len();
        for (i, child) in children.into_iter().enumerate() {
            push_normalized(&mut self.children, child, &format!("{}", base + i));
        }
        self
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn is_element(&self) -> bool {
        self.kind == VNodeKind::Element
    }

    pub fn is_component(&self) -> bool {
        self.kind == VNodeKind::Component
    }

    /// The live node, looking through component placeholders to the child
    /// instance's current root.
    pub fn live_elm(&self) -> Option<NodeId> {
        match self.component.as_ref().and_then(|slot| slot.instance.as_ref()) {
            Some(instance) => instance.root(),
            None => self.elm,
        }
    }

    pub(crate) fn component_addr(&self) -> Option<usize> {
        self.component.as_ref().map(ComponentSlot::def_addr)
    }

    fn input_type(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.attrs.get("type"))
            .map(|t| &**t)
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        s.field("kind", &self.kind);
        if let Some(tag) = &self.tag {
            s.field("tag", tag);
        }
        if let Some(key) = &self.key {
            s.field("key", key);
        }
        if let Some(text) = &self.text {
            s.field("text", text);
        }
        if let Some(elm) = &self.elm {
            s.field("elm", elm);
        }
        if !self.children.is_empty() {
            s.field("children", &self.children);
        }
        s.finish()
    }
}

/// Push `child`, flattening fragments (their unkeyed elements get
/// `__vlist{path}_{i}__` keys) and merging adjacent text nodes.
fn push_normalized(out: &mut Vec<VNode>, child: VNode, path: &str) {
    match child.kind {
        VNodeKind::Fragment => {
            for (i, mut item) in child.children.into_iter().enumerate() {
                let nested = format!("{path}_{i}");
                if item.key.is_none() && matches!(item.kind, VNodeKind::Element | VNodeKind::Component) {
                    item.key = Some(Key::Str(Rc::from(format!("__vlist{nested}__"))));
                }
                push_normalized(out, item, &nested);
            }
        }
        VNodeKind::Text => {
            if let Some(last) = out.last_mut() {
                if last.kind == VNodeKind::Text && last.elm.is_none() {
                    let merged = format!(
                        "{}{}",
                        last.text.as_deref().unwrap_or(""),
                        child.text.as_deref().unwrap_or("")
                    );
                    last.text = Some(Rc::from(merged));
                    return;
                }
            }
            out.push(child);
        }
        _ => out.push(child),
    }
}

// =============================================================================
// SAME LOGICAL NODE
// =============================================================================

fn is_text_input_type(t: &str) -> bool {
    matches!(t, "text" | "number" | "password" | "search" | "email" | "tel" | "url")
}

fn same_input_type(a: &VNode, b: &VNode) -> bool {
    if a.tag.as_deref() != Some("input") {
        return true;
    }
    match (a.input_type(), b.input_type()) {
        (x, y) if x == y => true,
        (Some(x), Some(y)) => is_text_input_type(x) && is_text_input_type(y),
        _ => false,
    }
}

/// Whether `b` can be patched into `a`'s live node instead of replacing it:
/// key, kind, tag, component definition, data presence and (for inputs)
/// the `type` attribute must agree.
pub fn same_vnode(a: &VNode, b: &VNode) -> bool {
    a.key == b.key
        && a.kind == b.kind
        && a.tag == b.tag
        && a.component_addr() == b.component_addr()
        && a.data.is_some() == b.data.is_some()
        && same_input_type(a, b)
}

// =============================================================================
// TESTS
// =============================================================================
