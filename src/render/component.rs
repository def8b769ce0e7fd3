// ============================================================================
// spark-view - Components
// Render functions with state and lifecycle hooks
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::store::{Object, Value};
use crate::vdom::backend::NodeId;
use crate::vdom::patch::InsertQueue;
use crate::vdom::vnode::VNode;

// =============================================================================
// SCOPE
// =============================================================================

/// What a render function and hooks see: the instance's observed `data`
/// and its shallowly reactive `props`.
#[derive(Clone, Debug)]
pub struct Scope {
    data: Object,
    props: Object,
}

impl Scope {
    pub(crate) fn new(data: Object, props: Object) -> Self {
        Scope { data, props }
    }

    pub fn data(&self) -> &Object {
        &self.data
    }

    pub fn props(&self) -> &Object {
        &self.props
    }

    /// Read a data field (tracked).
    pub fn get(&self, key: &str) -> Value {
        self.data.get(key)
    }

    /// Read a prop (tracked).
    pub fn prop(&self, key: &str) -> Value {
        self.props.get(key)
    }

    /// Write a data field.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.data.set(key, value);
    }
}

// =============================================================================
// COMPONENT
// =============================================================================

/// A renderable unit.
///
/// `render` runs inside the instance's render watcher, so every reactive
/// read it makes schedules a re-render when written. Hooks run untracked.
pub trait Component: 'static {
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Initial state; observed deeply when the instance is created.
    fn data(&self) -> Object {
        Object::new()
    }

    fn render(&self, scope: &Scope) -> Result<VNode>;

    fn mounted(&self, _scope: &Scope) {}

    fn before_update(&self, _scope: &Scope) {}

    fn updated(&self, _scope: &Scope) {}

    fn destroyed(&self, _scope: &Scope) {}
}

type ScopeHook = Box<dyn Fn(&Scope)>;

/// A [`Component`] assembled from closures.
///
/// ```
/// use spark_view::{Component, FnComponent, Object, VNode};
///
/// let counter = FnComponent::new("counter", |scope| {
///     Ok(VNode::element("span").text_content(scope.get("n").to_string()))
/// })
/// .with_data(|| Object::from_pairs([("n", 0)]))
/// .build();
/// assert_eq!(counter.name(), "counter");
/// ```
pub struct FnComponent {
    name: String,
    data: Option<Box<dyn Fn() -> Object>>,
    render: Box<dyn Fn(&Scope) -> Result<VNode>>,
    mounted: Option<ScopeHook>,
    before_update: Option<ScopeHook>,
    updated: Option<ScopeHook>,
    destroyed: Option<ScopeHook>,
}

impl FnComponent {
    pub fn new(name: impl Into<String>, render: impl Fn(&Scope) -> Result<VNode> + 'static) -> Self {
        FnComponent {
            name: name.into(),
            data: None,
            render: Box::new(render),
            mounted: None,
            before_update: None,
            updated: None,
            destroyed: None,
        }
    }

    pub fn with_data(mut self, data: impl Fn() -> Object + 'static) -> Self {
        self.data = Some(Box::new(data));
        self
    }

    pub fn on_mounted(mut self, hook: impl Fn(&Scope) + 'static) -> Self {
        self.mounted = Some(Box::new(hook));
        self
    }

    pub fn on_before_update(mut self, hook: impl Fn(&Scope) + 'static) -> Self {
        self.before_update = Some(Box::new(hook));
        self
    }

    pub fn on_updated(mut self, hook: impl Fn(&Scope) + 'static) -> Self {
        self.updated = Some(Box::new(hook));
        self
    }

    pub fn on_destroyed(mut self, hook: impl Fn(&Scope) + 'static) -> Self {
        self.destroyed = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Rc<dyn Component> {
        Rc::new(self)
    }
}

impl Component for FnComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn data(&self) -> Object {
        self.data.as_ref().map_or_else(Object::new, |f| f())
    }

    fn render(&self, scope: &Scope) -> Result<VNode> {
        (self.render)(scope)
    }

    fn mounted(&self, scope: &Scope) {
        if let Some(hook) = &self.mounted {
            hook(scope);
        }
    }

    fn before_update(&self, scope: &Scope) {
        if let Some(hook) = &self.before_update {
            hook(scope);
        }
    }

    fn updated(&self, scope: &Scope) {
        if let Some(hook) = &self.updated {
            hook(scope);
        }
    }

    fn destroyed(&self, scope: &Scope) {
        if let Some(hook) = &self.destroyed {
            hook(scope);
        }
    }
}

impl fmt::Debug for FnComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComponent").field("name", &self.name).finish()
    }
}

// =============================================================================
// MOUNTED COMPONENT
// =============================================================================

/// A live child instance as seen by the patcher, independent of the backend
/// type.
pub trait MountedComponent {
    fn name(&self) -> String;

    /// Current root node of the instance's rendered tree.
    fn root(&self) -> Option<NodeId>;

    /// Push new prop values from a re-rendered parent.
    fn update_props(&self, props: &BTreeMap<Rc<str>, Value>);

    /// `mounted` hooks collected by the instance's first patch.
    fn take_pending_inserts(&self) -> InsertQueue;

    fn call_mounted(&self);

    /// Stop rendering and run destroy hooks over the rendered tree. Backend
    /// nodes are left for the caller to remove.
    fn destroy(&self);
}
