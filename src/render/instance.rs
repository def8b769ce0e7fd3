// ============================================================================
// spark-view - Instances
// A component bound to a render watcher and a patcher
// ============================================================================
//
// The render watcher's getter renders a fresh snapshot and patches it
// against the previous one. Reading state during render subscribes the
// watcher; writing that state queues it, and the scheduler re-renders once
// per flush. Children are instantiated by the patcher while it walks the
// parent's snapshot, after the parent's watcher exists, so they always flush
// after their parent.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::component::{Component, MountedComponent, Scope};
use crate::error::{handle_error, Error};
use crate::reactivity::batching::untrack;
use crate::reactivity::watcher::{Watcher, WatcherOptions};
use crate::store::{observe, Object, Value};
use crate::vdom::backend::{Backend, NodeId};
use crate::vdom::patch::{InsertQueue, PatchTarget, Patcher};
use crate::vdom::vnode::{VNode, VNodeKind};

/// Where a root instance's first render goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountTarget {
    /// Build a detached tree
    Detached,
    /// Build a tree and append it to this element
    AppendTo(NodeId),
    /// Replace this element
    Replace(NodeId),
    /// Adopt this pre-built tree, rebuilding it on mismatch
    Hydrate(NodeId),
}

// =============================================================================
// INSTANCE STATE
// =============================================================================

struct InstanceInner<B: Backend> {
    component: Rc<dyn Component>,
    scope: Scope,
    patcher: Patcher<B>,
    is_child: bool,
    /// Last patched snapshot
    vnode: RefCell<Option<VNode>>,
    /// Consumed by the first render
    target: RefCell<Option<PatchTarget>>,
    watcher: RefCell<Option<Watcher>>,
    pending_inserts: RefCell<InsertQueue>,
    mounted: Cell<bool>,
    destroyed: Cell<bool>,
}

impl<B: Backend> InstanceInner<B> {
    fn new(
        component: Rc<dyn Component>,
        props: &BTreeMap<Rc<str>, Value>,
        patcher: &Patcher<B>,
        target: Option<PatchTarget>,
        is_child: bool,
    ) -> Rc<Self> {
        let data = untrack(|| component.data());
        observe(&Value::from(data.clone()));

        // Observed while empty so later keys are tracked, then filled shallowly
        let prop_obj = Object::new();
        observe(&Value::from(prop_obj.clone()));
        for (key, value) in props {
            prop_obj.define_reactive_shallow(key, value.clone());
        }

        let inner = Rc::new(InstanceInner {
            component,
            scope: Scope::new(data, prop_obj),
            patcher: patcher.clone(),
            is_child,
            vnode: RefCell::new(None),
            target: RefCell::new(target),
            watcher: RefCell::new(None),
            pending_inserts: RefCell::new(Vec::new()),
            mounted: Cell::new(false),
            destroyed: Cell::new(false),
        });

        let watcher = Watcher::new(
            Box::new(render_getter(Rc::downgrade(&inner))),
            None,
            WatcherOptions {
                render: true,
                expression: Some(format!("render <{}>", inner.component.name())),
                before: Some(Box::new(lifecycle_hook(Rc::downgrade(&inner), |c, s| c.before_update(s)))),
                updated: Some(Box::new(lifecycle_hook(Rc::downgrade(&inner), |c, s| c.updated(s)))),
                ..WatcherOptions::default()
            },
        );
        *inner.watcher.borrow_mut() = Some(watcher);
        inner
    }

    fn name(&self) -> &str {
        self.component.name()
    }

    /// Render and patch. Runs inside the render watcher.
    fn update(&self) {
        let previous = self.vnode.borrow_mut().take();
        let rendered = match self.component.render(&self.scope) {
            Ok(vnode) if vnode.kind == VNodeKind::Fragment => Err(Error::msg(
                "render must return a single root node, not a fragment",
            )),
            other => other,
        };

        let mut vnode = match rendered {
            Ok(vnode) => vnode,
            Err(err) => {
                handle_error(
                    &Error::Render {
                        component: self.name().to_string(),
                        message: err.to_string(),
                    },
                    "render",
                );
                match previous {
                    // Keep what is on screen
                    Some(previous) => {
                        *self.vnode.borrow_mut() = Some(previous);
                        return;
                    }
                    None => VNode::empty(),
                }
            }
        };

        let initial = previous.is_none();
        let old = match previous {
            Some(previous) => Some(PatchTarget::VNode(previous)),
            None => self.target.borrow_mut().take(),
        };

        let result = if initial && self.is_child {
            // The parent collects these and runs them once it is inserted
            let mut queue = InsertQueue::new();
            let result = self.patcher.patch_deferred(old, &mut vnode, &mut queue);
            *self.pending_inserts.borrow_mut() = queue;
            result
        } else {
            self.patcher.patch(old, &mut vnode)
        };
        if let Err(err) = result {
            handle_error(&err, "patch");
        }
        *self.vnode.borrow_mut() = Some(vnode);
    }

    fn watcher(&self) -> Option<Watcher> {
        self.watcher.borrow().clone()
    }

    /// Mark destroyed and stop the render watcher. False if already done.
    fn shutdown(&self) -> bool {
        if self.destroyed.replace(true) {
            return false;
        }
        debug!(component = self.name(), "destroying instance");
        if let Some(watcher) = self.watcher() {
            watcher.teardown();
        }
        true
    }
}

fn render_getter<B: Backend>(weak: Weak<InstanceInner<B>>) -> impl FnMut() -> crate::Result<Value> + 'static {
    move || {
        if let Some(inner) = weak.upgrade() {
            inner.update();
        }
        Ok(Value::Null)
    }
}

fn lifecycle_hook<B: Backend>(
    weak: Weak<InstanceInner<B>>,
    hook: impl Fn(&dyn Component, &Scope) + 'static,
) -> impl FnMut() + 'static {
    move || {
        if let Some(inner) = weak.upgrade() {
            if inner.mounted.get() && !inner.destroyed.get() {
                untrack(|| hook(&*inner.component, &inner.scope));
            }
        }
    }
}

impl<B: Backend> MountedComponent for InstanceInner<B> {
    fn name(&self) -> String {
        self.component.name().to_string()
    }

    fn root(&self) -> Option<NodeId> {
        self.vnode.borrow().as_ref().and_then(VNode::live_elm)
    }

    fn update_props(&self, props: &BTreeMap<Rc<str>, Value>) {
        // Runs inside the parent's render; none of this is the parent's dependency
        untrack(|| {
            let current = self.scope.props();
            for (key, value) in props {
                if current.has(key) {
                    current.set(key, value.clone());
                } else {
                    current.define_reactive_shallow(key, value.clone());
                    if let Some(ob) = current.observer() {
                        ob.dep().notify();
                    }
                }
            }
            for key in current.keys() {
                if !props.contains_key(&key) {
                    current.set(&key, Value::Null);
                }
            }
        });
    }

    fn take_pending_inserts(&self) -> InsertQueue {
        std::mem::take(&mut *self.pending_inserts.borrow_mut())
    }

    fn call_mounted(&self) {
        if self.destroyed.get() || self.mounted.replace(true) {
            return;
        }
        untrack(|| self.component.mounted(&self.scope));
    }

    fn destroy(&self) {
        if !self.shutdown() {
            return;
        }
        if let Some(vnode) = self.vnode.borrow().as_ref() {
            self.patcher.invoke_destroy_hook(vnode);
        }
        untrack(|| self.component.destroyed(&self.scope));
    }
}

// =============================================================================
// PUBLIC HANDLE
// =============================================================================

/// A mounted root component.
///
/// Dropping the handle stops re-rendering; the backend tree stays where it
/// is. [`Instance::destroy`] also removes it.
pub struct Instance<B: Backend> {
    inner: Rc<InstanceInner<B>>,
}

/// Mount `component` with no props.
pub fn mount<B: Backend>(component: Rc<dyn Component>, patcher: &Patcher<B>, target: MountTarget) -> Instance<B> {
    mount_with_props(component, &BTreeMap::new(), patcher, target)
}

/// Mount `component`, render it once and run its `mounted` hook.
pub fn mount_with_props<B: Backend>(
    component: Rc<dyn Component>,
    props: &BTreeMap<Rc<str>, Value>,
    patcher: &Patcher<B>,
    target: MountTarget,
) -> Instance<B> {
    let patch_target = match target {
        MountTarget::Detached | MountTarget::AppendTo(_) => None,
        MountTarget::Replace(elm) => Some(PatchTarget::Element(elm)),
        MountTarget::Hydrate(elm) => Some(PatchTarget::Hydrate(elm)),
    };
    let inner = InstanceInner::new(component, props, patcher, patch_target, false);

    if let MountTarget::AppendTo(parent) = target {
        if let Some(root) = inner.root() {
            patcher.backend().append_child(parent, root);
        }
    }
    inner.call_mounted();
    Instance { inner }
}

/// Instantiate a child component for a placeholder being patched.
pub(crate) fn create_child<B: Backend>(
    def: Rc<dyn Component>,
    props: &BTreeMap<Rc<str>, Value>,
    patcher: &Patcher<B>,
    hydrate: Option<NodeId>,
) -> Rc<dyn MountedComponent> {
    InstanceInner::new(def, props, patcher, hydrate.map(PatchTarget::Hydrate), true)
}

impl<B: Backend> Instance<B> {
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Current root node.
    pub fn root(&self) -> Option<NodeId> {
        self.inner.root()
    }

    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    pub fn data(&self) -> &Object {
        self.inner.scope.data()
    }

    pub fn props(&self) -> &Object {
        self.inner.scope.props()
    }

    /// Replace the root's props; a re-render is scheduled for changed ones.
    pub fn set_props(&self, props: &BTreeMap<Rc<str>, Value>) {
        self.inner.update_props(props);
    }

    pub fn watcher(&self) -> Option<Watcher> {
        self.inner.watcher()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Inspect the last patched snapshot.
    pub fn with_vnode<R>(&self, f: impl FnOnce(Option<&VNode>) -> R) -> R {
        f(self.inner.vnode.borrow().as_ref())
    }

    /// Queue a re-render without any state change.
    pub fn force_update(&self) {
        if let Some(watcher) = self.inner.watcher() {
            watcher.update();
        }
    }

    /// Stop rendering, tear the tree down and remove it from the backend.
    pub fn destroy(&self) {
        if !self.inner.shutdown() {
            return;
        }
        let vnode = self.inner.vnode.borrow_mut().take();
        if let Some(vnode) = vnode {
            self.inner.patcher.unmount(vnode);
        }
        untrack(|| self.inner.component.destroyed(&self.inner.scope));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{configure, reset_config};
    use crate::render::component::FnComponent;
    use crate::vdom::memory::MemoryBackend;

    fn sync() {
        configure(|cfg| cfg.async_flush = false);
    }

    fn counter() -> Rc<dyn Component> {
        FnComponent::new("counter", |scope| {
            Ok(VNode::element("p").child(VNode::text(scope.get("n").to_string())))
        })
        .with_data(|| Object::from_pairs([("n", 1)]))
        .build()
    }

    #[test]
    fn renders_and_rerenders_on_write() {
        sync();
        let b = MemoryBackend::new();
        let host = b.create_element("body");
        let app = mount(counter(), &Patcher::new(b.clone()), MountTarget::AppendTo(host));
        assert_eq!(b.to_html(host), "<body><p>1</p></body>");
        assert!(app.is_mounted());

        app.data().set("n", 2);
        assert_eq!(b.to_html(host), "<body><p>2</p></body>");
        reset_config();
    }

    #[test]
    fn render_error_keeps_previous_output() {
        sync();
        let errors = Rc::new(Cell::new(0));
        let e = errors.clone();
        configure(|cfg| cfg.error_handler = Some(Rc::new(move |err: &Error, _: &str| {
            assert!(matches!(err, Error::Render { component, .. } if component == "fragile"));
            e.set(e.get() + 1);
        })));

        let c = FnComponent::new("fragile", |scope| {
            let n = scope.get("n");
            if n == Value::from(0) {
                return Err(Error::msg("zero"));
            }
            Ok(VNode::element("b").text_content(n.to_string()))
        })
        .with_data(|| Object::from_pairs([("n", 1)]))
        .build();

        let b = MemoryBackend::new();
        let app = mount(c, &Patcher::new(b.clone()), MountTarget::Detached);
        let root = app.root().unwrap();
        b.clear_ops();

        app.data().set("n", 0);
        assert_eq!(errors.get(), 1);
        assert!(b.ops().is_empty());
        assert_eq!(b.to_html(root), "<b>1</b>");

        app.data().set("n", 3);
        assert_eq!(b.to_html(root), "<b>3</b>");
        reset_config();
    }

    #[test]
    fn first_render_failure_mounts_placeholder() {
        configure(|cfg| cfg.error_handler = Some(Rc::new(|_: &Error, _: &str| {})));
        let c = FnComponent::new("broken", |_| Err(Error::msg("boom"))).build();
        let b = MemoryBackend::new();
        let app = mount(c, &Patcher::new(b.clone()), MountTarget::Detached);
        assert_eq!(b.to_html(app.root().unwrap()), "<!---->");
        reset_config();
    }

    #[test]
    fn lifecycle_hooks_fire_in_order() {
        sync();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());
        let c = FnComponent::new("hooks", |scope| Ok(VNode::element("i").text_content(scope.get("n").to_string())))
            .with_data(|| Object::from_pairs([("n", 0)]))
            .on_mounted(move |_| l1.borrow_mut().push("mounted"))
            .on_before_update(move |_| l2.borrow_mut().push("before_update"))
            .on_updated(move |_| l3.borrow_mut().push("updated"))
            .on_destroyed(move |_| l4.borrow_mut().push("destroyed"))
            .build();

        let b = MemoryBackend::new();
        let host = b.create_element("body");
        let app = mount(c, &Patcher::new(b.clone()), MountTarget::AppendTo(host));
        app.data().set("n", 1);
        app.destroy();

        assert_eq!(*log.borrow(), vec!["mounted", "before_update", "updated", "destroyed"]);
        assert_eq!(b.to_html(host), "<body></body>");
        assert!(app.is_destroyed());
        reset_config();
    }

    #[test]
    fn force_update_rerenders_without_writes() {
        sync();
        let renders = Rc::new(Cell::new(0));
        let r = renders.clone();
        let c = FnComponent::new("plain", move |_| {
            r.set(r.get() + 1);
            Ok(VNode::element("div"))
        })
        .build();
        let b = MemoryBackend::new();
        let app = mount(c, &Patcher::new(b.clone()), MountTarget::Detached);
        app.force_update();
        assert_eq!(renders.get(), 2);
        reset_config();
    }

    #[test]
    fn replace_target_swaps_element() {
        let b = MemoryBackend::new();
        let host = b.create_element("body");
        let slot = b.create_element("div");
        b.append_child(host, slot);
        let app = mount(counter(), &Patcher::new(b.clone()), MountTarget::Replace(slot));
        assert_eq!(b.children(host), vec![app.root().unwrap()]);
        assert!(!b.is_attached(slot));
    }
}
