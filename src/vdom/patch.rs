// ============================================================================
// spark-view - Patcher
// Reconcile a new snapshot against the previous one (or a live element)
// ============================================================================
//
// The patcher mutates the backend as little as it can:
//
// - a node whose snapshot is "the same logical node" (`same_vnode`) is kept
//   and only its data, text and children are diffed
// - children are reconciled with a four-pointer scan that catches the
//   common shapes (append, remove, reverse, move one) before falling back to
//   a key lookup
// - anything else is created fresh next to the old node, which is then
//   removed through the modules' remove hooks
//
// Component instances created while patching are queued and get their
// `mounted` hook once the whole tree is in place.
// ============================================================================

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::trace;

use super::backend::{Backend, NodeId};
use super::modules::{default_modules, Module, RemoveHandle};
use super::vnode::{same_vnode, Key, VNode, VNodeKind};
use crate::error::{handle_error, warn, Error, Result};
use crate::render::component::MountedComponent;
use crate::render::instance::create_child;

/// What the new snapshot is reconciled against.
pub enum PatchTarget {
    /// The snapshot rendered last time
    VNode(VNode),
    /// An existing backend element to replace
    Element(NodeId),
    /// An existing backend tree to adopt; replaced if it does not match
    Hydrate(NodeId),
}

/// Component instances waiting for their `mounted` hook.
pub type InsertQueue = Vec<Rc<dyn MountedComponent>>;

/// Drives a [`Backend`] from snapshots.
pub struct Patcher<B: Backend> {
    backend: Rc<B>,
    modules: Rc<Vec<Box<dyn Module>>>,
}

impl<B: Backend> Clone for Patcher<B> {
    fn clone(&self) -> Self {
        Patcher {
            backend: self.backend.clone(),
            modules: self.modules.clone(),
        }
    }
}

impl<B: Backend> Patcher<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self::with_modules(backend, default_modules())
    }

    pub fn with_modules(backend: Rc<B>, modules: Vec<Box<dyn Module>>) -> Self {
        Patcher {
            backend,
            modules: Rc::new(modules),
        }
    }

    pub fn backend(&self) -> &Rc<B> {
        &self.backend
    }

    pub(crate) fn modules(&self) -> &[Box<dyn Module>] {
        &self.modules
    }

    fn ops(&self) -> &dyn Backend {
        &*self.backend
    }

    // =========================================================================
    // ENTRY POINTS
    // =========================================================================

    /// Patch `new` against `old` and return the resulting root node.
    ///
    /// `mounted` hooks of components created along the way run before this
    /// returns.
    pub fn patch(&self, old: Option<PatchTarget>, new: &mut VNode) -> Result<NodeId> {
        let mut queue = InsertQueue::new();
        let root = self.patch_deferred(old, new, &mut queue)?;
        invoke_insert_hooks(queue);
        Ok(root)
    }

    /// Like [`patch`](Self::patch) but hands the insert queue to the caller.
    pub(crate) fn patch_deferred(
        &self,
        old: Option<PatchTarget>,
        new: &mut VNode,
        queue: &mut InsertQueue,
    ) -> Result<NodeId> {
        match old {
            None => self.create_elm(new, queue, None, None)?,
            Some(PatchTarget::VNode(old)) => {
                if same_vnode(&old, new) {
                    self.patch_vnode(old, new, queue)?;
                } else {
                    self.replace(old, new, queue)?;
                }
            }
            Some(PatchTarget::Element(elm)) => self.replace_element(elm, new, queue)?,
            Some(PatchTarget::Hydrate(elm)) => {
                let mut adopted = InsertQueue::new();
                match self.hydrate(elm, new, &mut adopted) {
                    Ok(()) => queue.extend(adopted),
                    Err(err @ Error::HydrationMismatch { .. }) => {
                        handle_error(&err, "hydration");
                        drop(adopted);
                        self.reset_materialized(new);
                        self.replace_element(elm, new, queue)?;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        new.live_elm()
            .ok_or_else(|| Error::msg("patch produced no backend node"))
    }

    /// Remove a materialized snapshot from the backend and tear it down.
    pub fn unmount(&self, vnode: VNode) {
        self.remove_vnodes(vec![vnode]);
    }

    // =========================================================================
    // CREATION
    // =========================================================================

    pub(super) fn create_elm(
        &self,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
        parent: Option<NodeId>,
        reference: Option<NodeId>,
    ) -> Result<()> {
        let elm = match vnode.kind {
            VNodeKind::Component => {
                return self.create_component(vnode, queue, parent, reference, None);
            }
            VNodeKind::Fragment => {
                return Err(Error::msg(
                    "a fragment must be attached to a parent element before patching",
                ));
            }
            VNodeKind::Element => {
                let tag = vnode.tag.clone().unwrap_or_else(|| Rc::from("div"));
                let elm = self.backend.create_element(&tag);
                trace!(%elm, %tag, "created element");
                vnode.elm = Some(elm);

                match vnode.text.clone() {
                    Some(text) => self.backend.set_text_content(elm, &text),
                    None => self.create_children(elm, &mut vnode.children, queue)?,
                }
                if let Some(data) = &vnode.data {
                    for module in self.modules.iter() {
                        module.create(self.ops(), elm, data);
                    }
                }
                elm
            }
            VNodeKind::Text => self
                .backend
                .create_text_node(vnode.text.as_deref().unwrap_or("")),
            VNodeKind::Comment => self
                .backend
                .create_comment(vnode.text.as_deref().unwrap_or("")),
        };
        vnode.elm = Some(elm);
        self.insert(parent, elm, reference);
        Ok(())
    }

    pub(super) fn create_children(
        &self,
        parent: NodeId,
        children: &mut [VNode],
        queue: &mut InsertQueue,
    ) -> Result<()> {
        check_duplicate_keys(children);
        for child in children.iter_mut() {
            self.create_elm(child, queue, Some(parent), None)?;
        }
        Ok(())
    }

    pub(super) fn create_component(
        &self,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
        parent: Option<NodeId>,
        reference: Option<NodeId>,
        hydrate: Option<NodeId>,
    ) -> Result<()> {
        let Some(slot) = vnode.component.as_mut() else {
            return Err(Error::msg("component placeholder without a definition"));
        };
        let child = create_child(slot.def.clone(), &slot.props, self, hydrate);
        queue.extend(child.take_pending_inserts());
        queue.push(child.clone());

        let root = child.root();
        slot.instance = Some(child);
        vnode.elm = root;
        if let (None, Some(root)) = (hydrate, root) {
            self.insert(parent, root, reference);
        }
        Ok(())
    }

    fn insert(&self, parent: Option<NodeId>, elm: NodeId, reference: Option<NodeId>) {
        let Some(parent) = parent else {
            return;
        };
        match reference {
            Some(r) if self.backend.parent_node(r) == Some(parent) => {
                self.backend.insert_before(parent, elm, Some(r));
            }
            _ => self.backend.append_child(parent, elm),
        }
    }

    // =========================================================================
    // REPLACEMENT
    // =========================================================================

    fn replace(&self, old: VNode, new: &mut VNode, queue: &mut InsertQueue) -> Result<()> {
        let old_elm = old.live_elm();
        let parent = old_elm.and_then(|e| self.backend.parent_node(e));
        let next = old_elm.and_then(|e| self.backend.next_sibling(e));
        self.create_elm(new, queue, parent, next)?;
        if parent.is_some() {
            self.remove_vnodes(vec![old]);
        } else {
            self.invoke_destroy_hook(&old);
        }
        Ok(())
    }

    fn replace_element(&self, elm: NodeId, new: &mut VNode, queue: &mut InsertQueue) -> Result<()> {
        let parent = self.backend.parent_node(elm);
        let next = self.backend.next_sibling(elm);
        self.create_elm(new, queue, parent, next)?;
        if parent.is_some() {
            self.remove_node(elm);
        }
        Ok(())
    }

    // =========================================================================
    // PATCHING
    // =========================================================================

    fn patch_vnode(&self, old: VNode, new: &mut VNode, queue: &mut InsertQueue) -> Result<()> {
        if old.is_static && new.is_static && old.key == new.key {
            *new = old;
            return Ok(());
        }

        if new.is_component() {
            let instance = old.component.and_then(|slot| slot.instance);
            match (new.component.as_mut(), instance) {
                (Some(slot), Some(instance)) => {
                    instance.update_props(&slot.props);
                    new.elm = instance.root();
                    slot.instance = Some(instance);
                }
                _ => new.elm = old.elm,
            }
            return Ok(());
        }

        let Some(elm) = old.elm else {
            return Err(Error::msg("patching a snapshot that was never mounted"));
        };
        new.elm = Some(elm);

        if new.is_element() {
            if let Some(data) = &new.data {
                for module in self.modules.iter() {
                    module.update(self.ops(), elm, old.data.as_ref(), data);
                }
            }
        }

        let VNode {
            children: old_children,
            text: old_text,
            ..
        } = old;

        match new.text.clone() {
            None => {
                let has_old = !old_children.is_empty();
                let has_new = !new.children.is_empty();
                if has_old && has_new {
                    self.update_children(elm, old_children, &mut new.children, queue)?;
                } else if has_new {
                    if old_text.is_some() {
                        self.backend.set_text_content(elm, "");
                    }
                    self.create_children(elm, &mut new.children, queue)?;
                } else if has_old {
                    self.remove_vnodes(old_children);
                } else if old_text.is_some_and(|t| !t.is_empty()) {
                    self.backend.set_text_content(elm, "");
                }
            }
            Some(text) => {
                if old_text.as_deref() != Some(&*text) {
                    if !old_children.is_empty() {
                        self.remove_vnodes(old_children);
                    }
                    self.backend.set_text_content(elm, &text);
                }
            }
        }
        Ok(())
    }

    /// Four-pointer reconciliation of `old` children into `new` under `parent`.
    fn update_children(
        &self,
        parent: NodeId,
        old_children: Vec<VNode>,
        new: &mut [VNode],
        queue: &mut InsertQueue,
    ) -> Result<()> {
        check_duplicate_keys(new);

        let mut old: Vec<Option<VNode>> = old_children.into_iter().map(Some).collect();
        let mut old_start: isize = 0;
        let mut old_end: isize = old.len() as isize - 1;
        let mut new_start: isize = 0;
        let mut new_end: isize = new.len() as isize - 1;
        let mut key_map: Option<HashMap<Key, usize>> = None;

        while old_start <= old_end && new_start <= new_end {
            let (os, oe) = (old_start as usize, old_end as usize);
            let (ns, ne) = (new_start as usize, new_end as usize);

            if old[os].is_none() {
                old_start += 1;
            } else if old[oe].is_none() {
                old_end -= 1;
            } else if same_at(&old, os, &new[ns]) {
                self.patch_vnode(vacate(&mut old, os)?, &mut new[ns], queue)?;
                old_start += 1;
                new_start += 1;
            } else if same_at(&old, oe, &new[ne]) {
                self.patch_vnode(vacate(&mut old, oe)?, &mut new[ne], queue)?;
                old_end -= 1;
                new_end -= 1;
            } else if same_at(&old, os, &new[ne]) {
                // Moved right: goes after the current old end
                self.patch_vnode(vacate(&mut old, os)?, &mut new[ne], queue)?;
                let anchor = old[oe]
                    .as_ref()
                    .and_then(VNode::live_elm)
                    .and_then(|e| self.backend.next_sibling(e));
                self.move_before(parent, &new[ne], anchor);
                old_start += 1;
                new_end -= 1;
            } else if same_at(&old, oe, &new[ns]) {
                // Moved left: goes before the current old start
                self.patch_vnode(vacate(&mut old, oe)?, &mut new[ns], queue)?;
                let anchor = old[os].as_ref().and_then(VNode::live_elm);
                self.move_before(parent, &new[ns], anchor);
                old_end -= 1;
                new_start += 1;
            } else {
                let map = key_map.get_or_insert_with(|| key_to_old_index(&old, os, oe));
                let found = match &new[ns].key {
                    Some(key) => map.get(key).copied(),
                    None => (os..=oe).find(|&i| same_at(&old, i, &new[ns])),
                };
                let anchor = old[os].as_ref().and_then(VNode::live_elm);
                match found.filter(|&i| same_at(&old, i, &new[ns])) {
                    Some(i) => {
                        self.patch_vnode(vacate(&mut old, i)?, &mut new[ns], queue)?;
                        self.move_before(parent, &new[ns], anchor);
                    }
                    // Unknown key, or same key on a different kind of node
                    None => self.create_elm(&mut new[ns], queue, Some(parent), anchor)?,
                }
                new_start += 1;
            }
        }

        if old_start > old_end {
            let anchor = new
                .get((new_end + 1) as usize)
                .and_then(VNode::live_elm);
            for i in new_start..=new_end {
                self.create_elm(&mut new[i as usize], queue, Some(parent), anchor)?;
            }
        } else if new_start > new_end {
            let leftover: Vec<VNode> = old
                .drain(old_start as usize..=old_end as usize)
                .flatten()
                .collect();
            self.remove_vnodes(leftover);
        }
        Ok(())
    }

    fn move_before(&self, parent: NodeId, vnode: &VNode, anchor: Option<NodeId>) {
        if let Some(elm) = vnode.live_elm() {
            trace!(%elm, ?anchor, "moving node");
            self.backend.insert_before(parent, elm, anchor);
        }
    }

    // =========================================================================
    // REMOVAL & TEARDOWN
    // =========================================================================

    fn remove_vnodes(&self, vnodes: Vec<VNode>) {
        for vnode in vnodes {
            match vnode.kind {
                VNodeKind::Element | VNodeKind::Component => {
                    self.remove_and_invoke_remove_hook(&vnode);
                    self.invoke_destroy_hook(&vnode);
                }
                _ => {
                    if let Some(elm) = vnode.elm {
                        self.remove_node(elm);
                    }
                }
            }
        }
    }

    fn remove_and_invoke_remove_hook(&self, vnode: &VNode) {
        let Some(elm) = vnode.live_elm() else {
            return;
        };
        let backend = self.backend.clone();
        let done = RemoveHandle::new(move || {
            if let Some(parent) = backend.parent_node(elm) {
                trace!(%elm, "removing node");
                backend.remove_child(parent, elm);
            }
        });
        for module in self.modules.iter() {
            module.remove(self.ops(), vnode, done.clone());
        }
        done.done();
    }

    /// Detach `elm` from its parent, if it still has one.
    pub(crate) fn remove_node(&self, elm: NodeId) {
        if let Some(parent) = self.backend.parent_node(elm) {
            self.backend.remove_child(parent, elm);
        }
    }

    /// Run destroy hooks over a subtree: module cleanup and component teardown.
    pub(crate) fn invoke_destroy_hook(&self, vnode: &VNode) {
        if let Some(instance) = vnode.component.as_ref().and_then(|s| s.instance.as_ref()) {
            instance.destroy();
        }
        if let (VNodeKind::Element, Some(elm), Some(data)) = (vnode.kind, vnode.elm, &vnode.data) {
            for module in self.modules.iter() {
                module.destroy(self.ops(), elm, data);
            }
        }
        for child in &vnode.children {
            self.invoke_destroy_hook(child);
        }
    }

    /// Tear down and forget everything a failed adoption materialized.
    fn reset_materialized(&self, vnode: &mut VNode) {
        self.invoke_destroy_hook(vnode);
        clear_materialized(vnode);
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn same_at(old: &[Option<VNode>], i: usize, vnode: &VNode) -> bool {
    old[i].as_ref().is_some_and(|o| same_vnode(o, vnode))
}

fn vacate(old: &mut [Option<VNode>], i: usize) -> Result<VNode> {
    old[i]
        .take()
        .ok_or_else(|| Error::msg("child slot already vacated"))
}

/// Key → index of the first old child carrying it, over `start..=end`.
fn key_to_old_index(old: &[Option<VNode>], start: usize, end: usize) -> HashMap<Key, usize> {
    let mut map = HashMap::new();
    for (i, child) in old.iter().enumerate().take(end + 1).skip(start) {
        if let Some(key) = child.as_ref().and_then(|c| c.key.clone()) {
            map.entry(key).or_insert(i);
        }
    }
    map
}

fn check_duplicate_keys(children: &[VNode]) {
    let mut seen = HashSet::new();
    for child in children {
        if let Some(key) = &child.key {
            if !seen.insert(key) {
                warn(&format!(
                    "duplicate key \"{key}\" among siblings; updates may be applied to the wrong node"
                ));
            }
        }
    }
}

fn clear_materialized(vnode: &mut VNode) {
    vnode.elm = None;
    if let Some(slot) = vnode.component.as_mut() {
        slot.instance = None;
    }
    for child in vnode.children.iter_mut() {
        clear_materialized(child);
    }
}

fn invoke_insert_hooks(queue: InsertQueue) {
    for component in queue {
        component.call_mounted();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{configure, reset_config};
    use crate::vdom::memory::{MemoryBackend, Op};
    use std::cell::Cell;

    fn setup() -> (Rc<MemoryBackend>, Patcher<MemoryBackend>) {
        let backend = MemoryBackend::new();
        let patcher = Patcher::new(backend.clone());
        (backend, patcher)
    }

    fn list(keys: &[i64]) -> VNode {
        VNode::element("ul").children(
            keys.iter()
                .map(|k| VNode::element("li").key(*k).text_content(k.to_string())),
        )
    }

    fn mount(patcher: &Patcher<MemoryBackend>, vnode: &mut VNode) -> NodeId {
        patcher.patch(None, vnode).unwrap()
    }

    #[test]
    fn creates_detached_tree() {
        let (b, p) = setup();
        let mut v = VNode::element("div")
            .attr("id", "app")
            .children([VNode::text("hi "), VNode::element("b").text_content("there")]);
        let root = mount(&p, &mut v);
        assert_eq!(b.to_html(root), "<div id=\"app\">hi <b>there</b></div>");
        assert_eq!(b.parent_node(root), None);
        assert_eq!(v.elm, Some(root));
    }

    #[test]
    fn identical_snapshot_performs_no_operations() {
        let (b, p) = setup();
        let build = || {
            VNode::element("div")
                .attr("id", "a")
                .class("x", true)
                .style("color", "red")
                .on("click", |_| {})
                .children([VNode::text("t"), list(&[1, 2, 3])])
        };
        let mut first = build();
        mount(&p, &mut first);
        b.clear_ops();

        let mut second = build();
        p.patch(Some(PatchTarget::VNode(first)), &mut second).unwrap();
        assert_eq!(b.ops(), vec![]);
    }

    #[test]
    fn text_changes_in_place() {
        let (b, p) = setup();
        let mut old = VNode::element("p").child(VNode::text("1"));
        let root = mount(&p, &mut old);
        let text_node = old.children[0].elm.unwrap();
        b.clear_ops();

        let mut new = VNode::element("p").child(VNode::text("2"));
        p.patch(Some(PatchTarget::VNode(old)), &mut new).unwrap();
        assert_eq!(b.ops(), vec![Op::SetText { node: text_node, text: "2".into() }]);
        assert_eq!(b.to_html(root), "<p>2</p>");
    }

    #[test]
    fn keyed_reverse_moves_without_creating() {
        let (b, p) = setup();
        let mut old = list(&[1, 2, 3, 4]);
        let root = mount(&p, &mut old);
        let before = b.children(root);
        b.clear_ops();

        let mut new = list(&[4, 3, 2, 1]);
        p.patch(Some(PatchTarget::VNode(old)), &mut new).unwrap();
        assert_eq!(b.created_count(), 0);
        assert_eq!(b.to_html(root), "<ul><li>4</li><li>3</li><li>2</li><li>1</li></ul>");
        let after: Vec<_> = b.children(root).into_iter().rev().collect();
        assert_eq!(after, before);
    }

    #[test]
    fn keyed_insert_and_remove() {
        let (b, p) = setup();
        let mut old = list(&[1, 2, 3]);
        let root = mount(&p, &mut old);
        b.clear_ops();

        let mut new = list(&[1, 5, 3]);
        p.patch(Some(PatchTarget::VNode(old)), &mut new).unwrap();
        assert_eq!(b.created_count(), 1);
        assert_eq!(b.to_html(root), "<ul><li>1</li><li>5</li><li>3</li></ul>");

        let mut shorter = list(&[3]);
        p.patch(Some(PatchTarget::VNode(new)), &mut shorter).unwrap();
        assert_eq!(b.to_html(root), "<ul><li>3</li></ul>");
    }

    #[test]
    fn keyed_shuffle_through_key_map() {
        let (b, p) = setup();
        let mut old = list(&[1, 2, 3, 4, 5]);
        let root = mount(&p, &mut old);
        b.clear_ops();

        let mut new = list(&[3, 5, 1, 4, 2]);
        p.patch(Some(PatchTarget::VNode(old)), &mut new).unwrap();
        assert_eq!(b.created_count(), 0);
        assert_eq!(
            b.to_html(root),
            "<ul><li>3</li><li>5</li><li>1</li><li>4</li><li>2</li></ul>"
        );
    }

    #[test]
    fn different_root_replaces_in_parent() {
        let (b, p) = setup();
        let host = b.create_element("main");
        let mut old = VNode::element("div").text_content("old");
        let old_root = mount(&p, &mut old);
        b.append_child(host, old_root);

        let mut new = VNode::element("section").text_content("new");
        let new_root = p.patch(Some(PatchTarget::VNode(old)), &mut new).unwrap();
        assert_ne!(old_root, new_root);
        assert_eq!(b.to_html(host), "<main><section>new</section></main>");
    }

    #[test]
    fn element_target_is_replaced() {
        let (b, p) = setup();
        let host = b.create_element("body");
        let placeholder = b.create_element("div");
        let after = b.create_element("footer");
        b.append_child(host, placeholder);
        b.append_child(host, after);

        let mut v = VNode::element("app");
        p.patch(Some(PatchTarget::Element(placeholder)), &mut v).unwrap();
        assert_eq!(b.to_html(host), "<body><app></app><footer></footer></body>");
    }

    #[test]
    fn children_and_text_swap() {
        let (b, p) = setup();
        let mut old = VNode::element("div").text_content("plain");
        let root = mount(&p, &mut old);

        let mut with_children = VNode::element("div").child(VNode::element("span"));
        p.patch(Some(PatchTarget::VNode(old)), &mut with_children).unwrap();
        assert_eq!(b.to_html(root), "<div><span></span></div>");

        let mut back = VNode::element("div").text_content("again");
        p.patch(Some(PatchTarget::VNode(with_children)), &mut back).unwrap();
        assert_eq!(b.to_html(root), "<div>again</div>");
    }

    #[test]
    fn static_subtree_is_reused() {
        let (b, p) = setup();
        let hr = |v: &str| VNode::element("hr").key("s").attr("v", v.to_string()).mark_static();
        let mut old = VNode::element("div").child(hr("1"));
        mount(&p, &mut old);
        let hr_node = old.children[0].elm;
        b.clear_ops();

        let mut new = VNode::element("div").child(hr("2"));
        p.patch(Some(PatchTarget::VNode(old)), &mut new).unwrap();
        assert!(b.ops().is_empty());
        assert_eq!(new.children[0].elm, hr_node);
        let kept = &new.children[0].data.as_ref().unwrap().attrs["v"];
        assert_eq!(&**kept, "1");
    }

    #[test]
    fn rejected_attribute_is_reported_and_patch_continues() {
        let (b, p) = setup();
        let errors = Rc::new(Cell::new(0));
        let e = errors.clone();
        configure(|cfg| cfg.error_handler = Some(Rc::new(move |err: &Error, _: &str| {
            assert!(matches!(err, Error::Backend(_)));
            e.set(e.get() + 1);
        })));
        b.reject_attribute("onclick");

        let mut v = VNode::element("a").attr("onclick", "x").attr("href", "/");
        let root = mount(&p, &mut v);
        assert_eq!(errors.get(), 1);
        assert_eq!(b.to_html(root), "<a href=\"/\"></a>");
        reset_config();
    }

    #[test]
    fn duplicate_keys_warn() {
        let (_b, p) = setup();
        let warnings = Rc::new(Cell::new(0));
        let w = warnings.clone();
        configure(|cfg| cfg.warn_handler = Some(Rc::new(move |_: &str| w.set(w.get() + 1))));
        let mut v = list(&[1, 1]);
        mount(&p, &mut v);
        assert_eq!(warnings.get(), 1);
        reset_config();
    }

    #[test]
    fn fragment_root_is_an_error() {
        let (_b, p) = setup();
        let mut v = VNode::fragment([VNode::text("a")]);
        assert!(p.patch(None, &mut v).is_err());
    }

    #[test]
    fn removal_waits_for_remove_hook() {
        struct HoldRemoval(std::cell::RefCell<Vec<RemoveHandle>>);
        impl Module for HoldRemoval {
            fn name(&self) -> &'static str {
                "hold"
            }
            fn update(&self, _: &dyn Backend, _: NodeId, _: Option<&crate::vdom::vnode::VNodeData>, _: &crate::vdom::vnode::VNodeData) {}
            fn remove(&self, _: &dyn Backend, _: &VNode, done: RemoveHandle) {
                self.0.borrow_mut().push(done);
            }
        }

        let b = MemoryBackend::new();
        let hold = Rc::new(HoldRemoval(std::cell::RefCell::new(Vec::new())));
        struct Shared(Rc<HoldRemoval>);
        impl Module for Shared {
            fn name(&self) -> &'static str {
                "shared"
            }
            fn update(&self, b: &dyn Backend, e: NodeId, o: Option<&crate::vdom::vnode::VNodeData>, n: &crate::vdom::vnode::VNodeData) {
                self.0.update(b, e, o, n)
            }
            fn remove(&self, b: &dyn Backend, v: &VNode, done: RemoveHandle) {
                self.0.remove(b, v, done)
            }
        }
        let p = Patcher::with_modules(b.clone(), vec![Box::new(Shared(hold.clone()))]);

        let mut old = list(&[1, 2]);
        let root = mount(&p, &mut old);
        let gone = old.children[1].elm.unwrap();
        let mut new = list(&[1]);
        p.patch(Some(PatchTarget::VNode(old)), &mut new).unwrap();

        assert_eq!(b.parent_node(gone), Some(root));
        hold.0.borrow_mut().clear();
        assert_eq!(b.parent_node(gone), None);
    }
}
