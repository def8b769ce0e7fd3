// ============================================================================
// spark-view - Events Module
// Listeners through a retargetable invoker
// ============================================================================
//
// Each (node, event) pair gets one backend listener for its whole life: an
// invoker that forwards to whatever handler the latest snapshot carries.
// Patching a re-rendered tree swaps the handler without touching the backend.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::Module;
use crate::vdom::backend::{Backend, Event, Handler, NodeId};
use crate::vdom::vnode::VNodeData;

type Invoker = Rc<RefCell<Handler>>;

#[derive(Default)]
pub struct EventsModule {
    invokers: RefCell<HashMap<(NodeId, Rc<str>), Invoker>>,
}

impl EventsModule {
    fn attach(&self, backend: &dyn Backend, elm: NodeId, name: &Rc<str>, handler: &Handler) {
        let slot: Invoker = Rc::new(RefCell::new(handler.clone()));
        let target = slot.clone();
        backend.add_event_listener(
            elm,
            name,
            Rc::new(move |event: &Event| {
                // Clone out so the handler may re-render and retarget us
                let handler = target.borrow().clone();
                handler(event);
            }),
        );
        self.invokers.borrow_mut().insert((elm, name.clone()), slot);
    }

    fn detach(&self, backend: &dyn Backend, elm: NodeId, name: &Rc<str>) {
        self.invokers.borrow_mut().remove(&(elm, name.clone()));
        backend.remove_event_listener(elm, name);
    }

    /// Live invokers (listener registrations) across all nodes.
    pub fn invoker_count(&self) -> usize {
        self.invokers.borrow().len()
    }
}

impl Module for EventsModule {
    fn name(&self) -> &'static str {
        "events"
    }

    fn update(&self, backend: &dyn Backend, elm: NodeId, old: Option<&VNodeData>, new: &VNodeData) {
        for (name, handler) in &new.on {
            let existing = self.invokers.borrow().get(&(elm, name.clone())).cloned();
            match existing {
                Some(invoker) => *invoker.borrow_mut() = handler.clone(),
                None => self.attach(backend, elm, name, handler),
            }
        }
        if let Some(old) = old {
            for name in old.on.keys() {
                if !new.on.contains_key(name) {
                    self.detach(backend, elm, name);
                }
            }
        }
    }

    fn destroy(&self, backend: &dyn Backend, elm: NodeId, data: &VNodeData) {
        for name in data.on.keys() {
            self.detach(backend, elm, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Value;
    use crate::vdom::memory::MemoryBackend;
    use crate::vdom::vnode::VNode;
    use std::cell::Cell;

    #[test]
    fn handler_is_retargeted_without_backend_calls() {
        let b = MemoryBackend::new();
        let module = EventsModule::default();
        let el = b.create_element("button");
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        let first = VNode::element("button").on("click", move |_| h.set(h.get() + 1)).data.unwrap();
        module.create(&*b, el, &first);

        b.clear_ops();
        let h = hits.clone();
        let second = VNode::element("button").on("click", move |_| h.set(h.get() + 10)).data.unwrap();
        module.update(&*b, el, Some(&first), &second);
        assert!(b.ops().is_empty());

        b.dispatch_event(el, "click", Value::Null);
        assert_eq!(hits.get(), 10);
    }

    #[test]
    fn removed_and_destroyed_listeners_detach() {
        let b = MemoryBackend::new();
        let module = EventsModule::default();
        let el = b.create_element("input");
        let both = VNode::element("input").on("input", |_| {}).on("blur", |_| {}).data.unwrap();
        module.create(&*b, el, &both);
        assert_eq!(b.listener_count(el), 2);

        let one = VNode::element("input").on("input", |_| {}).data.unwrap();
        module.update(&*b, el, Some(&both), &one);
        assert_eq!(b.listener_count(el), 1);

        module.destroy(&*b, el, &one);
        assert_eq!(b.listener_count(el), 0);
        assert_eq!(module.invoker_count(), 0);
    }
}
