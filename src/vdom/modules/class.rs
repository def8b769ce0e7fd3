// ============================================================================
// spark-view - Class Module
// ============================================================================

use std::collections::BTreeMap;
use std::rc::Rc;

use super::{report, Module};
use crate::vdom::backend::{Backend, NodeId};
use crate::vdom::vnode::VNodeData;

/// The `class` attribute, built from enabled class names.
pub struct ClassModule;

pub(crate) fn class_string(classes: &BTreeMap<Rc<str>, bool>) -> String {
    classes
        .iter()
        .filter(|(_, on)| **on)
        .map(|(name, _)| &**name)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Module for ClassModule {
    fn name(&self) -> &'static str {
        "class"
    }

    fn update(&self, backend: &dyn Backend, elm: NodeId, old: Option<&VNodeData>, new: &VNodeData) {
        let prev = old.map(|d| class_string(&d.class)).unwrap_or_default();
        let next = class_string(&new.class);
        if prev == next {
            return;
        }
        if next.is_empty() {
            backend.remove_attribute(elm, "class");
        } else {
            report(backend.set_attribute(elm, "class", &next), self.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdom::memory::MemoryBackend;
    use crate::vdom::vnode::VNode;

    #[test]
    fn writes_only_when_string_changes() {
        let b = MemoryBackend::new();
        let el = b.create_element("div");
        let one = VNode::element("div").class("a", true).class("b", false).data.unwrap();
        ClassModule.create(&*b, el, &one);
        assert_eq!(b.attribute(el, "class").as_deref(), Some("a"));

        b.clear_ops();
        let same = VNode::element("div").class("a", true).data.unwrap();
        ClassModule.update(&*b, el, Some(&one), &same);
        assert!(b.ops().is_empty());

        let none = VNode::element("div").class("a", false).data.unwrap();
        ClassModule.update(&*b, el, Some(&same), &none);
        assert_eq!(b.attribute(el, "class"), None);
    }
}
