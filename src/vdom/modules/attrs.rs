// ============================================================================
// spark-view - Attrs Module
// ============================================================================

use super::{report, Module};
use crate::vdom::backend::{Backend, NodeId};
use crate::vdom::vnode::VNodeData;

/// Plain string attributes.
pub struct AttrsModule;

impl Module for AttrsModule {
    fn name(&self) -> &'static str {
        "attrs"
    }

    fn update(&self, backend: &dyn Backend, elm: NodeId, old: Option<&VNodeData>, new: &VNodeData) {
        let old_attrs = old.map(|d| &d.attrs);
        if new.attrs.is_empty() && old_attrs.is_none_or(|a| a.is_empty()) {
            return;
        }

        for (name, value) in &new.attrs {
            if old_attrs.and_then(|a| a.get(name)) != Some(value) {
                report(backend.set_attribute(elm, name, value), self.name());
            }
        }
        if let Some(old_attrs) = old_attrs {
            for name in old_attrs.keys() {
                if !new.attrs.contains_key(name) {
                    backend.remove_attribute(elm, name);
                }
            }
        }
    }
}
