// ============================================================================
// spark-view - Style Module
// ============================================================================

use super::{report, Module};
use crate::vdom::backend::{Backend, NodeId};
use crate::vdom::vnode::VNodeData;

/// Individual style properties.
pub struct StyleModule;

impl Module for StyleModule {
    fn name(&self) -> &'static str {
        "style"
    }

    fn update(&self, backend: &dyn Backend, elm: NodeId, old: Option<&VNodeData>, new: &VNodeData) {
        let old_style = old.map(|d| &d.style);
        if let Some(old_style) = old_style {
            for name in old_style.keys() {
                if !new.style.contains_key(name) {
                    backend.remove_style(elm, name);
                }
            }
        }
        for (name, value) in &new.style {
            if old_style.and_then(|s| s.get(name)) != Some(value) {
                report(backend.set_style(elm, name, value), self.name());
            }
        }
    }
}
