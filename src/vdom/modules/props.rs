// ============================================================================
// spark-view - Props Module
// Backend node properties (value, checked, ...)
// ============================================================================

use super::{report, Module};
use crate::vdom::backend::{Backend, NodeId};
use crate::vdom::vnode::VNodeData;

pub struct PropsModule;

impl Module for PropsModule {
    fn name(&self) -> &'static str {
        "props"
    }

    fn update(&self, backend: &dyn Backend, elm: NodeId, old: Option<&VNodeData>, new: &VNodeData) {
        let old_props = old.map(|d| &d.props);
        if let Some(old_props) = old_props {
            for name in old_props.keys() {
                if !new.props.contains_key(name) {
                    backend.remove_property(elm, name);
                }
            }
        }
        for (name, value) in &new.props {
            // Same-value comparison: NaN is unchanged, containers by identity
            if old_props.and_then(|p| p.get(name)) != Some(value) {
                report(backend.set_property(elm, name, value), self.name());
            }
        }
    }
}
