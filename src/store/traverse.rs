// ============================================================================
// spark-view - Deep Traversal
// Touch every nested field so a deep watcher depends on all of them
// ============================================================================

use std::collections::HashSet;

use super::value::Value;
use crate::core::types::DepId;

/// Read every nested field of `value` under the current target.
///
/// Only observed containers are walked (an unobserved container has
/// nothing to subscribe to). Each container is visited once, keyed by its
/// observer's dep id, so cycles terminate.
pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    walk(value, &mut seen);
}

fn walk(value: &Value, seen: &mut HashSet<DepId>) {
    match value {
        Value::Array(arr) => {
            if arr.is_frozen() {
                return;
            }
            let Some(ob) = arr.observer() else { return };
            if !seen.insert(ob.dep().id()) {
                return;
            }
            for item in arr.to_vec() {
                walk(&item, seen);
            }
        }
        Value::Object(obj) => {
            if obj.is_frozen() {
                return;
            }
            let Some(ob) = obj.observer() else { return };
            if !seen.insert(ob.dep().id()) {
                return;
            }
            for key in obj.keys() {
                walk(&obj.get(&key), seen);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactivity::tracking::probe::Probe;
    use crate::store::{observe, Array, Object};

    #[test]
    fn deep_read_subscribes_nested_fields() {
        let leaf = Object::from_pairs([("x", 1)]);
        let root = Object::from_pairs([(
            "items",
            Value::from(Array::from_values(vec![Value::from(leaf.clone())])),
        )]);
        observe(&Value::from(root.clone()));

        let probe = Probe::new();
        probe.track(|| traverse(&Value::from(root.clone())));

        leaf.set("x", 2);
        assert_eq!(probe.updates(), 1);
    }

    #[test]
    fn cyclic_structures_terminate() {
        let a = Object::new();
        let b = Object::from_pairs([("a", a.clone())]);
        a.set("b", b);
        observe(&Value::from(a.clone()));

        let probe = Probe::new();
        probe.track(|| traverse(&Value::from(a)));
    }
}
