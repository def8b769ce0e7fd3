// ============================================================================
// spark-view - Observer
// Per-container companion carrying the container's own dependency node
// ============================================================================

use std::rc::Rc;

use tracing::trace;

use super::value::Value;
use crate::core::constants::{FROZEN, RAW};
use crate::reactivity::tracking::Dep;

/// Attached to exactly one container instance. Its dep is notified by
/// structural changes (array mutators, `set`/`delete`) rather than by
/// writes to individual fields.
pub struct Observer {
    dep: Rc<Dep>,
}

impl Observer {
    fn new() -> Rc<Self> {
        Rc::new(Self { dep: Dep::new() })
    }

    pub fn dep(&self) -> &Rc<Dep> {
        &self.dep
    }
}

/// Make `value` observable.
///
/// Returns the container's observer, creating it on first call; scalars,
/// frozen and raw containers yield `None`. The observer is attached before
/// the contents are walked, so cyclic structures terminate.
pub fn observe(value: &Value) -> Option<Rc<Observer>> {
    match value {
        Value::Object(obj) => {
            if let Some(ob) = obj.observer() {
                return Some(ob);
            }
            if obj.flags() & (FROZEN | RAW) != 0 {
                return None;
            }
            let ob = Observer::new();
            trace!(dep = ob.dep.id().0, "observe object");
            obj.attach_observer(ob.clone());
            obj.walk();
            Some(ob)
        }
        Value::Array(arr) => {
            if let Some(ob) = arr.observer() {
                return Some(ob);
            }
            if arr.flags() & (FROZEN | RAW) != 0 {
                return None;
            }
            let ob = Observer::new();
            trace!(dep = ob.dep.id().0, "observe array");
            arr.attach_observer(ob.clone());
            for item in arr.peek_values() {
                observe(&item);
            }
            Some(ob)
        }
        _ => None,
    }
}
