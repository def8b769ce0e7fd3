// ============================================================================
// spark-view - Reactive Store
// Observable containers and the dynamic add/remove operations
// ============================================================================
//
// Containers are explicit proxy types: `Object` for keyed records and
// `Array` for ordered lists. `observe` converts a plain container (and,
// recursively, everything it holds) into tracked state. Field creation and
// removal cannot be seen by the field accessors, so they go through `set`
// and `delete` below.
// ============================================================================

pub mod array;
pub mod object;
pub mod observer;
pub mod traverse;
pub mod value;

use std::rc::Rc;

pub use array::Array;
pub use object::Object;
pub use observer::{observe, Observer};
pub use traverse::traverse;
pub use value::Value;

use crate::error::warn;

// =============================================================================
// PROPERTY KEYS
// =============================================================================

/// A field name or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropKey {
    Field(Rc<str>),
    Index(usize),
}

impl PropKey {
    fn as_index(&self) -> Option<usize> {
        match self {
            PropKey::Index(i) => Some(*i),
            PropKey::Field(name) => name.parse().ok(),
        }
    }

    fn into_field(self) -> Rc<str> {
        match self {
            PropKey::Field(name) => name,
            PropKey::Index(i) => Rc::from(i.to_string()),
        }
    }
}

impl From<&str> for PropKey {
    fn from(s: &str) -> Self {
        PropKey::Field(Rc::from(s))
    }
}

impl From<String> for PropKey {
    fn from(s: String) -> Self {
        PropKey::Field(Rc::from(s))
    }
}

impl From<Rc<str>> for PropKey {
    fn from(s: Rc<str>) -> Self {
        PropKey::Field(s)
    }
}

impl From<usize> for PropKey {
    fn from(i: usize) -> Self {
        PropKey::Index(i)
    }
}

// =============================================================================
// SET / DELETE
// =============================================================================

/// Add or replace a property, making it reactive and notifying watchers of
/// the container's shape.
///
/// - Arrays: the element at the index is replaced (padding with `Null`
///   past the end), one notification.
/// - Existing object fields: an ordinary write.
/// - New object fields on an observed object: defined reactive, then the
///   object's own dep is notified. On an unobserved object: a plain insert.
///
/// Frozen containers and non-container targets are warned about and left
/// untouched. Returns the value written.
pub fn set(target: &Value, key: impl Into<PropKey>, value: impl Into<Value>) -> Value {
    let key = key.into();
    let value = value.into();
    match target {
        Value::Array(arr) => {
            if arr.is_frozen() {
                warn("cannot set an index on a frozen array");
                return value;
            }
            match key.as_index() {
                Some(index) => arr.set_index(index, value.clone()),
                None => warn(&format!("cannot set non-index key {key:?} on an array")),
            }
        }
        Value::Object(obj) => {
            if obj.is_frozen() {
                warn("cannot set a property on a frozen object");
                return value;
            }
            let key = key.into_field();
            if obj.has(&key) {
                obj.set(&key, value.clone());
                return value;
            }
            match obj.observer() {
                Some(ob) => {
                    obj.define_reactive(&key, value.clone());
                    ob.dep().notify();
                }
                None => obj.set(&key, value.clone()),
            }
        }
        other => warn(&format!(
            "cannot set reactive property on a {} value",
            other.type_name()
        )),
    }
    value
}

/// Remove a property, notifying watchers of the container's shape.
///
/// Arrays remove the element at the index (shifting later elements). A
/// missing key is a no-op. Frozen containers and non-container targets are
/// warned about and left untouched.
pub fn delete(target: &Value, key: impl Into<PropKey>) {
    let key = key.into();
    match target {
        Value::Array(arr) => {
            if arr.is_frozen() {
                warn("cannot delete an index of a frozen array");
                return;
            }
            if let Some(index) = key.as_index() {
                arr.remove(index);
            }
        }
        Value::Object(obj) => {
            if obj.is_frozen() {
                warn("cannot delete a property of a frozen object");
                return;
            }
            let key = key.into_field();
            let Some((_, field_dep)) = obj.remove_field(&key) else {
                return;
            };
            if let Some(ob) = obj.observer() {
                ob.dep().notify();
            }
            // Readers of the removed field itself
            if let Some(dep) = field_dep {
                dep.notify();
            }
        }
        other => warn(&format!(
            "cannot delete reactive property on a {} value",
            other.type_name()
        )),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{configure, reset_config};
    use crate::reactivity::tracking::probe::Probe;
    use std::cell::RefCell;

    #[test]
    fn set_new_key_is_reactive_and_notifies_shape() {
        let obj = Object::new();
        let root = Value::from(obj.clone());
        observe(&root);

        let probe = Probe::new();
        probe.track(|| obj.get("count"));

        set(&root, "count", 1);
        assert_eq!(probe.updates(), 1);
        assert!(obj.is_reactive_field("count"));

        // Now an ordinary reactive write
        let reader = Probe::new();
        reader.track(|| obj.get("count"));
        set(&root, "count", 2);
        assert_eq!(reader.updates(), 1);
    }

    #[test]
    fn set_on_unobserved_object_is_plain() {
        let obj = Object::new();
        set(&Value::from(obj.clone()), "a", 1);
        assert!(obj.has("a"));
        assert!(!obj.is_reactive_field("a"));
    }

    #[test]
    fn set_array_index() {
        let arr = Array::from_values(vec![Value::from(1)]);
        let target = Value::from(arr.clone());
        observe(&target);

        let probe = Probe::new();
        probe.track(|| arr.len());
        set(&target, 3usize, "x");
        assert_eq!(probe.updates(), 1);
        assert_eq!(arr.peek_values().len(), 4);

        set(&target, "0", 5);
        assert_eq!(arr.peek_values()[0], Value::from(5));
    }

    #[test]
    fn delete_notifies_field_and_shape() {
        let obj = Object::from_pairs([("a", 1), ("b", 2)]);
        let root = Value::from(obj.clone());
        observe(&root);

        let probe = Probe::new();
        probe.track(|| obj.get("a"));
        delete(&root, "a");
        assert_eq!(probe.updates(), 1);
        assert!(!obj.has("a"));

        // Missing key: nothing happens
        delete(&root, "zzz");
        assert_eq!(probe.updates(), 1);
    }

    #[test]
    fn delete_array_index() {
        let arr = Array::from_values(vec![Value::from(1), Value::from(2)]);
        delete(&Value::from(arr.clone()), 0usize);
        assert_eq!(arr.peek_values(), vec![Value::from(2)]);
    }

    #[test]
    fn non_containers_and_frozen_warn() {
        let messages = Rc::new(RefCell::new(Vec::<String>::new()));
        let sink = messages.clone();
        configure(|cfg| {
            cfg.warn_handler = Some(Rc::new(move |msg: &str| sink.borrow_mut().push(msg.into())));
        });

        set(&Value::from(3), "a", 1);
        delete(&Value::Null, "a");

        let frozen = Object::from_pairs([("a", 1)]);
        frozen.freeze();
        set(&Value::from(frozen.clone()), "a", 2);
        delete(&Value::from(frozen.clone()), "a");

        assert_eq!(messages.borrow().len(), 4);
        assert_eq!(frozen.peek("a"), Value::from(1));
        reset_config();
    }
}
