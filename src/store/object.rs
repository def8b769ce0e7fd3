// ============================================================================
// spark-view - Reactive Object
// Keyed container whose fields register reads and notify on writes
// ============================================================================
//
// Field order is insertion order. Every field is either plain (no tracking)
// or reactive: it owns a private `Dep` and caches the observer of the
// container it currently holds, so a read can also subscribe to that
// container's own dep (which is what `set`/`delete` and array mutators
// notify).
//
// No borrow of `fields` is ever held while a dep is depended on or
// notified: both may re-enter this object.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::observer::{observe, Observer};
use super::value::Value;
use crate::core::constants::{FROZEN, RAW};
use crate::error::warn;
use crate::reactivity::equality::same_value;
use crate::reactivity::tracking::Dep;

// =============================================================================
// FIELDS
// =============================================================================

#[derive(Clone)]
struct Reactive {
    dep: Rc<Dep>,
    child_ob: Option<Rc<Observer>>,
    shallow: bool,
}

#[derive(Clone)]
struct Field {
    key: Rc<str>,
    value: Value,
    reactive: Option<Reactive>,
}

struct ObjectInner {
    fields: RefCell<Vec<Field>>,
    flags: Cell<u32>,
    observer: RefCell<Option<Rc<Observer>>>,
}

// =============================================================================
// OBJECT
// =============================================================================

/// Shared handle to a keyed container. Equality is identity.
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

impl Object {
    pub fn new() -> Self {
        Object(Rc::new(ObjectInner {
            fields: RefCell::new(Vec::new()),
            flags: Cell::new(0),
            observer: RefCell::new(None),
        }))
    }

    /// Build a plain (not yet observed) object from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Rc<str>>,
        V: Into<Value>,
    {
        let obj = Object::new();
        {
            let mut fields = obj.0.fields.borrow_mut();
            for (key, value) in pairs {
                let key = key.into();
                let value = value.into();
                match fields.iter_mut().find(|f| f.key == key) {
                    Some(field) => field.value = value,
                    None => fields.push(Field {
                        key,
                        value,
                        reactive: None,
                    }),
                }
            }
        }
        obj
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    // =========================================================================
    // TRACKED READS
    // =========================================================================

    /// Read `key`, registering the evaluating watcher.
    ///
    /// A reactive field subscribes to its own dep, its child container's dep
    /// and, for arrays, every nested element's dep. A missing key on an
    /// observed object subscribes to the object's own dep so a later
    /// `store::set` of that key is seen.
    pub fn get(&self, key: &str) -> Value {
        let found = {
            let fields = self.0.fields.borrow();
            fields
                .iter()
                .find(|f| &*f.key == key)
                .map(|f| (f.value.clone(), f.reactive.clone()))
        };

        match found {
            Some((value, Some(reactive))) => {
                reactive.dep.depend();
                if let Some(child) = &reactive.child_ob {
                    child.dep().depend();
                    if let Value::Array(arr) = &value {
                        arr.depend_elements();
                    }
                }
                value
            }
            Some((value, None)) => value,
            None => {
                if let Some(ob) = self.observer() {
                    ob.dep().depend();
                }
                Value::Null
            }
        }
    }

    /// Whether the object has `key`. Does not track.
    pub fn has(&self, key: &str) -> bool {
        self.0.fields.borrow().iter().any(|f| &*f.key == key)
    }

    /// Field names in insertion order; subscribes to the object's own dep.
    pub fn keys(&self) -> Vec<Rc<str>> {
        if let Some(ob) = self.observer() {
            ob.dep().depend();
        }
        self.0.fields.borrow().iter().map(|f| f.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        if let Some(ob) = self.observer() {
            ob.dep().depend();
        }
        self.0.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a dotted path such as `"user.tags.0"`. Numeric segments index
    /// into arrays. Every step is a tracked read; a missing step yields
    /// `Null`.
    pub fn get_path(&self, path: &str) -> Value {
        let mut current = Value::Object(self.clone());
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = match &current {
                Value::Object(obj) => obj.get(segment),
                Value::Array(arr) => match segment.parse::<usize>() {
                    Ok(index) => arr.get(index),
                    Err(_) => Value::Null,
                },
                _ => return Value::Null,
            };
        }
        current
    }

    // =========================================================================
    // UNTRACKED READS
    // =========================================================================

    /// Read `key` without registering any dependency.
    pub fn peek(&self, key: &str) -> Value {
        self.0
            .fields
            .borrow()
            .iter()
            .find(|f| &*f.key == key)
            .map(|f| f.value.clone())
            .unwrap_or_default()
    }

    /// Snapshot of every entry without registering any dependency.
    pub fn peek_entries(&self) -> Vec<(Rc<str>, Value)> {
        self.0
            .fields
            .borrow()
            .iter()
            .map(|f| (f.key.clone(), f.value.clone()))
            .collect()
    }

    /// Whether `key` is a reactive field.
    pub fn is_reactive_field(&self, key: &str) -> bool {
        self.0
            .fields
            .borrow()
            .iter()
            .any(|f| &*f.key == key && f.reactive.is_some())
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Write `key`.
    ///
    /// A reactive field notifies only when the value changed by
    /// [`same_value`]; the new value is observed unless the field is
    /// shallow. A missing key is inserted as a plain field: use
    /// [`crate::store::set`] to add a reactive one.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if self.is_frozen() {
            warn(&format!("cannot assign to \"{key}\" of a frozen object"));
            return;
        }

        let existing = {
            let fields = self.0.fields.borrow();
            fields
                .iter()
                .position(|f| &*f.key == key)
                .map(|i| (i, fields[i].reactive.clone(), same_value(&fields[i].value, &value)))
        };

        match existing {
            Some((_, _, true)) => {}
            Some((index, Some(reactive), false)) => {
                let child_ob = if reactive.shallow { None } else { observe(&value) };
                {
                    let mut fields = self.0.fields.borrow_mut();
                    let field = &mut fields[index];
                    field.value = value;
                    if let Some(r) = field.reactive.as_mut() {
                        r.child_ob = child_ob;
                    }
                }
                reactive.dep.notify();
            }
            Some((index, None, false)) => {
                self.0.fields.borrow_mut()[index].value = value;
            }
            None => {
                self.0.fields.borrow_mut().push(Field {
                    key: Rc::from(key),
                    value,
                    reactive: None,
                });
            }
        }
    }

    /// Turn `key` into a reactive field holding `value` (inserting or
    /// replacing). The value is observed.
    pub fn define_reactive(&self, key: &str, value: impl Into<Value>) {
        self.define_field(key, value.into(), false);
    }

    /// Like [`Object::define_reactive`] but the value is not observed, so
    /// only reassigning the field itself notifies.
    pub fn define_reactive_shallow(&self, key: &str, value: impl Into<Value>) {
        self.define_field(key, value.into(), true);
    }

    fn define_field(&self, key: &str, value: Value, shallow: bool) {
        if self.is_frozen() {
            warn(&format!("cannot define reactive property \"{key}\" on a frozen object"));
            return;
        }
        let child_ob = if shallow { None } else { observe(&value) };
        let mut fields = self.0.fields.borrow_mut();
        match fields.iter_mut().find(|f| &*f.key == key) {
            Some(field) => {
                field.value = value;
                // An existing dep is kept so current subscribers stay attached
                match field.reactive.as_mut() {
                    Some(existing) => {
                        existing.child_ob = child_ob;
                        existing.shallow = shallow;
                    }
                    None => {
                        field.reactive = Some(Reactive {
                            dep: Dep::new(),
                            child_ob,
                            shallow,
                        })
                    }
                }
            }
            None => fields.push(Field {
                key: Rc::from(key),
                value,
                reactive: Some(Reactive {
                    dep: Dep::new(),
                    child_ob,
                    shallow,
                }),
            }),
        }
    }

    /// Remove `key`, returning the removed value and its dep if it was
    /// reactive. Does not notify.
    pub(crate) fn remove_field(&self, key: &str) -> Option<(Value, Option<Rc<Dep>>)> {
        let mut fields = self.0.fields.borrow_mut();
        let index = fields.iter().position(|f| &*f.key == key)?;
        let field = fields.remove(index);
        Some((field.value, field.reactive.map(|r| r.dep)))
    }

    /// Convert every plain field into a reactive one, observing its value.
    pub(crate) fn walk(&self) {
        let plain: Vec<(Rc<str>, Value)> = self
            .0
            .fields
            .borrow()
            .iter()
            .filter(|f| f.reactive.is_none())
            .map(|f| (f.key.clone(), f.value.clone()))
            .collect();

        for (key, value) in plain {
            let child_ob = observe(&value);
            let mut fields = self.0.fields.borrow_mut();
            if let Some(field) = fields.iter_mut().find(|f| f.key == key) {
                field.reactive = Some(Reactive {
                    dep: Dep::new(),
                    child_ob,
                    shallow: false,
                });
            }
        }
    }

    // =========================================================================
    // OBSERVER & FLAGS
    // =========================================================================

    /// The attached observer, if this object has been observed.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.observer.borrow().clone()
    }

    pub(crate) fn attach_observer(&self, ob: Rc<Observer>) {
        *self.0.observer.borrow_mut() = Some(ob);
    }

    pub(crate) fn flags(&self) -> u32 {
        self.0.flags.get()
    }

    /// Make the object non-extensible: it is never observed and rejects
    /// writes.
    pub fn freeze(&self) -> &Self {
        self.0.flags.set(self.0.flags.get() | FROZEN);
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.0.flags.get() & FROZEN != 0
    }

    /// Exclude the object from observation.
    pub fn mark_raw(&self) -> &Self {
        self.0.flags.set(self.0.flags.get() | RAW);
        self
    }

    pub fn is_raw(&self) -> bool {
        self.0.flags.get() & RAW != 0
    }
}

impl Default for Object {
    fn default() -> Self {
        Object::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Value::Object(self.clone()), f)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{configure, reset_config};
    use crate::store::array::Array;
    use crate::reactivity::tracking::probe::Probe;

    fn observed(pairs: Vec<(&str, Value)>) -> Object {
        let obj = Object::from_pairs(pairs);
        observe(&Value::Object(obj.clone()));
        obj
    }

    #[test]
    fn plain_object_does_not_track() {
        let obj = Object::from_pairs([("a", 1)]);
        let counter = Probe::new();
        counter.track(|| {
            obj.get("a");
        });
        obj.set("a", 2);
        assert_eq!(counter.updates(), 0);
        assert_eq!(obj.peek("a"), Value::from(2));
    }

    #[test]
    fn reactive_field_notifies_on_change() {
        let obj = observed(vec![("a", Value::from(1))]);
        let counter = Probe::new();
        counter.track(|| {
            assert_eq!(obj.get("a"), Value::from(1));
        });

        obj.set("a", 2);
        assert_eq!(counter.updates(), 1);

        // Same value: no notification
        obj.set("a", 2);
        assert_eq!(counter.updates(), 1);
    }

    #[test]
    fn nan_write_does_not_notify() {
        let obj = observed(vec![("n", Value::from(f64::NAN))]);
        let counter = Probe::new();
        counter.track(|| {
            obj.get("n");
        });
        obj.set("n", f64::NAN);
        assert_eq!(counter.updates(), 0);
    }

    #[test]
    fn nested_objects_are_observed_lazily_on_write() {
        let obj = observed(vec![("inner", Value::Null)]);
        let nested = Object::from_pairs([("x", 1)]);
        obj.set("inner", nested.clone());
        assert!(nested.observer().is_some());
        assert!(nested.is_reactive_field("x"));
    }

    #[test]
    fn shallow_field_does_not_observe() {
        let obj = Object::new();
        let nested = Object::from_pairs([("x", 1)]);
        obj.define_reactive_shallow("p", nested.clone());
        assert!(nested.observer().is_none());
    }

    #[test]
    fn missing_key_inserts_plain_field() {
        let obj = observed(vec![]);
        obj.set("later", 1);
        assert!(obj.has("later"));
        assert!(!obj.is_reactive_field("later"));
    }

    #[test]
    fn frozen_object_rejects_writes() {
        let warnings = Rc::new(Cell::new(0));
        let w = warnings.clone();
        configure(|cfg| cfg.warn_handler = Some(Rc::new(move |_: &str| w.set(w.get() + 1))));

        let obj = Object::from_pairs([("a", 1)]);
        obj.freeze();
        obj.set("a", 5);
        assert_eq!(obj.peek("a"), Value::from(1));
        assert_eq!(warnings.get(), 1);
        reset_config();
    }

    #[test]
    fn get_path_walks_objects_and_arrays() {
        let tags = Array::from_values(vec![Value::from("x"), Value::from("y")]);
        let user = Object::from_pairs([("tags", Value::from(tags))]);
        let root = observed(vec![("user", Value::from(user))]);

        assert_eq!(root.get_path("user.tags.1"), Value::from("y"));
        assert_eq!(root.get_path("user.missing.deep"), Value::Null);
    }

    #[test]
    fn reading_container_field_depends_on_child_observer() {
        let list = Array::from_values(vec![Value::from(1)]);
        let obj = observed(vec![("list", Value::from(list.clone()))]);
        let counter = Probe::new();
        counter.track(|| {
            obj.get("list");
        });
        list.push(2);
        assert_eq!(counter.updates(), 1);
    }
}
