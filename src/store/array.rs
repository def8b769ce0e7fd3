// ============================================================================
// spark-view - Reactive Array
// Ordered container; reads depend on its observer, mutators notify once
// ============================================================================
//
// Elements are not individually reactive. Every read subscribes to the
// array's own observer dep, and every mutating operation notifies that dep
// exactly once (and only when something changed). Newly introduced
// elements are observed before the notification goes out.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::observer::{observe, Observer};
use super::value::Value;
use crate::core::constants::{FROZEN, RAW};
use crate::error::warn;
use crate::reactivity::equality::same_value;

/// Most `Null` slots a single `set_index` past the end may add.
pub const MAX_PADDING: usize = 1 << 16;

struct ArrayInner {
    items: RefCell<Vec<Value>>,
    flags: Cell<u32>,
    observer: RefCell<Option<Rc<Observer>>>,
}

/// Shared handle to an ordered container. Equality is identity.
#[derive(Clone)]
pub struct Array(Rc<ArrayInner>);

impl Array {
    pub fn new() -> Self {
        Self::from_values(Vec::new())
    }

    /// Build a plain (not yet observed) array.
    pub fn from_values(items: Vec<Value>) -> Self {
        Array(Rc::new(ArrayInner {
            items: RefCell::new(items),
            flags: Cell::new(0),
            observer: RefCell::new(None),
        }))
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    // =========================================================================
    // TRACKED READS
    // =========================================================================

    fn depend(&self) {
        if let Some(ob) = self.observer() {
            ob.dep().depend();
        }
    }

    /// Subscribe the evaluating watcher to every nested element's observer,
    /// recursing through nested arrays.
    pub(crate) fn depend_elements(&self) {
        for item in self.peek_values() {
            match &item {
                Value::Object(obj) => {
                    if let Some(ob) = obj.observer() {
                        ob.dep().depend();
                    }
                }
                Value::Array(arr) => {
                    if let Some(ob) = arr.observer() {
                        ob.dep().depend();
                    }
                    arr.depend_elements();
                }
                _ => {}
            }
        }
    }

    /// Element at `index`, or `Null` when out of range.
    pub fn get(&self, index: usize) -> Value {
        self.depend();
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.depend();
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.depend();
        self.peek_values()
    }

    /// Iterate over a snapshot of the current elements.
    pub fn iter_values(&self) -> std::vec::IntoIter<Value> {
        self.to_vec().into_iter()
    }

    /// Copy of the current elements without registering a dependency.
    pub fn peek_values(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    // =========================================================================
    // MUTATORS
    // =========================================================================

    /// Guard shared by every mutator.
    fn writable(&self, op: &str) -> bool {
        if self.is_frozen() {
            warn(&format!("cannot {op} on a frozen array"));
            return false;
        }
        true
    }

    /// Observe `added` elements, then notify the array's dep.
    fn changed(&self, added: &[Value]) {
        let ob = self.observer();
        if let Some(ob) = ob {
            for item in added {
                observe(item);
            }
            ob.dep().notify();
        }
    }

    pub fn push(&self, value: impl Into<Value>) {
        if !self.writable("push") {
            return;
        }
        let value = value.into();
        self.0.items.borrow_mut().push(value.clone());
        self.changed(&[value]);
    }

    pub fn pop(&self) -> Option<Value> {
        if !self.writable("pop") {
            return None;
        }
        let popped = self.0.items.borrow_mut().pop();
        if popped.is_some() {
            self.changed(&[]);
        }
        popped
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        if !self.writable("shift") {
            return None;
        }
        let shifted = {
            let mut items = self.0.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        if shifted.is_some() {
            self.changed(&[]);
        }
        shifted
    }

    /// Insert at the front.
    pub fn unshift(&self, value: impl Into<Value>) {
        self.insert(0, value);
    }

    /// Insert at `index`, clamped to the length.
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        if !self.writable("insert") {
            return;
        }
        let value = value.into();
        {
            let mut items = self.0.items.borrow_mut();
            let index = index.min(items.len());
            items.insert(index, value.clone());
        }
        self.changed(&[value]);
    }

    pub fn remove(&self, index: usize) -> Option<Value> {
        if !self.writable("remove") {
            return None;
        }
        let removed = {
            let mut items = self.0.items.borrow_mut();
            if index < items.len() {
                Some(items.remove(index))
            } else {
                None
            }
        };
        if removed.is_some() {
            self.changed(&[]);
        }
        removed
    }

    /// Remove `delete_count` elements starting at `start` and insert `items`
    /// in their place. Returns the removed elements.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        if !self.writable("splice") {
            return Vec::new();
        }
        let removed: Vec<Value> = {
            let mut current = self.0.items.borrow_mut();
            let start = start.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            current.splice(start..end, items.iter().cloned()).collect()
        };
        if !removed.is_empty() || !items.is_empty() {
            self.changed(&items);
        }
        removed
    }

    /// Stable sort with `compare`.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) {
        if !self.writable("sort") {
            return;
        }
        // Sorted outside the cell so `compare` may read this array
        let before = self.peek_values();
        let mut sorted = before.clone();
        sorted.sort_by(|a, b| compare(a, b));
        let moved = before.iter().zip(sorted.iter()).any(|(a, b)| !same_value(a, b));
        if moved {
            *self.0.items.borrow_mut() = sorted;
            self.changed(&[]);
        }
    }

    pub fn reverse(&self) {
        if !self.writable("reverse") {
            return;
        }
        let moved = {
            let mut items = self.0.items.borrow_mut();
            items.reverse();
            items.len() > 1
        };
        if moved {
            self.changed(&[]);
        }
    }

    /// Keep only the elements `keep` accepts.
    pub fn retain(&self, mut keep: impl FnMut(&Value) -> bool) {
        if !self.writable("retain") {
            return;
        }
        let mut kept = self.peek_values();
        let before = kept.len();
        kept.retain(|v| keep(v));
        if kept.len() != before {
            *self.0.items.borrow_mut() = kept;
            self.changed(&[]);
        }
    }

    pub fn clear(&self) {
        if !self.writable("clear") {
            return;
        }
        let had_items = {
            let mut items = self.0.items.borrow_mut();
            let had = !items.is_empty();
            items.clear();
            had
        };
        if had_items {
            self.changed(&[]);
        }
    }

    /// Replace the element at `index`. Writing past the end pads with
    /// `Null`, up to [`MAX_PADDING`] new slots; further out is refused.
    pub fn set_index(&self, index: usize, value: impl Into<Value>) {
        if !self.writable("set index") {
            return;
        }
        let len = self.0.items.borrow().len();
        if index.saturating_sub(len) > MAX_PADDING {
            warn(&format!("index {index} is too far past the end of an array of length {len}"));
            return;
        }
        let value = value.into();
        let changed = {
            let mut items = self.0.items.borrow_mut();
            if index < items.len() {
                if same_value(&items[index], &value) {
                    false
                } else {
                    items[index] = value.clone();
                    true
                }
            } else {
                items.resize(index, Value::Null);
                items.push(value.clone());
                true
            }
        };
        if changed {
            self.changed(&[value]);
        }
    }

    // =========================================================================
    // OBSERVER & FLAGS
    // =========================================================================

    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.observer.borrow().clone()
    }

    pub(crate) fn attach_observer(&self, ob: Rc<Observer>) {
        *self.0.observer.borrow_mut() = Some(ob);
    }

    pub(crate) fn flags(&self) -> u32 {
        self.0.flags.get()
    }

    pub fn freeze(&self) -> &Self {
        self.0.flags.set(self.0.flags.get() | FROZEN);
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.0.flags.get() & FROZEN != 0
    }

    pub fn mark_raw(&self) -> &Self {
        self.0.flags.set(self.0.flags.get() | RAW);
        self
    }

    pub fn is_raw(&self) -> bool {
        self.0.flags.get() & RAW != 0
    }
}

impl Default for Array {
    fn default() -> Self {
        Array::new()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Value::Array(self.clone()), f)
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Array::from_values(iter.into_iter().collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
