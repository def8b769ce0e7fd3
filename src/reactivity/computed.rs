// ============================================================================
// spark-view - Computed
// Lazily evaluated, cached derivation
// ============================================================================

use crate::core::context::is_tracking;
use crate::error::{handle_error, Result};
use crate::reactivity::watcher::{Watcher, WatcherOptions};
use crate::store::Value;

/// A cached derived value backed by a lazy watcher.
///
/// Notifications only mark it dirty; the getter re-runs on the next read.
/// Reading it inside another computation forwards its dependencies, so the
/// reader is notified by the same writes.
#[derive(Clone, Debug)]
pub struct Computed {
    watcher: Watcher,
}

/// Create a computed value.
///
/// ```
/// use spark_view::{computed, observe, Object, Value};
///
/// let state = Object::from_pairs([("n", 2)]);
/// observe(&Value::from(state.clone()));
///
/// let s = state.clone();
/// let double = computed(move || s.get("n").as_f64().unwrap_or(0.0) * 2.0);
/// assert_eq!(double.get(), Value::from(4));
///
/// state.set("n", 5);
/// assert_eq!(double.get(), Value::from(10));
/// ```
pub fn computed<T, F>(mut getter: F) -> Computed
where
    T: Into<Value>,
    F: FnMut() -> T + 'static,
{
    try_computed(move || Ok(getter().into()))
}

/// Create a computed value whose getter can fail.
pub fn try_computed(getter: impl FnMut() -> Result<Value> + 'static) -> Computed {
    Computed {
        watcher: Watcher::new(
            Box::new(getter),
            None,
            WatcherOptions {
                expression: Some("computed".to_string()),
                ..WatcherOptions::lazy()
            },
        ),
    }
}

impl Computed {
    /// Current value. A getter error is reported and the previous value
    /// returned.
    pub fn get(&self) -> Value {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => {
                handle_error(&err, "computed getter");
                self.watcher.value()
            }
        }
    }

    /// Current value, returning a getter error to the caller.
    pub fn try_get(&self) -> Result<Value> {
        let result = if self.watcher.is_dirty() {
            self.watcher.evaluate()
        } else {
            Ok(())
        };
        if is_tracking() {
            self.watcher.depend();
        }
        result.map(|()| self.watcher.value())
    }

    pub fn is_dirty(&self) -> bool {
        self.watcher.is_dirty()
    }

    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }
}
