// ============================================================================
// spark-view - Batching
// Group synchronous writes into one flush; read without tracking
// ============================================================================

use crate::core::context::with_context;
use crate::reactivity::scheduler::flush_sync;
use crate::reactivity::tracking::TargetGuard;

// =============================================================================
// BATCH
// =============================================================================

/// Run `f` as one burst of writes.
///
/// With deferred flushing every burst is already coalesced until the next
/// tick, so this only matters in the synchronous configuration: watchers
/// queued inside the batch run once, when the outermost batch exits.
///
/// # Example
///
/// ```
/// use spark_view::{batch, configure, observe, reset_config, watch, Object, Value, WatchOptions, WatchSource};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// configure(|cfg| cfg.async_flush = false);
///
/// let state = Object::from_pairs([("a", 1), ("b", 2)]);
/// observe(&Value::from(state.clone()));
///
/// let runs = Rc::new(Cell::new(0));
/// let source = state.clone();
/// let counter = runs.clone();
/// let _stop = watch(
///     WatchSource::getter(move || Value::from(format!("{}{}", source.get("a"), source.get("b")))),
///     move |_, _| counter.set(counter.get() + 1),
///     WatchOptions::default(),
/// );
///
/// batch(|| {
///     state.set("a", 10);
///     state.set("b", 20);
///     assert_eq!(runs.get(), 0);
/// });
/// assert_eq!(runs.get(), 1);
/// reset_config();
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_batch());

    // Use a guard pattern to ensure we exit the batch even on panic
    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_batch());

            // When the outermost batch completes, flush what it queued
            if depth == 0 && !std::thread::panicking() {
                flush_sync();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

/// Check if currently inside a batch.
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

// =============================================================================
// UNTRACK
// =============================================================================

/// Run `f` without registering any reads with the evaluating watcher.
///
/// # Example
///
/// ```
/// use spark_view::{is_tracking, untrack};
///
/// untrack(|| assert!(!is_tracking()));
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let _guard = TargetGuard::push(None);
    f()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{configure, reset_config};
    use crate::reactivity::tracking::probe::Probe;
    use crate::store::{observe, Object, Value};

    #[test]
    fn nested_batches() {
        assert!(!is_batching());
        batch(|| {
            assert!(is_batching());
            batch(|| assert!(is_batching()));
            assert!(is_batching());
        });
        assert!(!is_batching());
    }

    #[test]
    fn batch_returns_value() {
        assert_eq!(batch(|| 42), 42);
    }

    #[test]
    fn batch_guard_restores_depth_on_panic() {
        let result = std::panic::catch_unwind(|| {
            batch(|| panic!("inside batch"));
        });
        assert!(result.is_err());
        assert!(!is_batching());
    }

    #[test]
    fn batch_defers_sync_flush() {
        configure(|cfg| cfg.async_flush = false);
        let obj = Object::from_pairs([("a", 1)]);
        observe(&Value::from(obj.clone()));

        let runs = std::rc::Rc::new(std::cell::Cell::new(0));
        let (o, r) = (obj.clone(), runs.clone());
        let _w = crate::reactivity::watcher::Watcher::new(
            Box::new(move || {
                r.set(r.get() + 1);
                Ok(o.get("a"))
            }),
            None,
            Default::default(),
        );

        batch(|| {
            obj.set("a", 2);
            obj.set("a", 3);
            assert_eq!(runs.get(), 1);
        });
        assert_eq!(runs.get(), 2);
        reset_config();
    }

    #[test]
    fn untrack_hides_reads() {
        let obj = Object::from_pairs([("a", 1)]);
        observe(&Value::from(obj.clone()));
        let probe = Probe::new();
        probe.track(|| untrack(|| obj.get("a")));
        obj.set("a", 2);
        assert_eq!(probe.updates(), 0);
    }
}
