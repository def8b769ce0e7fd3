// ============================================================================
// spark-view - Dependency Tracking
// Dependency nodes and the "currently evaluating" target stack
// ============================================================================
//
// A `Dep` is the publisher side of the graph: one per observable storage
// location. It only holds weak back-references to its subscribers; the
// subscribers own the strong side (`Rc<Dep>`) through their dep sets.
//
// Borrow scoping follows collect-then-mutate: the subscriber list is
// snapshotted before any subscriber runs, because running one may add or
// remove subscriptions on the very same dep.
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::config::with_config;
use crate::core::context::with_context;
use crate::core::types::{DepId, Subscriber, WatcherId};

// =============================================================================
// DEP
// =============================================================================

/// A dependency node: a set of subscribed computations.
pub struct Dep {
    id: DepId,
    subs: RefCell<Vec<(WatcherId, Weak<dyn Subscriber>)>>,
}

impl Dep {
    /// Create a new dependency node with a fresh id.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            id: with_context(|ctx| ctx.next_dep_id()),
            subs: RefCell::new(Vec::new()),
        })
    }

    pub fn id(&self) -> DepId {
        self.id
    }

    /// Subscribe `sub`. A subscriber is never held twice.
    pub fn add_sub(&self, id: WatcherId, sub: Weak<dyn Subscriber>) {
        let mut subs = self.subs.borrow_mut();
        if subs.iter().any(|(existing, _)| *existing == id) {
            return;
        }
        trace!(dep = self.id.0, watcher = id.0, "subscribe");
        subs.push((id, sub));
    }

    /// Unsubscribe the subscriber with `id`. Unknown ids are ignored.
    pub fn remove_sub(&self, id: WatcherId) {
        let mut subs = self.subs.borrow_mut();
        if let Some(pos) = subs.iter().position(|(existing, _)| *existing == id) {
            trace!(dep = self.id.0, watcher = id.0, "unsubscribe");
            subs.remove(pos);
        }
    }

    /// Register this dep with the currently evaluating target, if any.
    ///
    /// Outside of an evaluation this is a no-op.
    pub fn depend(self: &Rc<Self>) {
        if let Some(target) = current_target() {
            target.add_dep(self.clone());
        }
    }

    /// Notify every live subscriber.
    ///
    /// Dead weak entries are pruned. In the synchronous configuration the
    /// snapshot is sorted by id so subscribers run in creation order.
    pub fn notify(&self) {
        let mut live: Vec<Rc<dyn Subscriber>> = {
            let mut subs = self.subs.borrow_mut();
            subs.retain(|(_, weak)| weak.strong_count() > 0);
            subs.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };

        if !with_config(|cfg| cfg.async_flush) {
            live.sort_by_key(|sub| sub.id());
        }

        for sub in live {
            sub.update();
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subs
            .borrow()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Whether the subscriber with `id` is subscribed
    pub fn has_sub(&self, id: WatcherId) -> bool {
        self.subs.borrow().iter().any(|(existing, _)| *existing == id)
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subs", &self.subscriber_count())
            .finish()
    }
}

// =============================================================================
// TARGET STACK
// =============================================================================

/// Make `target` the currently evaluating computation (`None` suspends
/// tracking). Must be paired with [`pop_target`]; prefer [`TargetGuard`].
pub fn push_target(target: Option<Rc<dyn Subscriber>>) {
    with_context(|ctx| ctx.push_target(target));
}

/// Restore the previously evaluating computation.
pub fn pop_target() {
    with_context(|ctx| ctx.pop_target());
}

/// The currently evaluating computation.
pub fn current_target() -> Option<Rc<dyn Subscriber>> {
    with_context(|ctx| ctx.current_target())
}

/// Pushes a target on creation and pops it on drop, so the stack is restored
/// even when the evaluated function returns early or panics.
pub struct TargetGuard {
    _private: (),
}

impl TargetGuard {
    pub fn push(target: Option<Rc<dyn Subscriber>>) -> Self {
        push_target(target);
        Self { _private: () }
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        pop_target();
    }
}

// =============================================================================
// TESTS
// =============================================================================
