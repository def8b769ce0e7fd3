// ============================================================================
// spark-view - Type Definitions
// Identifiers and the type-erased subscriber interface of the dependency graph
// ============================================================================

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use super::constants::*;
use crate::reactivity::tracking::Dep;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identity of a dependency node. Unique per thread, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(pub u64);

/// Identity of a watcher. Strictly increasing in creation order, which is
/// what gives the scheduler its parent-before-child flush order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(pub u64);

impl fmt::Display for DepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dep#{}", self.0)
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher#{}", self.0)
    }
}

// =============================================================================
// SUBSCRIBER TRAIT
// =============================================================================
//
// The dependency graph only needs a handful of operations from the things
// that subscribe to it: identity, dependency registration, and the
// notify/run entry points used by the scheduler. Keeping them behind a trait
// lets `Dep` hold `Weak<dyn Subscriber>` back-references and lets tests plug
// in mock subscribers.
// =============================================================================

/// Type-erased computation interface used by `Dep` and the scheduler.
pub trait Subscriber: Any {
    /// Unique, creation-ordered id
    fn id(&self) -> WatcherId;

    /// Flags bitmask
    fn flags(&self) -> u32;

    /// Record that the current evaluation read `dep`.
    fn add_dep(&self, dep: Rc<Dep>);

    /// Called by `Dep::notify` when a dependency changed.
    fn update(&self);

    /// Re-evaluate now (called by the scheduler during a flush).
    fn run(&self);

    /// Pre-run hook, invoked by the scheduler immediately before `run`.
    fn run_before(&self) {}

    /// Post-flush hook, invoked once per flush after every queued run.
    fn run_updated(&self) {}

    /// Human readable description for diagnostics
    fn expression(&self) -> String {
        self.id().to_string()
    }

    /// Whether teardown has not happened yet
    fn is_active(&self) -> bool {
        self.flags() & ACTIVE != 0
    }

    /// Whether this computation is lazy
    fn is_lazy(&self) -> bool {
        self.flags() & LAZY != 0
    }

    /// Upcast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

// =============================================================================
// TESTS
// =============================================================================
