// ============================================================================
// spark-view - Reactive Context
// Thread-local state for the evaluation stack, id counters and the scheduler
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::types::{DepId, Subscriber, WatcherId};

// =============================================================================
// REACTIVE CONTEXT
// =============================================================================

/// Thread-local reactive context holding all process-wide state for reactivity.
///
/// The graph is single-threaded by construction: every piece of global state
/// lives here, behind `thread_local!`, so two threads get two independent
/// reactive worlds.
pub struct ReactiveContext {
    // =========================================================================
    // EVALUATION STACK
    // =========================================================================
    /// Currently evaluating computation (the "target" reads register with)
    target: RefCell<Option<Rc<dyn Subscriber>>>,

    /// Suspended outer targets (nested evaluation)
    target_stack: RefCell<Vec<Option<Rc<dyn Subscriber>>>>,

    // =========================================================================
    // ID COUNTERS
    // =========================================================================
    next_dep_id: Cell<u64>,
    next_watcher_id: Cell<u64>,

    // =========================================================================
    // BATCHING
    // =========================================================================
    /// Current batch depth (for nested batches)
    batch_depth: Cell<u32>,

    // =========================================================================
    // SCHEDULER
    // =========================================================================
    /// Pending computations, ordered by id while flushing
    pub(crate) queue: RefCell<Vec<Rc<dyn Subscriber>>>,

    /// Ids currently pending in `queue`
    pub(crate) has: RefCell<HashSet<WatcherId>>,

    /// Re-entry count per id within the current flush
    pub(crate) circular: RefCell<HashMap<WatcherId, u32>>,

    /// Ids that hit the re-entry ceiling and are skipped for this flush
    pub(crate) skipped: RefCell<HashSet<WatcherId>>,

    /// A flush has been scheduled but has not started
    pub(crate) waiting: Cell<bool>,

    /// A flush is in progress
    pub(crate) flushing: Cell<bool>,

    /// Position of the computation currently running in `queue`
    pub(crate) flush_index: Cell<usize>,

    /// Callbacks to run once the current (or next) flush completes
    pub(crate) post_flush: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl ReactiveContext {
    /// Create a new reactive context with default values
    pub fn new() -> Self {
        Self {
            target: RefCell::new(None),
            target_stack: RefCell::new(Vec::new()),
            next_dep_id: Cell::new(0),
            next_watcher_id: Cell::new(0),
            batch_depth: Cell::new(0),
            queue: RefCell::new(Vec::new()),
            has: RefCell::new(HashSet::new()),
            circular: RefCell::new(HashMap::new()),
            skipped: RefCell::new(HashSet::new()),
            waiting: Cell::new(false),
            flushing: Cell::new(false),
            flush_index: Cell::new(0),
            post_flush: RefCell::new(Vec::new()),
        }
    }

    // =========================================================================
    // EVALUATION STACK
    // =========================================================================

    /// Suspend the current target and make `target` current.
    pub fn push_target(&self, target: Option<Rc<dyn Subscriber>>) {
        let prev = self.target.replace(target);
        self.target_stack.borrow_mut().push(prev);
    }

    /// Restore the previously suspended target.
    pub fn pop_target(&self) {
        let prev = self.target_stack.borrow_mut().pop().flatten();
        *self.target.borrow_mut() = prev;
    }

    /// Get the current target
    pub fn current_target(&self) -> Option<Rc<dyn Subscriber>> {
        self.target.borrow().clone()
    }

    /// Check if there's a current target
    pub fn has_target(&self) -> bool {
        self.target.borrow().is_some()
    }

    /// Depth of the suspended-target stack
    pub fn target_depth(&self) -> usize {
        self.target_stack.borrow().len()
    }

    // =========================================================================
    // ID COUNTERS
    // =========================================================================

    /// Allocate the next dependency id
    pub fn next_dep_id(&self) -> DepId {
        let id = self.next_dep_id.get() + 1;
        self.next_dep_id.set(id);
        DepId(id)
    }

    /// Allocate the next watcher id
    pub fn next_watcher_id(&self) -> WatcherId {
        let id = self.next_watcher_id.get() + 1;
        self.next_watcher_id.set(id);
        WatcherId(id)
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Increment batch depth, returns new depth
    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    /// Decrement batch depth, returns new depth
    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    /// Get current batch depth
    pub fn batch_depth(&self) -> u32 {
        self.batch_depth.get()
    }

    /// Check if currently in a batch
    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    // =========================================================================
    // SCHEDULER
    // =========================================================================

    /// Number of entries in the pending queue
    pub fn queue_len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Check if a flush is scheduled or in progress
    pub fn is_flush_pending(&self) -> bool {
        self.waiting.get() || self.flushing.get()
    }

    /// Check if a flush is in progress
    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    /// The thread-local reactive context
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Access the thread-local reactive context.
///
/// # Example
///
/// ```ignore
/// with_context(|ctx| {
///     ctx.enter_batch();
/// });
/// ```
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Check if reads are currently being tracked (a computation is evaluating)
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.has_target())
}

/// Check if currently in a batch
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

// =============================================================================
// TESTS
// =============================================================================
