// ============================================================================
// spark-view - Watcher
// Re-runnable computation that tracks exactly what it read on its last run
// ============================================================================
//
// Each evaluation rebuilds the dep set from scratch into a second
// generation (`new_deps`). `cleanup_deps` then unsubscribes from every dep
// the evaluation did not touch and swaps the generations, which is what
// lets a watcher's dependencies shrink as well as grow.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{DepId, Subscriber, WatcherId};
use crate::error::{handle_error, Error, Result};
use crate::reactivity::equality::same_value;
use crate::reactivity::scheduler::queue_watcher;
use crate::reactivity::tracking::{Dep, TargetGuard};
use crate::store::{traverse, Value};

// =============================================================================
// TYPES
// =============================================================================

/// The function a watcher re-evaluates
pub type Getter = Box<dyn FnMut() -> Result<Value>>;

/// Invoked with `(new, old)` when a watcher's value changes
pub type Callback = Box<dyn FnMut(&Value, &Value) -> Result<()>>;

/// Lifecycle hook (`before` / `updated`)
pub type Hook = Box<dyn FnMut()>;

/// Construction options for [`Watcher::new`].
#[derive(Default)]
pub struct WatcherOptions {
    pub lazy: bool,
    pub sync: bool,
    pub user: bool,
    pub deep: bool,
    pub render: bool,
    /// Description used in diagnostics
    pub expression: Option<String>,
    /// Runs immediately before each scheduled run
    pub before: Option<Hook>,
    /// Runs once per flush after every queued watcher ran
    pub updated: Option<Hook>,
}

impl WatcherOptions {
    pub fn lazy() -> Self {
        Self {
            lazy: true,
            ..Self::default()
        }
    }

    pub fn user() -> Self {
        Self {
            user: true,
            ..Self::default()
        }
    }

    pub fn render() -> Self {
        Self {
            render: true,
            ..Self::default()
        }
    }

    fn flags(&self) -> u32 {
        let mut flags = ACTIVE;
        if self.lazy {
            flags |= LAZY | DIRTY;
        }
        if self.sync {
            flags |= SYNC;
        }
        if self.user {
            flags |= USER;
        }
        if self.deep {
            flags |= DEEP;
        }
        if self.render {
            flags |= RENDER;
        }
        flags
    }
}

// =============================================================================
// WATCHER INNER
// =============================================================================

/// Shared state of a watcher. Deps hold it weakly; the scheduler holds it
/// strongly only while it is queued.
pub struct WatcherInner {
    id: WatcherId,
    flags: Cell<u32>,
    expression: String,

    getter: RefCell<Option<Getter>>,
    callback: RefCell<Option<Callback>>,
    before: RefCell<Option<Hook>>,
    updated: RefCell<Option<Hook>>,

    value: RefCell<Value>,

    deps: RefCell<Vec<Rc<Dep>>>,
    dep_ids: RefCell<HashSet<DepId>>,
    new_deps: RefCell<Vec<Rc<Dep>>>,
    new_dep_ids: RefCell<HashSet<DepId>>,

    self_weak: Weak<WatcherInner>,
}

impl WatcherInner {
    fn has_flag(&self, flag: u32) -> bool {
        self.flags.get() & flag != 0
    }

    fn set_flag(&self, flag: u32) {
        self.flags.set(self.flags.get() | flag);
    }

    fn clear_flag(&self, flag: u32) {
        self.flags.set(self.flags.get() & !flag);
    }

    pub fn is_dirty(&self) -> bool {
        self.has_flag(DIRTY)
    }

    /// Cached value of the last successful evaluation
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    fn as_subscriber(&self) -> Option<Rc<dyn Subscriber>> {
        let this: Rc<dyn Subscriber> = self.self_weak.upgrade()?;
        Some(this)
    }

    // =========================================================================
    // EVALUATION
    // =========================================================================

    /// Evaluate the getter with this watcher as target and rebuild deps.
    ///
    /// User watchers report getter errors and yield their previous value;
    /// other watchers return the error to their owner.
    fn get(&self) -> Result<Value> {
        // Re-entrant evaluation (the getter reads itself) sees the cache
        let Some(mut getter) = self.getter.borrow_mut().take() else {
            return Ok(self.value());
        };

        self.set_flag(EVALUATING);
        let result = {
            let _guard = TargetGuard::push(self.as_subscriber());
            let result = getter();
            if self.has_flag(DEEP) {
                if let Ok(value) = &result {
                    traverse(value);
                }
            }
            result
        };
        *self.getter.borrow_mut() = Some(getter);
        self.clear_flag(EVALUATING);
        self.cleanup_deps();

        match result {
            Ok(value) => Ok(value),
            Err(err) if self.has_flag(USER) => {
                handle_error(
                    &Error::Watcher {
                        expression: self.expression.clone(),
                        message: err.to_string(),
                    },
                    "watcher getter",
                );
                Ok(self.value())
            }
            Err(err) => Err(err),
        }
    }

    /// Drop subscriptions the last evaluation did not touch, then swap
    /// generations.
    fn cleanup_deps(&self) {
        {
            let new_ids = self.new_dep_ids.borrow();
            for dep in self.deps.borrow().iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_sub(self.id);
                }
            }
        }
        std::mem::swap(
            &mut *self.dep_ids.borrow_mut(),
            &mut *self.new_dep_ids.borrow_mut(),
        );
        self.new_dep_ids.borrow_mut().clear();
        std::mem::swap(
            &mut *self.deps.borrow_mut(),
            &mut *self.new_deps.borrow_mut(),
        );
        self.new_deps.borrow_mut().clear();
    }

    /// Scheduler entry point.
    fn run_job(&self) {
        if !self.has_flag(ACTIVE) {
            return;
        }
        let value = match self.get() {
            Ok(value) => value,
            Err(err) => {
                handle_error(&err, "watcher");
                return;
            }
        };

        let changed = {
            let old = self.value.borrow();
            !same_value(&value, &old) || value.is_container() || self.has_flag(DEEP)
        };
        if !changed {
            return;
        }

        let old = self.value.replace(value.clone());
        let callback = self.callback.borrow_mut().take();
        if let Some(mut callback) = callback {
            let result = callback(&value, &old);
            *self.callback.borrow_mut() = Some(callback);
            if let Err(err) = result {
                handle_error(
                    &Error::Callback {
                        expression: self.expression.clone(),
                        message: err.to_string(),
                    },
                    "watcher callback",
                );
            }
        }
    }

    /// Evaluate a lazy watcher and clear its dirty flag. On error the
    /// watcher stays dirty.
    pub fn evaluate(&self) -> Result<()> {
        let value = self.get()?;
        *self.value.borrow_mut() = value;
        self.clear_flag(DIRTY);
        Ok(())
    }

    /// Forward every dep of this watcher to the current target.
    pub fn depend(&self) {
        let deps: Vec<Rc<Dep>> = self.deps.borrow().clone();
        for dep in deps {
            dep.depend();
        }
    }

    /// Deactivate and unsubscribe from every dep. A queued run becomes a
    /// no-op.
    pub fn teardown(&self) {
        if !self.has_flag(ACTIVE) {
            return;
        }
        debug!(watcher = self.id.0, expression = %self.expression, "teardown");
        self.clear_flag(ACTIVE);
        // Teardown may happen mid-evaluation, so both generations go
        let mut deps = std::mem::take(&mut *self.deps.borrow_mut());
        deps.append(&mut self.new_deps.borrow_mut());
        for dep in deps {
            dep.remove_sub(self.id);
        }
        self.dep_ids.borrow_mut().clear();
        self.new_dep_ids.borrow_mut().clear();
    }

    fn call_hook(hook: &RefCell<Option<Hook>>) {
        let taken = hook.borrow_mut().take();
        if let Some(mut f) = taken {
            f();
            let mut slot = hook.borrow_mut();
            if slot.is_none() {
                *slot = Some(f);
            }
        }
    }
}

// =============================================================================
// SUBSCRIBER IMPL
// =============================================================================

impl Subscriber for WatcherInner {
    fn id(&self) -> WatcherId {
        self.id
    }

    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn add_dep(&self, dep: Rc<Dep>) {
        if !self.has_flag(ACTIVE) {
            return;
        }
        let id = dep.id();
        if !self.new_dep_ids.borrow_mut().insert(id) {
            return;
        }
        let already_subscribed = self.dep_ids.borrow().contains(&id);
        if !already_subscribed {
            let weak: Weak<dyn Subscriber> = self.self_weak.clone();
            dep.add_sub(self.id, weak);
        }
        self.new_deps.borrow_mut().push(dep);
    }

    fn update(&self) {
        if self.has_flag(LAZY) {
            self.set_flag(DIRTY);
        } else if self.has_flag(SYNC) {
            self.run_job();
        } else if let Some(this) = self.as_subscriber() {
            queue_watcher(this);
        }
    }

    fn run(&self) {
        self.run_job();
    }

    fn run_before(&self) {
        if self.has_flag(ACTIVE) {
            Self::call_hook(&self.before);
        }
    }

    fn run_updated(&self) {
        if self.has_flag(ACTIVE) {
            Self::call_hook(&self.updated);
        }
    }

    fn expression(&self) -> String {
        self.expression.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// WATCHER HANDLE
// =============================================================================

/// Handle to a watcher. The last handle tears the watcher down on drop,
/// even while the scheduler still holds it queued.
#[derive(Clone)]
pub struct Watcher {
    // Declared first so it drops while `inner` is still reachable
    _handle: Rc<HandleGuard>,
    inner: Rc<WatcherInner>,
}

/// Shared by user-facing handles only; the scheduler queue never clones it.
struct HandleGuard(Weak<WatcherInner>);

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.0.upgrade() {
            inner.teardown();
        }
    }
}

impl Watcher {
    /// Create a watcher. Non-lazy watchers evaluate immediately; an error
    /// from that first evaluation of a non-user watcher is reported.
    pub fn new(getter: Getter, callback: Option<Callback>, options: WatcherOptions) -> Self {
        let id = with_context(|ctx| ctx.next_watcher_id());
        let flags = options.flags();
        let expression = options.expression.unwrap_or_else(|| id.to_string());

        let inner = Rc::new_cyclic(|weak| WatcherInner {
            id,
            flags: Cell::new(flags),
            expression,
            getter: RefCell::new(Some(getter)),
            callback: RefCell::new(callback),
            before: RefCell::new(options.before),
            updated: RefCell::new(options.updated),
            value: RefCell::new(Value::Null),
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_deps: RefCell::new(Vec::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
            self_weak: weak.clone(),
        });

        if !options.lazy {
            match inner.get() {
                Ok(value) => *inner.value.borrow_mut() = value,
                Err(err) => handle_error(&err, "watcher"),
            }
        }

        Watcher {
            _handle: Rc::new(HandleGuard(Rc::downgrade(&inner))),
            inner,
        }
    }

    pub fn id(&self) -> WatcherId {
        self.inner.id
    }

    pub fn flags(&self) -> u32 {
        self.inner.flags.get()
    }

    pub fn expression(&self) -> &str {
        &self.inner.expression
    }

    /// Cached value of the last evaluation
    pub fn value(&self) -> Value {
        self.inner.value()
    }

    pub fn is_active(&self) -> bool {
        self.inner.has_flag(ACTIVE)
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    /// Number of deps recorded by the last evaluation
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    pub fn depends_on(&self, dep: &Dep) -> bool {
        self.inner.dep_ids.borrow().contains(&dep.id())
    }

    /// Schedule this watcher as though a dependency changed.
    pub fn update(&self) {
        self.inner.update();
    }

    /// Re-evaluate now, firing the callback if the value changed.
    pub fn run(&self) {
        self.inner.run_job();
    }

    pub fn evaluate(&self) -> Result<()> {
        self.inner.evaluate()
    }

    pub fn depend(&self) {
        self.inner.depend();
    }

    pub fn teardown(&self) {
        self.inner.teardown();
    }

    /// Install the pre-run hook (replaces any previous one).
    pub fn set_before(&self, hook: Hook) {
        *self.inner.before.borrow_mut() = Some(hook);
    }

    /// Install the post-flush hook (replaces any previous one).
    pub fn set_updated(&self, hook: Hook) {
        *self.inner.updated.borrow_mut() = Some(hook);
    }

    pub(crate) fn inner(&self) -> &Rc<WatcherInner> {
        &self.inner
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("expression", &self.inner.expression)
            .field("active", &self.is_active())
            .field("deps", &self.dep_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
