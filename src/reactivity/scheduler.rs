// ============================================================================
// spark-view - Scheduler
// Deduplicating, id-ordered queue of pending watchers
// ============================================================================
//
// A watcher notified several times before the flush runs is queued once.
// The flush runs watchers in ascending id order. Ids are handed out in
// creation order and parents create their children, so a parent always
// re-renders before its children.
//
// Watchers queued while the flush is running are inserted at their sorted
// position after the one currently running, so the flush still sees them in
// order and terminates once nothing stale remains. A watcher that keeps
// re-queuing itself is reported and skipped for the rest of the flush.
//
// No context borrow is held across a watcher run: every access to the queue
// goes through a short `with_context` call.
// ============================================================================

use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, debug_span};

use crate::config::with_config;
use crate::core::constants::RENDER;
use crate::core::context::with_context;
use crate::core::types::{Subscriber, WatcherId};
use crate::error::{handle_error, Error};
use crate::reactivity::next_tick::next_tick;

// =============================================================================
// QUEUE
// =============================================================================

/// Queue `watcher` for the next flush.
///
/// A watcher already pending is ignored. If no flush is scheduled one is:
/// immediately in the synchronous configuration (deferred to the end of
/// the outermost batch when batching), otherwise on the next tick.
pub fn queue_watcher(watcher: Rc<dyn Subscriber>) {
    let id = watcher.id();
    let schedule = with_context(|ctx| {
        if ctx.skipped.borrow().contains(&id) {
            return false;
        }
        if !ctx.has.borrow_mut().insert(id) {
            return false;
        }

        {
            let mut queue = ctx.queue.borrow_mut();
            if !ctx.flushing.get() {
                queue.push(watcher);
            } else {
                let index = ctx.flush_index.get();
                let mut pos = queue.len();
                while pos > index + 1 && queue[pos - 1].id() > id {
                    pos -= 1;
                }
                queue.insert(pos, watcher);
            }
        }

        if ctx.waiting.get() {
            return false;
        }
        ctx.waiting.set(true);
        true
    });

    if !schedule {
        return;
    }

    if with_config(|cfg| cfg.async_flush) {
        next_tick(|| {
            if with_context(|ctx| ctx.waiting.get() && !ctx.flushing.get()) {
                flush_scheduler_queue();
            }
        });
    } else if !with_context(|ctx| ctx.is_batching()) {
        flush_scheduler_queue();
    }
}

/// Run `hook` once the pending flush completes, or now if nothing is
/// pending.
pub fn queue_post_flush(hook: impl FnOnce() + 'static) {
    let pending = with_context(|ctx| {
        let pending = ctx.waiting.get() || ctx.flushing.get();
        if pending {
            ctx.post_flush.borrow_mut().push(Box::new(hook));
            return None;
        }
        Some(hook)
    });
    if let Some(hook) = pending {
        hook();
    }
}

// =============================================================================
// FLUSH
// =============================================================================

/// Resets scheduler state when the flush ends, including by panic.
struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        with_context(|ctx| {
            ctx.queue.borrow_mut().clear();
            ctx.has.borrow_mut().clear();
            ctx.circular.borrow_mut().clear();
            ctx.skipped.borrow_mut().clear();
            ctx.flush_index.set(0);
            ctx.waiting.set(false);
            ctx.flushing.set(false);
        });
    }
}

/// Drain the queue.
///
/// Each watcher's `before` hook runs immediately before the watcher. After
/// the drain, `updated` hooks of flushed render watchers run children
/// first, then the post-flush hooks.
pub fn flush_scheduler_queue() {
    let span = debug_span!("flush");
    let _enter = span.enter();

    let max_update_count = with_config(|cfg| cfg.max_update_count);
    let queued = with_context(|ctx| {
        ctx.flushing.set(true);
        let mut queue = ctx.queue.borrow_mut();
        queue.sort_by_key(|w| w.id());
        queue.len()
    });
    debug!(queued, "flush start");

    let guard = FlushGuard;
    let mut flushed: Vec<Rc<dyn Subscriber>> = Vec::new();
    let mut index = 0;

    loop {
        let next = with_context(|ctx| {
            ctx.flush_index.set(index);
            ctx.queue.borrow().get(index).cloned()
        });
        let Some(watcher) = next else { break };
        index += 1;
        let id = watcher.id();

        if with_context(|ctx| ctx.skipped.borrow().contains(&id)) {
            with_context(|ctx| ctx.has.borrow_mut().remove(&id));
            continue;
        }

        watcher.run_before();
        with_context(|ctx| ctx.has.borrow_mut().remove(&id));
        watcher.run();
        flushed.push(watcher.clone());

        if with_context(|ctx| ctx.has.borrow().contains(&id)) {
            check_cycle(&*watcher, id, max_update_count);
        }
    }

    drop(guard);
    debug!(flushed = flushed.len(), "flush end");

    call_updated_hooks(&flushed);

    let hooks = with_context(|ctx| std::mem::take(&mut *ctx.post_flush.borrow_mut()));
    for hook in hooks {
        hook();
    }
}

/// Count a re-entry of `id`; past the ceiling, report and skip it.
fn check_cycle(watcher: &dyn Subscriber, id: WatcherId, max_update_count: u32) {
    let count = with_context(|ctx| {
        let mut circular = ctx.circular.borrow_mut();
        let count = circular.entry(id).or_insert(0);
        *count += 1;
        *count
    });
    if count > max_update_count {
        with_context(|ctx| ctx.skipped.borrow_mut().insert(id));
        handle_error(
            &Error::InfiniteUpdateLoop {
                watcher: id.0,
                expression: watcher.expression(),
                count,
            },
            "scheduler",
        );
    }
}

fn call_updated_hooks(flushed: &[Rc<dyn Subscriber>]) {
    let mut seen = HashSet::new();
    for watcher in flushed.iter().rev() {
        if watcher.flags() & RENDER != 0 && seen.insert(watcher.id()) {
            watcher.run_updated();
        }
    }
}

// =============================================================================
// HOST ENTRY POINTS
// =============================================================================

/// Flush now if a flush is scheduled and not already running.
pub fn flush_sync() {
    if with_context(|ctx| ctx.waiting.get() && !ctx.flushing.get()) {
        flush_scheduler_queue();
    }
}

/// Whether any watcher is waiting to run.
pub fn has_pending() -> bool {
    with_context(|ctx| ctx.waiting.get() || ctx.queue_len() > 0)
}

// =============================================================================
// TESTS
// =============================================================================
