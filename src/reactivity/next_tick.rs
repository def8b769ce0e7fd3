// ============================================================================
// spark-view - Next Tick
// Deferred callback queue drained by the host at its microtask checkpoint
// ============================================================================
//
// Rust has no ambient microtask queue, so deferral is explicit: callbacks
// accumulate here and the host calls `run_ticks()` after each burst of
// state writes (end of an event handler, end of a frame). The scheduler's
// deferred flush is itself a tick callback, so a callback queued after a
// write observes the patched tree.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

type TickFn = Box<dyn FnOnce()>;

thread_local! {
    static TICKS: RefCell<VecDeque<TickFn>> = RefCell::new(VecDeque::new());
}

/// Queue `callback` for the next tick.
pub fn next_tick(callback: impl FnOnce() + 'static) {
    TICKS.with(|ticks| ticks.borrow_mut().push_back(Box::new(callback)));
}

/// Queue a completion marker and return a handle to it.
///
/// The handle completes when the tick reaches it; it can be polled with
/// [`Tick::is_done`] or awaited.
///
/// ```
/// use spark_view::{next_tick_handle, run_ticks};
///
/// let tick = next_tick_handle();
/// assert!(!tick.is_done());
/// run_ticks();
/// assert!(tick.is_done());
/// ```
pub fn next_tick_handle() -> Tick {
    let state = Rc::new(TickState {
        done: Cell::new(false),
        waker: RefCell::new(None),
    });
    let marker = state.clone();
    next_tick(move || {
        marker.done.set(true);
        if let Some(waker) = marker.waker.borrow_mut().take() {
            waker.wake();
        }
    });
    Tick { state }
}

/// Drain the tick queue until it is empty, including callbacks queued while
/// draining. Returns how many callbacks ran.
pub fn run_ticks() -> usize {
    let mut ran = 0;
    loop {
        let next = TICKS.with(|ticks| ticks.borrow_mut().pop_front());
        match next {
            Some(callback) => {
                callback();
                ran += 1;
            }
            None => break,
        }
    }
    ran
}

pub fn has_pending_ticks() -> bool {
    TICKS.with(|ticks| !ticks.borrow().is_empty())
}

// =============================================================================
// TICK HANDLE
// =============================================================================

struct TickState {
    done: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

/// Completion handle returned by [`next_tick_handle`].
#[derive(Clone)]
pub struct Tick {
    state: Rc<TickState>,
}

impl Tick {
    pub fn is_done(&self) -> bool {
        self.state.done.get()
    }
}

impl Future for Tick {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.state.done.get() {
            return Poll::Ready(());
        }
        *self.state.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}
