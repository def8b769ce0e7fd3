// ============================================================================
// spark-view - Reactivity Module
// Dependency tracking, watchers, scheduling and deferral
// ============================================================================

pub mod batching;
pub mod computed;
pub mod equality;
pub mod next_tick;
pub mod scheduler;
pub mod tracking;
pub mod watch;
pub mod watcher;

pub use batching::{batch, is_batching, untrack};
pub use computed::{computed, try_computed, Computed};
pub use equality::same_value;
pub use next_tick::{has_pending_ticks, next_tick, next_tick_handle, run_ticks, Tick};
pub use scheduler::{flush_sync, has_pending, queue_post_flush, queue_watcher};
pub use tracking::{current_target, Dep, TargetGuard};
pub use watch::{try_watch, watch, Unwatch, WatchOptions, WatchSource};
pub use watcher::{Watcher, WatcherOptions};
