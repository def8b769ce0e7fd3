// ============================================================================
// spark-view - Reactive Rendering Core for Rust
// ============================================================================
//
// Observed state, watchers that re-run when what they read changes, a
// scheduler that batches those re-runs, and a patcher that reconciles each
// newly rendered tree snapshot against the previous one on a pluggable
// backend.
// ============================================================================

#[macro_use]
mod macros;

pub mod config;
pub mod core;
pub mod error;
pub mod reactivity;
pub mod render;
pub mod store;
pub mod vdom;

// Re-export core items at crate root for ergonomic access
pub use core::constants;
pub use core::context::{is_tracking, with_context, ReactiveContext};
pub use core::types::{DepId, Subscriber, WatcherId};

pub use config::{configure, reset_config, with_config, Config};
pub use error::{BackendError, Error, Result};

// Reactive store
pub use store::{delete, observe, set, traverse, Array, Object, Observer, PropKey, Value};

// Reactivity
pub use reactivity::batching::{batch, is_batching, untrack};
pub use reactivity::computed::{computed, try_computed, Computed};
pub use reactivity::equality::same_value;
pub use reactivity::next_tick::{next_tick, next_tick_handle, run_ticks, Tick};
pub use reactivity::scheduler::{flush_sync, queue_post_flush};
pub use reactivity::tracking::Dep;
pub use reactivity::watch::{try_watch, watch, Unwatch, WatchOptions, WatchSource};
pub use reactivity::watcher::{Watcher, WatcherOptions};

// Tree snapshots and patching
pub use vdom::{
    same_vnode, Backend, Event, Key, MemoryBackend, NodeId, PatchTarget, Patcher, VNode, VNodeData,
    VNodeKind,
};

// Render driver
pub use render::{mount, mount_with_props, Component, FnComponent, Instance, MountTarget, Scope};

// =============================================================================
// TESTS
// =============================================================================
