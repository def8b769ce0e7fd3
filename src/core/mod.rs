// ============================================================================
// spark-view - Core Module
// Fundamental flags, identifiers and thread-local context
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use context::{is_batching, is_tracking, with_context, ReactiveContext};
pub use types::{DepId, Subscriber, WatcherId};
