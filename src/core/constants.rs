// ============================================================================
// spark-view - Constants
// Flag constants for watchers and observed containers
// ============================================================================

// =============================================================================
// WATCHER TYPE FLAGS
// =============================================================================

/// Watcher is lazy (computed) - only evaluates on demand
pub const LAZY: u32 = 1 << 0;

/// Watcher runs immediately on notification instead of being queued
pub const SYNC: u32 = 1 << 1;

/// Watcher was created by user code - errors are reported, not returned
pub const USER: u32 = 1 << 2;

/// Watcher deep-traverses its value so nested writes also trigger it
pub const DEEP: u32 = 1 << 3;

/// Watcher drives a component render
pub const RENDER: u32 = 1 << 4;

// =============================================================================
// WATCHER STATE FLAGS
// =============================================================================

/// Lazy watcher's cached value is stale
pub const DIRTY: u32 = 1 << 10;

/// Watcher is live (cleared on teardown)
pub const ACTIVE: u32 = 1 << 11;

/// Watcher getter is currently on the stack
pub const EVALUATING: u32 = 1 << 12;

// =============================================================================
// CONTAINER FLAGS
// =============================================================================

/// Container is non-extensible; it is never observed and rejects writes
pub const FROZEN: u32 = 1 << 0;

/// Container is marked raw; it is never observed
pub const RAW: u32 = 1 << 1;

// =============================================================================
// LIMITS
// =============================================================================

/// Default number of times one watcher may re-enter the queue within a flush
pub const MAX_UPDATE_COUNT: u32 = 100;

// =============================================================================
// TESTS
// =============================================================================
