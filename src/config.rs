// ============================================================================
// spark-view - Configuration
// Thread-local knobs for flushing, cycle detection and diagnostics
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::constants::MAX_UPDATE_COUNT;
use crate::error::Error;

/// Receives every recovered error together with a short origin tag.
pub type ErrorHandler = Rc<dyn Fn(&Error, &str)>;

/// Receives every warning message.
pub type WarnHandler = Rc<dyn Fn(&str)>;

/// Engine configuration.
#[derive(Clone)]
pub struct Config {
    /// Defer flushes to the next tick. When `false` the queue is flushed as
    /// soon as a watcher is queued outside a batch, and dep notification runs
    /// subscribers in id order.
    pub async_flush: bool,

    /// How many times one watcher may be re-queued within a single flush
    pub max_update_count: u32,

    /// Suppress warnings
    pub silent: bool,

    pub error_handler: Option<ErrorHandler>,
    pub warn_handler: Option<WarnHandler>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            async_flush: true,
            max_update_count: MAX_UPDATE_COUNT,
            silent: false,
            error_handler: None,
            warn_handler: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("async_flush", &self.async_flush)
            .field("max_update_count", &self.max_update_count)
            .field("silent", &self.silent)
            .field("error_handler", &self.error_handler.is_some())
            .field("warn_handler", &self.warn_handler.is_some())
            .finish()
    }
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Mutate the thread's configuration.
///
/// ```
/// spark_view::configure(|cfg| cfg.async_flush = false);
/// assert!(!spark_view::with_config(|cfg| cfg.async_flush));
/// spark_view::reset_config();
/// ```
pub fn configure(f: impl FnOnce(&mut Config)) {
    CONFIG.with(|cfg| f(&mut cfg.borrow_mut()));
}

/// Read the thread's configuration.
pub fn with_config<R>(f: impl FnOnce(&Config) -> R) -> R {
    CONFIG.with(|cfg| f(&cfg.borrow()))
}

/// Restore defaults.
pub fn reset_config() {
    CONFIG.with(|cfg| *cfg.borrow_mut() = Config::default());
}
