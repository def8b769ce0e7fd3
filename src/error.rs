// ============================================================================
// spark-view - Errors
// Error taxonomy and the reporting hooks every layer funnels into
// ============================================================================

use thiserror::Error;

use crate::config::with_config;

/// Crate-wide result alias
pub type Result<T, E = Error> = std::result::Result<T, E>;

// =============================================================================
// ERROR
// =============================================================================

/// Everything that can go wrong inside the engine.
///
/// None of these unwind into application code: each is reported through
/// [`handle_error`] at the layer that detected it and the engine recovers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A component's render function failed
    #[error("render error in <{component}>: {message}")]
    Render { component: String, message: String },

    /// A user watcher's getter failed
    #[error("error evaluating watcher getter \"{expression}\": {message}")]
    Watcher { expression: String, message: String },

    /// A user watcher's callback failed
    #[error("error in callback for watcher \"{expression}\": {message}")]
    Callback { expression: String, message: String },

    /// A watcher re-entered the queue too many times within one flush
    #[error("you may have an infinite update loop in watcher {watcher} (\"{expression}\"), re-queued {count} times")]
    InfiniteUpdateLoop {
        watcher: u64,
        expression: String,
        count: u32,
    },

    /// The pre-existing backend tree does not match the snapshot
    #[error("hydration mismatch: expected {expected}, found {found}")]
    HydrationMismatch { expected: String, found: String },

    /// A backend rejected an operation
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A watch path expression could not be parsed
    #[error("failed watching path: \"{0}\"")]
    InvalidPath(String),

    /// Free-form error raised by user closures
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Build a free-form error.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Message(message.into())
    }
}

// =============================================================================
// BACKEND ERROR
// =============================================================================

/// Failure of a single backend operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("invalid attribute {name:?} = {value:?}")]
    InvalidAttribute { name: String, value: String },

    #[error("unknown node {0}")]
    UnknownNode(u32),

    #[error("backend rejected {operation}: {reason}")]
    Rejected { operation: String, reason: String },
}

// =============================================================================
// REPORTING
// =============================================================================

/// Report a recovered error.
///
/// Forwards to the configured error handler, or logs through `tracing` when
/// none is installed. A panic in the handler propagates.
pub fn handle_error(err: &Error, info: &str) {
    let handler = with_config(|cfg| cfg.error_handler.clone());
    match handler {
        Some(handler) => handler(err, info),
        None => tracing::error!(error = %err, info, "unhandled error"),
    }
}

/// Report a non-fatal diagnostic. Suppressed when `silent` is set.
pub fn warn(message: &str) {
    let (silent, handler) = with_config(|cfg| (cfg.silent, cfg.warn_handler.clone()));
    if silent {
        return;
    }
    match handler {
        Some(handler) => handler(message),
        None => tracing::warn!("{message}"),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{configure, reset_config};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn display_messages() {
        let err = Error::Render {
            component: "App".into(),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "render error in <App>: boom");

        let err: Error = BackendError::UnknownNode(4).into();
        assert_eq!(err.to_string(), "unknown node 4");

        assert_eq!(Error::msg("plain").to_string(), "plain");
    }

    #[test]
    fn handle_error_uses_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        configure(|cfg| {
            cfg.error_handler = Some(Rc::new(move |err: &Error, info: &str| {
                seen_clone.borrow_mut().push(format!("{info}: {err}"));
            }));
        });

        handle_error(&Error::msg("x"), "test");
        assert_eq!(seen.borrow().as_slice(), ["test: x"]);
        reset_config();
    }

    #[test]
    fn warn_respects_silent() {
        let count = Rc::new(RefCell::new(0));
        let count_clone = count.clone();
        configure(|cfg| {
            cfg.silent = true;
            cfg.warn_handler = Some(Rc::new(move |_: &str| *count_clone.borrow_mut() += 1));
        });

        warn("hidden");
        assert_eq!(*count.borrow(), 0);

        configure(|cfg| cfg.silent = false);
        warn("shown");
        assert_eq!(*count.borrow(), 1);
        reset_config();
    }
}
