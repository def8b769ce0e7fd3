// ============================================================================
// spark-view - Watch
// User-facing watchers over a getter or a dotted path
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{handle_error, warn, Error, Result};
use crate::reactivity::batching::untrack;
use crate::reactivity::watcher::{Getter, Watcher, WatcherOptions};
use crate::store::{Object, Value};

// =============================================================================
// SOURCE & OPTIONS
// =============================================================================

/// What a watcher evaluates.
pub enum WatchSource {
    /// A closure; everything it reads is tracked
    Getter(Getter),
    /// A dotted path such as `"user.name"` read from `root`
    Path { root: Object, path: String },
}

impl WatchSource {
    pub fn getter<T: Into<Value>>(mut f: impl FnMut() -> T + 'static) -> Self {
        WatchSource::Getter(Box::new(move || Ok(f().into())))
    }

    pub fn try_getter(f: impl FnMut() -> Result<Value> + 'static) -> Self {
        WatchSource::Getter(Box::new(f))
    }

    pub fn path(root: &Object, path: impl Into<String>) -> Self {
        WatchSource::Path {
            root: root.clone(),
            path: path.into(),
        }
    }

    fn describe(&self) -> String {
        match self {
            WatchSource::Getter(_) => "getter".to_string(),
            WatchSource::Path { path, .. } => path.clone(),
        }
    }

    fn into_getter(self) -> Getter {
        match self {
            WatchSource::Getter(getter) => getter,
            WatchSource::Path { root, path } => {
                if !is_valid_path(&path) {
                    warn(&Error::InvalidPath(path).to_string());
                    return Box::new(|| Ok(Value::Null));
                }
                Box::new(move || Ok(root.get_path(&path)))
            }
        }
    }
}

/// Paths are identifiers joined by dots.
fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.')
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Also fire on writes anywhere inside the watched value
    pub deep: bool,
    /// Invoke the callback once right away with `(current, Null)`
    pub immediate: bool,
    /// Run on notification instead of waiting for the flush
    pub sync: bool,
}

// =============================================================================
// WATCH
// =============================================================================

thread_local! {
    /// Watchers whose handle was forgotten
    static DETACHED: RefCell<Vec<Watcher>> = const { RefCell::new(Vec::new()) };
}

/// Watch `source`, invoking `callback(new, old)` whenever its value changes
/// (or, for containers and deep watchers, whenever it re-evaluates).
///
/// ```
/// use spark_view::{configure, observe, reset_config, watch, Object, Value, WatchOptions, WatchSource};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// configure(|cfg| cfg.async_flush = false);
/// let user = Object::from_pairs([("name", "ada")]);
/// observe(&Value::from(user.clone()));
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let stop = watch(
///     WatchSource::path(&user, "name"),
///     move |new, old| sink.borrow_mut().push(format!("{old} -> {new}")),
///     WatchOptions::default(),
/// );
///
/// user.set("name", "grace");
/// stop.unwatch();
/// user.set("name", "linus");
/// assert_eq!(*seen.borrow(), vec!["ada -> grace".to_string()]);
/// reset_config();
/// ```
pub fn watch(
    source: WatchSource,
    mut callback: impl FnMut(&Value, &Value) + 'static,
    options: WatchOptions,
) -> Unwatch {
    try_watch(
        source,
        move |new, old| {
            callback(new, old);
            Ok(())
        },
        options,
    )
}

/// Like [`watch`] with a fallible callback; errors are reported.
pub fn try_watch(
    source: WatchSource,
    callback: impl FnMut(&Value, &Value) -> Result<()> + 'static,
    options: WatchOptions,
) -> Unwatch {
    let expression = source.describe();
    let callback = Rc::new(RefCell::new(callback));
    let scheduled = callback.clone();

    let watcher = Watcher::new(
        source.into_getter(),
        Some(Box::new(move |new: &Value, old: &Value| (&mut *scheduled.borrow_mut())(new, old))),
        WatcherOptions {
            user: true,
            deep: options.deep,
            sync: options.sync,
            expression: Some(expression.clone()),
            ..WatcherOptions::default()
        },
    );

    if options.immediate {
        let current = watcher.value();
        let result = untrack(|| (&mut *callback.borrow_mut())(&current, &Value::Null));
        if let Err(err) = result {
            handle_error(
                &Error::Callback {
                    expression,
                    message: err.to_string(),
                },
                "immediate watcher callback",
            );
        }
    }

    Unwatch {
        watcher: Some(watcher),
    }
}

// =============================================================================
// UNWATCH
// =============================================================================

/// Owns a user watcher. Dropping it (or calling [`Unwatch::unwatch`]) stops
/// the watcher.
#[must_use = "dropping an Unwatch stops the watcher; call forget() to keep it running"]
pub struct Unwatch {
    watcher: Option<Watcher>,
}

impl Unwatch {
    /// Stop watching.
    pub fn unwatch(mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.teardown();
        }
    }

    /// Keep the watcher running for the rest of the thread's life.
    pub fn forget(mut self) {
        if let Some(watcher) = self.watcher.take() {
            DETACHED.with(|detached| detached.borrow_mut().push(watcher));
        }
    }

    pub fn watcher(&self) -> Option<&Watcher> {
        self.watcher.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.watcher.as_ref().is_some_and(Watcher::is_active)
    }
}

impl Drop for Unwatch {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.teardown();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
