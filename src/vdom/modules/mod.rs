// ============================================================================
// spark-view - Patch Modules
// Per-concern data diffing hooked into the patcher
// ============================================================================

pub mod attrs;
pub mod class;
pub mod events;
pub mod props;
pub mod style;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::backend::{Backend, NodeId};
use super::vnode::{VNode, VNodeData};
use crate::error::{handle_error, BackendError, Error};

pub use attrs::AttrsModule;
pub use class::ClassModule;
pub use events::EventsModule;
pub use props::PropsModule;
pub use style::StyleModule;

// =============================================================================
// MODULE TRAIT
// =============================================================================

/// One concern of element data (attributes, classes, listeners...).
///
/// Hooks only fire for element nodes that carry data. A failing backend
/// call is reported and the module moves on to the next entry.
pub trait Module {
    fn name(&self) -> &'static str;

    /// Element created; defaults to an update from nothing.
    fn create(&self, backend: &dyn Backend, elm: NodeId, data: &VNodeData) {
        self.update(backend, elm, None, data);
    }

    fn update(&self, backend: &dyn Backend, elm: NodeId, old: Option<&VNodeData>, new: &VNodeData);

    /// Subtree being torn down.
    fn destroy(&self, _backend: &dyn Backend, _elm: NodeId, _data: &VNodeData) {}

    /// Node about to leave the tree. Holding on to (a clone of) `done`
    /// defers the removal until every clone is dropped.
    fn remove(&self, _backend: &dyn Backend, _vnode: &VNode, done: RemoveHandle) {
        done.done();
    }
}

/// The modules every [`Patcher`](super::patch::Patcher) starts with.
pub fn default_modules() -> Vec<Box<dyn Module>> {
    vec![
        Box::new(AttrsModule),
        Box::new(ClassModule),
        Box::new(StyleModule),
        Box::new(PropsModule),
        Box::new(EventsModule::default()),
    ]
}

pub(crate) fn report(result: Result<(), BackendError>, module: &str) {
    if let Err(err) = result {
        handle_error(&Error::Backend(err), &format!("{module} module"));
    }
}

// =============================================================================
// REMOVE HANDLE
// =============================================================================

struct RemoveOnDrop {
    action: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Some(action) = self.action.get_mut().take() {
            action();
        }
    }
}

/// Counted removal: the node is detached once the last clone is dropped.
#[derive(Clone)]
pub struct RemoveHandle {
    inner: Rc<RemoveOnDrop>,
}

impl RemoveHandle {
    pub(crate) fn new(action: impl FnOnce() + 'static) -> Self {
        RemoveHandle {
            inner: Rc::new(RemoveOnDrop {
                action: RefCell::new(Some(Box::new(action))),
            }),
        }
    }

    /// Release this share of the removal.
    pub fn done(self) {}

    /// Outstanding shares, including this one.
    pub fn pending(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl fmt::Debug for RemoveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoveHandle")
            .field("pending", &self.pending())
            .finish()
    }
}
