// ============================================================================
// spark-view - Render Driver
// Components, their instances and the render watcher that connects them
// ============================================================================

pub mod component;
pub mod instance;

pub use component::{Component, FnComponent, MountedComponent, Scope};
pub use instance::{mount, mount_with_props, Instance, MountTarget};
