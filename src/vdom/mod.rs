// ============================================================================
// spark-view - Virtual Tree
// Snapshots, the backend they are patched into, and the patcher
// ============================================================================

pub mod backend;
mod hydrate;
pub mod memory;
pub mod modules;
pub mod patch;
pub mod vnode;

pub use backend::{Backend, Event, Handler, NodeId, NodeType};
pub use memory::{MemoryBackend, Op};
pub use modules::{default_modules, Module, RemoveHandle};
pub use patch::{InsertQueue, PatchTarget, Patcher};
pub use vnode::{same_vnode, ComponentSlot, Key, VNode, VNodeData, VNodeKind};
