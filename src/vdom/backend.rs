// ============================================================================
// spark-view - Backend
// The node tree the patcher drives
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::error::BackendError;
use crate::store::Value;

/// Handle of a live backend node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Comment,
}

/// An event delivered to a listener.
#[derive(Clone, Debug)]
pub struct Event {
    pub name: Rc<str>,
    pub target: NodeId,
    pub detail: Value,
}

/// Event listener, shared between a snapshot and the backend.
pub type Handler = Rc<dyn Fn(&Event)>;

/// Operations the patcher needs from a node tree.
///
/// All methods take `&self`: backends keep their tree behind interior
/// mutability, the same way the rest of the crate does. Structural
/// operations on unknown or already detached nodes are no-ops.
pub trait Backend: 'static {
    fn create_element(&self, tag: &str) -> NodeId;
    fn create_text_node(&self, text: &str) -> NodeId;
    fn create_comment(&self, text: &str) -> NodeId;

    /// Insert `node` into `parent` before `reference` (append when `None`),
    /// detaching it from wherever it was.
    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>);
    fn remove_child(&self, parent: NodeId, node: NodeId);
    fn append_child(&self, parent: NodeId, node: NodeId);

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn first_child(&self, node: NodeId) -> Option<NodeId>;
    fn node_type(&self, node: NodeId) -> Option<NodeType>;
    fn tag_name(&self, node: NodeId) -> Option<Rc<str>>;

    /// Replace an element's content with `text`, or a text/comment node's data.
    fn set_text_content(&self, node: NodeId, text: &str);
    fn text_content(&self, node: NodeId) -> String;

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), BackendError>;
    fn remove_attribute(&self, node: NodeId, name: &str);
    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_property(&self, node: NodeId, name: &str, value: &Value) -> Result<(), BackendError>;
    fn remove_property(&self, node: NodeId, name: &str);

    fn set_style(&self, node: NodeId, name: &str, value: &str) -> Result<(), BackendError>;
    fn remove_style(&self, node: NodeId, name: &str);

    /// Register the single listener for `name` on `node`, replacing any other.
    fn add_event_listener(&self, node: NodeId, name: &str, listener: Handler);
    fn remove_event_listener(&self, node: NodeId, name: &str);
}
