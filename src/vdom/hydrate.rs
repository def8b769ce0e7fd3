// ============================================================================
// spark-view - Hydration
// Adopt a pre-existing backend tree instead of creating one
// ============================================================================

use super::backend::{Backend, NodeId, NodeType};
use super::patch::{InsertQueue, Patcher};
use super::vnode::{VNode, VNodeKind};
use crate::error::{Error, Result};

impl<B: Backend> Patcher<B> {
    /// Walk `vnode` and the live tree at `elm` together, binding snapshot
    /// nodes to live ones.
    ///
    /// Text data is corrected in place; a different kind, tag or child count
    /// fails with [`Error::HydrationMismatch`].
    pub(super) fn hydrate(&self, elm: NodeId, vnode: &mut VNode, queue: &mut InsertQueue) -> Result<()> {
        if vnode.is_component() {
            return self.create_component(vnode, queue, None, None, Some(elm));
        }
        if !self.node_matches(elm, vnode) {
            return Err(self.mismatch(describe_vnode(vnode), elm));
        }
        vnode.elm = Some(elm);
        let backend = self.backend();

        match vnode.kind {
            VNodeKind::Element => {
                if let Some(text) = vnode.text.clone() {
                    if backend.text_content(elm) != *text {
                        return Err(self.mismatch(format!("text {text:?}"), elm));
                    }
                } else if !vnode.children.is_empty() {
                    if backend.first_child(elm).is_none() {
                        self.create_children(elm, &mut vnode.children, queue)?;
                    } else {
                        let mut cursor = backend.first_child(elm);
                        for child in vnode.children.iter_mut() {
                            let Some(node) = cursor else {
                                return Err(Error::HydrationMismatch {
                                    expected: describe_vnode(child),
                                    found: "end of children".to_string(),
                                });
                            };
                            // Read before adopting: a child component may replace `node`
                            cursor = backend.next_sibling(node);
                            self.hydrate(node, child, queue)?;
                        }
                        if let Some(extra) = cursor {
                            return Err(self.mismatch("end of children".to_string(), extra));
                        }
                    }
                }
                if let Some(data) = &vnode.data {
                    for module in self.modules() {
                        module.create(&**backend, elm, data);
                    }
                }
            }
            VNodeKind::Text | VNodeKind::Comment => {
                let text = vnode.text.as_deref().unwrap_or("").to_string();
                if backend.text_content(elm) != text {
                    backend.set_text_content(elm, &text);
                }
            }
            VNodeKind::Component | VNodeKind::Fragment => {}
        }
        Ok(())
    }

    fn node_matches(&self, elm: NodeId, vnode: &VNode) -> bool {
        let backend = self.backend();
        match (vnode.kind, backend.node_type(elm)) {
            (VNodeKind::Element, Some(NodeType::Element)) => {
                match (vnode.tag.as_deref(), backend.tag_name(elm)) {
                    (Some(want), Some(have)) => want.eq_ignore_ascii_case(&have),
                    _ => false,
                }
            }
            (VNodeKind::Text, Some(NodeType::Text)) => true,
            (VNodeKind::Comment, Some(NodeType::Comment)) => true,
            _ => false,
        }
    }

    fn mismatch(&self, expected: String, elm: NodeId) -> Error {
        let backend = self.backend();
        let found = match backend.node_type(elm) {
            Some(NodeType::Element) => format!("<{}>", backend.tag_name(elm).as_deref().unwrap_or("?")),
            Some(NodeType::Text) => format!("text {:?}", backend.text_content(elm)),
            Some(NodeType::Comment) => "comment".to_string(),
            None => format!("unknown {elm}"),
        };
        Error::HydrationMismatch { expected, found }
    }
}

fn describe_vnode(vnode: &VNode) -> String {
    match vnode.kind {
        VNodeKind::Element | VNodeKind::Component => {
            format!("<{}>", vnode.tag.as_deref().unwrap_or("?"))
        }
        VNodeKind::Text => format!("text {:?}", vnode.text.as_deref().unwrap_or("")),
        VNodeKind::Comment => "comment".to_string(),
        VNodeKind::Fragment => "fragment".to_string(),
    }
}
