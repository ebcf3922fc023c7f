//! # Node Model
//!
//! Tagged-variant values making up an XML document tree.
//!
//! Nodes never hold direct references to each other. Every cross-reference
//! (parent, children) is a [`NodeId`] resolved through whatever owns the
//! flat node map, which keeps subtree snapshots cheap (copy ids, not graphs)
//! and rules out cycles and dangling pointers by construction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque 128-bit node identifier, unique per process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminant of a [`Node`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Element,
    Text,
    CData,
    Comment,
    Whitespace,
}

/// One addressable unit of a document.
///
/// Only `Element` carries children and attributes; the other four variants
/// are content-bearing leaves. Whitespace-only character runs are kept as a
/// distinct variant so serialization can reproduce the original formatting
/// without the tree storing indentation as structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Element {
        id: NodeId,
        parent: Option<NodeId>,
        name: String,
        namespace_uri: Option<String>,
        qualified_name: Option<String>,
        attributes: BTreeMap<String, String>,
        children: Vec<NodeId>,
    },

    Text {
        id: NodeId,
        parent: Option<NodeId>,
        characters: String,
    },

    CData {
        id: NodeId,
        parent: Option<NodeId>,
        data: String,
    },

    Comment {
        id: NodeId,
        parent: Option<NodeId>,
        text: String,
    },

    Whitespace {
        id: NodeId,
        parent: Option<NodeId>,
        text: String,
    },
}

impl Node {
    /// Create a detached element with no attributes or children.
    pub fn element(name: impl Into<String>) -> Self {
        Node::Element {
            id: NodeId::new(),
            parent: None,
            name: name.into(),
            namespace_uri: None,
            qualified_name: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Create a detached text node.
    pub fn text(characters: impl Into<String>) -> Self {
        Node::Text {
            id: NodeId::new(),
            parent: None,
            characters: characters.into(),
        }
    }

    /// Create a detached CDATA section.
    pub fn cdata(data: impl Into<String>) -> Self {
        Node::CData {
            id: NodeId::new(),
            parent: None,
            data: data.into(),
        }
    }

    /// Create a detached comment.
    pub fn comment(text: impl Into<String>) -> Self {
        Node::Comment {
            id: NodeId::new(),
            parent: None,
            text: text.into(),
        }
    }

    /// Create a detached ignorable-whitespace node.
    pub fn whitespace(text: impl Into<String>) -> Self {
        Node::Whitespace {
            id: NodeId::new(),
            parent: None,
            text: text.into(),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Node::Element { id, .. }
            | Node::Text { id, .. }
            | Node::CData { id, .. }
            | Node::Comment { id, .. }
            | Node::Whitespace { id, .. } => *id,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Element { parent, .. }
            | Node::Text { parent, .. }
            | Node::CData { parent, .. }
            | Node::Comment { parent, .. }
            | Node::Whitespace { parent, .. } => *parent,
        }
    }

    pub fn set_parent(&mut self, new_parent: Option<NodeId>) {
        match self {
            Node::Element { parent, .. }
            | Node::Text { parent, .. }
            | Node::CData { parent, .. }
            | Node::Comment { parent, .. }
            | Node::Whitespace { parent, .. } => *parent = new_parent,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Element { .. } => NodeKind::Element,
            Node::Text { .. } => NodeKind::Text,
            Node::CData { .. } => NodeKind::CData,
            Node::Comment { .. } => NodeKind::Comment,
            Node::Whitespace { .. } => NodeKind::Whitespace,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element { .. })
    }

    /// Local element name, `None` for non-elements.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Name an element serializes under: the qualified name when the source
    /// carried a prefix, the local name otherwise.
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Node::Element {
                name,
                qualified_name,
                ..
            } => Some(qualified_name.as_deref().unwrap_or(name)),
            _ => None,
        }
    }

    /// Content string of a content-bearing node, `None` for elements.
    pub fn content(&self) -> Option<&str> {
        match self {
            Node::Element { .. } => None,
            Node::Text { characters, .. } => Some(characters),
            Node::CData { data, .. } => Some(data),
            Node::Comment { text, .. } | Node::Whitespace { text, .. } => Some(text),
        }
    }

    /// Replace the content string. Returns `false` for elements, which have
    /// no content to replace.
    pub fn set_content(&mut self, content: impl Into<String>) -> bool {
        let content = content.into();
        match self {
            Node::Element { .. } => false,
            Node::Text { characters, .. } => {
                *characters = content;
                true
            }
            Node::CData { data, .. } => {
                *data = content;
                true
            }
            Node::Comment { text, .. } | Node::Whitespace { text, .. } => {
                *text = content;
                true
            }
        }
    }

    pub fn children(&self) -> Option<&[NodeId]> {
        match self {
            Node::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            Node::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Node::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn attributes_mut(&mut self) -> Option<&mut BTreeMap<String, String>> {
        match self {
            Node::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = NodeId::new();
        let b = NodeId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_content_accessors_reject_elements() {
        let mut el = Node::element("div");
        assert_eq!(el.content(), None);
        assert!(!el.set_content("nope"));

        let mut text = Node::text("hello");
        assert_eq!(text.content(), Some("hello"));
        assert!(text.set_content("world"));
        assert_eq!(text.content(), Some("world"));
    }

    #[test]
    fn test_children_accessors_are_element_only() {
        let el = Node::element("div");
        assert!(el.children().is_some());
        assert!(el.attributes().is_some());

        let text = Node::text("hello");
        assert!(text.children().is_none());
        assert!(text.attributes().is_none());
    }

    #[test]
    fn test_node_serialization() {
        let node = Node::text("hello");
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }
}
