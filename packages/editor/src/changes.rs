//! # Change and Command Model
//!
//! A closed set of atomic change kinds grouped into named commands.
//!
//! ## Semantics
//!
//! - A `Command` is applied atomically: either every change lands, or the
//!   whole command is rolled back and reported as failed.
//! - Every applied change yields an exact inverse; the engine assembles
//!   those into the undo command.
//! - Factories are deferred computations invoked with positional/variable
//!   context at execution time, so inserted content can depend on where it
//!   lands and on names resolved earlier in the same command or stream.

use crate::builder::{PartialSnapshot, PositionContext};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use vellum_xml::{Node, NodeId, NodeKind};

/// Deferred subtree construction, pure in the position context.
pub type SnapshotFactory = Box<dyn Fn(&PositionContext) -> PartialSnapshot>;

/// Deferred follow-up changes against the element an upsert settled on.
pub type FollowUpFactory = Box<dyn Fn(NodeId) -> Vec<Change>>;

/// Deferred attribute value, reading the resolved-name variables.
pub type ValueFactory = Box<dyn Fn(&HashMap<String, String>) -> String>;

/// An attribute value: literal, or computed at execution time.
pub enum AttrValue {
    Literal(String),
    Deferred(ValueFactory),
}

impl AttrValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn deferred(f: impl Fn(&HashMap<String, String>) -> String + 'static) -> Self {
        Self::Deferred(Box::new(f))
    }

    pub(crate) fn resolve(&self, names: &HashMap<String, String>) -> String {
        match self {
            AttrValue::Literal(value) => value.clone(),
            AttrValue::Deferred(f) => f(names),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            AttrValue::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Predicate an upsert uses to look for an existing direct child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildQuery {
    /// Direct-child element with this exact name. First match in document
    /// order wins.
    ElementNamed(String),
}

impl ChildQuery {
    pub(crate) fn matches(&self, node: &Node) -> bool {
        match self {
            ChildQuery::ElementNamed(name) => node.name() == Some(name.as_str()),
        }
    }
}

/// One atomic mutation.
pub enum Change {
    /// Materialize a snapshot from `factory` and splice its roots into
    /// `parent` (or the root list) at `index`.
    Create {
        parent: Option<NodeId>,
        index: usize,
        factory: SnapshotFactory,
    },

    /// Remove the whole subtree rooted at `id`.
    Destroy { id: NodeId },

    /// Replace the content string of a content-bearing node.
    UpdateContent { id: NodeId, content: String },

    /// Find a direct child of `parent` matching `query`, creating one via
    /// `factory` at `index` if none exists, then apply the follow-up
    /// changes against it.
    Upsert {
        parent: NodeId,
        index: usize,
        factory: SnapshotFactory,
        query: ChildQuery,
        follow_up: FollowUpFactory,
    },

    /// Set or replace an attribute.
    UpsertAttribute {
        element: NodeId,
        name: String,
        value: AttrValue,
    },

    /// Remove an attribute. A no-op, not a failure, when absent.
    DestroyAttribute { element: NodeId, name: String },

    /// Move the child at `from` to `to` within `parent` (or the roots).
    Reorder {
        parent: Option<NodeId>,
        from: usize,
        to: usize,
    },
}

impl Change {
    pub fn create(
        parent: Option<NodeId>,
        index: usize,
        factory: impl Fn(&PositionContext) -> PartialSnapshot + 'static,
    ) -> Self {
        Self::Create {
            parent,
            index,
            factory: Box::new(factory),
        }
    }

    /// Create from a fixed snapshot, ignoring the position context.
    pub fn create_snapshot(parent: Option<NodeId>, index: usize, snapshot: PartialSnapshot) -> Self {
        Self::create(parent, index, move |_| snapshot.clone())
    }

    pub fn destroy(id: NodeId) -> Self {
        Self::Destroy { id }
    }

    pub fn update_content(id: NodeId, content: impl Into<String>) -> Self {
        Self::UpdateContent {
            id,
            content: content.into(),
        }
    }

    pub fn upsert(
        parent: NodeId,
        index: usize,
        factory: impl Fn(&PositionContext) -> PartialSnapshot + 'static,
        query: ChildQuery,
        follow_up: impl Fn(NodeId) -> Vec<Change> + 'static,
    ) -> Self {
        Self::Upsert {
            parent,
            index,
            factory: Box::new(factory),
            query,
            follow_up: Box::new(follow_up),
        }
    }

    pub fn upsert_attribute(
        element: NodeId,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Self {
        Self::UpsertAttribute {
            element,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn destroy_attribute(element: NodeId, name: impl Into<String>) -> Self {
        Self::DestroyAttribute {
            element,
            name: name.into(),
        }
    }

    pub fn reorder(parent: Option<NodeId>, from: usize, to: usize) -> Self {
        Self::Reorder { parent, from, to }
    }
}

impl fmt::Debug for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Create { parent, index, .. } => f
                .debug_struct("Create")
                .field("parent", parent)
                .field("index", index)
                .finish_non_exhaustive(),
            Change::Destroy { id } => f.debug_struct("Destroy").field("id", id).finish(),
            Change::UpdateContent { id, content } => f
                .debug_struct("UpdateContent")
                .field("id", id)
                .field("content", content)
                .finish(),
            Change::Upsert {
                parent,
                index,
                query,
                ..
            } => f
                .debug_struct("Upsert")
                .field("parent", parent)
                .field("index", index)
                .field("query", query)
                .finish_non_exhaustive(),
            Change::UpsertAttribute {
                element,
                name,
                value,
            } => f
                .debug_struct("UpsertAttribute")
                .field("element", element)
                .field("name", name)
                .field("value", value)
                .finish(),
            Change::DestroyAttribute { element, name } => f
                .debug_struct("DestroyAttribute")
                .field("element", element)
                .field("name", name)
                .finish(),
            Change::Reorder { parent, from, to } => f
                .debug_struct("Reorder")
                .field("parent", parent)
                .field("from", from)
                .field("to", to)
                .finish(),
        }
    }
}

/// A named, ordered batch of changes applied atomically. Consumed once.
#[derive(Debug)]
pub struct Command {
    pub name: String,
    pub changes: Vec<Change>,
}

impl Command {
    pub fn new(name: impl Into<String>, changes: Vec<Change>) -> Self {
        Self {
            name: name.into(),
            changes,
        }
    }

    pub fn single(name: impl Into<String>, change: Change) -> Self {
        Self::new(name, vec![change])
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// What a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Root,
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeKind {
    Element(String),
    Text,
    CData,
    Comment,
    Whitespace,
    Root,
}

impl NoticeKind {
    pub(crate) fn of(node: &Node) -> Self {
        match node.kind() {
            NodeKind::Element => {
                NoticeKind::Element(node.name().unwrap_or_default().to_string())
            }
            NodeKind::Text => NoticeKind::Text,
            NodeKind::CData => NoticeKind::CData,
            NodeKind::Comment => NoticeKind::Comment,
            NodeKind::Whitespace => NoticeKind::Whitespace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeAction {
    Created,
    Updated,
    Destroyed,
}

/// The externally observable diff of one executed change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub subject: Subject,
    pub kind: NoticeKind,
    pub action: NoticeAction,
}

impl ChangeNotice {
    pub(crate) fn node(node: &Node, action: NoticeAction) -> Self {
        Self {
            subject: Subject::Node(node.id()),
            kind: NoticeKind::of(node),
            action,
        }
    }

    pub(crate) fn root_updated() -> Self {
        Self {
            subject: Subject::Root,
            kind: NoticeKind::Root,
            action: NoticeAction::Updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_serialization() {
        let notice = ChangeNotice {
            subject: Subject::Node(NodeId::new()),
            kind: NoticeKind::Element("rect".to_string()),
            action: NoticeAction::Created,
        };

        let json = serde_json::to_string(&notice).unwrap();
        let back: ChangeNotice = serde_json::from_str(&json).unwrap();
        assert_eq!(notice, back);
    }

    #[test]
    fn test_attr_value_conversions() {
        let literal: AttrValue = "5".into();
        assert_eq!(literal.resolve(&HashMap::new()), "5");

        let deferred = AttrValue::deferred(|names| {
            format!("url(#{})", names.get("grad").map(String::as_str).unwrap_or(""))
        });
        let mut names = HashMap::new();
        names.insert("grad".to_string(), "gradient2".to_string());
        assert_eq!(deferred.resolve(&names), "url(#gradient2)");
    }

    #[test]
    fn test_query_matches_exact_name() {
        let query = ChildQuery::ElementNamed("defs".to_string());
        assert!(query.matches(&Node::element("defs")));
        assert!(!query.matches(&Node::element("g")));
        assert!(!query.matches(&Node::text("defs")));
    }
}
