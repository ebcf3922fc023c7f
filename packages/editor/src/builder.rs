//! # Partial Snapshots and Position Context
//!
//! The shapes exchanged with the tree-construction collaborator.
//!
//! A factory handed to `Create`/`Upsert` is a pure function from a
//! [`PositionContext`] to a [`PartialSnapshot`]: a flat map of new nodes
//! plus the ids of its roots, with parent/children links already consistent
//! inside the snapshot. Keeping factories pure (no captured mutable state)
//! keeps replays and inverses deterministic.
//!
//! [`ElementBuilder`] is a small convenience for producing well-formed
//! snapshots by hand; richer construction DSLs live outside this crate and
//! only need to emit the same shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vellum_xml::{Node, NodeId};

/// A forward reference declared by inserted content: once the snapshot
/// lands, the reserved `id` attribute of the node is set to a unique value
/// derived from `template`, and the value is recorded under `name` for
/// later changes in the same command or stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFuture {
    pub name: String,
    pub template: String,
}

impl ReferenceFuture {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }
}

/// A flat bundle of new nodes to be spliced into the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialSnapshot {
    /// Top-level ids of the bundle, in insertion order.
    pub roots: Vec<NodeId>,
    /// Every node of the bundle, keyed by id.
    pub values: HashMap<NodeId, Node>,
    /// Forward references to resolve at insertion time.
    pub reference_futures: HashMap<NodeId, ReferenceFuture>,
}

impl PartialSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Snapshot holding a single detached node.
    pub fn single(node: Node) -> Self {
        let id = node.id();
        let mut values = HashMap::new();
        values.insert(id, node);
        Self {
            roots: vec![id],
            values,
            reference_futures: HashMap::new(),
        }
    }
}

/// Indentation and ordering hints supplied to factories at insertion time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionContext {
    /// Ambient indentation depth at the insertion point (unit: two spaces).
    pub indent_level: usize,
    pub is_first_sibling: bool,
    pub is_last_sibling: bool,
    /// Reference-id values resolved earlier in the same command or stream,
    /// keyed by future name.
    pub resolved_names: HashMap<String, String>,
}

/// Build a snapshot rooted at one element.
pub fn element(name: impl Into<String>) -> ElementBuilder {
    ElementBuilder::new(name)
}

enum ChildSpec {
    Element(ElementBuilder),
    Text(String),
    CData(String),
    Comment(String),
    Whitespace(String),
}

/// Nested element description that materializes into a [`PartialSnapshot`].
pub struct ElementBuilder {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<ChildSpec>,
    future: Option<ReferenceFuture>,
}

impl ElementBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            future: None,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, child: ElementBuilder) -> Self {
        self.children.push(ChildSpec::Element(child));
        self
    }

    pub fn text(mut self, characters: impl Into<String>) -> Self {
        self.children.push(ChildSpec::Text(characters.into()));
        self
    }

    pub fn cdata(mut self, data: impl Into<String>) -> Self {
        self.children.push(ChildSpec::CData(data.into()));
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.children.push(ChildSpec::Comment(text.into()));
        self
    }

    pub fn whitespace(mut self, text: impl Into<String>) -> Self {
        self.children.push(ChildSpec::Whitespace(text.into()));
        self
    }

    /// Declare that this element wants a unique reserved-id value derived
    /// from `template`, published under `name`.
    pub fn reference(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.future = Some(ReferenceFuture::new(name, template));
        self
    }

    pub fn into_snapshot(self) -> PartialSnapshot {
        let mut snapshot = PartialSnapshot::empty();
        let root = self.materialize_into(None, &mut snapshot);
        snapshot.roots.push(root);
        snapshot
    }

    /// Like [`into_snapshot`](Self::into_snapshot), prefixed with a newline
    /// whitespace root indented to `indent_level`, so inserted subtrees
    /// reproduce the ambient formatting.
    pub fn into_indented_snapshot(self, indent_level: usize) -> PartialSnapshot {
        let mut snapshot = self.into_snapshot();
        let ws = Node::whitespace(format!("\n{}", "  ".repeat(indent_level)));
        snapshot.roots.insert(0, ws.id());
        snapshot.values.insert(ws.id(), ws);
        snapshot
    }

    fn materialize_into(
        self,
        parent: Option<NodeId>,
        snapshot: &mut PartialSnapshot,
    ) -> NodeId {
        let mut node = Node::element(self.name);
        node.set_parent(parent);
        let id = node.id();

        if let Some(attrs) = node.attributes_mut() {
            for (name, value) in self.attributes {
                attrs.insert(name, value);
            }
        }

        let mut child_ids = Vec::with_capacity(self.children.len());
        for child in self.children {
            let child_id = match child {
                ChildSpec::Element(builder) => builder.materialize_into(Some(id), snapshot),
                ChildSpec::Text(s) => attach_leaf(Node::text(s), id, snapshot),
                ChildSpec::CData(s) => attach_leaf(Node::cdata(s), id, snapshot),
                ChildSpec::Comment(s) => attach_leaf(Node::comment(s), id, snapshot),
                ChildSpec::Whitespace(s) => attach_leaf(Node::whitespace(s), id, snapshot),
            };
            child_ids.push(child_id);
        }
        if let Some(children) = node.children_mut() {
            *children = child_ids;
        }

        if let Some(future) = self.future {
            snapshot.reference_futures.insert(id, future);
        }
        snapshot.values.insert(id, node);
        id
    }
}

fn attach_leaf(mut node: Node, parent: NodeId, snapshot: &mut PartialSnapshot) -> NodeId {
    node.set_parent(Some(parent));
    let id = node.id();
    snapshot.values.insert(id, node);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_consistent_links() {
        let snapshot = element("g")
            .attr("fill", "none")
            .child(element("rect").attr("width", "10"))
            .text("label")
            .into_snapshot();

        assert_eq!(snapshot.roots.len(), 1);
        assert_eq!(snapshot.values.len(), 3);

        let root = &snapshot.values[&snapshot.roots[0]];
        assert_eq!(root.name(), Some("g"));
        assert_eq!(root.parent(), None);

        for child_id in root.children().unwrap() {
            assert_eq!(snapshot.values[child_id].parent(), Some(root.id()));
        }
    }

    #[test]
    fn test_reference_future_recorded() {
        let snapshot = element("linearGradient")
            .reference("grad", "gradient")
            .into_snapshot();
        let root = snapshot.roots[0];
        assert_eq!(
            snapshot.reference_futures.get(&root),
            Some(&ReferenceFuture::new("grad", "gradient"))
        );
    }

    #[test]
    fn test_indented_snapshot_prepends_whitespace() {
        let snapshot = element("rect").into_indented_snapshot(2);
        assert_eq!(snapshot.roots.len(), 2);
        let ws = &snapshot.values[&snapshot.roots[0]];
        assert_eq!(ws.content(), Some("\n    "));
    }
}
