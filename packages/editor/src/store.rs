//! # Node Store
//!
//! The owning map of all live nodes plus the ordered top-level root list.
//!
//! The store is the sole owner of node identity: nodes are born and die
//! here, and everything else (commands, undo, paths) works in terms of ids.
//! Mutation primitives are crate-private; callers go through the execution
//! engine so that every structural change produces an inverse.
//!
//! The store also tracks the set of in-use values of the reserved `id`
//! attribute, which the allocator consults to keep reference ids unique
//! across the whole document.

use crate::errors::{DocumentError, DocumentResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vellum_xml::{Node, NodeId, NodeKind, ParsedDocument};

/// The attribute name whose values must be unique across the store.
pub const RESERVED_ID_ATTR: &str = "id";

/// Where a node sits: among the top-level roots or under an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Root,
    Element(NodeId),
}

impl Scope {
    pub fn parent(self) -> Option<NodeId> {
        match self {
            Scope::Root => None,
            Scope::Element(id) => Some(id),
        }
    }

    pub fn of(parent: Option<NodeId>) -> Self {
        match parent {
            Some(id) => Scope::Element(id),
            None => Scope::Root,
        }
    }
}

/// One step of a [`Path`]: the `index`-th direct child of the given kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Element(String),
    Text,
    CData,
    Comment,
    Whitespace,
}

impl SegmentKind {
    fn matches(&self, node: &Node) -> bool {
        match self {
            SegmentKind::Element(name) => node.name() == Some(name.as_str()),
            SegmentKind::Text => node.kind() == NodeKind::Text,
            SegmentKind::CData => node.kind() == NodeKind::CData,
            SegmentKind::Comment => node.kind() == NodeKind::Comment,
            SegmentKind::Whitespace => node.kind() == NodeKind::Whitespace,
        }
    }
}

/// Nth-child-of-kind address, independent of siblings of other kinds.
///
/// `Path::new().element("svg").element("text").text(1)` selects the second
/// text child of the first `text`-named child of the first `svg`-named root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// First direct child element named `name`.
    pub fn element(self, name: impl Into<String>) -> Self {
        self.element_at(name, 0)
    }

    /// `index`-th direct child element named `name`.
    pub fn element_at(self, name: impl Into<String>, index: usize) -> Self {
        self.segment(SegmentKind::Element(name.into()), index)
    }

    pub fn text(self, index: usize) -> Self {
        self.segment(SegmentKind::Text, index)
    }

    pub fn cdata(self, index: usize) -> Self {
        self.segment(SegmentKind::CData, index)
    }

    pub fn comment(self, index: usize) -> Self {
        self.segment(SegmentKind::Comment, index)
    }

    pub fn whitespace(self, index: usize) -> Self {
        self.segment(SegmentKind::Whitespace, index)
    }

    pub fn segment(mut self, kind: SegmentKind, index: usize) -> Self {
        self.segments.push(Segment { kind, index });
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// Flat id→node map plus ordered roots.
///
/// `used_ref_ids` counts occurrences per value rather than holding a set:
/// nothing stops two elements from carrying the same `id` attribute text,
/// and releasing one of them must not free the value for the other.
#[derive(Debug, Clone, Default)]
pub struct Store {
    roots: Vec<NodeId>,
    nodes: HashMap<NodeId, Node>,
    used_ref_ids: HashMap<String, usize>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap parser output as store state, seeding the reserved-id registry
    /// from existing `id` attributes.
    pub fn from_parsed(parsed: ParsedDocument) -> Self {
        let mut used_ref_ids: HashMap<String, usize> = HashMap::new();
        for node in parsed.nodes.values() {
            if let Some(value) = node.attributes().and_then(|a| a.get(RESERVED_ID_ATTR)) {
                *used_ref_ids.entry(value.clone()).or_insert(0) += 1;
            }
        }
        Self {
            roots: parsed.roots,
            nodes: parsed.nodes,
            used_ref_ids,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn nodes(&self) -> &HashMap<NodeId, Node> {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of an element, in document order.
    pub fn children_of(&self, id: NodeId) -> DocumentResult<Vec<&Node>> {
        let node = self.get(id).ok_or(DocumentError::ValueNotFound(id))?;
        let children = node.children().ok_or(DocumentError::NotAnElement)?;
        children
            .iter()
            .map(|cid| self.get(*cid).ok_or(DocumentError::ValueNotFound(*cid)))
            .collect()
    }

    /// Resolve a path against the roots. Returns `None` whenever a segment
    /// has no `index`-th match in its scope.
    pub fn resolve(&self, path: &Path) -> Option<&Node> {
        let mut scope: Vec<NodeId> = self.roots.clone();
        let mut found: Option<&Node> = None;

        for segment in path.segments() {
            let mut remaining = segment.index;
            let mut hit: Option<&Node> = None;
            for id in &scope {
                let node = self.get(*id)?;
                if segment.kind.matches(node) {
                    if remaining == 0 {
                        hit = Some(node);
                        break;
                    }
                    remaining -= 1;
                }
            }
            let node = hit?;
            scope = node.children().map(<[NodeId]>::to_vec).unwrap_or_default();
            found = Some(node);
        }

        found
    }

    /// Ids of the subtree rooted at `id`, preorder (the root first).
    pub fn subtree_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            out.push(next);
            if let Some(children) = self.get(next).and_then(Node::children) {
                for child in children.iter().rev() {
                    pending.push(*child);
                }
            }
        }
        out
    }

    pub(crate) fn scope_ids(&self, scope: Scope) -> DocumentResult<&Vec<NodeId>> {
        match scope {
            Scope::Root => Ok(&self.roots),
            Scope::Element(id) => {
                let node = self.get(id).ok_or(DocumentError::ValueNotFound(id))?;
                match node {
                    Node::Element { children, .. } => Ok(children),
                    _ => Err(DocumentError::NotAnElement),
                }
            }
        }
    }

    pub(crate) fn scope_ids_mut(&mut self, scope: Scope) -> DocumentResult<&mut Vec<NodeId>> {
        match scope {
            Scope::Root => Ok(&mut self.roots),
            Scope::Element(id) => {
                let node = self
                    .nodes
                    .get_mut(&id)
                    .ok_or(DocumentError::ValueNotFound(id))?;
                node.children_mut().ok_or(DocumentError::NotAnElement)
            }
        }
    }

    /// Splice `ids` into a scope at `index` and fix up their parent links.
    pub(crate) fn insert(
        &mut self,
        ids: &[NodeId],
        scope: Scope,
        index: usize,
    ) -> DocumentResult<()> {
        let parent = scope.parent();
        {
            let list = self.scope_ids_mut(scope)?;
            let len = list.len();
            if index > len {
                return Err(DocumentError::IndexOutOfBounds { index, len });
            }
            for (offset, id) in ids.iter().enumerate() {
                list.insert(index + offset, *id);
            }
        }
        for id in ids {
            if let Some(node) = self.nodes.get_mut(id) {
                node.set_parent(parent);
            }
        }
        Ok(())
    }

    /// Unlink `id` from a scope, returning the index it held.
    pub(crate) fn remove(&mut self, id: NodeId, scope: Scope) -> DocumentResult<usize> {
        let list = self.scope_ids_mut(scope)?;
        let index = list
            .iter()
            .position(|x| *x == id)
            .ok_or(DocumentError::ValueNotFound(id))?;
        list.remove(index);
        Ok(index)
    }

    /// Take ownership of a node, replacing any previous value under its id.
    pub(crate) fn set(&mut self, node: Node) {
        self.nodes.insert(node.id(), node);
    }

    /// Evict a node from the map. Does not touch sibling lists.
    pub(crate) fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(&id)
    }

    // ── Reserved-id registry ────────────────────────────────────────────

    pub fn is_ref_id_used(&self, value: &str) -> bool {
        self.used_ref_ids.contains_key(value)
    }

    pub(crate) fn register_ref_id(&mut self, value: impl Into<String>) {
        *self.used_ref_ids.entry(value.into()).or_insert(0) += 1;
    }

    pub(crate) fn release_ref_id(&mut self, value: &str) {
        if let Some(count) = self.used_ref_ids.get_mut(value) {
            *count -= 1;
            if *count == 0 {
                self.used_ref_ids.remove(value);
            }
        }
    }

    /// Issue a collision-free reserved-id value from a template: the
    /// template itself when unused, otherwise `template2`, `template3`, …
    /// The result is recorded as used.
    pub fn allocate_ref_id(&mut self, template: &str) -> String {
        if !self.used_ref_ids.contains_key(template) {
            self.register_ref_id(template);
            return template.to_string();
        }
        let mut suffix = 2u64;
        loop {
            let candidate = format!("{template}{suffix}");
            if !self.used_ref_ids.contains_key(&candidate) {
                self.register_ref_id(candidate.clone());
                return candidate;
            }
            suffix += 1;
        }
    }
}
