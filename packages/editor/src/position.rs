//! Indentation inference for insertion points.
//!
//! New content should look like it was typed in place, so factories receive
//! the ambient indentation depth at their insertion index. The depth is read
//! from the whitespace already in the document when there is any; a scope
//! with no newline before the insertion point falls back to its parent's
//! depth plus one, so unformatted documents still get sensible nesting.

use crate::builder::PositionContext;
use crate::store::{Scope, Store};
use std::collections::HashMap;
use vellum_xml::Node;

/// Context for an insertion at `index` within `scope`.
pub(crate) fn position_context(
    store: &Store,
    scope: Scope,
    index: usize,
    names: &HashMap<String, String>,
) -> PositionContext {
    let len = store.scope_ids(scope).map(Vec::len).unwrap_or(0);
    PositionContext {
        indent_level: infer_indent(store, scope, index),
        is_first_sibling: index == 0,
        is_last_sibling: index >= len,
        resolved_names: names.clone(),
    }
}

/// Indentation depth at an insertion point, in two-column units.
///
/// Scans preceding siblings for the last newline and measures the leading
/// whitespace after it. A scope with no newline before the insertion point
/// inherits its parent's depth plus one; the root scope bottoms out at 0.
fn infer_indent(store: &Store, scope: Scope, index: usize) -> usize {
    if let Some(level) = local_indent(store, scope, index) {
        return level;
    }
    match scope {
        Scope::Root => 0,
        Scope::Element(id) => {
            let Some(node) = store.get(id) else { return 0 };
            let parent_scope = Scope::of(node.parent());
            let position = store
                .scope_ids(parent_scope)
                .ok()
                .and_then(|siblings| siblings.iter().position(|x| *x == id))
                .unwrap_or(0);
            infer_indent(store, parent_scope, position) + 1
        }
    }
}

fn local_indent(store: &Store, scope: Scope, index: usize) -> Option<usize> {
    let siblings = store.scope_ids(scope).ok()?;
    let end = index.min(siblings.len());
    for id in siblings[..end].iter().rev() {
        let Some(text) = store.get(*id).and_then(Node::content) else {
            continue;
        };
        if let Some(newline) = text.rfind('\n') {
            return Some(indent_width(&text[newline + 1..]));
        }
    }
    None
}

/// Columns of leading whitespace, rounded to two-column levels. Tabs count
/// as two columns.
fn indent_width(line: &str) -> usize {
    let mut columns = 0usize;
    for ch in line.chars() {
        match ch {
            ' ' => columns += 1,
            '\t' => columns += 2,
            _ => break,
        }
    }
    (columns + 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_xml::parse;

    fn store_from(source: &str) -> Store {
        Store::from_parsed(parse(source).unwrap())
    }

    #[test]
    fn test_indent_width_units() {
        assert_eq!(indent_width(""), 0);
        assert_eq!(indent_width("  "), 1);
        assert_eq!(indent_width("    x"), 2);
        assert_eq!(indent_width("\t"), 1);
        assert_eq!(indent_width("\t\t"), 2);
        // Odd column counts round up to a full level.
        assert_eq!(indent_width(" "), 1);
        assert_eq!(indent_width("   "), 2);
    }

    #[test]
    fn test_indent_from_preceding_whitespace() {
        let store = store_from("<a>\n  <b/>\n</a>");
        let a = store.roots()[0];
        // After `<b/>` but before the closing whitespace: last newline is
        // the one before `<b/>`, indented one level.
        assert_eq!(infer_indent(&store, Scope::Element(a), 2), 1);
    }

    #[test]
    fn test_flat_scope_inherits_from_parent() {
        let store = store_from("<a>\n  <b><c/></b>\n</a>");
        let a = store.roots()[0];
        let b = store.children_of(a).unwrap()[1].id();
        // No newline inside <b>; one level deeper than <b>'s own position.
        assert_eq!(infer_indent(&store, Scope::Element(b), 1), 2);
    }

    #[test]
    fn test_unformatted_scope_falls_back_to_parent_depth() {
        let store = store_from("<a><b/></a>");
        let a = store.roots()[0];
        // No whitespace anywhere: one level per element, zero at the root.
        assert_eq!(infer_indent(&store, Scope::Element(a), 1), 1);
        assert_eq!(infer_indent(&store, Scope::Root, 1), 0);
    }

    #[test]
    fn test_position_flags() {
        let store = store_from("<a><b/><c/></a>");
        let a = store.roots()[0];
        let names = HashMap::new();

        let first = position_context(&store, Scope::Element(a), 0, &names);
        assert!(first.is_first_sibling);
        assert!(!first.is_last_sibling);

        let last = position_context(&store, Scope::Element(a), 2, &names);
        assert!(!last.is_first_sibling);
        assert!(last.is_last_sibling);
    }
}
