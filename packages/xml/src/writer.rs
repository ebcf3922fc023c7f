//! # Document Writer
//!
//! Serializes a flat node map back to XML text, depth-first.
//!
//! Attributes are emitted in lexicographic order (the attribute map is
//! ordered, so this falls out of iteration), values are entity-encoded, and
//! childless elements self-close. Because whitespace runs are stored as
//! nodes, the original formatting is reproduced verbatim: parse → write is
//! byte-identical up to attribute-order normalization.

use crate::entities;
use crate::node::{Node, NodeId};
use std::collections::HashMap;

/// Serialize the given roots, in order, against the node map.
pub fn write_document(roots: &[NodeId], nodes: &HashMap<NodeId, Node>) -> String {
    let mut output = String::new();
    for id in roots {
        write_node(*id, nodes, &mut output);
    }
    output
}

fn write_node(id: NodeId, nodes: &HashMap<NodeId, Node>, output: &mut String) {
    let Some(node) = nodes.get(&id) else {
        return;
    };

    match node {
        Node::Element {
            attributes,
            children,
            ..
        } => {
            let tag = node.tag_name().unwrap_or_default();
            output.push('<');
            output.push_str(tag);
            for (name, value) in attributes {
                output.push(' ');
                output.push_str(name);
                output.push_str("=\"");
                output.push_str(&entities::encode_attribute(value));
                output.push('"');
            }

            if children.is_empty() {
                output.push_str("/>");
            } else {
                output.push('>');
                for child in children {
                    write_node(*child, nodes, output);
                }
                output.push_str("</");
                output.push_str(tag);
                output.push('>');
            }
        }

        Node::Text { characters, .. } => {
            output.push_str(&entities::encode_text(characters));
        }

        Node::Whitespace { text, .. } => {
            output.push_str(&entities::encode_text(text));
        }

        Node::CData { data, .. } => {
            output.push_str("<![CDATA[");
            output.push_str(data);
            output.push_str("]]>");
        }

        Node::Comment { text, .. } => {
            output.push_str("<!--");
            output.push_str(text);
            output.push_str("-->");
        }
    }
}
