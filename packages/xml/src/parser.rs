//! # Streaming XML Parser
//!
//! Turns document text into a flat node map plus an ordered root list.
//!
//! The scanner walks the input once, emitting start/end-element, characters,
//! comment and CDATA events directly into the flat structures a store wraps
//! without further validation. Whitespace-only character runs become
//! `Whitespace` nodes so the original formatting survives round trips.
//!
//! Supported surface: elements with single- or double-quoted attributes,
//! self-closing tags, comments, CDATA sections, predefined and numeric
//! entity references, and qualified names (prefix kept as `qualified_name`,
//! namespace stored as-is, never resolved). XML declarations, processing
//! instructions and DOCTYPE are skipped.

use crate::entities;
use crate::error::{ParseError, ParseResult};
use crate::node::{Node, NodeId};
use std::collections::{BTreeMap, HashMap};

/// Flat parse output: document-order roots plus the id-addressed node map.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub roots: Vec<NodeId>,
    pub nodes: HashMap<NodeId, Node>,
}

/// Parse document text into a [`ParsedDocument`].
pub fn parse(source: &str) -> ParseResult<ParsedDocument> {
    Parser::new(source).parse_document()
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    roots: Vec<NodeId>,
    nodes: HashMap<NodeId, Node>,
    stack: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            roots: Vec::new(),
            nodes: HashMap::new(),
            stack: Vec::new(),
        }
    }

    fn parse_document(mut self) -> ParseResult<ParsedDocument> {
        while !self.eof() {
            if self.bytes[self.pos] == b'<' {
                self.parse_markup()?;
            } else {
                self.parse_text()?;
            }
        }

        if !self.stack.is_empty() {
            return Err(ParseError::unexpected_eof(self.pos));
        }

        Ok(ParsedDocument {
            roots: self.roots,
            nodes: self.nodes,
        })
    }

    fn parse_text(&mut self) -> ParseResult<()> {
        let start = self.pos;
        while !self.eof() && self.bytes[self.pos] != b'<' {
            self.pos += 1;
        }

        let raw = &self.source[start..self.pos];
        let decoded = entities::decode(raw)
            .map_err(|entity| ParseError::invalid_entity(start, entity))?;

        let node = if decoded.chars().all(char::is_whitespace) {
            Node::whitespace(decoded)
        } else {
            Node::text(decoded)
        };
        self.attach(node);
        Ok(())
    }

    fn parse_markup(&mut self) -> ParseResult<()> {
        if self.starts_with("<!--") {
            self.parse_comment()
        } else if self.starts_with("<![CDATA[") {
            self.parse_cdata()
        } else if self.starts_with("<?") {
            self.skip_until(self.pos, "?>")
        } else if self.starts_with("<!") {
            // DOCTYPE and other declarations carry no tree content here.
            self.skip_until(self.pos, ">")
        } else if self.starts_with("</") {
            self.parse_end_tag()
        } else {
            self.parse_start_tag()
        }
    }

    fn parse_comment(&mut self) -> ParseResult<()> {
        let start = self.pos;
        self.pos += 4;
        let end = self
            .find("-->")
            .ok_or_else(|| ParseError::unexpected_eof(start))?;
        let text = self.source[self.pos..self.pos + end].to_string();
        self.pos += end + 3;
        self.attach(Node::comment(text));
        Ok(())
    }

    fn parse_cdata(&mut self) -> ParseResult<()> {
        let start = self.pos;
        self.pos += 9;
        let end = self
            .find("]]>")
            .ok_or_else(|| ParseError::unexpected_eof(start))?;
        // CDATA content is raw, never entity-decoded.
        let data = self.source[self.pos..self.pos + end].to_string();
        self.pos += end + 3;
        self.attach(Node::cdata(data));
        Ok(())
    }

    fn parse_end_tag(&mut self) -> ParseResult<()> {
        let tag_start = self.pos;
        self.pos += 2;
        let name = self.parse_name()?;
        self.skip_whitespace();
        self.expect(b'>')?;

        let Some(open_id) = self.stack.pop() else {
            return Err(ParseError::unexpected_closing_tag(tag_start, name));
        };
        let open_name = self
            .nodes
            .get(&open_id)
            .and_then(Node::tag_name)
            .unwrap_or_default();
        if open_name != name {
            return Err(ParseError::mismatched_closing_tag(
                tag_start,
                open_name.to_string(),
                name,
            ));
        }
        Ok(())
    }

    fn parse_start_tag(&mut self) -> ParseResult<()> {
        let tag_start = self.pos;
        self.pos += 1;
        let full_name = self.parse_name()?;
        let mut attributes = BTreeMap::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::unexpected_eof(tag_start)),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    self.expect(b'>')?;
                    self_closing = true;
                    break;
                }
                Some(_) => {
                    let (name, value) = self.parse_attribute()?;
                    attributes.insert(name, value);
                }
            }
        }

        let (name, qualified_name) = match full_name.split_once(':') {
            Some((_, local)) => (local.to_string(), Some(full_name.clone())),
            None => (full_name.clone(), None),
        };
        // Namespace passthrough only: record the declaration if the element
        // itself carries one, never resolve through ancestors.
        let namespace_uri = match full_name.split_once(':') {
            Some((prefix, _)) => attributes.get(&format!("xmlns:{prefix}")).cloned(),
            None => attributes.get("xmlns").cloned(),
        };

        let node = Node::Element {
            id: NodeId::new(),
            parent: None,
            name,
            namespace_uri,
            qualified_name,
            attributes,
            children: Vec::new(),
        };
        let id = self.attach(node);
        if !self_closing {
            self.stack.push(id);
        }
        Ok(())
    }

    fn parse_attribute(&mut self) -> ParseResult<(String, String)> {
        let name = self.parse_name()?;
        self.skip_whitespace();
        self.expect(b'=')?;
        self.skip_whitespace();

        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            Some(_) => {
                return Err(ParseError::invalid_syntax(
                    self.pos,
                    "expected quoted attribute value",
                ))
            }
            None => return Err(ParseError::unexpected_eof(self.pos)),
        };
        self.pos += 1;

        let value_start = self.pos;
        while !self.eof() && self.bytes[self.pos] != quote {
            self.pos += 1;
        }
        if self.eof() {
            return Err(ParseError::unexpected_eof(value_start));
        }
        let raw = &self.source[value_start..self.pos];
        self.pos += 1;

        let value = entities::decode(raw)
            .map_err(|entity| ParseError::invalid_entity(value_start, entity))?;
        Ok((name, value))
    }

    fn parse_name(&mut self) -> ParseResult<String> {
        let start = self.pos;
        while !self.eof() {
            let b = self.bytes[self.pos];
            if b.is_ascii_whitespace() || matches!(b, b'>' | b'/' | b'=' | b'<') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(ParseError::invalid_syntax(start, "expected a name"));
        }
        Ok(self.source[start..self.pos].to_string())
    }

    /// Link a node under the innermost open element (or the root list) and
    /// take ownership of it in the flat map.
    fn attach(&mut self, mut node: Node) -> NodeId {
        let id = node.id();
        let parent = self.stack.last().copied();
        node.set_parent(parent);

        match parent {
            Some(pid) => {
                if let Some(children) = self.nodes.get_mut(&pid).and_then(Node::children_mut) {
                    children.push(id);
                }
            }
            None => self.roots.push(id),
        }

        self.nodes.insert(id, node);
        id
    }

    fn skip_until(&mut self, err_pos: usize, delimiter: &str) -> ParseResult<()> {
        let end = self
            .find(delimiter)
            .ok_or_else(|| ParseError::unexpected_eof(err_pos))?;
        self.pos += end + delimiter.len();
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> ParseResult<()> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(ParseError::invalid_syntax(
                self.pos,
                format!("expected '{}', found '{}'", byte as char, b as char),
            )),
            None => Err(ParseError::unexpected_eof(self.pos)),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn find(&self, needle: &str) -> Option<usize> {
        self.source[self.pos..].find(needle)
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.bytes[self.pos..].starts_with(prefix.as_bytes())
    }

    fn eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}
