//! # Vellum XML
//!
//! Node model, streaming parser and writer for the Vellum document store.
//!
//! ```text
//! text ──parse──▶ ParsedDocument { roots, nodes } ──▶ store
//! store ──write_document(roots, nodes)──▶ text
//! ```
//!
//! The parser and writer are deliberately mechanical: they translate between
//! text and the flat `(roots, nodes)` shape and nothing else. Everything
//! transactional (commands, undo, streams) lives in `vellum-editor`, which
//! wraps these structures as store state without further validation.

pub mod entities;
pub mod error;
pub mod node;
pub mod parser;
pub mod writer;

pub use error::{ParseError, ParseResult};
pub use node::{Node, NodeId, NodeKind};
pub use parser::{parse, ParsedDocument};
pub use writer::write_document;
