//! Error types for the document store and execution engine.

use thiserror::Error;
use vellum_xml::{NodeId, ParseError};

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("No value found for {0}")]
    ValueNotFound(NodeId),

    #[error("Operation requires an element node")]
    NotAnElement,

    #[error("Operation is not valid on an element node")]
    InvalidElement,

    #[error("Command '{name}' failed: {source}")]
    CommandFailed {
        name: String,
        #[source]
        source: Box<DocumentError>,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Upsert did not produce a queryable element")]
    UpsertFailedToCreateElement,

    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("A command stream is already open")]
    CommandStreamAlreadyOpen,

    #[error("No command stream is open")]
    NoOpenCommandStream,
}

impl DocumentError {
    pub(crate) fn command_failed(name: impl Into<String>, cause: DocumentError) -> Self {
        Self::CommandFailed {
            name: name.into(),
            source: Box::new(cause),
        }
    }
}
