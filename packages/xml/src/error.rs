use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected end of input at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },

    #[error("Mismatched closing tag at {pos}: expected </{expected}>, found </{found}>")]
    MismatchedClosingTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Closing tag </{found}> at {pos} has no matching open element")]
    UnexpectedClosingTag { pos: usize, found: String },

    #[error("Invalid entity reference '{entity}' at {pos}")]
    InvalidEntity { pos: usize, entity: String },
}

impl ParseError {
    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    pub fn mismatched_closing_tag(
        pos: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::MismatchedClosingTag {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_closing_tag(pos: usize, found: impl Into<String>) -> Self {
        Self::UnexpectedClosingTag {
            pos,
            found: found.into(),
        }
    }

    pub fn invalid_entity(pos: usize, entity: impl Into<String>) -> Self {
        Self::InvalidEntity {
            pos,
            entity: entity.into(),
        }
    }
}
