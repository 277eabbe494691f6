//! Syntax layer: tree model, lexer, parser, renderer and traversal traits.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod visit;

use thiserror::Error;

pub use parser::{parse_source, parse_statements};

/// Failure to turn source text into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected character `{text}` at byte {offset}")]
    UnexpectedChar { text: String, offset: usize },

    #[error("expected {expected}, found {found} at byte {offset}")]
    Expected {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("`{construct}` starting at byte {offset} is never closed")]
    Unterminated {
        construct: &'static str,
        offset: usize,
    },

    #[error("invalid numeric literal `{text}` at byte {offset}")]
    InvalidNumber { text: String, offset: usize },
}

impl ParseError {
    /// Byte offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::UnexpectedChar { offset, .. }
            | ParseError::Expected { offset, .. }
            | ParseError::Unterminated { offset, .. }
            | ParseError::InvalidNumber { offset, .. } => *offset,
        }
    }
}
