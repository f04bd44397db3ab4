//! cimplexml - Minimal single-pass XML document loader
//!
//! Licensed under AGPL-3.0

pub mod error;
pub mod model;
pub mod parser;
mod scanner;
pub mod source;

pub use error::{Construct, ErrorCategory, ParseError, ParseErrorKind, SourceLocation};
pub use model::{
    Attribute, Attributes, Descendants, Document, NodeId, NodeRef, MAX_NODES, MAX_SERIALIZE_DEPTH,
};
pub use parser::Parser;

use std::path::Path;

/// Loads a document from an in-memory buffer with default options.
pub fn load(data: &[u8]) -> std::result::Result<Document, ParseError> {
    Parser::new().parse_bytes(data)
}

/// Reads the file at `path` and loads it with default options.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    Parser::new().parse_file(path)
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl Error {
    /// The parse error, if the input was readable but malformed.
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Io(_) => None,
        }
    }
}
