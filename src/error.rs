//! Parse error types with source locations.

use compact_str::CompactString;
use std::fmt;

/// Position of a parse error in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, counted in bytes.
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl SourceLocation {
    /// Computes line and column for `offset` by scanning `data` up to it.
    pub fn at(data: &[u8], offset: usize) -> Self {
        let offset = offset.min(data.len());
        let prefix = &data[..offset];
        let line = memchr::memchr_iter(b'\n', prefix).count() + 1;
        let line_start = memchr::memrchr(b'\n', prefix).map_or(0, |i| i + 1);
        Self {
            line: line as u32,
            column: (offset - line_start + 1) as u32,
            byte_offset: offset,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Broad class of a [`ParseErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Tag or attribute syntax violation.
    Malformed,
    /// Open/close structure violation.
    Structural,
}

/// Markup forms the loader recognizes but refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    ProcessingInstruction,
    /// Comments, CDATA sections and DOCTYPE declarations (`<!...`).
    Declaration,
    SelfClosingTag,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessingInstruction => write!(f, "processing instruction"),
            Self::Declaration => write!(f, "markup declaration"),
            Self::SelfClosingTag => write!(f, "self-closing tag"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("document contains no element")]
    EmptyDocument,

    #[error("text outside of any element")]
    TextOutsideElement,

    #[error("closing tag </{tag}> has no open element")]
    StrayClosingTag { tag: CompactString },

    #[error("tag mismatch: open tag <{open}> closed by </{close}>")]
    TagMismatch {
        open: CompactString,
        close: CompactString,
    },

    #[error("element <{tag}> is never closed")]
    UnclosedElement { tag: CompactString },

    #[error("second top-level element <{tag}> after the root was closed")]
    MultipleRoots { tag: CompactString },

    #[error("nesting exceeds the maximum depth of {limit}")]
    DepthLimitExceeded { limit: usize },

    #[error("document has more than {limit} elements")]
    TooManyElements { limit: usize },

    #[error("attribute value has no key")]
    ValueWithoutKey,

    #[error("attribute `{key}` has no value")]
    MissingAttributeValue { key: CompactString },

    #[error("value of attribute `{key}` is not quoted")]
    UnquotedAttributeValue { key: CompactString },

    #[error("empty tag name")]
    EmptyTagName,

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(Construct),

    #[error("invalid UTF-8")]
    InvalidUtf8,
}

impl ParseErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyDocument
            | Self::TextOutsideElement
            | Self::StrayClosingTag { .. }
            | Self::TagMismatch { .. }
            | Self::UnclosedElement { .. }
            | Self::MultipleRoots { .. }
            | Self::DepthLimitExceeded { .. }
            | Self::TooManyElements { .. } => ErrorCategory::Structural,
            Self::ValueWithoutKey
            | Self::MissingAttributeValue { .. }
            | Self::UnquotedAttributeValue { .. }
            | Self::EmptyTagName
            | Self::UnexpectedEof
            | Self::UnsupportedConstruct(_)
            | Self::InvalidUtf8 => ErrorCategory::Malformed,
        }
    }
}

/// The error returned when a document fails to load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {location}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub location: SourceLocation,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}
