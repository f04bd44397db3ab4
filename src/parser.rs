// Single-pass XML loader: scans bytes and builds the tree in the same loop
use crate::error::{Construct, ParseError, ParseErrorKind, SourceLocation};
use crate::model::{Attribute, Document, NodeId, MAX_NODES};
use crate::scanner::*;
use crate::{source, Result};
use compact_str::CompactString;
use std::path::Path;
use tracing::{debug, trace};

type ParseResult<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, Default)]
pub struct Parser {
    whitespace_text: bool,
    max_depth: Option<usize>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep whitespace-only text runs next to child elements. Off by
    /// default, so indentation never ends up as element text.
    pub fn with_whitespace_text(mut self, keep: bool) -> Self {
        self.whitespace_text = keep;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let path = path.as_ref();
        debug!("Loading {}", path.display());
        let content = source::Source::open(path)?;
        Ok(self.parse_bytes(&content)?)
    }

    pub fn parse_str(&self, text: &str) -> ParseResult<Document> {
        self.parse_bytes(text.as_bytes())
    }

    pub fn parse_bytes(&self, data: &[u8]) -> ParseResult<Document> {
        // Skip BOM if present
        let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
            &data[3..]
        } else {
            data
        };

        debug!(bytes = data.len(), "parsing document");
        let doc = TreeBuilder::new(data, self).build()?;
        debug!(
            nodes = doc.node_count(),
            depth = doc.max_depth(),
            "document loaded"
        );
        Ok(doc)
    }
}

/// Scanner state plus the tree under construction.
///
/// `open` is the element whose closing tag has not been seen yet; walking its
/// parent links gives the stack of enclosing elements.
struct TreeBuilder<'a> {
    scanner: Scanner<'a>,
    doc: Option<Document>,
    open: Option<NodeId>,
    depth: usize,
    root_closed: bool,
    /// Byte range of the pending text run.
    text: Option<(usize, usize)>,
    whitespace_text: bool,
    max_depth: Option<usize>,
}

// Include tag header scanning methods
include!("parser_base.rs");

impl<'a> TreeBuilder<'a> {
    fn new(data: &'a [u8], options: &Parser) -> Self {
        Self {
            scanner: Scanner::new(data),
            doc: None,
            open: None,
            depth: 0,
            root_closed: false,
            text: None,
            whitespace_text: options.whitespace_text,
            max_depth: options.max_depth,
        }
    }

    fn build(mut self) -> ParseResult<Document> {
        while !self.scanner.is_eof() {
            let Some(lt) = self.scanner.find_next(TAG_START) else {
                self.push_text(self.scanner.data.len());
                self.scanner.seek(self.scanner.data.len());
                break;
            };
            self.push_text(lt);
            self.flush_text()?;

            self.scanner.seek(lt + 1);
            match self.scanner.peek() {
                Some(SLASH) => {
                    self.scanner.advance(1);
                    self.close_tag(lt)?;
                }
                Some(b'?') => {
                    return Err(self.error_at(
                        ParseErrorKind::UnsupportedConstruct(Construct::ProcessingInstruction),
                        lt,
                    ))
                }
                Some(b'!') => {
                    return Err(self.error_at(
                        ParseErrorKind::UnsupportedConstruct(Construct::Declaration),
                        lt,
                    ))
                }
                Some(_) => self.open_tag(lt)?,
                None => return Err(self.error_at(ParseErrorKind::UnexpectedEof, self.scanner.pos)),
            }
        }

        if let Some(id) = self.open {
            let tag = self.tag_of(id);
            return Err(self.error_at(
                ParseErrorKind::UnclosedElement { tag },
                self.scanner.data.len(),
            ));
        }
        self.flush_text()?;

        let end = self.scanner.data.len();
        self.doc
            .take()
            .ok_or_else(|| self.error_at(ParseErrorKind::EmptyDocument, end))
    }

    fn open_tag(&mut self, lt: usize) -> ParseResult<()> {
        let tag = self.read_tag_name()?;
        if self.at_self_closing_end() {
            return Err(self.error_at(
                ParseErrorKind::UnsupportedConstruct(Construct::SelfClosingTag),
                lt,
            ));
        }
        if self.root_closed {
            return Err(self.error_at(ParseErrorKind::MultipleRoots { tag }, lt));
        }
        if let Some(limit) = self.max_depth {
            if self.depth >= limit {
                return Err(self.error_at(ParseErrorKind::DepthLimitExceeded { limit }, lt));
            }
        }

        let keep_blank = self.whitespace_text;
        let id = match (self.open, &mut self.doc) {
            (Some(parent), Some(doc)) => {
                // Indentation before the first child is not text.
                if !keep_blank {
                    doc.node_mut(parent).discard_blank_text();
                }
                doc.append_child(parent, tag)
            }
            (_, slot) => {
                *slot = Some(Document::with_root(tag));
                Some(NodeId::ROOT)
            }
        };
        let Some(id) = id else {
            return Err(self.error_at(ParseErrorKind::TooManyElements { limit: MAX_NODES }, lt));
        };
        self.open = Some(id);
        self.depth += 1;

        self.read_attributes(id)
    }

    fn close_tag(&mut self, lt: usize) -> ParseResult<()> {
        let start = self.scanner.pos;
        let Some(gt) = self.scanner.find_next(TAG_END) else {
            return Err(self.error_at(ParseErrorKind::UnexpectedEof, self.scanner.data.len()));
        };

        // `</name >` is tolerated; whitespace before the name is not.
        let raw = self.scanner.slice(start, gt);
        let len = raw.iter().rposition(|&b| !is_space(b)).map_or(0, |i| i + 1);
        if len == 0 || is_space(raw[0]) {
            return Err(self.error_at(ParseErrorKind::EmptyTagName, start));
        }
        let close = self.utf8(&raw[..len], start)?;

        let Some(id) = self.open else {
            return Err(self.error_at(
                ParseErrorKind::StrayClosingTag { tag: close.into() },
                lt,
            ));
        };
        let open = self.tag_of(id);
        if open.as_str() != close {
            return Err(self.error_at(
                ParseErrorKind::TagMismatch {
                    open,
                    close: close.into(),
                },
                lt,
            ));
        }

        trace!(tag = %open, "closed element");
        self.open = self.doc.as_ref().and_then(|doc| doc.parent_of(id));
        self.depth -= 1;
        if self.open.is_none() {
            self.root_closed = true;
        }
        self.scanner.seek(gt + 1);
        Ok(())
    }

    #[inline(always)]
    fn push_text(&mut self, end: usize) {
        let start = self.scanner.pos;
        if end > start {
            self.text = Some((start, end));
        }
    }

    /// Stores the pending text run on the open element, replacing any
    /// earlier run at the same level.
    ///
    /// Unless `whitespace_text` is set, a whitespace-only run is dropped once
    /// the element has children; in a leaf element it is kept as text.
    /// Whitespace-only runs before or after the root are skipped on purpose,
    /// so a leading or trailing newline does not fail the load. Any other
    /// text there is `TextOutsideElement`.
    fn flush_text(&mut self) -> ParseResult<()> {
        let Some((start, end)) = self.text.take() else {
            return Ok(());
        };
        let run = self.scanner.slice(start, end);
        let blank = is_blank(run);

        match self.open {
            None if blank => Ok(()),
            None => Err(self.error_at(ParseErrorKind::TextOutsideElement, start)),
            Some(id) if blank && !self.whitespace_text && self.has_children(id) => Ok(()),
            Some(id) => {
                let text = self.utf8(run, start)?.to_string();
                if let Some(doc) = self.doc.as_mut() {
                    doc.node_mut(id).set_text(text);
                }
                Ok(())
            }
        }
    }

    fn has_children(&self, id: NodeId) -> bool {
        self.doc
            .as_ref()
            .and_then(|doc| doc.get(id))
            .is_some_and(|node| node.child_count() > 0)
    }

    fn tag_of(&self, id: NodeId) -> CompactString {
        self.doc
            .as_ref()
            .and_then(|doc| doc.get(id))
            .map(|node| CompactString::from(node.tag()))
            .unwrap_or_default()
    }

    fn utf8(&self, bytes: &'a [u8], offset: usize) -> ParseResult<&'a str> {
        std::str::from_utf8(bytes).map_err(|e| {
            self.error_at(ParseErrorKind::InvalidUtf8, offset + e.valid_up_to())
        })
    }

    #[cold]
    fn error_at(&self, kind: ParseErrorKind, offset: usize) -> ParseError {
        ParseError::new(kind, SourceLocation::at(self.scanner.data, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> ParseResult<Document> {
        Parser::new().parse_str(input)
    }

    fn kind(input: &str) -> ParseErrorKind {
        parse(input).unwrap_err().kind
    }

    #[test]
    fn test_text_capture() {
        let doc = parse("<a>hello</a>").unwrap();
        let root = doc.root();
        assert_eq!(root.tag(), "a");
        assert_eq!(root.text(), Some("hello"));
        assert!(root.attributes().is_empty());
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn test_nested_children() {
        let doc = parse("<a><b><c>deep</c></b><d></d></a>").unwrap();
        let root = doc.root();
        let tags: Vec<_> = root.children().map(|c| c.tag()).collect();
        assert_eq!(tags, vec!["b", "d"]);

        let c = root.child("b").and_then(|b| b.child("c")).unwrap();
        assert_eq!(c.text(), Some("deep"));
        assert_eq!(c.parent().map(|p| p.tag()), Some("b"));
        assert_eq!(doc.max_depth(), 3);
        assert_eq!(doc.node_count(), 4);
    }

    #[test]
    fn test_attributes_in_order() {
        let doc = parse(r#"<a x="1" y="2" x="3"></a>"#).unwrap();
        let attrs: Vec<_> = doc
            .root()
            .attributes()
            .iter()
            .map(|a| (a.key.as_str(), a.value.as_str()))
            .collect();
        assert_eq!(attrs, vec![("x", "1"), ("y", "2"), ("x", "3")]);
        assert_eq!(doc.root().attribute("x"), Some("1"));
    }

    #[test]
    fn test_attribute_whitespace_tolerance() {
        let doc = parse("<item  id = \"7\"\n\tname=\"a b\"  >v</item>").unwrap();
        let root = doc.root();
        assert_eq!(root.tag(), "item");
        assert_eq!(root.attribute("id"), Some("7"));
        assert_eq!(root.attribute("name"), Some("a b"));
        assert_eq!(root.text(), Some("v"));
    }

    #[test]
    fn test_value_kept_verbatim() {
        let doc = parse(r#"<a href="x?a=1&amp;b=<2>"></a>"#).unwrap();
        assert_eq!(doc.root().attribute("href"), Some("x?a=1&amp;b=<2>"));
    }

    #[test]
    fn test_indented_document() {
        let input = "\n<config>\n  <name>demo</name>\n  <port>80</port>\n</config>\n";
        let doc = parse(input).unwrap();
        let root = doc.root();
        assert_eq!(root.text(), None);
        assert_eq!(root.child("port").and_then(|p| p.text()), Some("80"));
    }

    #[test]
    fn test_whitespace_text_option() {
        let doc = Parser::new()
            .with_whitespace_text(true)
            .parse_str("<a>\n  <b>x</b>\n</a>")
            .unwrap();
        assert_eq!(doc.root().text(), Some("\n"));
    }

    #[test]
    fn test_whitespace_in_leaf_is_text() {
        let doc = parse("<a> </a>").unwrap();
        assert_eq!(doc.root().text(), Some(" "));

        let doc = parse("<a><b>\n\t</b>  </a>").unwrap();
        assert_eq!(doc.root().text(), None);
        assert_eq!(doc.root().child("b").and_then(|b| b.text()), Some("\n\t"));
    }

    #[test]
    fn test_indentation_around_children_dropped() {
        let doc = parse("<a>\n  <b>x</b>\n  <c> </c>\n</a>").unwrap();
        let root = doc.root();
        assert_eq!(root.text(), None);
        assert_eq!(root.child("c").and_then(|c| c.text()), Some(" "));

        let doc = parse("<a>one<b></b>\n</a>").unwrap();
        assert_eq!(doc.root().text(), Some("one"));
    }

    #[test]
    fn test_whitespace_outside_root_skipped() {
        let doc = parse("\n\t<a>x</a>\r\n").unwrap();
        assert_eq!(doc.root().text(), Some("x"));

        let err = parse("\n<a></a>\nx").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TextOutsideElement);
        assert_eq!(err.location.byte_offset, 8);
    }

    #[test]
    fn test_last_text_run_wins() {
        let doc = parse("<a>first<b></b>second<c></c></a>").unwrap();
        assert_eq!(doc.root().text(), Some("second"));
    }

    #[test]
    fn test_close_tag_trailing_space() {
        let doc = parse("<a>x</a  >").unwrap();
        assert_eq!(doc.root().tag(), "a");
    }

    #[test]
    fn test_bom_skipped() {
        let doc = Parser::new().parse_bytes(b"\xEF\xBB\xBF<a></a>").unwrap();
        assert_eq!(doc.root().tag(), "a");
    }

    #[test]
    fn test_tag_mismatch() {
        let err = parse("<a><b></a></b>").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::TagMismatch {
                open: "b".into(),
                close: "a".into()
            }
        );
        assert_eq!(err.location.byte_offset, 6);
        assert_eq!(err.category(), ErrorCategory::Structural);
    }

    #[test]
    fn test_unclosed_element() {
        assert_eq!(
            kind("<a><b></b>"),
            ParseErrorKind::UnclosedElement { tag: "a".into() }
        );
    }

    #[test]
    fn test_stray_closing_tag() {
        assert_eq!(
            kind("</a>"),
            ParseErrorKind::StrayClosingTag { tag: "a".into() }
        );
        assert_eq!(
            kind("<a></a></a>"),
            ParseErrorKind::StrayClosingTag { tag: "a".into() }
        );
    }

    #[test]
    fn test_text_outside_element() {
        assert_eq!(kind("junk<a></a>"), ParseErrorKind::TextOutsideElement);
        assert_eq!(kind("<a></a>junk"), ParseErrorKind::TextOutsideElement);
        assert_eq!(kind("just text"), ParseErrorKind::TextOutsideElement);
    }

    #[test]
    fn test_multiple_roots() {
        assert_eq!(
            kind("<a></a><b></b>"),
            ParseErrorKind::MultipleRoots { tag: "b".into() }
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(kind(""), ParseErrorKind::EmptyDocument);
        assert_eq!(kind(" \n "), ParseErrorKind::EmptyDocument);
    }

    #[test]
    fn test_value_without_key() {
        let err = parse(r#"<a "1"></a>"#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ValueWithoutKey);
        assert_eq!(err.category(), ErrorCategory::Malformed);
        assert_eq!(kind(r#"<a ="1"></a>"#), ParseErrorKind::ValueWithoutKey);
    }

    #[test]
    fn test_missing_attribute_value() {
        assert_eq!(
            kind("<a flag></a>"),
            ParseErrorKind::MissingAttributeValue { key: "flag".into() }
        );
        assert_eq!(
            kind("<a x=></a>"),
            ParseErrorKind::MissingAttributeValue { key: "x".into() }
        );
        assert_eq!(
            kind(r#"<a x y="1"></a>"#),
            ParseErrorKind::MissingAttributeValue { key: "x".into() }
        );
    }

    #[test]
    fn test_unquoted_value() {
        assert_eq!(
            kind("<a x=1></a>"),
            ParseErrorKind::UnquotedAttributeValue { key: "x".into() }
        );
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(kind("<a"), ParseErrorKind::UnexpectedEof);
        assert_eq!(kind(r#"<a x="1></a>"#), ParseErrorKind::UnexpectedEof);
        assert_eq!(kind("<a></a"), ParseErrorKind::UnexpectedEof);
        assert_eq!(kind("<a>text<"), ParseErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_empty_tag_name() {
        assert_eq!(kind("<></>"), ParseErrorKind::EmptyTagName);
        assert_eq!(kind("< a></a>"), ParseErrorKind::EmptyTagName);
        assert_eq!(kind("<a></>"), ParseErrorKind::EmptyTagName);
    }

    #[test]
    fn test_unsupported_constructs() {
        assert_eq!(
            kind(r#"<?xml version="1.0"?><a></a>"#),
            ParseErrorKind::UnsupportedConstruct(Construct::ProcessingInstruction)
        );
        assert_eq!(
            kind("<a><!-- note --></a>"),
            ParseErrorKind::UnsupportedConstruct(Construct::Declaration)
        );
        assert_eq!(
            kind("<a><b/></a>"),
            ParseErrorKind::UnsupportedConstruct(Construct::SelfClosingTag)
        );
        assert_eq!(
            kind(r#"<a x="1"/>"#),
            ParseErrorKind::UnsupportedConstruct(Construct::SelfClosingTag)
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let err = Parser::new().parse_bytes(b"<a>\xFF\xFE</a>").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidUtf8);
        assert_eq!(err.location.byte_offset, 3);
    }

    #[test]
    fn test_max_depth() {
        let parser = Parser::new().with_max_depth(2);
        assert!(parser.parse_str("<a><b></b></a>").is_ok());
        assert_eq!(
            parser.parse_str("<a><b><c></c></b></a>").unwrap_err().kind,
            ParseErrorKind::DepthLimitExceeded { limit: 2 }
        );
    }

    #[test]
    fn test_error_location_line_column() {
        let err = parse("<a>\n  <b>\n  </c>\n</a>").unwrap_err();
        assert_eq!(err.location.line, 3);
        assert_eq!(err.location.column, 3);
    }
}
