// Tag header scanning methods for TreeBuilder

impl<'a> TreeBuilder<'a> {
    /// Reads the element name after `<`, up to whitespace or `>`.
    #[inline(always)]
    fn read_tag_name(&mut self) -> ParseResult<CompactString> {
        let start = self.scanner.pos;
        loop {
            match self.scanner.peek() {
                None => {
                    return Err(self.error_at(ParseErrorKind::UnexpectedEof, self.scanner.pos))
                }
                Some(byte) if is_space(byte) || byte == TAG_END => break,
                Some(SLASH) if self.scanner.peek_at(1) == Some(TAG_END) => break,
                Some(_) => self.scanner.advance(1),
            }
        }

        let end = self.scanner.pos;
        if start == end {
            return Err(self.error_at(ParseErrorKind::EmptyTagName, start));
        }
        self.utf8(self.scanner.slice(start, end), start)
            .map(CompactString::from)
    }

    #[inline(always)]
    fn at_self_closing_end(&self) -> bool {
        self.scanner.peek() == Some(SLASH) && self.scanner.peek_at(1) == Some(TAG_END)
    }

    /// Scans `key="value"` pairs up to and including the `>` that ends the
    /// opening tag, appending each pair to `id` as soon as its value closes.
    fn read_attributes(&mut self, id: NodeId) -> ParseResult<()> {
        // Start of the token being read.
        let mut token: Option<usize> = None;
        // A token ended by whitespace, still waiting for its `=`.
        let mut name: Option<(usize, usize)> = None;
        // A key whose `=` was seen, waiting for its quoted value.
        let mut key: Option<CompactString> = None;

        loop {
            let pos = self.scanner.pos;
            let Some(byte) = self.scanner.peek() else {
                return Err(self.error_at(ParseErrorKind::UnexpectedEof, pos));
            };

            match byte {
                TAG_END => {
                    if let Some(start) = token.take() {
                        name = Some((start, pos));
                    }
                    if let Some((start, end)) = name {
                        return Err(self.missing_value(start, end));
                    }
                    if let Some(key) = key.take() {
                        return Err(
                            self.error_at(ParseErrorKind::MissingAttributeValue { key }, pos)
                        );
                    }
                    self.scanner.advance(1);
                    return Ok(());
                }
                SLASH if self.scanner.peek_at(1) == Some(TAG_END) => {
                    return Err(self.error_at(
                        ParseErrorKind::UnsupportedConstruct(Construct::SelfClosingTag),
                        pos,
                    ));
                }
                byte if is_space(byte) => {
                    if let Some(start) = token.take() {
                        name = Some((start, pos));
                    }
                    self.scanner.advance(1);
                }
                EQUALS => {
                    if let Some(key) = key.take() {
                        return Err(
                            self.error_at(ParseErrorKind::UnquotedAttributeValue { key }, pos)
                        );
                    }
                    let (start, end) = match (token.take(), name.take()) {
                        (Some(start), _) => (start, pos),
                        (None, Some(range)) => range,
                        (None, None) => {
                            return Err(self.error_at(ParseErrorKind::ValueWithoutKey, pos))
                        }
                    };
                    key = Some(self.utf8(self.scanner.slice(start, end), start)?.into());
                    self.scanner.advance(1);
                }
                QUOTE => {
                    let Some(key) = key.take() else {
                        return Err(self.error_at(ParseErrorKind::ValueWithoutKey, pos));
                    };
                    let value_start = pos + 1;
                    self.scanner.seek(value_start);
                    let Some(close) = self.scanner.find_next(QUOTE) else {
                        return Err(self.error_at(
                            ParseErrorKind::UnexpectedEof,
                            self.scanner.data.len(),
                        ));
                    };
                    let value = self.utf8(self.scanner.slice(value_start, close), value_start)?;
                    if let Some(doc) = self.doc.as_mut() {
                        doc.node_mut(id).push_attribute(Attribute::new(key, value));
                    }
                    self.scanner.seek(close + 1);
                }
                _ => {
                    if let Some(key) = key.take() {
                        return Err(
                            self.error_at(ParseErrorKind::UnquotedAttributeValue { key }, pos)
                        );
                    }
                    if let Some((start, end)) = name {
                        return Err(self.missing_value(start, end));
                    }
                    token.get_or_insert(pos);
                    self.scanner.advance(1);
                }
            }
        }
    }

    #[cold]
    fn missing_value(&self, start: usize, end: usize) -> ParseError {
        let key = String::from_utf8_lossy(self.scanner.slice(start, end));
        self.error_at(
            ParseErrorKind::MissingAttributeValue {
                key: CompactString::from(key.as_ref()),
            },
            start,
        )
    }
}
