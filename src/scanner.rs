use memchr::memchr;

pub const TAG_START: u8 = b'<';
pub const TAG_END: u8 = b'>';
pub const SLASH: u8 = b'/';
pub const QUOTE: u8 = b'"';
pub const EQUALS: u8 = b'=';

/// Separators inside a tag header.
#[inline(always)]
pub fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

#[inline(always)]
pub fn is_blank(run: &[u8]) -> bool {
    run.iter().all(|&b| is_space(b))
}

/// Forward-only cursor over the input bytes.
pub struct Scanner<'a> {
    pub data: &'a [u8],
    pub pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline(always)]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Absolute position of the next `byte` at or after the cursor.
    #[inline(always)]
    pub fn find_next(&self, byte: u8) -> Option<usize> {
        memchr(byte, &self.data[self.pos..]).map(|i| self.pos + i)
    }

    #[inline(always)]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.data.len());
    }

    #[inline(always)]
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    #[inline(always)]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    #[inline(always)]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    #[inline(always)]
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.data[start..end]
    }

    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_next() {
        let mut scanner = Scanner::new(b"text<a>");
        assert_eq!(scanner.find_next(TAG_START), Some(4));
        scanner.advance(5);
        assert_eq!(scanner.find_next(TAG_END), Some(6));
        assert_eq!(scanner.find_next(QUOTE), None);
    }

    #[test]
    fn test_advance_stops_at_end() {
        let mut scanner = Scanner::new(b"<a>");
        scanner.advance(10);
        assert!(scanner.is_eof());
        assert_eq!(scanner.peek(), None);
    }

    #[test]
    fn test_blank_runs() {
        assert!(is_blank(b" \t\r\n"));
        assert!(is_blank(b""));
        assert!(!is_blank(b"  x "));
    }
}
