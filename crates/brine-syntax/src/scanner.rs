//! The byte scanner underlying every parser.
//!
//! The scanner owns a cursor over an immutable, already-validated UTF-8
//! buffer and tracks two line/column offsets: the raw cursor offset and a
//! "relevant" offset that lags behind over whitespace, giving error spans
//! that end at the last meaningful token instead of trailing blanks.
//!
//! Speculative parsing is built entirely on [`Scanner::state`] /
//! [`Scanner::backtrack`]: a checkpoint is a plain value, restoring it is
//! the sole rollback mechanism, and a restored scanner is bit-identical to
//! the checkpointed one.

use brine_source_map::{EncodingError, FileId, Offset, Span};

use crate::character::is_whitespace;
use crate::error::{ParseError, ParseResult};

/// A checkpoint of the scanner's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerState {
    pub position: usize,
    pub offset: Offset,
}

#[derive(Debug)]
pub struct Scanner<'a> {
    text: &'a str,
    file: FileId,
    /// Byte position of the cursor.
    position: usize,
    /// Line/column of the cursor.
    pub offset: Offset,
    /// Line/column just past the last non-whitespace byte consumed.
    pub relevant: Offset,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str, file: FileId) -> Self {
        Scanner {
            text,
            file,
            position: 0,
            offset: Offset::ZERO,
            relevant: Offset::ZERO,
        }
    }

    /// Builds a scanner from raw bytes, validating the encoding first so
    /// parsing never sees invalid UTF-8 mid-stream.
    pub fn from_bytes(
        bytes: &'a [u8],
        path: &str,
        file: FileId,
    ) -> Result<Self, EncodingError> {
        let text = std::str::from_utf8(bytes).map_err(|e| EncodingError {
            path: path.to_string(),
            position: e.valid_up_to(),
        })?;
        Ok(Scanner::new(text, file))
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn is_done(&self) -> bool {
        self.position >= self.text.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// The byte [n] positions ahead of the cursor, without consuming.
    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.text.as_bytes().get(self.position + n).copied()
    }

    pub fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn consumed(&mut self, byte: u8) {
        self.offset.advance(byte);
        if !is_whitespace(byte) {
            self.relevant = self.offset;
        }
    }

    /// Consumes and returns the next byte.
    pub fn read_char(&mut self) -> ParseResult<u8> {
        match self.peek() {
            Some(byte) => {
                self.position += 1;
                self.consumed(byte);
                Ok(byte)
            }
            None => Err(self.fail("more input")),
        }
    }

    /// Consumes and returns the next full code point. Needed wherever
    /// consumed text is pushed into a buffer, since non-ASCII name
    /// characters span several bytes.
    pub fn read_utf8_char(&mut self) -> ParseResult<char> {
        match self.text[self.position..].chars().next() {
            Some(c) => {
                let end = self.position + c.len_utf8();
                while self.position < end {
                    let byte = self.text.as_bytes()[self.position];
                    self.position += 1;
                    self.consumed(byte);
                }
                Ok(c)
            }
            None => Err(self.fail("more input")),
        }
    }

    /// The byte just behind the cursor, if any.
    pub fn peek_behind(&self) -> Option<u8> {
        self.position
            .checked_sub(1)
            .and_then(|p| self.text.as_bytes().get(p).copied())
    }

    /// Consumes the next byte if it equals [byte].
    pub fn scan_char(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.position += 1;
            self.consumed(byte);
            true
        } else {
            false
        }
    }

    /// Consumes the next byte, failing with "expected [name]." (or the
    /// quoted byte itself) if it doesn't match. Never advances on failure.
    pub fn expect_char(&mut self, byte: u8, name: Option<&str>) -> ParseResult<()> {
        if self.scan_char(byte) {
            return Ok(());
        }
        match name {
            Some(name) => Err(self.fail(name)),
            None => Err(self.fail(&format!("\"{}\"", byte as char))),
        }
    }

    /// Consumes [literal] if the input starts with it at the cursor.
    pub fn scan(&mut self, literal: &str) -> bool {
        if !self.matches(literal) {
            return false;
        }
        for byte in literal.bytes() {
            self.consumed(byte);
        }
        self.position += literal.len();
        true
    }

    /// Like [`Scanner::scan`], but failure raises "expected [name].".
    pub fn expect(&mut self, literal: &str, name: Option<&str>) -> ParseResult<()> {
        if self.scan(literal) {
            return Ok(());
        }
        match name {
            Some(name) => Err(self.fail(name)),
            None => Err(self.fail(&format!("\"{literal}\""))),
        }
    }

    /// Whether the input starts with [literal] at the cursor. Never moves
    /// the cursor.
    pub fn matches(&self, literal: &str) -> bool {
        self.text[self.position..].starts_with(literal)
    }

    pub fn expect_done(&self) -> ParseResult<()> {
        if self.is_done() {
            Ok(())
        } else {
            Err(self.fail("no more input"))
        }
    }

    /// The text between [start] (a byte position) and the cursor.
    pub fn substring(&self, start: usize) -> &'a str {
        &self.text[start..self.position]
    }

    pub fn state(&self) -> ScannerState {
        ScannerState {
            position: self.position,
            offset: self.offset,
        }
    }

    /// Restores a previously captured checkpoint. States are only taken at
    /// relevant positions, so the relevant offset snaps to the cursor.
    pub fn backtrack(&mut self, state: ScannerState) {
        self.position = state.position;
        self.offset = state.offset;
        self.relevant = state.offset;
    }

    /// A zero-length span at the raw cursor position.
    pub fn raw_span(&self) -> Span {
        Span::at(self.file, self.offset)
    }

    /// A zero-length span at the last relevant position.
    pub fn relevant_span(&self) -> Span {
        Span::at(self.file, self.relevant)
    }

    /// A zero-length span at [start].
    pub fn span_at(&self, start: Offset) -> Span {
        Span::at(self.file, start)
    }

    /// A span from [start] to the raw cursor position.
    pub fn raw_span_from(&self, start: Offset) -> Span {
        Span::new(self.file, start, Offset::distance(start, self.offset))
    }

    /// A span from [start] to the last relevant position, excluding any
    /// trailing whitespace already consumed.
    pub fn relevant_span_from(&self, start: Offset) -> Span {
        let end = self.relevant.max(start);
        Span::new(self.file, start, Offset::distance(start, end))
    }

    /// An "expected [name]." failure at the current relevant position.
    pub fn fail(&self, name: &str) -> ParseError {
        ParseError::expected(name, self.relevant_span())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(text: &str) -> Scanner<'_> {
        Scanner::new(text, FileId(0))
    }

    #[test]
    fn read_advances_offsets() {
        let mut s = scanner("ab\ncd");
        assert_eq!(s.read_char().unwrap(), b'a');
        assert_eq!(s.offset, Offset::new(0, 1));
        s.read_char().unwrap();
        s.read_char().unwrap();
        assert_eq!(s.offset, Offset::new(1, 0));
        assert_eq!(s.read_char().unwrap(), b'c');
    }

    #[test]
    fn relevant_lags_over_whitespace() {
        let mut s = scanner("ab  \n  c");
        s.read_char().unwrap();
        s.read_char().unwrap();
        let after_word = s.offset;
        while s.peek().map(is_whitespace) == Some(true) {
            s.read_char().unwrap();
        }
        assert_eq!(s.relevant, after_word);
        assert_ne!(s.offset, after_word);
        s.read_char().unwrap();
        assert_eq!(s.relevant, s.offset);
    }

    #[test]
    fn scan_consumes_only_on_full_match() {
        let mut s = scanner("hello");
        assert!(!s.scan("help"));
        assert_eq!(s.position(), 0);
        assert_eq!(s.offset, Offset::ZERO);
        assert!(s.scan("hell"));
        assert_eq!(s.position(), 4);
    }

    #[test]
    fn expect_char_reports_name() {
        let mut s = scanner("x");
        let err = s.expect_char(b'{', Some("\"{\"")).unwrap_err();
        assert_eq!(err.to_string(), "expected \"{\".");
        // Cursor untouched by the failed expectation.
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn backtrack_restores_exact_state() {
        let mut s = scanner("foo bar\nbaz");
        s.scan("foo bar");
        let checkpoint = s.state();
        s.scan("\nbaz");
        assert!(s.is_done());
        s.backtrack(checkpoint);
        assert_eq!(s.state(), checkpoint);
        assert_eq!(s.offset, checkpoint.offset);
        assert_eq!(s.relevant, checkpoint.offset);
        assert!(s.scan("\nbaz"));
    }

    #[test]
    fn from_bytes_rejects_invalid_utf8() {
        let err = Scanner::from_bytes(&[0x61, 0xC0], "x.scss", FileId(0)).unwrap_err();
        assert_eq!(err.position, 1);
    }

    #[test]
    fn multibyte_chars_count_one_column() {
        let mut s = scanner("é→");
        s.read_char().unwrap();
        s.read_char().unwrap();
        assert_eq!(s.offset, Offset::new(0, 1));
        while !s.is_done() {
            s.read_char().unwrap();
        }
        assert_eq!(s.offset, Offset::new(0, 2));
    }

    #[test]
    fn relevant_span_from_excludes_trailing_whitespace() {
        let mut s = scanner("abc   ");
        let start = s.offset;
        while !s.is_done() {
            s.read_char().unwrap();
        }
        let span = s.relevant_span_from(start);
        assert_eq!(span.length, Offset::new(0, 3));
    }
}
