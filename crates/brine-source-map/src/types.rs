//! Core position types for source tracking.
//!
//! An [`Offset`] is a zero-based (line, column) position counted in code
//! points rather than bytes: UTF-8 continuation bytes never advance the
//! column, and a line feed resets the column while incrementing the line.
//! A [`Span`] pairs a start offset with a *length expressed as an offset
//! delta* so that spans compose correctly when text is prefixed or repeated.

use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

/// A unique identifier for a loaded source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub usize);

impl FileId {
    /// Identifier used for spans of synthesized nodes that have no
    /// backing source text.
    pub const SYNTHETIC: FileId = FileId(usize::MAX);

    pub fn is_synthetic(self) -> bool {
        self == FileId::SYNTHETIC
    }
}

/// A zero-based line/column position counted in code points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub line: u32,
    pub column: u32,
}

impl Offset {
    pub const ZERO: Offset = Offset { line: 0, column: 0 };

    pub fn new(line: u32, column: u32) -> Self {
        Offset { line, column }
    }

    /// Advances this offset by a single consumed byte.
    ///
    /// A line feed starts a new line; any other byte advances the column
    /// unless it is a UTF-8 continuation byte (`10xxxxxx`), which belongs
    /// to a code point whose lead byte already advanced the column.
    pub fn advance(&mut self, byte: u8) {
        if byte == b'\n' {
            self.line += 1;
            self.column = 0;
        } else if byte & 0xC0 != 0x80 {
            self.column += 1;
        }
    }

    /// Computes the offset delta covered by [text].
    pub fn of(text: &str) -> Offset {
        let mut offset = Offset::ZERO;
        for byte in text.bytes() {
            offset.advance(byte);
        }
        offset
    }

    /// Returns the delta from [start] to [end].
    ///
    /// When both offsets sit on the same line the delta is purely a column
    /// count; otherwise the end column is an absolute column on its own
    /// line and is carried through unchanged.
    pub fn distance(start: Offset, end: Offset) -> Offset {
        debug_assert!(start <= end, "distance requires start <= end");
        if start.line == end.line {
            Offset::new(0, end.column - start.column)
        } else {
            Offset::new(end.line - start.line, end.column)
        }
    }
}

/// Concatenation: appending text covering `rhs` after text covering `self`.
impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        if rhs.line == 0 {
            Offset::new(self.line, self.column + rhs.column)
        } else {
            Offset::new(self.line + rhs.line, rhs.column)
        }
    }
}

impl AddAssign for Offset {
    fn add_assign(&mut self, rhs: Offset) {
        *self = *self + rhs;
    }
}

/// Scaling: the delta covered by a text fragment repeated `rhs` times.
/// Used when emitting repeated indentation strings.
impl Mul<u32> for Offset {
    type Output = Offset;

    fn mul(self, rhs: u32) -> Offset {
        if self.line == 0 {
            Offset::new(0, self.column * rhs)
        } else {
            Offset::new(self.line * rhs, self.column)
        }
    }
}

/// A region of one source file: a start position plus a length delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file: FileId,
    pub start: Offset,
    pub length: Offset,
}

impl Span {
    pub fn new(file: FileId, start: Offset, length: Offset) -> Self {
        Span { file, start, length }
    }

    /// A zero-length span at [start].
    pub fn at(file: FileId, start: Offset) -> Self {
        Span::new(file, start, Offset::ZERO)
    }

    /// A span for nodes synthesized without any backing source.
    pub fn synthetic() -> Self {
        Span::at(FileId::SYNTHETIC, Offset::ZERO)
    }

    /// The position just past the end of this span.
    pub fn end(&self) -> Offset {
        self.start + self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_counts_code_points_not_bytes() {
        let mut offset = Offset::ZERO;
        for byte in "aé€b".bytes() {
            offset.advance(byte);
        }
        // 4 code points: 'a', 'é' (2 bytes), '€' (3 bytes), 'b'.
        assert_eq!(offset, Offset::new(0, 4));
    }

    #[test]
    fn advance_resets_column_on_line_feed() {
        assert_eq!(Offset::of("ab\ncde"), Offset::new(1, 3));
        assert_eq!(Offset::of("\n\n"), Offset::new(2, 0));
    }

    #[test]
    fn of_matches_manual_count() {
        let text = "héllo\nwörld\n→ done";
        let lines = text.matches('\n').count() as u32;
        let last_len = text.rsplit('\n').next().unwrap().chars().count() as u32;
        assert_eq!(Offset::of(text), Offset::new(lines, last_len));
    }

    #[test]
    fn add_concatenates() {
        // Same line: columns accumulate.
        assert_eq!(
            Offset::new(0, 3) + Offset::new(0, 4),
            Offset::new(0, 7)
        );
        // New line on the right: its column is already absolute.
        assert_eq!(
            Offset::new(2, 5) + Offset::new(1, 2),
            Offset::new(3, 2)
        );
    }

    #[test]
    fn add_matches_of_concatenation() {
        let a = "foo\nbar";
        let b = "baz\nquux!";
        let mut joined = String::from(a);
        joined.push_str(b);
        assert_eq!(Offset::of(a) + Offset::of(b), Offset::of(&joined));
    }

    #[test]
    fn mul_scales_single_line_columns() {
        assert_eq!(Offset::new(0, 2) * 3, Offset::new(0, 6));
        assert_eq!(Offset::new(1, 2) * 3, Offset::new(3, 2));
    }

    #[test]
    fn distance_same_line_subtracts_columns() {
        let d = Offset::distance(Offset::new(4, 2), Offset::new(4, 9));
        assert_eq!(d, Offset::new(0, 7));
    }

    #[test]
    fn distance_across_lines_keeps_end_column() {
        let d = Offset::distance(Offset::new(1, 8), Offset::new(3, 2));
        assert_eq!(d, Offset::new(2, 2));
    }

    #[test]
    fn span_end() {
        let span = Span::new(FileId(0), Offset::new(2, 4), Offset::new(0, 3));
        assert_eq!(span.end(), Offset::new(2, 7));
        let multi = Span::new(FileId(0), Offset::new(2, 4), Offset::new(1, 1));
        assert_eq!(multi.end(), Offset::new(3, 1));
    }

    #[test]
    fn file_id_serde_roundtrip() {
        let id = FileId(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: FileId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
