//! Line table for mapping offsets back to source text.
//!
//! The table of line-start byte positions is built lazily, on the first
//! request that needs it (typically an error report), and cached for the
//! lifetime of the source.

use memchr::memchr_iter;
use once_cell::sync::OnceCell;

use crate::types::Offset;

/// Lazily-computed line information for one source buffer.
#[derive(Debug, Default)]
pub struct FileInformation {
    /// Byte positions of the first character of each line. Always
    /// contains at least one entry (0) once built.
    line_starts: OnceCell<Vec<usize>>,
}

impl FileInformation {
    pub fn new() -> Self {
        FileInformation::default()
    }

    fn line_starts(&self, text: &str) -> &[usize] {
        self.line_starts.get_or_init(|| {
            let mut starts = vec![0];
            starts.extend(memchr_iter(b'\n', text.as_bytes()).map(|pos| pos + 1));
            starts
        })
    }

    /// The number of lines in [text], counting a trailing partial line.
    pub fn line_count(&self, text: &str) -> usize {
        self.line_starts(text).len()
    }

    /// The text of the zero-based [line], without its trailing newline.
    pub fn line_text<'a>(&self, text: &'a str, line: usize) -> Option<&'a str> {
        let starts = self.line_starts(text);
        let start = *starts.get(line)?;
        let end = starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(text.len());
        Some(text[start..end].trim_end_matches('\r'))
    }

    /// Converts a byte position into a line/column offset. Positions past
    /// the end of [text] clamp to the final offset.
    pub fn offset_at(&self, text: &str, byte_pos: usize) -> Offset {
        let byte_pos = byte_pos.min(text.len());
        let starts = self.line_starts(text);
        let line = match starts.binary_search(&byte_pos) {
            Ok(exact) => exact,
            Err(insert) => insert - 1,
        };
        let column = text[starts[line]..byte_pos].chars().count() as u32;
        Offset::new(line as u32, column)
    }
}
