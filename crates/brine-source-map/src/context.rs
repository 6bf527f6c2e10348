//! The source arena.
//!
//! Every loaded file or string becomes one immutable [`Source`] owned by a
//! [`SourceContext`]. Spans reference sources by [`FileId`], so the tree
//! never holds direct references into source buffers; the arena is the
//! single owner and outlives the whole compilation.

use thiserror::Error;

use crate::file_info::FileInformation;
use crate::types::{FileId, Offset, Span};

/// Invalid UTF-8 found while registering a source. Detected up front so
/// the scanner never has to handle a broken encoding mid-stream.
#[derive(Debug, Error)]
#[error("invalid UTF-8 in {path} at byte offset {position}")]
pub struct EncodingError {
    pub path: String,
    pub position: usize,
}

/// One immutable loaded source: its text plus the paths it was loaded as.
#[derive(Debug)]
pub struct Source {
    /// The import specifier this source was requested as.
    pub import_path: String,
    /// The resolved absolute path, or the import path for string inputs.
    pub absolute_path: String,
    text: String,
    info: FileInformation,
}

impl Source {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text of the zero-based [line], for diagnostics.
    pub fn line_text(&self, line: usize) -> Option<&str> {
        self.info.line_text(&self.text, line)
    }

    pub fn line_count(&self) -> usize {
        self.info.line_count(&self.text)
    }

    pub fn offset_at(&self, byte_pos: usize) -> Offset {
        self.info.offset_at(&self.text, byte_pos)
    }
}

/// Arena of all sources loaded for one compilation.
#[derive(Debug, Default)]
pub struct SourceContext {
    sources: Vec<Source>,
}

impl SourceContext {
    pub fn new() -> Self {
        SourceContext::default()
    }

    /// Registers a source from raw bytes, validating the encoding.
    pub fn add_bytes(
        &mut self,
        bytes: Vec<u8>,
        import_path: impl Into<String>,
        absolute_path: impl Into<String>,
    ) -> Result<FileId, EncodingError> {
        let import_path = import_path.into();
        let text = String::from_utf8(bytes).map_err(|e| EncodingError {
            path: import_path.clone(),
            position: e.utf8_error().valid_up_to(),
        })?;
        Ok(self.add_string(text, import_path, absolute_path))
    }

    /// Registers an already-validated source string.
    pub fn add_string(
        &mut self,
        text: impl Into<String>,
        import_path: impl Into<String>,
        absolute_path: impl Into<String>,
    ) -> FileId {
        let id = FileId(self.sources.len());
        self.sources.push(Source {
            import_path: import_path.into(),
            absolute_path: absolute_path.into(),
            text: text.into(),
            info: FileInformation::new(),
        });
        id
    }

    pub fn get(&self, id: FileId) -> Option<&Source> {
        if id.is_synthetic() {
            return None;
        }
        self.sources.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileId, &Source)> {
        self.sources
            .iter()
            .enumerate()
            .map(|(i, s)| (FileId(i), s))
    }

    /// Renders the source line under [span] with a caret/underline marker,
    /// for error reports.
    pub fn snippet(&self, span: Span) -> Option<String> {
        let source = self.get(span.file)?;
        let line = source.line_text(span.start.line as usize)?;
        let width = if span.length.line == 0 {
            (span.length.column as usize).max(1)
        } else {
            line.chars().count().saturating_sub(span.start.column as usize).max(1)
        };
        let mut out = String::new();
        out.push_str(line);
        out.push('\n');
        out.extend(std::iter::repeat_n(' ', span.start.column as usize));
        out.extend(std::iter::repeat_n('^', width));
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_bytes_rejects_invalid_utf8() {
        let mut ctx = SourceContext::new();
        let err = ctx
            .add_bytes(vec![b'a', 0xFF, b'b'], "bad.scss", "/tmp/bad.scss")
            .unwrap_err();
        assert_eq!(err.position, 1);
        assert!(err.to_string().contains("bad.scss"));
    }

    #[test]
    fn sources_get_sequential_ids() {
        let mut ctx = SourceContext::new();
        let a = ctx.add_string("a {}", "a.scss", "/a.scss");
        let b = ctx.add_string("b {}", "b.scss", "/b.scss");
        assert_eq!(a, FileId(0));
        assert_eq!(b, FileId(1));
        assert_eq!(ctx.get(a).unwrap().text(), "a {}");
    }

    #[test]
    fn synthetic_id_resolves_to_nothing() {
        let ctx = SourceContext::new();
        assert!(ctx.get(FileId::SYNTHETIC).is_none());
    }

    #[test]
    fn snippet_underlines_span() {
        let mut ctx = SourceContext::new();
        let id = ctx.add_string("a { color red; }", "a.scss", "/a.scss");
        let span = Span::new(id, Offset::new(0, 4), Offset::new(0, 5));
        let snippet = ctx.snippet(span).unwrap();
        assert_eq!(snippet, "a { color red; }\n    ^^^^^");
    }
}
