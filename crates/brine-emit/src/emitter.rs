//! The low-level scheduling emitter.
//!
//! Whitespace and statement delimiters are never written eagerly: they are
//! *scheduled* and flushed the next time real content arrives. That lets a
//! single serializer drive every output style, since a scheduled linefeed
//! simply never fires under the compressed style, and a trailing scheduled
//! semicolon can be dropped at the end of the document.
//!
//! The emitter also owns the optional [`SourceMapBuilder`]: every write
//! advances the generated-position cursor, and tokens record open/close
//! mappings around their text.

use brine_source_map::{Offset, SourceMapBuilder, Span};

use crate::style::{OutputOptions, OutputStyle};

/// Rendered text plus the source map records that describe it.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    pub text: String,
    pub map: Option<SourceMapBuilder>,
}

#[derive(Debug, Clone)]
pub struct Emitter {
    buffer: String,
    srcmap: Option<SourceMapBuilder>,
    options: OutputOptions,
    pub(crate) indentation: usize,
    scheduled_space: bool,
    scheduled_linefeed: usize,
    scheduled_delimiter: bool,
    /// Suppresses the optional space immediately after an opening paren.
    pub(crate) parentheses_opened: bool,
    pub(crate) in_custom_property: bool,
    pub(crate) in_declaration: bool,
    pub(crate) in_comma_array: bool,
}

impl Emitter {
    pub fn new(options: OutputOptions, srcmap: Option<SourceMapBuilder>) -> Self {
        Emitter {
            buffer: String::new(),
            srcmap,
            options,
            indentation: 0,
            scheduled_space: false,
            scheduled_linefeed: 0,
            scheduled_delimiter: false,
            parentheses_opened: false,
            in_custom_property: false,
            in_declaration: false,
            in_comma_array: false,
        }
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn has_source_map(&self) -> bool {
        self.srcmap.is_some()
    }

    /// A fresh builder with the same mapping flags, for rendering a
    /// fragment that will later be spliced into this emitter's output.
    pub fn sibling_source_map(&self) -> Option<SourceMapBuilder> {
        self.srcmap
            .as_ref()
            .map(|map| SourceMapBuilder::new(map.add_openers(), map.add_closers()))
    }

    pub fn finish(self) -> OutputBuffer {
        OutputBuffer {
            text: self.buffer,
            map: self.srcmap,
        }
    }

    fn last_char_is_whitespace(&self) -> bool {
        matches!(
            self.buffer.as_bytes().last(),
            Some(b' ' | b'\t' | b'\n' | b'\r')
        )
    }

    /// Writes text without flushing schedules. The source-map cursor still
    /// advances so mappings recorded afterwards stay accurate.
    pub(crate) fn write_str(&mut self, text: &str) {
        self.buffer.push_str(text);
        if let Some(map) = &mut self.srcmap {
            map.append(Offset::of(text));
        }
    }

    fn write_char(&mut self, ch: char) {
        self.buffer.push(ch);
        if let Some(map) = &mut self.srcmap {
            let mut delta = Offset::ZERO;
            let mut bytes = [0u8; 4];
            for byte in ch.encode_utf8(&mut bytes).bytes() {
                delta.advance(byte);
            }
            map.append(delta);
        }
    }

    fn map_open(&mut self, span: Span) {
        if let Some(map) = &mut self.srcmap {
            map.add_open_mapping(span);
        }
    }

    fn map_close(&mut self, span: Span) {
        if let Some(map) = &mut self.srcmap {
            map.add_close_mapping(span);
        }
    }

    /// Writes out whatever whitespace and delimiters were scheduled, in
    /// document order: the statement delimiter always lands before the
    /// whitespace that follows it.
    fn flush_schedules(&mut self) {
        if self.scheduled_linefeed > 0 {
            self.scheduled_space = false;
            if self.scheduled_delimiter {
                self.scheduled_delimiter = false;
                self.write_char(';');
            }
            let count = self.scheduled_linefeed;
            self.scheduled_linefeed = 0;
            let linefeed = self.options.linefeed.clone();
            for _ in 0..count {
                self.write_str(&linefeed);
            }
        } else if self.scheduled_space {
            self.scheduled_space = false;
            if self.scheduled_delimiter {
                self.scheduled_delimiter = false;
                self.write_char(';');
            }
            self.write_char(' ');
        } else if self.scheduled_delimiter {
            self.scheduled_delimiter = false;
            self.write_char(';');
        }
    }

    /// Flushes remaining schedules at the end of a pass. When [final_pass]
    /// is set under the compressed style the trailing semicolon is dropped,
    /// and pending double linefeeds collapse to one.
    pub fn finalize(&mut self, final_pass: bool) {
        self.scheduled_space = false;
        if final_pass && self.options.style.is_compressed() {
            self.scheduled_delimiter = false;
        }
        if self.scheduled_linefeed > 0 {
            self.scheduled_linefeed = 1;
        }
        self.flush_schedules();
    }

    pub fn append_string(&mut self, text: &str) {
        self.flush_schedules();
        self.write_str(text);
        self.parentheses_opened = false;
    }

    pub fn append_char(&mut self, ch: char) {
        self.flush_schedules();
        self.write_char(ch);
        self.parentheses_opened = false;
    }

    /// Appends text that corresponds to a source span, recording open and
    /// close mappings around it.
    pub fn append_token(&mut self, text: &str, span: Span) {
        self.flush_schedules();
        self.map_open(span);
        self.write_str(text);
        self.map_close(span);
        self.parentheses_opened = false;
    }

    pub fn append_indentation(&mut self) {
        if self.options.style.is_compressed() || self.options.style.is_compact() {
            return;
        }
        if self.in_declaration && self.in_comma_array {
            return;
        }
        if self.scheduled_linefeed > 0 && self.indentation > 0 {
            self.scheduled_linefeed = 1;
        }
        let indent = self.options.indent.repeat(self.indentation);
        self.append_string(&indent);
    }

    /// Schedules the semicolon that ends a declaration or childless
    /// at-rule, plus the whitespace the current style puts after it.
    pub fn append_delimiter(&mut self) {
        self.scheduled_delimiter = true;
        if self.options.style.is_compact() {
            if self.indentation == 0 {
                self.append_mandatory_linefeed();
            } else {
                self.append_mandatory_space();
            }
        } else if !self.options.style.is_compressed() {
            self.append_optional_linefeed();
        }
    }

    pub fn append_comma_separator(&mut self) {
        self.scheduled_space = false;
        self.append_string(",");
        self.append_optional_space();
    }

    pub fn append_colon_separator(&mut self) {
        self.scheduled_space = false;
        self.append_string(":");
        if !self.in_custom_property {
            self.append_optional_space();
        }
    }

    pub fn append_mandatory_space(&mut self) {
        if self.buffer.is_empty() || !self.last_char_is_whitespace() {
            self.scheduled_space = true;
        }
    }

    pub fn append_optional_space(&mut self) {
        if self.options.style.is_compressed() || self.buffer.is_empty() {
            return;
        }
        if self.parentheses_opened {
            return;
        }
        if self.scheduled_delimiter || !self.last_char_is_whitespace() {
            self.append_mandatory_space();
        }
    }

    pub fn append_mandatory_linefeed(&mut self) {
        if !self.options.style.is_compressed() {
            self.scheduled_linefeed = 1;
            self.scheduled_space = false;
        }
    }

    pub fn append_optional_linefeed(&mut self) {
        if self.in_declaration && self.in_comma_array {
            return;
        }
        if self.options.style.is_compact() {
            self.append_mandatory_space();
        } else {
            self.append_mandatory_linefeed();
        }
    }

    /// A linefeed the compact style inserts between the queries of a media
    /// prelude and similar multi-part headers. A no-op elsewhere.
    pub fn append_special_linefeed(&mut self) {
        if self.options.style.is_compact() {
            self.append_mandatory_linefeed();
            let indent = self.options.indent.repeat(self.indentation);
            self.append_string(&indent);
        }
    }

    pub fn append_scope_opener(&mut self, span: Option<Span>) {
        self.scheduled_linefeed = 0;
        self.append_optional_space();
        self.flush_schedules();
        if let Some(span) = span {
            self.map_open(span);
        }
        self.write_str("{");
        self.append_optional_linefeed();
        self.indentation += 1;
    }

    pub fn append_scope_closer(&mut self, span: Option<Span>) {
        self.indentation -= 1;
        self.scheduled_linefeed = 0;
        if self.buffer.as_bytes().last() == Some(&b'{') {
            self.scheduled_space = false;
        } else if self.options.style.is_compressed() {
            self.scheduled_delimiter = false;
        } else if self.options.style == OutputStyle::Expanded {
            self.append_optional_linefeed();
            self.append_indentation();
        } else {
            self.append_optional_space();
        }
        self.append_string("}");
        if let Some(span) = span {
            self.map_close(span);
        }
        self.append_optional_linefeed();
        if self.indentation == 0 && !self.options.style.is_compressed() {
            self.scheduled_linefeed = 2;
        }
    }

    /// Splices an already-rendered fragment in front of everything written
    /// so far, shifting the recorded mappings to match.
    pub fn prepend_output(&mut self, other: &OutputBuffer) {
        if let Some(map) = &mut self.srcmap {
            match &other.map {
                Some(other_map) => map.prepend_map(other_map),
                None => map.prepend(Offset::of(&other.text)),
            }
        }
        self.buffer.insert_str(0, &other.text);
    }

    /// Prepends plain text. The UTF-8 byte order mark is invisible to CSS
    /// consumers and is spliced in without shifting any mappings.
    pub fn prepend_string(&mut self, text: &str) {
        if text != "\u{feff}" {
            if let Some(map) = &mut self.srcmap {
                map.prepend(Offset::of(text));
            }
        }
        self.buffer.insert_str(0, text);
    }
}

#[cfg(test)]
mod tests {
    use brine_source_map::{FileId, Offset, SourceMapBuilder, Span};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::style::{OutputOptions, OutputStyle};

    fn span(line: u32, column: u32) -> Span {
        Span::new(FileId(0), Offset::new(line, column), Offset::new(0, 1))
    }

    fn render_rule(style: OutputStyle) -> String {
        let mut e = Emitter::new(OutputOptions::with_style(style), None);
        e.append_token("a", span(0, 0));
        e.append_scope_opener(Some(span(0, 2)));
        e.append_indentation();
        e.append_token("color", span(0, 4));
        e.append_colon_separator();
        e.append_token("red", span(0, 11));
        e.append_delimiter();
        e.append_scope_closer(Some(span(0, 16)));
        e.finalize(true);
        e.finish().text
    }

    #[test]
    fn expanded_layout() {
        assert_eq!(render_rule(OutputStyle::Expanded), "a {\n  color: red;\n}\n");
    }

    #[test]
    fn nested_layout_closes_on_the_last_line() {
        assert_eq!(render_rule(OutputStyle::Nested), "a {\n  color: red; }\n");
    }

    #[test]
    fn compact_layout_is_one_line_per_rule() {
        assert_eq!(render_rule(OutputStyle::Compact), "a { color: red; }\n");
    }

    #[test]
    fn compressed_drops_all_optional_output() {
        assert_eq!(render_rule(OutputStyle::Compressed), "a{color:red}");
    }

    #[test]
    fn root_rules_are_separated_by_a_blank_line() {
        let mut e = Emitter::new(OutputOptions::default(), None);
        for selector in ["a", "b"] {
            e.append_indentation();
            e.append_string(selector);
            e.append_scope_opener(None);
            e.append_indentation();
            e.append_string("x");
            e.append_colon_separator();
            e.append_string("y");
            e.append_delimiter();
            e.append_scope_closer(None);
        }
        e.finalize(true);
        assert_eq!(e.finish().text, "a {\n  x: y;\n}\n\nb {\n  x: y;\n}\n");
    }

    #[test]
    fn trailing_delimiter_survives_unless_compressed_and_final() {
        let mut e = Emitter::new(OutputOptions::with_style(OutputStyle::Compressed), None);
        e.append_string("x");
        e.append_delimiter();
        e.finalize(false);
        assert_eq!(e.buffer(), "x;");

        let mut e = Emitter::new(OutputOptions::with_style(OutputStyle::Compressed), None);
        e.append_string("x");
        e.append_delimiter();
        e.finalize(true);
        assert_eq!(e.buffer(), "x");
    }

    #[test]
    fn optional_space_is_suppressed_after_open_paren() {
        let mut e = Emitter::new(OutputOptions::default(), None);
        e.append_string("(");
        e.parentheses_opened = true;
        e.append_optional_space();
        e.append_string("x");
        assert_eq!(e.buffer(), "(x");
    }

    #[test]
    fn comma_lists_in_declarations_stay_on_one_line() {
        let mut e = Emitter::new(OutputOptions::default(), None);
        e.in_declaration = true;
        e.in_comma_array = true;
        e.append_string("a");
        e.append_optional_linefeed();
        e.append_indentation();
        e.append_string("b");
        assert_eq!(e.buffer(), "ab");
    }

    #[test]
    fn tokens_record_open_and_close_mappings() {
        let map = SourceMapBuilder::new(true, true);
        let mut e = Emitter::new(OutputOptions::default(), Some(map));
        e.append_token("a", span(3, 7));
        e.append_scope_opener(None);
        e.finalize(true);
        let out = e.finish();
        let map = out.map.as_ref().unwrap();
        assert_eq!(map.mappings().len(), 2);
        assert_eq!(map.mappings()[0].origin, Offset::new(3, 7));
        assert_eq!(map.mappings()[0].generated, Offset::new(0, 0));
        assert_eq!(map.mappings()[1].origin, Offset::new(3, 8));
        assert_eq!(map.mappings()[1].generated, Offset::new(0, 1));
    }

    #[test]
    fn prepending_shifts_existing_mappings() {
        let map = SourceMapBuilder::new(true, false);
        let mut e = Emitter::new(OutputOptions::default(), Some(map));
        e.append_token("a", span(0, 0));
        e.prepend_string("@charset \"UTF-8\";\n");
        let out = e.finish();
        assert_eq!(out.text, "@charset \"UTF-8\";\na");
        let map = out.map.as_ref().unwrap();
        assert_eq!(map.mappings()[0].generated, Offset::new(1, 0));
    }

    #[test]
    fn byte_order_mark_does_not_shift_mappings() {
        let map = SourceMapBuilder::new(true, false);
        let mut e = Emitter::new(OutputOptions::default(), Some(map));
        e.append_token("a", span(0, 0));
        e.prepend_string("\u{feff}");
        let out = e.finish();
        assert!(out.text.starts_with('\u{feff}'));
        let map = out.map.as_ref().unwrap();
        assert_eq!(map.mappings()[0].generated, Offset::new(0, 0));
    }

    #[test]
    fn prepending_a_rendered_fragment_splices_its_mappings() {
        let map = SourceMapBuilder::new(true, false);
        let mut body = Emitter::new(OutputOptions::default(), Some(map));
        body.append_token("a", span(5, 0));

        let map = SourceMapBuilder::new(true, false);
        let mut header = Emitter::new(OutputOptions::default(), Some(map));
        header.append_token("@import \"x\";", span(9, 0));
        header.append_string("\n");

        body.prepend_output(&header.finish());
        let out = body.finish();
        assert_eq!(out.text, "@import \"x\";\na");
        let map = out.map.as_ref().unwrap();
        assert_eq!(map.mappings().len(), 2);
        assert_eq!(map.mappings()[0].origin, Offset::new(9, 0));
        assert_eq!(map.mappings()[1].generated, Offset::new(1, 0));
    }
}
