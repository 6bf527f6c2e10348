//! Source-map records and the VLQ mapping encoder.
//!
//! The builder accumulates (generated position, original position, source)
//! triples during emission and keeps a running cursor for the current
//! generated position. Output fragments are not always produced in final
//! order, so the builder supports an append/prepend composition algebra
//! that renumbers generated positions when a fragment is spliced in ahead
//! of already-recorded output.

use serde::Serialize;

use crate::types::{FileId, Offset, Span};

/// One (generated, original, source) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub file: FileId,
    pub origin: Offset,
    pub generated: Offset,
}

/// Accumulates mapping records during one emission pass.
///
/// Records are monotonically non-decreasing in generated position within a
/// single pass; `prepend` preserves this by renumbering before splicing.
#[derive(Debug, Clone, Default)]
pub struct SourceMapBuilder {
    mappings: Vec<Mapping>,
    /// The current generated position; advanced by every emitted fragment.
    position: Offset,
    add_openers: bool,
    add_closers: bool,
}

impl SourceMapBuilder {
    pub fn new(add_openers: bool, add_closers: bool) -> Self {
        SourceMapBuilder {
            mappings: Vec::new(),
            position: Offset::ZERO,
            add_openers,
            add_closers,
        }
    }

    pub fn position(&self) -> Offset {
        self.position
    }

    pub fn add_openers(&self) -> bool {
        self.add_openers
    }

    pub fn add_closers(&self) -> bool {
        self.add_closers
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Records a mapping from the start of [span] to the current
    /// generated position, if openers are enabled.
    pub fn add_open_mapping(&mut self, span: Span) {
        if self.add_openers && !span.file.is_synthetic() {
            self.mappings.push(Mapping {
                file: span.file,
                origin: span.start,
                generated: self.position,
            });
        }
    }

    /// Records a mapping from the end of [span] to the current generated
    /// position, if closers are enabled.
    pub fn add_close_mapping(&mut self, span: Span) {
        if self.add_closers && !span.file.is_synthetic() {
            self.mappings.push(Mapping {
                file: span.file,
                origin: span.end(),
                generated: self.position,
            });
        }
    }

    /// Advances the generated cursor by [delta] without recording anything.
    pub fn append(&mut self, delta: Offset) {
        self.position += delta;
    }

    /// Splices [other]'s records in after our own, renumbered to start at
    /// our current cursor, and advances the cursor past them.
    pub fn append_map(&mut self, other: &SourceMapBuilder) {
        let base = self.position;
        self.mappings.extend(other.mappings.iter().map(|m| Mapping {
            generated: base + m.generated,
            ..*m
        }));
        self.position = base + other.position;
    }

    /// Splices [other]'s records in ahead of our own.
    ///
    /// Every existing record moves down by the fragment's line count; a
    /// record still on generated line zero additionally moves right by the
    /// fragment's trailing column count. The cursor shifts the same way.
    pub fn prepend_map(&mut self, other: &SourceMapBuilder) {
        self.prepend(other.position);
        let mut spliced = other.mappings.clone();
        spliced.append(&mut self.mappings);
        self.mappings = spliced;
    }

    /// Shifts all generated positions as if text covering [delta] had been
    /// written before everything recorded so far.
    pub fn prepend(&mut self, delta: Offset) {
        for mapping in &mut self.mappings {
            mapping.generated = delta + mapping.generated;
        }
        self.position = delta + self.position;
    }

    /// Renders the VLQ `mappings` string.
    ///
    /// [remap] translates a `FileId` index into the index of that source
    /// within the payload's deduplicated `sources` array.
    pub fn render(&self, remap: &[u32]) -> String {
        let mut out = String::new();
        let mut line = 0u32;
        let mut prev_generated_column = 0i64;
        let mut prev_file = 0i64;
        let mut prev_origin_line = 0i64;
        let mut prev_origin_column = 0i64;
        let mut first = true;
        let mut line_has_mapping = false;

        for mapping in &self.mappings {
            while line < mapping.generated.line {
                out.push(';');
                line += 1;
                // Generated columns restart per line.
                prev_generated_column = 0;
                line_has_mapping = false;
            }

            let generated_column = i64::from(mapping.generated.column);
            let file = i64::from(remap[mapping.file.0]);
            let origin_line = i64::from(mapping.origin.line);
            let origin_column = i64::from(mapping.origin.column);

            if !first
                && generated_column == prev_generated_column
                && file == prev_file
                && origin_line == prev_origin_line
                && origin_column == prev_origin_column
            {
                continue;
            }

            if line_has_mapping {
                out.push(',');
            }
            encode_vlq(&mut out, generated_column - prev_generated_column);
            encode_vlq(&mut out, file - prev_file);
            encode_vlq(&mut out, origin_line - prev_origin_line);
            encode_vlq(&mut out, origin_column - prev_origin_column);

            prev_generated_column = generated_column;
            prev_file = file;
            prev_origin_line = origin_line;
            prev_origin_column = origin_column;
            first = false;
            line_has_mapping = true;
        }

        out
    }
}

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Appends one signed value in base64 VLQ form: the sign moves into the
/// lowest bit, then the magnitude is emitted in 5-bit groups from least
/// significant up, each non-final group carrying a continuation bit.
fn encode_vlq(out: &mut String, value: i64) {
    let mut encoded = if value < 0 {
        ((-value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (encoded & 0x1F) as u8;
        encoded >>= 5;
        if encoded > 0 {
            digit |= 0x20;
        }
        out.push(BASE64_CHARS[digit as usize] as char);
        if encoded == 0 {
            break;
        }
    }
}

/// The JSON shape of a rendered source map (version 3).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapPayload {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    /// Always empty in this design; kept for consumer compatibility.
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMapPayload {
    pub fn new(mappings: String, sources: Vec<String>) -> Self {
        SourceMapPayload {
            version: 3,
            file: None,
            source_root: None,
            sources,
            sources_content: None,
            names: Vec::new(),
            mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn span(file: usize, line: u32, column: u32) -> Span {
        Span::at(FileId(file), Offset::new(line, column))
    }

    #[test]
    fn cursor_advances_by_append() {
        let mut map = SourceMapBuilder::new(true, true);
        map.append(Offset::of("abc"));
        assert_eq!(map.position(), Offset::new(0, 3));
        map.append(Offset::of("de\nf"));
        assert_eq!(map.position(), Offset::new(1, 1));
    }

    #[test]
    fn openers_and_closers_honor_flags() {
        let mut map = SourceMapBuilder::new(true, false);
        let s = Span::new(FileId(0), Offset::new(3, 1), Offset::new(0, 4));
        map.add_open_mapping(s);
        map.add_close_mapping(s);
        assert_eq!(map.mappings().len(), 1);
        assert_eq!(map.mappings()[0].origin, Offset::new(3, 1));

        let mut map = SourceMapBuilder::new(false, true);
        map.add_open_mapping(s);
        map.add_close_mapping(s);
        assert_eq!(map.mappings().len(), 1);
        assert_eq!(map.mappings()[0].origin, Offset::new(3, 5));
    }

    #[test]
    fn synthetic_spans_are_not_recorded() {
        let mut map = SourceMapBuilder::new(true, true);
        map.add_open_mapping(Span::synthetic());
        assert!(map.mappings().is_empty());
    }

    #[test]
    fn prepend_shifts_lines_and_first_line_columns() {
        let mut map = SourceMapBuilder::new(true, true);
        map.add_open_mapping(span(0, 0, 0));
        map.append(Offset::of("ab"));
        map.add_open_mapping(span(0, 0, 2));
        map.append(Offset::of("\ncd"));
        map.add_open_mapping(span(0, 1, 2));

        // Fragment: one line break, trailing column 4.
        map.prepend(Offset::new(1, 4));

        let generated: Vec<Offset> =
            map.mappings().iter().map(|m| m.generated).collect();
        assert_eq!(
            generated,
            vec![Offset::new(1, 4), Offset::new(1, 6), Offset::new(2, 2)]
        );
        assert_eq!(map.position(), Offset::new(2, 2));
    }

    #[test]
    fn append_map_renumbers_into_place() {
        let mut head = SourceMapBuilder::new(true, true);
        head.append(Offset::of("x\nyy"));

        let mut tail = SourceMapBuilder::new(true, true);
        tail.add_open_mapping(span(0, 5, 0));
        tail.append(Offset::of("zz"));

        head.append_map(&tail);
        assert_eq!(head.mappings()[0].generated, Offset::new(1, 2));
        assert_eq!(head.position(), Offset::new(1, 4));
    }

    #[test]
    fn prepend_map_splices_records_in_front() {
        let mut body = SourceMapBuilder::new(true, true);
        body.add_open_mapping(span(0, 9, 9));
        body.append(Offset::of("body"));

        let mut header = SourceMapBuilder::new(true, true);
        header.add_open_mapping(span(1, 0, 0));
        header.append(Offset::of("head\n"));

        body.prepend_map(&header);
        assert_eq!(body.mappings().len(), 2);
        assert_eq!(body.mappings()[0].file, FileId(1));
        assert_eq!(body.mappings()[1].generated, Offset::new(1, 0));
        assert_eq!(body.position(), Offset::new(1, 4));
    }

    #[test]
    fn render_single_record() {
        let mut map = SourceMapBuilder::new(true, false);
        map.add_open_mapping(span(0, 0, 0));
        // genCol 0, src 0, origLine 0, origCol 0 -> "AAAA"
        assert_eq!(map.render(&[0]), "AAAA");
    }

    #[test]
    fn render_groups_lines_with_semicolons() {
        let mut map = SourceMapBuilder::new(true, false);
        map.add_open_mapping(span(0, 0, 0));
        map.append(Offset::of("ab\n"));
        map.add_open_mapping(span(0, 1, 0));
        map.append(Offset::of("cd\ncd"));
        map.add_open_mapping(span(0, 2, 1));

        let rendered = map.render(&[0]);
        assert_eq!(rendered.matches(';').count(), 2);
        assert_eq!(rendered, "AAAA;AACA;CACC");
    }

    #[test]
    fn render_separates_same_line_records_with_commas() {
        let mut map = SourceMapBuilder::new(true, false);
        map.add_open_mapping(span(0, 0, 0));
        map.append(Offset::of("abcd"));
        map.add_open_mapping(span(0, 0, 4));
        assert_eq!(map.render(&[0]), "AAAA,IAAI");
    }

    #[test]
    fn render_skips_duplicate_records() {
        let mut map = SourceMapBuilder::new(true, true);
        let s = span(0, 0, 0);
        map.add_open_mapping(s);
        map.add_close_mapping(s);
        assert_eq!(map.render(&[0]), "AAAA");
    }

    #[test]
    fn render_remaps_source_indices() {
        let mut map = SourceMapBuilder::new(true, false);
        map.add_open_mapping(span(2, 0, 0));
        // Source 2 is the first referenced source in the payload.
        assert_eq!(map.render(&[9, 9, 0]), "AAAA");
    }

    #[test]
    fn vlq_encodes_signs_and_continuations() {
        let mut out = String::new();
        encode_vlq(&mut out, 0);
        encode_vlq(&mut out, 1);
        encode_vlq(&mut out, -1);
        encode_vlq(&mut out, 16);
        encode_vlq(&mut out, 511);
        assert_eq!(out, "ACDgB+f");
    }

    #[test]
    fn payload_serializes_camel_case() {
        let mut payload = SourceMapPayload::new("AAAA".into(), vec!["a.scss".into()]);
        payload.sources_content = Some(vec!["a { b: c; }".into()]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["version"], 3);
        assert!(json.get("sourcesContent").is_some());
        assert!(json.get("sourceRoot").is_none());
        assert_eq!(json["names"].as_array().unwrap().len(), 0);
    }
}
