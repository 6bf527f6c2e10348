//! Lexical helpers shared by every production: whitespace and comment
//! scanning, identifiers, escapes, strings, and the permissive raw-value
//! consumers used for selectors and unknown at-rule preludes.

use brine_source_map::Offset;

use crate::character::{
    as_hex, hex_char_for, is_digit, is_hex, is_name, is_name_start, is_newline, is_space_or_tab,
    is_whitespace, opposite_bracket, to_lower_case,
};
use crate::error::{ParseError, ParseResult};
use crate::interpolation::{Interpolation, InterpolationBuffer, InterpolationPart};

use super::StylesheetParser;

fn code_is_name_start(value: u32) -> bool {
    value == u32::from(b'_')
        || value > 0x7F
        || u8::try_from(value).is_ok_and(|b| b.is_ascii_alphabetic())
}

fn code_is_name(value: u32) -> bool {
    code_is_name_start(value) || value == u32::from(b'-') || code_is_digit(value)
}

fn code_is_digit(value: u32) -> bool {
    u8::try_from(value).is_ok_and(|b| b.is_ascii_digit())
}

/// Re-serializes a parsed quoted string into [buffer], quoting with `"`
/// and escaping as needed, so that raw-value consumers can pass strings
/// through verbatim.
pub(crate) fn add_quoted_string(buffer: &mut InterpolationBuffer, text: &Interpolation) {
    buffer.write_char('"');
    for part in &text.parts {
        match part {
            InterpolationPart::Text(t) => {
                for c in t.chars() {
                    if c == '"' || c == '\\' {
                        buffer.write_char('\\');
                    }
                    buffer.write_char(c);
                }
            }
            InterpolationPart::Expression(e) => buffer.add_expression(e.clone()),
        }
    }
    buffer.write_char('"');
}

impl<'a> StylesheetParser<'a> {
    /// Consumes whitespace and comments. In the indented syntax newlines
    /// are structural and are never consumed here.
    pub(crate) fn scan_whitespace(&mut self) -> ParseResult<()> {
        loop {
            self.scan_whitespace_without_comments();
            if !self.scan_comment()? {
                return Ok(());
            }
        }
    }

    pub(crate) fn scan_whitespace_without_comments(&mut self) {
        while let Some(byte) = self.scanner.peek() {
            let skip = if self.is_indented() {
                is_space_or_tab(byte)
            } else {
                is_whitespace(byte)
            };
            if !skip {
                break;
            }
            self.scanner.scan_char(byte);
        }
    }

    pub(crate) fn scan_spaces(&mut self) {
        while let Some(byte) = self.scanner.peek() {
            if !is_space_or_tab(byte) {
                break;
            }
            self.scanner.scan_char(byte);
        }
    }

    /// Consumes a single comment if one starts at the cursor.
    pub(crate) fn scan_comment(&mut self) -> ParseResult<bool> {
        if self.scanner.peek() != Some(b'/') {
            return Ok(false);
        }
        match self.scanner.peek_at(1) {
            Some(b'/') => {
                self.skip_silent_comment()?;
                Ok(true)
            }
            Some(b'*') => {
                self.skip_loud_comment()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub(crate) fn skip_silent_comment(&mut self) -> ParseResult<()> {
        let start = self.scanner.offset;
        self.scanner.expect("//", None)?;
        while let Some(byte) = self.scanner.peek() {
            if is_newline(byte) {
                break;
            }
            self.scanner.scan_char(byte);
        }
        if self.is_plain_css() {
            return self.error(
                "Silent comments aren't allowed in plain CSS.",
                self.scanner.relevant_span_from(start),
            );
        }
        Ok(())
    }

    pub(crate) fn skip_loud_comment(&mut self) -> ParseResult<()> {
        self.scanner.expect("/*", None)?;
        loop {
            match self.scanner.peek() {
                None => return Err(self.scanner.fail("\"*/\"")),
                // Newlines are structural in the indented syntax, so a
                // comment consumed as whitespace must close on its line.
                Some(byte) if is_newline(byte) && self.is_indented() => {
                    return Err(self.scanner.fail("\"*/\""));
                }
                Some(b'*') => {
                    self.scanner.scan_char(b'*');
                    if self.scanner.scan_char(b'/') {
                        return Ok(());
                    }
                }
                Some(byte) => {
                    self.scanner.scan_char(byte);
                }
            }
        }
    }

    /// Runs [consumer] and returns the raw source text it consumed.
    pub(crate) fn raw_text<T>(
        &mut self,
        consumer: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<String> {
        let start = self.scanner.position();
        consumer(self)?;
        Ok(self.scanner.substring(start).to_string())
    }

    // Escapes

    /// Consumes a backslash escape and returns the code point it denotes.
    pub(crate) fn read_escape_code(&mut self) -> ParseResult<u32> {
        self.scanner.expect_char(b'\\', None)?;
        match self.scanner.peek() {
            None => Err(self.scanner.fail("escape sequence")),
            Some(byte) if is_newline(byte) => {
                self.error("Expected escape sequence.", self.scanner.raw_span())
            }
            Some(byte) if is_hex(byte) => {
                let mut value = 0u32;
                for _ in 0..6 {
                    match self.scanner.peek() {
                        Some(h) if is_hex(h) => {
                            self.scanner.scan_char(h);
                            value = value * 16 + as_hex(h);
                        }
                        _ => break,
                    }
                }
                // A single whitespace character may terminate the escape.
                if let Some(w) = self.scanner.peek() {
                    if is_whitespace(w) {
                        self.scanner.scan_char(w);
                    }
                }
                Ok(value)
            }
            Some(_) => Ok(u32::from(self.scanner.read_utf8_char()?)),
        }
    }

    /// Consumes an escape and writes its canonical identifier spelling
    /// into [buffer]: the bare character when it's a name character,
    /// otherwise a normalized hex escape.
    pub(crate) fn read_escape(
        &mut self,
        buffer: &mut String,
        identifier_start: bool,
    ) -> ParseResult<()> {
        let start = self.scanner.offset;
        let value = self.read_escape_code()?;
        let keeps_char = if identifier_start {
            code_is_name_start(value)
        } else {
            code_is_name(value)
        };
        if keeps_char {
            match char::from_u32(value) {
                Some(c) => buffer.push(c),
                None => {
                    return self.error(
                        "Invalid Unicode code point.",
                        self.scanner.raw_span_from(start),
                    )
                }
            }
        } else if value <= 0x1F || value == 0x7F || (identifier_start && code_is_digit(value)) {
            buffer.push('\\');
            if value > 0xF {
                buffer.push(hex_char_for(value >> 4));
            }
            buffer.push(hex_char_for(value & 0xF));
            buffer.push(' ');
        } else {
            buffer.push('\\');
            match char::from_u32(value) {
                Some(c) => buffer.push(c),
                None => {
                    return self.error(
                        "Invalid Unicode code point.",
                        self.scanner.raw_span_from(start),
                    )
                }
            }
        }
        Ok(())
    }

    /// Consumes an escape and returns it verbatim as written.
    pub(crate) fn raw_escape(&mut self) -> ParseResult<String> {
        let start = self.scanner.position();
        let mut scratch = String::new();
        self.read_escape(&mut scratch, false)?;
        Ok(self.scanner.substring(start).to_string())
    }

    // Identifiers

    /// Consumes [letter] (a lowercase ASCII byte) either literally (in
    /// either case) or as an escape spelling it.
    pub(crate) fn scan_ident_char(
        &mut self,
        letter: u8,
        case_sensitive: bool,
    ) -> ParseResult<bool> {
        let matches = |actual: u8| {
            if case_sensitive {
                actual == letter
            } else {
                to_lower_case(actual) == to_lower_case(letter)
            }
        };
        match self.scanner.peek() {
            Some(next) if next < 0x80 && matches(next) => {
                self.scanner.scan_char(next);
                Ok(true)
            }
            Some(b'\\') => {
                let state = self.scanner.state();
                let value = self.read_escape_code()?;
                if u8::try_from(value).is_ok_and(matches) {
                    Ok(true)
                } else {
                    self.scanner.backtrack(state);
                    Ok(false)
                }
            }
            _ => Ok(false),
        }
    }

    /// Consumes [text] as a complete identifier, ignoring ASCII case and
    /// allowing escape spellings; never consumes a prefix of a longer
    /// identifier.
    pub(crate) fn scan_identifier(&mut self, text: &str) -> ParseResult<bool> {
        self.scan_identifier_with(text, false)
    }

    pub(crate) fn scan_identifier_with(
        &mut self,
        text: &str,
        case_sensitive: bool,
    ) -> ParseResult<bool> {
        if !self.looking_at_identifier(0) {
            return Ok(false);
        }
        let state = self.scanner.state();
        for byte in text.bytes() {
            if self.scan_ident_char(byte, case_sensitive)? {
                continue;
            }
            self.scanner.backtrack(state);
            return Ok(false);
        }
        if !self.looking_at_identifier_body() {
            return Ok(true);
        }
        self.scanner.backtrack(state);
        Ok(false)
    }

    pub(crate) fn expect_identifier(&mut self, text: &str, name: Option<&str>) -> ParseResult<()> {
        let start = self.scanner.offset;
        let label = match name {
            Some(name) => name.to_string(),
            None => format!("\"{text}\""),
        };
        for byte in text.bytes() {
            if self.scan_ident_char(byte, false)? {
                continue;
            }
            return Err(ParseError::expected(&label, self.scanner.span_at(start)));
        }
        if !self.looking_at_identifier_body() {
            return Ok(());
        }
        Err(ParseError::expected(&label, self.scanner.span_at(start)))
    }

    /// Consumes a plain CSS identifier, resolving escapes.
    pub(crate) fn read_identifier(&mut self) -> ParseResult<String> {
        self.read_identifier_impl(false)
    }

    /// Like [`Self::read_identifier`], but stops before a `-` that is
    /// followed by a digit or a dot, so `1px-2px` stays a subtraction
    /// rather than becoming the unit `px-2px`.
    pub(crate) fn read_identifier_as_unit(&mut self) -> ParseResult<String> {
        self.read_identifier_impl(true)
    }

    fn read_identifier_impl(&mut self, unit: bool) -> ParseResult<String> {
        let mut text = String::new();
        if self.scanner.scan_char(b'-') {
            text.push('-');
            if self.scanner.scan_char(b'-') {
                text.push('-');
                self.read_identifier_body(&mut text, unit)?;
                return Ok(text);
            }
        }
        match self.scanner.peek() {
            None => return Err(self.scanner.fail("identifier")),
            Some(b'\\') => self.read_escape(&mut text, true)?,
            Some(byte) if is_name_start(byte) => text.push(self.scanner.read_utf8_char()?),
            Some(_) => return Err(self.scanner.fail("identifier")),
        }
        self.read_identifier_body(&mut text, unit)?;
        Ok(text)
    }

    fn read_identifier_body(&mut self, text: &mut String, unit: bool) -> ParseResult<()> {
        while let Some(next) = self.scanner.peek() {
            if unit && next == b'-' {
                match self.scanner.peek_at(1) {
                    Some(second) if second == b'.' || is_digit(second) => break,
                    _ => {
                        self.scanner.scan_char(b'-');
                        text.push('-');
                    }
                }
            } else if is_name(next) {
                text.push(self.scanner.read_utf8_char()?);
            } else if next == b'\\' {
                self.read_escape(text, false)?;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Consumes `$name`, normalizing `_` to `-` as identifiers are
    /// compared with the two interchangeable.
    pub(crate) fn read_variable_name(&mut self) -> ParseResult<String> {
        self.scanner.expect_char(b'$', None)?;
        Ok(self.read_identifier()?.replace('_', "-"))
    }

    /// Consumes a natural number as a double.
    pub(crate) fn read_natural_number(&mut self) -> ParseResult<f64> {
        let first = match self.scanner.peek() {
            Some(byte) if is_digit(byte) => byte,
            _ => return Err(self.scanner.fail("digit")),
        };
        self.scanner.scan_char(first);
        let mut number = f64::from(first - b'0');
        while let Some(byte) = self.scanner.peek() {
            if !is_digit(byte) {
                break;
            }
            self.scanner.scan_char(byte);
            number = number * 10.0 + f64::from(byte - b'0');
        }
        Ok(number)
    }

    // Interpolated identifiers

    pub(crate) fn read_interpolated_identifier(&mut self) -> ParseResult<Interpolation> {
        let start = self.scanner.offset;
        let mut buffer = InterpolationBuffer::new();
        if self.scanner.scan_char(b'-') {
            buffer.write_char('-');
            if self.scanner.scan_char(b'-') {
                buffer.write_char('-');
                self.read_interpolated_identifier_body(&mut buffer)?;
                return Ok(buffer.into_interpolation(self.scanner.raw_span_from(start)));
            }
        }
        match self.scanner.peek() {
            None => return Err(self.scanner.fail("identifier")),
            Some(b'\\') => {
                let mut text = String::new();
                self.read_escape(&mut text, true)?;
                buffer.write_str(&text);
            }
            Some(b'#') if self.scanner.peek_at(1) == Some(b'{') => {
                let expression = self.read_single_interpolation()?;
                buffer.add_expression(expression);
            }
            Some(byte) if is_name_start(byte) => {
                buffer.write_char(self.scanner.read_utf8_char()?);
            }
            Some(_) => return Err(self.scanner.fail("identifier")),
        }
        self.read_interpolated_identifier_body(&mut buffer)?;
        Ok(buffer.into_interpolation(self.scanner.raw_span_from(start)))
    }

    fn read_interpolated_identifier_body(
        &mut self,
        buffer: &mut InterpolationBuffer,
    ) -> ParseResult<()> {
        loop {
            match self.scanner.peek() {
                Some(byte) if is_name(byte) => {
                    buffer.write_char(self.scanner.read_utf8_char()?);
                }
                Some(b'\\') => {
                    let mut text = String::new();
                    self.read_escape(&mut text, false)?;
                    buffer.write_str(&text);
                }
                Some(b'#') if self.scanner.peek_at(1) == Some(b'{') => {
                    let expression = self.read_single_interpolation()?;
                    buffer.add_expression(expression);
                }
                _ => return Ok(()),
            }
        }
    }

    /// Consumes a single `#{expression}`.
    pub(crate) fn read_single_interpolation(&mut self) -> ParseResult<crate::ast::Expression> {
        let start = self.scanner.offset;
        self.scanner.expect("#{", None)?;
        self.scan_whitespace()?;
        let expression = self.read_expression()?;
        self.scanner.expect_char(b'}', None)?;
        if self.is_plain_css() {
            return self.error(
                "Interpolation isn't allowed in plain CSS.",
                self.scanner.raw_span_from(start),
            );
        }
        Ok(expression)
    }

    // Strings

    /// Consumes a quoted string without interpolation, resolving escapes.
    pub(crate) fn read_string(&mut self) -> ParseResult<String> {
        let quote = match self.scanner.peek() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return Err(self.scanner.fail("string")),
        };
        self.scanner.scan_char(quote);
        let quote_name = format!("\"{}\"", quote as char);
        let mut buffer = String::new();
        loop {
            match self.scanner.peek() {
                Some(byte) if byte == quote => {
                    self.scanner.scan_char(byte);
                    return Ok(buffer);
                }
                None => return Err(self.scanner.fail(&quote_name)),
                Some(byte) if is_newline(byte) => return Err(self.scanner.fail(&quote_name)),
                Some(b'\\') => match self.scanner.peek_at(1) {
                    Some(second) if is_newline(second) => {
                        self.scanner.scan_char(b'\\');
                        self.scanner.scan_char(second);
                        if second == b'\r' {
                            self.scanner.scan_char(b'\n');
                        }
                    }
                    _ => {
                        let value = self.read_escape_code()?;
                        match char::from_u32(value) {
                            Some(c) => buffer.push(c),
                            None => {
                                return self.error(
                                    "Invalid Unicode code point.",
                                    self.scanner.raw_span(),
                                )
                            }
                        }
                    }
                },
                Some(_) => buffer.push(self.scanner.read_utf8_char()?),
            }
        }
    }

    // Lookahead predicates

    /// Whether an identifier starts [forward] bytes ahead of the cursor.
    pub(crate) fn looking_at_identifier(&self, forward: usize) -> bool {
        match self.scanner.peek_at(forward) {
            Some(byte) if is_name_start(byte) => true,
            Some(b'\\') => true,
            Some(b'-') => match self.scanner.peek_at(forward + 1) {
                Some(byte) if is_name_start(byte) => true,
                Some(b'\\') | Some(b'-') => true,
                _ => false,
            },
            _ => false,
        }
    }

    pub(crate) fn looking_at_identifier_body(&self) -> bool {
        matches!(self.scanner.peek(), Some(byte) if is_name(byte) || byte == b'\\')
    }

    pub(crate) fn looking_at_interpolated_identifier(&self) -> bool {
        match self.scanner.peek() {
            None => false,
            Some(byte) if is_name_start(byte) => true,
            Some(b'\\') => true,
            Some(b'#') => self.scanner.peek_at(1) == Some(b'{'),
            Some(b'-') => match self.scanner.peek_at(1) {
                None => false,
                Some(b'#') => self.scanner.peek_at(2) == Some(b'{'),
                Some(byte) if is_name_start(byte) => true,
                Some(b'\\') | Some(b'-') => true,
                _ => false,
            },
            _ => false,
        }
    }

    pub(crate) fn looking_at_interpolated_identifier_body(&self) -> bool {
        match self.scanner.peek() {
            Some(byte) if is_name(byte) => true,
            Some(b'\\') => true,
            Some(b'#') => self.scanner.peek_at(1) == Some(b'{'),
            _ => false,
        }
    }

    pub(crate) fn looking_at_number(&self) -> bool {
        match self.scanner.peek() {
            Some(byte) if is_digit(byte) => true,
            Some(b'.') => matches!(self.scanner.peek_at(1), Some(b) if is_digit(b)),
            Some(b'+') | Some(b'-') => match self.scanner.peek_at(1) {
                Some(byte) if is_digit(byte) => true,
                Some(b'.') => matches!(self.scanner.peek_at(2), Some(b) if is_digit(b)),
                _ => false,
            },
            _ => false,
        }
    }

    // URLs

    /// Attempts to consume the parenthesized body of a `url(...)` token.
    /// Returns `None` (with the cursor restored) if the contents aren't a
    /// valid URL token, in which case they reparse as ordinary arguments.
    pub(crate) fn try_url_contents(
        &mut self,
        start: Offset,
        name: Option<&str>,
    ) -> ParseResult<Option<Interpolation>> {
        let beginning = self.scanner.state();
        if !self.scanner.scan_char(b'(') {
            return Ok(None);
        }
        self.scan_whitespace_without_comments();

        let mut buffer = InterpolationBuffer::new();
        buffer.write_str(name.unwrap_or("url"));
        buffer.write_char('(');
        loop {
            match self.scanner.peek() {
                None => break,
                Some(b'\\') => {
                    let raw = self.raw_escape()?;
                    buffer.write_str(&raw);
                }
                Some(b'#') if self.scanner.peek_at(1) == Some(b'{') => {
                    let expression = self.read_single_interpolation()?;
                    buffer.add_expression(expression);
                }
                Some(b')') => {
                    self.scanner.scan_char(b')');
                    buffer.write_char(')');
                    return Ok(Some(
                        buffer.into_interpolation(self.scanner.raw_span_from(start)),
                    ));
                }
                Some(byte) if is_whitespace(byte) => {
                    self.scan_whitespace_without_comments();
                    if self.scanner.peek() != Some(b')') {
                        break;
                    }
                }
                Some(byte)
                    if byte == b'!'
                        || byte == b'%'
                        || byte == b'&'
                        || (b'*'..=b'~').contains(&byte)
                        || byte >= 0x80 =>
                {
                    buffer.write_char(self.scanner.read_utf8_char()?);
                }
                Some(_) => break,
            }
        }
        self.scanner.backtrack(beginning);
        Ok(None)
    }

    // Permissive raw-value consumers

    /// Consumes text until a top-level `!`, `;`, `{`, or `}`, keeping
    /// interpolation, strings, URLs and (optionally) comments intact.
    /// Selectors and `@extend`/unknown-at-rule preludes go through here.
    pub(crate) fn read_almost_any_value(
        &mut self,
        omit_comments: bool,
    ) -> ParseResult<Interpolation> {
        let start = self.scanner.offset;
        let mut buffer = InterpolationBuffer::new();
        loop {
            let Some(next) = self.scanner.peek() else { break };
            match next {
                b'\\' => {
                    let raw = self.raw_escape()?;
                    buffer.write_str(&raw);
                }
                b'"' | b'\'' => {
                    let (text, _) = self.read_interpolated_string_text()?;
                    add_quoted_string(&mut buffer, &text);
                }
                b'/' => match self.scanner.peek_at(1) {
                    Some(b'*') => {
                        let raw = self.raw_text(Self::skip_loud_comment)?;
                        if !omit_comments {
                            buffer.write_str(&raw);
                        }
                    }
                    _ => {
                        self.scanner.scan_char(b'/');
                        buffer.write_char('/');
                    }
                },
                b'#' => {
                    if self.scanner.peek_at(1) == Some(b'{') {
                        // May be a continuation like `#{$a}b`.
                        let identifier = self.read_interpolated_identifier()?;
                        buffer.add_interpolation(identifier);
                    } else {
                        self.scanner.scan_char(b'#');
                        buffer.write_char('#');
                    }
                }
                b'\r' | b'\n' | b'\x0C' => {
                    if self.is_indented() {
                        break;
                    }
                    self.scanner.scan_char(next);
                    buffer.write_char(next as char);
                }
                b'!' | b';' | b'{' | b'}' => break,
                b'u' | b'U' => {
                    let before_url = self.scanner.state();
                    if !self.scan_identifier("url")? {
                        buffer.write_char(self.scanner.read_utf8_char()?);
                        continue;
                    }
                    match self.try_url_contents(before_url.offset, None)? {
                        Some(contents) => buffer.add_interpolation(contents),
                        None => {
                            self.scanner.backtrack(before_url);
                            buffer.write_char(self.scanner.read_utf8_char()?);
                        }
                    }
                }
                _ => {
                    if self.looking_at_identifier(0) {
                        let text = self.read_identifier()?;
                        buffer.write_str(&text);
                    } else {
                        buffer.write_char(self.scanner.read_utf8_char()?);
                    }
                }
            }
        }
        Ok(buffer.into_interpolation(self.scanner.relevant_span_from(start)))
    }

    /// Consumes a declaration-style value: balanced brackets, strings and
    /// interpolation preserved, whitespace normalized, stopping at a
    /// top-level `;` (or `:` when disallowed). Custom properties and
    /// special functions use this for their raw bodies.
    pub(crate) fn read_interpolated_declaration_value(
        &mut self,
        allow_empty: bool,
        allow_semicolon: bool,
        allow_colon: bool,
    ) -> ParseResult<Interpolation> {
        let start = self.scanner.offset;
        let mut buffer = InterpolationBuffer::new();
        let mut brackets: Vec<u8> = Vec::new();
        let mut wrote_newline = false;
        loop {
            let Some(next) = self.scanner.peek() else { break };
            match next {
                b'\\' => {
                    let raw = self.raw_escape()?;
                    buffer.write_str(&raw);
                    wrote_newline = false;
                }
                b'"' | b'\'' => {
                    let (text, _) = self.read_interpolated_string_text()?;
                    add_quoted_string(&mut buffer, &text);
                    wrote_newline = false;
                }
                b'/' => {
                    if self.scanner.peek_at(1) == Some(b'*') {
                        let raw = self.raw_text(Self::skip_loud_comment)?;
                        buffer.write_str(&raw);
                    } else {
                        self.scanner.scan_char(b'/');
                        buffer.write_char('/');
                    }
                    wrote_newline = false;
                }
                b'#' => {
                    if self.scanner.peek_at(1) == Some(b'{') {
                        let expression = self.read_single_interpolation()?;
                        buffer.add_expression(expression);
                    } else {
                        self.scanner.scan_char(b'#');
                        buffer.write_char('#');
                    }
                    wrote_newline = false;
                }
                b' ' | b'\t' => {
                    let keep = wrote_newline
                        || !matches!(self.scanner.peek_at(1), Some(b) if is_whitespace(b));
                    self.scanner.scan_char(next);
                    if keep {
                        buffer.write_char(next as char);
                    }
                }
                b'\n' | b'\r' | b'\x0C' => {
                    if self.is_indented() {
                        break;
                    }
                    if !matches!(self.scanner.peek_behind(), Some(b) if is_newline(b)) {
                        buffer.write_char('\n');
                    }
                    self.scanner.scan_char(next);
                    wrote_newline = true;
                }
                b'(' | b'{' | b'[' => {
                    self.scanner.scan_char(next);
                    buffer.write_char(next as char);
                    brackets.push(opposite_bracket(next));
                    wrote_newline = false;
                }
                b')' | b'}' | b']' => {
                    let Some(expected) = brackets.pop() else { break };
                    self.scanner.expect_char(expected, None)?;
                    buffer.write_char(expected as char);
                    wrote_newline = false;
                }
                b';' => {
                    if !allow_semicolon && brackets.is_empty() {
                        break;
                    }
                    self.scanner.scan_char(b';');
                    buffer.write_char(';');
                    wrote_newline = false;
                }
                b':' => {
                    if !allow_colon && brackets.is_empty() {
                        break;
                    }
                    self.scanner.scan_char(b':');
                    buffer.write_char(':');
                    wrote_newline = false;
                }
                b'u' | b'U' => {
                    let before_url = self.scanner.state();
                    if !self.scan_identifier("url")? {
                        buffer.write_char(self.scanner.read_utf8_char()?);
                        wrote_newline = false;
                        continue;
                    }
                    match self.try_url_contents(before_url.offset, None)? {
                        Some(contents) => buffer.add_interpolation(contents),
                        None => {
                            self.scanner.backtrack(before_url);
                            buffer.write_char(self.scanner.read_utf8_char()?);
                        }
                    }
                    wrote_newline = false;
                }
                _ => {
                    if self.looking_at_identifier(0) {
                        let text = self.read_identifier()?;
                        buffer.write_str(&text);
                    } else {
                        buffer.write_char(self.scanner.read_utf8_char()?);
                    }
                    wrote_newline = false;
                }
            }
        }
        if let Some(last) = brackets.last() {
            self.scanner.expect_char(*last, None)?;
        }
        if !allow_empty && buffer.is_empty() {
            return Err(self.scanner.fail("token"));
        }
        Ok(buffer.into_interpolation(self.scanner.relevant_span_from(start)))
    }
}

#[cfg(test)]
mod tests {
    use brine_source_map::FileId;
    use pretty_assertions::assert_eq;

    use super::super::{StylesheetParser, Syntax};

    fn parser(text: &str) -> StylesheetParser<'_> {
        StylesheetParser::new(text, FileId(0), Syntax::Scss)
    }

    #[test]
    fn identifier_resolves_escapes() {
        let mut p = parser("\\61 bc");
        assert_eq!(p.read_identifier().unwrap(), "abc");
    }

    #[test]
    fn unit_identifier_stops_before_minus_digit() {
        let mut p = parser("px-2px");
        assert_eq!(p.read_identifier_as_unit().unwrap(), "px");
        assert_eq!(p.scanner.peek(), Some(b'-'));
    }

    #[test]
    fn scan_identifier_never_consumes_prefix() {
        let mut p = parser("andover");
        assert!(!p.scan_identifier("and").unwrap());
        assert_eq!(p.scanner.position(), 0);
        assert!(p.scan_identifier("andover").unwrap());
    }

    #[test]
    fn scan_identifier_is_case_insensitive() {
        let mut p = parser("AND more");
        assert!(p.scan_identifier("and").unwrap());
    }

    #[test]
    fn string_resolves_escaped_quote() {
        let mut p = parser(r#""a\"b""#);
        assert_eq!(p.read_string().unwrap(), "a\"b");
    }

    #[test]
    fn string_rejects_literal_newline() {
        let mut p = parser("\"a\nb\"");
        assert!(p.read_string().is_err());
    }

    #[test]
    fn whitespace_skips_comments() {
        let mut p = parser("  /* x */ // y\n  z");
        p.scan_whitespace().unwrap();
        assert_eq!(p.scanner.peek(), Some(b'z'));
    }

    #[test]
    fn url_contents_accepts_bare_url() {
        let mut p = parser("(http://a/b.png) rest");
        let start = p.scanner.offset;
        let contents = p.try_url_contents(start, None).unwrap().unwrap();
        assert_eq!(contents.as_plain(), Some("url(http://a/b.png)"));
    }

    #[test]
    fn url_contents_rejects_interior_whitespace() {
        let mut p = parser("(a b)");
        let start = p.scanner.offset;
        assert!(p.try_url_contents(start, None).unwrap().is_none());
        assert_eq!(p.scanner.position(), 0);
    }

    #[test]
    fn declaration_value_balances_brackets() {
        let mut p = parser("foo(1, 2) bar; tail");
        let value = p
            .read_interpolated_declaration_value(false, false, true)
            .unwrap();
        assert_eq!(value.as_plain(), Some("foo(1, 2) bar"));
        assert_eq!(p.scanner.peek(), Some(b';'));
    }

    #[test]
    fn declaration_value_collapses_newlines() {
        let mut p = parser("a\n\n\nb");
        let value = p
            .read_interpolated_declaration_value(false, false, true)
            .unwrap();
        assert_eq!(value.as_plain(), Some("a\nb"));
    }

    #[test]
    fn almost_any_value_stops_at_open_brace() {
        let mut p = parser("a .b #c { }");
        let value = p.read_almost_any_value(false).unwrap();
        assert_eq!(value.as_plain(), Some("a .b #c "));
        assert_eq!(p.scanner.peek(), Some(b'{'));
    }
}
