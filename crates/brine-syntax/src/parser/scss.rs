//! SCSS-specific statement plumbing: brace-delimited blocks, semicolon
//! separators, and slash comments.

use crate::ast::{NodeId, Statement};
use crate::character::is_newline;
use crate::error::ParseResult;
use crate::interpolation::InterpolationBuffer;

use super::{ChildParser, StylesheetParser};

impl<'a> StylesheetParser<'a> {
    /// A statement ends at `;`, `}` or end of input; the separator itself
    /// is consumed by the statement loop.
    pub(crate) fn scss_expect_statement_separator(&mut self) -> ParseResult<()> {
        self.scan_whitespace_without_comments();
        if self.scanner.is_done() {
            return Ok(());
        }
        match self.scanner.peek() {
            Some(b';' | b'}') => Ok(()),
            _ => self.scanner.expect_char(b';', None),
        }
    }

    pub(crate) fn scss_at_end_of_statement(&self) -> bool {
        matches!(self.scanner.peek(), None | Some(b';' | b'}' | b'{'))
    }

    pub(crate) fn scss_looking_at_children(&self) -> bool {
        self.scanner.peek() == Some(b'{')
    }

    pub(crate) fn scss_scan_else(&mut self) -> ParseResult<bool> {
        let start = self.scanner.state();
        self.scan_whitespace_without_comments();
        let before_at = self.scanner.state();
        if self.scanner.scan_char(b'@') {
            if self.scan_identifier_with("else", true)? {
                return Ok(true);
            }
            if self.scan_identifier_with("elseif", true)? {
                self.deprecation(
                    "@elseif is deprecated and will not be supported in future Sass \
                     versions.\nUse \"@else if\" instead.",
                    self.scanner.relevant_span_from(before_at.offset),
                );
                // Rewind so the caller sees the `if` as its own keyword.
                self.scanner.backtrack(before_at);
                self.scanner.scan("@else");
                return Ok(true);
            }
        }
        self.scanner.backtrack(start);
        Ok(false)
    }

    pub(crate) fn scss_read_children(&mut self, child: ChildParser<'a>) -> ParseResult<Vec<NodeId>> {
        self.scanner.expect_char(b'{', None)?;
        self.scan_whitespace_without_comments();
        let mut children = Vec::new();
        loop {
            match self.scanner.peek() {
                Some(b'$') => children.push(self.read_variable_declaration()?),
                Some(b'/') => match self.scanner.peek_at(1) {
                    Some(b'/') => {
                        children.push(self.read_silent_comment_statement()?);
                        self.scan_whitespace_without_comments();
                    }
                    Some(b'*') => {
                        children.push(self.read_loud_comment_statement()?);
                        self.scan_whitespace_without_comments();
                    }
                    _ => {
                        if let Some(statement) = child(self)? {
                            children.push(statement);
                        }
                    }
                },
                Some(b';') => {
                    self.scanner.read_char()?;
                    self.scan_whitespace_without_comments();
                }
                Some(b'}') => {
                    self.scanner.expect_char(b'}', None)?;
                    return Ok(children);
                }
                _ => {
                    if let Some(statement) = child(self)? {
                        children.push(statement);
                    }
                }
            }
        }
    }

    pub(crate) fn scss_read_statements(
        &mut self,
        statement: ChildParser<'a>,
    ) -> ParseResult<Vec<NodeId>> {
        let mut statements = Vec::new();
        self.scan_whitespace_without_comments();
        while !self.scanner.is_done() {
            match self.scanner.peek() {
                Some(b'$') => statements.push(self.read_variable_declaration()?),
                Some(b'/') => match self.scanner.peek_at(1) {
                    Some(b'/') => {
                        statements.push(self.read_silent_comment_statement()?);
                        self.scan_whitespace_without_comments();
                    }
                    Some(b'*') => {
                        statements.push(self.read_loud_comment_statement()?);
                        self.scan_whitespace_without_comments();
                    }
                    _ => {
                        if let Some(child) = statement(self)? {
                            statements.push(child);
                        }
                    }
                },
                Some(b';') => {
                    self.scanner.read_char()?;
                    self.scan_whitespace_without_comments();
                }
                _ => {
                    if let Some(child) = statement(self)? {
                        statements.push(child);
                    }
                }
            }
        }
        Ok(statements)
    }

    /// Consumes a run of `//` lines as a single comment node.
    pub(crate) fn scss_read_silent_comment(&mut self) -> ParseResult<NodeId> {
        let start = self.scanner.offset;
        let start_position = self.scanner.position();
        self.scanner.expect("//", None)?;

        if self.is_plain_css() {
            return self.error(
                "Silent comments aren't allowed in plain CSS.",
                self.scanner.relevant_span_from(start),
            );
        }

        loop {
            while let Some(byte) = self.scanner.peek() {
                self.scanner.read_char()?;
                if is_newline(byte) {
                    break;
                }
            }
            if self.scanner.is_done() {
                break;
            }
            self.scan_whitespace_without_comments();
            if !self.scanner.scan("//") {
                break;
            }
        }

        let text = self.scanner.substring(start_position).to_string();
        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(Statement::SilentComment { text }, span))
    }

    /// Consumes a `/* ... */` comment, which may contain interpolation and
    /// is preserved in the output.
    pub(crate) fn scss_read_loud_comment(&mut self) -> ParseResult<NodeId> {
        let start = self.scanner.offset;
        self.scanner.expect("/*", None)?;
        let mut buffer = InterpolationBuffer::new();
        buffer.write_str("/*");
        loop {
            match self.scanner.peek() {
                Some(b'#') if self.scanner.peek_at(1) == Some(b'{') => {
                    let expression = self.read_single_interpolation()?;
                    buffer.add_expression(expression);
                }
                Some(b'*') => {
                    self.scanner.read_char()?;
                    buffer.write_char('*');
                    if self.scanner.peek() != Some(b'/') {
                        continue;
                    }
                    self.scanner.read_char()?;
                    buffer.write_char('/');

                    let span = self.scanner.relevant_span_from(start);
                    let text = buffer.into_interpolation(span);
                    return Ok(self.arena().add(Statement::LoudComment { text }, span));
                }
                Some(b'\r') => {
                    self.scanner.read_char()?;
                    if self.scanner.peek() != Some(b'\n') {
                        buffer.write_char('\n');
                    }
                }
                Some(b'\x0C') => {
                    self.scanner.read_char()?;
                    buffer.write_char('\n');
                }
                None => return Err(self.scanner.fail("more input")),
                _ => buffer.write_char(self.scanner.read_utf8_char()?),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use brine_source_map::FileId;
    use pretty_assertions::assert_eq;

    use crate::ast::Statement;
    use crate::parser::{parse_stylesheet, Syntax};

    fn parse(text: &str) -> crate::ast::StyleSheet {
        parse_stylesheet(text, FileId(0), Syntax::Scss)
            .expect("parse failed")
            .sheet
    }

    #[test]
    fn silent_comment_spans_consecutive_lines() {
        let sheet = parse("// one\n// two\na { b: c; }");
        let root = sheet.node(sheet.root()).kind.children().to_vec();
        assert_eq!(root.len(), 2);
        let Statement::SilentComment { text } = &sheet.node(root[0]).kind else {
            panic!("expected silent comment");
        };
        assert!(text.starts_with("// one"));
        assert!(text.contains("// two"));
    }

    #[test]
    fn loud_comment_normalizes_line_endings() {
        let sheet = parse("/* a\r\nb\rc */");
        let root = sheet.node(sheet.root()).kind.children().to_vec();
        let Statement::LoudComment { text } = &sheet.node(root[0]).kind else {
            panic!("expected loud comment");
        };
        assert_eq!(text.as_plain(), Some("/* a\nb\nc */"));
    }

    #[test]
    fn loud_comment_with_interpolation() {
        let sheet = parse("/* version #{1 + 1} */");
        let root = sheet.node(sheet.root()).kind.children().to_vec();
        let Statement::LoudComment { text } = &sheet.node(root[0]).kind else {
            panic!("expected loud comment");
        };
        assert_eq!(text.parts.len(), 3);
        assert_eq!(text.initial_plain(), "/* version ");
    }

    #[test]
    fn stray_semicolons_are_skipped() {
        let sheet = parse(";;a { b: c; };;");
        let root = sheet.node(sheet.root()).kind.children().to_vec();
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn unterminated_loud_comment_fails() {
        let err = parse_stylesheet("/* never closed", FileId(0), Syntax::Scss)
            .expect_err("comment should not parse");
        assert_eq!(err.to_string(), "expected more input.");
    }
}
