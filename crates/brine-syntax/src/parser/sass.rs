//! Indented-syntax statement plumbing.
//!
//! In the indented syntax newlines separate statements and indentation
//! delimits blocks, so the parser carries a one-line lookahead: the
//! indentation of the next non-empty line is peeked (and cached along
//! with the scanner state just past it) without moving the cursor, and
//! consumed only when the line is actually entered.

use crate::ast::{NodeId, Statement};
use crate::character::is_newline;
use crate::error::ParseResult;
use crate::interpolation::{Interpolation, InterpolationBuffer};

use super::{ChildParser, IndentType, StylesheetParser};

impl<'a> StylesheetParser<'a> {
    /// A selector may continue onto the next line after a trailing comma.
    pub(crate) fn sass_style_rule_selector(&mut self) -> ParseResult<Interpolation> {
        let start = self.scanner.offset;
        let mut buffer = InterpolationBuffer::new();
        loop {
            let line = self.read_almost_any_value(true)?;
            buffer.add_interpolation(line);
            buffer.write_char('\n');
            if !buffer.trailing_string().trim_end().ends_with(',') {
                break;
            }
            if !self.scan_char_if_newline() {
                break;
            }
        }
        Ok(buffer.into_interpolation(self.scanner.raw_span_from(start)))
    }

    pub(crate) fn sass_expect_statement_separator(
        &mut self,
        name: Option<&str>,
    ) -> ParseResult<()> {
        if !self.sass_at_end_of_statement() {
            self.expect_newline()?;
        }
        if self.peek_indentation()? <= self.current_indentation {
            return Ok(());
        }
        let message = match name {
            Some(name) => format!("Nothing may be indented beneath a {name}."),
            None => "Nothing may be indented here.".to_string(),
        };
        let span = match self.next_indentation_end {
            Some(end) => self.scanner.span_at(end.offset),
            None => self.scanner.raw_span(),
        };
        self.error(message, span)
    }

    pub(crate) fn sass_at_end_of_statement(&self) -> bool {
        match self.scanner.peek() {
            Some(next) => is_newline(next),
            None => true,
        }
    }

    pub(crate) fn sass_looking_at_children(&mut self) -> ParseResult<bool> {
        Ok(self.sass_at_end_of_statement()
            && self.peek_indentation()? > self.current_indentation)
    }

    /// An `@else` clause only continues the chain when it sits at exactly
    /// the same indentation as its `@if`.
    pub(crate) fn sass_scan_else(&mut self, if_indentation: usize) -> ParseResult<bool> {
        if self.peek_indentation()? != if_indentation {
            return Ok(false);
        }

        let state = self.scanner.state();
        let start_indentation = self.current_indentation;
        let start_next_indentation = self.next_indentation;
        let start_next_indentation_end = self.next_indentation_end;

        self.read_indentation()?;
        if self.scanner.scan_char(b'@') && self.scan_identifier("else")? {
            return Ok(true);
        }

        self.scanner.backtrack(state);
        self.current_indentation = start_indentation;
        self.next_indentation = start_next_indentation;
        self.next_indentation_end = start_next_indentation_end;
        Ok(false)
    }

    pub(crate) fn sass_read_children(&mut self, child: ChildParser<'a>) -> ParseResult<Vec<NodeId>> {
        let mut children = Vec::new();
        self.while_indented_lower(child, &mut children)?;
        Ok(children)
    }

    pub(crate) fn sass_read_statements(
        &mut self,
        statement: ChildParser<'a>,
    ) -> ParseResult<Vec<NodeId>> {
        if matches!(self.scanner.peek(), Some(b' ' | b'\t')) {
            return self.error(
                "Indenting at the beginning of the document is illegal.",
                self.scanner.raw_span(),
            );
        }

        let mut statements = Vec::new();
        while !self.scanner.is_done() {
            if let Some(child) = self.sass_parse_child(statement)? {
                statements.push(child);
            }
            if self.read_indentation()? != 0 {
                return self.error(
                    "Inconsistent indentation, expected 0 spaces.",
                    self.scanner.raw_span(),
                );
            }
        }
        Ok(statements)
    }

    fn sass_parse_child(&mut self, child: ChildParser<'a>) -> ParseResult<Option<NodeId>> {
        match self.scanner.peek() {
            // Empty lines produce no statement.
            Some(b'\r' | b'\n' | b'\x0C') => Ok(None),
            Some(b'$') => self.read_variable_declaration().map(Some),
            Some(b'/') => match self.scanner.peek_at(1) {
                Some(b'/') => self.sass_read_silent_comment().map(Some),
                Some(b'*') => self.sass_read_loud_comment().map(Some),
                _ => child(self),
            },
            _ => child(self),
        }
    }

    /// Consumes a run of `//` lines, including more deeply indented
    /// continuation lines, as one comment node. The stored text keeps a
    /// `//` prefix on every line so documentation tooling sees the same
    /// shape as in SCSS.
    pub(crate) fn sass_read_silent_comment(&mut self) -> ParseResult<NodeId> {
        let start = self.scanner.offset;
        self.scanner.expect("//", None)?;
        let mut buffer = String::new();
        let parent_indentation = self.current_indentation;

        'comment: loop {
            let comment_prefix = if self.scanner.scan_char(b'/') { "///" } else { "//" };

            loop {
                buffer.push_str(comment_prefix);

                // The prefix stands in for the first characters of the
                // line's indentation.
                for _ in comment_prefix.len()..(self.current_indentation - parent_indentation)
                {
                    buffer.push(' ');
                }

                while let Some(byte) = self.scanner.peek() {
                    if is_newline(byte) {
                        break;
                    }
                    buffer.push(self.scanner.read_utf8_char()?);
                }
                buffer.push('\n');

                if self.peek_indentation()? < parent_indentation {
                    break 'comment;
                }
                if self.peek_indentation()? == parent_indentation {
                    // Consume the next line only if it continues the
                    // comment at the same level.
                    if self.scanner.peek_at(1 + parent_indentation) == Some(b'/')
                        && self.scanner.peek_at(2 + parent_indentation) == Some(b'/')
                    {
                        self.read_indentation()?;
                    }
                    break;
                }
                self.read_indentation()?;
            }

            if !self.scanner.scan("//") {
                break;
            }
        }

        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(Statement::SilentComment { text: buffer }, span))
    }

    /// Consumes a `/*` comment, which runs until the indentation drops
    /// back to the parent level. Continuation lines are rendered with a
    /// ` * ` gutter and the closing `*/` is synthesized when absent.
    pub(crate) fn sass_read_loud_comment(&mut self) -> ParseResult<NodeId> {
        let start = self.scanner.offset;
        self.scanner.expect("/*", None)?;

        let mut first = true;
        let mut buffer = InterpolationBuffer::new();
        buffer.write_str("/*");
        let parent_indentation = self.current_indentation;

        loop {
            if first {
                // If the first line is empty, ignore it.
                let beginning = self.scanner.position();
                self.scan_spaces();
                if matches!(self.scanner.peek(), Some(byte) if is_newline(byte)) {
                    self.read_indentation()?;
                    buffer.write_char(' ');
                } else {
                    let text = self.scanner.substring(beginning).to_string();
                    buffer.write_str(&text);
                }
            } else {
                buffer.write_str("\n * ");
            }
            first = false;

            // The gutter stands in for the first three columns of
            // indentation past the parent.
            for _ in 3..(self.current_indentation - parent_indentation) {
                buffer.write_char(' ');
            }

            while let Some(next) = self.scanner.peek() {
                match next {
                    b'\n' | b'\r' | b'\x0C' => break,
                    b'#' if self.scanner.peek_at(1) == Some(b'{') => {
                        let expression = self.read_single_interpolation()?;
                        buffer.add_expression(expression);
                    }
                    _ => buffer.write_char(self.scanner.read_utf8_char()?),
                }
            }

            if self.peek_indentation()? <= parent_indentation {
                break;
            }
            while self.looking_at_double_newline() {
                self.expect_newline()?;
                buffer.write_str("\n *");
            }
            self.read_indentation()?;
        }

        if !buffer.trailing_string().trim_end().ends_with("*/") {
            buffer.write_str(" */");
        }
        let span = self.scanner.relevant_span_from(start);
        let text = buffer.into_interpolation(span);
        Ok(self.arena().add(Statement::LoudComment { text }, span))
    }

    fn expect_newline(&mut self) -> ParseResult<()> {
        match self.scanner.peek() {
            Some(b';') => self.error(
                "semicolons aren't allowed in the indented syntax.",
                self.scanner.raw_span(),
            ),
            Some(b'\r') => {
                self.scanner.read_char()?;
                if self.scanner.peek() == Some(b'\n') {
                    self.scanner.read_char()?;
                }
                Ok(())
            }
            Some(b'\n' | b'\x0C') => {
                self.scanner.read_char()?;
                Ok(())
            }
            _ => self.error("expected newline.", self.scanner.raw_span()),
        }
    }

    /// Whether the cursor sits on two newlines in a row, i.e. an empty
    /// line (a `\r\n` pair counts as one newline).
    fn looking_at_double_newline(&self) -> bool {
        match self.scanner.peek() {
            Some(b'\r') => match self.scanner.peek_at(1) {
                Some(b'\n') => matches!(self.scanner.peek_at(2), Some(byte) if is_newline(byte)),
                Some(b'\r' | b'\x0C') => true,
                _ => false,
            },
            Some(b'\n' | b'\x0C') => {
                matches!(self.scanner.peek_at(1), Some(byte) if is_newline(byte))
            }
            _ => false,
        }
    }

    /// Consumes child statements until the indentation drops back to the
    /// current level. All children must share one indentation.
    fn while_indented_lower(
        &mut self,
        child: ChildParser<'a>,
        children: &mut Vec<NodeId>,
    ) -> ParseResult<()> {
        let parent_indentation = self.current_indentation;
        let mut child_indentation: Option<usize> = None;

        while self.peek_indentation()? > parent_indentation {
            let indentation = self.read_indentation()?;
            let expected = *child_indentation.get_or_insert(indentation);
            if expected != indentation {
                return self.error(
                    format!("Inconsistent indentation, expected {expected} spaces."),
                    self.scanner.raw_span(),
                );
            }
            if let Some(statement) = self.sass_parse_child(child)? {
                children.push(statement);
            }
        }
        Ok(())
    }

    /// Moves the cursor past the peeked newline and indentation, making
    /// the next line current.
    fn read_indentation(&mut self) -> ParseResult<usize> {
        let next = match self.next_indentation {
            Some(next) => next,
            None => self.peek_indentation()?,
        };
        self.current_indentation = next;
        self.next_indentation = None;
        if let Some(end) = self.next_indentation_end.take() {
            self.scanner.backtrack(end);
        }
        Ok(next)
    }

    /// Returns the indentation of the next non-empty line without moving
    /// the cursor, caching the scanner state just past it for
    /// [`Self::read_indentation`].
    fn peek_indentation(&mut self) -> ParseResult<usize> {
        if let Some(cached) = self.next_indentation {
            return Ok(cached);
        }

        if self.scanner.is_done() {
            self.next_indentation = Some(0);
            self.next_indentation_end = Some(self.scanner.state());
            return Ok(0);
        }

        let start = self.scanner.state();
        if !self.scan_char_if_newline() {
            return self.error("Expected newline.", self.scanner.raw_span());
        }

        let mut contains_tab;
        let mut contains_space;
        let mut next_indentation;
        loop {
            contains_tab = false;
            contains_space = false;
            next_indentation = 0;

            while let Some(next) = self.scanner.peek() {
                match next {
                    b' ' => contains_space = true,
                    b'\t' => contains_tab = true,
                    _ => break,
                }
                next_indentation += 1;
                self.scanner.read_char()?;
            }

            if self.scanner.is_done() {
                // Trailing whitespace at the end of the document doesn't
                // open a block.
                self.next_indentation = Some(0);
                self.next_indentation_end = Some(self.scanner.state());
                self.scanner.backtrack(start);
                return Ok(0);
            }

            if !self.scan_char_if_newline() {
                break;
            }
        }

        self.check_indentation_consistency(contains_tab, contains_space)?;

        if next_indentation > 0 && self.indent_type == IndentType::Auto {
            self.indent_type = if contains_space {
                IndentType::Spaces
            } else {
                IndentType::Tabs
            };
        }
        self.next_indentation = Some(next_indentation);
        self.next_indentation_end = Some(self.scanner.state());
        self.scanner.backtrack(start);
        Ok(next_indentation)
    }

    /// A document commits to spaces or tabs with its first indented line.
    fn check_indentation_consistency(
        &self,
        contains_tab: bool,
        contains_space: bool,
    ) -> ParseResult<()> {
        if contains_tab {
            if contains_space {
                return self.error(
                    "Tabs and spaces may not be mixed.",
                    self.scanner.raw_span(),
                );
            }
            if self.indent_type == IndentType::Spaces {
                return self.error("Expected spaces, was tabs.", self.scanner.raw_span());
            }
        } else if contains_space && self.indent_type == IndentType::Tabs {
            return self.error("Expected tabs, was spaces.", self.scanner.raw_span());
        }
        Ok(())
    }

    fn scan_char_if_newline(&mut self) -> bool {
        match self.scanner.peek() {
            Some(byte) if is_newline(byte) => self.scanner.scan_char(byte),
            _ => false,
        }
    }
}
