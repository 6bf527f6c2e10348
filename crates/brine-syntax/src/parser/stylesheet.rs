//! Statement-level parsing shared by all three syntaxes.
//!
//! The declaration-vs-style-rule disambiguation lives here: on seeing
//! `identifier :` inside a rule body the parser speculatively commits to
//! a declaration, and backtracks to re-read the same text as a selector
//! only when the trial fails with a recoverable error. Fatal failures
//! (recursion limit) propagate unchanged.

use brine_source_map::Offset;

use crate::ast::{
    ArgumentDeclaration, ArgumentInvocation, ConfiguredVariable, ContentBlock, Expression,
    ExpressionKind, ForwardVisibility, IfClause, ImportArgument, NodeId, Statement, StyleSheet,
    SupportsCondition,
};
use crate::character::{is_newline, is_whitespace};
use crate::error::ParseResult;
use crate::interpolation::{Interpolation, InterpolationBuffer};

use super::expression::unvendor;
use super::{css, ChildParser, StylesheetParser, Syntax};

/// Outcome of speculatively reading a leading identifier that may start
/// a namespaced variable declaration.
enum VariableOrInterpolation {
    Declaration(NodeId),
    Interpolation(Interpolation),
}

impl<'a> StylesheetParser<'a> {
    pub(crate) fn parse_root(&mut self) -> ParseResult<StyleSheet> {
        self.scanner.scan("\u{FEFF}");
        let start = self.scanner.offset;
        let children = self.read_statements(Self::read_root_statement)?;
        self.scanner.expect_done()?;
        let span = self.scanner.relevant_span_from(start);
        let arena = std::mem::take(self.arena());
        let mut arena = arena;
        let root = arena.add(
            Statement::Root {
                children: children.clone(),
            },
            span,
        );
        arena.adopt(root, &children);
        Ok(arena.into_stylesheet(root))
    }

    pub(crate) fn read_root_statement(&mut self) -> ParseResult<Option<NodeId>> {
        self.read_statement(true)
    }

    pub(crate) fn read_child_statement(&mut self) -> ParseResult<Option<NodeId>> {
        self.read_statement(false)
    }

    fn read_statement(&mut self, root: bool) -> ParseResult<Option<NodeId>> {
        self.enter()?;
        let result = self.read_statement_inner(root);
        self.leave();
        result
    }

    fn read_statement_inner(&mut self, root: bool) -> ParseResult<Option<NodeId>> {
        match self.scanner.peek() {
            Some(b'@') => self.read_at_rule(Self::read_child_statement, root),
            Some(b'+') => {
                if !self.is_indented() || !self.looking_at_identifier(1) {
                    return self.read_style_rule().map(Some);
                }
                // Indented-syntax shorthand for `@include`.
                self.use_allowed = false;
                let start = self.scanner.offset;
                self.scanner.read_char()?;
                self.read_include_rule(start).map(Some)
            }
            Some(b'=') => {
                if !self.is_indented() {
                    return self.read_style_rule().map(Some);
                }
                // Indented-syntax shorthand for `@mixin`.
                self.use_allowed = false;
                let start = self.scanner.offset;
                self.scanner.read_char()?;
                self.scan_whitespace()?;
                self.read_mixin_rule(start).map(Some)
            }
            Some(b'}') => self.error("unmatched \"}\".", self.scanner.raw_span()),
            _ => {
                self.use_allowed = false;
                if self.in_style_rule
                    || self.in_unknown_at_rule
                    || self.in_mixin
                    || self.in_content_block
                {
                    self.read_declaration_or_style_rule().map(Some)
                } else {
                    self.read_variable_declaration_or_style_rule().map(Some)
                }
            }
        }
    }

    // Variables

    /// Consumes `$name: value` with optional `!default`/`!global` flags.
    pub(crate) fn read_variable_declaration(&mut self) -> ParseResult<NodeId> {
        let start = self.scanner.offset;
        self.read_variable_declaration_inner(None, start)
    }

    fn read_variable_declaration_inner(
        &mut self,
        namespace: Option<String>,
        start: Offset,
    ) -> ParseResult<NodeId> {
        let name = self.read_variable_name()?;

        if self.is_plain_css() {
            return self.error(
                "Sass variables aren't allowed in plain CSS.",
                self.scanner.relevant_span_from(start),
            );
        }

        self.scan_whitespace()?;
        self.scanner.expect_char(b':', None)?;
        self.scan_whitespace()?;

        let value = self.read_expression()?;

        let mut guarded = false;
        let mut global = false;
        let mut flag_start = self.scanner.offset;
        while self.scanner.scan_char(b'!') {
            let flag = self.read_identifier()?;
            match flag.as_str() {
                "default" => guarded = true,
                "global" => {
                    if namespace.is_some() {
                        return self.error(
                            "!global isn't allowed for variables in other modules.",
                            self.scanner.relevant_span_from(flag_start),
                        );
                    }
                    global = true;
                }
                _ => {
                    return self.error(
                        "Invalid flag name.",
                        self.scanner.relevant_span_from(flag_start),
                    );
                }
            }
            self.scan_whitespace()?;
            flag_start = self.scanner.offset;
        }

        self.expect_statement_separator(Some("variable declaration"))?;
        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(
            Statement::VariableDeclaration {
                namespace,
                name,
                value,
                guarded,
                global,
            },
            span,
        ))
    }

    /// Either a namespaced variable declaration (`ns.$var: value`) or the
    /// interpolated identifier its leading text turns out to be.
    fn read_variable_declaration_or_interpolation(
        &mut self,
    ) -> ParseResult<VariableOrInterpolation> {
        if !self.looking_at_identifier(0) {
            return self
                .read_interpolated_identifier()
                .map(VariableOrInterpolation::Interpolation);
        }

        let start = self.scanner.offset;
        let identifier = self.read_identifier()?;
        if self.scanner.matches(".$") {
            self.scanner.read_char()?;
            return self
                .read_variable_declaration_inner(Some(identifier), start)
                .map(VariableOrInterpolation::Declaration);
        }

        let mut buffer = InterpolationBuffer::new();
        buffer.write_str(&identifier);
        if self.looking_at_interpolated_identifier_body() {
            let rest = self.read_interpolated_identifier()?;
            buffer.add_interpolation(rest);
        }
        Ok(VariableOrInterpolation::Interpolation(
            buffer.into_interpolation(self.scanner.relevant_span_from(start)),
        ))
    }

    fn read_variable_declaration_or_style_rule(&mut self) -> ParseResult<NodeId> {
        if self.is_plain_css() {
            return self.read_style_rule();
        }
        if self.is_indented() && self.scanner.scan_char(b'\\') {
            return self.read_style_rule();
        }
        if !self.looking_at_identifier(0) {
            return self.read_style_rule();
        }

        let start = self.scanner.offset;
        match self.read_variable_declaration_or_interpolation()? {
            VariableOrInterpolation::Declaration(id) => Ok(id),
            VariableOrInterpolation::Interpolation(interpolation) => {
                let mut buffer = InterpolationBuffer::new();
                buffer.add_interpolation(interpolation);
                self.read_style_rule_with(buffer, start)
            }
        }
    }

    // Style rules and declarations

    fn with_children(
        &mut self,
        child: ChildParser<'a>,
        start: Offset,
        build: impl FnOnce(Vec<NodeId>) -> Statement,
    ) -> ParseResult<NodeId> {
        let children = self.read_children(child)?;
        let span = self.scanner.relevant_span_from(start);
        let ids = children.clone();
        let id = self.arena().add(build(children), span);
        self.arena().adopt(id, &ids);
        self.scan_whitespace_without_comments();
        Ok(id)
    }

    pub(crate) fn read_style_rule(&mut self) -> ParseResult<NodeId> {
        // The indented syntax allows a leading backslash to force a line
        // to parse as a selector.
        if self.is_indented() {
            self.scanner.scan_char(b'\\');
        }
        let start = self.scanner.offset;
        self.read_style_rule_with(InterpolationBuffer::new(), start)
    }

    fn read_style_rule_with(
        &mut self,
        mut buffer: InterpolationBuffer,
        start: Offset,
    ) -> ParseResult<NodeId> {
        self.use_allowed = false;
        let rest = self.style_rule_selector()?;
        buffer.add_interpolation(rest);
        let selector = buffer.into_interpolation(self.scanner.relevant_span_from(start));
        if selector.is_empty() {
            return self.error("expected \"}\".", self.scanner.relevant_span());
        }
        let selector_span = selector.span;

        let was_in_style_rule = self.in_style_rule;
        self.in_style_rule = true;
        let result = self.with_children(Self::read_child_statement, start, |children| {
            Statement::StyleRule { selector, children }
        });
        self.in_style_rule = was_in_style_rule;

        let rule = result?;
        if self.is_indented() && self.arena().node(rule).kind.children().is_empty() {
            self.warn(
                "This selector doesn't have any properties and won't be rendered.",
                selector_span,
            );
        }
        Ok(rule)
    }

    pub(crate) fn read_declaration_or_style_rule(&mut self) -> ParseResult<NodeId> {
        if self.is_plain_css() && self.in_style_rule && !self.in_unknown_at_rule {
            return self.read_declaration(true);
        }
        if self.is_indented() && self.scanner.scan_char(b'\\') {
            return self.read_style_rule();
        }

        let start = self.scanner.offset;
        let mut buffer = InterpolationBuffer::new();
        if let Some(declaration) = self.try_declaration_or_buffer(&mut buffer)? {
            return Ok(declaration);
        }
        self.read_style_rule_with(buffer, start)
    }

    /// Tries to consume a declaration. On `Ok(None)` the text consumed so
    /// far has been written into [name_buffer] and the caller should parse
    /// a selector instead; a recoverable trial failure backtracks into
    /// that path, anything else propagates.
    fn try_declaration_or_buffer(
        &mut self,
        name_buffer: &mut InterpolationBuffer,
    ) -> ParseResult<Option<NodeId>> {
        let start = self.scanner.offset;

        // The "*prop: val", ":prop: val", "#prop: val" and ".prop: val"
        // property hacks.
        if let Some(first) = self.scanner.peek() {
            if first == b':'
                || first == b'*'
                || first == b'.'
                || (first == b'#' && self.scanner.peek_at(1) != Some(b'{'))
            {
                self.scanner.scan_char(first);
                name_buffer.write_char(first as char);
                let spaces = self.raw_text(Self::scan_whitespace)?;
                name_buffer.write_str(&spaces);
            }
        }

        if !self.looking_at_interpolated_identifier() {
            return Ok(None);
        }

        match self.read_variable_declaration_or_interpolation()? {
            VariableOrInterpolation::Declaration(id) => return Ok(Some(id)),
            VariableOrInterpolation::Interpolation(identifier) => {
                name_buffer.add_interpolation(identifier);
            }
        }
        if self.scanner.matches("/*") {
            let comment = self.raw_text(Self::skip_loud_comment)?;
            name_buffer.write_str(&comment);
        }

        let mut mid_buffer = String::new();
        mid_buffer.push_str(&self.raw_text(Self::scan_whitespace)?);
        let before_colon = self.scanner.relevant_span_from(start);
        if !self.scanner.scan_char(b':') {
            if !mid_buffer.is_empty() {
                name_buffer.write_char(' ');
            }
            return Ok(None);
        }
        mid_buffer.push(':');

        // Custom properties are always declarations, with a raw value.
        let name = name_buffer.interpolation(before_colon);
        if name.initial_plain().starts_with("--") {
            let value = self.read_interpolated_declaration_value(false, false, true)?;
            self.expect_statement_separator(Some("custom property"))?;
            let span = self.scanner.relevant_span_from(start);
            return Ok(Some(self.arena().add(
                Statement::Declaration {
                    name,
                    value: None,
                    custom_value: Some(value),
                    children: Vec::new(),
                },
                span,
            )));
        }

        if self.scanner.scan_char(b':') {
            // `a:b:c` is a selector with a pseudo-class.
            name_buffer.write_str(&mid_buffer);
            name_buffer.write_char(':');
            return Ok(None);
        }
        if self.is_indented() && self.looking_at_interpolated_identifier() {
            // In the indented syntax `a:b` is always a selector.
            name_buffer.write_str(&mid_buffer);
            return Ok(None);
        }

        let post_colon_whitespace = self.raw_text(Self::scan_whitespace)?;
        if self.looking_at_children()? {
            let declaration =
                self.with_children(Self::read_declaration_or_at_rule, start, |children| {
                    Statement::Declaration {
                        name,
                        value: None,
                        custom_value: None,
                        children,
                    }
                })?;
            return Ok(Some(declaration));
        }

        mid_buffer.push_str(&post_colon_whitespace);
        let could_be_selector =
            post_colon_whitespace.is_empty() && self.looking_at_interpolated_identifier();

        let before_declaration = self.scanner.state();
        let value = match self.try_declaration_value(could_be_selector) {
            Ok(value) => value,
            Err(e) if e.is_recoverable() && could_be_selector => {
                // Not a valid declaration value after all: rewind and hand
                // everything consumed back as selector text.
                self.scanner.backtrack(before_declaration);
                let additional = self.read_almost_any_value(false)?;
                if !self.is_indented() && self.scanner.peek() == Some(b';') {
                    return Err(e);
                }
                name_buffer.write_str(&mid_buffer);
                name_buffer.add_interpolation(additional);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if self.looking_at_children()? {
            let declaration =
                self.with_children(Self::read_declaration_or_at_rule, start, |children| {
                    Statement::Declaration {
                        name,
                        value: Some(value),
                        custom_value: None,
                        children,
                    }
                })?;
            Ok(Some(declaration))
        } else {
            self.expect_statement_separator(None)?;
            let span = self.scanner.relevant_span_from(start);
            Ok(Some(self.arena().add(
                Statement::Declaration {
                    name,
                    value: Some(value),
                    custom_value: None,
                    children: Vec::new(),
                },
                span,
            )))
        }
    }

    fn try_declaration_value(&mut self, could_be_selector: bool) -> ParseResult<Expression> {
        let value = if self.looking_at_children()? {
            let span = self.scanner.relevant_span();
            Expression::new(
                span,
                ExpressionKind::String {
                    text: Interpolation::literal("", span),
                    quoted: true,
                },
            )
        } else {
            self.read_expression()?
        };

        if self.looking_at_children()? {
            // A declaration that's ambiguous with a selector can't have
            // nested properties; forcing a failure here re-parses the
            // whole thing as a selector.
            if could_be_selector {
                self.expect_statement_separator(None)?;
            }
        } else if !self.at_end_of_statement() {
            self.expect_statement_separator(None)?;
        }
        Ok(value)
    }

    /// Consumes a property declaration in contexts where declarations are
    /// allowed but style rules are not.
    fn read_declaration(&mut self, parse_custom_properties: bool) -> ParseResult<NodeId> {
        let start = self.scanner.offset;

        let name = if let Some(first) = self.scanner.peek().filter(|&first| {
            first == b':'
                || first == b'*'
                || first == b'.'
                || (first == b'#' && self.scanner.peek_at(1) != Some(b'{'))
        }) {
            let mut buffer = InterpolationBuffer::new();
            self.scanner.scan_char(first);
            buffer.write_char(first as char);
            let spaces = self.raw_text(Self::scan_whitespace)?;
            buffer.write_str(&spaces);
            let identifier = self.read_interpolated_identifier()?;
            buffer.add_interpolation(identifier);
            buffer.into_interpolation(self.scanner.relevant_span_from(start))
        } else {
            self.read_interpolated_identifier()?
        };

        self.scan_whitespace()?;
        self.scanner.expect_char(b':', None)?;
        self.scan_whitespace()?;

        if parse_custom_properties && name.initial_plain().starts_with("--") {
            let value = self.read_interpolated_declaration_value(false, false, true)?;
            self.expect_statement_separator(Some("custom property"))?;
            let span = self.scanner.relevant_span_from(start);
            return Ok(self.arena().add(
                Statement::Declaration {
                    name,
                    value: None,
                    custom_value: Some(value),
                    children: Vec::new(),
                },
                span,
            ));
        }

        if self.looking_at_children()? {
            if self.is_plain_css() {
                return self.error(
                    "Nested declarations aren't allowed in plain CSS.",
                    self.scanner.raw_span(),
                );
            }
            return self.with_children(Self::read_declaration_or_at_rule, start, |children| {
                Statement::Declaration {
                    name,
                    value: None,
                    custom_value: None,
                    children,
                }
            });
        }

        let value = self.read_expression()?;
        if self.looking_at_children()? {
            if self.is_plain_css() {
                return self.error(
                    "Nested declarations aren't allowed in plain CSS.",
                    self.scanner.raw_span(),
                );
            }
            self.with_children(Self::read_declaration_or_at_rule, start, |children| {
                Statement::Declaration {
                    name,
                    value: Some(value),
                    custom_value: None,
                    children,
                }
            })
        } else {
            self.expect_statement_separator(None)?;
            let span = self.scanner.relevant_span_from(start);
            Ok(self.arena().add(
                Statement::Declaration {
                    name,
                    value: Some(value),
                    custom_value: None,
                    children: Vec::new(),
                },
                span,
            ))
        }
    }

    fn read_declaration_or_at_rule(&mut self) -> ParseResult<Option<NodeId>> {
        if self.scanner.peek() == Some(b'@') {
            self.read_declaration_at_rule().map(Some)
        } else {
            self.read_declaration(false).map(Some)
        }
    }

    // At-rules

    pub(crate) fn read_at_rule(
        &mut self,
        child: ChildParser<'a>,
        root: bool,
    ) -> ParseResult<Option<NodeId>> {
        if self.is_plain_css() {
            return css::read_plain_css_at_rule(self, root);
        }

        let start = self.scanner.offset;
        self.scanner.expect_char(b'@', Some("@-rule"))?;
        let name = self.read_interpolated_identifier()?;
        self.scan_whitespace()?;

        // `@use` must stay allowed across `@charset`, `@use` and
        // `@forward`, and become disallowed after anything else.
        let was_use_allowed = self.use_allowed;
        self.use_allowed = false;

        let plain = name.as_plain().map(str::to_string);
        match plain.as_deref() {
            Some("at-root") => self.read_at_root_rule(start).map(Some),
            Some("charset") => {
                self.use_allowed = was_use_allowed;
                if !root {
                    return self.throw_disallowed_at_rule(start);
                }
                self.read_string()?;
                Ok(None)
            }
            Some("content") => self.read_content_rule(start).map(Some),
            Some("debug") => self.read_debug_rule(start).map(Some),
            Some("each") => self.read_each_rule(start, child).map(Some),
            Some("else") => self.throw_disallowed_at_rule(start),
            Some("error") => self.read_error_rule(start).map(Some),
            Some("extend") => self.read_extend_rule(start).map(Some),
            Some("for") => self.read_for_rule(start, child).map(Some),
            Some("forward") => {
                self.use_allowed = was_use_allowed;
                if !root {
                    return self.throw_disallowed_at_rule(start);
                }
                self.read_forward_rule(start).map(Some)
            }
            Some("function") => self.read_function_rule(start).map(Some),
            Some("if") => self.read_if_rule(start, child).map(Some),
            Some("import") => self.read_import_rule(start).map(Some),
            Some("include") => self.read_include_rule(start).map(Some),
            Some("media") => self.read_media_rule(start).map(Some),
            Some("mixin") => self.read_mixin_rule(start).map(Some),
            Some("-moz-document") => self.read_moz_document_rule(start, name).map(Some),
            Some("return") => self.throw_disallowed_at_rule(start),
            Some("supports") => self.read_supports_rule(start).map(Some),
            Some("use") => {
                self.use_allowed = was_use_allowed;
                if !root {
                    return self.throw_disallowed_at_rule(start);
                }
                self.read_use_rule(start).map(Some)
            }
            Some("warn") => self.read_warn_rule(start).map(Some),
            Some("while") => self.read_while_rule(start, child).map(Some),
            _ => self.read_any_at_rule(start, name).map(Some),
        }
    }

    /// Consumes an at-rule allowed within a property declaration.
    fn read_declaration_at_rule(&mut self) -> ParseResult<NodeId> {
        let start = self.scanner.offset;
        let name = self.read_plain_at_rule_name()?;
        match name.as_str() {
            "content" => self.read_content_rule(start),
            "debug" => self.read_debug_rule(start),
            "each" => self.read_each_rule(start, Self::read_declaration_or_at_rule),
            "error" => self.read_error_rule(start),
            "for" => self.read_for_rule(start, Self::read_declaration_or_at_rule),
            "if" => self.read_if_rule(start, Self::read_declaration_or_at_rule),
            "include" => self.read_include_rule(start),
            "warn" => self.read_warn_rule(start),
            "while" => self.read_while_rule(start, Self::read_declaration_or_at_rule),
            _ => self.throw_disallowed_at_rule(start),
        }
    }

    /// Consumes a statement allowed within a `@function` body.
    pub(crate) fn read_function_at_rule(&mut self) -> ParseResult<Option<NodeId>> {
        if self.scanner.peek() != Some(b'@') {
            // A style rule or declaration here means the user probably
            // expects CSS output from a function.
            let start = self.scanner.offset;
            let statement = self.read_declaration_or_style_rule()?;
            let is_style_rule = matches!(
                self.arena().node(statement).kind,
                Statement::StyleRule { .. }
            );
            return self.error(
                if is_style_rule {
                    "@function rules may not contain style rules."
                } else {
                    "@function rules may not contain declarations."
                },
                self.scanner.relevant_span_from(start),
            );
        }

        let start = self.scanner.offset;
        let name = self.read_plain_at_rule_name()?;
        match name.as_str() {
            "debug" => self.read_debug_rule(start).map(Some),
            "each" => self.read_each_rule(start, Self::read_function_at_rule).map(Some),
            "error" => self.read_error_rule(start).map(Some),
            "for" => self.read_for_rule(start, Self::read_function_at_rule).map(Some),
            "if" => self.read_if_rule(start, Self::read_function_at_rule).map(Some),
            "return" => self.read_return_rule(start).map(Some),
            "warn" => self.read_warn_rule(start).map(Some),
            "while" => self.read_while_rule(start, Self::read_function_at_rule).map(Some),
            _ => self.throw_disallowed_at_rule(start),
        }
    }

    fn read_plain_at_rule_name(&mut self) -> ParseResult<String> {
        self.scanner.expect_char(b'@', Some("@-rule"))?;
        let name = self.read_identifier()?;
        self.scan_whitespace()?;
        Ok(name)
    }

    pub(crate) fn throw_disallowed_at_rule<T>(&mut self, start: Offset) -> ParseResult<T> {
        self.read_almost_any_value(false)?;
        self.error(
            "This at-rule is not allowed here.",
            self.scanner.relevant_span_from(start),
        )
    }

    fn read_at_root_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        if self.scanner.peek() == Some(b'(') {
            let query = self.read_at_root_query()?;
            self.scan_whitespace()?;
            self.with_children(Self::read_child_statement, start, |children| {
                Statement::AtRoot {
                    query: Some(query),
                    children,
                }
            })
        } else if self.looking_at_children()? {
            self.with_children(Self::read_child_statement, start, |children| {
                Statement::AtRoot {
                    query: None,
                    children,
                }
            })
        } else {
            let child = self.read_style_rule()?;
            let span = self.scanner.relevant_span_from(start);
            let id = self.arena().add(
                Statement::AtRoot {
                    query: None,
                    children: vec![child],
                },
                span,
            );
            self.arena().adopt(id, &[child]);
            Ok(id)
        }
    }

    /// Consumes an `@at-root` query of the form `(with: ...)`, leaving its
    /// contents as interpolated text for the evaluator to resolve.
    fn read_at_root_query(&mut self) -> ParseResult<Interpolation> {
        if self.scanner.peek() == Some(b'#') {
            let interpolation = self.read_single_interpolation()?;
            let span = interpolation.span;
            return Ok(Interpolation::expression(interpolation, span));
        }

        let start = self.scanner.offset;
        let mut buffer = InterpolationBuffer::new();
        self.scanner.expect_char(b'(', None)?;
        buffer.write_char('(');
        self.scan_whitespace()?;

        buffer.add_expression(self.read_expression()?);
        if self.scanner.scan_char(b':') {
            self.scan_whitespace()?;
            buffer.write_str(": ");
            buffer.add_expression(self.read_expression()?);
        }

        self.scanner.expect_char(b')', None)?;
        self.scan_whitespace()?;
        buffer.write_char(')');

        Ok(buffer.into_interpolation(self.scanner.relevant_span_from(start)))
    }

    fn read_content_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        if !self.in_mixin {
            return self.error(
                "@content is only allowed within mixin declarations.",
                self.scanner.relevant_span_from(start),
            );
        }

        self.scan_whitespace()?;
        let arguments = if self.scanner.peek() == Some(b'(') {
            self.read_argument_invocation(true, false)?
        } else {
            ArgumentInvocation::empty(self.scanner.relevant_span())
        };

        self.expect_statement_separator(Some("@content rule"))?;
        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(Statement::Content { arguments }, span))
    }

    fn read_debug_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let expression = self.read_expression()?;
        self.expect_statement_separator(Some("@debug rule"))?;
        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(Statement::Debug { expression }, span))
    }

    fn read_each_rule(&mut self, start: Offset, child: ChildParser<'a>) -> ParseResult<NodeId> {
        let was_in_control_directive = self.in_control_directive;
        self.in_control_directive = true;
        let result = self.read_each_rule_inner(start, child);
        self.in_control_directive = was_in_control_directive;
        result
    }

    fn read_each_rule_inner(&mut self, start: Offset, child: ChildParser<'a>) -> ParseResult<NodeId> {
        let mut variables = vec![self.read_variable_name()?];
        self.scan_whitespace()?;
        while self.scanner.scan_char(b',') {
            self.scan_whitespace()?;
            variables.push(self.read_variable_name()?);
            self.scan_whitespace()?;
        }
        self.expect_identifier("in", Some("\"in\""))?;
        self.scan_whitespace()?;
        let list = self.read_expression()?;
        self.with_children(child, start, |children| Statement::Each {
            variables,
            list,
            children,
        })
    }

    fn read_error_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let expression = self.read_expression()?;
        self.expect_statement_separator(Some("@error rule"))?;
        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(Statement::Error { expression }, span))
    }

    fn read_extend_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        if !self.in_style_rule && !self.in_mixin && !self.in_content_block {
            return self.error(
                "@extend may only be used within style rules.",
                self.scanner.relevant_span_from(start),
            );
        }

        let selector = self.read_almost_any_value(false)?;
        let optional = self.scanner.scan_char(b'!');
        if optional {
            self.expect_identifier("optional", Some("\"optional\""))?;
        }
        self.expect_statement_separator(Some("@extend rule"))?;
        let span = self.scanner.relevant_span_from(start);
        Ok(self
            .arena()
            .add(Statement::Extend { selector, optional }, span))
    }

    fn read_for_rule(&mut self, start: Offset, child: ChildParser<'a>) -> ParseResult<NodeId> {
        let was_in_control_directive = self.in_control_directive;
        self.in_control_directive = true;
        let result = self.read_for_rule_inner(start, child);
        self.in_control_directive = was_in_control_directive;
        result
    }

    fn read_for_rule_inner(&mut self, start: Offset, child: ChildParser<'a>) -> ParseResult<NodeId> {
        let variable = self.read_variable_name()?;
        self.scan_whitespace()?;
        self.expect_identifier("from", Some("\"from\""))?;
        self.scan_whitespace()?;
        let from = self.read_single_expression()?;
        self.scan_whitespace()?;

        let inclusive = if self.looking_at_identifier(0) && self.scan_identifier("to")? {
            false
        } else if self.looking_at_identifier(0) && self.scan_identifier("through")? {
            true
        } else {
            return self.error("Expected \"to\" or \"through\".", self.scanner.relevant_span());
        };
        self.scan_whitespace()?;
        let to = self.read_expression()?;

        self.with_children(child, start, |children| Statement::For {
            variable,
            from,
            to,
            inclusive,
            children,
        })
    }

    fn read_function_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let name = self.read_identifier()?;
        self.scan_whitespace()?;
        let arguments = self.read_argument_declaration()?;

        if self.in_mixin || self.in_content_block {
            return self.error(
                "Mixins may not contain function declarations.",
                self.scanner.relevant_span_from(start),
            );
        }
        if self.in_control_directive {
            return self.error(
                "Functions may not be declared in control directives.",
                self.scanner.relevant_span_from(start),
            );
        }

        if matches!(
            unvendor(&name.to_ascii_lowercase()),
            "calc" | "element" | "expression" | "url" | "and" | "or" | "not"
        ) {
            return self.error("Invalid function name.", self.scanner.relevant_span_from(start));
        }

        self.scan_whitespace()?;
        self.with_children(Self::read_function_at_rule, start, |children| {
            Statement::Function {
                name,
                arguments,
                children,
            }
        })
    }

    fn read_if_rule(&mut self, start: Offset, child: ChildParser<'a>) -> ParseResult<NodeId> {
        let if_indentation = self.current_indentation;
        let was_in_control_directive = self.in_control_directive;
        self.in_control_directive = true;
        let result = self.read_if_rule_inner(start, child, if_indentation);
        self.in_control_directive = was_in_control_directive;
        result
    }

    fn read_if_rule_inner(
        &mut self,
        start: Offset,
        child: ChildParser<'a>,
        if_indentation: usize,
    ) -> ParseResult<NodeId> {
        let condition = self.read_expression()?;
        let children = self.read_children(child)?;
        let mut clauses = vec![IfClause {
            condition,
            children,
            span: self.scanner.relevant_span_from(start),
        }];
        let mut else_children: Option<Vec<NodeId>> = None;

        self.scan_whitespace_without_comments();
        while self.scan_else(if_indentation)? {
            self.scan_whitespace()?;
            if self.scan_identifier("if")? {
                self.scan_whitespace()?;
                let clause_start = self.scanner.offset;
                let condition = self.read_expression()?;
                let children = self.read_children(child)?;
                clauses.push(IfClause {
                    condition,
                    children,
                    span: self.scanner.relevant_span_from(clause_start),
                });
            } else {
                else_children = Some(self.read_children(child)?);
                break;
            }
        }
        self.scan_whitespace_without_comments();

        let span = self.scanner.relevant_span_from(start);
        let all_children: Vec<NodeId> = clauses
            .iter()
            .flat_map(|clause| clause.children.iter().copied())
            .chain(else_children.iter().flatten().copied())
            .collect();
        let id = self.arena().add(
            Statement::If {
                clauses,
                else_children,
            },
            span,
        );
        self.arena().adopt(id, &all_children);
        Ok(id)
    }

    // Imports

    fn read_import_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let mut imports = Vec::new();
        loop {
            self.scan_whitespace()?;
            self.scan_import_argument(&mut imports)?;
            self.scan_whitespace()?;
            if !self.scanner.scan_char(b',') {
                break;
            }
        }
        self.expect_statement_separator(Some("@import rule"))?;
        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(Statement::Import { imports }, span))
    }

    fn scan_import_argument(&mut self, imports: &mut Vec<ImportArgument>) -> ParseResult<()> {
        if self.is_indented() && self.scan_indented_import_argument(imports)? {
            return Ok(());
        }

        let start = self.scanner.offset;
        let start_position = self.scanner.position();
        match self.scanner.peek() {
            Some(b'u' | b'U') => {
                let url = self.read_function_or_string_expression()?;
                self.scan_whitespace()?;
                let (supports, media) = self.try_import_queries()?;
                let span = self.scanner.relevant_span_from(start);
                imports.push(ImportArgument::Static {
                    url: Interpolation::expression(url, span),
                    supports,
                    media,
                    span,
                });
                return Ok(());
            }
            _ => {}
        }

        let url = self.read_string()?;
        let raw_url_end = self.scanner.position();
        let url_span = self.scanner.relevant_span_from(start);
        self.scan_whitespace()?;
        let (supports, media) = self.try_import_queries()?;
        if self.is_plain_import_url(&url) || supports.is_some() || media.is_some() {
            // Plain-CSS imports pass the author's spelling through
            // verbatim, quotes included.
            let raw = self.scanner.substring(start_position)[..raw_url_end - start_position]
                .to_string();
            let span = self.scanner.relevant_span_from(start);
            imports.push(ImportArgument::Static {
                url: Interpolation::literal(raw, url_span),
                supports,
                media,
                span,
            });
        } else {
            if self.in_control_directive || self.in_mixin {
                return self.throw_disallowed_at_rule(start);
            }
            imports.push(ImportArgument::Dynamic {
                url,
                span: url_span,
            });
        }
        Ok(())
    }

    /// The indented syntax allows unquoted import URLs terminated by a
    /// comma, semicolon or newline. Returns false when the argument turns
    /// out to be a quoted string or `url(...)` after all.
    fn scan_indented_import_argument(
        &mut self,
        imports: &mut Vec<ImportArgument>,
    ) -> ParseResult<bool> {
        match self.scanner.peek() {
            Some(b'u' | b'U') => {
                let state = self.scanner.state();
                if self.scan_identifier("url")? {
                    if self.scanner.scan_char(b'(') {
                        self.scanner.backtrack(state);
                        return Ok(false);
                    }
                    self.scanner.backtrack(state);
                }
            }
            Some(b'"' | b'\'') => return Ok(false),
            _ => {}
        }

        let start = self.scanner.offset;
        let start_position = self.scanner.position();
        while let Some(next) = self.scanner.peek() {
            if next == b',' || next == b';' || is_newline(next) {
                break;
            }
            self.scanner.read_char()?;
        }
        let url = self.scanner.substring(start_position).to_string();
        let span = self.scanner.relevant_span_from(start);

        if self.is_plain_import_url(&url) {
            imports.push(ImportArgument::Static {
                url: Interpolation::literal(format!("\"{url}\""), span),
                supports: None,
                media: None,
                span,
            });
        } else {
            if self.in_control_directive || self.in_mixin {
                return self.throw_disallowed_at_rule(start);
            }
            imports.push(ImportArgument::Dynamic { url, span });
        }
        Ok(true)
    }

    /// Consumes a `url(...)` that may contain SassScript: either a literal
    /// url token or a real function call.
    pub(crate) fn read_function_or_string_expression(&mut self) -> ParseResult<Expression> {
        let start = self.scanner.offset;
        self.expect_identifier("url", Some("\"url\""))?;
        let name_span = self.scanner.relevant_span_from(start);
        if let Some(contents) = self.try_url_contents(start, None)? {
            let span = self.scanner.relevant_span_from(start);
            return Ok(Expression::new(
                span,
                ExpressionKind::String {
                    text: contents,
                    quoted: false,
                },
            ));
        }

        let arguments = self.read_argument_invocation(false, false)?;
        let span = self.scanner.relevant_span_from(start);
        Ok(Expression::new(
            span,
            ExpressionKind::FunctionCall {
                namespace: None,
                name: Interpolation::literal("url", name_span),
                arguments,
            },
        ))
    }

    /// Whether [url] names an external resource that `@import` passes
    /// through rather than resolving.
    pub(crate) fn is_plain_import_url(&self, url: &str) -> bool {
        if url.len() < 5 {
            return false;
        }
        if url.to_ascii_lowercase().ends_with(".css") {
            return true;
        }
        let bytes = url.as_bytes();
        if bytes[0] == b'/' {
            return bytes[1] == b'/';
        }
        if bytes[0] != b'h' {
            return false;
        }
        let lower = url.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Consumes the `supports(...)` and media-query modifiers that may
    /// follow a plain-CSS `@import` argument.
    pub(crate) fn try_import_queries(
        &mut self,
    ) -> ParseResult<(Option<SupportsCondition>, Option<Interpolation>)> {
        let mut supports = None;
        if self.scan_identifier("supports")? {
            self.scanner.expect_char(b'(', None)?;
            let start = self.scanner.offset;
            if self.scan_identifier("not")? {
                self.scan_whitespace()?;
                let condition = self.read_supports_condition_in_parens()?;
                supports = Some(SupportsCondition::Negation {
                    condition: Box::new(condition),
                    span: self.scanner.relevant_span_from(start),
                });
            } else if self.scanner.peek() == Some(b'(') {
                supports = Some(self.read_supports_condition()?);
            } else {
                let name = self.read_expression()?;
                self.scanner.expect_char(b':', None)?;
                self.scan_whitespace()?;
                let value = self.read_expression()?;
                supports = Some(SupportsCondition::Declaration {
                    name: Box::new(name),
                    value: Box::new(value),
                    span: self.scanner.relevant_span_from(start),
                });
            }
            self.scanner.expect_char(b')', None)?;
            self.scan_whitespace()?;
        }

        let media = if self.scanner.peek() == Some(b'(')
            || self.looking_at_interpolated_identifier()
        {
            Some(self.read_media_query_list()?)
        } else {
            None
        };
        Ok((supports, media))
    }

    fn read_include_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let mut namespace = None;
        let mut name = self.read_identifier()?;
        if self.scanner.scan_char(b'.') {
            namespace = Some(name);
            name = self.read_public_identifier()?;
        }

        self.scan_whitespace()?;
        let arguments = if self.scanner.peek() == Some(b'(') {
            self.read_argument_invocation(true, false)?
        } else {
            ArgumentInvocation::empty(self.scanner.relevant_span_from(start))
        };
        self.scan_whitespace()?;

        let mut content_arguments = None;
        if self.scan_identifier("using")? {
            self.scan_whitespace()?;
            content_arguments = Some(self.read_argument_declaration()?);
            self.scan_whitespace()?;
        }

        let mut content = None;
        if content_arguments.is_some() || self.looking_at_children()? {
            let was_in_content_block = self.in_content_block;
            self.in_content_block = true;
            let block_arguments = content_arguments
                .unwrap_or_else(|| crate::ast::ArgumentDeclaration::empty(self.scanner.relevant_span()));
            let block_start = self.scanner.offset;
            let result = self.read_children(Self::read_child_statement);
            self.in_content_block = was_in_content_block;
            let children = result?;
            let block_span = self.scanner.relevant_span_from(block_start);
            self.scan_whitespace_without_comments();
            content = Some(ContentBlock {
                arguments: block_arguments,
                children,
                span: block_span,
            });
        } else {
            self.expect_statement_separator(None)?;
        }

        let span = self.scanner.relevant_span_from(start);
        let block_children: Vec<NodeId> = content
            .iter()
            .flat_map(|block| block.children.iter().copied())
            .collect();
        let id = self.arena().add(
            Statement::Include {
                namespace,
                name,
                arguments,
                content,
            },
            span,
        );
        self.arena().adopt(id, &block_children);
        Ok(id)
    }

    pub(super) fn read_media_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let query = self.read_media_query_list()?;
        self.with_children(Self::read_child_statement, start, |children| {
            Statement::Media { query, children }
        })
    }

    fn read_mixin_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let name = self.read_identifier()?;
        self.scan_whitespace()?;

        let arguments = if self.scanner.peek() == Some(b'(') {
            self.read_argument_declaration()?
        } else {
            crate::ast::ArgumentDeclaration::empty(self.scanner.relevant_span())
        };

        if self.in_mixin || self.in_content_block {
            return self.error(
                "Mixins may not contain mixin declarations.",
                self.scanner.relevant_span_from(start),
            );
        }
        if self.in_control_directive {
            return self.error(
                "Mixins may not be declared in control directives.",
                self.scanner.relevant_span_from(start),
            );
        }

        self.scan_whitespace()?;
        let was_in_mixin = self.in_mixin;
        self.in_mixin = true;
        let result = self.with_children(Self::read_child_statement, start, |children| {
            Statement::Mixin {
                name,
                arguments,
                children,
            }
        });
        self.in_mixin = was_in_mixin;
        result
    }

    /// Gecko's `@-moz-document` allows `url-prefix` and `domain` to omit
    /// quotation marks, contrary to the standard.
    pub(super) fn read_moz_document_rule(
        &mut self,
        start: Offset,
        name: Interpolation,
    ) -> ParseResult<NodeId> {
        let value_start = self.scanner.offset;
        let mut buffer = InterpolationBuffer::new();
        let mut needs_deprecation_warning = false;

        loop {
            if self.scanner.peek() == Some(b'#') {
                buffer.add_expression(self.read_single_interpolation()?);
                needs_deprecation_warning = true;
            } else {
                let identifier_start = self.scanner.offset;
                let identifier = self.read_identifier()?;
                match identifier.as_str() {
                    "url" | "url-prefix" | "domain" => {
                        if let Some(contents) =
                            self.try_url_contents(identifier_start, Some(&identifier))?
                        {
                            buffer.add_interpolation(contents);
                        } else {
                            self.scanner.expect_char(b'(', None)?;
                            self.scan_whitespace()?;
                            let (argument, _) = self.read_interpolated_string_text()?;
                            self.scanner.expect_char(b')', None)?;
                            buffer.write_str(&identifier);
                            buffer.write_char('(');
                            buffer.add_interpolation(argument);
                            buffer.write_char(')');
                        }

                        // An empty url-prefix is the recognized way of
                        // targeting Gecko and isn't deprecated.
                        let trailing = buffer.trailing_string().to_ascii_lowercase();
                        if !trailing.ends_with("url-prefix()")
                            && !trailing.ends_with("url-prefix('')")
                            && !trailing.ends_with("url-prefix(\"\")")
                        {
                            needs_deprecation_warning = true;
                        }
                    }
                    "regexp" => {
                        buffer.write_str("regexp(");
                        self.scanner.expect_char(b'(', None)?;
                        let (argument, _) = self.read_interpolated_string_text()?;
                        buffer.add_interpolation(argument);
                        self.scanner.expect_char(b')', None)?;
                        buffer.write_char(')');
                        needs_deprecation_warning = true;
                    }
                    _ => {
                        return self.error(
                            "Invalid function name.",
                            self.scanner.relevant_span_from(identifier_start),
                        );
                    }
                }
            }

            self.scan_whitespace()?;
            if !self.scanner.scan_char(b',') {
                break;
            }
            buffer.write_char(',');
            let spaces = self.raw_text(Self::scan_whitespace)?;
            buffer.write_str(&spaces);
        }

        let value = buffer.into_interpolation(self.scanner.relevant_span_from(value_start));
        let rule = self.with_children(Self::read_child_statement, start, |children| {
            Statement::AtRule {
                name,
                value: Some(value),
                children: Some(children),
            }
        })?;

        if needs_deprecation_warning {
            let span = self.arena().node(rule).span;
            self.deprecation(
                "@-moz-document is deprecated and support will be removed from Sass \
                 in a future release. For details, see http://bit.ly/moz-document.",
                span,
            );
        }
        Ok(rule)
    }

    fn read_return_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let expression = self.read_expression()?;
        self.expect_statement_separator(Some("@return rule"))?;
        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(Statement::Return { expression }, span))
    }

    pub(super) fn read_supports_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let condition = self.read_supports_condition()?;
        self.scan_whitespace()?;
        self.with_children(Self::read_child_statement, start, |children| {
            Statement::Supports {
                condition,
                children,
            }
        })
    }

    // Modules

    fn read_use_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let url = self.read_string()?;
        self.scan_whitespace()?;

        let namespace = if self.scan_identifier("as")? {
            self.scan_whitespace()?;
            if self.scanner.scan_char(b'*') {
                Some(None)
            } else {
                Some(Some(self.read_identifier()?))
            }
        } else {
            None
        };
        self.scan_whitespace()?;

        let configuration = self.read_configuration(false)?;

        if !self.use_allowed {
            return self.error(
                "@use rules must be written before any other rules.",
                self.scanner.relevant_span_from(start),
            );
        }
        self.expect_statement_separator(Some("@use rule"))?;

        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(
            Statement::Use {
                url,
                namespace,
                configuration,
            },
            span,
        ))
    }

    fn read_forward_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let url = self.read_string()?;
        self.scan_whitespace()?;

        let prefix = if self.scan_identifier("as")? {
            self.scan_whitespace()?;
            // The trailing dash of `as list-*` is part of the prefix.
            let prefix = self.read_identifier_as_unit()?;
            self.scanner.expect_char(b'*', None)?;
            self.scan_whitespace()?;
            Some(prefix)
        } else {
            None
        };

        let visibility = if self.scan_identifier("show")? {
            Some(ForwardVisibility::Show(self.read_member_list()?))
        } else if self.scan_identifier("hide")? {
            Some(ForwardVisibility::Hide(self.read_member_list()?))
        } else {
            None
        };

        let configuration = self.read_configuration(true)?;
        self.expect_statement_separator(Some("@forward rule"))?;

        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(
            Statement::Forward {
                url,
                prefix,
                visibility,
                configuration,
            },
            span,
        ))
    }

    /// A comma-separated list of `show`/`hide` members; variables keep
    /// their `$` to stay distinguishable from mixins and functions.
    fn read_member_list(&mut self) -> ParseResult<Vec<String>> {
        let mut members = Vec::new();
        loop {
            self.scan_whitespace()?;
            if self.scanner.peek() == Some(b'$') {
                members.push(format!("${}", self.read_variable_name()?));
            } else {
                members.push(self.read_identifier()?);
            }
            self.scan_whitespace()?;
            if !self.scanner.scan_char(b',') {
                break;
            }
        }
        Ok(members)
    }

    fn read_configuration(
        &mut self,
        allow_guarded: bool,
    ) -> ParseResult<Vec<ConfiguredVariable>> {
        if !self.scan_identifier("with")? {
            return Ok(Vec::new());
        }

        let mut configuration: Vec<ConfiguredVariable> = Vec::new();
        self.scan_whitespace()?;
        self.scanner.expect_char(b'(', None)?;
        loop {
            self.scan_whitespace()?;
            let variable_start = self.scanner.offset;
            let name = self.read_variable_name()?;
            self.scan_whitespace()?;
            self.scanner.expect_char(b':', None)?;
            self.scan_whitespace()?;
            let expression = self.read_expression_until_comma(false)?;

            let mut guarded = false;
            let flag_start = self.scanner.offset;
            if allow_guarded && self.scanner.scan_char(b'!') {
                let flag = self.read_identifier()?;
                if flag == "default" {
                    guarded = true;
                    self.scan_whitespace()?;
                } else {
                    return self.error(
                        "Invalid flag name.",
                        self.scanner.relevant_span_from(flag_start),
                    );
                }
            }

            let span = self.scanner.relevant_span_from(variable_start);
            if configuration.iter().any(|variable| variable.name == name) {
                return self.error("The same variable may only be configured once.", span);
            }
            configuration.push(ConfiguredVariable {
                name,
                expression,
                guarded,
                span,
            });

            if !self.scanner.scan_char(b',') {
                break;
            }
            self.scan_whitespace()?;
            if !self.looking_at_expression() {
                break;
            }
        }
        self.scan_whitespace()?;
        self.scanner.expect_char(b')', None)?;
        Ok(configuration)
    }

    fn read_warn_rule(&mut self, start: Offset) -> ParseResult<NodeId> {
        let expression = self.read_expression()?;
        self.expect_statement_separator(Some("@warn rule"))?;
        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(Statement::Warn { expression }, span))
    }

    fn read_while_rule(&mut self, start: Offset, child: ChildParser<'a>) -> ParseResult<NodeId> {
        let was_in_control_directive = self.in_control_directive;
        self.in_control_directive = true;
        let condition = match self.read_expression() {
            Ok(condition) => condition,
            Err(e) => {
                self.in_control_directive = was_in_control_directive;
                return Err(e);
            }
        };
        let result = self.with_children(child, start, |children| Statement::While {
            condition,
            children,
        });
        self.in_control_directive = was_in_control_directive;
        result
    }

    /// Consumes an at-rule Sass doesn't recognize.
    pub(crate) fn read_any_at_rule(
        &mut self,
        start: Offset,
        name: Interpolation,
    ) -> ParseResult<NodeId> {
        let was_in_unknown_at_rule = self.in_unknown_at_rule;
        self.in_unknown_at_rule = true;
        let result = self.read_any_at_rule_inner(start, name);
        self.in_unknown_at_rule = was_in_unknown_at_rule;
        result
    }

    fn read_any_at_rule_inner(
        &mut self,
        start: Offset,
        name: Interpolation,
    ) -> ParseResult<NodeId> {
        let value = if self.scanner.peek() != Some(b'!') && !self.at_end_of_statement() {
            Some(self.read_almost_any_value(false)?)
        } else {
            None
        };

        if self.looking_at_children()? {
            return self.with_children(Self::read_child_statement, start, |children| {
                Statement::AtRule {
                    name,
                    value,
                    children: Some(children),
                }
            });
        }
        self.expect_statement_separator(None)?;
        let span = self.scanner.relevant_span_from(start);
        Ok(self.arena().add(
            Statement::AtRule {
                name,
                value,
                children: None,
            },
            span,
        ))
    }

    // Media queries

    /// Consumes a comma-separated list of media queries as interpolated
    /// text; the resolved text is re-parsed by [`super::MediaQueryParser`]
    /// after evaluation.
    pub(crate) fn read_media_query_list(&mut self) -> ParseResult<Interpolation> {
        let start = self.scanner.offset;
        let mut buffer = InterpolationBuffer::new();
        loop {
            self.scan_whitespace()?;
            self.read_media_query(&mut buffer)?;
            if !self.scanner.scan_char(b',') {
                break;
            }
            buffer.write_str(", ");
        }
        Ok(buffer.into_interpolation(self.scanner.relevant_span_from(start)))
    }

    fn read_media_query(&mut self, buffer: &mut InterpolationBuffer) -> ParseResult<()> {
        if self.scanner.peek() != Some(b'(') {
            let identifier = self.read_interpolated_identifier()?;
            buffer.add_interpolation(identifier);
            self.scan_whitespace()?;

            if !self.looking_at_interpolated_identifier() {
                // For example, "@media screen {".
                return Ok(());
            }

            buffer.write_char(' ');
            let identifier = self.read_interpolated_identifier()?;
            self.scan_whitespace()?;

            if identifier
                .as_plain()
                .is_some_and(|plain| plain.eq_ignore_ascii_case("and"))
            {
                // For example, "@media screen and ...".
                buffer.write_str("and ");
            } else {
                buffer.add_interpolation(identifier);
                if self.scan_identifier("and")? {
                    // For example, "@media only screen and ...".
                    self.scan_whitespace()?;
                    buffer.write_str(" and ");
                } else {
                    // For example, "@media only screen {".
                    return Ok(());
                }
            }
        }

        loop {
            self.scan_whitespace()?;
            let feature = self.read_media_feature()?;
            buffer.add_interpolation(feature);
            self.scan_whitespace()?;
            if !self.scan_identifier("and")? {
                break;
            }
            buffer.write_str(" and ");
        }
        Ok(())
    }

    fn read_media_feature(&mut self) -> ParseResult<Interpolation> {
        if self.scanner.peek() == Some(b'#') {
            let interpolation = self.read_single_interpolation()?;
            let span = interpolation.span;
            return Ok(Interpolation::expression(interpolation, span));
        }

        let start = self.scanner.offset;
        let mut buffer = InterpolationBuffer::new();
        self.scanner.expect_char(b'(', None)?;
        buffer.write_char('(');
        self.scan_whitespace()?;

        buffer.add_expression(self.read_expression_until_comparison()?);
        if self.scanner.scan_char(b':') {
            self.scan_whitespace()?;
            buffer.write_str(": ");
            buffer.add_expression(self.read_expression()?);
        } else if let Some(next) = self.scanner.peek() {
            let is_angle = next == b'<' || next == b'>';
            if is_angle || next == b'=' {
                buffer.write_char(' ');
                self.scanner.scan_char(next);
                buffer.write_char(next as char);
                if is_angle && self.scanner.scan_char(b'=') {
                    buffer.write_char('=');
                }
                buffer.write_char(' ');

                self.scan_whitespace()?;
                buffer.add_expression(self.read_expression_until_comparison()?);

                // Range syntax: "(400px <= width <= 700px)".
                if is_angle && self.scanner.scan_char(next) {
                    buffer.write_char(' ');
                    buffer.write_char(next as char);
                    if self.scanner.scan_char(b'=') {
                        buffer.write_char('=');
                    }
                    buffer.write_char(' ');

                    self.scan_whitespace()?;
                    buffer.add_expression(self.read_expression_until_comparison()?);
                }
            }
        }

        self.scanner.expect_char(b')', None)?;
        self.scan_whitespace()?;
        buffer.write_char(')');

        Ok(buffer.into_interpolation(self.scanner.relevant_span_from(start)))
    }

    fn looking_at_comparison_end(parser: &StylesheetParser<'_>) -> bool {
        match parser.scanner.peek() {
            Some(b'=') => parser.scanner.peek_at(1) != Some(b'='),
            Some(b'<' | b'>') => true,
            _ => false,
        }
    }

    /// Consumes an expression until a top-level `<`, `>`, or a `=` that
    /// isn't `==`.
    fn read_expression_until_comparison(&mut self) -> ParseResult<Expression> {
        self.read_expression_with(false, false, Some(Self::looking_at_comparison_end))
    }

    // Supports conditions

    pub(crate) fn read_supports_condition(&mut self) -> ParseResult<SupportsCondition> {
        let start = self.scanner.offset;
        if self.scan_identifier("not")? {
            self.scan_whitespace()?;
            let condition = self.read_supports_condition_in_parens()?;
            return Ok(SupportsCondition::Negation {
                condition: Box::new(condition),
                span: self.scanner.relevant_span_from(start),
            });
        }

        let mut condition = self.read_supports_condition_in_parens()?;
        self.scan_whitespace()?;
        while self.looking_at_identifier(0) {
            let operator = if self.scan_identifier("or")? {
                "or"
            } else {
                self.expect_identifier("and", Some("\"and\""))?;
                "and"
            };

            self.scan_whitespace()?;
            let right = self.read_supports_condition_in_parens()?;
            condition = SupportsCondition::Operation {
                left: Box::new(condition),
                operator: operator.to_string(),
                right: Box::new(right),
                span: self.scanner.relevant_span_from(start),
            };
            self.scan_whitespace()?;
        }
        Ok(condition)
    }

    fn read_supports_condition_in_parens(&mut self) -> ParseResult<SupportsCondition> {
        let start = self.scanner.offset;
        if self.scanner.peek() == Some(b'#') {
            let expression = self.read_single_interpolation()?;
            return Ok(SupportsCondition::Interpolation {
                expression,
                span: self.scanner.relevant_span_from(start),
            });
        }

        self.scanner.expect_char(b'(', None)?;
        self.scan_whitespace()?;
        if matches!(self.scanner.peek(), Some(b'(' | b'#')) {
            let condition = self.read_supports_condition()?;
            self.scan_whitespace()?;
            self.scanner.expect_char(b')', None)?;
            return Ok(condition);
        }

        if matches!(self.scanner.peek(), Some(b'n' | b'N')) {
            if let Some(negation) = self.try_supports_negation()? {
                self.scanner.expect_char(b')', None)?;
                return Ok(negation);
            }
        }

        let name = self.read_expression()?;
        self.scanner.expect_char(b':', None)?;
        self.scan_whitespace()?;
        let value = self.read_expression()?;
        self.scanner.expect_char(b')', None)?;

        Ok(SupportsCondition::Declaration {
            name: Box::new(name),
            value: Box::new(value),
            span: self.scanner.relevant_span_from(start),
        })
    }

    /// Tries to consume a negated supports condition; backtracks cleanly
    /// when `not` turns out to start a declaration name like `nothing`.
    fn try_supports_negation(&mut self) -> ParseResult<Option<SupportsCondition>> {
        let start = self.scanner.state();
        if !self.scan_identifier("not")? || self.scanner.is_done() {
            self.scanner.backtrack(start);
            return Ok(None);
        }

        match self.scanner.peek() {
            Some(next) if is_whitespace(next) || next == b'(' => {}
            _ => {
                self.scanner.backtrack(start);
                return Ok(None);
            }
        }

        self.scan_whitespace()?;
        let condition = self.read_supports_condition_in_parens()?;
        Ok(Some(SupportsCondition::Negation {
            condition: Box::new(condition),
            span: self.scanner.relevant_span_from(start.offset),
        }))
    }

    // Syntax-variant dispatch

    pub(crate) fn expect_statement_separator(&mut self, name: Option<&str>) -> ParseResult<()> {
        match self.syntax() {
            Syntax::Indented => self.sass_expect_statement_separator(name),
            _ => self.scss_expect_statement_separator(),
        }
    }

    pub(crate) fn at_end_of_statement(&self) -> bool {
        match self.syntax() {
            Syntax::Indented => self.sass_at_end_of_statement(),
            _ => self.scss_at_end_of_statement(),
        }
    }

    pub(crate) fn looking_at_children(&mut self) -> ParseResult<bool> {
        match self.syntax() {
            Syntax::Indented => self.sass_looking_at_children(),
            _ => Ok(self.scss_looking_at_children()),
        }
    }

    pub(crate) fn scan_else(&mut self, if_indentation: usize) -> ParseResult<bool> {
        match self.syntax() {
            Syntax::Indented => self.sass_scan_else(if_indentation),
            _ => self.scss_scan_else(),
        }
    }

    pub(crate) fn read_children(&mut self, child: ChildParser<'a>) -> ParseResult<Vec<NodeId>> {
        match self.syntax() {
            Syntax::Indented => self.sass_read_children(child),
            _ => self.scss_read_children(child),
        }
    }

    pub(crate) fn read_statements(&mut self, statement: ChildParser<'a>) -> ParseResult<Vec<NodeId>> {
        match self.syntax() {
            Syntax::Indented => self.sass_read_statements(statement),
            _ => self.scss_read_statements(statement),
        }
    }

    pub(crate) fn read_silent_comment_statement(&mut self) -> ParseResult<NodeId> {
        match self.syntax() {
            Syntax::Indented => self.sass_read_silent_comment(),
            _ => self.scss_read_silent_comment(),
        }
    }

    pub(crate) fn read_loud_comment_statement(&mut self) -> ParseResult<NodeId> {
        match self.syntax() {
            Syntax::Indented => self.sass_read_loud_comment(),
            _ => self.scss_read_loud_comment(),
        }
    }

    pub(crate) fn style_rule_selector(&mut self) -> ParseResult<Interpolation> {
        match self.syntax() {
            Syntax::Indented => self.sass_style_rule_selector(),
            _ => self.read_almost_any_value(false),
        }
    }

}

#[cfg(test)]
mod tests {
    use brine_source_map::FileId;
    use pretty_assertions::assert_eq;

    use crate::ast::{Statement, StyleSheet};
    use crate::parser::{parse_stylesheet, Syntax};

    fn parse(text: &str) -> StyleSheet {
        parse_stylesheet(text, FileId(0), Syntax::Scss)
            .expect("parse failed")
            .sheet
    }

    fn parse_err(text: &str) -> String {
        parse_stylesheet(text, FileId(0), Syntax::Scss)
            .expect_err("parse unexpectedly succeeded")
            .to_string()
    }

    fn root_children(sheet: &StyleSheet) -> &[crate::ast::NodeId] {
        sheet.node(sheet.root()).kind.children()
    }

    #[test]
    fn style_rule_with_declaration() {
        let sheet = parse(".foo { color: red; }");
        let children = root_children(&sheet);
        assert_eq!(children.len(), 1);
        let rule = sheet.node(children[0]);
        let Statement::StyleRule { selector, children } = &rule.kind else {
            panic!("expected style rule, got {:?}", rule.kind);
        };
        assert_eq!(selector.as_plain(), Some(".foo "));
        assert_eq!(children.len(), 1);
        let Statement::Declaration { name, value, .. } = &sheet.node(children[0]).kind else {
            panic!("expected declaration");
        };
        assert_eq!(name.as_plain(), Some("color"));
        assert!(value.is_some());
    }

    #[test]
    fn pseudo_class_parses_as_nested_selector() {
        let sheet = parse(".foo { &:hover { color: blue; } }");
        let children = root_children(&sheet);
        let Statement::StyleRule { children, .. } = &sheet.node(children[0]).kind else {
            panic!("expected style rule");
        };
        assert!(matches!(
            sheet.node(children[0]).kind,
            Statement::StyleRule { .. }
        ));
    }

    #[test]
    fn ambiguous_name_colon_reparses_as_selector() {
        // `a:hover` looks like a declaration until the `{` proves
        // otherwise.
        let sheet = parse("x { a:hover { color: red; } }");
        let children = root_children(&sheet);
        let Statement::StyleRule { children, .. } = &sheet.node(children[0]).kind else {
            panic!("expected style rule");
        };
        let Statement::StyleRule { selector, .. } = &sheet.node(children[0]).kind else {
            panic!("expected nested style rule");
        };
        assert_eq!(selector.as_plain(), Some("a:hover "));
    }

    #[test]
    fn custom_property_keeps_raw_value() {
        let sheet = parse(".a { --custom: a: b; }");
        let children = root_children(&sheet);
        let Statement::StyleRule { children, .. } = &sheet.node(children[0]).kind else {
            panic!("expected style rule");
        };
        let Statement::Declaration {
            name, custom_value, ..
        } = &sheet.node(children[0]).kind
        else {
            panic!("expected declaration");
        };
        assert_eq!(name.as_plain(), Some("--custom"));
        // The raw value starts right after the colon, leading space and
        // inner colon intact.
        assert_eq!(
            custom_value.as_ref().and_then(|v| v.as_plain()),
            Some(" a: b")
        );
    }

    #[test]
    fn variable_declaration_flags() {
        let sheet = parse("$a: 1 !default;\n$b: 2 !global;");
        let children = root_children(&sheet);
        let Statement::VariableDeclaration { guarded, global, .. } =
            sheet.node(children[0]).kind.clone()
        else {
            panic!("expected variable declaration");
        };
        assert!(guarded);
        assert!(!global);
        let Statement::VariableDeclaration { guarded, global, .. } =
            sheet.node(children[1]).kind.clone()
        else {
            panic!("expected variable declaration");
        };
        assert!(!guarded);
        assert!(global);
    }

    #[test]
    fn namespaced_variable_declaration() {
        let sheet = parse("@use \"theme\";\ntheme.$primary: blue;");
        let children = root_children(&sheet);
        let Statement::VariableDeclaration { namespace, name, .. } =
            &sheet.node(children[1]).kind
        else {
            panic!("expected variable declaration");
        };
        assert_eq!(namespace.as_deref(), Some("theme"));
        assert_eq!(name, "primary");

        assert_eq!(
            parse_err("theme.$x: 1 !global;"),
            "!global isn't allowed for variables in other modules."
        );
    }

    #[test]
    fn nested_properties() {
        let sheet = parse(".a { font: { family: serif; size: 12px; } }");
        let children = root_children(&sheet);
        let Statement::StyleRule { children, .. } = &sheet.node(children[0]).kind else {
            panic!("expected style rule");
        };
        let Statement::Declaration { children, value, .. } = &sheet.node(children[0]).kind
        else {
            panic!("expected declaration");
        };
        assert!(value.is_none());
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn at_rule_dispatch() {
        let sheet = parse(
            "@media screen and (min-width: 100px) { .a { color: red; } }\n\
             @supports (display: grid) { .b { color: blue; } }\n\
             @unknown some value;",
        );
        let children = root_children(&sheet);
        assert!(matches!(sheet.node(children[0]).kind, Statement::Media { .. }));
        assert!(matches!(
            sheet.node(children[1]).kind,
            Statement::Supports { .. }
        ));
        let Statement::AtRule { name, value, children } = &sheet.node(children[2]).kind else {
            panic!("expected unknown at-rule");
        };
        assert_eq!(name.as_plain(), Some("unknown"));
        assert_eq!(value.as_ref().and_then(|v| v.as_plain()), Some("some value"));
        assert!(children.is_none());
    }

    #[test]
    fn media_query_feature_text() {
        let sheet = parse("@media screen and (min-width: 100px) { .a { color: red; } }");
        let children = root_children(&sheet);
        let Statement::Media { query, .. } = &sheet.node(children[0]).kind else {
            panic!("expected media rule");
        };
        assert_eq!(query.initial_plain(), "screen and (");
    }

    #[test]
    fn if_else_chain() {
        let sheet = parse(
            "@mixin m($x) {\n\
             @if $x == 1 { a: b; } @else if $x == 2 { c: d; } @else { e: f; }\n\
             }",
        );
        let children = root_children(&sheet);
        let Statement::Mixin { children, .. } = &sheet.node(children[0]).kind else {
            panic!("expected mixin");
        };
        let Statement::If {
            clauses,
            else_children,
        } = &sheet.node(children[0]).kind
        else {
            panic!("expected if rule");
        };
        assert_eq!(clauses.len(), 2);
        assert_eq!(else_children.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn elseif_spelling_is_accepted_with_deprecation() {
        let outcome = parse_stylesheet(
            "@mixin m($x) { @if $x { a: b; } @elseif $x { c: d; } }",
            FileId(0),
            Syntax::Scss,
        )
        .expect("parse failed");
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.message.contains("@elseif")));
    }

    #[test]
    fn content_outside_mixin_is_an_error() {
        assert_eq!(
            parse_err(".a { @content; }"),
            "@content is only allowed within mixin declarations."
        );
    }

    #[test]
    fn extend_outside_style_rule_is_an_error() {
        assert_eq!(
            parse_err("@extend .foo;"),
            "@extend may only be used within style rules."
        );
    }

    #[test]
    fn return_at_statement_level_is_disallowed() {
        assert_eq!(parse_err("@return 1;"), "This at-rule is not allowed here.");
    }

    #[test]
    fn function_rule_rejects_style_rules() {
        assert_eq!(
            parse_err("@function f() { .a { color: red; } }"),
            "@function rules may not contain style rules."
        );
    }

    #[test]
    fn import_classification() {
        let sheet = parse(
            "@import \"theme.css\";\n@import \"partial\";\n@import url(foo);\n\
             @import \"screen\" screen;",
        );
        let children = root_children(&sheet);
        use crate::ast::ImportArgument;
        let Statement::Import { imports } = &sheet.node(children[0]).kind else {
            panic!("expected import");
        };
        assert!(matches!(imports[0], ImportArgument::Static { .. }));
        let Statement::Import { imports } = &sheet.node(children[1]).kind else {
            panic!("expected import");
        };
        assert!(
            matches!(&imports[0], ImportArgument::Dynamic { url, .. } if url == "partial")
        );
        let Statement::Import { imports } = &sheet.node(children[2]).kind else {
            panic!("expected import");
        };
        assert!(matches!(imports[0], ImportArgument::Static { .. }));
        let Statement::Import { imports } = &sheet.node(children[3]).kind else {
            panic!("expected import");
        };
        assert!(
            matches!(&imports[0], ImportArgument::Static { media: Some(_), .. })
        );
    }

    #[test]
    fn use_must_come_first() {
        let sheet = parse("@use \"a\" as b;\n.x { color: red; }");
        let children = root_children(&sheet);
        let Statement::Use { url, namespace, .. } = &sheet.node(children[0]).kind else {
            panic!("expected use rule");
        };
        assert_eq!(url, "a");
        assert_eq!(namespace, &Some(Some("b".to_string())));

        assert_eq!(
            parse_err(".x { color: red; }\n@use \"a\";"),
            "@use rules must be written before any other rules."
        );
    }

    #[test]
    fn forward_show_and_configuration() {
        let sheet = parse("@forward \"src/list\" as list-* show $horizontal, list-reset with ($depth: 2 !default);");
        let children = root_children(&sheet);
        let Statement::Forward {
            prefix,
            visibility,
            configuration,
            ..
        } = &sheet.node(children[0]).kind
        else {
            panic!("expected forward rule");
        };
        assert_eq!(prefix.as_deref(), Some("list-"));
        use crate::ast::ForwardVisibility;
        assert_eq!(
            visibility,
            &Some(ForwardVisibility::Show(vec![
                "$horizontal".to_string(),
                "list-reset".to_string()
            ]))
        );
        assert!(configuration[0].guarded);
    }

    #[test]
    fn include_with_content_block() {
        let sheet = parse("@include theme($color: blue) using ($c) { color: $c; }");
        let children = root_children(&sheet);
        let Statement::Include {
            name,
            arguments,
            content,
            ..
        } = &sheet.node(children[0]).kind
        else {
            panic!("expected include");
        };
        assert_eq!(name, "theme");
        assert_eq!(arguments.named.len(), 1);
        let content = content.as_ref().expect("content block");
        assert_eq!(content.arguments.arguments.len(), 1);
        assert_eq!(content.children.len(), 1);
    }

    #[test]
    fn each_with_multiple_variables() {
        let sheet = parse("@each $key, $value in $map { a: $value; }");
        let children = root_children(&sheet);
        let Statement::Each { variables, .. } = &sheet.node(children[0]).kind else {
            panic!("expected each rule");
        };
        assert_eq!(variables, &["key".to_string(), "value".to_string()]);
    }

    #[test]
    fn for_through_is_inclusive() {
        let sheet = parse("@for $i from 1 through 3 { a: $i; }");
        let children = root_children(&sheet);
        let Statement::For { inclusive, .. } = sheet.node(children[0]).kind.clone() else {
            panic!("expected for rule");
        };
        assert!(inclusive);
    }

    #[test]
    fn supports_negation() {
        use crate::ast::SupportsCondition;
        let sheet = parse("@supports not (display: grid) { a { b: c; } }");
        let children = root_children(&sheet);
        let Statement::Supports { condition, .. } = &sheet.node(children[0]).kind else {
            panic!("expected supports rule");
        };
        assert!(matches!(condition, SupportsCondition::Negation { .. }));
    }

    #[test]
    fn supports_operation_chain() {
        use crate::ast::SupportsCondition;
        let sheet = parse("@supports (display: grid) and (color: red) { a { b: c; } }");
        let children = root_children(&sheet);
        let Statement::Supports { condition, .. } = &sheet.node(children[0]).kind else {
            panic!("expected supports rule");
        };
        let SupportsCondition::Operation { operator, left, right, .. } = condition else {
            panic!("expected operation, got {condition:?}");
        };
        assert_eq!(operator, "and");
        assert!(matches!(**left, SupportsCondition::Declaration { .. }));
        assert!(matches!(**right, SupportsCondition::Declaration { .. }));
    }

    #[test]
    fn at_root_variants() {
        let sheet = parse("@at-root (without: media) { .a { b: c; } }\n@at-root .b { c: d; }");
        let children = root_children(&sheet);
        let Statement::AtRoot { query, .. } = &sheet.node(children[0]).kind else {
            panic!("expected at-root rule");
        };
        // The query keeps its parts as expressions for later resolution.
        let query = query.as_ref().expect("query");
        assert_eq!(query.initial_plain(), "(");
        assert_eq!(query.parts.len(), 5);
        let Statement::AtRoot { query, children } = &sheet.node(children[1]).kind else {
            panic!("expected at-root rule");
        };
        assert!(query.is_none());
        assert!(matches!(
            sheet.node(children[0]).kind,
            Statement::StyleRule { .. }
        ));
    }

    #[test]
    fn charset_is_consumed_without_a_node() {
        let sheet = parse("@charset \"utf-8\";\n.a { b: c; }");
        assert_eq!(root_children(&sheet).len(), 1);
    }

    #[test]
    fn unmatched_closing_brace_is_an_error() {
        assert_eq!(parse_err("}"), "unmatched \"}\".");
    }

    #[test]
    fn parent_links_allow_bubbling() {
        let sheet = parse("@media screen { .a { color: red; } }");
        let children = root_children(&sheet);
        let Statement::Media { children: rules, .. } = &sheet.node(children[0]).kind else {
            panic!("expected media rule");
        };
        let Statement::StyleRule { children: decls, .. } = &sheet.node(rules[0]).kind else {
            panic!("expected style rule");
        };
        let media = sheet.nearest_ancestor(decls[0], |s| matches!(s, Statement::Media { .. }));
        assert_eq!(media, Some(children[0]));
    }

    #[test]
    fn backtracking_restores_exact_position() {
        // Property 2: a failed declaration trial must leave no trace.
        let sheet = parse("x { a:hover:focus { color: red; } }");
        let children = root_children(&sheet);
        let Statement::StyleRule { children, .. } = &sheet.node(children[0]).kind else {
            panic!("expected style rule");
        };
        let Statement::StyleRule { selector, .. } = &sheet.node(children[0]).kind else {
            panic!("expected nested selector");
        };
        assert_eq!(selector.as_plain(), Some("a:hover:focus "));
    }
}
