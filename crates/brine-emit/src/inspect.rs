//! Serialization of individual statements and values.
//!
//! [`Inspect`] renders one statement or value at a time on top of the
//! scheduling [`Emitter`]. It has two registers: CSS mode, used for real
//! output, where nulls vanish and maps are an error, and inspect mode,
//! used for debugging output and error messages, where every value has a
//! faithful textual form.

use brine_source_map::{SourceMapBuilder, Span};
use brine_syntax::ast::{ListSeparator, MediaQuery};
use brine_syntax::color_names;

use crate::emitter::{Emitter, OutputBuffer};
use crate::error::{EmitError, EmitResult};
use crate::style::OutputOptions;
use crate::tree::{CalcExpr, CalcOperator, CssStmt, Value};

pub struct Inspect {
    pub(crate) emitter: Emitter,
    /// When false, quoted strings render without their quotes.
    pub quotes: bool,
    /// Renders values for human eyes rather than for a CSS consumer.
    pub inspect_mode: bool,
    /// Paths indexed by `FileId`, consulted for source comments.
    source_paths: Vec<String>,
}

/// Renders a value in inspect mode, as used in error messages and
/// `@debug` output.
pub fn inspect_value(value: &Value) -> EmitResult<String> {
    let mut inspect = Inspect::new(OutputOptions::default(), None);
    inspect.inspect_mode = true;
    inspect.visit_value(value)?;
    Ok(inspect.into_buffer().text)
}

impl Inspect {
    pub fn new(options: OutputOptions, srcmap: Option<SourceMapBuilder>) -> Self {
        Inspect {
            emitter: Emitter::new(options, srcmap),
            quotes: true,
            inspect_mode: false,
            source_paths: Vec::new(),
        }
    }

    pub fn set_source_paths(&mut self, paths: Vec<String>) {
        self.source_paths = paths;
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn emitter_mut(&mut self) -> &mut Emitter {
        &mut self.emitter
    }

    pub fn into_buffer(self) -> OutputBuffer {
        self.emitter.finish()
    }

    pub fn visit_stmt(&mut self, stmt: &CssStmt) -> EmitResult<()> {
        match stmt {
            CssStmt::StyleRule {
                selector,
                children,
                span,
            } => {
                self.write_source_comment(*span);
                self.emitter.append_indentation();
                self.emitter.append_token(&selector.text, selector.span);
                self.visit_block(children, *span)
            }
            CssStmt::Media {
                queries,
                children,
                span,
            } => {
                self.emitter.append_indentation();
                self.emitter.append_token("@media", *span);
                self.emitter.append_mandatory_space();
                for (index, query) in queries.iter().enumerate() {
                    if index > 0 {
                        self.emitter.append_comma_separator();
                        self.emitter.append_special_linefeed();
                    }
                    self.emitter
                        .append_token(&media_query_text(query), query.span);
                }
                self.visit_block(children, *span)
            }
            CssStmt::Supports {
                condition,
                children,
                span,
            } => {
                self.emitter.append_indentation();
                self.emitter.append_token("@supports", *span);
                self.emitter.append_mandatory_space();
                self.emitter.append_token(&condition.text, condition.span);
                self.visit_block(children, *span)
            }
            CssStmt::AtRule {
                name,
                value,
                children,
                span,
            } => {
                self.emitter.append_indentation();
                let text = format!("@{}", name.text);
                self.emitter.append_token(&text, name.span);
                if let Some(value) = value {
                    self.emitter.append_mandatory_space();
                    self.emitter.append_token(&value.text, value.span);
                }
                match children {
                    Some(children) => self.visit_block(children, *span),
                    None => {
                        self.emitter.append_delimiter();
                        Ok(())
                    }
                }
            }
            CssStmt::KeyframeBlock {
                selectors,
                children,
                span,
            } => {
                self.emitter.append_indentation();
                for (index, selector) in selectors.iter().enumerate() {
                    if index > 0 {
                        self.emitter.append_comma_separator();
                    }
                    self.emitter.append_string(selector);
                }
                self.visit_block(children, *span)
            }
            CssStmt::Declaration {
                name,
                value,
                custom,
                span: _,
            } => {
                let was_declaration = self.emitter.in_declaration;
                let was_custom = self.emitter.in_custom_property;
                self.emitter.in_declaration = true;
                self.emitter.in_custom_property = *custom;

                self.emitter.append_indentation();
                self.emitter.append_token(&name.text, name.span);
                self.emitter.append_colon_separator();
                let result = if *custom {
                    self.write_custom_property_value(value)
                } else {
                    self.visit_value(value)
                };

                self.emitter.in_declaration = was_declaration;
                self.emitter.in_custom_property = was_custom;
                result?;
                self.emitter.append_delimiter();
                Ok(())
            }
            CssStmt::Comment {
                text,
                preserved,
                span,
            } => {
                let style = self.emitter.options().style;
                if (style.is_compressed() || style.is_compact()) && !preserved {
                    return Ok(());
                }
                self.emitter.append_indentation();
                self.emitter.append_token(text, *span);
                if self.emitter.indentation == 0 {
                    self.emitter.append_mandatory_linefeed();
                } else {
                    self.emitter.append_optional_linefeed();
                }
                Ok(())
            }
            CssStmt::Import {
                url,
                supports,
                media,
                span,
                ..
            } => {
                self.emitter.append_indentation();
                self.emitter.append_token("@import", *span);
                self.emitter.append_mandatory_space();
                self.emitter.append_token(&url.text, url.span);
                if let Some(supports) = supports {
                    self.emitter.append_mandatory_space();
                    self.emitter.append_token(&supports.text, supports.span);
                }
                for (index, query) in media.iter().enumerate() {
                    if index == 0 {
                        self.emitter.append_mandatory_space();
                    } else {
                        self.emitter.append_comma_separator();
                    }
                    self.emitter
                        .append_token(&media_query_text(query), query.span);
                }
                self.emitter.append_delimiter();
                Ok(())
            }
        }
    }

    /// `/* line N, path */` ahead of a style rule, when the option is on.
    fn write_source_comment(&mut self, span: Span) {
        if !self.emitter.options().source_comments
            || self.emitter.options().style.is_compressed()
            || span.file.is_synthetic()
        {
            return;
        }
        let line = span.start.line + 1;
        let comment = match self.source_paths.get(span.file.0) {
            Some(path) => format!("/* line {line}, {path} */"),
            None => format!("/* line {line} */"),
        };
        self.emitter.append_indentation();
        self.emitter.append_string(&comment);
        self.emitter.append_optional_linefeed();
    }

    fn visit_block(&mut self, children: &[CssStmt], span: Span) -> EmitResult<()> {
        self.emitter.append_scope_opener(Some(span));
        let style = self.emitter.options().style;
        for child in children {
            if child.is_invisible(style) {
                continue;
            }
            self.visit_stmt(child)?;
        }
        self.emitter.append_scope_closer(Some(span));
        Ok(())
    }

    /// Custom property values are passed through verbatim, except that a
    /// run of trailing blank lines collapses to a single space.
    fn write_custom_property_value(&mut self, value: &Value) -> EmitResult<()> {
        if let Value::String { text, .. } = value {
            let trimmed = trim_trailing_lines(text);
            self.emitter.append_token(&trimmed, value.span());
            Ok(())
        } else {
            self.visit_value(value)
        }
    }

    pub fn visit_value(&mut self, value: &Value) -> EmitResult<()> {
        match value {
            Value::String { text, quoted, span } => {
                let rendered = if *quoted && self.quotes {
                    render_quoted_string(text)
                } else {
                    render_unquoted_string(text)
                };
                self.emitter.append_token(&rendered, *span);
                Ok(())
            }
            Value::Number {
                value,
                unit,
                as_slash,
                span,
            } => {
                if let Some(pair) = as_slash {
                    self.visit_value(&pair.0)?;
                    self.emitter.append_char('/');
                    self.visit_value(&pair.1)?;
                    return Ok(());
                }
                let text = self.number_text(*value, unit);
                self.emitter.append_token(&text, *span);
                Ok(())
            }
            Value::Color {
                red,
                green,
                blue,
                alpha,
                original,
                span,
            } => {
                let text = self.color_text(*red, *green, *blue, *alpha, original.as_deref());
                self.emitter.append_token(&text, *span);
                Ok(())
            }
            Value::List {
                elements,
                separator,
                brackets,
                span,
            } => self.visit_list(elements, *separator, *brackets, *span),
            Value::Map { entries, span } => {
                if !self.inspect_mode {
                    return Err(EmitError::invalid_css_value(
                        format!("{} isn't a valid CSS value.", inspect_value(value)?),
                        *span,
                    ));
                }
                self.emitter.append_char('(');
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        self.emitter.append_string(", ");
                    }
                    self.visit_value(key)?;
                    self.emitter.append_string(": ");
                    self.visit_value(value)?;
                }
                self.emitter.append_char(')');
                Ok(())
            }
            Value::Calculation {
                name,
                arguments,
                span,
            } => {
                let compressed = self.emitter.options().style.is_compressed();
                let joiner = if compressed { "," } else { ", " };
                let arguments: Vec<String> = arguments
                    .iter()
                    .map(|argument| self.calc_expr_text(argument))
                    .collect();
                let text = format!("{name}({})", arguments.join(joiner));
                self.emitter.append_token(&text, *span);
                Ok(())
            }
            Value::Boolean { value, span } => {
                self.emitter
                    .append_token(if *value { "true" } else { "false" }, *span);
                Ok(())
            }
            Value::Null { span } => {
                if self.inspect_mode {
                    self.emitter.append_token("null", *span);
                }
                Ok(())
            }
        }
    }

    fn visit_list(
        &mut self,
        elements: &[Value],
        separator: ListSeparator,
        brackets: bool,
        span: Span,
    ) -> EmitResult<()> {
        if elements.is_empty() {
            if brackets {
                self.emitter.append_string("[]");
                return Ok(());
            }
            if self.inspect_mode {
                self.emitter.append_string("()");
                return Ok(());
            }
            return Err(EmitError::invalid_css_value(
                "() isn't a valid CSS value.".to_string(),
                span,
            ));
        }

        // A single-element comma list needs a trailing comma to survive a
        // round trip through inspect output.
        let singleton = self.inspect_mode
            && elements.len() == 1
            && separator == ListSeparator::Comma
            && !brackets;

        if brackets {
            self.emitter.append_char('[');
            self.emitter.parentheses_opened = true;
        } else if singleton {
            self.emitter.append_char('(');
            self.emitter.parentheses_opened = true;
        }

        let was_comma_array = self.emitter.in_comma_array;
        if separator == ListSeparator::Comma {
            self.emitter.in_comma_array = true;
        }

        let mut first = true;
        let mut result = Ok(());
        for element in elements {
            if !self.inspect_mode && element.is_blank() {
                continue;
            }
            if !first {
                if separator == ListSeparator::Comma {
                    self.emitter.append_comma_separator();
                } else {
                    self.emitter.append_mandatory_space();
                }
            }
            first = false;
            result = if element_needs_parens(separator, element) {
                self.visit_parenthesized(element)
            } else {
                self.visit_value(element)
            };
            if result.is_err() {
                break;
            }
        }

        self.emitter.in_comma_array = was_comma_array;
        result?;

        if singleton {
            self.emitter.append_char(',');
            self.emitter.append_char(')');
        }
        if brackets {
            self.emitter.append_char(']');
        }
        Ok(())
    }

    fn visit_parenthesized(&mut self, element: &Value) -> EmitResult<()> {
        self.emitter.append_char('(');
        self.emitter.parentheses_opened = true;
        self.visit_value(element)?;
        self.emitter.append_char(')');
        Ok(())
    }

    fn number_text(&self, value: f64, unit: &str) -> String {
        if !value.is_finite() {
            let inner = self.non_finite_text(value, unit);
            if self.inspect_mode {
                return inner;
            }
            return format!("calc({inner})");
        }
        let mut text = format_number(value, self.emitter.options().precision);
        text.push_str(unit);
        text
    }

    /// `NaN` and the infinities have no numeric literal, so in CSS output
    /// they ride inside a `calc()`, multiplied back into their unit.
    fn non_finite_text(&self, value: f64, unit: &str) -> String {
        let base = if value.is_nan() {
            "NaN"
        } else if value > 0.0 {
            "infinity"
        } else {
            "-infinity"
        };
        if unit.is_empty() {
            base.to_string()
        } else if self.emitter.options().style.is_compressed() {
            format!("{base}*1{unit}")
        } else {
            format!("{base} * 1{unit}")
        }
    }

    fn color_text(
        &self,
        red: f64,
        green: f64,
        blue: f64,
        alpha: f64,
        original: Option<&str>,
    ) -> String {
        let r = clamp_channel(red);
        let g = clamp_channel(green);
        let b = clamp_channel(blue);
        let alpha = if alpha.is_nan() {
            1.0
        } else {
            alpha.clamp(0.0, 1.0)
        };
        let compressed = self.emitter.options().style.is_compressed();

        if alpha < 1.0 {
            let a = format_number(alpha, self.emitter.options().precision);
            return if compressed {
                format!("rgba({r},{g},{b},{a})")
            } else {
                format!("rgba({r}, {g}, {b}, {a})")
            };
        }

        if compressed {
            let hex = if is_doublet(r) && is_doublet(g) && is_doublet(b) {
                format!("#{:x}{:x}{:x}", r & 0xF, g & 0xF, b & 0xF)
            } else {
                format!("#{r:02x}{g:02x}{b:02x}")
            };
            return match color_names::name_for_color(r, g, b) {
                Some(name) if name.len() < hex.len() => name.to_string(),
                _ => hex,
            };
        }

        match original {
            Some(original) => original.to_string(),
            None => format!("#{r:02x}{g:02x}{b:02x}"),
        }
    }

    fn calc_expr_text(&self, expr: &CalcExpr) -> String {
        match expr {
            CalcExpr::Number { value, unit, .. } => {
                if value.is_finite() {
                    let mut text = format_number(*value, self.emitter.options().precision);
                    text.push_str(unit);
                    text
                } else {
                    self.non_finite_text(*value, unit)
                }
            }
            CalcExpr::String { text, .. } => text.clone(),
            CalcExpr::Operation { op, lhs, rhs, .. } => {
                let compressed = self.emitter.options().style.is_compressed();
                let mut out = String::new();

                let lhs_parens = matches!(
                    &**lhs,
                    CalcExpr::Operation { op: inner, .. }
                        if inner.precedence() < op.precedence()
                );
                if lhs_parens {
                    out.push('(');
                    out.push_str(&self.calc_expr_text(lhs));
                    out.push(')');
                } else {
                    out.push_str(&self.calc_expr_text(lhs));
                }

                // Whitespace around + and - is part of the calc grammar.
                if compressed && op.precedence() == 2 {
                    out.push_str(op.token());
                } else {
                    out.push(' ');
                    out.push_str(op.token());
                    out.push(' ');
                }

                if calc_rhs_needs_parens(*op, rhs) {
                    out.push('(');
                    out.push_str(&self.calc_expr_text(rhs));
                    out.push(')');
                } else {
                    out.push_str(&self.calc_expr_text(rhs));
                }
                out
            }
        }
    }
}

/// Whether a list element must be parenthesized to keep its own separator
/// distinguishable from the containing list's.
fn element_needs_parens(separator: ListSeparator, element: &Value) -> bool {
    match element {
        Value::List {
            elements,
            separator: inner,
            brackets,
            ..
        } => {
            if elements.len() < 2 || *brackets {
                return false;
            }
            if separator == ListSeparator::Comma {
                *inner == ListSeparator::Comma
            } else {
                *inner != ListSeparator::Undecided
            }
        }
        _ => false,
    }
}

fn calc_rhs_needs_parens(op: CalcOperator, rhs: &CalcExpr) -> bool {
    match rhs {
        CalcExpr::Operation { op: inner, .. } => match op {
            CalcOperator::Divide => true,
            CalcOperator::Plus => false,
            _ => inner.precedence() == 1,
        },
        CalcExpr::Number { value, unit, .. } => {
            op == CalcOperator::Divide && (!value.is_finite() || !is_plain_css_unit(unit))
        }
        CalcExpr::String { .. } => false,
    }
}

/// A unit a CSS consumer could parse: a single name with no numerator or
/// denominator structure.
fn is_plain_css_unit(unit: &str) -> bool {
    !unit.contains('*') && !unit.contains('/')
}

fn clamp_channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0).round() as u8
}

fn is_doublet(value: u8) -> bool {
    value >> 4 == value & 0xF
}

/// Fixed-precision formatting with trailing zeros stripped, so `1.0`
/// prints as `1` and `-0` collapses to `0`.
pub(crate) fn format_number(value: f64, precision: usize) -> String {
    let mut text = format!("{value:.precision$}");
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if text == "-0" || text.is_empty() {
        "0".to_string()
    } else {
        text
    }
}

pub(crate) fn media_query_text(query: &MediaQuery) -> String {
    let mut out = String::new();
    if let Some(modifier) = &query.modifier {
        out.push_str(modifier);
        out.push(' ');
    }
    if let Some(media_type) = &query.media_type {
        out.push_str(media_type);
        if !query.features.is_empty() {
            out.push_str(" and ");
        }
    }
    out.push_str(&query.features.join(" and "));
    out
}

fn render_quoted_string(text: &str) -> String {
    let has_single = text.contains('\'');
    let has_double = text.contains('"');
    let quote = if has_double && !has_single { '\'' } else { '"' };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    let chars: Vec<char> = text.chars().collect();
    for (index, &ch) in chars.iter().enumerate() {
        if ch == quote || ch == '\\' {
            out.push('\\');
            out.push(ch);
        } else if (ch as u32) < 0x20 {
            // CSS escape: the hex form ends at the first non-hex character,
            // so a following hex digit or space forces an explicit gap.
            out.push('\\');
            out.push_str(&format!("{:x}", ch as u32));
            if let Some(&next) = chars.get(index + 1) {
                if next.is_ascii_hexdigit() || next == ' ' || next == '\t' {
                    out.push(' ');
                }
            }
        } else {
            out.push(ch);
        }
    }
    out.push(quote);
    out
}

fn render_unquoted_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_newline = false;
    for ch in text.chars() {
        if ch == '\n' {
            out.push(' ');
            after_newline = true;
        } else if after_newline && ch == ' ' {
            // Collapsed into the space that replaced the newline.
        } else {
            out.push(ch);
            after_newline = false;
        }
    }
    out
}

/// Replaces a run of trailing blank lines with a single space.
fn trim_trailing_lines(text: &str) -> String {
    let trimmed = text.trim_end_matches([' ', '\t', '\n', '\r']);
    if text[trimmed.len()..].contains('\n') {
        let mut out = trimmed.to_string();
        out.push(' ');
        out
    } else {
        text.to_string()
    }
}
