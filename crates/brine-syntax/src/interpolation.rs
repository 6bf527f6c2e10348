//! Interpolation: alternating literal text and embedded expressions.
//!
//! Nearly every textual position in the grammar (identifiers, strings,
//! selectors, at-rule preludes, media features) may contain `#{...}`
//! segments, so those positions are uniformly typed as [`Interpolation`].
//! A plain identifier is just an interpolation with a single literal run.

use brine_source_map::Span;

use crate::ast::Expression;

#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationPart {
    Text(String),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    pub parts: Vec<InterpolationPart>,
    pub span: Span,
}

impl Interpolation {
    pub fn new(parts: Vec<InterpolationPart>, span: Span) -> Self {
        Interpolation { parts, span }
    }

    /// An interpolation holding a single literal run.
    pub fn literal(text: impl Into<String>, span: Span) -> Self {
        Interpolation {
            parts: vec![InterpolationPart::Text(text.into())],
            span,
        }
    }

    /// An interpolation wrapping a single expression.
    pub fn expression(expression: Expression, span: Span) -> Self {
        Interpolation {
            parts: vec![InterpolationPart::Expression(expression)],
            span,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The contents if this contains no expressions; `None` otherwise.
    pub fn as_plain(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [] => Some(""),
            [InterpolationPart::Text(text)] => Some(text),
            _ => None,
        }
    }

    /// The leading literal run, which may be empty.
    pub fn initial_plain(&self) -> &str {
        match self.parts.first() {
            Some(InterpolationPart::Text(text)) => text,
            _ => "",
        }
    }
}

/// Builder that merges adjacent literal runs while interleaving
/// expressions.
#[derive(Debug, Clone, Default)]
pub struct InterpolationBuffer {
    parts: Vec<InterpolationPart>,
    text: String,
}

impl InterpolationBuffer {
    pub fn new() -> Self {
        InterpolationBuffer::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.text.is_empty()
    }

    pub fn write_char(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn write_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    /// The literal text accumulated since the last expression.
    pub fn trailing_string(&self) -> &str {
        &self.text
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.parts
                .push(InterpolationPart::Text(std::mem::take(&mut self.text)));
        }
    }

    pub fn add_expression(&mut self, expression: Expression) {
        self.flush_text();
        self.parts.push(InterpolationPart::Expression(expression));
    }

    /// Appends all of [other]'s parts, merging literal runs at the seam.
    pub fn add_interpolation(&mut self, other: Interpolation) {
        for part in other.parts {
            match part {
                InterpolationPart::Text(text) => self.text.push_str(&text),
                InterpolationPart::Expression(e) => self.add_expression(e),
            }
        }
    }

    /// A snapshot of the current contents, leaving the buffer usable.
    pub fn interpolation(&self, span: Span) -> Interpolation {
        let mut parts = self.parts.clone();
        if !self.text.is_empty() {
            parts.push(InterpolationPart::Text(self.text.clone()));
        }
        Interpolation::new(parts, span)
    }

    pub fn into_interpolation(mut self, span: Span) -> Interpolation {
        self.flush_text();
        Interpolation::new(self.parts, span)
    }
}

#[cfg(test)]
mod tests {
    use brine_source_map::{FileId, Offset};

    use super::*;
    use crate::ast::ExpressionKind;

    fn span() -> Span {
        Span::at(FileId(0), Offset::ZERO)
    }

    fn expr() -> Expression {
        Expression {
            span: span(),
            kind: ExpressionKind::Null,
        }
    }

    #[test]
    fn plain_identifier_is_single_literal_run() {
        let itpl = Interpolation::literal("color", span());
        assert_eq!(itpl.as_plain(), Some("color"));
        assert_eq!(itpl.initial_plain(), "color");
    }

    #[test]
    fn buffer_merges_adjacent_text() {
        let mut buffer = InterpolationBuffer::new();
        buffer.write_str("a");
        buffer.write_char('b');
        buffer.add_interpolation(Interpolation::literal("c", span()));
        let itpl = buffer.into_interpolation(span());
        assert_eq!(itpl.as_plain(), Some("abc"));
    }

    #[test]
    fn expressions_split_literal_runs() {
        let mut buffer = InterpolationBuffer::new();
        buffer.write_str("a");
        buffer.add_expression(expr());
        buffer.write_str("b");
        let itpl = buffer.into_interpolation(span());
        assert_eq!(itpl.parts.len(), 3);
        assert_eq!(itpl.as_plain(), None);
        assert_eq!(itpl.initial_plain(), "a");
    }

    #[test]
    fn trailing_string_sees_only_current_run() {
        let mut buffer = InterpolationBuffer::new();
        buffer.write_str("url-prefix(");
        buffer.add_expression(expr());
        buffer.write_str(")");
        assert_eq!(buffer.trailing_string(), ")");
    }
}
