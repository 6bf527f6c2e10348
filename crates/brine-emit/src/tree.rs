//! The evaluated CSS tree handed to the serializers.
//!
//! This is the output shape of evaluation: selectors and at-rule preludes
//! are already resolved to plain text, and every value is a concrete CSS
//! value. The serializers in [`crate::output`] and [`crate::inspect`]
//! walk this tree; they never see the source syntax tree.

use brine_source_map::Span;
use brine_syntax::ast::{ListSeparator, MediaQuery};

use crate::style::OutputStyle;

/// A resolved piece of text that still remembers where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CssString {
    pub text: String,
    pub span: Span,
}

impl CssString {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        CssString {
            text: text.into(),
            span,
        }
    }
}

/// One statement of the evaluated tree.
#[derive(Debug, Clone, PartialEq)]
pub enum CssStmt {
    StyleRule {
        selector: CssString,
        children: Vec<CssStmt>,
        span: Span,
    },
    Media {
        queries: Vec<MediaQuery>,
        children: Vec<CssStmt>,
        span: Span,
    },
    Supports {
        condition: CssString,
        children: Vec<CssStmt>,
        span: Span,
    },
    /// A generic at-rule. `children: None` means the rule is childless and
    /// ends with a semicolon; `Some(vec![])` renders an empty block.
    AtRule {
        name: CssString,
        value: Option<CssString>,
        children: Option<Vec<CssStmt>>,
        span: Span,
    },
    KeyframeBlock {
        selectors: Vec<String>,
        children: Vec<CssStmt>,
        span: Span,
    },
    Declaration {
        name: CssString,
        value: Value,
        /// Custom properties keep their value text verbatim.
        custom: bool,
        span: Span,
    },
    Comment {
        text: String,
        /// `/*!` comments survive compressed output.
        preserved: bool,
        span: Span,
    },
    Import {
        url: CssString,
        supports: Option<CssString>,
        media: Vec<MediaQuery>,
        /// Set when the import appeared after other CSS and must be
        /// hoisted to the top of the document.
        out_of_order: bool,
        span: Span,
    },
}

impl CssStmt {
    pub fn span(&self) -> Span {
        match self {
            CssStmt::StyleRule { span, .. }
            | CssStmt::Media { span, .. }
            | CssStmt::Supports { span, .. }
            | CssStmt::AtRule { span, .. }
            | CssStmt::KeyframeBlock { span, .. }
            | CssStmt::Declaration { span, .. }
            | CssStmt::Comment { span, .. }
            | CssStmt::Import { span, .. } => *span,
        }
    }

    /// Whether this statement produces no output at all under [style].
    ///
    /// Blocks that would render an empty pair of braces are dropped, and
    /// unpreserved comments vanish in the terse styles.
    pub fn is_invisible(&self, style: OutputStyle) -> bool {
        match self {
            CssStmt::StyleRule { children, .. }
            | CssStmt::Media { children, .. }
            | CssStmt::Supports { children, .. }
            | CssStmt::KeyframeBlock { children, .. } => {
                children.iter().all(|child| child.is_invisible(style))
            }
            CssStmt::AtRule { children, .. } => match children {
                Some(children) => children.iter().all(|child| child.is_invisible(style)),
                None => false,
            },
            CssStmt::Comment { preserved, .. } => {
                (style.is_compressed() || style.is_compact()) && !preserved
            }
            CssStmt::Declaration { .. } | CssStmt::Import { .. } => false,
        }
    }
}

/// A concrete CSS value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String {
        text: String,
        quoted: bool,
        span: Span,
    },
    Number {
        value: f64,
        unit: String,
        /// When evaluation preserved a literal `a/b` (neither side was
        /// used arithmetically), the two original numbers render joined
        /// by a slash instead of the divided value.
        as_slash: Option<Box<(Value, Value)>>,
        span: Span,
    },
    Color {
        red: f64,
        green: f64,
        blue: f64,
        alpha: f64,
        /// The spelling the author wrote, kept when the color was never
        /// modified.
        original: Option<String>,
        span: Span,
    },
    List {
        elements: Vec<Value>,
        separator: ListSeparator,
        brackets: bool,
        span: Span,
    },
    Map {
        entries: Vec<(Value, Value)>,
        span: Span,
    },
    Calculation {
        name: String,
        arguments: Vec<CalcExpr>,
        span: Span,
    },
    Boolean {
        value: bool,
        span: Span,
    },
    Null {
        span: Span,
    },
}

impl Value {
    pub fn span(&self) -> Span {
        match self {
            Value::String { span, .. }
            | Value::Number { span, .. }
            | Value::Color { span, .. }
            | Value::List { span, .. }
            | Value::Map { span, .. }
            | Value::Calculation { span, .. }
            | Value::Boolean { span, .. }
            | Value::Null { span } => *span,
        }
    }

    /// Whether this value renders as nothing in a CSS position.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null { .. } => true,
            Value::String { text, quoted, .. } => !quoted && text.is_empty(),
            Value::List { elements, .. } => elements.iter().all(Value::is_blank),
            _ => false,
        }
    }
}

/// A node of a calculation's argument expression.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcExpr {
    Number {
        value: f64,
        unit: String,
        span: Span,
    },
    /// Unresolved text such as a variable reference or interpolation
    /// result, rendered verbatim.
    String {
        text: String,
        span: Span,
    },
    Operation {
        op: CalcOperator,
        lhs: Box<CalcExpr>,
        rhs: Box<CalcExpr>,
        span: Span,
    },
}

impl CalcExpr {
    pub fn span(&self) -> Span {
        match self {
            CalcExpr::Number { span, .. }
            | CalcExpr::String { span, .. }
            | CalcExpr::Operation { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOperator {
    Plus,
    Minus,
    Times,
    Divide,
}

impl CalcOperator {
    /// Binding strength; multiplicative operators bind tighter.
    pub fn precedence(self) -> u8 {
        match self {
            CalcOperator::Plus | CalcOperator::Minus => 1,
            CalcOperator::Times | CalcOperator::Divide => 2,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            CalcOperator::Plus => "+",
            CalcOperator::Minus => "-",
            CalcOperator::Times => "*",
            CalcOperator::Divide => "/",
        }
    }
}

#[cfg(test)]
mod tests {
    use brine_source_map::Span;
    use brine_syntax::ast::ListSeparator;

    use super::*;
    use crate::style::OutputStyle;

    fn null() -> Value {
        Value::Null {
            span: Span::synthetic(),
        }
    }

    #[test]
    fn blankness() {
        assert!(null().is_blank());
        assert!(Value::String {
            text: String::new(),
            quoted: false,
            span: Span::synthetic(),
        }
        .is_blank());
        assert!(!Value::String {
            text: String::new(),
            quoted: true,
            span: Span::synthetic(),
        }
        .is_blank());
        assert!(Value::List {
            elements: vec![null(), null()],
            separator: ListSeparator::Comma,
            brackets: false,
            span: Span::synthetic(),
        }
        .is_blank());
    }

    #[test]
    fn empty_rules_are_invisible() {
        let rule = CssStmt::StyleRule {
            selector: CssString::new("a", Span::synthetic()),
            children: vec![],
            span: Span::synthetic(),
        };
        assert!(rule.is_invisible(OutputStyle::Expanded));

        let comment_only = CssStmt::StyleRule {
            selector: CssString::new("a", Span::synthetic()),
            children: vec![CssStmt::Comment {
                text: "/* x */".into(),
                preserved: false,
                span: Span::synthetic(),
            }],
            span: Span::synthetic(),
        };
        assert!(!comment_only.is_invisible(OutputStyle::Expanded));
        assert!(comment_only.is_invisible(OutputStyle::Compressed));
    }

    #[test]
    fn childless_at_rule_is_visible() {
        let rule = CssStmt::AtRule {
            name: CssString::new("charset", Span::synthetic()),
            value: Some(CssString::new("\"UTF-8\"", Span::synthetic())),
            children: None,
            span: Span::synthetic(),
        };
        assert!(!rule.is_invisible(OutputStyle::Compressed));
    }
}
