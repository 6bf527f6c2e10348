//! Expression nodes.

use brine_source_map::Span;

use crate::interpolation::Interpolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSeparator {
    Comma,
    Space,
    /// A single-element or empty list whose separator was never observed.
    Undecided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// The Microsoft-style `=` allowed in some function invocations.
    SingleEquals,
    Or,
    And,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    Plus,
    Minus,
    Times,
    DividedBy,
    Modulo,
}

impl BinaryOperator {
    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::SingleEquals => 0,
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Equals | BinaryOperator::NotEquals => 3,
            BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEquals
            | BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEquals => 4,
            BinaryOperator::Plus | BinaryOperator::Minus => 5,
            BinaryOperator::Times | BinaryOperator::DividedBy | BinaryOperator::Modulo => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::SingleEquals => "=",
            BinaryOperator::Or => "or",
            BinaryOperator::And => "and",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEquals => ">=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEquals => "<=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Times => "*",
            BinaryOperator::DividedBy => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    DividedBy,
    Not,
}

impl UnaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::DividedBy => "/",
            UnaryOperator::Not => "not",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub span: Span,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// A quoted or unquoted string, possibly interpolated. Special
    /// functions (`calc(...)`, `url(...)`, ...) parse to unquoted strings
    /// whose interpolation carries their raw bodies.
    String {
        text: Interpolation,
        quoted: bool,
    },
    Number {
        value: f64,
        unit: Option<String>,
    },
    Color {
        red: u8,
        green: u8,
        blue: u8,
        alpha: f64,
        /// The text as the author wrote it, e.g. `#abc` or `cornflowerblue`.
        original: String,
    },
    Boolean(bool),
    Null,
    List {
        elements: Vec<Expression>,
        separator: ListSeparator,
        bracketed: bool,
    },
    Map {
        pairs: Vec<(Expression, Expression)>,
    },
    Variable {
        namespace: Option<String>,
        name: String,
    },
    /// The parent-selector token `&`.
    ParentSelector,
    UnaryOperation {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    BinaryOperation {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        /// Whether a `/` result may still be reinterpreted as a separator
        /// (e.g. `font: 12px/30px`) rather than division.
        allows_slash: bool,
    },
    Parenthesized(Box<Expression>),
    FunctionCall {
        namespace: Option<String>,
        name: Interpolation,
        arguments: ArgumentInvocation,
    },
}

impl Expression {
    pub fn new(span: Span, kind: ExpressionKind) -> Self {
        Expression { span, kind }
    }

    pub fn null(span: Span) -> Self {
        Expression::new(span, ExpressionKind::Null)
    }

    pub fn is_variable(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Variable { name, namespace: None } => Some(name),
            _ => None,
        }
    }

    /// Whether this is a slash-separated operation that could be a plain
    /// CSS shorthand value.
    pub fn is_slash_operand(&self) -> bool {
        matches!(
            &self.kind,
            ExpressionKind::Number { .. }
                | ExpressionKind::FunctionCall { .. }
                | ExpressionKind::BinaryOperation { allows_slash: true, .. }
        )
    }
}

/// The formal parameters of a `@mixin`/`@function` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDeclaration {
    pub arguments: Vec<Argument>,
    /// The name of a trailing `$args...` rest parameter.
    pub rest: Option<String>,
    pub span: Span,
}

impl ArgumentDeclaration {
    pub fn empty(span: Span) -> Self {
        ArgumentDeclaration {
            arguments: Vec::new(),
            rest: None,
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub default: Option<Expression>,
    pub span: Span,
}

/// The actual arguments of an `@include` or function call.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentInvocation {
    pub positional: Vec<Expression>,
    pub named: Vec<(String, Expression)>,
    pub rest: Option<Box<Expression>>,
    pub keyword_rest: Option<Box<Expression>>,
    pub span: Span,
}

impl ArgumentInvocation {
    pub fn empty(span: Span) -> Self {
        ArgumentInvocation {
            positional: Vec::new(),
            named: Vec::new(),
            rest: None,
            keyword_rest: None,
            span,
        }
    }
}

/// A `@supports` condition.
#[derive(Debug, Clone, PartialEq)]
pub enum SupportsCondition {
    Operation {
        left: Box<SupportsCondition>,
        /// `"and"` or `"or"`.
        operator: String,
        right: Box<SupportsCondition>,
        span: Span,
    },
    Negation {
        condition: Box<SupportsCondition>,
        span: Span,
    },
    /// A bare `#{...}` standing for a whole condition.
    Interpolation {
        expression: Expression,
        span: Span,
    },
    Declaration {
        name: Box<Expression>,
        value: Box<Expression>,
        span: Span,
    },
}

impl SupportsCondition {
    pub fn span(&self) -> Span {
        match self {
            SupportsCondition::Operation { span, .. }
            | SupportsCondition::Negation { span, .. }
            | SupportsCondition::Interpolation { span, .. }
            | SupportsCondition::Declaration { span, .. } => *span,
        }
    }
}

/// One parsed media query, after interpolation has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
    pub modifier: Option<String>,
    pub media_type: Option<String>,
    /// Each feature rendered as `(name: value)`.
    pub features: Vec<String>,
    pub span: Span,
}

impl MediaQuery {
    /// Whether this matches all media, i.e. has no type or the type `all`.
    pub fn matches_all_types(&self) -> bool {
        match self.media_type.as_deref() {
            None => true,
            Some(media_type) => media_type.eq_ignore_ascii_case("all"),
        }
    }
}

/// An `@at-root (with: ...)` / `(without: ...)` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRootQuery {
    /// True for `with:`, false for `without:`.
    pub include: bool,
    pub names: Vec<String>,
    pub span: Span,
}

impl AtRootQuery {
    /// The implicit query for a bare `@at-root`, which hoists out of
    /// style rules only.
    pub fn default_query(span: Span) -> Self {
        AtRootQuery {
            include: false,
            names: vec!["rule".to_string()],
            span,
        }
    }

    /// Whether [name] is excluded by this query.
    pub fn excludes_name(&self, name: &str) -> bool {
        let listed = self.names.iter().any(|n| n == name || n == "all");
        listed != self.include
    }

    /// Whether style rules are excluded, via `rule` or `all`.
    pub fn excludes_style_rules(&self) -> bool {
        let listed = self.names.iter().any(|n| n == "rule" || n == "all");
        listed != self.include
    }
}
