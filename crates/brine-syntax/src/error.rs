//! Parse-phase error types.
//!
//! Backtracking relies on a strict split between *recoverable* failures
//! (a production didn't match; an enclosing speculative parse may rewind
//! and try something else) and *fatal* ones (broken input or resource
//! limits) that must always propagate to the top-level caller. Catch-all
//! backtracking would silently accept invalid input, so speculative call
//! sites check [`ParseError::is_recoverable`] and re-raise everything else.

use brine_source_map::Span;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A scan-level mismatch: "expected X." at a position.
    Expected,
    /// A grammar-level failure with a full sentence message.
    Syntax,
    /// The recursion-depth guard tripped. Never caught by backtracking.
    RecursionLimit,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn expected(name: &str, span: Span) -> Self {
        ParseError {
            message: format!("expected {name}."),
            span,
            kind: ParseErrorKind::Expected,
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            message: message.into(),
            span,
            kind: ParseErrorKind::Syntax,
        }
    }

    pub fn recursion_limit(span: Span) -> Self {
        ParseError {
            message: "parser exceeded maximum nesting depth.".into(),
            span,
            kind: ParseErrorKind::RecursionLimit,
        }
    }

    /// Whether a speculative parse may rewind past this error.
    pub fn is_recoverable(&self) -> bool {
        self.kind != ParseErrorKind::RecursionLimit
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
