//! Emission-phase errors.
//!
//! These are distinct from parse errors: they fire when the serializer is
//! asked to print something that cannot be valid CSS, which means an
//! upstream evaluation bug or a value (like a map) that leaked into a
//! plain-CSS position.

use brine_source_map::Span;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EmitError {
    pub message: String,
    pub span: Span,
}

impl EmitError {
    pub fn invalid_css_value(message: impl Into<String>, span: Span) -> Self {
        EmitError {
            message: message.into(),
            span,
        }
    }
}

pub type EmitResult<T> = Result<T, EmitError>;
