//! Compile-phase error aggregation.

use brine_emit::EmitError;
use brine_source_map::{EncodingError, Span};
use brine_syntax::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("failed to serialize source map: {0}")]
    SourceMap(#[from] serde_json::Error),
    /// Anything the evaluation phase rejects: `@error` rules, imports that
    /// can't be resolved, constructs the configured evaluator doesn't
    /// support.
    #[error("{message}")]
    Evaluation { message: String, span: Span },
}

impl CompileError {
    pub fn evaluation(message: impl Into<String>, span: Span) -> Self {
        CompileError::Evaluation {
            message: message.into(),
            span,
        }
    }

    /// The source location of the failure, when one is known.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Parse(error) => Some(error.span),
            CompileError::Emit(error) => Some(error.span),
            CompileError::Evaluation { span, .. } => Some(*span),
            CompileError::Encoding(_) | CompileError::SourceMap(_) => None,
        }
    }
}
