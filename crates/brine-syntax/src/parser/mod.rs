//! The recursive-descent parsers.
//!
//! One parser struct handles all three concrete syntaxes; the variant
//! hooks (statement separators, child blocks, comments) dispatch on
//! [`Syntax`]. Standalone sub-grammar parsers for media queries, keyframe
//! selectors and `@at-root` queries operate on already-resolved text.

mod at_root_query;
mod css;
mod expression;
mod helpers;
mod keyframe_selector;
mod media_query;
mod sass;
mod scss;
mod stylesheet;

pub use at_root_query::AtRootQueryParser;
pub use keyframe_selector::KeyframeSelectorParser;
pub use media_query::MediaQueryParser;

use brine_source_map::{FileId, Span};

use crate::ast::{Arena, NodeId, StyleSheet};
use crate::error::{ParseError, ParseResult};
use crate::scanner::Scanner;

/// Which concrete syntax a source is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Scss,
    Indented,
    Css,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Warning,
    Deprecation,
}

/// A warning produced while parsing; reported through the compiler's
/// diagnostics sink, never fatal.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub kind: DiagnosticKind,
}

/// A successfully parsed stylesheet plus any non-fatal diagnostics.
#[derive(Debug)]
pub struct ParseOutcome {
    pub sheet: StyleSheet,
    pub diagnostics: Vec<Diagnostic>,
}

/// Nesting limit shared by statement and expression recursion. Deep
/// enough for any real stylesheet, shallow enough to fail before the
/// call stack does.
const MAX_DEPTH: usize = 512;

/// Child-statement consumer; `None` means a statement was consumed that
/// doesn't produce a node (e.g. `@charset`).
type ChildParser<'a> = fn(&mut StylesheetParser<'a>) -> ParseResult<Option<NodeId>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentType {
    Auto,
    Spaces,
    Tabs,
}

pub struct StylesheetParser<'a> {
    pub(crate) scanner: Scanner<'a>,
    syntax: Syntax,
    arena: Arena,
    diagnostics: Vec<Diagnostic>,
    depth: usize,

    // Nesting flags.
    in_style_rule: bool,
    in_mixin: bool,
    in_content_block: bool,
    in_control_directive: bool,
    in_unknown_at_rule: bool,
    in_parentheses: bool,
    use_allowed: bool,

    // Indented-syntax state.
    current_indentation: usize,
    next_indentation: Option<usize>,
    next_indentation_end: Option<crate::scanner::ScannerState>,
    indent_type: IndentType,
}

impl<'a> StylesheetParser<'a> {
    pub fn new(text: &'a str, file: FileId, syntax: Syntax) -> Self {
        StylesheetParser {
            scanner: Scanner::new(text, file),
            syntax,
            arena: Arena::new(),
            diagnostics: Vec::new(),
            depth: 0,
            in_style_rule: false,
            in_mixin: false,
            in_content_block: false,
            in_control_directive: false,
            in_unknown_at_rule: false,
            in_parentheses: false,
            use_allowed: true,
            current_indentation: 0,
            next_indentation: None,
            next_indentation_end: None,
            indent_type: IndentType::Auto,
        }
    }

    pub(crate) fn syntax(&self) -> Syntax {
        self.syntax
    }

    pub(crate) fn is_indented(&self) -> bool {
        self.syntax == Syntax::Indented
    }

    pub(crate) fn is_plain_css(&self) -> bool {
        self.syntax == Syntax::Css
    }

    pub(crate) fn arena(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic {
            message: message.into(),
            span,
            kind: DiagnosticKind::Warning,
        });
    }

    pub(crate) fn deprecation(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic {
            message: message.into(),
            span,
            kind: DiagnosticKind::Deprecation,
        });
    }

    pub(crate) fn error<T>(&self, message: impl Into<String>, span: Span) -> ParseResult<T> {
        Err(ParseError::syntax(message, span))
    }

    /// Bumps the shared recursion counter, failing fast instead of
    /// overflowing the call stack.
    pub(crate) fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::recursion_limit(self.scanner.raw_span()));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }
}

/// Parses [text] as a complete stylesheet.
pub fn parse_stylesheet(
    text: &str,
    file: FileId,
    syntax: Syntax,
) -> ParseResult<ParseOutcome> {
    tracing::debug!(?syntax, len = text.len(), "parsing stylesheet");
    let mut parser = StylesheetParser::new(text, file, syntax);
    let sheet = parser.parse_root()?;
    tracing::debug!(nodes = sheet.len(), "parsed stylesheet");
    Ok(ParseOutcome {
        sheet,
        diagnostics: parser.diagnostics,
    })
}
