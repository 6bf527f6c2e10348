//! Scanner, parsers and syntax tree for brine.
//!
//! This crate covers the front half of the compiler: raw source text in,
//! syntax tree out. Nothing here evaluates anything; interpolation,
//! variables and control flow are parsed into structure and left for the
//! evaluator.
//!
//! # Overview
//!
//! The pieces, bottom up:
//! - [`scanner::Scanner`]: a byte cursor with checkpoint/backtrack,
//!   tracking line/column offsets for source mapping
//! - [`character`]: byte classification for the CSS/Sass grammar
//! - [`interpolation`]: the text-with-embedded-expressions type that
//!   nearly every grammar position produces
//! - [`ast`]: statement arena and expression trees
//! - [`parser`]: the recursive-descent stylesheet parser (SCSS, indented
//!   and plain-CSS syntaxes) plus the standalone sub-grammar parsers for
//!   media queries, keyframe selectors and `@at-root` queries
//!
//! # Example
//!
//! ```rust
//! use brine_source_map::FileId;
//! use brine_syntax::parser::{parse_stylesheet, Syntax};
//!
//! let outcome = parse_stylesheet("a { color: red; }", FileId(0), Syntax::Scss)?;
//! assert_eq!(outcome.sheet.node(outcome.sheet.root()).kind.children().len(), 1);
//! # Ok::<(), brine_syntax::ParseError>(())
//! ```

pub mod ast;
pub mod character;
pub mod color_names;
pub mod error;
pub mod interpolation;
pub mod parser;
pub mod scanner;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use interpolation::{Interpolation, InterpolationPart};
pub use parser::{
    parse_stylesheet, AtRootQueryParser, Diagnostic, DiagnosticKind, KeyframeSelectorParser,
    MediaQueryParser, ParseOutcome, Syntax,
};
