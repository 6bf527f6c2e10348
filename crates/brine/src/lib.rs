//! A Sass-dialect CSS compiler front end.
//!
//! This crate ties the pipeline together: `brine-syntax` parses source
//! text into a statement arena, an [`Evaluator`] turns that into the
//! evaluated CSS tree, and `brine-emit` serializes the tree in one of
//! four output styles, optionally with a version-3 source map.
//!
//! The bundled [`PassthroughEvaluator`] handles the plain-CSS subset
//! plus literal interpolation, constant folding and `@import`; plugging
//! a full Sass evaluator in behind the [`Evaluator`] trait requires no
//! other changes.
//!
//! # Example
//!
//! ```rust
//! use brine::{compile_string, CompileOptions, OutputStyle};
//!
//! let options = CompileOptions::with_style(OutputStyle::Compressed);
//! let result = compile_string("a { color: #ffcc00; }", &options)?;
//! assert_eq!(result.css, "a{color:#fc0}");
//! # Ok::<(), brine::CompileError>(())
//! ```

pub mod compile;
pub mod error;
pub mod evaluator;
pub mod options;

pub use brine_emit::OutputStyle;
pub use brine_syntax::Syntax;

pub use compile::{compile_string, compile_string_with, CompileResult};
pub use error::CompileError;
pub use evaluator::{
    CollectingSink, DiagnosticSink, Evaluator, ImportResolver, LogSink, MemoryResolver, NoImports,
    PassthroughEvaluator, ResolvedImport,
};
pub use options::{syntax_for_path, CompileOptions, SourceMapOptions};
