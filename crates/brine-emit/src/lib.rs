//! CSS emission for brine.
//!
//! This crate is the back half of the compiler: it takes the evaluated
//! CSS tree ([`tree::CssStmt`]) and renders it to text in one of four
//! output styles, with optional source-map recording.
//!
//! The layers, bottom up:
//! - [`emitter::Emitter`]: the scheduling writer that owns whitespace,
//!   delimiter and indentation decisions, and the source-map cursor
//! - [`inspect::Inspect`]: statement and value serialization, with a
//!   separate inspect mode for debugging output and error messages
//! - [`output`]: the document-level pass that hoists out-of-order
//!   imports, appends the trailing linefeed and prepends `@charset`
//!
//! # Example
//!
//! ```rust
//! use brine_emit::{render, CssStmt, CssString, OutputOptions, Value};
//! use brine_source_map::Span;
//!
//! let tree = vec![CssStmt::StyleRule {
//!     selector: CssString::new("a", Span::synthetic()),
//!     children: vec![CssStmt::Declaration {
//!         name: CssString::new("color", Span::synthetic()),
//!         value: Value::String {
//!             text: "red".into(),
//!             quoted: false,
//!             span: Span::synthetic(),
//!         },
//!         custom: false,
//!         span: Span::synthetic(),
//!     }],
//!     span: Span::synthetic(),
//! }];
//! let out = render(&tree, OutputOptions::default(), None)?;
//! assert_eq!(out.text, "a {\n  color: red;\n}\n");
//! # Ok::<(), brine_emit::EmitError>(())
//! ```

pub mod emitter;
pub mod error;
pub mod inspect;
pub mod output;
pub mod style;
pub mod tree;

pub use emitter::{Emitter, OutputBuffer};
pub use error::{EmitError, EmitResult};
pub use inspect::{inspect_value, Inspect};
pub use output::{render, Output};
pub use style::{OutputOptions, OutputStyle};
pub use tree::{CalcExpr, CalcOperator, CssStmt, CssString, Value};
