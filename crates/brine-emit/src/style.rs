//! Output styles and serialization options.

/// How the rendered CSS is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputStyle {
    /// Each block indented one level deeper than its parent, with the
    /// closing brace on the last declaration's line.
    Nested,
    /// The familiar hand-written layout: one declaration per line,
    /// closing brace on its own line.
    #[default]
    Expanded,
    /// One rule per line.
    Compact,
    /// Everything on one line, all optional whitespace dropped.
    Compressed,
}

impl OutputStyle {
    pub fn is_compressed(self) -> bool {
        self == OutputStyle::Compressed
    }

    pub fn is_compact(self) -> bool {
        self == OutputStyle::Compact
    }
}

/// Knobs for one serialization pass.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub style: OutputStyle,
    /// Decimal digits retained when printing numbers.
    pub precision: usize,
    /// The string written once per indentation level.
    pub indent: String,
    pub linefeed: String,
    /// Emit a `/* line N, path */` comment ahead of each style rule.
    pub source_comments: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        OutputOptions {
            style: OutputStyle::default(),
            precision: 10,
            indent: "  ".into(),
            linefeed: "\n".into(),
            source_comments: false,
        }
    }
}

impl OutputOptions {
    pub fn with_style(style: OutputStyle) -> Self {
        OutputOptions {
            style,
            ..OutputOptions::default()
        }
    }
}
