//! Compilation options.

use brine_emit::{OutputOptions, OutputStyle};
use brine_syntax::Syntax;

/// Picks the syntax a path's extension implies. Anything that isn't
/// `.sass` or `.css` is treated as SCSS.
pub fn syntax_for_path(path: &str) -> Syntax {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".sass") {
        Syntax::Indented
    } else if lower.ends_with(".css") {
        Syntax::Css
    } else {
        Syntax::Scss
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceMapOptions {
    pub enabled: bool,
    /// Embed the payload in the CSS as a base64 data URI instead of
    /// referencing an external `.map` file.
    pub inline: bool,
    /// Copy each source's full text into `sourcesContent`.
    pub embed_sources: bool,
    /// The output file name recorded in the payload; also the stem of the
    /// external `.map` reference.
    pub file: Option<String>,
    pub source_root: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub style: OutputStyle,
    /// Explicit input syntax; `None` detects it from [`Self::url`].
    pub syntax: Option<Syntax>,
    /// The canonical URL of the entry stylesheet, used for syntax
    /// detection and recorded in source maps.
    pub url: Option<String>,
    /// Decimal digits retained when printing numbers.
    pub precision: usize,
    pub indent: String,
    pub linefeed: String,
    /// Emit `/* line N, path */` comments ahead of style rules.
    pub source_comments: bool,
    pub source_map: SourceMapOptions,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            style: OutputStyle::default(),
            syntax: None,
            url: None,
            precision: 10,
            indent: "  ".into(),
            linefeed: "\n".into(),
            source_comments: false,
            source_map: SourceMapOptions::default(),
        }
    }
}

impl CompileOptions {
    pub fn with_style(style: OutputStyle) -> Self {
        CompileOptions {
            style,
            ..CompileOptions::default()
        }
    }

    /// The effective syntax: explicit choice, then URL extension, then SCSS.
    pub fn syntax(&self) -> Syntax {
        self.syntax.unwrap_or_else(|| {
            self.url
                .as_deref()
                .map(syntax_for_path)
                .unwrap_or(Syntax::Scss)
        })
    }

    pub(crate) fn output_options(&self) -> OutputOptions {
        OutputOptions {
            style: self.style,
            precision: self.precision,
            indent: self.indent.clone(),
            linefeed: self.linefeed.clone(),
            source_comments: self.source_comments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_detection_by_extension() {
        assert_eq!(syntax_for_path("a.scss"), Syntax::Scss);
        assert_eq!(syntax_for_path("a.SASS"), Syntax::Indented);
        assert_eq!(syntax_for_path("dir/a.css"), Syntax::Css);
        assert_eq!(syntax_for_path("no-extension"), Syntax::Scss);
    }

    #[test]
    fn url_drives_syntax_unless_overridden() {
        let mut options = CompileOptions::default();
        assert_eq!(options.syntax(), Syntax::Scss);
        options.url = Some("style.sass".into());
        assert_eq!(options.syntax(), Syntax::Indented);
        options.syntax = Some(Syntax::Css);
        assert_eq!(options.syntax(), Syntax::Css);
    }
}
