//! Document-level CSS rendering.
//!
//! [`Output`] walks the evaluated tree top to bottom, delegating each
//! statement to [`Inspect`] and handling the concerns that only exist at
//! the document level: hoisting out-of-order imports and leading comments
//! above the rest of the output, guaranteeing a trailing linefeed, and
//! prepending a `@charset` declaration (or a byte order mark under the
//! compressed style) when the output contains non-ASCII text.

use brine_source_map::SourceMapBuilder;

use crate::emitter::OutputBuffer;
use crate::error::EmitResult;
use crate::inspect::Inspect;
use crate::style::OutputOptions;
use crate::tree::CssStmt;

pub struct Output<'a> {
    inspect: Inspect,
    /// Statements that must render before everything else, in the order
    /// they were encountered.
    hoisted: Vec<&'a CssStmt>,
}

/// Renders an evaluated tree to CSS in one call.
pub fn render(
    statements: &[CssStmt],
    options: OutputOptions,
    srcmap: Option<SourceMapBuilder>,
) -> EmitResult<OutputBuffer> {
    tracing::trace!(statements = statements.len(), "rendering css tree");
    let mut output = Output::new(options, srcmap);
    output.visit_root(statements)?;
    output.finish()
}

impl<'a> Output<'a> {
    pub fn new(options: OutputOptions, srcmap: Option<SourceMapBuilder>) -> Self {
        Output {
            inspect: Inspect::new(options, srcmap),
            hoisted: Vec::new(),
        }
    }

    /// Paths indexed by `FileId`, used by the `source_comments` option.
    pub fn set_source_paths(&mut self, paths: Vec<String>) {
        self.inspect.set_source_paths(paths);
    }

    pub fn visit_root(&mut self, statements: &'a [CssStmt]) -> EmitResult<()> {
        let style = self.inspect.emitter().options().style;
        for statement in statements {
            if statement.is_invisible(style) {
                continue;
            }
            match statement {
                CssStmt::Import {
                    out_of_order: true, ..
                } => self.hoisted.push(statement),
                CssStmt::Comment { .. } if self.inspect.emitter().buffer().is_empty() => {
                    self.hoisted.push(statement);
                }
                _ => self.inspect.visit_stmt(statement)?,
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> EmitResult<OutputBuffer> {
        let body_was_empty = self.inspect.emitter().buffer().is_empty();
        self.inspect.emitter_mut().finalize(true);

        if !self.hoisted.is_empty() {
            let options = self.inspect.emitter().options().clone();
            let srcmap = self.inspect.emitter().sibling_source_map();
            let mut header = Inspect::new(options, srcmap);
            for (index, statement) in self.hoisted.iter().enumerate() {
                if index > 0 {
                    header.emitter_mut().append_mandatory_linefeed();
                }
                header.visit_stmt(statement)?;
            }
            header.emitter_mut().finalize(body_was_empty);
            let header = header.into_buffer();
            self.inspect.emitter_mut().prepend_output(&header);
        }

        let emitter = self.inspect.emitter_mut();
        if !emitter.buffer().is_empty() && !emitter.buffer().ends_with('\n') {
            let linefeed = emitter.options().linefeed.clone();
            emitter.write_str(&linefeed);
        }

        if emitter.buffer().bytes().any(|byte| byte >= 0x80) {
            if emitter.options().style.is_compressed() {
                emitter.prepend_string("\u{feff}");
            } else {
                let charset = format!("@charset \"UTF-8\";{}", emitter.options().linefeed);
                emitter.prepend_string(&charset);
            }
        }

        Ok(self.inspect.into_buffer())
    }
}

#[cfg(test)]
mod tests {
    use brine_source_map::{FileId, Offset, SourceMapBuilder, Span};
    use brine_syntax::ast::ListSeparator;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::style::OutputStyle;
    use crate::tree::{CssString, Value};

    fn span() -> Span {
        Span::synthetic()
    }

    fn at(line: u32, column: u32) -> Span {
        Span::new(FileId(0), Offset::new(line, column), Offset::new(0, 1))
    }

    fn declaration(name: &str, value: &str) -> CssStmt {
        CssStmt::Declaration {
            name: CssString::new(name, span()),
            value: Value::String {
                text: value.to_string(),
                quoted: false,
                span: span(),
            },
            custom: false,
            span: span(),
        }
    }

    fn rule(selector: &str, children: Vec<CssStmt>) -> CssStmt {
        CssStmt::StyleRule {
            selector: CssString::new(selector, span()),
            children,
            span: span(),
        }
    }

    fn import(url: &str, out_of_order: bool) -> CssStmt {
        CssStmt::Import {
            url: CssString::new(url, span()),
            supports: None,
            media: vec![],
            out_of_order,
            span: span(),
        }
    }

    fn render_with(statements: &[CssStmt], style: OutputStyle) -> String {
        render(statements, OutputOptions::with_style(style), None)
            .expect("tree should render")
            .text
    }

    #[test]
    fn renders_a_simple_stylesheet() {
        let tree = vec![
            rule("a", vec![declaration("color", "red")]),
            rule("b c", vec![declaration("margin", "0"), declaration("padding", "0")]),
        ];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "a {\n  color: red;\n}\n\nb c {\n  margin: 0;\n  padding: 0;\n}\n"
        );
        assert_eq!(
            render_with(&tree, OutputStyle::Compressed),
            "a{color:red}b c{margin:0;padding:0}"
        );
        assert_eq!(
            render_with(&tree, OutputStyle::Nested),
            "a {\n  color: red; }\n\nb c {\n  margin: 0;\n  padding: 0; }\n"
        );
        assert_eq!(
            render_with(&tree, OutputStyle::Compact),
            "a { color: red; }\n\nb c { margin: 0; padding: 0; }\n"
        );
    }

    #[test]
    fn empty_rules_produce_no_output() {
        let tree = vec![rule("a", vec![]), rule("b", vec![declaration("x", "y")])];
        assert_eq!(render_with(&tree, OutputStyle::Expanded), "b {\n  x: y;\n}\n");
    }

    #[test]
    fn nested_blocks_indent() {
        let tree = vec![CssStmt::Media {
            queries: brine_syntax::MediaQueryParser::new("screen and (color)", FileId(0))
                .parse()
                .expect("query parses"),
            children: vec![rule("a", vec![declaration("color", "red")])],
            span: span(),
        }];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "@media screen and (color) {\n  a {\n    color: red;\n  }\n}\n"
        );
        assert_eq!(
            render_with(&tree, OutputStyle::Compressed),
            "@media screen and (color){a{color:red}}"
        );
    }

    #[test]
    fn childless_at_rules_end_with_a_semicolon() {
        let tree = vec![CssStmt::AtRule {
            name: CssString::new("layer", span()),
            value: Some(CssString::new("base, components", span())),
            children: None,
            span: span(),
        }];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "@layer base, components;\n"
        );
        assert_eq!(
            render_with(&tree, OutputStyle::Compressed),
            "@layer base, components"
        );
    }

    #[test]
    fn keyframe_blocks_join_selectors() {
        let tree = vec![CssStmt::AtRule {
            name: CssString::new("keyframes", span()),
            value: Some(CssString::new("spin", span())),
            children: Some(vec![CssStmt::KeyframeBlock {
                selectors: vec!["from".to_string(), "50%".to_string()],
                children: vec![declaration("opacity", "0")],
                span: span(),
            }]),
            span: span(),
        }];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "@keyframes spin {\n  from, 50% {\n    opacity: 0;\n  }\n}\n"
        );
    }

    #[test]
    fn out_of_order_imports_are_hoisted() {
        let tree = vec![
            rule("a", vec![declaration("color", "red")]),
            import("\"late.css\"", true),
        ];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "@import \"late.css\";\na {\n  color: red;\n}\n"
        );
    }

    #[test]
    fn in_order_imports_stay_in_place() {
        let tree = vec![
            import("\"early.css\"", false),
            rule("a", vec![declaration("color", "red")]),
        ];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "@import \"early.css\";\na {\n  color: red;\n}\n"
        );
    }

    #[test]
    fn imports_carry_supports_and_media() {
        let tree = vec![CssStmt::Import {
            url: CssString::new("url(fancy.css)", span()),
            supports: Some(CssString::new("supports(display: flex)", span())),
            media: brine_syntax::MediaQueryParser::new("screen, print", FileId(0))
                .parse()
                .expect("query parses"),
            out_of_order: false,
            span: span(),
        }];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "@import url(fancy.css) supports(display: flex) screen, print;\n"
        );
    }

    #[test]
    fn leading_comments_stay_above_hoisted_imports() {
        let tree = vec![
            CssStmt::Comment {
                text: "/* banner */".to_string(),
                preserved: false,
                span: span(),
            },
            rule("a", vec![declaration("color", "red")]),
            import("\"late.css\"", true),
        ];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "/* banner */\n@import \"late.css\";\na {\n  color: red;\n}\n"
        );
    }

    #[test]
    fn comments_render_in_place_inside_rules() {
        let tree = vec![rule(
            "a",
            vec![
                CssStmt::Comment {
                    text: "/* note */".to_string(),
                    preserved: false,
                    span: span(),
                },
                declaration("color", "red"),
            ],
        )];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "a {\n  /* note */\n  color: red;\n}\n"
        );
        // Unpreserved comments disappear under compression, and a rule
        // containing only comments disappears with them.
        assert_eq!(render_with(&tree, OutputStyle::Compressed), "a{color:red}");
    }

    #[test]
    fn preserved_comments_survive_compression() {
        let tree = vec![
            CssStmt::Comment {
                text: "/*! license */".to_string(),
                preserved: true,
                span: span(),
            },
            rule("a", vec![declaration("color", "red")]),
        ];
        assert_eq!(
            render_with(&tree, OutputStyle::Compressed),
            "/*! license */a{color:red}"
        );
    }

    #[test]
    fn non_ascii_output_gets_a_charset_declaration() {
        let tree = vec![rule("a", vec![declaration("content", "\"café\"")])];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "@charset \"UTF-8\";\na {\n  content: \"café\";\n}\n"
        );
        assert_eq!(
            render_with(&tree, OutputStyle::Compressed),
            "\u{feff}a{content:\"café\"}"
        );
    }

    #[test]
    fn maps_are_rejected_with_their_rendered_form() {
        let tree = vec![rule(
            "a",
            vec![CssStmt::Declaration {
                name: CssString::new("margin", span()),
                value: Value::Map {
                    entries: vec![(
                        Value::String {
                            text: "top".to_string(),
                            quoted: false,
                            span: span(),
                        },
                        Value::Number {
                            value: 1.0,
                            unit: "px".to_string(),
                            as_slash: None,
                            span: span(),
                        },
                    )],
                    span: span(),
                },
                custom: false,
                span: span(),
            }],
        )];
        let err = render(&tree, OutputOptions::default(), None)
            .expect_err("maps are not valid CSS");
        assert_eq!(err.to_string(), "(top: 1px) isn't a valid CSS value.");
    }

    #[test]
    fn comma_separated_values_never_break_lines() {
        let tree = vec![rule(
            "a",
            vec![CssStmt::Declaration {
                name: CssString::new("font-family", span()),
                value: Value::List {
                    elements: vec![
                        Value::String {
                            text: "Helvetica".to_string(),
                            quoted: false,
                            span: span(),
                        },
                        Value::String {
                            text: "sans-serif".to_string(),
                            quoted: false,
                            span: span(),
                        },
                    ],
                    separator: ListSeparator::Comma,
                    brackets: false,
                    span: span(),
                },
                custom: false,
                span: span(),
            }],
        )];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "a {\n  font-family: Helvetica, sans-serif;\n}\n"
        );
    }

    #[test]
    fn source_map_tracks_hoisting_and_charset() {
        let tree = vec![
            rule("aé", vec![declaration("color", "red")]),
            import("\"late.css\"", true),
        ];
        let mut spanned_tree = tree;
        if let CssStmt::StyleRule { selector, .. } = &mut spanned_tree[0] {
            selector.span = at(4, 2);
        }

        let out = render(
            &spanned_tree,
            OutputOptions::default(),
            Some(SourceMapBuilder::new(true, true)),
        )
        .expect("tree should render");

        // @charset "UTF-8";\n@import "late.css";\naé {\n...
        assert!(out.text.starts_with("@charset \"UTF-8\";\n@import \"late.css\";\naé {"));
        let map = out.map.expect("map was requested");
        let first = map.mappings()[0];
        assert_eq!(first.origin, Offset::new(4, 2));
        // Shifted one line by the import and one more by the charset.
        assert_eq!(first.generated, Offset::new(2, 0));
    }

    #[test]
    fn source_comments_point_back_at_the_rule() {
        let mut tree = vec![rule("a", vec![declaration("color", "red")])];
        if let CssStmt::StyleRule { span, .. } = &mut tree[0] {
            *span = at(9, 0);
        }
        let options = OutputOptions {
            source_comments: true,
            ..OutputOptions::default()
        };
        let mut output = Output::new(options, None);
        output.set_source_paths(vec!["input.scss".to_string()]);
        output.visit_root(&tree).expect("tree should render");
        assert_eq!(
            output.finish().expect("tree should render").text,
            "/* line 10, input.scss */\na {\n  color: red;\n}\n"
        );
    }

    #[test]
    fn empty_tree_renders_to_nothing() {
        assert_eq!(render_with(&[], OutputStyle::Expanded), "");
        assert_eq!(render_with(&[], OutputStyle::Compressed), "");
    }

    #[test]
    fn supports_rule_renders_condition_and_block() {
        let tree = vec![CssStmt::Supports {
            condition: CssString::new("(display: grid)", span()),
            children: vec![rule("a", vec![declaration("display", "grid")])],
            span: span(),
        }];
        assert_eq!(
            render_with(&tree, OutputStyle::Expanded),
            "@supports (display: grid) {\n  a {\n    display: grid;\n  }\n}\n"
        );
    }
}
