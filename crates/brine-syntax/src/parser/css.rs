//! Plain-CSS restrictions.
//!
//! The CSS syntax reuses the full parser but rejects everything
//! Sass-specific: script-only at-rules, silent comments, variables,
//! operators, and calls to functions that only exist in SassScript.
//! Rejections happen at parse time so the error points at the author's
//! source rather than at evaluated output.

use brine_source_map::Offset;

use crate::ast::{ImportArgument, NodeId, Statement};
use crate::error::ParseResult;
use crate::interpolation::{Interpolation, InterpolationBuffer};

use super::helpers::add_quoted_string;
use super::StylesheetParser;

/// At-rules that drive the Sass evaluator and have no plain-CSS meaning.
const FORBIDDEN_AT_RULES: &[&str] = &[
    "at-root", "content", "debug", "each", "error", "extend", "for", "function", "if",
    "include", "mixin", "return", "warn", "while",
];

pub(super) fn is_forbidden_at_rule(name: &str) -> bool {
    FORBIDDEN_AT_RULES.contains(&name)
}

/// Function names that exist only in SassScript. Calling one from plain
/// CSS almost always means a file was given the wrong syntax, so it's
/// rejected rather than passed through as a plain function call.
const DISALLOWED_FUNCTIONS: &[&str] = &[
    "red", "green", "blue", "mix", "hue", "saturation", "lightness", "adjust-hue",
    "lighten", "darken", "desaturate", "complement", "opacify", "fade-in",
    "transparentize", "fade-out", "adjust-color", "scale-color", "change-color",
    "ie-hex-str", "unquote", "quote", "str-length", "str-insert", "str-index",
    "str-slice", "to-upper-case", "to-lower-case", "percentage", "round", "ceil",
    "floor", "abs", "max", "min", "random", "length", "nth", "set-nth", "join",
    "append", "zip", "index", "list-separator", "is-bracketed", "map-get",
    "map-merge", "map-remove", "map-keys", "map-values", "map-has-key", "keywords",
    "selector-nest", "selector-append", "selector-extend", "selector-replace",
    "selector-unify", "is-superselector", "simple-selectors", "selector-parse",
    "feature-exists", "inspect", "type-of", "unit", "unitless", "comparable",
    "whiteness", "blackness", "if", "unique-id",
];

pub(super) fn is_disallowed_function(name: &str) -> bool {
    DISALLOWED_FUNCTIONS.contains(&name)
}

/// The at-rule dispatch for the CSS syntax: a short allow-list, with
/// everything forbidden reported after consuming its prelude so the error
/// span covers the whole rule.
pub(super) fn read_plain_css_at_rule(
    parser: &mut StylesheetParser<'_>,
    root: bool,
) -> ParseResult<Option<NodeId>> {
    let start = parser.scanner.offset;
    parser.scanner.expect_char(b'@', Some("@-rule"))?;
    let name = parser.read_interpolated_identifier()?;
    parser.scan_whitespace()?;

    let plain = name.as_plain().unwrap_or_default().to_string();
    if is_forbidden_at_rule(&plain) {
        parser.read_almost_any_value(false)?;
        return parser.error(
            "This at-rule isn't allowed in plain CSS.",
            parser.scanner.relevant_span_from(start),
        );
    }

    match plain.as_str() {
        "charset" => {
            if !root {
                return parser.throw_disallowed_at_rule(start);
            }
            parser.read_string()?;
            Ok(None)
        }
        "import" => read_import_rule(parser, start).map(Some),
        "media" => parser.read_media_rule(start).map(Some),
        "-moz-document" => parser.read_moz_document_rule(start, name).map(Some),
        "supports" => parser.read_supports_rule(start).map(Some),
        _ => parser.read_any_at_rule(start, name).map(Some),
    }
}

/// A plain-CSS `@import` takes exactly one static argument and is always
/// passed through to the output.
fn read_import_rule(parser: &mut StylesheetParser<'_>, start: Offset) -> ParseResult<NodeId> {
    let url = match parser.scanner.peek() {
        Some(b'u' | b'U') => {
            let expression = parser.read_function_or_string_expression()?;
            let span = expression.span;
            Interpolation::expression(expression, span)
        }
        _ => {
            let (text, span) = parser.read_interpolated_string_text()?;
            let mut buffer = InterpolationBuffer::new();
            add_quoted_string(&mut buffer, &text);
            buffer.into_interpolation(span)
        }
    };

    parser.scan_whitespace()?;
    let (supports, media) = parser.try_import_queries()?;
    parser.expect_statement_separator(Some("@import rule"))?;

    let span = parser.scanner.relevant_span_from(start);
    Ok(parser.arena().add(
        Statement::Import {
            imports: vec![ImportArgument::Static {
                url,
                supports,
                media,
                span,
            }],
        },
        span,
    ))
}

#[cfg(test)]
mod tests {
    use brine_source_map::FileId;
    use pretty_assertions::assert_eq;

    use crate::ast::{ImportArgument, Statement};
    use crate::parser::{parse_stylesheet, Syntax};

    fn parse_css(text: &str) -> crate::ast::StyleSheet {
        parse_stylesheet(text, FileId(0), Syntax::Css)
            .expect("parse failed")
            .sheet
    }

    fn parse_css_err(text: &str) -> String {
        parse_stylesheet(text, FileId(0), Syntax::Css)
            .expect_err("parse unexpectedly succeeded")
            .to_string()
    }

    #[test]
    fn forbidden_at_rules_are_rejected() {
        assert_eq!(
            parse_css_err("@if true { a: b; }"),
            "This at-rule isn't allowed in plain CSS."
        );
        assert_eq!(
            parse_css_err("@mixin m { a: b; }"),
            "This at-rule isn't allowed in plain CSS."
        );
    }

    #[test]
    fn sass_constructs_are_rejected() {
        assert_eq!(
            parse_css_err("// comment\na { b: c; }"),
            "Silent comments aren't allowed in plain CSS."
        );
        assert_eq!(
            parse_css_err("$x: 1;"),
            "Sass variables aren't allowed in plain CSS."
        );
        assert_eq!(
            parse_css_err("a { b: c { d: e; } }"),
            "Nested declarations aren't allowed in plain CSS."
        );
    }

    #[test]
    fn disallowed_functions_are_rejected() {
        assert_eq!(
            parse_css_err("a { color: lighten(red, 10%); }"),
            "This function isn't allowed in plain CSS."
        );
    }

    #[test]
    fn css_functions_pass_through() {
        let sheet = parse_css("a { width: calc(100% - 10px); }");
        let root = sheet.node(sheet.root()).kind.children().to_vec();
        assert!(matches!(
            sheet.node(root[0]).kind,
            Statement::StyleRule { .. }
        ));
    }

    #[test]
    fn import_is_always_static() {
        let sheet = parse_css("@import \"partial\";");
        let root = sheet.node(sheet.root()).kind.children().to_vec();
        let Statement::Import { imports } = &sheet.node(root[0]).kind else {
            panic!("expected import");
        };
        let ImportArgument::Static { url, .. } = &imports[0] else {
            panic!("expected static import");
        };
        assert_eq!(url.as_plain(), Some("\"partial\""));
    }

    #[test]
    fn media_and_supports_still_parse() {
        let sheet = parse_css(
            "@media screen { a { b: c; } }\n@supports (display: grid) { a { b: c; } }",
        );
        let root = sheet.node(sheet.root()).kind.children().to_vec();
        assert!(matches!(sheet.node(root[0]).kind, Statement::Media { .. }));
        assert!(matches!(
            sheet.node(root[1]).kind,
            Statement::Supports { .. }
        ));
    }
}
