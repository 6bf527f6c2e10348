//! End-to-end compilation tests: source text in, CSS out.

use brine::{
    compile_string, compile_string_with, CollectingSink, CompileError, CompileOptions, LogSink,
    MemoryResolver, OutputStyle, PassthroughEvaluator, SourceMapOptions, Syntax,
};
use pretty_assertions::assert_eq;

fn compile(source: &str, options: &CompileOptions) -> String {
    compile_string(source, options)
        .expect("stylesheet should compile")
        .css
}

fn compile_error(source: &str, options: &CompileOptions) -> String {
    match compile_string(source, options) {
        Ok(result) => panic!("expected an error, got {:?}", result.css),
        Err(error) => error.to_string(),
    }
}

#[test]
fn renders_plain_css() {
    assert_eq!(
        compile("a { color: red; }", &CompileOptions::default()),
        "a {\n  color: red;\n}\n"
    );
}

#[test]
fn root_rules_are_separated_by_a_blank_line() {
    assert_eq!(
        compile("a { color: red; }\nb { margin: 0; }", &CompileOptions::default()),
        "a {\n  color: red;\n}\n\nb {\n  margin: 0;\n}\n"
    );
}

#[test]
fn interpolation_splices_into_selectors_names_and_values() {
    assert_eq!(
        compile(
            ".a#{\"-\"}b { #{\"color\"}: #{1 + 1}px; }",
            &CompileOptions::default()
        ),
        ".a-b {\n  color: 2px;\n}\n"
    );
}

#[test]
fn output_is_a_fixpoint_under_the_css_syntax() {
    let first = compile(
        ".a#{\"-\"}b { #{\"color\"}: #{1 + 1}px; }",
        &CompileOptions::default(),
    );
    let mut options = CompileOptions::default();
    options.syntax = Some(Syntax::Css);
    assert_eq!(compile(&first, &options), first);
}

#[test]
fn compressed_style_minifies_colors_and_drops_the_last_semicolon() {
    let options = CompileOptions::with_style(OutputStyle::Compressed);
    assert_eq!(
        compile("a { color: #ffcc00; margin: 0 }", &options),
        "a{color:#fc0;margin:0}"
    );
}

#[test]
fn nested_style_keeps_the_closer_on_the_last_line() {
    let options = CompileOptions::with_style(OutputStyle::Nested);
    assert_eq!(
        compile("a { color: red; }", &options),
        "a {\n  color: red; }\n"
    );
}

#[test]
fn arithmetic_on_literals_is_folded() {
    assert_eq!(
        compile("a { width: 1.5px + 1px; height: 2 * 3px; }", &CompileOptions::default()),
        "a {\n  width: 2.5px;\n  height: 6px;\n}\n"
    );
}

#[test]
fn slash_between_literal_numbers_is_preserved() {
    assert_eq!(
        compile("a { margin: 6px/2; }", &CompileOptions::default()),
        "a {\n  margin: 6px/2;\n}\n"
    );
}

#[test]
fn incompatible_units_fail() {
    let message = compile_error("a { width: 1px + 2em; }", &CompileOptions::default());
    assert_eq!(message, "Incompatible units px and em.");
}

#[test]
fn media_queries_pass_through() {
    assert_eq!(
        compile(
            "@media screen and (min-width: 100px) { a { color: red; } }",
            &CompileOptions::default()
        ),
        "@media screen and (min-width: 100px) {\n  a {\n    color: red;\n  }\n}\n"
    );
}

#[test]
fn supports_conditions_are_rebuilt() {
    assert_eq!(
        compile(
            "@supports (display: grid) { a { color: red; } }",
            &CompileOptions::default()
        ),
        "@supports (display: grid) {\n  a {\n    color: red;\n  }\n}\n"
    );
}

#[test]
fn keyframes_blocks_keep_their_selectors() {
    assert_eq!(
        compile(
            "@keyframes spin { from { opacity: 0; } 50% { opacity: 1; } }",
            &CompileOptions::default()
        ),
        "@keyframes spin {\n  from {\n    opacity: 0;\n  }\n  50% {\n    opacity: 1;\n  }\n}\n"
    );
}

#[test]
fn custom_properties_keep_their_raw_value() {
    assert_eq!(
        compile("a { --x: 1px; }", &CompileOptions::default()),
        "a {\n  --x: 1px;\n}\n"
    );
}

#[test]
fn nested_declarations_expand_with_a_prefix() {
    assert_eq!(
        compile(
            "a { margin: 0 { left: 1px; } }",
            &CompileOptions::default()
        ),
        "a {\n  margin: 0;\n  margin-left: 1px;\n}\n"
    );
}

#[test]
fn syntax_is_detected_from_the_url() {
    let mut options = CompileOptions::default();
    options.url = Some("style.sass".into());
    assert_eq!(
        compile("a\n  color: red\n", &options),
        "a {\n  color: red;\n}\n"
    );
}

#[test]
fn out_of_order_static_imports_are_hoisted() {
    assert_eq!(
        compile(
            "a { color: red; }\n@import \"theme.css\";",
            &CompileOptions::default()
        ),
        "@import \"theme.css\";\na {\n  color: red;\n}\n"
    );
}

#[test]
fn dynamic_imports_are_resolved_and_spliced() {
    let mut resolver = MemoryResolver::new();
    resolver.insert("lib/_util.scss", "b { color: blue; }");
    let mut evaluator = PassthroughEvaluator::with_resolver(resolver);
    let mut sink = LogSink;
    let result = compile_string_with(
        "@import \"lib/util\";\na { color: red; }",
        &CompileOptions::default(),
        &mut evaluator,
        &mut sink,
    )
    .expect("import should resolve");
    assert_eq!(result.css, "b {\n  color: blue;\n}\n\na {\n  color: red;\n}\n");
}

#[test]
fn unresolvable_imports_fail() {
    let message = compile_error("@import \"missing\";", &CompileOptions::default());
    assert_eq!(message, "Can't find stylesheet to import: missing.");
}

#[test]
fn import_cycles_are_detected() {
    let mut resolver = MemoryResolver::new();
    resolver.insert("a.scss", "@import \"b\";");
    resolver.insert("b.scss", "@import \"a\";");
    let mut evaluator = PassthroughEvaluator::with_resolver(resolver);
    let mut sink = LogSink;
    let error = compile_string_with(
        "@import \"a\";",
        &CompileOptions::default(),
        &mut evaluator,
        &mut sink,
    )
    .expect_err("cycle should be rejected");
    assert_eq!(error.to_string(), "This file is already being loaded: a.scss.");
}

#[test]
fn warn_and_debug_reach_the_sink() {
    let mut evaluator = PassthroughEvaluator::new();
    let mut sink = CollectingSink::default();
    let result = compile_string_with(
        "@warn \"careful\";\n@debug 1 + 1;\na { color: red; }",
        &CompileOptions::default(),
        &mut evaluator,
        &mut sink,
    )
    .expect("warnings are not fatal");
    assert_eq!(result.css, "a {\n  color: red;\n}\n");
    assert_eq!(sink.diagnostics.len(), 2);
    assert_eq!(sink.diagnostics[0].message, "\"careful\"");
    assert_eq!(sink.diagnostics[1].message, "2");
}

#[test]
fn error_rules_abort_compilation() {
    let message = compile_error("@error \"boom\";", &CompileOptions::default());
    assert_eq!(message, "\"boom\"");
}

#[test]
fn sass_constructs_report_the_evaluator_limit() {
    let message = compile_error("@mixin big { color: red; }", &CompileOptions::default());
    assert_eq!(
        message,
        "@mixin rules aren't supported by the pass-through evaluator."
    );
    let message = compile_error("$x: 1;", &CompileOptions::default());
    assert_eq!(
        message,
        "Variable declarations aren't supported by the pass-through evaluator."
    );
}

#[test]
fn non_ascii_output_gains_a_charset() {
    assert_eq!(
        compile("a { content: \"é\"; }", &CompileOptions::default()),
        "@charset \"UTF-8\";\na {\n  content: \"é\";\n}\n"
    );
}

#[test]
fn comments_survive_outside_compressed_mode() {
    assert_eq!(
        compile("/* note */\na { color: red; }", &CompileOptions::default()),
        "/* note */\na {\n  color: red;\n}\n"
    );
    let options = CompileOptions::with_style(OutputStyle::Compressed);
    assert_eq!(compile("/* note */\na { color: red; }", &options), "a{color:red}");
    assert_eq!(
        compile("/*! legal */\na { color: red; }", &options),
        "/*! legal */a{color:red}"
    );
}

#[test]
fn external_source_maps_get_a_footer_and_payload() {
    let mut options = CompileOptions::default();
    options.url = Some("input.scss".into());
    options.source_map = SourceMapOptions {
        enabled: true,
        file: Some("out.css".into()),
        ..SourceMapOptions::default()
    };
    let result = compile_string("a { color: red; }", &options).expect("should compile");
    assert!(result.css.ends_with("/*# sourceMappingURL=out.css.map */"));

    let json = result.source_map.expect("external maps return the payload");
    assert!(json.contains("\"version\":3"));
    assert!(json.contains("\"file\":\"out.css\""));
    assert!(json.contains("\"sources\":[\"input.scss\"]"));
    assert!(!json.contains("sourcesContent"));
}

#[test]
fn inline_source_maps_embed_a_data_uri() {
    let mut options = CompileOptions::default();
    options.source_map = SourceMapOptions {
        enabled: true,
        inline: true,
        ..SourceMapOptions::default()
    };
    let result = compile_string("a { color: red; }", &options).expect("should compile");
    assert!(result.source_map.is_none());
    assert!(result
        .css
        .contains("/*# sourceMappingURL=data:application/json;base64,"));
    assert!(result.css.ends_with(" */"));
}

#[test]
fn embedded_sources_carry_the_input_text() {
    let mut options = CompileOptions::default();
    options.source_map = SourceMapOptions {
        enabled: true,
        embed_sources: true,
        ..SourceMapOptions::default()
    };
    let source = "a { color: red; }";
    let result = compile_string(source, &options).expect("should compile");
    let json = result.source_map.expect("payload");
    assert!(json.contains("\"sourcesContent\":[\"a { color: red; }\"]"));
}

#[test]
fn imported_files_appear_in_the_source_map() {
    let mut resolver = MemoryResolver::new();
    resolver.insert("lib/_util.scss", "b { color: blue; }");
    let mut evaluator = PassthroughEvaluator::with_resolver(resolver);
    let mut sink = LogSink;
    let mut options = CompileOptions::default();
    options.url = Some("input.scss".into());
    options.source_map.enabled = true;
    let result = compile_string_with(
        "@import \"lib/util\";\na { color: red; }",
        &options,
        &mut evaluator,
        &mut sink,
    )
    .expect("should compile");
    let json = result.source_map.expect("payload");
    assert!(json.contains("\"sources\":[\"input.scss\",\"lib/util\"]"));
    assert!(json.contains("\"mappings\":\""));
}

#[test]
fn source_comments_annotate_style_rules() {
    let mut options = CompileOptions::default();
    options.url = Some("input.scss".into());
    options.source_comments = true;
    let css = compile("a { color: red; }", &options);
    assert_eq!(css, "/* line 1, input.scss */\na {\n  color: red;\n}\n");
}

#[test]
fn parse_errors_surface_with_their_message() {
    let error = compile_string("a { color: ", &CompileOptions::default())
        .expect_err("unterminated declaration");
    assert!(matches!(error, CompileError::Parse(_)));
}
