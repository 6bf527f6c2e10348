//! The compilation pipeline: parse, evaluate, serialize.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use brine_emit::Output;
use brine_source_map::{SourceContext, SourceMapBuilder, SourceMapPayload};
use brine_syntax::parse_stylesheet;

use crate::error::CompileError;
use crate::evaluator::{DiagnosticSink, Evaluator, LogSink, PassthroughEvaluator};
use crate::options::CompileOptions;

/// A finished compilation.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub css: String,
    /// The rendered source-map JSON, when maps were requested and the
    /// payload lives in an external file.
    pub source_map: Option<String>,
}

/// Compiles a stylesheet with the pass-through evaluator, logging
/// diagnostics through `tracing`.
pub fn compile_string(
    source: &str,
    options: &CompileOptions,
) -> Result<CompileResult, CompileError> {
    let mut evaluator = PassthroughEvaluator::new();
    let mut sink = LogSink;
    compile_string_with(source, options, &mut evaluator, &mut sink)
}

/// Compiles a stylesheet with a caller-supplied evaluator and sink.
pub fn compile_string_with(
    source: &str,
    options: &CompileOptions,
    evaluator: &mut dyn Evaluator,
    sink: &mut dyn DiagnosticSink,
) -> Result<CompileResult, CompileError> {
    let url = options.url.as_deref().unwrap_or("stdin");
    tracing::debug!(url, style = ?options.style, "compiling");

    let mut context = SourceContext::new();
    let file = context.add_string(source, url, url);
    let outcome = parse_stylesheet(source, file, options.syntax())?;
    for diagnostic in &outcome.diagnostics {
        tracing::warn!(message = %diagnostic.message, "parse diagnostic");
        sink.report(diagnostic);
    }

    let statements = evaluator.evaluate(&outcome.sheet, &mut context, options, sink)?;

    let srcmap = options
        .source_map
        .enabled
        .then(|| SourceMapBuilder::new(true, true));
    let mut output = Output::new(options.output_options(), srcmap);
    if options.source_comments {
        output.set_source_paths(
            context
                .iter()
                .map(|(_, source)| source.import_path.clone())
                .collect(),
        );
    }
    output.visit_root(&statements)?;
    let buffer = output.finish()?;

    let mut css = buffer.text;
    let mut source_map = None;
    if let Some(map) = buffer.map {
        // Files were registered in order, so the remap is the identity.
        let remap: Vec<u32> = (0..context.len() as u32).collect();
        let mut payload = SourceMapPayload::new(
            map.render(&remap),
            context
                .iter()
                .map(|(_, source)| source.import_path.clone())
                .collect(),
        );
        payload.file = options.source_map.file.clone();
        payload.source_root = options.source_map.source_root.clone();
        if options.source_map.embed_sources {
            payload.sources_content = Some(
                context
                    .iter()
                    .map(|(_, source)| source.text().to_string())
                    .collect(),
            );
        }
        let json = serde_json::to_string(&payload)?;

        if !css.is_empty() && !css.ends_with('\n') {
            css.push_str(&options.linefeed);
        }
        if options.source_map.inline {
            let encoded = STANDARD.encode(&json);
            css.push_str(&format!(
                "/*# sourceMappingURL=data:application/json;base64,{encoded} */"
            ));
        } else {
            let stem = options
                .source_map
                .file
                .as_deref()
                .unwrap_or("stylesheet.css");
            css.push_str(&format!("/*# sourceMappingURL={stem}.map */"));
            source_map = Some(json);
        }
    }

    Ok(CompileResult { css, source_map })
}
