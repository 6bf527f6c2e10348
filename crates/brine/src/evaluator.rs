//! The evaluation seam and its pass-through implementation.
//!
//! Full evaluation (variables, mixins, functions, extend resolution) sits
//! behind the [`Evaluator`] trait so the front and back halves of the
//! pipeline can be exercised without it. [`PassthroughEvaluator`] covers
//! the plain-CSS subset plus literal interpolation and constant folding:
//! enough to format CSS, resolve `#{...}` segments built from literals,
//! and follow dynamic imports through an [`ImportResolver`]. Anything
//! that genuinely needs an environment reports an error.

use std::collections::HashMap;

use brine_emit::{inspect_value, CssStmt, CssString, Inspect, OutputOptions, OutputStyle, Value};
use brine_source_map::{SourceContext, Span};
use brine_syntax::ast::{
    BinaryOperator, Expression, ExpressionKind, ImportArgument, NodeId, Statement, StyleSheet,
    SupportsCondition, UnaryOperator,
};
use brine_syntax::parser::{parse_stylesheet, Diagnostic, Syntax};
use brine_syntax::{Interpolation, InterpolationPart, KeyframeSelectorParser, MediaQueryParser};

use crate::error::CompileError;
use crate::options::{syntax_for_path, CompileOptions};

/// Receives non-fatal diagnostics: parser warnings, `@warn`, `@debug`.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Forwards every diagnostic to `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, diagnostic: &Diagnostic) {
        tracing::warn!(message = %diagnostic.message, kind = ?diagnostic.kind, "diagnostic");
    }
}

/// Collects diagnostics in memory, for tests and tooling.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }
}

/// A stylesheet produced by an [`ImportResolver`].
#[derive(Debug, Clone)]
pub struct ResolvedImport {
    /// The canonical path the URL resolved to.
    pub path: String,
    pub text: String,
    pub syntax: Syntax,
}

/// Resolves dynamic `@import` URLs to stylesheet text.
///
/// Implementations should follow the usual lookup order: the URL exactly,
/// then its partial (`_name`) variant, then both with the `.scss`,
/// `.sass` and `.css` extensions, then `index`/`_index` files inside a
/// directory of that name.
pub trait ImportResolver {
    fn resolve(&mut self, url: &str) -> Option<ResolvedImport>;
}

/// The resolver for compilations that must not load anything.
#[derive(Debug, Default)]
pub struct NoImports;

impl ImportResolver for NoImports {
    fn resolve(&mut self, _url: &str) -> Option<ResolvedImport> {
        None
    }
}

/// An in-memory resolver keyed by exact path, applying the documented
/// lookup order to each URL.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    files: HashMap<String, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        MemoryResolver::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl ImportResolver for MemoryResolver {
    fn resolve(&mut self, url: &str) -> Option<ResolvedImport> {
        for candidate in lookup_candidates(url) {
            if let Some(text) = self.files.get(&candidate) {
                return Some(ResolvedImport {
                    syntax: syntax_for_path(&candidate),
                    text: text.clone(),
                    path: candidate,
                });
            }
        }
        None
    }
}

fn lookup_candidates(url: &str) -> Vec<String> {
    let (dir, name) = match url.rfind('/') {
        Some(slash) => (&url[..=slash], &url[slash + 1..]),
        None => ("", url),
    };
    let bare = !name.starts_with('_');

    let mut out = vec![url.to_string()];
    if bare {
        out.push(format!("{dir}_{name}"));
    }
    for ext in [".scss", ".sass", ".css"] {
        out.push(format!("{url}{ext}"));
        if bare {
            out.push(format!("{dir}_{name}{ext}"));
        }
    }
    for ext in [".scss", ".sass", ".css"] {
        out.push(format!("{url}/index{ext}"));
        out.push(format!("{url}/_index{ext}"));
    }
    out
}

/// Turns a parsed stylesheet into an evaluated CSS tree.
pub trait Evaluator {
    fn evaluate(
        &mut self,
        sheet: &StyleSheet,
        context: &mut SourceContext,
        options: &CompileOptions,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Vec<CssStmt>, CompileError>;
}

/// The constant-folding evaluator described in the module docs.
#[derive(Debug, Default)]
pub struct PassthroughEvaluator<R = NoImports> {
    resolver: R,
}

impl PassthroughEvaluator {
    pub fn new() -> Self {
        PassthroughEvaluator { resolver: NoImports }
    }
}

impl<R: ImportResolver> PassthroughEvaluator<R> {
    pub fn with_resolver(resolver: R) -> Self {
        PassthroughEvaluator { resolver }
    }
}

impl<R: ImportResolver> Evaluator for PassthroughEvaluator<R> {
    fn evaluate(
        &mut self,
        sheet: &StyleSheet,
        context: &mut SourceContext,
        options: &CompileOptions,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Vec<CssStmt>, CompileError> {
        let mut pass = Pass {
            resolver: &mut self.resolver,
            context,
            sink,
            text_options: OutputOptions {
                style: OutputStyle::Expanded,
                ..options.output_options()
            },
            active_imports: Vec::new(),
            saw_css: false,
        };
        let root = sheet.node(sheet.root());
        pass.evaluate_children(sheet, root.kind.children(), Ctx::root())
    }
}

/// Where in the tree the current statement sits.
#[derive(Clone, Copy)]
struct Ctx<'a> {
    at_root: bool,
    in_keyframes: bool,
    /// Enclosing declaration name, for nested property shorthand.
    prefix: Option<&'a str>,
}

impl Ctx<'_> {
    fn root() -> Self {
        Ctx {
            at_root: true,
            in_keyframes: false,
            prefix: None,
        }
    }

    fn nested() -> Self {
        Ctx {
            at_root: false,
            in_keyframes: false,
            prefix: None,
        }
    }
}

struct Pass<'a, R> {
    resolver: &'a mut R,
    context: &'a mut SourceContext,
    sink: &'a mut dyn DiagnosticSink,
    /// Options used when rendering values back to text.
    text_options: OutputOptions,
    /// Canonical paths currently being imported, for cycle detection.
    active_imports: Vec<String>,
    /// Whether any real CSS has been produced at the root yet; imports
    /// after that point are out of order.
    saw_css: bool,
}

impl<R: ImportResolver> Pass<'_, R> {
    fn evaluate_children(
        &mut self,
        sheet: &StyleSheet,
        children: &[NodeId],
        ctx: Ctx<'_>,
    ) -> Result<Vec<CssStmt>, CompileError> {
        let mut out = Vec::new();
        for &child in children {
            self.evaluate_statement(sheet, child, ctx, &mut out)?;
        }
        Ok(out)
    }

    fn evaluate_statement(
        &mut self,
        sheet: &StyleSheet,
        id: NodeId,
        ctx: Ctx<'_>,
        out: &mut Vec<CssStmt>,
    ) -> Result<(), CompileError> {
        let node = sheet.node(id);
        let span = node.span;
        match &node.kind {
            Statement::Root { children } => {
                let evaluated = self.evaluate_children(sheet, children, ctx)?;
                out.extend(evaluated);
            }
            Statement::StyleRule { selector, children } => {
                if ctx.at_root {
                    self.saw_css = true;
                }
                let text = self.resolve_interpolation(selector)?;
                if ctx.in_keyframes {
                    let selectors =
                        KeyframeSelectorParser::new(text.trim(), selector.span.file).parse()?;
                    out.push(CssStmt::KeyframeBlock {
                        selectors,
                        children: self.evaluate_children(sheet, children, Ctx::nested())?,
                        span,
                    });
                } else {
                    out.push(CssStmt::StyleRule {
                        selector: CssString::new(text.trim(), selector.span),
                        children: self.evaluate_children(sheet, children, Ctx::nested())?,
                        span,
                    });
                }
            }
            Statement::Declaration {
                name,
                value,
                custom_value,
                children,
            } => {
                if ctx.at_root {
                    self.saw_css = true;
                }
                let name_text = self.resolve_interpolation(name)?;
                let full_name = match ctx.prefix {
                    Some(prefix) => format!("{prefix}-{name_text}"),
                    None => name_text,
                };
                if let Some(raw) = custom_value {
                    out.push(CssStmt::Declaration {
                        name: CssString::new(full_name, name.span),
                        value: Value::String {
                            text: self.resolve_interpolation(raw)?,
                            quoted: false,
                            span: raw.span,
                        },
                        custom: true,
                        span,
                    });
                    return Ok(());
                }
                if let Some(expression) = value {
                    let evaluated = self.eval_expression(expression)?;
                    if !evaluated.is_blank() {
                        out.push(CssStmt::Declaration {
                            name: CssString::new(full_name.clone(), name.span),
                            value: evaluated,
                            custom: false,
                            span,
                        });
                    }
                }
                if !children.is_empty() {
                    let nested = Ctx {
                        prefix: Some(&full_name),
                        ..Ctx::nested()
                    };
                    let evaluated = self.evaluate_children(sheet, children, nested)?;
                    out.extend(evaluated);
                }
            }
            Statement::LoudComment { text } => {
                let text = self.resolve_interpolation(text)?;
                out.push(CssStmt::Comment {
                    preserved: text.starts_with("/*!"),
                    text,
                    span,
                });
            }
            Statement::SilentComment { .. } => {}
            Statement::Media { query, children } => {
                if ctx.at_root {
                    self.saw_css = true;
                }
                let text = self.resolve_interpolation(query)?;
                let queries = MediaQueryParser::new(&text, query.span.file).parse()?;
                out.push(CssStmt::Media {
                    queries,
                    children: self.evaluate_children(sheet, children, Ctx::nested())?,
                    span,
                });
            }
            Statement::Supports {
                condition,
                children,
            } => {
                if ctx.at_root {
                    self.saw_css = true;
                }
                let text = self.supports_condition_text(condition)?;
                out.push(CssStmt::Supports {
                    condition: CssString::new(text, condition.span()),
                    children: self.evaluate_children(sheet, children, Ctx::nested())?,
                    span,
                });
            }
            Statement::AtRule {
                name,
                value,
                children,
            } => {
                if ctx.at_root {
                    self.saw_css = true;
                }
                let name_text = self.resolve_interpolation(name)?;
                let body_ctx = Ctx {
                    in_keyframes: name_text.ends_with("keyframes"),
                    ..Ctx::nested()
                };
                let value = value
                    .as_ref()
                    .map(|value| {
                        Ok::<_, CompileError>(CssString::new(
                            self.resolve_interpolation(value)?,
                            value.span,
                        ))
                    })
                    .transpose()?;
                let children = children
                    .as_ref()
                    .map(|children| self.evaluate_children(sheet, children, body_ctx))
                    .transpose()?;
                out.push(CssStmt::AtRule {
                    name: CssString::new(name_text, name.span),
                    value,
                    children,
                    span,
                });
            }
            Statement::Import { imports } => {
                for import in imports {
                    match import {
                        ImportArgument::Static {
                            url,
                            supports,
                            media,
                            span: import_span,
                        } => {
                            let supports = supports
                                .as_ref()
                                .map(|condition| {
                                    Ok::<_, CompileError>(CssString::new(
                                        format!(
                                            "supports({})",
                                            self.supports_condition_text(condition)?
                                        ),
                                        condition.span(),
                                    ))
                                })
                                .transpose()?;
                            let media = match media {
                                Some(media) => {
                                    let text = self.resolve_interpolation(media)?;
                                    MediaQueryParser::new(&text, media.span.file).parse()?
                                }
                                None => Vec::new(),
                            };
                            out.push(CssStmt::Import {
                                url: CssString::new(self.resolve_interpolation(url)?, url.span),
                                supports,
                                media,
                                out_of_order: ctx.at_root && self.saw_css,
                                span: *import_span,
                            });
                        }
                        ImportArgument::Dynamic { url, span } => {
                            self.evaluate_dynamic_import(url, *span, ctx, out)?;
                        }
                    }
                }
            }
            Statement::AtRoot { children, .. } => {
                // Without selector nesting there is nothing to climb out
                // of; children are spliced in place.
                let evaluated = self.evaluate_children(sheet, children, ctx)?;
                out.extend(evaluated);
            }
            Statement::Debug { expression } => {
                let value = self.eval_expression(expression)?;
                let message = inspect_value(&value)?;
                tracing::debug!(%message, "@debug");
                self.sink.report(&Diagnostic {
                    message,
                    span: expression.span,
                    kind: brine_syntax::DiagnosticKind::Warning,
                });
            }
            Statement::Warn { expression } => {
                let value = self.eval_expression(expression)?;
                let message = inspect_value(&value)?;
                tracing::warn!(%message, "@warn");
                self.sink.report(&Diagnostic {
                    message,
                    span: expression.span,
                    kind: brine_syntax::DiagnosticKind::Warning,
                });
            }
            Statement::Error { expression } => {
                let value = self.eval_expression(expression)?;
                return Err(CompileError::evaluation(
                    inspect_value(&value)?,
                    expression.span,
                ));
            }
            Statement::VariableDeclaration { .. } => {
                return Err(unsupported("Variable declarations", span));
            }
            Statement::If { .. } => return Err(unsupported("@if rules", span)),
            Statement::Each { .. } => return Err(unsupported("@each rules", span)),
            Statement::For { .. } => return Err(unsupported("@for rules", span)),
            Statement::While { .. } => return Err(unsupported("@while rules", span)),
            Statement::Mixin { .. } => return Err(unsupported("@mixin rules", span)),
            Statement::Include { .. } => return Err(unsupported("@include rules", span)),
            Statement::Function { .. } => return Err(unsupported("@function rules", span)),
            Statement::Return { .. } => return Err(unsupported("@return rules", span)),
            Statement::Content { .. } => return Err(unsupported("@content rules", span)),
            Statement::Extend { .. } => return Err(unsupported("@extend rules", span)),
            Statement::Use { .. } => return Err(unsupported("@use rules", span)),
            Statement::Forward { .. } => return Err(unsupported("@forward rules", span)),
        }
        Ok(())
    }

    fn evaluate_dynamic_import(
        &mut self,
        url: &str,
        span: Span,
        ctx: Ctx<'_>,
        out: &mut Vec<CssStmt>,
    ) -> Result<(), CompileError> {
        let resolved = self.resolver.resolve(url).ok_or_else(|| {
            CompileError::evaluation(format!("Can't find stylesheet to import: {url}."), span)
        })?;
        if self.active_imports.contains(&resolved.path) {
            return Err(CompileError::evaluation(
                format!("This file is already being loaded: {}.", resolved.path),
                span,
            ));
        }
        tracing::debug!(url, path = %resolved.path, "importing");

        let file = self
            .context
            .add_string(resolved.text.clone(), url, resolved.path.clone());
        let outcome = parse_stylesheet(&resolved.text, file, resolved.syntax)?;
        for diagnostic in &outcome.diagnostics {
            self.sink.report(diagnostic);
        }

        self.active_imports.push(resolved.path);
        let root = outcome.sheet.node(outcome.sheet.root());
        let result = self.evaluate_children(&outcome.sheet, root.kind.children(), ctx);
        self.active_imports.pop();
        out.extend(result?);
        Ok(())
    }

    fn resolve_interpolation(
        &mut self,
        interpolation: &Interpolation,
    ) -> Result<String, CompileError> {
        let mut out = String::new();
        for part in &interpolation.parts {
            match part {
                InterpolationPart::Text(text) => out.push_str(text),
                InterpolationPart::Expression(expression) => {
                    let value = self.eval_expression(expression)?;
                    out.push_str(&self.interpolated_text(&value)?);
                }
            }
        }
        Ok(out)
    }

    /// Renders a value the way interpolation does: quoted strings lose
    /// their quotes.
    fn interpolated_text(&self, value: &Value) -> Result<String, CompileError> {
        let mut inspect = Inspect::new(self.text_options.clone(), None);
        inspect.quotes = false;
        inspect.visit_value(value)?;
        Ok(inspect.into_buffer().text)
    }

    /// Renders a value as it would appear in a CSS position.
    fn css_text(&self, value: &Value) -> Result<String, CompileError> {
        let mut inspect = Inspect::new(self.text_options.clone(), None);
        inspect.visit_value(value)?;
        Ok(inspect.into_buffer().text)
    }

    fn supports_condition_text(
        &mut self,
        condition: &SupportsCondition,
    ) -> Result<String, CompileError> {
        match condition {
            SupportsCondition::Declaration { name, value, .. } => {
                let name_value = self.eval_expression(name)?;
                let value_value = self.eval_expression(value)?;
                Ok(format!(
                    "({}: {})",
                    self.interpolated_text(&name_value)?,
                    self.css_text(&value_value)?
                ))
            }
            SupportsCondition::Negation { condition, .. } => {
                Ok(format!("not {}", self.grouped_condition_text(condition)?))
            }
            SupportsCondition::Operation {
                left,
                operator,
                right,
                ..
            } => Ok(format!(
                "{} {operator} {}",
                self.grouped_condition_text(left)?,
                self.grouped_condition_text(right)?
            )),
            SupportsCondition::Interpolation { expression, .. } => {
                let value = self.eval_expression(expression)?;
                self.interpolated_text(&value)
            }
        }
    }

    /// Compound operands keep explicit parentheses so nesting survives.
    fn grouped_condition_text(
        &mut self,
        condition: &SupportsCondition,
    ) -> Result<String, CompileError> {
        let text = self.supports_condition_text(condition)?;
        match condition {
            SupportsCondition::Operation { .. } | SupportsCondition::Negation { .. } => {
                Ok(format!("({text})"))
            }
            _ => Ok(text),
        }
    }

    fn eval_expression(&mut self, expression: &Expression) -> Result<Value, CompileError> {
        let span = expression.span;
        match &expression.kind {
            ExpressionKind::String { text, quoted } => Ok(Value::String {
                text: self.resolve_interpolation(text)?,
                quoted: *quoted,
                span,
            }),
            ExpressionKind::Number { value, unit } => Ok(Value::Number {
                value: *value,
                unit: unit.clone().unwrap_or_default(),
                as_slash: None,
                span,
            }),
            ExpressionKind::Color {
                red,
                green,
                blue,
                alpha,
                original,
            } => Ok(Value::Color {
                red: f64::from(*red),
                green: f64::from(*green),
                blue: f64::from(*blue),
                alpha: *alpha,
                original: Some(original.clone()),
                span,
            }),
            ExpressionKind::Boolean(value) => Ok(Value::Boolean {
                value: *value,
                span,
            }),
            ExpressionKind::Null => Ok(Value::Null { span }),
            ExpressionKind::List {
                elements,
                separator,
                bracketed,
            } => Ok(Value::List {
                elements: elements
                    .iter()
                    .map(|element| self.eval_expression(element))
                    .collect::<Result<_, _>>()?,
                separator: *separator,
                brackets: *bracketed,
                span,
            }),
            ExpressionKind::Map { pairs } => Ok(Value::Map {
                entries: pairs
                    .iter()
                    .map(|(key, value)| {
                        Ok((self.eval_expression(key)?, self.eval_expression(value)?))
                    })
                    .collect::<Result<_, CompileError>>()?,
                span,
            }),
            ExpressionKind::Parenthesized(inner) => self.eval_expression(inner),
            ExpressionKind::UnaryOperation { operator, operand } => {
                let value = self.eval_expression(operand)?;
                self.eval_unary(*operator, value, span)
            }
            ExpressionKind::BinaryOperation {
                operator,
                left,
                right,
                allows_slash,
            } => self.eval_binary(*operator, left, right, *allows_slash, span),
            ExpressionKind::FunctionCall {
                namespace: None,
                name,
                arguments,
            } if arguments.named.is_empty()
                && arguments.rest.is_none()
                && arguments.keyword_rest.is_none() =>
            {
                // Treated as a plain CSS function: fold the arguments and
                // rebuild the call textually.
                let name_text = self.resolve_interpolation(name)?;
                let mut rendered = Vec::with_capacity(arguments.positional.len());
                for argument in &arguments.positional {
                    let value = self.eval_expression(argument)?;
                    rendered.push(self.css_text(&value)?);
                }
                Ok(Value::String {
                    text: format!("{name_text}({})", rendered.join(", ")),
                    quoted: false,
                    span,
                })
            }
            ExpressionKind::FunctionCall { .. } => Err(unsupported("Sass function calls", span)),
            ExpressionKind::Variable { .. } => Err(unsupported("Variables", span)),
            ExpressionKind::ParentSelector => Err(unsupported("Parent selectors", span)),
        }
    }

    fn eval_unary(
        &self,
        operator: UnaryOperator,
        value: Value,
        span: Span,
    ) -> Result<Value, CompileError> {
        match (operator, value) {
            (UnaryOperator::Minus, Value::Number { value, unit, .. }) => Ok(Value::Number {
                value: -value,
                unit,
                as_slash: None,
                span,
            }),
            (UnaryOperator::Plus, number @ Value::Number { .. }) => Ok(number),
            (UnaryOperator::Not, value) => Ok(Value::Boolean {
                value: !is_truthy(&value),
                span,
            }),
            (operator, value) => {
                let text = self.interpolated_text(&value)?;
                Ok(Value::String {
                    text: format!("{}{text}", operator.as_str()),
                    quoted: false,
                    span,
                })
            }
        }
    }

    fn eval_binary(
        &mut self,
        operator: BinaryOperator,
        left: &Expression,
        right: &Expression,
        allows_slash: bool,
        span: Span,
    ) -> Result<Value, CompileError> {
        let lhs = self.eval_expression(left)?;

        // `and`/`or` short-circuit on truthiness.
        match operator {
            BinaryOperator::And => {
                return if is_truthy(&lhs) {
                    self.eval_expression(right)
                } else {
                    Ok(lhs)
                };
            }
            BinaryOperator::Or => {
                return if is_truthy(&lhs) {
                    Ok(lhs)
                } else {
                    self.eval_expression(right)
                };
            }
            _ => {}
        }

        let rhs = self.eval_expression(right)?;
        match operator {
            BinaryOperator::Equals => Ok(Value::Boolean {
                value: lhs == rhs,
                span,
            }),
            BinaryOperator::NotEquals => Ok(Value::Boolean {
                value: lhs != rhs,
                span,
            }),
            BinaryOperator::Plus => match (&lhs, &rhs) {
                (
                    Value::Number {
                        value: a, unit: ua, ..
                    },
                    Value::Number {
                        value: b, unit: ub, ..
                    },
                ) => Ok(Value::Number {
                    value: a + b,
                    unit: additive_unit(ua, ub, span)?,
                    as_slash: None,
                    span,
                }),
                (Value::String { .. }, _) | (_, Value::String { .. }) => {
                    let quoted = matches!(&lhs, Value::String { quoted: true, .. });
                    let mut text = self.interpolated_text(&lhs)?;
                    text.push_str(&self.interpolated_text(&rhs)?);
                    Ok(Value::String { text, quoted, span })
                }
                _ => Err(self.undefined_operation(operator, &lhs, &rhs, span)),
            },
            BinaryOperator::Minus
            | BinaryOperator::Times
            | BinaryOperator::DividedBy
            | BinaryOperator::Modulo => match (&lhs, &rhs) {
                (
                    Value::Number {
                        value: a, unit: ua, ..
                    },
                    Value::Number {
                        value: b, unit: ub, ..
                    },
                ) => self.eval_arithmetic(operator, *a, ua, *b, ub, allows_slash, span),
                _ => Err(self.undefined_operation(operator, &lhs, &rhs, span)),
            },
            BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEquals
            | BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEquals => match (&lhs, &rhs) {
                (
                    Value::Number {
                        value: a, unit: ua, ..
                    },
                    Value::Number {
                        value: b, unit: ub, ..
                    },
                ) => {
                    additive_unit(ua, ub, span)?;
                    let value = match operator {
                        BinaryOperator::GreaterThan => a > b,
                        BinaryOperator::GreaterThanOrEquals => a >= b,
                        BinaryOperator::LessThan => a < b,
                        _ => a <= b,
                    };
                    Ok(Value::Boolean { value, span })
                }
                _ => Err(self.undefined_operation(operator, &lhs, &rhs, span)),
            },
            BinaryOperator::SingleEquals => {
                let mut text = self.interpolated_text(&lhs)?;
                text.push('=');
                text.push_str(&self.interpolated_text(&rhs)?);
                Ok(Value::String {
                    text,
                    quoted: false,
                    span,
                })
            }
            BinaryOperator::And | BinaryOperator::Or => unreachable!("handled above"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn eval_arithmetic(
        &self,
        operator: BinaryOperator,
        a: f64,
        unit_a: &str,
        b: f64,
        unit_b: &str,
        allows_slash: bool,
        span: Span,
    ) -> Result<Value, CompileError> {
        match operator {
            BinaryOperator::Minus => Ok(Value::Number {
                value: a - b,
                unit: additive_unit(unit_a, unit_b, span)?,
                as_slash: None,
                span,
            }),
            BinaryOperator::Times => {
                let unit = if unit_a.is_empty() {
                    unit_b
                } else if unit_b.is_empty() {
                    unit_a
                } else {
                    return Err(CompileError::evaluation(
                        format!("Incompatible units {unit_a} and {unit_b}."),
                        span,
                    ));
                };
                Ok(Value::Number {
                    value: a * b,
                    unit: unit.to_string(),
                    as_slash: None,
                    span,
                })
            }
            BinaryOperator::DividedBy => {
                let unit = if unit_b.is_empty() {
                    unit_a.to_string()
                } else if unit_a == unit_b {
                    String::new()
                } else {
                    return Err(CompileError::evaluation(
                        format!("Incompatible units {unit_a} and {unit_b}."),
                        span,
                    ));
                };
                let as_slash = allows_slash.then(|| {
                    Box::new((
                        Value::Number {
                            value: a,
                            unit: unit_a.to_string(),
                            as_slash: None,
                            span,
                        },
                        Value::Number {
                            value: b,
                            unit: unit_b.to_string(),
                            as_slash: None,
                            span,
                        },
                    ))
                });
                Ok(Value::Number {
                    value: a / b,
                    unit,
                    as_slash,
                    span,
                })
            }
            _ => {
                // Modulo takes the sign of the right operand.
                let unit = additive_unit(unit_a, unit_b, span)?;
                let mut value = a % b;
                if value != 0.0 && (value < 0.0) != (b < 0.0) {
                    value += b;
                }
                Ok(Value::Number {
                    value,
                    unit,
                    as_slash: None,
                    span,
                })
            }
        }
    }

    fn undefined_operation(
        &self,
        operator: BinaryOperator,
        lhs: &Value,
        rhs: &Value,
        span: Span,
    ) -> CompileError {
        let lhs = inspect_value(lhs).unwrap_or_default();
        let rhs = inspect_value(rhs).unwrap_or_default();
        CompileError::evaluation(
            format!("Undefined operation \"{lhs} {} {rhs}\".", operator.as_str()),
            span,
        )
    }
}

fn unsupported(what: &str, span: Span) -> CompileError {
    CompileError::evaluation(
        format!("{what} aren't supported by the pass-through evaluator."),
        span,
    )
}

/// Everything except `false` and `null` is truthy.
fn is_truthy(value: &Value) -> bool {
    !matches!(
        value,
        Value::Null { .. } | Value::Boolean { value: false, .. }
    )
}

fn additive_unit(a: &str, b: &str, span: Span) -> Result<String, CompileError> {
    if a == b || b.is_empty() {
        Ok(a.to_string())
    } else if a.is_empty() {
        Ok(b.to_string())
    } else {
        Err(CompileError::evaluation(
            format!("Incompatible units {a} and {b}."),
            span,
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lookup_order_prefers_exact_then_partial_then_extensions() {
        let candidates = lookup_candidates("dir/name");
        assert_eq!(candidates[0], "dir/name");
        assert_eq!(candidates[1], "dir/_name");
        assert_eq!(candidates[2], "dir/name.scss");
        assert_eq!(candidates[3], "dir/_name.scss");
        assert!(candidates.contains(&"dir/name/_index.scss".to_string()));
    }

    #[test]
    fn partials_are_not_doubled() {
        let candidates = lookup_candidates("_name");
        assert!(!candidates.contains(&"__name".to_string()));
        assert!(candidates.contains(&"_name.scss".to_string()));
    }

    #[test]
    fn memory_resolver_applies_lookup_order() {
        let mut resolver = MemoryResolver::new();
        resolver.insert("lib/_util.scss", "a { b: c; }");
        let resolved = resolver.resolve("lib/util").expect("should resolve");
        assert_eq!(resolved.path, "lib/_util.scss");
        assert_eq!(resolved.syntax, Syntax::Scss);
        assert!(resolver.resolve("lib/missing").is_none());
    }
}
