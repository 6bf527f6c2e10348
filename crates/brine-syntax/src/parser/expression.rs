//! Expression parsing.
//!
//! Expressions use a manual operator-precedence machine rather than
//! recursive productions per operator: comma lists, space lists, binary
//! operators and single expressions are tracked as explicit state so the
//! parser can retroactively reinterpret `/` (division vs. the CSS
//! shorthand separator) and re-parse `(1/2, 1)` as a list once the comma
//! proves it wasn't a parenthesized division.

use std::collections::HashSet;

use brine_source_map::{Offset, Span};

use crate::ast::{
    Argument, ArgumentDeclaration, ArgumentInvocation, BinaryOperator, Expression,
    ExpressionKind, ListSeparator, UnaryOperator,
};
use crate::character::{
    as_hex, equals_letter_ignore_case, is_alphabetic, is_digit, is_hex, is_name_start,
    is_whitespace,
};
use crate::color_names::color_for_name;
use crate::error::ParseResult;
use crate::interpolation::{Interpolation, InterpolationBuffer};
use crate::scanner::ScannerState;

use super::StylesheetParser;

/// The smallest span covering both [a] and [b]. Assumes [a] starts first.
pub(crate) fn merge_spans(a: Span, b: Span) -> Span {
    Span::new(a.file, a.start, Offset::distance(a.start, b.end()))
}

/// Strips a leading `-vendor-` prefix, if any.
pub(crate) fn unvendor(name: &str) -> &str {
    let mut bytes = name.bytes();
    if bytes.next() != Some(b'-') {
        return name;
    }
    match name[1..].find('-') {
        Some(i) => &name[i + 2..],
        None => name,
    }
}

fn is_hex_color(identifier: &Interpolation) -> bool {
    match identifier.as_plain() {
        Some(plain) => {
            matches!(plain.len(), 3 | 4 | 6 | 8) && plain.bytes().all(is_hex)
        }
        None => false,
    }
}

pub(crate) type Until = fn(&StylesheetParser<'_>) -> bool;

fn until_comma(parser: &StylesheetParser<'_>) -> bool {
    parser.scanner.peek() == Some(b',')
}

/// In-flight state of one expression parse.
struct ExpressionState {
    start: Offset,
    start_state: ScannerState,
    comma_expressions: Option<Vec<Expression>>,
    space_expressions: Option<Vec<Expression>>,
    operators: Vec<BinaryOperator>,
    operands: Vec<Expression>,
    single_expression: Option<Expression>,
    /// The left-hand side of a pending Microsoft `=`.
    single_equals_operand: Option<Expression>,
    /// Whether a `/` here may still be a value separator rather than
    /// division.
    allow_slash: bool,
}

impl ExpressionState {
    fn new(start: Offset, start_state: ScannerState) -> Self {
        ExpressionState {
            start,
            start_state,
            comma_expressions: None,
            space_expressions: None,
            operators: Vec::new(),
            operands: Vec::new(),
            single_expression: None,
            single_equals_operand: None,
            allow_slash: true,
        }
    }
}

impl<'a> StylesheetParser<'a> {
    pub(crate) fn read_expression(&mut self) -> ParseResult<Expression> {
        self.read_expression_with(false, false, None)
    }

    pub(crate) fn read_expression_until_comma(
        &mut self,
        single_equals: bool,
    ) -> ParseResult<Expression> {
        self.read_expression_with(false, single_equals, Some(until_comma))
    }

    pub(crate) fn read_expression_with(
        &mut self,
        bracket_list: bool,
        single_equals: bool,
        until: Option<Until>,
    ) -> ParseResult<Expression> {
        self.enter()?;
        let result = self.read_expression_inner(bracket_list, single_equals, until);
        self.leave();
        result
    }

    fn read_expression_inner(
        &mut self,
        bracket_list: bool,
        single_equals: bool,
        until: Option<Until>,
    ) -> ParseResult<Expression> {
        if let Some(until) = until {
            if until(self) {
                return Err(self.scanner.fail("expression"));
            }
        }

        let start = self.scanner.offset;
        let start_state = self.scanner.state();
        if bracket_list {
            self.scanner.expect_char(b'[', None)?;
            self.scan_whitespace()?;
            if self.scanner.scan_char(b']') {
                return Ok(Expression::new(
                    self.scanner.raw_span_from(start),
                    ExpressionKind::List {
                        elements: Vec::new(),
                        separator: ListSeparator::Undecided,
                        bracketed: true,
                    },
                ));
            }
        }

        let mut state = ExpressionState::new(start, start_state);
        let was_in_parentheses = self.in_parentheses;

        loop {
            self.scan_whitespace()?;
            if let Some(until) = until {
                if until(self) {
                    break;
                }
            }
            let Some(first) = self.scanner.peek() else { break };
            match first {
                b'(' => {
                    let expression = self.read_parenthesized_expression()?;
                    self.add_single_expression(&mut state, expression)?;
                }
                b'[' => {
                    let expression = self.read_expression_with(true, false, None)?;
                    self.add_single_expression(&mut state, expression)?;
                }
                b'$' => {
                    let expression = self.read_variable_expression()?;
                    self.add_single_expression(&mut state, expression)?;
                }
                b'&' => {
                    let expression = self.read_parent_expression()?;
                    self.add_single_expression(&mut state, expression)?;
                }
                b'\'' | b'"' => {
                    let expression = self.read_interpolated_string_expression()?;
                    self.add_single_expression(&mut state, expression)?;
                }
                b'#' => {
                    let expression = self.read_hash_expression()?;
                    self.add_single_expression(&mut state, expression)?;
                }
                b'=' => {
                    self.scanner.scan_char(b'=');
                    if single_equals && self.scanner.peek() != Some(b'=') {
                        self.resolve_space_expressions(&mut state)?;
                        match state.single_expression.take() {
                            Some(operand) => state.single_equals_operand = Some(operand),
                            None => return Err(self.scanner.fail("expression")),
                        }
                    } else {
                        self.scanner.expect_char(b'=', None)?;
                        self.add_operator(&mut state, BinaryOperator::Equals)?;
                    }
                }
                b'!' => match self.scanner.peek_at(1) {
                    Some(b'=') => {
                        self.scanner.scan_char(b'!');
                        self.scanner.scan_char(b'=');
                        self.add_operator(&mut state, BinaryOperator::NotEquals)?;
                    }
                    None => {
                        let expression = self.read_important_expression()?;
                        self.add_single_expression(&mut state, expression)?;
                    }
                    Some(next)
                        if equals_letter_ignore_case(b'i', next) || is_whitespace(next) =>
                    {
                        let expression = self.read_important_expression()?;
                        self.add_single_expression(&mut state, expression)?;
                    }
                    _ => break,
                },
                b'<' => {
                    self.scanner.scan_char(b'<');
                    let operator = if self.scanner.scan_char(b'=') {
                        BinaryOperator::LessThanOrEquals
                    } else {
                        BinaryOperator::LessThan
                    };
                    self.add_operator(&mut state, operator)?;
                }
                b'>' => {
                    self.scanner.scan_char(b'>');
                    let operator = if self.scanner.scan_char(b'=') {
                        BinaryOperator::GreaterThanOrEquals
                    } else {
                        BinaryOperator::GreaterThan
                    };
                    self.add_operator(&mut state, operator)?;
                }
                b'*' => {
                    self.scanner.scan_char(b'*');
                    self.add_operator(&mut state, BinaryOperator::Times)?;
                }
                b'%' => {
                    self.scanner.scan_char(b'%');
                    self.add_operator(&mut state, BinaryOperator::Modulo)?;
                }
                b'+' => {
                    if state.single_expression.is_none() {
                        let expression = self.read_plus_expression()?;
                        self.add_single_expression(&mut state, expression)?;
                    } else {
                        self.scanner.scan_char(b'+');
                        self.add_operator(&mut state, BinaryOperator::Plus)?;
                    }
                }
                b'-' => {
                    let next = self.scanner.peek_at(1);
                    let starts_number = matches!(next, Some(b) if is_digit(b) || b == b'.');
                    let after_whitespace =
                        matches!(self.scanner.peek_behind(), Some(b) if is_whitespace(b));
                    if starts_number
                        && (state.single_expression.is_none() || after_whitespace)
                    {
                        let expression = self.read_number_expression()?;
                        self.add_single_expression(&mut state, expression)?;
                    } else if self.looking_at_interpolated_identifier() {
                        let expression = self.read_identifier_like()?;
                        self.add_single_expression(&mut state, expression)?;
                    } else {
                        self.scanner.scan_char(b'-');
                        self.add_operator(&mut state, BinaryOperator::Minus)?;
                    }
                }
                b'/' => {
                    if state.single_expression.is_none() {
                        let expression = self.read_unary_operation()?;
                        self.add_single_expression(&mut state, expression)?;
                    } else {
                        self.scanner.scan_char(b'/');
                        self.add_operator(&mut state, BinaryOperator::DividedBy)?;
                    }
                }
                b'0'..=b'9' => {
                    let expression = self.read_number_expression()?;
                    self.add_single_expression(&mut state, expression)?;
                }
                b'.' => {
                    // `...` is a rest argument; the caller handles it.
                    if self.scanner.peek_at(1) == Some(b'.') {
                        break;
                    }
                    let expression = self.read_number_expression()?;
                    self.add_single_expression(&mut state, expression)?;
                }
                b'a' | b'A' => {
                    if !self.is_plain_css() && self.scan_identifier("and")? {
                        self.add_operator(&mut state, BinaryOperator::And)?;
                    } else {
                        let expression = self.read_identifier_like()?;
                        self.add_single_expression(&mut state, expression)?;
                    }
                }
                b'o' | b'O' => {
                    if !self.is_plain_css() && self.scan_identifier("or")? {
                        self.add_operator(&mut state, BinaryOperator::Or)?;
                    } else {
                        let expression = self.read_identifier_like()?;
                        self.add_single_expression(&mut state, expression)?;
                    }
                }
                b'u' | b'U' => {
                    if self.scanner.peek_at(1) == Some(b'+') {
                        let expression = self.read_unicode_range()?;
                        self.add_single_expression(&mut state, expression)?;
                    } else {
                        let expression = self.read_identifier_like()?;
                        self.add_single_expression(&mut state, expression)?;
                    }
                }
                b',' => {
                    // A comma inside parentheses means this is a list, not
                    // a parenthesized division; reparse without slash-list
                    // semantics.
                    if self.in_parentheses {
                        self.in_parentheses = false;
                        if state.allow_slash {
                            self.reset_expression_state(&mut state)?;
                            continue;
                        }
                    }
                    if state.single_expression.is_none() {
                        return Err(self.scanner.fail("expression"));
                    }
                    self.resolve_space_expressions(&mut state)?;
                    if let Some(single) = state.single_expression.take() {
                        state
                            .comma_expressions
                            .get_or_insert_with(Vec::new)
                            .push(single);
                    }
                    self.scanner.scan_char(b',');
                    state.allow_slash = true;
                }
                _ => {
                    if first >= 0x80 || is_name_start(first) || first == b'\\' {
                        let expression = self.read_identifier_like()?;
                        self.add_single_expression(&mut state, expression)?;
                    } else {
                        break;
                    }
                }
            }
        }

        if bracket_list {
            self.scanner.expect_char(b']', None)?;
        }

        if state.comma_expressions.is_some() {
            self.resolve_space_expressions(&mut state)?;
            self.in_parentheses = was_in_parentheses;
            let mut commas = state.comma_expressions.take().unwrap_or_default();
            if let Some(single) = state.single_expression.take() {
                commas.push(single);
            }
            Ok(Expression::new(
                self.scanner.relevant_span_from(start),
                ExpressionKind::List {
                    elements: commas,
                    separator: ListSeparator::Comma,
                    bracketed: bracket_list,
                },
            ))
        } else if bracket_list && state.space_expressions.is_some() {
            self.resolve_operations(&mut state)?;
            let mut spaces = state.space_expressions.take().unwrap_or_default();
            match state.single_expression.take() {
                Some(single) => spaces.push(single),
                None => return Err(self.scanner.fail("expression")),
            }
            Ok(Expression::new(
                self.scanner.relevant_span_from(start),
                ExpressionKind::List {
                    elements: spaces,
                    separator: ListSeparator::Space,
                    bracketed: true,
                },
            ))
        } else {
            self.resolve_space_expressions(&mut state)?;
            match state.single_expression.take() {
                Some(single) if bracket_list => Ok(Expression::new(
                    self.scanner.relevant_span_from(start),
                    ExpressionKind::List {
                        elements: vec![single],
                        separator: ListSeparator::Undecided,
                        bracketed: true,
                    },
                )),
                Some(single) => Ok(single),
                None => Err(self.scanner.fail("expression")),
            }
        }
    }

    // State-machine transitions

    fn add_single_expression(
        &mut self,
        state: &mut ExpressionState,
        expression: Expression,
    ) -> ParseResult<()> {
        if state.single_expression.is_some() {
            // A second value inside parentheses means this is really a
            // space list; if a slash was parsed leniently, start over.
            if self.in_parentheses {
                self.in_parentheses = false;
                if state.allow_slash {
                    return self.reset_expression_state(state);
                }
            }
            self.resolve_operations(state)?;
            if let Some(single) = state.single_expression.take() {
                state
                    .space_expressions
                    .get_or_insert_with(Vec::new)
                    .push(single);
            }
        }
        state.single_expression = Some(expression);
        state.allow_slash = true;
        Ok(())
    }

    fn add_operator(
        &mut self,
        state: &mut ExpressionState,
        operator: BinaryOperator,
    ) -> ParseResult<()> {
        if self.is_plain_css() && operator != BinaryOperator::DividedBy {
            return self.error(
                "Operators aren't allowed in plain CSS.",
                self.scanner.relevant_span(),
            );
        }
        state.allow_slash = state.allow_slash && operator == BinaryOperator::DividedBy;
        while let Some(&last) = state.operators.last() {
            if last.precedence() < operator.precedence() {
                break;
            }
            self.resolve_one_operation(state)?;
        }
        state.operators.push(operator);
        let operand = state
            .single_expression
            .take()
            .unwrap_or_else(|| Expression::null(self.scanner.relevant_span()));
        state.operands.push(operand);
        Ok(())
    }

    fn resolve_one_operation(&mut self, state: &mut ExpressionState) -> ParseResult<()> {
        let Some(operator) = state.operators.pop() else { return Ok(()) };
        let left = state
            .operands
            .pop()
            .unwrap_or_else(|| Expression::null(self.scanner.relevant_span()));
        let right = state
            .single_expression
            .take()
            .unwrap_or_else(|| Expression::null(self.scanner.relevant_span()));
        let allows_slash = operator == BinaryOperator::DividedBy
            && state.allow_slash
            && left.is_slash_operand()
            && right.is_slash_operand();
        if operator != BinaryOperator::DividedBy {
            state.allow_slash = false;
        }
        let span = merge_spans(left.span, right.span);
        state.single_expression = Some(Expression::new(
            span,
            ExpressionKind::BinaryOperation {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                allows_slash,
            },
        ));
        Ok(())
    }

    fn resolve_operations(&mut self, state: &mut ExpressionState) -> ParseResult<()> {
        while !state.operators.is_empty() {
            self.resolve_one_operation(state)?;
        }
        Ok(())
    }

    fn resolve_space_expressions(&mut self, state: &mut ExpressionState) -> ParseResult<()> {
        self.resolve_operations(state)?;
        if let Some(mut spaces) = state.space_expressions.take() {
            if let Some(single) = state.single_expression.take() {
                spaces.push(single);
            }
            if let (Some(first), Some(last)) = (spaces.first(), spaces.last()) {
                let span = merge_spans(first.span, last.span);
                state.single_expression = Some(Expression::new(
                    span,
                    ExpressionKind::List {
                        elements: spaces,
                        separator: ListSeparator::Space,
                        bracketed: false,
                    },
                ));
            }
        }
        if let Some(operand) = state.single_equals_operand.take() {
            match state.single_expression.take() {
                Some(single) => {
                    let span = merge_spans(operand.span, single.span);
                    state.single_expression = Some(Expression::new(
                        span,
                        ExpressionKind::BinaryOperation {
                            operator: BinaryOperator::SingleEquals,
                            left: Box::new(operand),
                            right: Box::new(single),
                            allows_slash: false,
                        },
                    ));
                }
                None => state.single_expression = Some(operand),
            }
        }
        Ok(())
    }

    /// Throws away everything parsed so far and re-parses the leading
    /// single expression outside of a parenthesized context.
    fn reset_expression_state(&mut self, state: &mut ExpressionState) -> ParseResult<()> {
        state.comma_expressions = None;
        state.space_expressions = None;
        state.operators.clear();
        state.operands.clear();
        state.single_equals_operand = None;
        state.allow_slash = true;
        self.scanner.backtrack(state.start_state);
        state.single_expression = Some(self.read_single_expression()?);
        Ok(())
    }

    // Single expressions

    pub(crate) fn read_single_expression(&mut self) -> ParseResult<Expression> {
        let Some(first) = self.scanner.peek() else {
            return Err(self.scanner.fail("expression"));
        };
        match first {
            b'(' => self.read_parenthesized_expression(),
            b'/' => self.read_unary_operation(),
            b'.' | b'0'..=b'9' => self.read_number_expression(),
            b'[' => self.read_expression_with(true, false, None),
            b'$' => self.read_variable_expression(),
            b'&' => self.read_parent_expression(),
            b'\'' | b'"' => self.read_interpolated_string_expression(),
            b'#' => self.read_hash_expression(),
            b'+' => self.read_plus_expression(),
            b'-' => self.read_minus_expression(),
            b'!' => self.read_important_expression(),
            b'u' | b'U' => {
                if self.scanner.peek_at(1) == Some(b'+') {
                    self.read_unicode_range()
                } else {
                    self.read_identifier_like()
                }
            }
            _ if is_name_start(first) || first == b'\\' || first >= 0x80 => {
                self.read_identifier_like()
            }
            _ => Err(self.scanner.fail("expression")),
        }
    }

    fn read_parenthesized_expression(&mut self) -> ParseResult<Expression> {
        if self.is_plain_css() {
            return self.error(
                "Parentheses aren't allowed in plain CSS.",
                self.scanner.raw_span(),
            );
        }
        let was_in_parentheses = self.in_parentheses;
        self.in_parentheses = true;
        let result = self.read_parenthesized_inner();
        self.in_parentheses = was_in_parentheses;
        result
    }

    fn read_parenthesized_inner(&mut self) -> ParseResult<Expression> {
        let start = self.scanner.offset;
        self.scanner.expect_char(b'(', None)?;
        self.scan_whitespace()?;
        if !self.looking_at_expression() {
            self.scanner.expect_char(b')', None)?;
            return Ok(Expression::new(
                self.scanner.raw_span_from(start),
                ExpressionKind::List {
                    elements: Vec::new(),
                    separator: ListSeparator::Undecided,
                    bracketed: false,
                },
            ));
        }

        let first = self.read_expression_until_comma(false)?;
        if self.scanner.scan_char(b':') {
            self.scan_whitespace()?;
            return self.read_map_expression(first, start);
        }
        if !self.scanner.scan_char(b',') {
            self.scanner.expect_char(b')', None)?;
            return Ok(Expression::new(
                self.scanner.raw_span_from(start),
                ExpressionKind::Parenthesized(Box::new(first)),
            ));
        }
        self.scan_whitespace()?;

        let mut expressions = vec![first];
        loop {
            if !self.looking_at_expression() {
                break;
            }
            expressions.push(self.read_expression_until_comma(false)?);
            if !self.scanner.scan_char(b',') {
                break;
            }
            self.scan_whitespace()?;
        }
        self.scanner.expect_char(b')', None)?;
        Ok(Expression::new(
            self.scanner.raw_span_from(start),
            ExpressionKind::List {
                elements: expressions,
                separator: ListSeparator::Comma,
                bracketed: false,
            },
        ))
    }

    fn read_map_expression(
        &mut self,
        first_key: Expression,
        start: Offset,
    ) -> ParseResult<Expression> {
        let first_value = self.read_expression_until_comma(false)?;
        let mut pairs = vec![(first_key, first_value)];
        while self.scanner.scan_char(b',') {
            self.scan_whitespace()?;
            if !self.looking_at_expression() {
                break;
            }
            let key = self.read_expression_until_comma(false)?;
            self.scanner.expect_char(b':', None)?;
            self.scan_whitespace()?;
            let value = self.read_expression_until_comma(false)?;
            pairs.push((key, value));
        }
        self.scanner.expect_char(b')', None)?;
        Ok(Expression::new(
            self.scanner.raw_span_from(start),
            ExpressionKind::Map { pairs },
        ))
    }

    fn read_hash_expression(&mut self) -> ParseResult<Expression> {
        if self.scanner.peek_at(1) == Some(b'{') {
            return self.read_identifier_like();
        }
        let start = self.scanner.offset;
        let before_hash = self.scanner.state();
        self.scanner.expect_char(b'#', None)?;
        if matches!(self.scanner.peek(), Some(b) if is_digit(b)) {
            return self.read_hex_color_expression(before_hash);
        }

        let after_hash = self.scanner.state();
        let identifier = self.read_interpolated_identifier()?;
        if is_hex_color(&identifier) {
            self.scanner.backtrack(after_hash);
            return self.read_hex_color_expression(before_hash);
        }

        let mut buffer = InterpolationBuffer::new();
        buffer.write_char('#');
        buffer.add_interpolation(identifier);
        let span = self.scanner.raw_span_from(start);
        Ok(Expression::new(
            span,
            ExpressionKind::String {
                text: buffer.into_interpolation(span),
                quoted: false,
            },
        ))
    }

    fn read_hex_color_expression(
        &mut self,
        before_hash: ScannerState,
    ) -> ParseResult<Expression> {
        let mut digits: Vec<u8> = Vec::new();
        while let Some(byte) = self.scanner.peek() {
            if !is_hex(byte) {
                break;
            }
            self.scanner.scan_char(byte);
            digits.push(byte);
        }
        let double = |d: u8| (as_hex(d) * 0x11) as u8;
        let pair = |hi: u8, lo: u8| (as_hex(hi) * 0x10 + as_hex(lo)) as u8;
        let (red, green, blue, alpha) = match digits.as_slice() {
            [r, g, b] => (double(*r), double(*g), double(*b), 1.0),
            [r, g, b, a] => (double(*r), double(*g), double(*b), f64::from(double(*a)) / 255.0),
            [r1, r2, g1, g2, b1, b2] => (pair(*r1, *r2), pair(*g1, *g2), pair(*b1, *b2), 1.0),
            [r1, r2, g1, g2, b1, b2, a1, a2] => (
                pair(*r1, *r2),
                pair(*g1, *g2),
                pair(*b1, *b2),
                f64::from(pair(*a1, *a2)) / 255.0,
            ),
            _ => return Err(self.scanner.fail("hex digit")),
        };
        let original = self.scanner.substring(before_hash.position).to_string();
        Ok(Expression::new(
            self.scanner.raw_span_from(before_hash.offset),
            ExpressionKind::Color {
                red,
                green,
                blue,
                alpha,
                original,
            },
        ))
    }

    fn read_plus_expression(&mut self) -> ParseResult<Expression> {
        match self.scanner.peek_at(1) {
            Some(byte) if is_digit(byte) || byte == b'.' => self.read_number_expression(),
            _ => self.read_unary_operation(),
        }
    }

    fn read_minus_expression(&mut self) -> ParseResult<Expression> {
        match self.scanner.peek_at(1) {
            Some(byte) if is_digit(byte) || byte == b'.' => self.read_number_expression(),
            _ if self.looking_at_interpolated_identifier() => self.read_identifier_like(),
            _ => self.read_unary_operation(),
        }
    }

    fn read_unary_operation(&mut self) -> ParseResult<Expression> {
        let start = self.scanner.offset;
        let operator = match self.scanner.read_char()? {
            b'+' => UnaryOperator::Plus,
            b'-' => UnaryOperator::Minus,
            b'/' => UnaryOperator::DividedBy,
            _ => return Err(self.scanner.fail("unary operator")),
        };
        if self.is_plain_css() {
            return self.error(
                "Operators aren't allowed in plain CSS.",
                self.scanner.raw_span_from(start),
            );
        }
        self.scan_whitespace()?;
        let operand = self.read_single_expression()?;
        Ok(Expression::new(
            self.scanner.raw_span_from(start),
            ExpressionKind::UnaryOperation {
                operator,
                operand: Box::new(operand),
            },
        ))
    }

    fn read_important_expression(&mut self) -> ParseResult<Expression> {
        let start = self.scanner.offset;
        self.scanner.expect_char(b'!', None)?;
        self.scan_whitespace()?;
        self.expect_identifier("important", None)?;
        let span = self.scanner.relevant_span_from(start);
        Ok(Expression::new(
            span,
            ExpressionKind::String {
                text: Interpolation::literal("!important", span),
                quoted: false,
            },
        ))
    }

    pub(crate) fn read_number_expression(&mut self) -> ParseResult<Expression> {
        let start = self.scanner.offset;
        let start_position = self.scanner.position();

        if !self.scanner.scan_char(b'-') {
            self.scanner.scan_char(b'+');
        }
        let mut saw_digits = false;
        while let Some(byte) = self.scanner.peek() {
            if !is_digit(byte) {
                break;
            }
            self.scanner.scan_char(byte);
            saw_digits = true;
        }
        // Decimal part; a trailing dot is only valid after digits, and
        // even then stays unconsumed.
        if self.scanner.peek() == Some(b'.') {
            match self.scanner.peek_at(1) {
                Some(next) if is_digit(next) => {
                    self.scanner.scan_char(b'.');
                    while let Some(byte) = self.scanner.peek() {
                        if !is_digit(byte) {
                            break;
                        }
                        self.scanner.scan_char(byte);
                    }
                }
                _ if !saw_digits => return Err(self.scanner.fail("digit")),
                _ => {}
            }
        }
        // Exponent.
        if matches!(self.scanner.peek(), Some(b'e' | b'E')) {
            let after = self.scanner.peek_at(1);
            let exponent = match after {
                Some(byte) if is_digit(byte) => true,
                Some(b'+' | b'-') => {
                    matches!(self.scanner.peek_at(2), Some(b) if is_digit(b))
                }
                _ => false,
            };
            if exponent {
                self.scanner.read_char()?;
                if !self.scanner.scan_char(b'-') {
                    self.scanner.scan_char(b'+');
                }
                while let Some(byte) = self.scanner.peek() {
                    if !is_digit(byte) {
                        break;
                    }
                    self.scanner.scan_char(byte);
                }
            }
        }

        let text = self.scanner.substring(start_position);
        let value: f64 = text
            .parse()
            .map_err(|_| self.scanner.fail("number"))?;

        let unit = if self.scanner.scan_char(b'%') {
            Some("%".to_string())
        } else if self.looking_at_identifier(0)
            && !(self.scanner.peek() == Some(b'-') && self.scanner.peek_at(1) == Some(b'-'))
        {
            Some(self.read_identifier_as_unit()?)
        } else {
            None
        };

        Ok(Expression::new(
            self.scanner.raw_span_from(start),
            ExpressionKind::Number { value, unit },
        ))
    }

    fn read_unicode_range(&mut self) -> ParseResult<Expression> {
        let start = self.scanner.offset;
        let start_position = self.scanner.position();
        if !self.scan_ident_char(b'u', false)? {
            return Err(self.scanner.fail("\"u\""));
        }
        self.scanner.expect_char(b'+', None)?;

        let mut first_length = 0usize;
        while first_length < 6 {
            match self.scanner.peek() {
                Some(byte) if is_hex(byte) => {
                    self.scanner.scan_char(byte);
                    first_length += 1;
                }
                _ => break,
            }
        }
        let mut wildcards = 0usize;
        while first_length + wildcards < 6 && self.scanner.scan_char(b'?') {
            wildcards += 1;
        }
        if first_length + wildcards == 0 {
            return Err(self.scanner.fail("hex digit or \"?\""));
        }
        if wildcards == 0 && self.scanner.scan_char(b'-') {
            let mut second_length = 0usize;
            while second_length < 6 {
                match self.scanner.peek() {
                    Some(byte) if is_hex(byte) => {
                        self.scanner.scan_char(byte);
                        second_length += 1;
                    }
                    _ => break,
                }
            }
            if second_length == 0 {
                return Err(self.scanner.fail("hex digit"));
            }
        }
        if self.looking_at_interpolated_identifier_body() {
            return Err(self.scanner.fail("end of identifier"));
        }

        let text = self.scanner.substring(start_position).to_string();
        let span = self.scanner.raw_span_from(start);
        Ok(Expression::new(
            span,
            ExpressionKind::String {
                text: Interpolation::literal(text, span),
                quoted: false,
            },
        ))
    }

    fn read_variable_expression(&mut self) -> ParseResult<Expression> {
        let start = self.scanner.offset;
        let name = self.read_variable_name()?;
        if self.is_plain_css() {
            return self.error(
                "Sass variables aren't allowed in plain CSS.",
                self.scanner.relevant_span_from(start),
            );
        }
        Ok(Expression::new(
            self.scanner.relevant_span_from(start),
            ExpressionKind::Variable {
                namespace: None,
                name,
            },
        ))
    }

    fn read_parent_expression(&mut self) -> ParseResult<Expression> {
        if self.is_plain_css() {
            return self.error(
                "The parent selector isn't allowed in plain CSS.",
                self.scanner.raw_span(),
            );
        }
        let start = self.scanner.offset;
        self.scanner.expect_char(b'&', None)?;
        if self.scanner.peek() == Some(b'&') {
            self.warn(
                "In Sass, \"&&\" means two copies of the parent selector. You probably want to use \"and\" instead.",
                self.scanner.raw_span(),
            );
        }
        Ok(Expression::new(
            self.scanner.raw_span_from(start),
            ExpressionKind::ParentSelector,
        ))
    }

    /// Consumes an expression that starts like an identifier: keywords,
    /// named colors, special functions, namespaced members, function
    /// calls, or a plain unquoted string.
    pub(crate) fn read_identifier_like(&mut self) -> ParseResult<Expression> {
        let start = self.scanner.offset;
        let identifier = self.read_interpolated_identifier()?;
        let plain = identifier.as_plain().map(str::to_string);

        if let Some(plain) = &plain {
            if plain == "not" && !self.is_plain_css() {
                self.scan_whitespace()?;
                let operand = self.read_single_expression()?;
                let span = merge_spans(identifier.span, operand.span);
                return Ok(Expression::new(
                    span,
                    ExpressionKind::UnaryOperation {
                        operator: UnaryOperator::Not,
                        operand: Box::new(operand),
                    },
                ));
            }
            let lower = plain.to_ascii_lowercase();
            if self.scanner.peek() != Some(b'(') {
                match plain.as_str() {
                    "false" => {
                        return Ok(Expression::new(
                            identifier.span,
                            ExpressionKind::Boolean(false),
                        ))
                    }
                    "true" => {
                        return Ok(Expression::new(
                            identifier.span,
                            ExpressionKind::Boolean(true),
                        ))
                    }
                    "null" => return Ok(Expression::null(identifier.span)),
                    _ => {}
                }
                if let Some((red, green, blue)) = color_for_name(&lower) {
                    return Ok(Expression::new(
                        identifier.span,
                        ExpressionKind::Color {
                            red,
                            green,
                            blue,
                            alpha: 1.0,
                            original: plain.clone(),
                        },
                    ));
                }
            }
            if let Some(special) = self.try_special_function(&lower, start)? {
                return Ok(special);
            }
        }

        match self.scanner.peek() {
            Some(b'.') if self.scanner.peek_at(1) != Some(b'.') => {
                let Some(namespace) = plain else {
                    return self.error(
                        "Interpolation isn't allowed in namespaces.",
                        identifier.span,
                    );
                };
                self.scanner.scan_char(b'.');
                if self.scanner.peek() == Some(b'$') {
                    let name = self.read_variable_name()?;
                    return Ok(Expression::new(
                        self.scanner.raw_span_from(start),
                        ExpressionKind::Variable {
                            namespace: Some(namespace),
                            name,
                        },
                    ));
                }
                let name_start = self.scanner.offset;
                let name = self.read_public_identifier()?;
                let name_span = self.scanner.raw_span_from(name_start);
                let arguments = self.read_argument_invocation(false, false)?;
                Ok(Expression::new(
                    self.scanner.raw_span_from(start),
                    ExpressionKind::FunctionCall {
                        namespace: Some(namespace),
                        name: Interpolation::literal(name, name_span),
                        arguments,
                    },
                ))
            }
            Some(b'(') => {
                let allow_empty_second_arg = plain.as_deref() == Some("var");
                let arguments = self.read_argument_invocation(false, allow_empty_second_arg)?;
                if self.is_plain_css() {
                    if let Some(plain) = &plain {
                        if super::css::is_disallowed_function(&plain.to_ascii_lowercase()) {
                            return self.error(
                                "This function isn't allowed in plain CSS.",
                                self.scanner.relevant_span_from(start),
                            );
                        }
                    }
                }
                Ok(Expression::new(
                    self.scanner.raw_span_from(start),
                    ExpressionKind::FunctionCall {
                        namespace: None,
                        name: identifier,
                        arguments,
                    },
                ))
            }
            _ => Ok(Expression::new(
                identifier.span,
                ExpressionKind::String {
                    text: identifier,
                    quoted: false,
                },
            )),
        }
    }

    pub(crate) fn read_public_identifier(&mut self) -> ParseResult<String> {
        let start = self.scanner.offset;
        let name = self.read_identifier()?;
        if name.starts_with('-') || name.starts_with('_') {
            return self.error(
                "Private members can't be accessed from outside their modules.",
                self.scanner.relevant_span_from(start),
            );
        }
        Ok(name)
    }

    // Special functions

    /// Functions whose bodies are raw CSS rather than SassScript:
    /// `calc()`, `element()`, `expression()`, `progid:...`, `url()`, and
    /// structurally-valid `min()`/`max()` calls.
    fn try_special_function(
        &mut self,
        lower_name: &str,
        start: Offset,
    ) -> ParseResult<Option<Expression>> {
        let normalized = unvendor(lower_name);
        let mut buffer = InterpolationBuffer::new();
        match normalized {
            "calc" | "element" | "expression" => {
                if !self.scanner.scan_char(b'(') {
                    return Ok(None);
                }
                buffer.write_str(lower_name);
                buffer.write_char('(');
            }
            "progid" => {
                if !self.scanner.scan_char(b':') {
                    return Ok(None);
                }
                buffer.write_str(lower_name);
                buffer.write_char(':');
                while let Some(byte) = self.scanner.peek() {
                    if !is_alphabetic(byte) && byte != b'.' {
                        break;
                    }
                    self.scanner.scan_char(byte);
                    buffer.write_char(byte as char);
                }
                self.scanner.expect_char(b'(', None)?;
                buffer.write_char('(');
            }
            "url" => {
                return Ok(self.try_url_contents(start, None)?.map(|contents| {
                    let span = contents.span;
                    Expression::new(
                        span,
                        ExpressionKind::String {
                            text: contents,
                            quoted: false,
                        },
                    )
                }));
            }
            "min" | "max" => {
                let before = self.scanner.state();
                if !self.scanner.scan_char(b'(') {
                    return Ok(None);
                }
                let mut contents = InterpolationBuffer::new();
                contents.write_str(lower_name);
                contents.write_char('(');
                match self.try_min_max_contents(&mut contents, true) {
                    Ok(true) => {
                        let span = self.scanner.raw_span_from(start);
                        return Ok(Some(Expression::new(
                            span,
                            ExpressionKind::String {
                                text: contents.into_interpolation(span),
                                quoted: false,
                            },
                        )));
                    }
                    Ok(false) => {
                        self.scanner.backtrack(before);
                        return Ok(None);
                    }
                    Err(e) if e.is_recoverable() => {
                        self.scanner.backtrack(before);
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                }
            }
            _ => return Ok(None),
        }

        let value = self.read_interpolated_declaration_value(true, false, true)?;
        self.scanner.expect_char(b')', None)?;
        buffer.add_interpolation(value);
        buffer.write_char(')');
        let span = self.scanner.raw_span_from(start);
        Ok(Some(Expression::new(
            span,
            ExpressionKind::String {
                text: buffer.into_interpolation(span),
                quoted: false,
            },
        )))
    }

    /// Consumes the contents of a `min()`/`max()` call if they fit the
    /// plain-CSS grammar: numbers, nested calc/env/var/min/max calls,
    /// interpolation, arithmetic, and (at the top level) commas.
    fn try_min_max_contents(
        &mut self,
        buffer: &mut InterpolationBuffer,
        allow_comma: bool,
    ) -> ParseResult<bool> {
        loop {
            // One value.
            match self.scanner.peek() {
                Some(b'-' | b'+' | b'.' | b'0'..=b'9') => {
                    if !self.looking_at_number() {
                        return Ok(false);
                    }
                    let raw = self.raw_text(Self::read_number_expression)?;
                    buffer.write_str(&raw);
                }
                Some(b'#') => {
                    if self.scanner.peek_at(1) != Some(b'{') {
                        return Ok(false);
                    }
                    let expression = self.read_single_interpolation()?;
                    buffer.add_expression(expression);
                }
                Some(b'c' | b'C') => {
                    if !self.try_min_max_function(buffer, "calc")? {
                        return Ok(false);
                    }
                }
                Some(b'e' | b'E') => {
                    if !self.try_min_max_function(buffer, "env")? {
                        return Ok(false);
                    }
                }
                Some(b'v' | b'V') => {
                    if !self.try_min_max_function(buffer, "var")? {
                        return Ok(false);
                    }
                }
                Some(b'm' | b'M') => {
                    let nested = if self.scan_identifier("min")? {
                        "min"
                    } else if self.scan_identifier("max")? {
                        "max"
                    } else {
                        return Ok(false);
                    };
                    buffer.write_str(nested);
                    if !self.scanner.scan_char(b'(') {
                        return Ok(false);
                    }
                    buffer.write_char('(');
                    if !self.try_min_max_contents(buffer, true)? {
                        return Ok(false);
                    }
                }
                Some(b'(') => {
                    self.scanner.scan_char(b'(');
                    buffer.write_char('(');
                    if !self.try_min_max_contents(buffer, false)? {
                        return Ok(false);
                    }
                }
                _ => return Ok(false),
            }

            self.scan_whitespace()?;
            match self.scanner.peek() {
                Some(b')') => {
                    self.scanner.scan_char(b')');
                    buffer.write_char(')');
                    return Ok(true);
                }
                Some(op @ (b'+' | b'-' | b'*' | b'/')) => {
                    self.scanner.scan_char(op);
                    buffer.write_char(' ');
                    buffer.write_char(op as char);
                    buffer.write_char(' ');
                }
                Some(b',') if allow_comma => {
                    self.scanner.scan_char(b',');
                    buffer.write_str(", ");
                }
                _ => return Ok(false),
            }
            self.scan_whitespace()?;
        }
    }

    fn try_min_max_function(
        &mut self,
        buffer: &mut InterpolationBuffer,
        name: &str,
    ) -> ParseResult<bool> {
        if !self.scan_identifier(name)? {
            return Ok(false);
        }
        buffer.write_str(name);
        if !self.scanner.scan_char(b'(') {
            return Ok(false);
        }
        buffer.write_char('(');
        let value = self.read_interpolated_declaration_value(true, false, true)?;
        buffer.add_interpolation(value);
        if !self.scanner.scan_char(b')') {
            return Ok(false);
        }
        buffer.write_char(')');
        Ok(true)
    }

    // Arguments

    /// Consumes a parenthesized argument list at a call site. Mixin
    /// invocations don't allow the Microsoft-style `=` operator at the
    /// top level, but function invocations do.
    pub(crate) fn read_argument_invocation(
        &mut self,
        mixin: bool,
        allow_empty_second_arg: bool,
    ) -> ParseResult<ArgumentInvocation> {
        let start = self.scanner.offset;
        self.scanner.expect_char(b'(', None)?;
        self.scan_whitespace()?;

        let mut positional: Vec<Expression> = Vec::new();
        let mut named: Vec<(String, Expression)> = Vec::new();
        let mut rest: Option<Box<Expression>> = None;
        let mut keyword_rest: Option<Box<Expression>> = None;
        while self.looking_at_expression() {
            let argument_start = self.scanner.offset;
            let expression = self.read_expression_until_comma(!mixin)?;
            self.scan_whitespace()?;

            let variable = expression.is_variable().map(str::to_string);
            if let (Some(name), true) = (&variable, self.scanner.peek() == Some(b':')) {
                self.scanner.scan_char(b':');
                self.scan_whitespace()?;
                if named.iter().any(|(existing, _)| existing == name) {
                    return self.error("Duplicate argument.", expression.span);
                }
                let value = self.read_expression_until_comma(!mixin)?;
                named.push((name.clone(), value));
            } else if self.scanner.scan_char(b'.') {
                self.scanner.expect_char(b'.', None)?;
                self.scanner.expect_char(b'.', None)?;
                if rest.is_none() {
                    rest = Some(Box::new(expression));
                } else {
                    keyword_rest = Some(Box::new(expression));
                    self.scan_whitespace()?;
                    break;
                }
            } else if !named.is_empty() {
                return self.error(
                    "Positional arguments must come before keyword arguments.",
                    self.scanner.span_at(argument_start),
                );
            } else {
                positional.push(expression);
            }

            self.scan_whitespace()?;
            if !self.scanner.scan_char(b',') {
                break;
            }
            self.scan_whitespace()?;

            // `var()` may pass an empty second argument through to CSS.
            if allow_empty_second_arg
                && positional.len() == 1
                && named.is_empty()
                && rest.is_none()
                && self.scanner.peek() == Some(b')')
            {
                let span = self.scanner.relevant_span();
                positional.push(Expression::new(
                    span,
                    ExpressionKind::String {
                        text: Interpolation::literal("", span),
                        quoted: false,
                    },
                ));
                break;
            }
        }
        self.scanner.expect_char(b')', None)?;

        Ok(ArgumentInvocation {
            positional,
            named,
            rest,
            keyword_rest,
            span: self.scanner.relevant_span_from(start),
        })
    }

    /// Consumes a parenthesized parameter list at a definition site:
    /// `($name`, `$name: default`, and a final `$rest...`.
    pub(crate) fn read_argument_declaration(&mut self) -> ParseResult<ArgumentDeclaration> {
        let start = self.scanner.offset;
        self.scanner.expect_char(b'(', None)?;
        self.scan_whitespace()?;

        let mut arguments: Vec<Argument> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut rest: Option<String> = None;
        while self.scanner.peek() == Some(b'$') {
            let variable_start = self.scanner.offset;
            let name = self.read_variable_name()?;
            self.scan_whitespace()?;

            let mut default = None;
            if self.scanner.scan_char(b':') {
                self.scan_whitespace()?;
                default = Some(self.read_expression_until_comma(false)?);
            } else if self.scanner.scan_char(b'.') {
                self.scanner.expect_char(b'.', None)?;
                self.scanner.expect_char(b'.', None)?;
                self.scan_whitespace()?;
                rest = Some(name);
                break;
            }

            let span = self.scanner.relevant_span_from(variable_start);
            if !seen.insert(name.clone()) {
                return self.error("Duplicate argument.", span);
            }
            arguments.push(Argument {
                name,
                default,
                span,
            });

            if !self.scanner.scan_char(b',') {
                break;
            }
            self.scan_whitespace()?;
        }
        self.scanner.expect_char(b')', None)?;

        Ok(ArgumentDeclaration {
            arguments,
            rest,
            span: self.scanner.relevant_span_from(start),
        })
    }

    // Strings

    pub(crate) fn read_interpolated_string_text(
        &mut self,
    ) -> ParseResult<(Interpolation, Span)> {
        let start = self.scanner.offset;
        let quote = match self.scanner.peek() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return Err(self.scanner.fail("string")),
        };
        self.scanner.scan_char(quote);
        let quote_name = format!("\"{}\"", quote as char);

        let mut buffer = InterpolationBuffer::new();
        loop {
            match self.scanner.peek() {
                Some(byte) if byte == quote => {
                    self.scanner.scan_char(byte);
                    break;
                }
                None => return Err(self.scanner.fail(&quote_name)),
                Some(byte) if crate::character::is_newline(byte) => {
                    return Err(self.scanner.fail(&quote_name));
                }
                Some(b'\\') => match self.scanner.peek_at(1) {
                    Some(second) if crate::character::is_newline(second) => {
                        self.scanner.scan_char(b'\\');
                        self.scanner.scan_char(second);
                        if second == b'\r' {
                            self.scanner.scan_char(b'\n');
                        }
                    }
                    _ => {
                        let value = self.read_escape_code()?;
                        match char::from_u32(value) {
                            Some(c) => buffer.write_char(c),
                            None => {
                                return self.error(
                                    "Invalid Unicode code point.",
                                    self.scanner.raw_span(),
                                );
                            }
                        }
                    }
                },
                Some(b'#') if self.scanner.peek_at(1) == Some(b'{') => {
                    let expression = self.read_single_interpolation()?;
                    buffer.add_expression(expression);
                }
                Some(_) => buffer.write_char(self.scanner.read_utf8_char()?),
            }
        }
        let span = self.scanner.raw_span_from(start);
        Ok((buffer.into_interpolation(span), span))
    }

    pub(crate) fn read_interpolated_string_expression(&mut self) -> ParseResult<Expression> {
        let (text, span) = self.read_interpolated_string_text()?;
        Ok(Expression::new(
            span,
            ExpressionKind::String { text, quoted: true },
        ))
    }

    // Lookahead

    pub(crate) fn looking_at_expression(&self) -> bool {
        let Some(character) = self.scanner.peek() else {
            return false;
        };
        match character {
            b'.' => self.scanner.peek_at(1) != Some(b'.'),
            b'!' => match self.scanner.peek_at(1) {
                None => true,
                Some(next) => equals_letter_ignore_case(b'i', next) || is_whitespace(next),
            },
            b'(' | b'/' | b'[' | b'\'' | b'"' | b'#' | b'+' | b'-' | b'\\' | b'$' | b'&' => true,
            _ => is_name_start(character) || is_digit(character),
        }
    }
}

#[cfg(test)]
mod tests {
    use brine_source_map::FileId;
    use pretty_assertions::assert_eq;

    use crate::ast::{BinaryOperator, ExpressionKind, ListSeparator};

    use super::super::{StylesheetParser, Syntax};
    use super::*;

    fn parse(text: &str) -> Expression {
        let mut parser = StylesheetParser::new(text, FileId(0), Syntax::Scss);
        parser.read_expression().unwrap()
    }

    #[test]
    fn unvendor_strips_prefix() {
        assert_eq!(unvendor("-moz-calc"), "calc");
        assert_eq!(unvendor("calc"), "calc");
        assert_eq!(unvendor("-moz"), "-moz");
    }

    #[test]
    fn number_with_unit() {
        let e = parse("1.5px");
        match e.kind {
            ExpressionKind::Number { value, unit } => {
                assert_eq!(value, 1.5);
                assert_eq!(unit.as_deref(), Some("px"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bare_minus_between_numbers_is_subtraction() {
        let e = parse("1-2");
        match e.kind {
            ExpressionKind::BinaryOperation { operator, .. } => {
                assert_eq!(operator, BinaryOperator::Minus);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn units_never_swallow_minus_digit() {
        // The unit of `1px` must stop before `-2`, leaving a subtraction.
        let e = parse("1px-2px");
        match e.kind {
            ExpressionKind::BinaryOperation {
                operator,
                left,
                right,
                ..
            } => {
                assert_eq!(operator, BinaryOperator::Minus);
                assert!(matches!(
                    left.kind,
                    ExpressionKind::Number { unit: Some(ref u), .. } if u == "px"
                ));
                assert!(matches!(
                    right.kind,
                    ExpressionKind::Number { unit: Some(ref u), .. } if u == "px"
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn space_after_minus_makes_space_list() {
        let e = parse("1 -2");
        match e.kind {
            ExpressionKind::List {
                elements,
                separator,
                ..
            } => {
                assert_eq!(separator, ListSeparator::Space);
                assert_eq!(elements.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn precedence_binds_times_tighter_than_plus() {
        let e = parse("1 + 2 * 3");
        match e.kind {
            ExpressionKind::BinaryOperation {
                operator, right, ..
            } => {
                assert_eq!(operator, BinaryOperator::Plus);
                assert!(matches!(
                    right.kind,
                    ExpressionKind::BinaryOperation {
                        operator: BinaryOperator::Times,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn slash_between_numbers_allows_shorthand() {
        let e = parse("12px/30px");
        match e.kind {
            ExpressionKind::BinaryOperation {
                operator,
                allows_slash,
                ..
            } => {
                assert_eq!(operator, BinaryOperator::DividedBy);
                assert!(allows_slash);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn paren_list_reparses_division() {
        // `(1/2, 1)` must come out as a comma list whose first element
        // keeps the slash text, not as a parenthesized division.
        let e = parse("(1/2, 1)");
        match e.kind {
            ExpressionKind::List {
                elements,
                separator,
                ..
            } => {
                assert_eq!(separator, ListSeparator::Comma);
                assert_eq!(elements.len(), 2);
                assert!(matches!(
                    elements[0].kind,
                    ExpressionKind::BinaryOperation {
                        operator: BinaryOperator::DividedBy,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn map_literal() {
        let e = parse("(a: 1, b: 2)");
        match e.kind {
            ExpressionKind::Map { pairs } => assert_eq!(pairs.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_parens_are_empty_list() {
        let e = parse("()");
        assert!(matches!(
            e.kind,
            ExpressionKind::List {
                ref elements,
                separator: ListSeparator::Undecided,
                bracketed: false,
            } if elements.is_empty()
        ));
    }

    #[test]
    fn bracketed_list() {
        let e = parse("[a b]");
        assert!(matches!(
            e.kind,
            ExpressionKind::List {
                separator: ListSeparator::Space,
                bracketed: true,
                ..
            }
        ));
    }

    #[test]
    fn hex_colors() {
        match parse("#abc").kind {
            ExpressionKind::Color {
                red,
                green,
                blue,
                alpha,
                original,
            } => {
                assert_eq!((red, green, blue), (0xAA, 0xBB, 0xCC));
                assert_eq!(alpha, 1.0);
                assert_eq!(original, "#abc");
            }
            other => panic!("unexpected {other:?}"),
        }
        match parse("#11223344").kind {
            ExpressionKind::Color { alpha, .. } => {
                assert!((alpha - 68.0 / 255.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn named_color_keeps_original_spelling() {
        match parse("RebeccaPurple").kind {
            ExpressionKind::Color { original, .. } => assert_eq!(original, "RebeccaPurple"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn keywords() {
        assert!(matches!(parse("true").kind, ExpressionKind::Boolean(true)));
        assert!(matches!(parse("false").kind, ExpressionKind::Boolean(false)));
        assert!(matches!(parse("null").kind, ExpressionKind::Null));
        assert!(matches!(
            parse("not true").kind,
            ExpressionKind::UnaryOperation { .. }
        ));
    }

    #[test]
    fn calc_parses_as_special_function() {
        match parse("calc(100% - #{$x})").kind {
            ExpressionKind::String { text, quoted } => {
                assert!(!quoted);
                assert_eq!(text.initial_plain(), "calc(100% - ");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn min_with_plain_contents_stays_css() {
        match parse("min(1px + 2px, 3vh)").kind {
            ExpressionKind::String { text, .. } => {
                assert_eq!(text.as_plain(), Some("min(1px + 2px, 3vh)"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn min_with_sass_contents_is_function_call() {
        match parse("min($a, 3)").kind {
            ExpressionKind::FunctionCall { name, .. } => {
                assert_eq!(name.as_plain(), Some("min"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn namespaced_variable_and_function() {
        match parse("colors.$primary").kind {
            ExpressionKind::Variable { namespace, name } => {
                assert_eq!(namespace.as_deref(), Some("colors"));
                assert_eq!(name, "primary");
            }
            other => panic!("unexpected {other:?}"),
        }
        match parse("math.round(1.5)").kind {
            ExpressionKind::FunctionCall { namespace, .. } => {
                assert_eq!(namespace.as_deref(), Some("math"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unicode_range() {
        match parse("U+0-7F").kind {
            ExpressionKind::String { text, .. } => {
                assert_eq!(text.as_plain(), Some("U+0-7F"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn important_expression() {
        match parse("! important").kind {
            ExpressionKind::String { text, .. } => {
                assert_eq!(text.as_plain(), Some("!important"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn interpolated_string() {
        match parse("\"a#{1}b\"").kind {
            ExpressionKind::String { text, quoted } => {
                assert!(quoted);
                assert_eq!(text.parts.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn plain_css_rejects_operators() {
        let mut parser = StylesheetParser::new("1 + 2", FileId(0), Syntax::Css);
        let err = parser.read_expression().unwrap_err();
        assert_eq!(err.to_string(), "Operators aren't allowed in plain CSS.");
    }

    #[test]
    fn merge_spans_covers_both() {
        use brine_source_map::Offset;
        let a = Span::new(FileId(0), Offset::new(0, 2), Offset::new(0, 3));
        let b = Span::new(FileId(0), Offset::new(1, 0), Offset::new(0, 4));
        let merged = merge_spans(a, b);
        assert_eq!(merged.start, Offset::new(0, 2));
        assert_eq!(merged.end(), Offset::new(1, 4));
    }
}
