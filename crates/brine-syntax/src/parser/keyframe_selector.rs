//! Parses `@keyframes` block selectors: `from`, `to`, or percentages,
//! comma-separated. Runs over already-resolved text.

use brine_source_map::FileId;

use crate::character::is_digit;
use crate::error::ParseResult;

use super::{StylesheetParser, Syntax};

pub struct KeyframeSelectorParser<'a> {
    parser: StylesheetParser<'a>,
}

impl<'a> KeyframeSelectorParser<'a> {
    pub fn new(text: &'a str, file: FileId) -> Self {
        KeyframeSelectorParser {
            parser: StylesheetParser::new(text, file, Syntax::Scss),
        }
    }

    pub fn parse(mut self) -> ParseResult<Vec<String>> {
        let mut selectors = Vec::new();
        loop {
            self.parser.scan_whitespace()?;
            if self.parser.looking_at_identifier(0) {
                if self.parser.scan_identifier("from")? {
                    selectors.push("from".to_string());
                } else {
                    self.parser
                        .expect_identifier("to", Some("\"to\" or \"from\""))?;
                    selectors.push("to".to_string());
                }
            } else {
                selectors.push(self.read_percentage()?);
            }
            self.parser.scan_whitespace()?;
            if !self.parser.scanner.scan_char(b',') {
                break;
            }
        }
        self.parser.scanner.expect_done()?;
        Ok(selectors)
    }

    fn read_percentage(&mut self) -> ParseResult<String> {
        let mut buffer = String::new();
        if self.parser.scanner.scan_char(b'+') {
            buffer.push('+');
        }

        match self.parser.scanner.peek() {
            Some(byte) if is_digit(byte) || byte == b'.' => {}
            _ => {
                return self
                    .parser
                    .error("Expected number.", self.parser.scanner.raw_span());
            }
        }

        while matches!(self.parser.scanner.peek(), Some(byte) if is_digit(byte)) {
            buffer.push(self.parser.scanner.read_char()? as char);
        }

        if self.parser.scanner.peek() == Some(b'.') {
            buffer.push(self.parser.scanner.read_char()? as char);
            while matches!(self.parser.scanner.peek(), Some(byte) if is_digit(byte)) {
                buffer.push(self.parser.scanner.read_char()? as char);
            }
        }

        if matches!(self.parser.scanner.peek(), Some(b'e' | b'E')) {
            buffer.push(self.parser.scanner.read_char()? as char);
            if matches!(self.parser.scanner.peek(), Some(b'+' | b'-')) {
                buffer.push(self.parser.scanner.read_char()? as char);
            }
            if !matches!(self.parser.scanner.peek(), Some(byte) if is_digit(byte)) {
                return self
                    .parser
                    .error("Expected digit.", self.parser.scanner.raw_span());
            }
            while matches!(self.parser.scanner.peek(), Some(byte) if is_digit(byte)) {
                buffer.push(self.parser.scanner.read_char()? as char);
            }
        }

        self.parser.scanner.expect_char(b'%', None)?;
        buffer.push('%');
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use brine_source_map::FileId;
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(text: &str) -> Vec<String> {
        KeyframeSelectorParser::new(text, FileId(0))
            .parse()
            .expect("parse failed")
    }

    fn parse_err(text: &str) -> String {
        KeyframeSelectorParser::new(text, FileId(0))
            .parse()
            .expect_err("parse unexpectedly succeeded")
            .to_string()
    }

    #[test]
    fn keywords_and_percentages() {
        assert_eq!(parse("from, 50%, to"), vec!["from", "50%", "to"]);
    }

    #[test]
    fn fractional_and_exponent_percentages() {
        assert_eq!(parse("50.5%"), vec!["50.5%"]);
        assert_eq!(parse(".5%"), vec![".5%"]);
        assert_eq!(parse("1e2%"), vec!["1e2%"]);
        assert_eq!(parse("1E-1%"), vec!["1E-1%"]);
        assert_eq!(parse("+10%"), vec!["+10%"]);
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        assert_eq!(parse_err("fro"), "expected \"to\" or \"from\".");
    }

    #[test]
    fn missing_number_is_rejected() {
        assert_eq!(parse_err("%"), "Expected number.");
    }

    #[test]
    fn exponent_needs_digits() {
        assert_eq!(parse_err("1e%"), "Expected digit.");
    }
}
