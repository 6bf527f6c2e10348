//! Parses media query lists.
//!
//! Runs over already-resolved text: interpolation in a `@media` prelude
//! is evaluated first, then the resulting string is re-parsed here into
//! structured queries so nested `@media` rules can be merged.

use brine_source_map::FileId;

use crate::ast::MediaQuery;
use crate::character::opposite_bracket;
use crate::error::ParseResult;

use super::{StylesheetParser, Syntax};

pub struct MediaQueryParser<'a> {
    parser: StylesheetParser<'a>,
}

impl<'a> MediaQueryParser<'a> {
    pub fn new(text: &'a str, file: FileId) -> Self {
        MediaQueryParser {
            parser: StylesheetParser::new(text, file, Syntax::Scss),
        }
    }

    /// Consumes multiple media queries delimited by commas.
    pub fn parse(mut self) -> ParseResult<Vec<MediaQuery>> {
        let mut queries = Vec::new();
        loop {
            self.parser.scan_whitespace()?;
            queries.push(self.read_media_query()?);
            if !self.parser.scanner.scan_char(b',') {
                break;
            }
        }
        self.parser.scanner.expect_done()?;
        Ok(queries)
    }

    fn read_media_query(&mut self) -> ParseResult<MediaQuery> {
        let start = self.parser.scanner.offset;
        let mut media_type = None;
        let mut modifier = None;

        if self.parser.scanner.peek() != Some(b'(') {
            let identifier1 = self.parser.read_identifier()?;
            self.parser.scan_whitespace()?;

            if !self.parser.looking_at_identifier(0) {
                // For example, "@media screen {".
                return Ok(MediaQuery {
                    modifier: None,
                    media_type: Some(identifier1),
                    features: Vec::new(),
                    span: self.parser.scanner.raw_span_from(start),
                });
            }

            let identifier2 = self.parser.read_identifier()?;
            self.parser.scan_whitespace()?;

            if identifier2.eq_ignore_ascii_case("and") {
                // For example, "@media screen and ...".
                media_type = Some(identifier1);
            } else {
                modifier = Some(identifier1);
                media_type = Some(identifier2);
                if self.parser.scan_identifier("and")? {
                    // For example, "@media only screen and ...".
                    self.parser.scan_whitespace()?;
                } else {
                    // For example, "@media only screen {".
                    return Ok(MediaQuery {
                        modifier,
                        media_type,
                        features: Vec::new(),
                        span: self.parser.scanner.raw_span_from(start),
                    });
                }
            }
        }

        // We've consumed either `IDENTIFIER "and"`, `IDENTIFIER IDENTIFIER
        // "and"`, or no text.
        let mut features = Vec::new();
        loop {
            self.parser.scan_whitespace()?;
            self.parser.scanner.expect_char(b'(', None)?;
            let feature = self.read_feature_value()?;
            features.push(format!("({feature})"));
            self.parser.scanner.expect_char(b')', None)?;
            self.parser.scan_whitespace()?;
            if !self.parser.scan_identifier("and")? {
                break;
            }
        }

        Ok(MediaQuery {
            modifier,
            media_type,
            features,
            span: self.parser.scanner.raw_span_from(start),
        })
    }

    /// Raw feature text up to the closing parenthesis, with nested
    /// brackets and strings kept intact.
    fn read_feature_value(&mut self) -> ParseResult<String> {
        let start = self.parser.scanner.position();
        let mut brackets: Vec<u8> = Vec::new();
        while let Some(next) = self.parser.scanner.peek() {
            match next {
                b'"' | b'\'' => {
                    self.parser.read_string()?;
                }
                b'(' | b'[' | b'{' => {
                    brackets.push(opposite_bracket(next));
                    self.parser.scanner.read_char()?;
                }
                b')' | b']' | b'}' => {
                    if brackets.last() != Some(&next) {
                        break;
                    }
                    brackets.pop();
                    self.parser.scanner.read_char()?;
                }
                _ => {
                    self.parser.scanner.read_char()?;
                }
            }
        }
        Ok(self.parser.scanner.substring(start).trim().to_string())
    }
}
