//! Parses `@at-root` queries like `(without: media supports)`.
//! Runs over already-resolved text.

use brine_source_map::FileId;

use crate::ast::AtRootQuery;
use crate::error::ParseResult;

use super::{StylesheetParser, Syntax};

pub struct AtRootQueryParser<'a> {
    parser: StylesheetParser<'a>,
}

impl<'a> AtRootQueryParser<'a> {
    pub fn new(text: &'a str, file: FileId) -> Self {
        AtRootQueryParser {
            parser: StylesheetParser::new(text, file, Syntax::Scss),
        }
    }

    pub fn parse(mut self) -> ParseResult<AtRootQuery> {
        let start = self.parser.scanner.offset;
        self.parser.scanner.expect_char(b'(', None)?;
        self.parser.scan_whitespace()?;

        let include = self.parser.scan_identifier("with")?;
        if !include {
            self.parser
                .expect_identifier("without", Some("\"with\" or \"without\""))?;
        }

        self.parser.scan_whitespace()?;
        self.parser.scanner.expect_char(b':', None)?;
        self.parser.scan_whitespace()?;

        let mut names: Vec<String> = Vec::new();
        loop {
            let name = self.parser.read_identifier()?.to_ascii_lowercase();
            if !names.contains(&name) {
                names.push(name);
            }
            self.parser.scan_whitespace()?;
            if !self.parser.looking_at_identifier(0) {
                break;
            }
        }

        self.parser.scanner.expect_char(b')', None)?;
        self.parser.scanner.expect_done()?;
        Ok(AtRootQuery {
            include,
            names,
            span: self.parser.scanner.raw_span_from(start),
        })
    }
}

#[cfg(test)]
mod tests {
    use brine_source_map::{FileId, Span};
    use pretty_assertions::assert_eq;

    use crate::ast::AtRootQuery;

    use super::*;

    fn parse(text: &str) -> AtRootQuery {
        AtRootQueryParser::new(text, FileId(0))
            .parse()
            .expect("parse failed")
    }

    #[test]
    fn with_keeps_named_rules() {
        let query = parse("(with: media)");
        assert!(query.include);
        assert!(!query.excludes_name("media"));
        assert!(query.excludes_name("supports"));
        assert!(query.excludes_style_rules());
    }

    #[test]
    fn without_excludes_named_rules() {
        let query = parse("(without: media supports)");
        assert!(!query.include);
        assert_eq!(query.names, vec!["media", "supports"]);
        assert!(query.excludes_name("media"));
        assert!(!query.excludes_style_rules());
    }

    #[test]
    fn names_are_lowercased_and_deduplicated() {
        let query = parse("(without: MEDIA media)");
        assert_eq!(query.names, vec!["media"]);
    }

    #[test]
    fn all_covers_everything() {
        let query = parse("(without: all)");
        assert!(query.excludes_name("media"));
        assert!(query.excludes_style_rules());
    }

    #[test]
    fn default_query_excludes_style_rules_only() {
        let query = AtRootQuery::default_query(Span::synthetic());
        assert!(query.excludes_style_rules());
        assert!(!query.excludes_name("media"));
    }

    #[test]
    fn keyword_is_required() {
        let err = AtRootQueryParser::new("(nope: media)", FileId(0))
            .parse()
            .expect_err("should not parse");
        assert_eq!(err.to_string(), "expected \"with\" or \"without\".");
    }
}
