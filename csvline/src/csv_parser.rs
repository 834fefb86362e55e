// SPDX-License-Identifier: Apache-2.0

//! General-mode line parser with escape character support.

use crate::config::{NullFieldIndicator, ParserConfig};
use crate::copy_on_escape::CopyOnEscape;
use crate::parse_error::{ConfigError, ParseError};
use crate::shared::{LineParser, ParseState, Record, RenderRules};

use log::{debug, trace};

/// A configurable CSV line parser.
///
/// Understands an escape character (default `\`), doubled quotes, strict
/// quotes, leading-whitespace trimming before quotes, and can ignore
/// quotations altogether. Quoted fields may span physical lines when
/// tokenizing in multiline mode.
///
/// # Example
/// ```
/// use csvline::{CsvParser, LineParser};
///
/// let mut parser = CsvParser::default();
/// let record = parser.parse_line(r#"a,"b,b,b",c"#).unwrap();
/// assert_eq!(record, vec![Some("a".into()), Some("b,b,b".into()), Some("c".into())]);
/// ```
#[derive(Debug, Clone)]
pub struct CsvParser {
    config: ParserConfig,
    state: ParseState,
    /// Fields on the last completed record, used to pre-size the next one
    field_count_hint: usize,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            config: ParserConfig::default(),
            state: ParseState::Idle,
            field_count_hint: 0,
        }
    }
}

impl CsvParser {
    /// Creates a parser, rejecting configurations whose special characters collide.
    pub fn new(config: ParserConfig) -> Result<Self, ConfigError> {
        config.validate_with_escape()?;
        Ok(Self {
            config,
            state: ParseState::Idle,
            field_count_hint: 0,
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// The escape character, if any.
    pub fn escape(&self) -> Option<char> {
        self.config.escape()
    }

    /// The continuation state carried to the next physical line.
    pub fn state(&self) -> &ParseState {
        &self.state
    }

    fn tokenize_some(&mut self, line: &str, multiline: bool) -> Result<Option<Record>, ParseError> {
        let (fields, carried) = match self.state.take() {
            ParseState::Idle => (Vec::with_capacity(self.field_count_hint.max(1)), None),
            ParseState::Pending { fields, partial } => {
                trace!("resuming quoted field after {} bytes", partial.len());
                (fields, Some(partial))
            }
        };
        let mut scanner = LineScanner::new(&self.config, line, fields);
        if let Some(partial) = carried {
            scanner.resume(&partial);
        }
        scanner.scan();

        if scanner.open_quote() {
            if multiline {
                let (fields, partial) = scanner.into_pending();
                debug!(
                    "quoted field continues on next line ({} fields so far)",
                    fields.len()
                );
                self.state = ParseState::Pending { fields, partial };
                return Ok(None);
            }
            let partial = scanner.acc.peek().to_owned();
            debug!("unterminated quoted field in single-line mode");
            return Err(ParseError::UnterminatedQuote { partial });
        }

        let record = scanner.finish();
        self.field_count_hint = record.len();
        Ok(Some(record))
    }
}

/// Scans one physical line. Holds the per-line flags of the state machine.
struct LineScanner<'c, 'a> {
    config: &'c ParserConfig,
    line: &'a str,
    acc: CopyOnEscape<'a>,
    fields: Record,
    /// Byte position of the next character to consume
    pos: usize,
    /// Char index of the next character to consume
    char_index: usize,
    in_quotes: bool,
    in_field: bool,
    from_quoted_field: bool,
}

impl<'c, 'a> LineScanner<'c, 'a> {
    fn new(config: &'c ParserConfig, line: &'a str, fields: Record) -> Self {
        Self {
            config,
            line,
            acc: CopyOnEscape::new(line),
            fields,
            pos: 0,
            char_index: 0,
            in_quotes: false,
            in_field: false,
            from_quoted_field: false,
        }
    }

    /// Continues a field left open on the previous line.
    fn resume(&mut self, partial: &str) {
        self.acc.push_str(partial);
        self.in_quotes = !self.config.ignore_quotations();
    }

    fn open_quote(&self) -> bool {
        self.in_quotes && !self.config.ignore_quotations()
    }

    /// Quoted context: inside honoured quotes, or inside a field.
    fn quoted_context(&self) -> bool {
        self.open_quote() || self.in_field
    }

    fn next_char(&self) -> Option<char> {
        self.line[self.pos..].chars().next()
    }

    /// Consumes the next character, returning its byte range.
    fn advance(&mut self) -> Option<(char, usize)> {
        let ch = self.next_char()?;
        let start = self.pos;
        self.pos += ch.len_utf8();
        self.char_index += 1;
        Some((ch, start))
    }

    fn scan(&mut self) {
        let separator = self.config.separator();
        let quote = self.config.quote_char();
        let escape = self.config.escape();

        while let Some((ch, start)) = self.advance() {
            if Some(ch) == escape {
                self.on_escape(start, quote, ch);
            } else if ch == quote {
                self.on_quote(start, quote, separator);
            } else if ch == separator && !self.open_quote() {
                self.close_field();
            } else {
                self.on_data(start);
            }
        }
    }

    fn on_escape(&mut self, start: usize, quote: char, escape: char) {
        if !self.config.strict_quotes() {
            self.in_field = true;
        }
        let escapable = self
            .next_char()
            .is_some_and(|next| next == quote || next == escape);
        if self.quoted_context() && escapable {
            if let Some((_, next_start)) = self.advance() {
                self.acc.append_span(next_start, self.pos);
            }
        } else {
            self.on_data(start);
        }
    }

    fn on_quote(&mut self, start: usize, quote: char, separator: char) {
        if self.quoted_context() && self.next_char() == Some(quote) {
            // doubled quote
            if let Some((_, next_start)) = self.advance() {
                self.acc.append_span(next_start, self.pos);
            }
        } else {
            self.in_quotes = !self.in_quotes;
            if self.acc.is_empty() {
                self.from_quoted_field = true;
            }
            if !self.config.strict_quotes() {
                self.keep_embedded_quote(start, separator);
            }
        }
        self.in_field = !self.in_field;
    }

    /// A quote in the middle of a token (`a,bc"d"ef,g`) is kept as data.
    ///
    /// Applies when at least two characters precede the quote and neither
    /// neighbour is a separator. Whitespace-only text before such a quote is
    /// discarded instead when leading whitespace is ignored.
    fn keep_embedded_quote(&mut self, start: usize, separator: char) {
        let quote_index = self.char_index - 1;
        let before = self.line[..start].chars().next_back();
        let after = self.next_char();
        let embedded = quote_index > 1
            && before != Some(separator)
            && after.is_some_and(|c| c != separator);
        if !embedded {
            return;
        }
        if self.config.ignore_leading_whitespace()
            && !self.acc.is_empty()
            && self.acc.peek().chars().all(char::is_whitespace)
        {
            self.acc.clear();
        } else {
            self.acc.append_span(start, self.pos);
        }
    }

    fn on_data(&mut self, start: usize) {
        if !self.config.strict_quotes() || self.open_quote() {
            self.acc.append_span(start, self.pos);
            self.in_field = true;
            self.from_quoted_field = true;
        }
    }

    fn close_field(&mut self) {
        let value = self.take_field();
        self.fields.push(value);
        self.from_quoted_field = false;
        self.in_field = false;
    }

    fn take_field(&mut self) -> Option<String> {
        let indicator: NullFieldIndicator = self.config.null_field_indicator();
        indicator.convert(self.acc.take(), self.from_quoted_field)
    }

    fn into_pending(mut self) -> (Record, String) {
        self.acc.push('\n');
        let partial = self.acc.take();
        (self.fields, partial)
    }

    fn finish(mut self) -> Record {
        self.close_field();
        self.fields
    }
}

impl LineParser for CsvParser {
    fn separator(&self) -> char {
        self.config.separator()
    }

    fn quote_char(&self) -> char {
        self.config.quote_char()
    }

    fn null_field_indicator(&self) -> NullFieldIndicator {
        self.config.null_field_indicator()
    }

    fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    fn pending_text(&self) -> &str {
        self.state.pending_text()
    }

    fn tokenize(
        &mut self,
        line: Option<&str>,
        multiline: bool,
    ) -> Result<Option<Record>, ParseError> {
        if !multiline && self.state.is_pending() {
            debug!("single-line mode discards pending field");
            self.state = ParseState::Idle;
        }
        match line {
            Some(line) => self.tokenize_some(line, multiline),
            None => Ok(self.state.take().flush()),
        }
    }

    fn render_with(&self, fields: &[Option<String>], quote_all: bool) -> String {
        RenderRules {
            separator: self.config.separator(),
            quote: self.config.quote_char(),
            escape: self.config.escape(),
            null_field_indicator: self.config.null_field_indicator(),
        }
        .render(fields, quote_all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn record(values: &[&str]) -> Record {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn parse(line: &str) -> Record {
        CsvParser::default().parse_line(line).unwrap()
    }

    fn parse_with(config: ParserConfig, line: &str) -> Record {
        CsvParser::new(config).unwrap().parse_line(line).unwrap()
    }

    #[test]
    fn test_simple() {
        assert_eq!(parse("a,b,c"), record(&["a", "b", "c"]));
    }

    #[test]
    fn test_quoted_separators() {
        assert_eq!(parse(r#"a,"b,b,b",c"#), record(&["a", "b,b,b", "c"]));
    }

    #[test]
    fn test_doubled_quotes() {
        assert_eq!(
            parse(r#""Glen ""The Man"" Smith",Athlete"#),
            record(&["Glen \"The Man\" Smith", "Athlete"])
        );
    }

    #[test]
    fn test_escaped_quote() {
        assert_eq!(parse(r#"a,"123\"4567",c"#), record(&["a", "123\"4567", "c"]));
    }

    #[test]
    fn test_escaped_escape() {
        assert_eq!(parse(r#""a\\b",c"#), record(&["a\\b", "c"]));
        assert_eq!(parse(r#"a\\b,c"#), record(&["a\\b", "c"]));
    }

    #[test]
    fn test_lone_escape_is_data() {
        assert_eq!(parse(r#"C:\temp,x"#), record(&["C:\\temp", "x"]));
        assert_eq!(parse(r#""tab\t",x"#), record(&["tab\\t", "x"]));
    }

    #[test]
    fn test_unterminated_single_line() {
        let mut parser = CsvParser::default();
        let result = parser.parse_line(r#"This,is,a,"unterminated"#);
        assert_eq!(
            result,
            Err(ParseError::UnterminatedQuote {
                partial: "unterminated".to_string()
            })
        );
        assert!(!parser.is_pending());
    }

    #[test]
    fn test_empty_line_is_one_empty_field() {
        assert_eq!(parse(""), record(&[""]));
    }

    #[test]
    fn test_trailing_separator() {
        assert_eq!(parse("a,b,"), record(&["a", "b", ""]));
        assert_eq!(parse(",,"), record(&["", "", ""]));
    }

    #[test]
    fn test_embedded_quote_kept_mid_token() {
        assert_eq!(parse(r#"a,123"4"567,c"#), record(&["a", "123\"4\"567", "c"]));
    }

    #[test]
    fn test_quote_after_short_prefix_not_kept() {
        // only one character precedes the quote
        assert_eq!(parse(r#"x"y""#), record(&["xy"]));
    }

    #[test]
    fn test_leading_whitespace_before_quote() {
        assert_eq!(
            parse(r#""this", "is","a test""#),
            record(&["this", "is", "a test"])
        );
    }

    #[test]
    fn test_leading_whitespace_kept_when_not_ignored() {
        let config = ParserConfig::new().with_ignore_leading_whitespace(false);
        assert_eq!(
            parse_with(config, r#""this", "is","a test""#),
            record(&["this", " \"is", "a test"])
        );
    }

    #[test]
    fn test_strict_quotes_drops_unquoted_text() {
        let config = ParserConfig::new().with_strict_quotes(true);
        assert_eq!(
            parse_with(config, r#"abc"def",ghi,"jkl""#),
            record(&["def", "", "jkl"])
        );
    }

    #[test]
    fn test_strict_quotes_keeps_escapes_in_quotes() {
        let config = ParserConfig::new().with_strict_quotes(true);
        assert_eq!(
            parse_with(config, r#""a\"b",c"#),
            record(&["a\"b", ""])
        );
    }

    #[test]
    fn test_ignore_quotations_splits_inside_quotes() {
        let config = ParserConfig::new().with_ignore_quotations(true);
        assert_eq!(parse_with(config, r#"a,"b,c""#), record(&["a", "b", "c"]));
    }

    #[test]
    fn test_ignore_quotations_never_pends() {
        let config = ParserConfig::new().with_ignore_quotations(true);
        let mut parser = CsvParser::new(config).unwrap();
        let result = parser.parse_line_multi(r#"a,"b"#).unwrap();
        assert_eq!(result, Some(record(&["a", "b"])));
        assert!(!parser.is_pending());
    }

    #[test]
    fn test_custom_characters() {
        let config = ParserConfig::new()
            .with_separator(';')
            .with_quote_char('\'')
            .with_escape(None);
        assert_eq!(
            parse_with(config, r"a;'b;c';'it''s'"),
            record(&["a", "b;c", "it's"])
        );
    }

    #[test]
    fn test_tab_separator_and_unicode() {
        let config = ParserConfig::new().with_separator('\t');
        assert_eq!(
            parse_with(config, "äö\t\"ü\tß\"\t€"),
            record(&["äö", "ü\tß", "€"])
        );
    }

    #[test]
    fn test_multiline_continuation() {
        let mut parser = CsvParser::default();
        assert_eq!(parser.parse_line_multi(r#"a,"b"#), Ok(None));
        assert!(parser.is_pending());
        assert_eq!(parser.pending_text(), "b\n");
        assert_eq!(
            parser.parse_line_multi(r#"c",d"#),
            Ok(Some(record(&["a", "b\nc", "d"])))
        );
        assert!(!parser.is_pending());
        assert_eq!(parser.pending_text(), "");
    }

    #[test]
    fn test_multiline_three_lines() {
        let mut parser = CsvParser::default();
        assert_eq!(parser.parse_line_multi(r#"1,"first"#), Ok(None));
        assert_eq!(parser.parse_line_multi("second"), Ok(None));
        assert_eq!(parser.pending_text(), "first\nsecond\n");
        assert_eq!(
            parser.parse_line_multi(r#"third",x"#),
            Ok(Some(record(&["1", "first\nsecond\nthird", "x"])))
        );
    }

    #[test]
    fn test_end_of_input_flushes_pending() {
        let mut parser = CsvParser::default();
        assert_eq!(parser.tokenize(Some(r#""abc"#), true), Ok(None));
        assert_eq!(parser.tokenize(None, true), Ok(Some(vec![Some("abc\n".into())])));
        assert!(!parser.is_pending());
        assert_eq!(parser.tokenize(None, true), Ok(None));
    }

    #[test]
    fn test_single_line_discards_pending() {
        let mut parser = CsvParser::default();
        assert_eq!(parser.parse_line_multi(r#"a,"b"#), Ok(None));
        assert_eq!(parser.parse_line("x,y"), Ok(record(&["x", "y"])));
        assert!(!parser.is_pending());
    }

    #[test]
    fn test_empty_quoted_fields() {
        assert_eq!(parse(r#""","""#), record(&["", ""]));
        let config = ParserConfig::new().with_null_field_indicator(NullFieldIndicator::EmptyQuotes);
        assert_eq!(
            parse_with(config, r#""",,"""#),
            vec![None, Some(String::new()), None]
        );
    }

    #[test]
    fn test_render_round_trip() {
        let mut parser = CsvParser::default();
        let values = record(&[
            "plain",
            "with,comma",
            "with \"quote\"",
            "back\\slash",
            "multi\nline",
        ]);
        let line = parser.render(&values);
        let mut lines = line.split('\n');
        assert_eq!(parser.parse_line_multi(lines.next().unwrap()), Ok(None));
        assert_eq!(parser.parse_line_multi(lines.next().unwrap()), Ok(Some(values)));
    }

    #[test]
    fn test_rejects_colliding_characters() {
        let config = ParserConfig::new().with_separator('\\');
        assert!(matches!(
            CsvParser::new(config),
            Err(ConfigError::SameCharacters { .. })
        ));
    }
}
