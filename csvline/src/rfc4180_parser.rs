// SPDX-License-Identifier: Apache-2.0

//! RFC 4180 line parser.
//!
//! Quotes are the only special character: a quote can only be written as a
//! doubled quote inside a quoted field and there is no escape character.
//! Fields are split positionally on separators outside of quotes, then one
//! pair of surrounding quotes is stripped and doubled quotes are collapsed.

use std::borrow::Cow;

use crate::config::{NullFieldIndicator, ParserConfig};
use crate::parse_error::{ConfigError, ParseError};
use crate::shared::{is_not_blank, LineParser, ParseState, Record, RenderRules};

use log::{debug, trace};

/// A parser that follows RFC 4180 instead of the configurable quote rules of
/// [`CsvParser`](crate::CsvParser).
///
/// Only the separator, the quote character and the null policy of the
/// [`ParserConfig`] are used.
#[derive(Debug, Clone)]
pub struct Rfc4180Parser {
    config: ParserConfig,
    state: ParseState,
}

impl Default for Rfc4180Parser {
    fn default() -> Self {
        Self {
            config: ParserConfig::default(),
            state: ParseState::Idle,
        }
    }
}

impl Rfc4180Parser {
    pub fn new(config: ParserConfig) -> Result<Self, ConfigError> {
        config.validate_without_escape()?;
        Ok(Self {
            config,
            state: ParseState::Idle,
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn state(&self) -> &ParseState {
        &self.state
    }

    fn tokenize_some(&mut self, line: &str, multiline: bool) -> Result<Option<Record>, ParseError> {
        let (mut fields, line_to_process) = match self.state.take() {
            ParseState::Idle => (Vec::new(), Cow::Borrowed(line)),
            ParseState::Pending { fields, partial } => (fields, Cow::Owned(partial + line)),
        };

        if !line_to_process.contains(self.config.quote_char()) {
            trace!("no quotes, splitting directly");
            fields.extend(
                line_to_process
                    .split(self.config.separator())
                    .map(|token| self.convert_unquoted(token)),
            );
            return Ok(Some(fields));
        }

        let mut tokens = self.split_outside_quotes(&line_to_process);
        if multiline && tokens.last().is_some_and(|t| self.looks_unterminated(t)) {
            if let Some(open) = tokens.pop() {
                fields.extend(tokens.into_iter().map(|t| self.convert_token(t)));
                let mut partial = open.to_owned();
                partial.push('\n');
                debug!(
                    "quoted field continues on next line ({} fields so far)",
                    fields.len()
                );
                self.state = ParseState::Pending { fields, partial };
                return Ok(None);
            }
        }
        if line_to_process.ends_with(self.config.separator()) {
            tokens.push("");
        }
        fields.extend(tokens.into_iter().map(|t| self.convert_token(t)));
        Ok(Some(fields))
    }

    /// Splits `line` on separators that are not inside a quoted field.
    ///
    /// Tokens keep their quotes. A trailing separator does not produce an
    /// empty token here.
    fn split_outside_quotes<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let separator = self.config.separator();
        let quote = self.config.quote_char();
        let separator_len = separator.len_utf8();

        let mut tokens = Vec::new();
        let mut cursor = 0;
        while cursor < line.len() {
            let next_separator = find_from(line, separator, cursor);
            let next_quote = find_from(line, quote, cursor);
            match (next_separator, next_quote) {
                (None, _) => {
                    tokens.push(&line[cursor..]);
                    cursor = line.len();
                }
                (Some(sep), Some(q)) if q == cursor && q < sep => {
                    let end = self.find_end_of_field(line, cursor);
                    tokens.push(&line[cursor..end.min(line.len())]);
                    cursor = end + separator_len;
                }
                (Some(sep), _) => {
                    tokens.push(&line[cursor..sep]);
                    cursor = sep + separator_len;
                }
            }
        }
        tokens
    }

    /// Returns the byte position just past the closing quote of the field
    /// opened at `start`, or the line length if it never closes.
    ///
    /// A doubled quote is a literal quote and is skipped as a pair. Any other
    /// quote closes the field when it is followed by a separator or ends the
    /// line.
    fn find_end_of_field(&self, line: &str, start: usize) -> usize {
        let separator = self.config.separator();
        let quote = self.config.quote_char();
        let quote_len = quote.len_utf8();

        let mut cursor = start + quote_len;
        while let Some(q) = find_from(line, quote, cursor) {
            cursor = q + quote_len;
            match line[cursor..].chars().next() {
                None => return cursor,
                Some(following) if following == separator => return cursor,
                Some(following) if following == quote => cursor += quote_len,
                Some(_) => {}
            }
        }
        line.len()
    }

    /// A token that opens a quote it does not close, or is a lone quote.
    fn looks_unterminated(&self, token: &str) -> bool {
        let quote = self.config.quote_char();
        let starts_but_does_not_end =
            is_not_blank(token) && token.starts_with(quote) && !token.ends_with(quote);
        starts_but_does_not_end || self.is_lone_quote(token)
    }

    fn is_lone_quote(&self, token: &str) -> bool {
        let mut chars = token.chars();
        chars.next() == Some(self.config.quote_char()) && chars.next().is_none()
    }

    /// Strips one pair of surrounding quotes and collapses doubled quotes.
    fn unquote(&self, token: &str) -> String {
        let quote = self.config.quote_char();
        let mut inner = token;
        if !self.is_lone_quote(inner) {
            if let Some(rest) = inner.strip_prefix(quote) {
                inner = rest.strip_suffix(quote).unwrap_or(rest);
            }
        }
        let mut doubled = String::with_capacity(quote.len_utf8() * 2);
        doubled.push(quote);
        doubled.push(quote);
        inner.replace(&doubled, &quote.to_string())
    }

    fn convert_unquoted(&self, token: &str) -> Option<String> {
        self.null_field_indicator().convert(token.to_owned(), false)
    }

    fn convert_token(&self, token: &str) -> Option<String> {
        if token.contains(self.config.quote_char()) {
            self.null_field_indicator().convert(self.unquote(token), true)
        } else {
            self.convert_unquoted(token)
        }
    }
}

fn find_from(line: &str, ch: char, from: usize) -> Option<usize> {
    line.get(from..)?.find(ch).map(|i| i + from)
}

impl LineParser for Rfc4180Parser {
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
            escape: None,
            null_field_indicator: self.config.null_field_indicator(),
        }
        .render(fields, quote_all)
    }
}
