// SPDX-License-Identifier: Apache-2.0

//! Components shared by both line parsers.

use crate::config::NullFieldIndicator;
use crate::parse_error::ParseError;

/// One logical CSV record; `None` is a semantic null field.
pub type Record = Vec<Option<String>>;

/// Continuation state carried by a parser between physical lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParseState {
    /// No record is in progress.
    #[default]
    Idle,
    /// A quoted field is open at the end of the last physical line.
    Pending {
        /// Fields completed on earlier physical lines of this record
        fields: Record,
        /// Text of the open field, ending with the newline that was consumed
        partial: String,
    },
}

impl ParseState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ParseState::Pending { .. })
    }

    /// The text of the open field, or `""` when idle.
    pub fn pending_text(&self) -> &str {
        match self {
            ParseState::Idle => "",
            ParseState::Pending { partial, .. } => partial,
        }
    }

    /// Moves the state out, leaving `Idle` behind.
    pub(crate) fn take(&mut self) -> ParseState {
        std::mem::take(self)
    }

    /// Closes a pending record at end of input.
    ///
    /// The open field is returned as-is as the last field; `None` if idle.
    pub(crate) fn flush(self) -> Option<Record> {
        match self {
            ParseState::Idle => None,
            ParseState::Pending { mut fields, partial } => {
                fields.push(Some(partial));
                Some(fields)
            }
        }
    }
}

/// The contract shared by [`CsvParser`](crate::CsvParser) and
/// [`Rfc4180Parser`](crate::Rfc4180Parser).
///
/// A parser instance owns the continuation state of one input stream and must
/// not be shared between streams.
pub trait LineParser {
    /// The field separator.
    fn separator(&self) -> char;

    /// The quote character.
    fn quote_char(&self) -> char;

    /// The configured null policy.
    fn null_field_indicator(&self) -> NullFieldIndicator;

    /// True while a multi-line field is waiting for its next physical line.
    fn is_pending(&self) -> bool;

    /// Partially accumulated text of the open field, `""` if none.
    fn pending_text(&self) -> &str;

    /// Tokenizes one physical line.
    ///
    /// `line = None` signals end of input: a pending record is returned with its
    /// open field as the last value, otherwise `Ok(None)`. With `multiline` set,
    /// a line that ends inside a quoted field returns `Ok(None)` and the parser
    /// waits for the next line; without it any pending state is discarded first.
    fn tokenize(&mut self, line: Option<&str>, multiline: bool)
        -> Result<Option<Record>, ParseError>;

    /// Tokenizes a line that must hold a complete record.
    fn parse_line(&mut self, line: &str) -> Result<Record, ParseError> {
        Ok(self.tokenize(Some(line), false)?.unwrap_or_default())
    }

    /// Tokenizes a line that may continue or leave open a multi-line record.
    fn parse_line_multi(&mut self, line: &str) -> Result<Option<Record>, ParseError> {
        self.tokenize(Some(line), true)
    }

    /// Renders fields back into one CSV line without a line terminator.
    fn render(&self, fields: &[Option<String>]) -> String {
        self.render_with(fields, false)
    }

    /// Renders fields, quoting every value when `quote_all` is set.
    fn render_with(&self, fields: &[Option<String>], quote_all: bool) -> String;
}

/// The characters and policy a renderer needs.
pub(crate) struct RenderRules {
    pub separator: char,
    pub quote: char,
    pub escape: Option<char>,
    pub null_field_indicator: NullFieldIndicator,
}

impl RenderRules {
    pub fn render(&self, fields: &[Option<String>], quote_all: bool) -> String {
        let capacity = fields
            .iter()
            .map(|f| f.as_ref().map_or(2, |s| s.len() + 3))
            .sum();
        let mut line = String::with_capacity(capacity);
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                line.push(self.separator);
            }
            self.render_field(field.as_deref(), quote_all, &mut line);
        }
        line
    }

    fn render_field(&self, value: Option<&str>, quote_all: bool, out: &mut String) {
        let surround = quote_all || self.needs_quotes(value);
        if surround {
            out.push(self.quote);
        }
        for ch in value.unwrap_or_default().chars() {
            out.push(ch);
            if ch == self.quote || Some(ch) == self.escape {
                out.push(ch);
            }
        }
        if surround {
            out.push(self.quote);
        }
    }

    fn needs_quotes(&self, value: Option<&str>) -> bool {
        match value {
            None => matches!(
                self.null_field_indicator,
                NullFieldIndicator::EmptyQuotes | NullFieldIndicator::Both
            ),
            Some("") => self.null_field_indicator == NullFieldIndicator::EmptySeparators,
            Some(text) => text
                .chars()
                .any(|c| c == self.quote || c == self.separator || c == '\n'),
        }
    }
}

/// True if `text` has at least one non-whitespace character.
pub(crate) fn is_not_blank(text: &str) -> bool {
    text.chars().any(|c| !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(null_field_indicator: NullFieldIndicator) -> RenderRules {
        RenderRules {
            separator: ',',
            quote: '"',
            escape: Some('\\'),
            null_field_indicator,
        }
    }

    fn fields(values: &[Option<&str>]) -> Record {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn test_pending_state_accessors() {
        let mut state = ParseState::Pending {
            fields: fields(&[Some("a")]),
            partial: "b\n".to_string(),
        };
        assert!(state.is_pending());
        assert_eq!(state.pending_text(), "b\n");

        let taken = state.take();
        assert_eq!(state, ParseState::Idle);
        assert_eq!(state.pending_text(), "");
        assert_eq!(taken.flush(), Some(fields(&[Some("a"), Some("b\n")])));
        assert_eq!(ParseState::Idle.flush(), None);
    }

    #[test]
    fn test_render_plain_and_quoted() {
        let r = rules(NullFieldIndicator::Neither);
        assert_eq!(r.render(&fields(&[Some("a"), Some("b"), Some("c")]), false), "a,b,c");
        assert_eq!(r.render(&fields(&[Some("a,b"), Some("c")]), false), "\"a,b\",c");
        assert_eq!(
            r.render(&fields(&[Some("Say \"Hi\""), Some("x")]), false),
            "\"Say \"\"Hi\"\"\",x"
        );
        assert_eq!(r.render(&fields(&[Some("l1\nl2")]), false), "\"l1\nl2\"");
        assert_eq!(r.render(&fields(&[Some("a\\b")]), false), "a\\\\b");
        assert_eq!(r.render(&[], false), "");
    }

    #[test]
    fn test_render_quote_all() {
        let r = rules(NullFieldIndicator::Neither);
        assert_eq!(r.render(&fields(&[Some("a"), Some("")]), true), "\"a\",\"\"");
    }

    #[test]
    fn test_render_nulls_per_policy() {
        let values = fields(&[None, Some("")]);
        assert_eq!(rules(NullFieldIndicator::Neither).render(&values, false), ",");
        assert_eq!(
            rules(NullFieldIndicator::EmptySeparators).render(&values, false),
            ",\"\""
        );
        assert_eq!(
            rules(NullFieldIndicator::EmptyQuotes).render(&values, false),
            "\"\","
        );
        assert_eq!(rules(NullFieldIndicator::Both).render(&values, false), "\"\",");
    }

    #[test]
    fn test_is_not_blank() {
        assert!(!is_not_blank(""));
        assert!(!is_not_blank(" \t"));
        assert!(is_not_blank(" x "));
    }
}
