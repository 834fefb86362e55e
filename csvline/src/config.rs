// SPDX-License-Identifier: Apache-2.0

//! Parser configuration and construction-time validation.
//!
//! A [`ParserConfig`] is an immutable value built with chained `with_*`
//! setters. It is checked when a parser is created from it, so an invalid
//! combination of special characters is never seen by the scanner.

use crate::parse_error::ConfigError;

/// The character that stands for "not set" in separator/quote positions.
pub const NULL_CHARACTER: char = '\0';
/// Default field separator.
pub const DEFAULT_SEPARATOR: char = ',';
/// Default quote character.
pub const DEFAULT_QUOTE_CHARACTER: char = '"';
/// Default escape character for the general-mode parser.
pub const DEFAULT_ESCAPE_CHARACTER: char = '\\';

/// Decides which empty fields are reported as a semantic null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NullFieldIndicator {
    /// Empty fields are always empty strings.
    #[default]
    Neither,
    /// Empty fields between two separators are null (`a,,b`).
    EmptySeparators,
    /// Empty quoted fields are null (`a,"",b`).
    EmptyQuotes,
    /// Every empty field is null.
    Both,
}

impl NullFieldIndicator {
    /// Whether an empty field should become null, given where it came from.
    pub fn empty_is_null(self, from_quoted_field: bool) -> bool {
        match self {
            NullFieldIndicator::Both => true,
            NullFieldIndicator::EmptySeparators => !from_quoted_field,
            NullFieldIndicator::EmptyQuotes => from_quoted_field,
            NullFieldIndicator::Neither => false,
        }
    }

    /// Converts an empty field to null when the policy asks for it.
    pub fn convert(self, field: String, from_quoted_field: bool) -> Option<String> {
        if field.is_empty() && self.empty_is_null(from_quoted_field) {
            None
        } else {
            Some(field)
        }
    }
}

/// Immutable parser configuration.
///
/// The escape character, strict quotes, leading whitespace and
/// ignore-quotations settings only affect [`CsvParser`](crate::CsvParser);
/// [`Rfc4180Parser`](crate::Rfc4180Parser) ignores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    separator: char,
    quote_char: char,
    escape: Option<char>,
    strict_quotes: bool,
    ignore_leading_whitespace: bool,
    ignore_quotations: bool,
    null_field_indicator: NullFieldIndicator,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            quote_char: DEFAULT_QUOTE_CHARACTER,
            escape: Some(DEFAULT_ESCAPE_CHARACTER),
            strict_quotes: false,
            ignore_leading_whitespace: true,
            ignore_quotations: false,
            null_field_indicator: NullFieldIndicator::Neither,
        }
    }
}

impl ParserConfig {
    /// Configuration with the library defaults: `,` `"` `\`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field separator (builder pattern)
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Set the quote character (builder pattern)
    pub fn with_quote_char(mut self, quote_char: char) -> Self {
        self.quote_char = quote_char;
        self
    }

    /// Set or clear the escape character (builder pattern)
    ///
    /// `Some('\0')` is treated the same as `None`.
    pub fn with_escape(mut self, escape: Option<char>) -> Self {
        self.escape = escape.filter(|&c| c != NULL_CHARACTER);
        self
    }

    /// Drop characters outside quoted spans (builder pattern)
    pub fn with_strict_quotes(mut self, strict_quotes: bool) -> Self {
        self.strict_quotes = strict_quotes;
        self
    }

    /// Discard whitespace before a mid-token quote (builder pattern)
    pub fn with_ignore_leading_whitespace(mut self, ignore: bool) -> Self {
        self.ignore_leading_whitespace = ignore;
        self
    }

    /// Treat quotes as ordinary toggles that never protect separators (builder pattern)
    pub fn with_ignore_quotations(mut self, ignore: bool) -> Self {
        self.ignore_quotations = ignore;
        self
    }

    /// Set the null field policy (builder pattern)
    pub fn with_null_field_indicator(mut self, indicator: NullFieldIndicator) -> Self {
        self.null_field_indicator = indicator;
        self
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn quote_char(&self) -> char {
        self.quote_char
    }

    pub fn escape(&self) -> Option<char> {
        self.escape
    }

    pub fn strict_quotes(&self) -> bool {
        self.strict_quotes
    }

    pub fn ignore_leading_whitespace(&self) -> bool {
        self.ignore_leading_whitespace
    }

    pub fn ignore_quotations(&self) -> bool {
        self.ignore_quotations
    }

    pub fn null_field_indicator(&self) -> NullFieldIndicator {
        self.null_field_indicator
    }

    /// Checks the separator, quote and escape characters for the general parser.
    pub(crate) fn validate_with_escape(&self) -> Result<(), ConfigError> {
        let escape = self.escape.unwrap_or(NULL_CHARACTER);
        if same_character(self.separator, self.quote_char)
            || same_character(self.separator, escape)
            || same_character(self.quote_char, escape)
        {
            return Err(self.same_characters());
        }
        self.validate_separator()
    }

    /// Checks the separator and quote characters; the escape is not used.
    pub(crate) fn validate_without_escape(&self) -> Result<(), ConfigError> {
        if same_character(self.separator, self.quote_char) {
            return Err(self.same_characters());
        }
        self.validate_separator()
    }

    fn validate_separator(&self) -> Result<(), ConfigError> {
        if self.separator == NULL_CHARACTER {
            return Err(ConfigError::UnsetSeparator);
        }
        Ok(())
    }

    fn same_characters(&self) -> ConfigError {
        ConfigError::SameCharacters {
            separator: self.separator,
            quote: self.quote_char,
            escape: self.escape,
        }
    }
}

// NUL never collides with anything
fn same_character(a: char, b: char) -> bool {
    a != NULL_CHARACTER && a == b
}
