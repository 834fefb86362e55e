// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors raised when a parser is built from an invalid [`ParserConfig`](crate::ParserConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Two of the separator, quote and escape characters are the same.
    #[error("separator, quote and escape characters must differ (separator {separator:?}, quote {quote:?}, escape {escape:?})")]
    SameCharacters {
        separator: char,
        quote: char,
        escape: Option<char>,
    },
    /// The separator is the NUL character, which means "not set".
    #[error("a separator character must be defined")]
    UnsetSeparator,
}

/// Errors that can occur while tokenizing CSV lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A quoted field never closed and no further continuation is possible.
    #[error("unterminated quoted field at end of line: {partial:?}")]
    UnterminatedQuote {
        /// The text accumulated for the open field.
        partial: String,
    },
    /// More physical lines than allowed were consumed for one record.
    #[error("multi-line record exceeded the limit of {limit} lines: {partial:?}")]
    MultilineLimitExceeded {
        /// The configured line limit.
        limit: usize,
        /// The text of the unterminated field so far.
        partial: String,
    },
}

impl ParseError {
    /// The partial field text carried by this error.
    pub fn partial_text(&self) -> &str {
        match self {
            ParseError::UnterminatedQuote { partial }
            | ParseError::MultilineLimitExceeded { partial, .. } => partial,
        }
    }
}
