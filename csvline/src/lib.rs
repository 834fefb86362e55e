// SPDX-License-Identifier: Apache-2.0

//! Line-oriented CSV tokenizing.
//!
//! Two parsers share the [`LineParser`] trait:
//!
//! - [`CsvParser`] understands an escape character and the lenient quoting
//!   found in CSV files in the wild.
//! - [`Rfc4180Parser`] follows RFC 4180, where a doubled quote is the only
//!   way to write a quote.
//!
//! Both turn one physical line into a [`Record`], carry an open quoted field
//! over to the next line in multiline mode, and render records back into a
//! line. [`RecordReader`] drives a parser over a whole input.
//!
//! ```
//! use csvline::{CsvParser, LineParser, NullFieldIndicator, ParserConfig};
//!
//! let config = ParserConfig::new().with_null_field_indicator(NullFieldIndicator::EmptySeparators);
//! let mut parser = CsvParser::new(config).unwrap();
//! assert_eq!(
//!     parser.parse_line(r#"a,,"""#).unwrap(),
//!     vec![Some("a".to_string()), None, Some(String::new())]
//! );
//! ```

mod config;
pub use config::{
    NullFieldIndicator, ParserConfig, DEFAULT_ESCAPE_CHARACTER, DEFAULT_QUOTE_CHARACTER,
    DEFAULT_SEPARATOR, NULL_CHARACTER,
};

mod parse_error;
pub use parse_error::{ConfigError, ParseError};

mod copy_on_escape;
pub use copy_on_escape::CopyOnEscape;

mod shared;
pub use shared::{LineParser, ParseState, Record};

mod csv_parser;
pub use csv_parser::CsvParser;

mod rfc4180_parser;
pub use rfc4180_parser::Rfc4180Parser;

mod record_reader;
pub use record_reader::{BufReadLines, LineSource, ReadError, RecordReader, StrLines};

#[cfg(feature = "parallel")]
mod ordered;
#[cfg(feature = "parallel")]
pub use ordered::{OrderedProcessor, ProcessError};
