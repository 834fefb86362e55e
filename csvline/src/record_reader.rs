// SPDX-License-Identifier: Apache-2.0

//! Assembles logical records from a source of physical lines.
//!
//! [`RecordReader`] owns one [`LineParser`] and feeds it lines in multiline
//! mode until a record is complete. Lines come from a [`LineSource`], which
//! is implemented for any [`BufRead`] via [`BufReadLines`] and for in-memory
//! text via [`StrLines`].

use std::io::{self, BufRead};

use crate::parse_error::ParseError;
use crate::shared::{LineParser, Record};

use log::{debug, trace};

/// Errors raised while reading records.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Trait for supplying physical lines to a [`RecordReader`].
pub trait LineSource {
    /// Returns the next line without its terminator, or `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// A [`LineSource`] over any buffered reader.
///
/// Lines are split on `\n`. A `\r` before the `\n` is removed as well unless
/// [`keep_carriage_return`](Self::keep_carriage_return) is set.
#[derive(Debug)]
pub struct BufReadLines<R> {
    reader: R,
    keep_carriage_return: bool,
}

impl<R: BufRead> BufReadLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            keep_carriage_return: false,
        }
    }

    /// Keep a trailing `\r` as part of the line (builder pattern)
    pub fn keep_carriage_return(mut self, keep: bool) -> Self {
        self.keep_carriage_return = keep;
        self
    }
}

impl<R: BufRead> LineSource for BufReadLines<R> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if !self.keep_carriage_return && line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

/// A [`LineSource`] over a string already in memory.
#[derive(Debug, Clone)]
pub struct StrLines<'a> {
    lines: std::str::Lines<'a>,
}

impl<'a> StrLines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { lines: text.lines() }
    }
}

impl LineSource for StrLines<'_> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.next().map(str::to_owned))
    }
}

/// Reads complete records, letting quoted fields span physical lines.
///
/// # Example
/// ```
/// use csvline::{CsvParser, RecordReader};
///
/// let text = "id,note\n1,\"two\nlines\"\n";
/// let mut reader = RecordReader::from_text(text, CsvParser::default()).skip_lines(1);
/// let record = reader.read_record().unwrap().unwrap();
/// assert_eq!(record, vec![Some("1".into()), Some("two\nlines".into())]);
/// assert_eq!(reader.lines_read(), 3);
/// ```
#[derive(Debug)]
pub struct RecordReader<S, P> {
    source: S,
    parser: P,
    skip_lines: usize,
    /// Maximum physical lines per record, 0 for no limit
    multiline_limit: usize,
    skipped: bool,
    peeked: Option<Record>,
    lines_read: usize,
    records_read: usize,
}

impl<S: LineSource, P: LineParser> RecordReader<S, P> {
    pub fn new(source: S, parser: P) -> Self {
        Self {
            source,
            parser,
            skip_lines: 0,
            multiline_limit: 0,
            skipped: false,
            peeked: None,
            lines_read: 0,
            records_read: 0,
        }
    }

    /// Discard this many physical lines before the first record (builder pattern)
    pub fn skip_lines(mut self, lines: usize) -> Self {
        self.skip_lines = lines;
        self
    }

    /// Fail a record that needs more than this many physical lines (builder pattern)
    ///
    /// 0 means unlimited.
    pub fn multiline_limit(mut self, lines: usize) -> Self {
        self.multiline_limit = lines;
        self
    }

    /// Physical lines consumed so far, skipped lines included.
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Records returned so far. A peeked record counts once it is read.
    pub fn records_read(&self) -> usize {
        self.records_read - usize::from(self.peeked.is_some())
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Reads the next record, or `None` at end of input.
    pub fn read_record(&mut self) -> Result<Option<Record>, ReadError> {
        if let Some(record) = self.peeked.take() {
            return Ok(Some(record));
        }
        self.skip_leading_lines()?;

        let mut lines_in_record = 0;
        loop {
            let Some(line) = self.source.next_line()? else {
                if self.parser.is_pending() {
                    let partial = self.abandon_pending()?;
                    debug!("end of input inside a quoted field");
                    return Err(ParseError::UnterminatedQuote { partial }.into());
                }
                return Ok(None);
            };
            self.lines_read += 1;
            lines_in_record += 1;

            if self.multiline_limit > 0 && lines_in_record > self.multiline_limit {
                let partial = self.abandon_pending()?;
                debug!(
                    "record exceeded {} lines at line {}",
                    self.multiline_limit, self.lines_read
                );
                return Err(ParseError::MultilineLimitExceeded {
                    limit: self.multiline_limit,
                    partial,
                }
                .into());
            }

            if let Some(record) = self.parser.tokenize(Some(&line), true)? {
                self.records_read += 1;
                trace!(
                    "record {} complete with {} fields",
                    self.records_read,
                    record.len()
                );
                return Ok(Some(record));
            }
        }
    }

    /// Returns the next record without consuming it.
    pub fn peek(&mut self) -> Result<Option<&Record>, ReadError> {
        if self.peeked.is_none() {
            self.peeked = self.read_record()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Reads every remaining record, stopping at the first error.
    pub fn read_all(&mut self) -> Result<Vec<Record>, ReadError> {
        self.by_ref().collect()
    }

    fn skip_leading_lines(&mut self) -> Result<(), ReadError> {
        if self.skipped {
            return Ok(());
        }
        self.skipped = true;
        for _ in 0..self.skip_lines {
            if self.source.next_line()?.is_none() {
                break;
            }
            self.lines_read += 1;
        }
        if self.skip_lines > 0 {
            debug!("skipped {} leading lines", self.lines_read);
        }
        Ok(())
    }

    /// Clears the parser's continuation state, returning the open field's text.
    fn abandon_pending(&mut self) -> Result<String, ReadError> {
        let partial = self.parser.pending_text().to_owned();
        self.parser.tokenize(None, true)?;
        Ok(partial)
    }
}

impl<R: BufRead, P: LineParser> RecordReader<BufReadLines<R>, P> {
    /// Reads from a buffered reader, stripping `\r\n` line endings.
    pub fn from_buf_read(reader: R, parser: P) -> Self {
        Self::new(BufReadLines::new(reader), parser)
    }
}

impl<'a, P: LineParser> RecordReader<StrLines<'a>, P> {
    pub fn from_text(text: &'a str, parser: P) -> Self {
        Self::new(StrLines::new(text), parser)
    }
}

impl<S: LineSource, P: LineParser> Iterator for RecordReader<S, P> {
    type Item = Result<Record, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CsvParser, Rfc4180Parser};
    use std::io::Cursor;
    use test_log::test;

    fn record(values: &[&str]) -> Record {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_buf_read_lines_strips_terminators() {
        let mut source = BufReadLines::new(Cursor::new("a\r\nb\nc"));
        assert_eq!(source.next_line().unwrap(), Some("a".to_string()));
        assert_eq!(source.next_line().unwrap(), Some("b".to_string()));
        assert_eq!(source.next_line().unwrap(), Some("c".to_string()));
        assert_eq!(source.next_line().unwrap(), None);
    }

    #[test]
    fn test_buf_read_lines_keeps_carriage_return() {
        let mut source = BufReadLines::new(Cursor::new("a\r\n")).keep_carriage_return(true);
        assert_eq!(source.next_line().unwrap(), Some("a\r".to_string()));
    }

    #[test]
    fn test_reads_multiline_records() {
        let text = "a,\"b\nc\",d\ne,f\n";
        let mut reader = RecordReader::from_text(text, CsvParser::default());
        assert_eq!(reader.read_record().unwrap(), Some(record(&["a", "b\nc", "d"])));
        assert_eq!(reader.lines_read(), 2);
        assert_eq!(reader.read_record().unwrap(), Some(record(&["e", "f"])));
        assert_eq!(reader.read_record().unwrap(), None);
        assert_eq!(reader.records_read(), 2);
    }

    #[test]
    fn test_skip_lines() {
        let text = "# comment\nheader\n1,2\n";
        let mut reader = RecordReader::from_text(text, Rfc4180Parser::default()).skip_lines(2);
        assert_eq!(reader.read_all().unwrap(), vec![record(&["1", "2"])]);
        assert_eq!(reader.lines_read(), 3);
    }

    #[test]
    fn test_skip_more_lines_than_input() {
        let mut reader = RecordReader::from_text("only\n", CsvParser::default()).skip_lines(5);
        assert_eq!(reader.read_record().unwrap(), None);
        assert_eq!(reader.lines_read(), 1);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut reader = RecordReader::from_text("x\ny\n", CsvParser::default());
        assert_eq!(reader.peek().unwrap(), Some(&record(&["x"])));
        assert_eq!(reader.records_read(), 0);
        assert_eq!(reader.peek().unwrap(), Some(&record(&["x"])));
        assert_eq!(reader.read_record().unwrap(), Some(record(&["x"])));
        assert_eq!(reader.records_read(), 1);
        assert_eq!(reader.next().unwrap().unwrap(), record(&["y"]));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_unterminated_at_end_of_input() {
        let mut reader = RecordReader::from_text("a,\"open\nstill open", CsvParser::default());
        match reader.read_record() {
            Err(ReadError::Parse(ParseError::UnterminatedQuote { partial })) => {
                assert_eq!(partial, "open\nstill open\n");
            }
            other => panic!("expected unterminated quote, got {:?}", other),
        }
        assert!(!reader.parser().is_pending());
    }

    #[test]
    fn test_multiline_limit() {
        let text = "\"1\n2\n3\n4\"\n";
        let mut reader = RecordReader::from_text(text, CsvParser::default()).multiline_limit(2);
        match reader.read_record() {
            Err(ReadError::Parse(ParseError::MultilineLimitExceeded { limit, partial })) => {
                assert_eq!(limit, 2);
                assert_eq!(partial, "1\n2\n");
            }
            other => panic!("expected limit error, got {:?}", other),
        }
        assert_eq!(reader.lines_read(), 3);
    }

    #[test]
    fn test_multiline_limit_allows_exact_fit() {
        let text = "\"1\n2\"\n";
        let mut reader = RecordReader::from_text(text, CsvParser::default()).multiline_limit(2);
        assert_eq!(reader.read_record().unwrap(), Some(record(&["1\n2"])));
    }

    #[test]
    fn test_from_buf_read() {
        let input = Cursor::new("a;b\r\n'c\r\nd';e\r\n");
        let config = crate::ParserConfig::new()
            .with_separator(';')
            .with_quote_char('\'');
        let parser = Rfc4180Parser::new(config).unwrap();
        let records = RecordReader::from_buf_read(input, parser).read_all().unwrap();
        assert_eq!(records, vec![record(&["a", "b"]), record(&["c\nd", "e"])]);
    }
}
