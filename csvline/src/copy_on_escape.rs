// SPDX-License-Identifier: Apache-2.0

use std::ops::Range;

/// Accumulates the text of one field while scanning a physical line.
///
/// As long as every appended character is contiguous in the input, the field
/// is tracked as a byte range into the line and nothing is copied. The first
/// non-contiguous append (an escape substitution, carried-over text from a
/// previous line, a dropped character) materializes the range into an owned
/// scratch buffer, and accumulation continues there. The buffer is created
/// lazily and reused across fields of the same line.
pub struct CopyOnEscape<'a> {
    /// The physical line being scanned
    input: &'a str,
    /// Scratch buffer, only allocated once a copy is needed
    scratch: Option<String>,
    /// Range of `input` not yet copied into `scratch`
    span: Range<usize>,
}

impl<'a> CopyOnEscape<'a> {
    /// Creates an accumulator over `input` with no output yet.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            scratch: None,
            span: 0..0,
        }
    }

    /// Appends the input character occupying `start..end`, the one just consumed.
    ///
    /// Extends the borrowed span when the character directly follows it,
    /// otherwise falls back to the scratch buffer.
    pub fn append_span(&mut self, start: usize, end: usize) {
        if self.span.is_empty() {
            self.span = start..end;
        } else if self.span.end == start {
            self.span.end = end;
        } else {
            let text = &self.input[start..end];
            self.materialize().push_str(text);
        }
    }

    /// Appends text that does not come from the input line.
    pub fn push_str(&mut self, text: &str) {
        self.materialize().push_str(text);
    }

    /// Appends a single character that does not come from the input line.
    pub fn push(&mut self, ch: char) {
        self.materialize().push(ch);
    }

    /// True if nothing has been accumulated since the last reset.
    pub fn is_empty(&self) -> bool {
        self.span.is_empty() && self.scratch.as_ref().map_or(true, String::is_empty)
    }

    /// Discards the accumulated text, keeping the scratch allocation.
    pub fn clear(&mut self) {
        if let Some(scratch) = self.scratch.as_mut() {
            scratch.clear();
        }
        self.span = 0..0;
    }

    /// Returns the accumulated text without resetting.
    pub fn peek(&mut self) -> &str {
        if self.uses_scratch() {
            self.materialize().as_str()
        } else {
            &self.input[self.span.clone()]
        }
    }

    /// Returns the accumulated text and resets for the next field.
    pub fn take(&mut self) -> String {
        let output = if self.uses_scratch() {
            self.materialize();
            self.scratch.as_mut().map(std::mem::take).unwrap_or_default()
        } else {
            self.input[self.span.clone()].to_owned()
        };
        self.clear();
        output
    }

    /// Whether the current field has been copied into the scratch buffer.
    pub(crate) fn uses_scratch(&self) -> bool {
        self.scratch.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Flushes the borrowed span into the scratch buffer and returns it.
    fn materialize(&mut self) -> &mut String {
        let input = self.input;
        let scratch = self
            .scratch
            .get_or_insert_with(|| String::with_capacity(input.len() + 16));
        if !self.span.is_empty() {
            scratch.push_str(&input[self.span.clone()]);
            self.span = 0..0;
        }
        scratch
    }
}
