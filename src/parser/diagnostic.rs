//!
//! Parser diagnostics and their plain-text rendering.

use std::fmt;

/// A single conformance complaint.
///
/// Renders as `line:col: ERROR: message`, followed by the offending source line
/// and a caret under the column. Ignore rules are matched against this text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line number
    pub line: usize,
    /// 1-based column, counted in characters
    pub column: usize,
    pub message: String,
    /// The source line the diagnostic points into, without its line ending
    pub excerpt: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: ERROR: {}\n{}\n{:>width$}",
            self.line,
            self.column,
            self.message,
            self.excerpt,
            "^",
            width = self.column
        )
    }
}

/// Turns byte offsets into line/column positions for one source text
pub(crate) struct SourceMap<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceMap<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { source, line_starts }
    }

    /// Build a diagnostic pointing at `offset`, which must be a char boundary.
    /// Offsets past the end are clamped to the end of the source.
    pub(crate) fn diagnostic(&self, offset: usize, message: impl Into<String>) -> Diagnostic {
        let offset = offset.min(self.source.len());
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let start = self.line_starts[line_index];
        let end = self.source[start..]
            .find('\n')
            .map_or(self.source.len(), |i| start + i);

        Diagnostic {
            line: line_index + 1,
            column: self.source[start..offset].chars().count() + 1,
            message: message.into(),
            excerpt: self.source[start..end].trim_end_matches('\r').to_string(),
        }
    }
}
