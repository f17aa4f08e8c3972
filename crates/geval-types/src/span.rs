use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location span inside a rule.
///
/// All line/column values are 1-based for human-readable error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "line")]
    pub start_line: u32,
    #[serde(rename = "column")]
    pub start_col: u32,
    pub end_line: u32,
    #[serde(rename = "end_column")]
    pub end_col: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a zero-width span at a single position.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        let (start_line, start_col) =
            if (self.start_line, self.start_col) <= (other.start_line, other.start_col) {
                (self.start_line, self.start_col)
            } else {
                (other.start_line, other.start_col)
            };
        let (end_line, end_col) =
            if (self.end_line, self.end_col) >= (other.end_line, other.end_col) {
                (self.end_line, self.end_col)
            } else {
                (other.end_line, other.end_col)
            };
        Span::new(start_line, start_col, end_line, end_col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Holds the rule text for error reporting.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Byte offsets at which each line starts.
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// Extract a source line by 1-based line number.
    ///
    /// Returns `None` if the line number is out of range.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = line_number.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1))
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    /// Get the total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_point() {
        let s = Span::point(1, 5);
        assert_eq!(s.start_line, 1);
        assert_eq!(s.start_col, 5);
        assert_eq!(s.end_line, 1);
        assert_eq!(s.end_col, 5);
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(1, 5, 1, 10);
        let b = Span::new(2, 3, 2, 8);
        let merged = a.merge(b);
        assert_eq!(merged, Span::new(1, 5, 2, 8));
        assert_eq!(b.merge(a), merged);
    }

    #[test]
    fn test_span_merge_same_line() {
        let merged = Span::new(1, 5, 1, 10).merge(Span::new(1, 3, 1, 8));
        assert_eq!(merged.start_col, 3);
        assert_eq!(merged.end_col, 10);
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(3, 7, 3, 15).to_string(), "3:7");
    }

    #[test]
    fn test_source_file_line_extraction() {
        let src = SourceFile::new("rule", "a := 1\nb := 2\nc := 3");
        assert_eq!(src.line(1), Some("a := 1"));
        assert_eq!(src.line(3), Some("c := 3"));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(4), None);
    }

    #[test]
    fn test_source_file_crlf() {
        let src = SourceFile::new("rule", "x = 1\r\ny = 2\r\n");
        assert_eq!(src.line(1), Some("x = 1"));
        assert_eq!(src.line(2), Some("y = 2"));
        assert_eq!(src.line_count(), 3);
    }

    #[test]
    fn test_source_file_empty() {
        let src = SourceFile::new("rule", "");
        assert_eq!(src.line_count(), 1);
        assert_eq!(src.line(1), Some(""));
    }
}
