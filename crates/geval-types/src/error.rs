use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of errors stored before the front end stops collecting.
pub const MAX_ERRORS: usize = 20;

/// Numeric syntax error code (E100–E199).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNCLOSED_DELIMITER: Self = Self(101);
    pub const INVALID_LITERAL: Self = Self(102);
    pub const UNTERMINATED: Self = Self(103);
    pub const NESTING_TOO_DEEP: Self = Self(104);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured front-end error.
///
/// Hosts that surface rule errors to authors serialize this to JSON rather
/// than parsing the display string.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{span}: {code} {message}")]
pub struct ParseError {
    /// Rule name the error belongs to.
    pub file: String,
    pub code: ErrorCode,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The exact source line for context.
    pub source_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ParseError {
    /// Create a new error.
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// All errors collected while lexing and parsing one rule.
#[derive(Debug, Clone, Default, Error, Serialize, Deserialize)]
#[error("{} parse error(s){}", .total_errors, .errors.first().map(|e| format!(", first: {e}")).unwrap_or_default())]
pub struct ParseErrors {
    pub errors: Vec<ParseError>,
    pub total_errors: usize,
}

impl ParseErrors {
    /// Create an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, respecting the [`MAX_ERRORS`] limit.
    pub fn push_error(&mut self, error: ParseError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Append every error from `other`.
    pub fn extend(&mut self, other: ParseErrors) {
        let dropped = other.total_errors - other.errors.len();
        for error in other.errors {
            self.push_error(error);
        }
        self.total_errors += dropped;
    }

    /// Returns `true` once [`MAX_ERRORS`] have been reported.
    pub fn is_full(&self) -> bool {
        self.total_errors >= MAX_ERRORS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParseError {
        ParseError::new(
            "discount",
            ErrorCode::UNEXPECTED_TOKEN,
            "expected ';', got ')'",
            Span::new(2, 5, 2, 6),
            "  a = 1)",
        )
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.to_string(), "E100");
        assert_eq!(ErrorCode::UNTERMINATED.to_string(), "E103");
    }

    #[test]
    fn test_parse_error_display() {
        assert_eq!(sample().to_string(), "2:5: E100 expected ';', got ')'");
    }

    #[test]
    fn test_parse_error_with_suggestion() {
        let err = sample().with_suggestion("remove the ')'");
        assert_eq!(err.suggestion.as_deref(), Some("remove the ')'"));
    }

    #[test]
    fn test_parse_error_json_serialization() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"code\":100"));
        assert!(json.contains("\"line\":2"));
        assert!(json.contains("\"column\":5"));
        assert!(json.contains("\"end_column\":6"));
        assert!(!json.contains("suggestion"));

        let back: ParseError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, ErrorCode::UNEXPECTED_TOKEN);
        assert_eq!(back.span, Span::new(2, 5, 2, 6));
    }

    #[test]
    fn test_parse_errors_max_limit() {
        let mut errs = ParseErrors::empty();
        for i in 0..25 {
            errs.push_error(ParseError::new(
                "rule",
                ErrorCode::UNEXPECTED_TOKEN,
                format!("error {i}"),
                Span::point(i + 1, 1),
                "",
            ));
        }
        assert_eq!(errs.errors.len(), MAX_ERRORS);
        assert_eq!(errs.total_errors, 25);
        assert!(errs.is_full());
    }

    #[test]
    fn test_parse_errors_extend_keeps_totals() {
        let mut a = ParseErrors::empty();
        a.push_error(sample());
        let mut b = ParseErrors::empty();
        b.push_error(sample());
        b.push_error(sample());
        a.extend(b);
        assert_eq!(a.total_errors, 3);
        assert_eq!(a.errors.len(), 3);
    }

    #[test]
    fn test_parse_errors_display() {
        let mut errs = ParseErrors::empty();
        assert_eq!(errs.to_string(), "0 parse error(s)");
        errs.push_error(sample());
        assert_eq!(
            errs.to_string(),
            "1 parse error(s), first: 2:5: E100 expected ';', got ')'"
        );
    }
}
