//! Shared types for the geval rule engine.
//!
//! This crate defines the AST node types, source spans and parse error types
//! used by the lexer, the parser and the evaluator.

mod error;
mod span;
pub mod ast;

pub use error::{ErrorCode, ParseError, ParseErrors, MAX_ERRORS};
pub use span::{SourceFile, Span};

/// Result type used throughout the front end.
pub type Result<T> = std::result::Result<T, ParseError>;
