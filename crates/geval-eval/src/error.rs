//! Runtime error types for the geval evaluator.

use geval_types::{ParseErrors, Span};
use thiserror::Error;

use crate::value::Type;

/// Evaluation error: binding failures, type mismatches and runtime traps.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// The rule text did not parse.
    #[error(transparent)]
    Parse(#[from] ParseErrors),

    // ── Bindings ──
    #[error("undefined variable: {name}")]
    UnboundVariable { name: String },
    #[error("'{name}' is already bound")]
    DuplicateBinding { name: String },
    #[error("'{name}' must be bound to a mutable reference")]
    NotAReference { name: String },
    #[error("unknown function: {name}")]
    UnknownFunction { name: String },
    #[error("function '{name}' is already registered")]
    DuplicateFunction { name: String },

    // ── Types ──
    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: Type,
        found: Type,
    },
    #[error("unknown type name '{name}'")]
    UnknownType { name: String },
    #[error("invalid map key type {ty}")]
    InvalidMapKey { ty: Type },
    #[error("cannot {operation} a value of type {found}")]
    InvalidOperation {
        operation: &'static str,
        found: Type,
    },

    // ── Runtime traps ──
    #[error("division by zero")]
    DivideByZero,
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("key {key} not found")]
    KeyNotFound { key: String },
    #[error("record {record} has no field '{field}'")]
    FieldNotFound { record: String, field: String },
    #[error("assignment to entry in nil map")]
    NilMap,

    // ── Unsupported input ──
    #[error("{span}: node kind not supported: {node}")]
    UnsupportedNode { node: String, span: Span },
    #[error("arity mismatch in {context}: expected {expected}, found {found}")]
    ArityMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    // ── Functions ──
    /// Misuse of a built-in that hosts must treat as a programming error.
    #[error("invalid use of built-in {builtin}: {message}")]
    BuiltinMisuse {
        builtin: &'static str,
        message: String,
    },
    #[error("function {name} failed: {message}")]
    Function { name: String, message: String },

    // ── Limits ──
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },

    // ── Engine ──
    #[error("rule {fingerprint} is already loaded")]
    DuplicateRule { fingerprint: String },
}

impl EvalError {
    /// Failure raised by host function bodies. The evaluator fills in the
    /// function name.
    pub fn host(message: impl Into<String>) -> Self {
        Self::Function {
            name: String::new(),
            message: message.into(),
        }
    }

    /// `true` for errors signalling a broken rule or host setup rather than
    /// bad data.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BuiltinMisuse { .. })
    }

    pub(crate) fn mismatch(context: impl Into<String>, expected: Type, found: Type) -> Self {
        Self::TypeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }

    pub(crate) fn unsupported(node: impl Into<String>, span: Span) -> Self {
        Self::UnsupportedNode {
            node: node.into(),
            span,
        }
    }

    /// Attach the called function's name to an anonymous host failure.
    pub(crate) fn in_function(self, function: &str) -> Self {
        match self {
            Self::Function { name, message } if name.is_empty() => Self::Function {
                name: function.to_string(),
                message,
            },
            other => other,
        }
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_builtin_misuse_is_fatal() {
        let misuse = EvalError::BuiltinMisuse {
            builtin: "len",
            message: "unsupported argument of type int".into(),
        };
        assert!(misuse.is_fatal());
        assert!(!EvalError::DivideByZero.is_fatal());
        assert!(!EvalError::host("boom").is_fatal());
    }

    #[test]
    fn host_error_gets_function_name() {
        let err = EvalError::host("boom").in_function("Max");
        assert_eq!(err.to_string(), "function Max failed: boom");

        let named = EvalError::Function {
            name: "Inner".into(),
            message: "boom".into(),
        };
        assert_eq!(named.in_function("Outer").to_string(), "function Inner failed: boom");
    }

    #[test]
    fn mismatch_display() {
        let err = EvalError::mismatch("operator '+'", Type::String, Type::Int);
        assert_eq!(
            err.to_string(),
            "type mismatch in operator '+': expected string, found int"
        );
    }
}
