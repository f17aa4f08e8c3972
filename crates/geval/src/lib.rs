//! geval: an embeddable rule engine.
//!
//! ```text
//! rule text → Lexer → Parser → RuleNode ──eval──▶ DataContext (host bindings)
//!                                  ▲
//!                          FunctionContext
//! ```
//!
//! A [`RuleNode`] is parsed once and evaluated any number of times. Host data
//! is bound into a [`DataContext`] through shared cells, so writes made by a
//! rule are visible to the caller as soon as evaluation returns. [`Engine`]
//! bundles both contexts with a priority-ordered rule set.

mod engine;
mod rule;

pub use engine::Engine;
pub use rule::RuleNode;

pub use geval_eval::{
    container, convert, Bindable, DataContext, EvalError, EvalOptions, EvalResult, Evaluator,
    Field, Function, FunctionContext, HostKey, HostValue, MapKey, MapValue, NativeFn,
    RecordValue, Reference, SliceValue, Type, Value,
};
pub use geval_types::{ParseError, ParseErrors, SourceFile, Span};
