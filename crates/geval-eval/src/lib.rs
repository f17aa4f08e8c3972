//! geval tree-walking evaluator.
//!
//! Executes a parsed rule body against host data. Values are dynamically
//! typed; host bindings and container elements carry declared types, and
//! every write converts to the declared type of its target.

mod builtin;
pub mod container;
mod context;
pub mod convert;
mod error;
mod evaluator;
mod function;
mod host;
mod value;

pub use context::DataContext;
pub use convert::convert;
pub use error::{EvalError, EvalResult};
pub use evaluator::{EvalOptions, Evaluator};
pub use function::{Function, FunctionContext, NativeFn};
pub use host::{Bindable, HostKey, HostValue, Reference};
pub use value::{Field, MapKey, MapValue, RecordValue, SliceValue, Type, Value};
