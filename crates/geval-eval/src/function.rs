//! Host functions and the function registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::builtin;
use crate::convert::convert;
use crate::error::{EvalError, EvalResult};
use crate::host::HostValue;
use crate::value::{Type, Value};

/// Native function body: converted arguments in, results out.
pub type NativeFn = dyn Fn(Vec<Value>) -> EvalResult<Vec<Value>> + Send + Sync;

/// A callable registered with a [`FunctionContext`].
///
/// Arguments are converted to the declared parameter types before the body
/// runs. A variadic function converts every trailing argument to the tail
/// type.
#[derive(Clone)]
pub struct Function {
    name: String,
    params: Vec<Type>,
    variadic: Option<Type>,
    body: Arc<NativeFn>,
}

impl Function {
    pub fn new(
        params: Vec<Type>,
        body: impl Fn(Vec<Value>) -> EvalResult<Vec<Value>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: String::new(),
            params,
            variadic: None,
            body: Arc::new(body),
        }
    }

    /// A function taking `params` followed by any number of `tail` arguments.
    pub fn variadic(
        params: Vec<Type>,
        tail: Type,
        body: impl Fn(Vec<Value>) -> EvalResult<Vec<Value>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            variadic: Some(tail),
            ..Self::new(params, body)
        }
    }

    /// Wrap a one-argument Rust function.
    pub fn from_fn1<A, R, F>(f: F) -> Self
    where
        A: HostValue,
        R: HostValue,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self::new(vec![A::declared_type()], move |mut args| {
            let a = A::from_value(take_arg(&mut args)?)?;
            Ok(vec![f(a).to_value()])
        })
    }

    /// Wrap a two-argument Rust function.
    pub fn from_fn2<A, B, R, F>(f: F) -> Self
    where
        A: HostValue,
        B: HostValue,
        R: HostValue,
        F: Fn(A, B) -> R + Send + Sync + 'static,
    {
        Self::new(vec![A::declared_type(), B::declared_type()], move |mut args| {
            let b = B::from_value(take_arg(&mut args)?)?;
            let a = A::from_value(take_arg(&mut args)?)?;
            Ok(vec![f(a, b).to_value()])
        })
    }

    /// The name the function was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Type] {
        &self.params
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    /// Check arity, convert the arguments and run the body.
    pub fn call(&self, args: Vec<Value>) -> EvalResult<Vec<Value>> {
        let arity_ok = match self.variadic {
            Some(_) => args.len() >= self.params.len(),
            None => args.len() == self.params.len(),
        };
        if !arity_ok {
            return Err(EvalError::ArityMismatch {
                context: format!("call to {}", self.name),
                expected: self.params.len(),
                found: args.len(),
            });
        }
        let converted = args
            .into_iter()
            .enumerate()
            .map(|(i, arg)| match (self.params.get(i), &self.variadic) {
                (Some(ty), _) | (None, Some(ty)) => convert(arg, ty),
                (None, None) => Ok(arg),
            })
            .collect::<EvalResult<Vec<_>>>()?;
        (self.body)(converted).map_err(|e| e.in_function(&self.name))
    }
}

/// Pop the last remaining argument; arity was checked by [`Function::call`].
fn take_arg(args: &mut Vec<Value>) -> EvalResult<Value> {
    args.pop().ok_or_else(|| EvalError::host("missing argument"))
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("variadic", &self.variadic)
            .finish_non_exhaustive()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Registry
// ══════════════════════════════════════════════════════════════════════════════

/// Named functions callable from rules.
///
/// `make` and `len` are registered up front. Method-style calls look up
/// `"<Record>.<name>"` before the bare name, so record methods register
/// under their qualified name.
#[derive(Debug, Clone)]
pub struct FunctionContext {
    functions: BTreeMap<String, Arc<Function>>,
}

impl FunctionContext {
    pub fn new() -> Self {
        let mut ctx = Self {
            functions: BTreeMap::new(),
        };
        for (name, function) in builtin::builtins() {
            ctx.functions.insert(name.to_string(), Arc::new(function.named(name)));
        }
        ctx
    }

    /// Register `function` under `name`. Names are unique.
    pub fn bind(&mut self, name: impl Into<String>, function: Function) -> EvalResult<()> {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(EvalError::DuplicateFunction { name });
        }
        tracing::debug!(%name, params = function.params.len(), "function registered");
        let function = function.named(&name);
        self.functions.insert(name, Arc::new(function));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> EvalResult<Arc<Function>> {
        self.get(name).ok_or_else(|| EvalError::UnknownFunction {
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<Function>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl Default for FunctionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Function {
    fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}
