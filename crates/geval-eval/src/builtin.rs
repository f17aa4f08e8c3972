//! Built-in functions registered in every [`FunctionContext`].
//!
//! [`FunctionContext`]: crate::FunctionContext

use crate::error::{EvalError, EvalResult};
use crate::function::Function;
use crate::value::{MapValue, Type, Value};

pub(crate) fn builtins() -> Vec<(&'static str, Function)> {
    vec![
        ("make", Function::new(vec![Type::MapType], make)),
        ("len", Function::new(vec![Type::Any], len)),
    ]
}

/// `make(map[K]V)`: a fresh, empty, writable map.
fn make(args: Vec<Value>) -> EvalResult<Vec<Value>> {
    match args.into_iter().next() {
        Some(Value::MapType { key, value }) => Ok(vec![Value::Map(MapValue::new(key, value))]),
        other => Err(misuse("make", other.unwrap_or(Value::Nil).ty())),
    }
}

/// `len(x)`: element count of a map or slice, byte length of a string.
fn len(args: Vec<Value>) -> EvalResult<Vec<Value>> {
    let n = match args.into_iter().next() {
        Some(Value::Map(map)) => map.len(),
        Some(Value::Slice(slice)) => slice.len(),
        Some(Value::Str(s)) => s.len(),
        other => return Err(misuse("len", other.unwrap_or(Value::Nil).ty())),
    };
    Ok(vec![Value::Int(n as i64)])
}

fn misuse(builtin: &'static str, found: Type) -> EvalError {
    EvalError::BuiltinMisuse {
        builtin,
        message: format!("invalid argument of type {found}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SliceValue;

    #[test]
    fn make_builds_empty_map() {
        let out = make(vec![Value::MapType {
            key: Type::String,
            value: Type::Int,
        }])
        .unwrap();
        let [Value::Map(map)] = out.as_slice() else {
            panic!("expected one map");
        };
        assert!(!map.is_nil());
        assert_eq!(map.len(), 0);
        assert_eq!(map.value, Type::Int);
    }

    #[test]
    fn len_counts_elements() {
        let slice = SliceValue::new(Type::Int, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(len(vec![Value::Slice(slice)]).unwrap(), vec![Value::Int(2)]);
        assert_eq!(len(vec![Value::from("Hello world")]).unwrap(), vec![Value::Int(11)]);
        let nil_map = MapValue::nil(Type::String, Type::Int);
        assert_eq!(len(vec![Value::Map(nil_map)]).unwrap(), vec![Value::Int(0)]);
    }

    #[test]
    fn len_of_number_is_fatal_misuse() {
        let err = len(vec![Value::Int(5)]).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "invalid use of built-in len: invalid argument of type int");
    }
}
