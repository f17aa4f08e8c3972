//! Reads and writes into maps, slices and records.
//!
//! Containers have value semantics. A nested write such as
//! `d["sub"]["k"] = v` reads each level, replaces the innermost element and
//! rebuilds every level on the way back up; the caller stores the rebuilt
//! root through its binding.

use crate::convert::convert;
use crate::error::{EvalError, EvalResult};
use crate::value::{Type, Value};

/// One step of an access path.
#[derive(Debug, Clone)]
pub enum PathStep {
    /// `[index]`
    Index(Value),
    /// `.field`
    Field(String),
}

// ══════════════════════════════════════════════════════════════════════════════
// Reads
// ══════════════════════════════════════════════════════════════════════════════

/// `container[index]`
pub fn index(container: &Value, index: Value) -> EvalResult<Value> {
    match container {
        Value::Map(map) => {
            let key = map.key_for(index)?;
            map.get(&key).cloned().ok_or_else(|| EvalError::KeyNotFound {
                key: key.to_string(),
            })
        }
        Value::Slice(slice) => {
            let i = slice_index(&index, slice.len())?;
            Ok(slice.items[i].clone())
        }
        other => Err(EvalError::InvalidOperation {
            operation: "index",
            found: other.ty(),
        }),
    }
}

/// `container.name`
pub fn field(container: &Value, name: &str) -> EvalResult<Value> {
    match container {
        Value::Record(record) => record.get(name).cloned().ok_or_else(|| EvalError::FieldNotFound {
            record: record.name.clone(),
            field: name.to_string(),
        }),
        other => Err(EvalError::InvalidOperation {
            operation: "select a field of",
            found: other.ty(),
        }),
    }
}

pub fn read_step(container: &Value, step: &PathStep) -> EvalResult<Value> {
    match step {
        PathStep::Index(i) => index(container, i.clone()),
        PathStep::Field(name) => field(container, name),
    }
}

/// Resolve a slice index: any numeric kind, converted to `int`, within
/// bounds. Computed indexes arrive as `float64` and truncate.
fn slice_index(index: &Value, len: usize) -> EvalResult<usize> {
    if !index.ty().is_numeric() {
        return Err(EvalError::mismatch("slice index", Type::Int, index.ty()));
    }
    let Some(i) = convert(index.clone(), &Type::Int)?.as_int() else {
        return Err(EvalError::mismatch("slice index", Type::Int, index.ty()));
    };
    match usize::try_from(i) {
        Ok(u) if u < len => Ok(u),
        _ => Err(EvalError::IndexOutOfRange { index: i, len }),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Writes
// ══════════════════════════════════════════════════════════════════════════════

/// `container[index] = value`, converting to the element type.
pub fn set_index(container: &mut Value, index: Value, value: Value) -> EvalResult<()> {
    match container {
        Value::Map(map) => {
            if map.is_nil() {
                return Err(EvalError::NilMap);
            }
            let key = map.key_for(index)?;
            let value = convert(value, &map.value)?;
            map.insert(key, value)
        }
        Value::Slice(slice) => {
            let i = slice_index(&index, slice.len())?;
            slice.items[i] = convert(value, &slice.elem)?;
            Ok(())
        }
        other => Err(EvalError::InvalidOperation {
            operation: "index",
            found: other.ty(),
        }),
    }
}

/// `container.name = value`, converting to the field type.
pub fn set_field(container: &mut Value, name: &str, value: Value) -> EvalResult<()> {
    match container {
        Value::Record(record) => record.set(name, value),
        other => Err(EvalError::InvalidOperation {
            operation: "select a field of",
            found: other.ty(),
        }),
    }
}

pub fn write_step(container: &mut Value, step: &PathStep, value: Value) -> EvalResult<()> {
    match step {
        PathStep::Index(i) => set_index(container, i.clone(), value),
        PathStep::Field(name) => set_field(container, name, value),
    }
}

/// Follow `steps` from `root`, replace the element at the end with `value`
/// and return the rebuilt root.
pub fn write_path(root: Value, steps: &[PathStep], value: Value) -> EvalResult<Value> {
    let Some((step, rest)) = steps.split_first() else {
        return Ok(value);
    };
    let mut root = root;
    let child = if rest.is_empty() {
        value
    } else {
        write_path(read_step(&root, step)?, rest, value)?
    };
    write_step(&mut root, step, child)?;
    Ok(root)
}

/// Follow `steps` from `root` and return the element at the end.
pub fn read_path(root: &Value, steps: &[PathStep]) -> EvalResult<Value> {
    let mut current = root.clone();
    for step in steps {
        current = read_step(&current, step)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{MapKey, MapValue, RecordValue, SliceValue};

    fn string_any_map() -> MapValue {
        MapValue::new(Type::String, Type::Any)
    }

    #[test]
    fn missing_key_is_not_found() {
        let map = Value::Map(MapValue::new(Type::String, Type::Int));
        assert!(matches!(
            index(&map, Value::from("x")),
            Err(EvalError::KeyNotFound { key }) if key == "\"x\""
        ));
    }

    #[test]
    fn slice_bounds_are_checked() {
        let mut slice = Value::Slice(SliceValue::new(Type::Int, vec![Value::Int(1)]));
        assert!(matches!(
            index(&slice, Value::Int(1)),
            Err(EvalError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            index(&slice, Value::Int(-1)),
            Err(EvalError::IndexOutOfRange { index: -1, .. })
        ));
        set_index(&mut slice, Value::Uint8(0), Value::Float64(9.5)).unwrap();
        assert_eq!(index(&slice, Value::Int(0)).unwrap(), Value::Int(9));
    }

    #[test]
    fn computed_slice_index_truncates() {
        let mut slice = Value::Slice(SliceValue::new(Type::Int, vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(index(&slice, Value::Float64(1.0)).unwrap(), Value::Int(2));
        assert_eq!(index(&slice, Value::Float64(0.9)).unwrap(), Value::Int(1));
        set_index(&mut slice, Value::Float64(1.0), Value::Int(7)).unwrap();
        assert_eq!(index(&slice, Value::Int(1)).unwrap(), Value::Int(7));
        assert!(matches!(
            index(&slice, Value::Float64(2.0)),
            Err(EvalError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            index(&slice, Value::from("0")),
            Err(EvalError::TypeMismatch { .. })
        ));
        assert!(matches!(
            index(&slice, Value::Bool(true)),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn write_into_nil_map_fails() {
        let mut map = Value::Map(MapValue::nil(Type::String, Type::Int));
        assert!(matches!(
            set_index(&mut map, Value::from("a"), Value::Int(1)),
            Err(EvalError::NilMap)
        ));
    }

    #[test]
    fn map_write_converts_value() {
        let mut map = Value::Map(MapValue::new(Type::String, Type::Int));
        set_index(&mut map, Value::from("a"), Value::Float64(2.9)).unwrap();
        assert_eq!(index(&map, Value::from("a")).unwrap(), Value::Int(2));
    }

    #[test]
    fn nested_write_rebuilds_path() {
        let mut sub = string_any_map();
        sub.insert(MapKey::Str("int".into()), Value::Int(0)).unwrap();
        let mut root = string_any_map();
        root.insert(MapKey::Str("sub".into()), Value::Map(sub)).unwrap();

        let steps = [
            PathStep::Index(Value::from("sub")),
            PathStep::Index(Value::from("int")),
        ];
        let rebuilt = write_path(Value::Map(root), &steps, Value::Int(1)).unwrap();
        assert_eq!(read_path(&rebuilt, &steps).unwrap(), Value::Int(1));
    }

    #[test]
    fn nested_record_write() {
        let position = RecordValue::new("Position").with_value("Name", Type::String, Value::from("Dev"));
        let person = RecordValue::new("Person").with_value(
            "Pro",
            Type::Record("Position".into()),
            Value::Record(position),
        );
        let steps = [PathStep::Field("Pro".into()), PathStep::Field("Name".into())];
        let rebuilt = write_path(Value::Record(person), &steps, Value::from("PM")).unwrap();
        assert_eq!(read_path(&rebuilt, &steps).unwrap(), Value::from("PM"));
    }

    #[test]
    fn unknown_field_fails() {
        let person = Value::Record(RecordValue::new("Person"));
        assert!(matches!(
            field(&person, "Age"),
            Err(EvalError::FieldNotFound { field, .. }) if field == "Age"
        ));
        assert!(matches!(
            field(&Value::Int(1), "Age"),
            Err(EvalError::InvalidOperation { .. })
        ));
    }
}
