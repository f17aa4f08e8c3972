//! Type coercion: conversions on assignment and numeric promotion for
//! operators.
//!
//! Arithmetic and ordering promote both operands to `f64`, so every
//! arithmetic result is a `float64`. Assigning that result into a typed
//! location converts it back, truncating toward zero for integer targets.

use crate::error::{EvalError, EvalResult};
use crate::value::{MapValue, SliceValue, Type, Value};

// ══════════════════════════════════════════════════════════════════════════════
// Conversion
// ══════════════════════════════════════════════════════════════════════════════

/// Convert `value` to `target`.
///
/// `any` accepts everything unchanged. Numbers convert between all numeric
/// kinds. Slices and maps convert element by element. Records only convert
/// to a record type of the same name.
pub fn convert(value: Value, target: &Type) -> EvalResult<Value> {
    if *target == Type::Any {
        return Ok(value);
    }
    if let Some(num) = value.as_num() {
        if let Some(converted) = num.cast(target) {
            return Ok(converted);
        }
    }
    match (value, target) {
        (Value::Bool(b), Type::Bool) => Ok(Value::Bool(b)),
        (Value::Str(s), Type::String) => Ok(Value::Str(s)),
        (Value::Slice(slice), Type::Slice(elem)) => convert_slice(slice, elem),
        (Value::Map(map), Type::Map(key, value)) => convert_map(map, key, value),
        (Value::Record(record), Type::Record(name)) if record.name == *name => {
            Ok(Value::Record(record))
        }
        (Value::Func(func), Type::Func) => Ok(Value::Func(func)),
        (value @ Value::MapType { .. }, Type::MapType) => Ok(value),
        (value, target) => Err(EvalError::mismatch("conversion", target.clone(), value.ty())),
    }
}

fn convert_slice(slice: SliceValue, elem: &Type) -> EvalResult<Value> {
    if slice.elem == *elem {
        return Ok(Value::Slice(slice));
    }
    let items = slice
        .items
        .into_iter()
        .map(|item| convert(item, elem))
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(Value::Slice(SliceValue::new(elem.clone(), items)))
}

fn convert_map(map: MapValue, key: &Type, value: &Type) -> EvalResult<Value> {
    if map.key == *key && map.value == *value {
        return Ok(Value::Map(map));
    }
    if !key.is_valid_key() {
        return Err(EvalError::InvalidMapKey { ty: key.clone() });
    }
    let old_key = map.key.clone();
    let Some(entries) = map.into_entries() else {
        return Ok(Value::Map(MapValue::nil(key.clone(), value.clone())));
    };
    let mut converted = MapValue::new(key.clone(), value.clone());
    for (k, v) in entries {
        let new_key = converted.key_for(k.to_value(&old_key))?;
        converted.insert(new_key, convert(v, value)?)?;
    }
    Ok(Value::Map(converted))
}

// ══════════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════════

/// Arithmetic operators evaluated on promoted operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Ordering operators evaluated on promoted operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    Greater,
    LessEq,
    GreaterEq,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Less => "<",
            CompareOp::Greater => ">",
            CompareOp::LessEq => "<=",
            CompareOp::GreaterEq => ">=",
        }
    }
}

/// Promote a numeric operand to `f64`.
fn promote(value: &Value, op: &str) -> EvalResult<f64> {
    value
        .as_float()
        .ok_or_else(|| EvalError::mismatch(format!("operator '{op}'"), Type::Float64, value.ty()))
}

/// `+` concatenates two strings; otherwise both operands are promoted.
pub fn add(left: Value, right: Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::Str(mut a), Value::Str(b)) => {
            a.push_str(&b);
            Ok(Value::Str(a))
        }
        (Value::Str(_), other) => Err(EvalError::mismatch("operator '+'", Type::String, other.ty())),
        (left, right) => arith(ArithOp::Add, &left, &right),
    }
}

/// Numeric arithmetic. The result is always a `float64`.
pub fn arith(op: ArithOp, left: &Value, right: &Value) -> EvalResult<Value> {
    let a = promote(left, op.as_str())?;
    let b = promote(right, op.as_str())?;
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 {
                return Err(EvalError::DivideByZero);
            }
            a / b
        }
    };
    Ok(Value::Float64(result))
}

/// Numeric ordering after promotion.
pub fn compare(op: CompareOp, left: &Value, right: &Value) -> EvalResult<bool> {
    let a = promote(left, op.as_str())?;
    let b = promote(right, op.as_str())?;
    Ok(match op {
        CompareOp::Less => a < b,
        CompareOp::Greater => a > b,
        CompareOp::LessEq => a <= b,
        CompareOp::GreaterEq => a >= b,
    })
}

/// Unary `-`, keeping the operand's kind. Integers wrap.
pub fn negate(value: Value) -> EvalResult<Value> {
    Ok(match value {
        Value::Int(n) => Value::Int(n.wrapping_neg()),
        Value::Int8(n) => Value::Int8(n.wrapping_neg()),
        Value::Int16(n) => Value::Int16(n.wrapping_neg()),
        Value::Int32(n) => Value::Int32(n.wrapping_neg()),
        Value::Uint(n) => Value::Uint(n.wrapping_neg()),
        Value::Uint8(n) => Value::Uint8(n.wrapping_neg()),
        Value::Uint16(n) => Value::Uint16(n.wrapping_neg()),
        Value::Uint32(n) => Value::Uint32(n.wrapping_neg()),
        Value::Float32(n) => Value::Float32(-n),
        Value::Float64(n) => Value::Float64(-n),
        other => return Err(EvalError::mismatch("operator '-'", Type::Float64, other.ty())),
    })
}

/// Unary `+` on a numeric operand.
pub fn plus(value: Value) -> EvalResult<Value> {
    if value.as_num().is_some() {
        Ok(value)
    } else {
        Err(EvalError::mismatch("operator '+'", Type::Float64, value.ty()))
    }
}

/// Unary `!` on a bool.
pub fn not(value: Value) -> EvalResult<Value> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(EvalError::mismatch("operator '!'", Type::Bool, other.ty())),
    }
}
