//! Dynamic values and their types.
//!
//! Every value carries its own kind. Containers additionally carry the
//! declared types of their elements, so writes into them can convert the
//! incoming value the same way an assignment to a typed host variable does.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::convert::convert;
use crate::error::{EvalError, EvalResult};
use crate::function::Function;
use crate::host::HostValue;

// ══════════════════════════════════════════════════════════════════════════════
// Types
// ══════════════════════════════════════════════════════════════════════════════

/// The declared type of a binding, field or container element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    /// 64-bit signed integer, written `int` or `int64`.
    Int,
    Int8,
    Int16,
    Int32,
    /// 64-bit unsigned integer, written `uint` or `uint64`.
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Float32,
    Float64,
    String,
    /// Accepts any value without conversion.
    Any,
    Slice(Box<Type>),
    Map(Box<Type>, Box<Type>),
    /// A named record type.
    Record(String),
    Func,
    /// The type of a `map[K]V` expression, as passed to `make`.
    MapType,
}

impl Type {
    /// Resolve a scalar type name.
    pub fn from_name(name: &str) -> Option<Type> {
        let ty = match name {
            "bool" => Type::Bool,
            "int" | "int64" => Type::Int,
            "int8" => Type::Int8,
            "int16" => Type::Int16,
            "int32" => Type::Int32,
            "uint" | "uint64" => Type::Uint,
            "uint8" | "byte" => Type::Uint8,
            "uint16" => Type::Uint16,
            "uint32" => Type::Uint32,
            "float32" => Type::Float32,
            "float64" => Type::Float64,
            "string" => Type::String,
            "any" => Type::Any,
            _ => return None,
        };
        Some(ty)
    }

    /// Resolve an element type name written in rule text. Literals and
    /// `map[K]V` only accept `int`, `string`, `float32` and `float64`.
    pub fn from_literal_name(name: &str) -> EvalResult<Type> {
        match name {
            "int" => Ok(Type::Int),
            "string" => Ok(Type::String),
            "float32" => Ok(Type::Float32),
            "float64" => Ok(Type::Float64),
            _ => Err(EvalError::UnknownType {
                name: name.to_string(),
            }),
        }
    }

    pub fn slice(elem: Type) -> Type {
        Type::Slice(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::Int
                | Type::Int8
                | Type::Int16
                | Type::Int32
                | Type::Uint
                | Type::Uint8
                | Type::Uint16
                | Type::Uint32
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Type::Float32 | Type::Float64)
    }

    /// Map keys are strings or integers.
    pub fn is_valid_key(&self) -> bool {
        self.is_integer() || matches!(self, Type::String)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Int8 => write!(f, "int8"),
            Type::Int16 => write!(f, "int16"),
            Type::Int32 => write!(f, "int32"),
            Type::Uint => write!(f, "uint"),
            Type::Uint8 => write!(f, "uint8"),
            Type::Uint16 => write!(f, "uint16"),
            Type::Uint32 => write!(f, "uint32"),
            Type::Float32 => write!(f, "float32"),
            Type::Float64 => write!(f, "float64"),
            Type::String => write!(f, "string"),
            Type::Any => write!(f, "any"),
            Type::Slice(elem) => write!(f, "[]{elem}"),
            Type::Map(key, value) => write!(f, "map[{key}]{value}"),
            Type::Record(name) => write!(f, "{name}"),
            Type::Func => write!(f, "func"),
            Type::MapType => write!(f, "map type"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Values
// ══════════════════════════════════════════════════════════════════════════════

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Uint(u64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Float32(f32),
    Float64(f64),
    Str(String),
    Slice(SliceValue),
    Map(MapValue),
    Record(RecordValue),
    /// An opaque callable.
    Func(Arc<Function>),
    /// The result of a `map[K]V` expression.
    MapType { key: Type, value: Type },
}

/// A number lifted out of its kind, used for promotion and casts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Num {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

macro_rules! cast_num {
    ($num:expr, $t:ty) => {
        match $num {
            Num::Signed(n) => n as $t,
            Num::Unsigned(n) => n as $t,
            Num::Float(n) => n as $t,
        }
    };
}

impl Num {
    pub(crate) fn as_f64(self) -> f64 {
        cast_num!(self, f64)
    }

    /// Cast into a numeric type: floats truncate toward zero, integers wrap
    /// to the target width.
    pub(crate) fn cast(self, ty: &Type) -> Option<Value> {
        let value = match ty {
            Type::Int => Value::Int(cast_num!(self, i64)),
            Type::Int8 => Value::Int8(cast_num!(self, i8)),
            Type::Int16 => Value::Int16(cast_num!(self, i16)),
            Type::Int32 => Value::Int32(cast_num!(self, i32)),
            Type::Uint => Value::Uint(cast_num!(self, u64)),
            Type::Uint8 => Value::Uint8(cast_num!(self, u8)),
            Type::Uint16 => Value::Uint16(cast_num!(self, u16)),
            Type::Uint32 => Value::Uint32(cast_num!(self, u32)),
            Type::Float32 => Value::Float32(cast_num!(self, f32)),
            Type::Float64 => Value::Float64(cast_num!(self, f64)),
            _ => return None,
        };
        Some(value)
    }
}

impl Value {
    /// The value's own type. `nil` has no type of its own and reports `any`.
    pub fn ty(&self) -> Type {
        match self {
            Value::Nil => Type::Any,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Int8(_) => Type::Int8,
            Value::Int16(_) => Type::Int16,
            Value::Int32(_) => Type::Int32,
            Value::Uint(_) => Type::Uint,
            Value::Uint8(_) => Type::Uint8,
            Value::Uint16(_) => Type::Uint16,
            Value::Uint32(_) => Type::Uint32,
            Value::Float32(_) => Type::Float32,
            Value::Float64(_) => Type::Float64,
            Value::Str(_) => Type::String,
            Value::Slice(s) => Type::slice(s.elem.clone()),
            Value::Map(m) => Type::map(m.key.clone(), m.value.clone()),
            Value::Record(r) => Type::Record(r.name.clone()),
            Value::Func(_) => Type::Func,
            Value::MapType { .. } => Type::MapType,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub(crate) fn as_num(&self) -> Option<Num> {
        let num = match self {
            Value::Int(n) => Num::Signed(*n),
            Value::Int8(n) => Num::Signed(i64::from(*n)),
            Value::Int16(n) => Num::Signed(i64::from(*n)),
            Value::Int32(n) => Num::Signed(i64::from(*n)),
            Value::Uint(n) => Num::Unsigned(*n),
            Value::Uint8(n) => Num::Unsigned(u64::from(*n)),
            Value::Uint16(n) => Num::Unsigned(u64::from(*n)),
            Value::Uint32(n) => Num::Unsigned(u64::from(*n)),
            Value::Float32(n) => Num::Float(f64::from(*n)),
            Value::Float64(n) => Num::Float(*n),
            _ => return None,
        };
        Some(num)
    }

    /// Integer payload of any integer kind. Unsigned values above
    /// `i64::MAX` wrap.
    pub fn as_int(&self) -> Option<i64> {
        match self.as_num()? {
            Num::Signed(n) => Some(n),
            Num::Unsigned(n) => Some(n as i64),
            Num::Float(_) => None,
        }
    }

    /// Any numeric value promoted to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        self.as_num().map(Num::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Kind-sensitive structural equality: `int 1` and `float64 1` differ.
    pub fn deep_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Uint8(a), Value::Uint8(b)) => a == b,
            (Value::Uint16(a), Value::Uint16(b)) => a == b,
            (Value::Uint32(a), Value::Uint32(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => {
                a.elem == b.elem
                    && a.items.len() == b.items.len()
                    && a.items.iter().zip(&b.items).all(|(x, y)| x.deep_equal(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.key == b.key
                    && a.value == b.value
                    && match (&a.entries, &b.entries) {
                        (None, None) => true,
                        (Some(x), Some(y)) => {
                            x.len() == y.len()
                                && x.iter()
                                    .zip(y)
                                    .all(|((ka, va), (kb, vb))| ka == kb && va.deep_equal(vb))
                        }
                        _ => false,
                    }
            }
            (Value::Record(a), Value::Record(b)) => {
                a.name == b.name
                    && a.fields.len() == b.fields.len()
                    && a.fields.iter().zip(&b.fields).all(|((na, fa), (nb, fb))| {
                        na == nb && fa.ty == fb.ty && fa.value.deep_equal(&fb.value)
                    })
            }
            // Functions are never equal
            (Value::Func(_), Value::Func(_)) => false,
            (
                Value::MapType { key: ka, value: va },
                Value::MapType { key: kb, value: vb },
            ) => ka == kb && va == vb,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_equal(other)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float64(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<SliceValue> for Value {
    fn from(s: SliceValue) -> Self {
        Value::Slice(s)
    }
}

impl From<MapValue> for Value {
    fn from(m: MapValue) -> Self {
        Value::Map(m)
    }
}

impl From<RecordValue> for Value {
    fn from(r: RecordValue) -> Self {
        Value::Record(r)
    }
}

/// `%v`-style formatting: slices as `[1 2]`, maps as `map[a:1]`, records as
/// `{Name:x Age:1}`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "<nil>"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Int8(n) => write!(f, "{n}"),
            Value::Int16(n) => write!(f, "{n}"),
            Value::Int32(n) => write!(f, "{n}"),
            Value::Uint(n) => write!(f, "{n}"),
            Value::Uint8(n) => write!(f, "{n}"),
            Value::Uint16(n) => write!(f, "{n}"),
            Value::Uint32(n) => write!(f, "{n}"),
            Value::Float32(n) => write!(f, "{n}"),
            Value::Float64(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Slice(s) => {
                write!(f, "[")?;
                for (i, item) in s.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "map[")?;
                for (i, (key, value)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}:{value}", m.key_value(key))?;
                }
                write!(f, "]")
            }
            Value::Record(r) => {
                write!(f, "{{")?;
                for (i, (name, field)) in r.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{name}:{}", field.value)?;
                }
                write!(f, "}}")
            }
            Value::Func(func) => write!(f, "func {}", func.name()),
            Value::MapType { key, value } => write!(f, "map[{key}]{value}"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Slices
// ══════════════════════════════════════════════════════════════════════════════

/// A fixed-length sequence of values of one declared element type.
#[derive(Debug, Clone)]
pub struct SliceValue {
    pub elem: Type,
    pub items: Vec<Value>,
}

impl SliceValue {
    pub fn new(elem: Type, items: Vec<Value>) -> Self {
        Self { elem, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Maps
// ══════════════════════════════════════════════════════════════════════════════

/// A map key. Every integer kind folds onto a signed or unsigned 64-bit key;
/// the map's declared key type restores the original kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Int(i64),
    Uint(u64),
    Str(String),
}

impl MapKey {
    /// Key for a string or integer value.
    pub fn from_value(value: &Value) -> Option<MapKey> {
        match value {
            Value::Str(s) => Some(MapKey::Str(s.clone())),
            other => match other.as_num()? {
                Num::Signed(n) => Some(MapKey::Int(n)),
                Num::Unsigned(n) => Some(MapKey::Uint(n)),
                Num::Float(_) => None,
            },
        }
    }

    /// Rebuild the key value with the given key type.
    pub fn to_value(&self, ty: &Type) -> Value {
        let num = match self {
            MapKey::Str(s) => return Value::Str(s.clone()),
            MapKey::Int(n) => Num::Signed(*n),
            MapKey::Uint(n) => Num::Unsigned(*n),
        };
        num.cast(ty).unwrap_or(Value::Int(cast_num!(num, i64)))
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Int(n) => write!(f, "{n}"),
            MapKey::Uint(n) => write!(f, "{n}"),
            MapKey::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// A map with declared key and value types. A nil map reads as empty and
/// rejects writes.
#[derive(Debug, Clone)]
pub struct MapValue {
    pub key: Type,
    pub value: Type,
    entries: Option<BTreeMap<MapKey, Value>>,
}

impl MapValue {
    /// An empty, writable map.
    pub fn new(key: Type, value: Type) -> Self {
        Self {
            key,
            value,
            entries: Some(BTreeMap::new()),
        }
    }

    /// A writable map over already converted entries.
    pub(crate) fn from_entries(key: Type, value: Type, entries: BTreeMap<MapKey, Value>) -> Self {
        Self {
            key,
            value,
            entries: Some(entries),
        }
    }

    /// A nil map: readable, not writable until replaced by `make`.
    pub fn nil(key: Type, value: Type) -> Self {
        Self {
            key,
            value,
            entries: None,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.entries.is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.as_ref()?.get(key)
    }

    /// Insert an already converted entry.
    pub fn insert(&mut self, key: MapKey, value: Value) -> EvalResult<()> {
        match &mut self.entries {
            Some(entries) => {
                entries.insert(key, value);
                Ok(())
            }
            None => Err(EvalError::NilMap),
        }
    }

    /// Convert `key` to the declared key type and build its map key.
    pub fn key_for(&self, key: Value) -> EvalResult<MapKey> {
        let converted = convert(key, &self.key)?;
        MapKey::from_value(&converted).ok_or_else(|| EvalError::InvalidMapKey {
            ty: self.key.clone(),
        })
    }

    /// The key as a value of the declared key type.
    pub fn key_value(&self, key: &MapKey) -> Value {
        key.to_value(&self.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter().flatten()
    }

    pub(crate) fn into_entries(self) -> Option<BTreeMap<MapKey, Value>> {
        self.entries
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Records
// ══════════════════════════════════════════════════════════════════════════════

/// A record field: its declared type and current value.
#[derive(Debug, Clone)]
pub struct Field {
    pub ty: Type,
    pub value: Value,
}

/// A named record with typed fields.
///
/// Host structs build one in [`HostValue::to_value`] and take it apart again
/// in [`HostValue::from_value`]:
///
/// ```ignore
/// RecordValue::new("Person")
///     .with_field("Name", &self.name)
///     .with_field("Age", &self.age)
/// ```
#[derive(Debug, Clone)]
pub struct RecordValue {
    pub name: String,
    fields: BTreeMap<String, Field>,
}

impl RecordValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field typed after the host value.
    pub fn with_field<T: HostValue>(self, name: impl Into<String>, value: &T) -> Self {
        self.with_value(name, T::declared_type(), value.to_value())
    }

    /// Add a field with an explicit declared type.
    pub fn with_value(mut self, name: impl Into<String>, ty: Type, value: Value) -> Self {
        self.fields.insert(name.into(), Field { ty, value });
        self
    }

    /// Unpack `value` as a record named `name`.
    pub fn unpack(value: Value, name: &str) -> EvalResult<RecordValue> {
        match value {
            Value::Record(record) if record.name == name => Ok(record),
            other => Err(EvalError::mismatch(
                "record conversion",
                Type::Record(name.to_string()),
                other.ty(),
            )),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).map(|f| &f.value)
    }

    pub fn field_type(&self, field: &str) -> Option<&Type> {
        self.fields.get(field).map(|f| &f.ty)
    }

    /// Type-converting write into an existing field.
    pub fn set(&mut self, field: &str, value: Value) -> EvalResult<()> {
        let Some(slot) = self.fields.get_mut(field) else {
            return Err(self.missing(field));
        };
        slot.value = convert(value, &slot.ty)?;
        Ok(())
    }

    /// Remove a field and convert it into a host value.
    pub fn take<T: HostValue>(&mut self, field: &str) -> EvalResult<T> {
        match self.fields.remove(field) {
            Some(slot) => T::from_value(slot.value),
            None => Err(self.missing(field)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    fn missing(&self, field: &str) -> EvalError {
        EvalError::FieldNotFound {
            record: self.name.clone(),
            field: field.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(Type::from_name("int64"), Some(Type::Int));
        assert_eq!(Type::from_name("byte"), Some(Type::Uint8));
        assert_eq!(Type::from_name("complex128"), None);
        assert_eq!(Type::map(Type::String, Type::slice(Type::Int)).to_string(), "map[string][]int");
    }

    #[test]
    fn literal_names_are_restricted() {
        assert_eq!(Type::from_literal_name("float32").ok(), Some(Type::Float32));
        assert!(matches!(
            Type::from_literal_name("bool"),
            Err(EvalError::UnknownType { name }) if name == "bool"
        ));
    }

    #[test]
    fn deep_equal_is_kind_sensitive() {
        assert!(Value::Int(1).deep_equal(&Value::Int(1)));
        assert!(!Value::Int(1).deep_equal(&Value::Float64(1.0)));
        assert!(!Value::Int(1).deep_equal(&Value::Int32(1)));
        let a = SliceValue::new(Type::Int, vec![Value::Int(1), Value::Int(2)]);
        let b = SliceValue::new(Type::Int, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(Value::Slice(a), Value::Slice(b));
    }

    #[test]
    fn nil_and_empty_maps_differ() {
        let empty = Value::Map(MapValue::new(Type::String, Type::Int));
        let nil = Value::Map(MapValue::nil(Type::String, Type::Int));
        assert_ne!(empty, nil);
    }

    #[test]
    fn nil_map_rejects_writes() {
        let mut map = MapValue::nil(Type::String, Type::Int);
        assert_eq!(map.len(), 0);
        assert!(matches!(
            map.insert(MapKey::Str("a".into()), Value::Int(1)),
            Err(EvalError::NilMap)
        ));
    }

    #[test]
    fn map_keys_keep_their_kind() {
        let map = MapValue::new(Type::Uint8, Type::Int);
        let key = map.key_for(Value::Int(7)).unwrap();
        assert_eq!(key, MapKey::Uint(7));
        assert!(matches!(map.key_value(&key), Value::Uint8(7)));
    }

    #[test]
    fn display_matches_go_verbs() {
        let slice = Value::Slice(SliceValue::new(Type::Int, vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(slice.to_string(), "[1 2]");
        assert_eq!(Value::Float64(8.0).to_string(), "8");
        assert_eq!(Value::Nil.to_string(), "<nil>");

        let mut map = MapValue::new(Type::String, Type::Int);
        map.insert(MapKey::Str("b".into()), Value::Int(2)).unwrap();
        map.insert(MapKey::Str("a".into()), Value::Int(1)).unwrap();
        assert_eq!(Value::Map(map).to_string(), "map[a:1 b:2]");
    }

    #[test]
    fn record_set_converts_and_checks_fields() {
        let mut record = RecordValue::new("Person").with_value("Age", Type::Int, Value::Int(1));
        record.set("Age", Value::Float64(20.7)).unwrap();
        assert!(matches!(record.get("Age"), Some(Value::Int(20))));
        assert!(matches!(
            record.set("Name", Value::from("x")),
            Err(EvalError::FieldNotFound { record, field }) if record == "Person" && field == "Name"
        ));
    }
}
