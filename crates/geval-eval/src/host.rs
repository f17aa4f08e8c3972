//! Host interop: moving Rust values in and out of the evaluator.
//!
//! [`HostValue`] gives a Rust type a declared [`Type`] and converts it to
//! and from [`Value`]. [`Reference`] is a mutable external location a rule
//! can read and write; `Rc<RefCell<T>>` is the stock implementation.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::rc::Rc;

use crate::convert::convert;
use crate::error::{EvalError, EvalResult};
use crate::value::{MapKey, MapValue, Num, SliceValue, Type, Value};

// ══════════════════════════════════════════════════════════════════════════════
// HostValue
// ══════════════════════════════════════════════════════════════════════════════

/// A Rust type with a rule-visible representation.
pub trait HostValue: Sized {
    /// The type writes into this host type are converted to.
    fn declared_type() -> Type;

    fn to_value(&self) -> Value;

    /// Convert back. The value is first converted to [`Self::declared_type`].
    fn from_value(value: Value) -> EvalResult<Self>;
}

/// A host type usable as a map key.
pub trait HostKey: HostValue {
    fn to_key(&self) -> MapKey;
}

fn wrong_kind(expected: Type, found: &Value) -> EvalError {
    EvalError::mismatch("host conversion", expected, found.ty())
}

macro_rules! host_scalar {
    ($($t:ty => $variant:ident as $ty:ident),* $(,)?) => {
        $(
            impl HostValue for $t {
                fn declared_type() -> Type {
                    Type::$ty
                }

                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }

                fn from_value(value: Value) -> EvalResult<Self> {
                    match convert(value, &Type::$ty)? {
                        Value::$variant(n) => Ok(n),
                        other => Err(wrong_kind(Type::$ty, &other)),
                    }
                }
            }
        )*
    };
}

host_scalar! {
    i64 => Int as Int,
    i32 => Int32 as Int32,
    i16 => Int16 as Int16,
    i8 => Int8 as Int8,
    u64 => Uint as Uint,
    u32 => Uint32 as Uint32,
    u16 => Uint16 as Uint16,
    u8 => Uint8 as Uint8,
    f64 => Float64 as Float64,
    f32 => Float32 as Float32,
    bool => Bool as Bool,
}

impl HostValue for isize {
    fn declared_type() -> Type {
        Type::Int
    }

    fn to_value(&self) -> Value {
        Value::Int(*self as i64)
    }

    fn from_value(value: Value) -> EvalResult<Self> {
        i64::from_value(value).map(|n| n as isize)
    }
}

impl HostValue for usize {
    fn declared_type() -> Type {
        Type::Uint
    }

    fn to_value(&self) -> Value {
        Value::Uint(*self as u64)
    }

    fn from_value(value: Value) -> EvalResult<Self> {
        u64::from_value(value).map(|n| n as usize)
    }
}

impl HostValue for String {
    fn declared_type() -> Type {
        Type::String
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> EvalResult<Self> {
        match convert(value, &Type::String)? {
            Value::Str(s) => Ok(s),
            other => Err(wrong_kind(Type::String, &other)),
        }
    }
}

impl HostValue for Value {
    fn declared_type() -> Type {
        Type::Any
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> EvalResult<Self> {
        Ok(value)
    }
}

macro_rules! host_key {
    ($($t:ty => $key:ident as $wide:ty),* $(,)?) => {
        $(
            impl HostKey for $t {
                fn to_key(&self) -> MapKey {
                    MapKey::$key(*self as $wide)
                }
            }
        )*
    };
}

host_key! {
    i64 => Int as i64,
    i32 => Int as i64,
    i16 => Int as i64,
    i8 => Int as i64,
    isize => Int as i64,
    u64 => Uint as u64,
    u32 => Uint as u64,
    u16 => Uint as u64,
    u8 => Uint as u64,
    usize => Uint as u64,
}

impl HostKey for String {
    fn to_key(&self) -> MapKey {
        MapKey::Str(self.clone())
    }
}

// ── Containers ──

impl<T: HostValue> HostValue for Vec<T> {
    fn declared_type() -> Type {
        Type::slice(T::declared_type())
    }

    fn to_value(&self) -> Value {
        let items = self.iter().map(HostValue::to_value).collect();
        Value::Slice(SliceValue::new(T::declared_type(), items))
    }

    fn from_value(value: Value) -> EvalResult<Self> {
        match convert(value, &Self::declared_type())? {
            Value::Slice(slice) => slice.items.into_iter().map(T::from_value).collect(),
            other => Err(wrong_kind(Self::declared_type(), &other)),
        }
    }
}

fn map_to_value<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> MapValue
where
    K: HostKey + 'a,
    V: HostValue + 'a,
{
    MapValue::from_entries(
        K::declared_type(),
        V::declared_type(),
        entries
            .map(|(key, value)| (key.to_key(), value.to_value()))
            .collect(),
    )
}

/// Convert to `map[K]V` and unpack the entries. A nil map yields `None`.
fn map_entries<K: HostKey, V: HostValue>(value: Value) -> EvalResult<Option<Vec<(K, V)>>> {
    let ty = Type::map(K::declared_type(), V::declared_type());
    let map = match convert(value, &ty)? {
        Value::Map(map) => map,
        other => return Err(wrong_kind(ty, &other)),
    };
    if map.is_nil() {
        return Ok(None);
    }
    map.iter()
        .map(|(key, value)| -> EvalResult<(K, V)> {
            Ok((K::from_value(map.key_value(key))?, V::from_value(value.clone())?))
        })
        .collect::<EvalResult<Vec<_>>>()
        .map(Some)
}

impl<K: HostKey + Ord, V: HostValue> HostValue for BTreeMap<K, V> {
    fn declared_type() -> Type {
        Type::map(K::declared_type(), V::declared_type())
    }

    fn to_value(&self) -> Value {
        Value::Map(map_to_value(self.iter()))
    }

    fn from_value(value: Value) -> EvalResult<Self> {
        Ok(map_entries::<K, V>(value)?.unwrap_or_default().into_iter().collect())
    }
}

impl<K: HostKey + Eq + Hash, V: HostValue> HostValue for HashMap<K, V> {
    fn declared_type() -> Type {
        Type::map(K::declared_type(), V::declared_type())
    }

    fn to_value(&self) -> Value {
        Value::Map(map_to_value(self.iter()))
    }

    fn from_value(value: Value) -> EvalResult<Self> {
        Ok(map_entries::<K, V>(value)?.unwrap_or_default().into_iter().collect())
    }
}

/// `None` is a nil map: rules must `make` it before writing.
impl<K: HostKey + Eq + Hash, V: HostValue> HostValue for Option<HashMap<K, V>> {
    fn declared_type() -> Type {
        Type::map(K::declared_type(), V::declared_type())
    }

    fn to_value(&self) -> Value {
        match self {
            Some(map) => map.to_value(),
            None => Value::Map(MapValue::nil(K::declared_type(), V::declared_type())),
        }
    }

    fn from_value(value: Value) -> EvalResult<Self> {
        Ok(map_entries::<K, V>(value)?.map(|entries| entries.into_iter().collect()))
    }
}

// ── JSON ──

/// JSON documents bind as `any`: objects become `map[string]any`, arrays
/// become `[]any`.
impl HostValue for serde_json::Value {
    fn declared_type() -> Type {
        Type::Any
    }

    fn to_value(&self) -> Value {
        use serde_json::Value as Json;
        match self {
            Json::Null => Value::Nil,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    Value::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::Slice(SliceValue::new(
                Type::Any,
                items.iter().map(HostValue::to_value).collect(),
            )),
            Json::Object(fields) => {
                let entries = fields
                    .iter()
                    .map(|(key, value)| (MapKey::Str(key.clone()), value.to_value()))
                    .collect();
                Value::Map(MapValue::from_entries(Type::String, Type::Any, entries))
            }
        }
    }

    fn from_value(value: Value) -> EvalResult<Self> {
        use serde_json::Value as Json;
        let json = match value {
            Value::Nil => Json::Null,
            Value::Bool(b) => Json::Bool(b),
            Value::Str(s) => Json::String(s),
            Value::Slice(slice) => Json::Array(
                slice
                    .items
                    .into_iter()
                    .map(Self::from_value)
                    .collect::<EvalResult<_>>()?,
            ),
            Value::Map(map) if map.is_nil() => Json::Null,
            Value::Map(map) => {
                let mut object = serde_json::Map::new();
                for (key, value) in map.iter() {
                    let name = match key {
                        MapKey::Str(s) => s.clone(),
                        other => other.to_string(),
                    };
                    object.insert(name, Self::from_value(value.clone())?);
                }
                Json::Object(object)
            }
            Value::Record(record) => {
                let mut object = serde_json::Map::new();
                for (name, field) in record.fields() {
                    object.insert(name.to_string(), Self::from_value(field.value.clone())?);
                }
                Json::Object(object)
            }
            other => match other.as_num() {
                Some(Num::Signed(n)) => Json::from(n),
                Some(Num::Unsigned(n)) => Json::from(n),
                Some(Num::Float(f)) => serde_json::Number::from_f64(f).map_or(Json::Null, Json::Number),
                None => return Err(EvalError::mismatch("JSON conversion", Type::Any, other.ty())),
            },
        };
        Ok(json)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// References
// ══════════════════════════════════════════════════════════════════════════════

/// A mutable external location bound into a data context.
pub trait Reference {
    fn declared_type(&self) -> Type;

    fn load(&self) -> Value;

    /// Store a value already converted to [`Reference::declared_type`].
    fn store(&self, value: Value) -> EvalResult<()>;
}

impl<T: HostValue> Reference for Rc<RefCell<T>> {
    fn declared_type(&self) -> Type {
        T::declared_type()
    }

    fn load(&self) -> Value {
        self.borrow().to_value()
    }

    fn store(&self, value: Value) -> EvalResult<()> {
        let host = T::from_value(value)?;
        *self.borrow_mut() = host;
        Ok(())
    }
}

/// Something that can be handed to [`DataContext::bind`].
///
/// Only references bind; a plain value is rejected because writes to it
/// could never reach the host.
///
/// [`DataContext::bind`]: crate::DataContext::bind
pub enum Bindable {
    Ref(Box<dyn Reference>),
    Value(Value),
}

impl<T: HostValue + 'static> From<Rc<RefCell<T>>> for Bindable {
    fn from(reference: Rc<RefCell<T>>) -> Self {
        Bindable::Ref(Box::new(reference))
    }
}

impl From<Value> for Bindable {
    fn from(value: Value) -> Self {
        Bindable::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip_through_conversion() {
        assert_eq!(i64::from_value(Value::Float64(2.9)).unwrap(), 2);
        assert_eq!(u8::from_value(Value::Int(7)).unwrap(), 7);
        assert_eq!(f32::declared_type(), Type::Float32);
        assert!(bool::from_value(Value::Int(1)).is_err());
        assert_eq!(String::from_value(Value::from("hi")).unwrap(), "hi");
    }

    #[test]
    fn vec_maps_to_slice() {
        let value = vec![1.5f64, 2.5].to_value();
        assert_eq!(value.ty(), Type::slice(Type::Float64));
        let back: Vec<i32> = Vec::from_value(value).unwrap();
        assert_eq!(back, vec![1, 2]);
    }

    #[test]
    fn hash_map_round_trip() {
        let mut scores = HashMap::new();
        scores.insert("a".to_string(), 1i64);
        let value = scores.to_value();
        assert_eq!(value.ty(), Type::map(Type::String, Type::Int));
        let back: HashMap<String, i64> = HashMap::from_value(value).unwrap();
        assert_eq!(back, scores);
    }

    #[test]
    fn optional_map_is_nil_when_none() {
        let none: Option<HashMap<String, i64>> = None;
        let Value::Map(map) = none.to_value() else {
            panic!("expected map");
        };
        assert!(map.is_nil());
        let back = Option::<HashMap<String, i64>>::from_value(Value::Map(map)).unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn host_maps_convert_to_writable_maps() {
        let mut scores = BTreeMap::new();
        scores.insert(2i64, "b".to_string());
        let Value::Map(mut map) = scores.to_value() else {
            panic!("expected map");
        };
        assert!(!map.is_nil());
        assert_eq!(map.get(&MapKey::Int(2)), Some(&Value::from("b")));
        map.insert(MapKey::Int(3), Value::from("c")).unwrap();

        let Value::Map(object) = serde_json::json!({ "a": 1 }).to_value() else {
            panic!("expected map");
        };
        assert!(!object.is_nil());
        assert_eq!(object.len(), 1);
    }

    #[test]
    fn json_objects_are_string_keyed_any_maps() {
        let doc = serde_json::json!({ "n": 1, "f": 1.5, "sub": { "ok": true }, "list": [1, "a"] });
        let value = doc.to_value();
        assert_eq!(value.ty(), Type::map(Type::String, Type::Any));
        let back = serde_json::Value::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn reference_store_converts_to_host_type() {
        let cell = Rc::new(RefCell::new(0i64));
        cell.store(Value::Float64(3.7)).unwrap();
        assert_eq!(*cell.borrow(), 3);
        assert!(matches!(cell.load(), Value::Int(3)));
    }
}
