//! # Marshalling
//!
//! Ties a native type to its descriptor and its conversion pair.
//!
//! The `Rpc` trait is the only "reflection" the system has: a type's `typedef`
//! and its `marshal`/`unmarshal` live in one impl, so the descriptor and the
//! conversion logic for that type cannot drift apart. Composite impls build
//! their descriptors and conversions from their children's impls.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::hash::Hash;

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::error::UnmarshalError;
use crate::types::BasicKind;
use crate::types::Type;
use crate::types::TypeDef;
use crate::value::Value;

/// Wire format for `Type::DateTime` values.
pub const DATETIME_FORMAT: &str = "%Y%m%dT%H:%M:%S";

/// A native type that can cross an rpc boundary.
pub trait Rpc: Sized {
    /// The descriptor for this type.
    fn typedef() -> TypeDef;

    /// Converts to a wire value. Total.
    fn marshal(&self) -> Value;

    /// Converts from a wire value, validating its structure.
    fn unmarshal(value: &Value) -> Result<Self>;

    /// The value to use when a field or argument of this type is absent.
    /// `None` means absence is an error.
    fn absent() -> Option<Self> {
        None
    }
}

/// Marshal `value` using its type's descriptor.
pub fn marshal<T: Rpc>(value: &T) -> Value {
    value.marshal()
}

/// Unmarshal `value` against the descriptor of `T`.
pub fn unmarshal<T: Rpc>(value: &Value) -> Result<T> {
    T::unmarshal(value)
}

// ============================================================================
//  BASIC TYPES
// ============================================================================

fn basic(kind: BasicKind, description: &str) -> TypeDef {
    TypeDef::new(kind.name(), description, Type::Basic(kind))
}

impl Rpc for i64 {
    fn typedef() -> TypeDef {
        basic(BasicKind::Int64, "64-bit signed integer")
    }

    fn marshal(&self) -> Value {
        Value::Int(*self)
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::Int(v) => Ok(*v),
            other => Err(UnmarshalError::mismatch("int64", other)),
        }
    }
}

impl Rpc for isize {
    fn typedef() -> TypeDef {
        basic(BasicKind::Int, "native-width signed integer")
    }

    fn marshal(&self) -> Value {
        Value::Int(*self as i64)
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::Int(v) => isize::try_from(*v).map_err(|_| UnmarshalError::mismatch("int", value)),
            other => Err(UnmarshalError::mismatch("int", other)),
        }
    }
}

impl Rpc for i32 {
    fn typedef() -> TypeDef {
        basic(BasicKind::Int32, "32-bit signed integer")
    }

    fn marshal(&self) -> Value {
        Value::Int32(*self)
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::Int32(v) => Ok(*v),
            other => Err(UnmarshalError::mismatch("int32", other)),
        }
    }
}

impl Rpc for bool {
    fn typedef() -> TypeDef {
        basic(BasicKind::Bool, "boolean")
    }

    fn marshal(&self) -> Value {
        Value::Bool(*self)
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(*v),
            other => Err(UnmarshalError::mismatch("bool", other)),
        }
    }
}

impl Rpc for f64 {
    fn typedef() -> TypeDef {
        basic(BasicKind::Float, "64-bit float")
    }

    fn marshal(&self) -> Value {
        Value::Float(*self)
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            other => Err(UnmarshalError::mismatch("float", other)),
        }
    }
}

impl Rpc for String {
    fn typedef() -> TypeDef {
        basic(BasicKind::String, "string")
    }

    fn marshal(&self) -> Value {
        Value::String(self.clone())
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(UnmarshalError::mismatch("string", other)),
        }
    }
}

/// Characters travel as their code point.
impl Rpc for char {
    fn typedef() -> TypeDef {
        basic(BasicKind::Char, "unicode scalar value")
    }

    fn marshal(&self) -> Value {
        Value::Int(*self as i64)
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::Int(code) => u32::try_from(*code)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| UnmarshalError::mismatch("char", value)),
            other => Err(UnmarshalError::mismatch("char", other)),
        }
    }
}

impl Rpc for () {
    fn typedef() -> TypeDef {
        TypeDef::new("unit", "unit", Type::Unit)
    }

    fn marshal(&self) -> Value {
        Value::Null
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(()),
            other => Err(UnmarshalError::mismatch("unit", other)),
        }
    }
}

impl Rpc for NaiveDateTime {
    fn typedef() -> TypeDef {
        TypeDef::new("datetime", "timestamp, yyyymmddThh:mm:ss", Type::DateTime)
    }

    fn marshal(&self) -> Value {
        Value::DateTime(self.format(DATETIME_FORMAT).to_string())
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::DateTime(s) => NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
                .map_err(|_| UnmarshalError::mismatch("datetime (yyyymmddThh:mm:ss)", value)),
            other => Err(UnmarshalError::mismatch("datetime", other)),
        }
    }
}

// ============================================================================
//  COLLECTIONS
// ============================================================================

fn unmarshal_items<T: Rpc>(expected: &str, value: &Value) -> Result<Vec<T>> {
    match value {
        Value::Enum(items) => items.iter().map(T::unmarshal).collect(),
        other => Err(UnmarshalError::mismatch(expected, other)),
    }
}

impl<T: Rpc> Rpc for Vec<T> {
    fn typedef() -> TypeDef {
        let inner = T::typedef();
        TypeDef::new(format!("{} list", inner.name), "", Type::List(Box::new(inner)))
    }

    fn marshal(&self) -> Value {
        Value::Enum(self.iter().map(Rpc::marshal).collect())
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        unmarshal_items("list", value)
    }
}

/// Boxed slices map to `Type::Array`. Like lists, any length is accepted.
impl<T: Rpc> Rpc for Box<[T]> {
    fn typedef() -> TypeDef {
        let inner = T::typedef();
        TypeDef::new(format!("{} array", inner.name), "", Type::Array(Box::new(inner)))
    }

    fn marshal(&self) -> Value {
        Value::Enum(self.iter().map(Rpc::marshal).collect())
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        unmarshal_items("array", value).map(Vec::into_boxed_slice)
    }
}

impl<T: Rpc> Rpc for Box<T> {
    fn typedef() -> TypeDef {
        T::typedef()
    }

    fn marshal(&self) -> Value {
        (**self).marshal()
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        T::unmarshal(value).map(Box::new)
    }

    fn absent() -> Option<Self> {
        T::absent().map(Box::new)
    }
}

impl<T: Rpc> Rpc for Option<T> {
    fn typedef() -> TypeDef {
        let inner = T::typedef();
        TypeDef::new(format!("{} option", inner.name), "", Type::Option(Box::new(inner)))
    }

    fn marshal(&self) -> Value {
        match self {
            Some(v) => Value::Enum(vec![v.marshal()]),
            None => Value::Enum(Vec::new()),
        }
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::Enum(items) => match items.as_slice() {
                [] => Ok(None),
                [inner] => T::unmarshal(inner).map(Some),
                _ => Err(UnmarshalError::mismatch("option (zero or one element)", value)),
            },
            other => Err(UnmarshalError::mismatch("option", other)),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

impl<A: Rpc, B: Rpc> Rpc for (A, B) {
    fn typedef() -> TypeDef {
        let a = A::typedef();
        let b = B::typedef();
        TypeDef::new(
            format!("({} * {})", a.name, b.name),
            "",
            Type::Tuple(Box::new(a), Box::new(b)),
        )
    }

    fn marshal(&self) -> Value {
        Value::Enum(vec![self.0.marshal(), self.1.marshal()])
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        match value {
            Value::Enum(items) => match items.as_slice() {
                [a, b] => Ok((A::unmarshal(a)?, B::unmarshal(b)?)),
                _ => Err(UnmarshalError::mismatch("tuple of 2", value)),
            },
            other => Err(UnmarshalError::mismatch("tuple", other)),
        }
    }
}

// ============================================================================
//  DICTIONARIES
// ============================================================================

/// A basic type usable as a dictionary key. Keys travel as strings.
pub trait DictKey: Sized {
    const KIND: BasicKind;

    fn to_key(&self) -> String;

    fn from_key(key: &str) -> Result<Self>;
}

fn key_mismatch(kind: BasicKind, key: &str) -> UnmarshalError {
    UnmarshalError::mismatch(format!("{} key", kind.name()), &Value::String(key.to_string()))
}

macro_rules! parsed_key {
    ($ty:ty, $kind:ident) => {
        impl DictKey for $ty {
            const KIND: BasicKind = BasicKind::$kind;

            fn to_key(&self) -> String {
                self.to_string()
            }

            fn from_key(key: &str) -> Result<Self> {
                key.parse().map_err(|_| key_mismatch(Self::KIND, key))
            }
        }
    };
}

parsed_key!(i64, Int64);
parsed_key!(i32, Int32);
parsed_key!(isize, Int);
parsed_key!(bool, Bool);

impl DictKey for String {
    const KIND: BasicKind = BasicKind::String;

    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str) -> Result<Self> {
        Ok(key.to_string())
    }
}

impl DictKey for char {
    const KIND: BasicKind = BasicKind::Char;

    fn to_key(&self) -> String {
        self.to_string()
    }

    fn from_key(key: &str) -> Result<Self> {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(key_mismatch(Self::KIND, key)),
        }
    }
}

fn dict_typedef<K: DictKey, V: Rpc>() -> TypeDef {
    let inner = V::typedef();
    TypeDef::new(
        format!("({}, {}) dict", K::KIND.name(), inner.name),
        "",
        Type::Dict(K::KIND, Box::new(inner)),
    )
}

/// Every entry must decode. A repeated key keeps its first value.
fn unmarshal_entries<K: DictKey, V: Rpc>(value: &Value) -> Result<Vec<(K, V)>> {
    match value {
        Value::Dict(entries) => entries
            .iter()
            .map(|(k, v)| -> Result<(K, V)> { Ok((K::from_key(k)?, V::unmarshal(v)?)) })
            .collect(),
        other => Err(UnmarshalError::mismatch("dict", other)),
    }
}

impl<K: DictKey + Eq + Hash, V: Rpc> Rpc for HashMap<K, V> {
    fn typedef() -> TypeDef {
        dict_typedef::<K, V>()
    }

    fn marshal(&self) -> Value {
        Value::Dict(self.iter().map(|(k, v)| (k.to_key(), v.marshal())).collect())
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        let mut map = HashMap::new();
        for (k, v) in unmarshal_entries(value)? {
            map.entry(k).or_insert(v);
        }
        Ok(map)
    }
}

impl<K: DictKey + Ord, V: Rpc> Rpc for BTreeMap<K, V> {
    fn typedef() -> TypeDef {
        dict_typedef::<K, V>()
    }

    fn marshal(&self) -> Value {
        Value::Dict(self.iter().map(|(k, v)| (k.to_key(), v.marshal())).collect())
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        let mut map = BTreeMap::new();
        for (k, v) in unmarshal_entries(value)? {
            map.entry(k).or_insert(v);
        }
        Ok(map)
    }
}
