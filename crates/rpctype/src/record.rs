//! # Records and Variants
//!
//! Building blocks for `Rpc` impls of native structs and enums.
//! `rpc_struct!` and `rpc_variant!` expand to calls into this module, and
//! hand-written impls (recursive types, custom layouts) use it directly.
//!
//! ## Wire layout
//!
//! - Struct: `Dict` of field name to value, in field declaration order.
//! - Variant: `String(tag)` for unit cases, `Enum[String(tag), payload]` otherwise.
//!
//! Field names and tags are matched case-insensitively on the way in.

use crate::error::Result;
use crate::error::UnmarshalError;
use crate::marshal::Rpc;
use crate::value::Value;

/// Accumulates a struct's fields into a `Value::Dict`.
#[derive(Debug, Default)]
pub struct StructEncoder {
    fields: Vec<(String, Value)>,
}

impl StructEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: Rpc>(mut self, name: &str, value: &T) -> Self {
        self.fields.push((name.to_string(), value.marshal()));
        self
    }

    pub fn finish(self) -> Value {
        Value::Dict(self.fields)
    }
}

/// A view over an incoming `Dict` with lower-cased keys.
pub struct StructDecoder<'a> {
    owner: &'a str,
    entries: Vec<(String, &'a Value)>,
}

impl<'a> StructDecoder<'a> {
    /// Fails with a shape mismatch unless `value` is a `Dict`.
    pub fn new(owner: &'a str, value: &'a Value) -> Result<Self> {
        let Value::Dict(entries) = value else {
            return Err(UnmarshalError::mismatch(format!("struct {}", owner), value));
        };
        let entries = entries.iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
        Ok(Self { owner, entries })
    }

    /// Unmarshals the first entry whose key matches `name`.
    ///
    /// An absent field falls back to `T::absent()`, so optional fields may be
    /// left out while required ones fail with `MissingField`.
    pub fn field<T: Rpc>(&self, name: &str) -> Result<T> {
        let key = name.to_lowercase();
        match self.entries.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => T::unmarshal(value),
            None => T::absent().ok_or_else(|| UnmarshalError::MissingField {
                owner: self.owner.to_string(),
                field: name.to_string(),
            }),
        }
    }
}

/// Builds the wire form of a variant case.
pub fn variant_value(tag: &str, payload: Option<Value>) -> Value {
    match payload {
        None => Value::String(tag.to_string()),
        Some(p) => Value::Enum(vec![Value::String(tag.to_string()), p]),
    }
}

/// A decoded variant header: the lower-cased tag and its raw payload.
pub struct VariantDecoder<'a> {
    variant: &'a str,
    raw: &'a str,
    tag: String,
    payload: Option<&'a Value>,
}

impl<'a> VariantDecoder<'a> {
    /// Accepts `String(tag)`, `Enum[String(tag)]` and `Enum[String(tag), payload]`.
    pub fn new(variant: &'a str, value: &'a Value) -> Result<Self> {
        let (tag, payload) = match value {
            Value::String(tag) => (tag, None),
            Value::Enum(items) => match items.as_slice() {
                [Value::String(tag)] => (tag, None),
                [Value::String(tag), payload] => (tag, Some(payload)),
                _ => return Err(UnmarshalError::mismatch(format!("variant {}", variant), value)),
            },
            other => return Err(UnmarshalError::mismatch(format!("variant {}", variant), other)),
        };
        Ok(Self {
            variant,
            raw: tag,
            tag: tag.to_lowercase(),
            payload,
        })
    }

    /// Whether the incoming tag is `name`, ignoring case.
    pub fn is(&self, name: &str) -> bool {
        self.tag == name.to_lowercase()
    }

    /// Requires a unit case: no payload, or an explicit `Null`.
    pub fn unit(&self) -> Result<()> {
        match self.payload {
            None | Some(Value::Null) => Ok(()),
            Some(other) => Err(UnmarshalError::mismatch(format!("no payload for tag {}", self.raw), other)),
        }
    }

    /// Unmarshals the payload. A missing payload reads as `Null`.
    pub fn payload<T: Rpc>(&self) -> Result<T> {
        T::unmarshal(self.payload.unwrap_or(&Value::Null))
    }

    /// The error to return when no declared tag matched.
    pub fn unknown(&self) -> UnmarshalError {
        UnmarshalError::UnknownTag {
            variant: self.variant.to_string(),
            tag: self.raw.to_string(),
        }
    }
}
