//! # Descriptor-driven validation
//!
//! Runs the unmarshal algorithm against a `TypeDef` alone, without a native
//! type. Code generators and gateways use this to validate values for
//! interfaces they only know by description.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::error::UnmarshalError;
use crate::marshal::DATETIME_FORMAT;
use crate::types::BasicKind;
use crate::types::Type;
use crate::types::TypeDef;
use crate::value::Value;

/// Validates `value` against `def`. Any `Type::Ref` fails as unresolved.
pub fn check(def: &TypeDef, value: &Value) -> Result<()> {
    Checker::new().check(def, value)
}

/// A validator that resolves `Type::Ref` against registered declarations.
#[derive(Debug, Default)]
pub struct Checker<'a> {
    decls: HashMap<&'a str, &'a TypeDef>,
}

impl<'a> Checker<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named declaration for `Type::Ref` lookups.
    pub fn declare(mut self, def: &'a TypeDef) -> Self {
        self.decls.insert(def.name.as_str(), def);
        self
    }

    pub fn check(&self, def: &TypeDef, value: &Value) -> Result<()> {
        match (&def.ty, value) {
            (Type::Basic(kind), _) => check_basic(*kind, value),
            (Type::DateTime, Value::DateTime(s)) => NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
                .map(|_| ())
                .map_err(|_| UnmarshalError::mismatch("datetime (yyyymmddThh:mm:ss)", value)),
            (Type::Unit, Value::Null) => Ok(()),

            (Type::Struct(fields), Value::Dict(entries)) => {
                let entries: Vec<(String, &Value)> =
                    entries.iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
                for field in fields {
                    let key = field.name.to_lowercase();
                    match entries.iter().find(|(k, _)| *k == key) {
                        Some((_, v)) => self.check(&field.def, v)?,
                        None if matches!(field.def.ty, Type::Option(_)) => {}
                        None => {
                            return Err(UnmarshalError::MissingField {
                                owner: field.owner.clone(),
                                field: field.name.clone(),
                            });
                        }
                    }
                }
                Ok(())
            }

            (Type::Variant(tags), Value::String(_) | Value::Enum(_)) => {
                let (tag, payload) = match value {
                    Value::String(tag) => (tag, None),
                    Value::Enum(items) => match items.as_slice() {
                        [Value::String(tag)] => (tag, None),
                        [Value::String(tag), payload] => (tag, Some(payload)),
                        _ => return Err(mismatch(def, value)),
                    },
                    _ => return Err(mismatch(def, value)),
                };
                let lowered = tag.to_lowercase();
                let case = tags
                    .iter()
                    .find(|t| t.name.to_lowercase() == lowered)
                    .ok_or_else(|| UnmarshalError::UnknownTag {
                        variant: def.name.clone(),
                        tag: tag.clone(),
                    })?;
                match (&case.payload, payload) {
                    (Some(inner), p) => self.check(inner, p.unwrap_or(&Value::Null)),
                    (None, None | Some(Value::Null)) => Ok(()),
                    (None, Some(p)) => Err(UnmarshalError::mismatch(format!("no payload for tag {}", tag), p)),
                }
            }

            (Type::Array(inner) | Type::List(inner), Value::Enum(items)) => {
                items.iter().try_for_each(|item| self.check(inner, item))
            }

            (Type::Dict(key, inner), Value::Dict(entries)) => {
                for (k, v) in entries {
                    check_key(*key, k)?;
                    self.check(inner, v)?;
                }
                Ok(())
            }

            (Type::Option(inner), Value::Enum(items)) => match items.as_slice() {
                [] => Ok(()),
                [item] => self.check(inner, item),
                _ => Err(mismatch(def, value)),
            },

            (Type::Tuple(a, b), Value::Enum(items)) => match items.as_slice() {
                [x, y] => {
                    self.check(a, x)?;
                    self.check(b, y)
                }
                _ => Err(mismatch(def, value)),
            },

            (Type::Ref(name), _) => match self.decls.get(name.as_str()) {
                Some(target) => self.check(target, value),
                None => Err(UnmarshalError::mismatch(format!("declaration of {}", name), value)),
            },

            _ => Err(mismatch(def, value)),
        }
    }
}

fn mismatch(def: &TypeDef, value: &Value) -> UnmarshalError {
    UnmarshalError::mismatch(format!("{} ({})", def.name, def.ty.shape()), value)
}

fn check_basic(kind: BasicKind, value: &Value) -> Result<()> {
    let ok = match (kind, value) {
        (BasicKind::Int64 | BasicKind::Int, Value::Int(_)) => true,
        (BasicKind::Int32, Value::Int32(_)) => true,
        (BasicKind::String, Value::String(_)) => true,
        (BasicKind::Float, Value::Float(_)) => true,
        (BasicKind::Bool, Value::Bool(_)) => true,
        (BasicKind::Char, Value::Int(code)) => u32::try_from(*code).ok().and_then(char::from_u32).is_some(),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(UnmarshalError::mismatch(kind.name(), value))
    }
}

fn check_key(kind: BasicKind, key: &str) -> Result<()> {
    let ok = match kind {
        BasicKind::String => true,
        BasicKind::Int64 | BasicKind::Int => key.parse::<i64>().is_ok(),
        BasicKind::Int32 => key.parse::<i32>().is_ok(),
        BasicKind::Bool => key.parse::<bool>().is_ok(),
        BasicKind::Char => key.chars().count() == 1,
        BasicKind::Float => key.parse::<f64>().is_ok(),
    };
    if ok {
        Ok(())
    } else {
        Err(UnmarshalError::mismatch(format!("{} key", kind.name()), &Value::String(key.to_string())))
    }
}
