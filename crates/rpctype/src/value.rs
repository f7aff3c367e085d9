//! # Wire Values
//!
//! The dynamically typed representation of everything that crosses an rpc
//! boundary. A `Value` is not self-describing: the arity of an `Enum` and the
//! meaning of a `Dict` come from the descriptor used to read it.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Int32(i32),
    Bool(bool),
    Float(f64),
    String(String),
    /// A timestamp in `yyyymmddThh:mm:ss` form.
    DateTime(String),
    /// Arrays, lists, tuples, options and variant payloads.
    Enum(Vec<Value>),
    /// Ordered key/value pairs. Keys may repeat; readers take the first match.
    Dict(Vec<(String, Value)>),
    Null,
}

impl Value {
    /// A short name for the outermost shape, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Int32(_) => "int32",
            Value::Bool(_) => "bool",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Enum(_) => "enum",
            Value::Dict(_) => "dict",
            Value::Null => "null",
        }
    }

    pub fn as_dict(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&[Value]> {
        match self {
            Value::Enum(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}i32", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::String(s) => write!(f, "{:?}", s),
            Value::DateTime(s) => write!(f, "@{}", s),
            Value::Enum(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Null => write!(f, "null"),
        }
    }
}
