//! # rpctype
//!
//! A reflection-free value and type model for rpc interfaces.
//!
//! ## Architecture
//!
//! - **Value**: the dynamically typed wire representation.
//! - **TypeDef**: a static, composable description of a native type's shape.
//! - **Rpc**: binds a native type to its `TypeDef` and its marshal/unmarshal
//!   pair, so the three are always defined together.
//! - **check**: the same validation driven by a `TypeDef` alone.

mod macros;

pub mod check;
pub mod error;
pub mod marshal;
pub mod record;
pub mod types;
pub mod value;


pub use crate::error::Result;
pub use crate::error::UnmarshalError;

pub use crate::value::Value;

pub use crate::types::BasicKind;
pub use crate::types::Field;
pub use crate::types::Tag;
pub use crate::types::Type;
pub use crate::types::TypeDef;

pub use crate::marshal::marshal;
pub use crate::marshal::unmarshal;
pub use crate::marshal::DictKey;
pub use crate::marshal::Rpc;
pub use crate::marshal::DATETIME_FORMAT;

pub use crate::record::variant_value;
pub use crate::record::StructDecoder;
pub use crate::record::StructEncoder;
pub use crate::record::VariantDecoder;

pub use crate::check::check;
pub use crate::check::Checker;
