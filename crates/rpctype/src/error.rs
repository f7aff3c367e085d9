//! # Error Definitions
//!
//! Every way a `Value` can fail to match the descriptor it is read against.

use thiserror::Error;

use crate::value::Value;

/// Unmarshalling failures. Detection halts at the first mismatch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnmarshalError {
    /// The value's outermost shape does not match the descriptor.
    #[error("expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },
    /// A record was missing a required field.
    #[error("missing field '{field}' in {owner}")]
    MissingField { owner: String, field: String },
    /// A variant tag matched none of the declared tags.
    #[error("unknown tag '{tag}' for variant {variant}")]
    UnknownTag { variant: String, tag: String },
}

impl UnmarshalError {
    pub fn mismatch(expected: impl Into<String>, got: &Value) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            got: got.to_string(),
        }
    }
}

/// A specialized Result type for unmarshalling.
pub type Result<T> = std::result::Result<T, UnmarshalError>;
