//! # Envelopes
//!
//! What a client hands to a transport and what comes back. Framing these onto
//! bytes (XML-RPC, JSON-RPC, ...) is the transport's business.
//!
//! ## Invariants
//!
//! - Calls built by this crate carry exactly one `Dict` of named arguments.
//! - A successful response carries the marshalled result. A failed one carries
//!   either a marshalled interface error or a reason string.

use rpctype::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Wire name of the method, `namespace.method` when namespaced.
    pub name: String,
    pub params: Vec<Value>,
    /// Set when the caller does not wait for a response.
    pub is_notification: bool,
}

impl Call {
    pub fn new(name: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            params,
            is_notification: false,
        }
    }

    /// Builds a call with a single `Dict` of named arguments.
    pub fn named(name: impl Into<String>, args: Vec<(String, Value)>) -> Self {
        Self::new(name, vec![Value::Dict(args)])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub success: bool,
    pub contents: Value,
}

impl Response {
    pub fn success(contents: Value) -> Self {
        Self { success: true, contents }
    }

    pub fn failure(contents: Value) -> Self {
        Self { success: false, contents }
    }
}
