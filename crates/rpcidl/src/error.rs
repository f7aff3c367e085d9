//! # Error Definitions
//!
//! Failures on both sides of a call: dispatching on the server, calling on the
//! client, moving envelopes, and building a dispatch table.

use std::fmt;
use std::sync::Arc;

use rpctype::Result;
use rpctype::Rpc;
use rpctype::TypeDef;
use rpctype::UnmarshalError;
use rpctype::Value;
use thiserror::Error;

/// Why a server could not produce a result for a call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// `params` was not exactly one `Dict`.
    #[error("arguments must be named")]
    ArgumentFraming,
    #[error("missing argument '{0}'")]
    MissingArgument(String),
    #[error("invalid argument '{name}': {source}")]
    InvalidArgument {
        name: String,
        #[source]
        source: UnmarshalError,
    },
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    /// The handler returned an error or panicked. `payload` is what goes on
    /// the wire: the marshalled interface error, or the reason as a string.
    #[error("'{method}' failed: {reason}")]
    Implementation {
        method: String,
        reason: String,
        payload: Value,
    },
}

impl DispatchError {
    /// The contents of the failure envelope for this error.
    pub fn payload(&self) -> Value {
        match self {
            Self::Implementation { payload, .. } => payload.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

/// Errors that occur while moving an envelope between peers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer is unreachable or the connection was dropped.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// No response arrived in time.
    #[error("request timed out")]
    Timeout,
    /// Generic I/O error or internal transport failure.
    #[error("i/o error: {0}")]
    Io(String),
}

/// Errors surfaced by a client method.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError<E> {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The server reported an interface error.
    #[error("remote error: {0}")]
    Remote(E),
    /// The server failed with a reason that is not an interface error.
    #[error("call failed: {0}")]
    Failed(String),
    /// The server succeeded but its result did not match the declaration.
    #[error("malformed result: {0}")]
    Unmarshal(#[from] UnmarshalError),
}

/// Errors raised while registering implementations on a server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclareError {
    #[error("server already built, cannot implement '{0}'")]
    Sealed(String),
    #[error("'{0}' is already implemented")]
    DuplicateMethod(String),
}

// ============================================================================
//  INTERFACE ERRORS
// ============================================================================

/// A type usable as the error of an interface.
pub trait InterfaceError: Rpc + std::error::Error + Clone + Send + Sync + 'static {}

impl<T> InterfaceError for T where T: Rpc + std::error::Error + Clone + Send + Sync + 'static {}

/// The minimal interface error: a reason string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InternalError(pub String);

impl Rpc for InternalError {
    fn typedef() -> TypeDef {
        String::typedef()
            .rename("internal error")
            .describe("Reason the call failed")
    }

    fn marshal(&self) -> Value {
        Value::String(self.0.clone())
    }

    fn unmarshal(value: &Value) -> Result<Self> {
        String::unmarshal(value).map(InternalError)
    }
}

type Raiser<E> = Arc<dyn Fn(E) -> anyhow::Error + Send + Sync>;
type Matcher<E> = Arc<dyn Fn(&anyhow::Error) -> Option<E> + Send + Sync>;

/// An interface's error descriptor together with the hooks that move its
/// error type in and out of `anyhow::Error`.
///
/// The raiser builds the error a raising client returns for a remote
/// interface error. The matcher recognizes an interface error inside an
/// `anyhow::Error` returned by a raising handler.
pub struct ErrorDef<E> {
    def: TypeDef,
    raiser: Raiser<E>,
    matcher: Matcher<E>,
}

impl<E: InterfaceError> ErrorDef<E> {
    /// Raises `E` directly and recognizes it by downcasting.
    pub fn new() -> Self {
        Self::with_handlers(anyhow::Error::new, |err| err.downcast_ref::<E>().cloned())
    }

    pub fn with_handlers(
        raiser: impl Fn(E) -> anyhow::Error + Send + Sync + 'static,
        matcher: impl Fn(&anyhow::Error) -> Option<E> + Send + Sync + 'static,
    ) -> Self {
        Self {
            def: E::typedef(),
            raiser: Arc::new(raiser),
            matcher: Arc::new(matcher),
        }
    }

    pub fn def(&self) -> &TypeDef {
        &self.def
    }

    pub fn raise(&self, err: E) -> anyhow::Error {
        (self.raiser)(err)
    }

    pub fn matches(&self, err: &anyhow::Error) -> Option<E> {
        (self.matcher)(err)
    }
}

impl<E: InterfaceError> Default for ErrorDef<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ErrorDef<E> {
    fn clone(&self) -> Self {
        Self {
            def: self.def.clone(),
            raiser: self.raiser.clone(),
            matcher: self.matcher.clone(),
        }
    }
}

impl<E> fmt::Debug for ErrorDef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDef").field("def", &self.def.name).finish_non_exhaustive()
    }
}
