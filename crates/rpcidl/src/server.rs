//! # Server
//!
//! The dispatching backend. Declaring against a `ServerBuilder` yields a
//! `Registration`; implementing it installs a procedure under the method's
//! wire name. `build()` seals the table into a `Server`.
//!
//! ## Invariants
//!
//! - A built server's table never changes. Registrations that arrive after
//!   `build()` are refused with `DeclareError::Sealed`.
//! - Dispatch never panics and never propagates a handler's failure: handler
//!   errors and panics become `DispatchError::Implementation`.
//! - Framework errors go out as a reason string. Handler errors go out as the
//!   marshalled interface error.

use std::any::Any;
use std::collections::HashMap;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::DashSet;
use dashmap::mapref::entry::Entry;
use rpctype::Rpc;
use rpctype::Value;
use tracing::debug;
use tracing::warn;

use crate::error::DeclareError;
use crate::error::DispatchError;
use crate::error::ErrorDef;
use crate::error::InterfaceError;
use crate::error::InternalError;
use crate::error::TransportError;
use crate::interface::Backend;
use crate::interface::InterfaceInfo;
use crate::message::Call;
use crate::message::Response;
use crate::signature::Handler;
use crate::signature::Signature;
use crate::transport::AsyncTransport;
use crate::transport::Transport;

/// An installed method: named arguments in, marshalled result out.
type Procedure = dyn Fn(&[(String, Value)]) -> Result<Value, DispatchError> + Send + Sync;

/// Installs hold `sealed` for reading across the insert, and `build` takes it
/// for writing, so no install lands between sealing and the snapshot.
#[derive(Default)]
struct Pending {
    sealed: RwLock<bool>,
    table: DashMap<String, Arc<Procedure>>,
    declared: DashSet<String>,
}

pub struct ServerBuilder<E = InternalError> {
    info: InterfaceInfo,
    errors: ErrorDef<E>,
    pending: Arc<Pending>,
}

impl<E: InterfaceError> ServerBuilder<E> {
    pub fn new(info: InterfaceInfo) -> Self {
        Self {
            info,
            errors: ErrorDef::new(),
            pending: Arc::new(Pending::default()),
        }
    }

    /// Replaces how raising handlers' errors are recognized.
    pub fn with_errors(mut self, errors: ErrorDef<E>) -> Self {
        self.errors = errors;
        self
    }

    /// Seals the dispatch table.
    pub fn build(self) -> Server {
        let mut sealed = self.pending.sealed.write().unwrap_or_else(PoisonError::into_inner);
        *sealed = true;
        let table: HashMap<String, Arc<Procedure>> = self
            .pending
            .table
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        drop(sealed);
        for name in self.pending.declared.iter() {
            if !table.contains_key(name.key()) {
                warn!(method = %name.key(), "declared but not implemented");
            }
        }
        debug!(interface = %self.info.name, methods = table.len(), "server built");
        Server {
            info: Arc::new(self.info),
            table: Arc::new(table),
        }
    }
}

impl<E: InterfaceError> Backend for ServerBuilder<E> {
    type Method<S: Signature> = Registration<S, E>;

    fn declare<S: Signature>(&mut self, name: &str, _description: &str, signature: S) -> Registration<S, E> {
        let name = self.info.wire_name(name);
        self.pending.declared.insert(name.clone());
        Registration {
            name,
            signature,
            errors: self.errors.clone(),
            pending: self.pending.clone(),
        }
    }
}

/// A declared method waiting for its implementation.
pub struct Registration<S, E> {
    name: String,
    signature: S,
    errors: ErrorDef<E>,
    pending: Arc<Pending>,
}

impl<S: Signature, E: InterfaceError> Registration<S, E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs a handler whose errors are interface errors.
    pub fn implement<H>(self, handler: H) -> Result<(), DeclareError>
    where
        H: Handler<S::Args, S::Ret, E>,
    {
        let method = self.name.clone();
        self.install(move |args| handler.invoke(args).map_err(|err| failure(&method, &err)))
    }

    /// Installs a handler that fails with `anyhow::Error`. Errors the
    /// interface's `ErrorDef` recognizes go out as interface errors, anything
    /// else as a reason string.
    pub fn implement_raising<H>(self, handler: H) -> Result<(), DeclareError>
    where
        H: Handler<S::Args, S::Ret, anyhow::Error>,
    {
        let method = self.name.clone();
        let errors = self.errors.clone();
        self.install(move |args| {
            handler.invoke(args).map_err(|err| match errors.matches(&err) {
                Some(err) => failure(&method, &err),
                None => {
                    let reason = format!("{:#}", err);
                    DispatchError::Implementation {
                        method: method.clone(),
                        payload: Value::String(reason.clone()),
                        reason,
                    }
                }
            })
        })
    }

    fn install<F>(self, body: F) -> Result<(), DeclareError>
    where
        F: Fn(S::Args) -> Result<S::Ret, DispatchError> + Send + Sync + 'static,
    {
        let sealed = self.pending.sealed.read().unwrap_or_else(PoisonError::into_inner);
        if *sealed {
            warn!(method = %self.name, "registration after build refused");
            return Err(DeclareError::Sealed(self.name));
        }

        let signature = self.signature;
        let method = self.name.clone();
        let procedure: Arc<Procedure> = Arc::new(move |args: &[(String, Value)]| {
            let args = signature.unmarshal_args(args)?;
            match panic::catch_unwind(AssertUnwindSafe(|| body(args).map(|ret| ret.marshal()))) {
                Ok(result) => result,
                Err(cause) => {
                    let reason = panic_reason(&*cause);
                    warn!(method = %method, %reason, "handler panicked");
                    Err(DispatchError::Implementation {
                        method: method.clone(),
                        payload: Value::String(reason.clone()),
                        reason,
                    })
                }
            }
        });

        match self.pending.table.entry(self.name.clone()) {
            Entry::Occupied(_) => {
                warn!(method = %self.name, "duplicate implementation refused");
                Err(DeclareError::DuplicateMethod(self.name))
            }
            Entry::Vacant(slot) => {
                slot.insert(procedure);
                Ok(())
            }
        }
    }
}

fn failure<E: InterfaceError>(method: &str, err: &E) -> DispatchError {
    DispatchError::Implementation {
        method: method.to_string(),
        reason: err.to_string(),
        payload: err.marshal(),
    }
}

fn panic_reason(cause: &(dyn Any + Send)) -> String {
    if let Some(msg) = cause.downcast_ref::<&str>() {
        format!("handler panicked: {}", msg)
    } else if let Some(msg) = cause.downcast_ref::<String>() {
        format!("handler panicked: {}", msg)
    } else {
        "handler panicked".to_string()
    }
}

// ============================================================================
//  DISPATCH
// ============================================================================

/// A sealed dispatch table. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct Server {
    info: Arc<InterfaceInfo>,
    table: Arc<HashMap<String, Arc<Procedure>>>,
}

impl Server {
    pub fn info(&self) -> &InterfaceInfo {
        &self.info
    }

    /// Wire names of the implemented methods, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn try_dispatch(&self, call: &Call) -> Result<Value, DispatchError> {
        let procedure = self
            .table
            .get(&call.name)
            .ok_or_else(|| DispatchError::UnknownMethod(call.name.clone()))?;
        let [Value::Dict(args)] = call.params.as_slice() else {
            return Err(DispatchError::ArgumentFraming);
        };
        procedure(args.as_slice())
    }

    /// Dispatches a call. Always produces a response.
    pub fn dispatch(&self, call: &Call) -> Response {
        debug!(method = %call.name, "dispatching");
        match self.try_dispatch(call) {
            Ok(contents) => Response::success(contents),
            Err(err) => {
                warn!(method = %call.name, error = %err, "dispatch failed");
                Response::failure(err.payload())
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("info", &self.info)
            .field("methods", &self.methods())
            .finish()
    }
}

/// Loopback: a server answers calls in-process.
impl Transport for Server {
    fn call(&self, call: Call) -> Result<Response, TransportError> {
        Ok(self.dispatch(&call))
    }
}

#[async_trait]
impl AsyncTransport for Server {
    async fn call(&self, call: Call) -> Result<Response, TransportError> {
        Ok(self.dispatch(&call))
    }
}
