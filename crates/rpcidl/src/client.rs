//! # RPC Client
//!
//! Backends that turn declarations into callable methods over a transport.
//!
//! A call marshals each argument under its parameter name, sends
//! `Call { name, params: [Dict(args)] }`, and unmarshals the response against
//! the declared result. The method's signature is the only source of types.
//!
//! - `Client` returns `Result<R, CallError<E>>` and never panics.
//! - `RaisingClient` returns `anyhow::Result<R>`, building remote interface
//!   errors with the interface's `ErrorDef`.

use std::marker::PhantomData;
use std::sync::Arc;

use rpctype::Rpc;
use rpctype::Value;
use tracing::debug;

use crate::error::CallError;
use crate::error::ErrorDef;
use crate::error::InterfaceError;
use crate::error::InternalError;
use crate::interface::Backend;
use crate::interface::InterfaceInfo;
use crate::message::Call;
use crate::message::Response;
use crate::signature::Arrow;
use crate::signature::IntoArgs;
use crate::signature::Returning;
use crate::signature::Signature;
use crate::transport::AsyncTransport;
use crate::transport::Transport;

/// Declares methods as typed calls over `T`.
pub struct Client<T, E = InternalError> {
    info: InterfaceInfo,
    transport: Arc<T>,
    _marker: PhantomData<fn() -> E>,
}

impl<T, E> Client<T, E> {
    pub fn new(info: InterfaceInfo, transport: T) -> Self {
        Self::shared(info, Arc::new(transport))
    }

    /// Builds a client over a transport shared with other clients.
    pub fn shared(info: InterfaceInfo, transport: Arc<T>) -> Self {
        Self {
            info,
            transport,
            _marker: PhantomData,
        }
    }

    pub fn info(&self) -> &InterfaceInfo {
        &self.info
    }
}

impl<T: Send + Sync + 'static, E: InterfaceError> Backend for Client<T, E> {
    type Method<S: Signature> = ClientMethod<S, T, E>;

    fn declare<S: Signature>(&mut self, name: &str, _description: &str, signature: S) -> ClientMethod<S, T, E> {
        ClientMethod {
            name: self.info.wire_name(name),
            signature: Arc::new(signature),
            transport: self.transport.clone(),
            _marker: PhantomData,
        }
    }
}

/// A declared method bound to a transport.
pub struct ClientMethod<S, T, E> {
    name: String,
    signature: Arc<S>,
    transport: Arc<T>,
    _marker: PhantomData<fn() -> E>,
}

impl<S, T, E> Clone for ClientMethod<S, T, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            signature: self.signature.clone(),
            transport: self.transport.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S: Signature, T, E: InterfaceError> ClientMethod<S, T, E> {
    /// The wire name this method is called by.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &S {
        &self.signature
    }

    fn prepare(&self, args: S::Args) -> Call {
        let mut named = Vec::new();
        self.signature.marshal_args(&args, &mut named);
        Call::named(self.name.clone(), named)
    }

    fn finish(&self, response: Response) -> Result<S::Ret, CallError<E>> {
        if response.success {
            return Ok(<S::Ret as Rpc>::unmarshal(&response.contents)?);
        }
        if let Ok(err) = E::unmarshal(&response.contents) {
            return Err(CallError::Remote(err));
        }
        let reason = match response.contents {
            Value::String(reason) => reason,
            other => other.to_string(),
        };
        Err(CallError::Failed(reason))
    }
}

impl<S: Signature, T: Transport, E: InterfaceError> ClientMethod<S, T, E> {
    pub fn call<A: IntoArgs<S::Args>>(&self, args: A) -> Result<S::Ret, CallError<E>> {
        let call = self.prepare(args.into_args());
        debug!(method = %self.name, "calling");
        let response = Transport::call(&*self.transport, call)?;
        self.finish(response)
    }
}

impl<S: Signature, T: AsyncTransport, E: InterfaceError> ClientMethod<S, T, E> {
    pub async fn call_async<A: IntoArgs<S::Args>>(&self, args: A) -> Result<S::Ret, CallError<E>> {
        let call = self.prepare(args.into_args());
        debug!(method = %self.name, "calling");
        let response = AsyncTransport::call(&*self.transport, call).await?;
        self.finish(response)
    }
}

macro_rules! client_fn {
    (@sig ; $r:ident) => { Returning<$r> };
    (@sig $head:ident $(, $tail:ident)* ; $r:ident) => { Arrow<$head, client_fn!(@sig $($tail),* ; $r)> };

    ($($t:ident),*) => {
        impl<$($t: Rpc + 'static,)* Res: Rpc + 'static, Tr: Transport, E: InterfaceError>
            ClientMethod<client_fn!(@sig $($t),* ; Res), Tr, E>
        {
            /// Turns this method into a plain function of matching arity.
            #[allow(non_snake_case)]
            pub fn into_fn(self) -> impl Fn($($t),*) -> Result<Res, CallError<E>> {
                move |$($t),*| self.call(($($t,)*))
            }
        }
    };
}

client_fn!();
client_fn!(T1);
client_fn!(T1, T2);
client_fn!(T1, T2, T3);
client_fn!(T1, T2, T3, T4);
client_fn!(T1, T2, T3, T4, T5);
client_fn!(T1, T2, T3, T4, T5, T6);
client_fn!(T1, T2, T3, T4, T5, T6, T7);
client_fn!(T1, T2, T3, T4, T5, T6, T7, T8);

// ============================================================================
//  RAISING CLIENT
// ============================================================================

/// Declares methods as calls that fail with `anyhow::Error`.
pub struct RaisingClient<T, E = InternalError> {
    info: InterfaceInfo,
    transport: Arc<T>,
    errors: ErrorDef<E>,
}

impl<T, E: InterfaceError> RaisingClient<T, E> {
    pub fn new(info: InterfaceInfo, transport: T) -> Self {
        Self::shared(info, Arc::new(transport))
    }

    pub fn shared(info: InterfaceInfo, transport: Arc<T>) -> Self {
        Self {
            info,
            transport,
            errors: ErrorDef::new(),
        }
    }

    /// Replaces how remote interface errors are raised.
    pub fn with_errors(mut self, errors: ErrorDef<E>) -> Self {
        self.errors = errors;
        self
    }
}

impl<T: Send + Sync + 'static, E: InterfaceError> Backend for RaisingClient<T, E> {
    type Method<S: Signature> = RaisingMethod<S, T, E>;

    fn declare<S: Signature>(&mut self, name: &str, _description: &str, signature: S) -> RaisingMethod<S, T, E> {
        RaisingMethod {
            inner: ClientMethod {
                name: self.info.wire_name(name),
                signature: Arc::new(signature),
                transport: self.transport.clone(),
                _marker: PhantomData,
            },
            errors: self.errors.clone(),
        }
    }
}

pub struct RaisingMethod<S, T, E> {
    inner: ClientMethod<S, T, E>,
    errors: ErrorDef<E>,
}

impl<S, T, E> Clone for RaisingMethod<S, T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl<S: Signature, T, E: InterfaceError> RaisingMethod<S, T, E> {
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    fn raise(&self, err: CallError<E>) -> anyhow::Error {
        match err {
            CallError::Remote(err) => self.errors.raise(err),
            other => anyhow::Error::new(other).context(format!("calling '{}'", self.inner.name)),
        }
    }
}

impl<S: Signature, T: Transport, E: InterfaceError> RaisingMethod<S, T, E> {
    pub fn call<A: IntoArgs<S::Args>>(&self, args: A) -> anyhow::Result<S::Ret> {
        self.inner.call(args).map_err(|err| self.raise(err))
    }
}

impl<S: Signature, T: AsyncTransport, E: InterfaceError> RaisingMethod<S, T, E> {
    pub async fn call_async<A: IntoArgs<S::Args>>(&self, args: A) -> anyhow::Result<S::Ret> {
        self.inner.call_async(args).await.map_err(|err| self.raise(err))
    }
}
