//! # Transport Abstraction
//!
//! The boundary between typed calls and whatever actually carries them.
//!
//! A transport knows nothing about descriptors. It takes a `Call` envelope and
//! returns a `Response` envelope, or fails with a `TransportError` if the
//! exchange itself broke down. Remote failures travel inside the `Response`.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::message::Call;
use crate::message::Response;

pub type Result<T> = std::result::Result<T, TransportError>;

/// A blocking request/response exchange.
pub trait Transport: Send + Sync + 'static {
    fn call(&self, call: Call) -> Result<Response>;
}

impl<F> Transport for F
where
    F: Fn(Call) -> Result<Response> + Send + Sync + 'static,
{
    fn call(&self, call: Call) -> Result<Response> {
        self(call)
    }
}

/// An asynchronous request/response exchange.
///
/// Object-safe, so peers can be held as `Arc<dyn AsyncTransport>`.
#[async_trait]
pub trait AsyncTransport: Send + Sync + 'static {
    async fn call(&self, call: Call) -> Result<Response>;
}
