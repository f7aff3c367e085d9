//! # rpcidl
//!
//! Declare an rpc interface once and bind it many ways.
//!
//! ## Architecture
//!
//! - **Param / Signature**: typed method declarations, built right to left.
//! - **Backend**: reinterprets a declaration. An interface is a struct generic
//!   over its backend, declared in one function.
//! - **Client / RaisingClient**: marshal arguments, call a transport,
//!   unmarshal the result.
//! - **ServerBuilder / Server**: unmarshal arguments, run a handler, marshal
//!   the result. A built server is itself a transport.
//! - **Interface**: records descriptions for code generators.

pub mod client;
pub mod error;
pub mod interface;
pub mod message;
pub mod param;
pub mod server;
pub mod signature;
pub mod transport;


pub use crate::client::Client;
pub use crate::client::ClientMethod;
pub use crate::client::RaisingClient;
pub use crate::client::RaisingMethod;

pub use crate::error::CallError;
pub use crate::error::DeclareError;
pub use crate::error::DispatchError;
pub use crate::error::ErrorDef;
pub use crate::error::InterfaceError;
pub use crate::error::InternalError;
pub use crate::error::TransportError;

pub use crate::interface::Backend;
pub use crate::interface::Interface;
pub use crate::interface::InterfaceInfo;
pub use crate::interface::Interfaces;
pub use crate::interface::MethodDescription;

pub use crate::message::Call;
pub use crate::message::Response;

pub use crate::param::Param;
pub use crate::param::ParamDescription;

pub use crate::server::Registration;
pub use crate::server::Server;
pub use crate::server::ServerBuilder;

pub use crate::signature::Arrow;
pub use crate::signature::Handler;
pub use crate::signature::IntoArgs;
pub use crate::signature::Returning;
pub use crate::signature::Signature;

pub use crate::transport::AsyncTransport;
pub use crate::transport::Transport;
