//! Socket transport for the daemon.
//!
//! The transport binds the configured endpoint, accepts connections on a
//! background thread, and hands each accepted stream to a
//! [`ConnectionHandler`] running on its own thread. It knows nothing about
//! the protocol carried over the connection.

mod errors;
mod handler;
mod listener;

pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandler, ConnectionStream};
pub use self::listener::{ListenerHandle, SocketListener};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
