//! Command routing and dispatch.
//!
//! The dispatcher reads newline-framed JSON requests from connected clients,
//! validates them against the static command table, invokes the capability
//! backends, and writes exactly one response per request. A connection serves
//! any number of sequential exchanges until the peer disconnects.
//!
//! ## Protocol
//!
//! ```json
//! {"id":"1","command":"contacts.search","args":{"query":"ada"}}
//! ```
//!
//! is answered by
//!
//! ```json
//! {"id":"1","success":true,"data":[{"id":"contact-1","name":"Ada Lovelace",...}]}
//! ```
//!
//! Failures carry `success:false` and a human-readable `error` string; the
//! specific backend error value is never exposed as a structured object.

mod command;
mod errors;
mod handler;
mod router;

pub use self::command::{ArgSpec, Command};
pub use self::errors::DispatchError;
pub use self::handler::DispatchConnectionHandler;
pub use self::router::Router;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
