//! The Valet daemon.
//!
//! `valetd` holds privileged access to personal-data capabilities (contacts,
//! calendar, reminders, settings) behind a local socket so that unprivileged
//! clients never touch the underlying stores directly. Clients connect to the
//! daemon's Unix socket, send newline-framed JSON requests, and receive one
//! response per request; the `valet` CLI is the reference client.
//!
//! The crate is organised in layers: [`transport`] owns the socket and the
//! accept loop, [`dispatch`] frames and routes requests, and [`capability`]
//! hosts the backends with their authorization state machines. [`daemon`]
//! wires the layers together behind [`run`].

mod capability;
mod daemon;
mod dispatch;
mod telemetry;
mod transport;

pub use capability::{
    AccessResolver, Authorization, AuthorizationState, Backends, CapabilityError, PolicyResolver,
};
pub use daemon::{Daemon, DaemonError, run, start};
pub use dispatch::{Command, DispatchConnectionHandler, DispatchError, Router};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{
    ConnectionHandler, ConnectionStream, ListenerError, ListenerHandle, SocketListener,
};
