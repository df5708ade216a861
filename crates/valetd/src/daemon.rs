//! Daemon bootstrap and run loop.
//!
//! The bootstrap sequence is: install telemetry, prepare the socket
//! directory, assemble the capability backends, bind the listener, then wait
//! for SIGINT or SIGTERM. Shutdown stops the accept loop and removes the
//! socket file; in-flight connections finish on their own threads.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use tracing::info;

use valet_config::{Config, SocketPreparationError};

use crate::capability::{Backends, CapabilityError, PolicyResolver};
use crate::dispatch::{DispatchConnectionHandler, Router};
use crate::telemetry::{self, TelemetryError};
use crate::transport::{ListenerError, SocketListener};

const DAEMON_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::daemon");

const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Errors that abort daemon startup or shutdown.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The socket's parent directory could not be prepared.
    #[error(transparent)]
    Socket(#[from] SocketPreparationError),
    /// A capability backend failed to initialise.
    #[error("failed to initialise capability backends: {0}")]
    Backends(#[source] CapabilityError),
    /// The endpoint could not be bound or the accept loop failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// A termination signal handler could not be registered.
    #[error("failed to register signal handler: {0}")]
    Signals(#[source] io::Error),
}

/// A running daemon.
pub struct Daemon {
    handle: crate::transport::ListenerHandle,
    local_addr: Option<std::net::SocketAddr>,
}

impl Daemon {
    /// The bound TCP address, when listening on TCP.
    #[must_use]
    pub const fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.local_addr
    }

    /// Stops the accept loop and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Listener`] when the accept loop panicked.
    pub fn shutdown(self) -> Result<(), DaemonError> {
        self.handle.shutdown();
        self.handle.join()?;
        Ok(())
    }
}

/// Binds the endpoint and starts serving in the background.
///
/// # Errors
///
/// Returns [`DaemonError`] when any bootstrap stage fails; nothing is left
/// listening on failure.
pub fn start(config: &Config) -> Result<Daemon, DaemonError> {
    telemetry::initialise(config)?;
    config.socket.prepare_filesystem()?;

    let resolver = Arc::new(PolicyResolver::new(config.denied.iter().copied()));
    let store_path = config
        .store_path
        .as_ref()
        .map(|path| path.as_std_path().to_path_buf());
    let backends = Backends::new(resolver, store_path).map_err(DaemonError::Backends)?;
    let handler = Arc::new(DispatchConnectionHandler::new(Router::new(backends)));

    let listener = SocketListener::bind(&config.socket)?;
    let local_addr = listener.local_addr();
    let handle = listener.start(handler)?;
    info!(
        target: DAEMON_TARGET,
        endpoint = %config.socket,
        version = env!("CARGO_PKG_VERSION"),
        "valetd ready"
    );
    Ok(Daemon { handle, local_addr })
}

/// Runs the daemon until SIGINT or SIGTERM arrives.
///
/// # Errors
///
/// Returns [`DaemonError`] when bootstrap fails or shutdown cannot complete.
pub fn run(config: &Config) -> Result<(), DaemonError> {
    let daemon = start(config)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        flag::register(signal, Arc::clone(&shutdown)).map_err(DaemonError::Signals)?;
    }
    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(SHUTDOWN_POLL);
    }

    info!(target: DAEMON_TARGET, "shutdown requested");
    daemon.shutdown()
}
