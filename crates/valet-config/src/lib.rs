//! Shared configuration types for the Valet daemon and client.
//!
//! The crate defines the socket endpoint model, the canonical default socket
//! location, the capability enumeration, and the daemon's resolved runtime
//! configuration. Binaries apply overrides from command-line flags and
//! environment variables on top of [`Config::default`].

mod capability;
mod defaults;
mod logging;
mod socket;

use camino::Utf8PathBuf;

pub use capability::{Capability, CapabilityParseError};
pub use defaults::{DEFAULT_LOG_FILTER, DEFAULT_TCP_PORT, default_socket_endpoint};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{EndpointParseError, SocketEndpoint, SocketPreparationError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Endpoint the daemon listens on and clients connect to.
    pub socket: SocketEndpoint,
    /// `tracing` filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Optional path of the persisted settings store.
    pub store_path: Option<Utf8PathBuf>,
    /// Capabilities whose access requests resolve to denied.
    pub denied: Vec<Capability>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: default_socket_endpoint(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
            store_path: None,
            denied: Vec::new(),
        }
    }
}

impl Config {
    /// Replaces the socket endpoint.
    #[must_use]
    pub fn with_socket(mut self, socket: SocketEndpoint) -> Self {
        self.socket = socket;
        self
    }

    /// Replaces the log filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Replaces the log format.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Sets the persisted settings store path.
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Replaces the denied-capability list.
    #[must_use]
    pub fn with_denied(mut self, denied: Vec<Capability>) -> Self {
        self.denied = denied;
        self
    }
}
