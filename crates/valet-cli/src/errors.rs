//! Error types for the CLI runtime.

use std::io;

use thiserror::Error;

use valet_protocol::WireError;

/// Errors surfaced while running a one-shot client invocation.
///
/// Everything here maps to the usage/transport exit code; a daemon-reported
/// failure is a successful exchange and is rendered, not raised.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("argument `{argument}` is not a KEY=VALUE pair")]
    InvalidArgument { argument: String },
    #[error("failed to resolve daemon address {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to daemon at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[cfg(not(unix))]
    #[error("platform does not support Unix sockets: {0}")]
    UnsupportedUnixTransport(String),
    #[error("failed to serialise request: {0}")]
    EncodeRequest(#[source] WireError),
    #[error("failed to send request to daemon: {0}")]
    SendRequest(#[source] io::Error),
    #[error("failed to read response from daemon: {0}")]
    ReadResponse(#[source] io::Error),
    #[error("daemon closed the connection without responding")]
    ClosedWithoutResponse,
    #[error("failed to parse daemon response: {0}")]
    ParseResponse(#[source] WireError),
    #[error("response id `{received}` does not match request id `{expected}`")]
    CorrelationMismatch { expected: String, received: String },
    #[error("failed to render response: {0}")]
    RenderResponse(#[source] serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
}
