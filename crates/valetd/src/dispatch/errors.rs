//! Error types for request parsing and dispatch.
//!
//! Every variant below the transport layer is converted into a response at
//! the router boundary; the display strings are the wire-visible error text
//! and are kept stable so scripts can pattern-match them.

use std::io;

use thiserror::Error;

use valet_protocol::ValueTag;

use crate::capability::CapabilityError;

/// Errors surfaced during request parsing and dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request line was not a valid request object.
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Command name is not in the static table.
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    /// A required argument is absent.
    #[error("Missing required argument: {name}")]
    MissingArgument { name: &'static str },

    /// An argument is present but carries the wrong tag.
    #[error("Invalid argument: {name} (expected {expected})")]
    InvalidArgument {
        name: &'static str,
        expected: ValueTag,
    },

    /// Command is recognized but has no backend yet.
    #[error("Not implemented: {command}")]
    NotImplemented { command: &'static str },

    /// Request line exceeds the framing size cap.
    #[error("Protocol error: request of {size} bytes exceeds the {max} byte limit")]
    RequestTooLarge { size: usize, max: usize },

    /// Backend operation failed; the message is forwarded verbatim.
    #[error("{0}")]
    Capability(#[from] CapabilityError),

    /// Clock formatting failed while answering a liveness probe.
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Connection-level read or write failure; closes the connection
    /// instead of being answered.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DispatchError {
    /// Builds a protocol error from a decode failure.
    pub fn protocol(message: impl Into<String>, source: Option<serde_json::Error>) -> Self {
        Self::Protocol {
            message: message.into(),
            source,
        }
    }

    /// Builds an unknown-command error.
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::UnknownCommand { name: name.into() }
    }

    /// Builds an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
