//! Error type shared by the capability backends.

use thiserror::Error;

use valet_config::Capability;

use super::authorization::AuthorizationState;

/// Errors surfaced by capability backends.
///
/// The display strings are wire-visible; the permission message names the
/// remediation step because the client shows it verbatim.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The capability's grant is not in the authorized state.
    #[error("{}", permission_message(*capability, *state))]
    PermissionDenied {
        capability: Capability,
        state: AuthorizationState,
    },

    /// An id-addressed entity does not exist.
    #[error("Not found: {kind} {id}")]
    NotFound { kind: &'static str, id: String },

    /// The underlying store failed.
    #[error("Store error: {message}")]
    Store { message: String },
}

impl CapabilityError {
    /// Builds a not-found error for an id-addressed lookup.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Builds a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

fn permission_message(capability: Capability, state: AuthorizationState) -> String {
    let remedy = match state {
        AuthorizationState::Restricted => "access is administratively restricted on this system",
        AuthorizationState::Denied => {
            "access was declined; restart valetd without denying this capability to grant it"
        }
        AuthorizationState::NotDetermined | AuthorizationState::Authorized => {
            "access has not been granted yet; retry to request it again"
        }
    };
    format!("Permission denied: {capability} {remedy}")
}
