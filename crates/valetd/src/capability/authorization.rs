//! The per-capability authorization state machine.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use valet_config::Capability;

use super::error::CapabilityError;

const CAPABILITY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::capability");

/// Authorization state of one capability grant.
///
/// The state starts not-determined and transitions only through an explicit
/// access request. `Restricted` is terminal and distinct from `Denied`:
/// administratively blocked rather than user-declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    /// No access request has been resolved yet.
    NotDetermined,
    /// Access was granted.
    Authorized,
    /// Access was declined by the user.
    Denied,
    /// Access is administratively blocked; terminal.
    Restricted,
}

impl AuthorizationState {
    /// Canonical lower-case name, as reported by `permissions`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotDetermined => "not_determined",
            Self::Authorized => "authorized",
            Self::Denied => "denied",
            Self::Restricted => "restricted",
        }
    }
}

impl fmt::Display for AuthorizationState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Decides the outcome of an access request.
///
/// Production uses [`PolicyResolver`]; tests substitute their own resolver
/// to drive the denied and restricted paths. The platform consent dialog is
/// out of scope — the resolver stands in for its three-way outcome.
pub trait AccessResolver: Send + Sync {
    /// Resolves an access request for `capability`.
    ///
    /// Returning [`AuthorizationState::NotDetermined`] leaves the grant
    /// unresolved (a dismissed prompt); the next request asks again.
    fn resolve(&self, capability: Capability) -> AuthorizationState;
}

/// Resolver that grants everything except an explicit deny list.
#[derive(Debug, Default)]
pub struct PolicyResolver {
    denied: BTreeSet<Capability>,
}

impl PolicyResolver {
    /// Builds a resolver denying the listed capabilities.
    pub fn new(denied: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
        }
    }
}

impl AccessResolver for PolicyResolver {
    fn resolve(&self, capability: Capability) -> AuthorizationState {
        if self.denied.contains(&capability) {
            AuthorizationState::Denied
        } else {
            AuthorizationState::Authorized
        }
    }
}

/// One capability's grant, shared by all operations of a backend.
pub struct Authorization {
    capability: Capability,
    state: Mutex<AuthorizationState>,
    resolver: Arc<dyn AccessResolver>,
}

impl Authorization {
    /// Creates an undetermined grant resolved by `resolver` on first use.
    pub fn new(capability: Capability, resolver: Arc<dyn AccessResolver>) -> Self {
        Self {
            capability,
            state: Mutex::new(AuthorizationState::NotDetermined),
            resolver,
        }
    }

    /// The capability this grant covers.
    #[must_use]
    pub const fn capability(&self) -> Capability {
        self.capability
    }

    /// Current state, without requesting access.
    pub fn state(&self) -> AuthorizationState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests access on first use; idempotent once resolved.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::PermissionDenied`] for any non-authorized
    /// outcome.
    pub fn ensure_authorized(&self) -> Result<(), CapabilityError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == AuthorizationState::NotDetermined {
            let resolved = self.resolver.resolve(self.capability);
            if resolved != AuthorizationState::NotDetermined {
                info!(
                    target: CAPABILITY_TARGET,
                    capability = %self.capability,
                    state = %resolved,
                    "access request resolved"
                );
                *state = resolved;
            }
        }
        match *state {
            AuthorizationState::Authorized => Ok(()),
            other => Err(CapabilityError::PermissionDenied {
                capability: self.capability,
                state: other,
            }),
        }
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Authorization")
            .field("capability", &self.capability)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FixedResolver {
        outcome: AuthorizationState,
        calls: AtomicUsize,
    }

    impl FixedResolver {
        fn new(outcome: AuthorizationState) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl AccessResolver for FixedResolver {
        fn resolve(&self, _capability: Capability) -> AuthorizationState {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
        }
    }

    #[test]
    fn starts_not_determined() {
        let auth = Authorization::new(
            Capability::Contacts,
            FixedResolver::new(AuthorizationState::Authorized),
        );
        assert_eq!(auth.state(), AuthorizationState::NotDetermined);
    }

    #[test]
    fn resolves_once_then_stays_authorized() {
        let resolver = FixedResolver::new(AuthorizationState::Authorized);
        let auth = Authorization::new(Capability::Contacts, Arc::clone(&resolver) as _);
        auth.ensure_authorized().expect("first request");
        auth.ensure_authorized().expect("second request");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.state(), AuthorizationState::Authorized);
    }

    #[test]
    fn denied_outcome_is_sticky() {
        let resolver = FixedResolver::new(AuthorizationState::Denied);
        let auth = Authorization::new(Capability::Calendar, Arc::clone(&resolver) as _);
        assert!(auth.ensure_authorized().is_err());
        assert!(auth.ensure_authorized().is_err());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.state(), AuthorizationState::Denied);
    }

    #[test]
    fn unresolved_outcome_asks_again() {
        let resolver = FixedResolver::new(AuthorizationState::NotDetermined);
        let auth = Authorization::new(Capability::Reminders, Arc::clone(&resolver) as _);
        assert!(auth.ensure_authorized().is_err());
        assert!(auth.ensure_authorized().is_err());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(auth.state(), AuthorizationState::NotDetermined);
    }

    #[test]
    fn policy_resolver_honors_deny_list() {
        let resolver = PolicyResolver::new([Capability::Contacts]);
        assert_eq!(
            resolver.resolve(Capability::Contacts),
            AuthorizationState::Denied
        );
        assert_eq!(
            resolver.resolve(Capability::Calendar),
            AuthorizationState::Authorized
        );
    }
}
