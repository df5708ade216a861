//! The backend registry assembled at startup.

use std::path::PathBuf;
use std::sync::Arc;

use valet_config::Capability;

use super::authorization::{AccessResolver, Authorization, AuthorizationState};
use super::calendar::CalendarStore;
use super::contacts::ContactBook;
use super::error::CapabilityError;
use super::reminders::ReminderStore;
use super::settings::SettingsStore;

/// All capability backends, built once and immutable thereafter.
///
/// The registry is shared read-only across connection threads; each store
/// guards its own mutable state internally.
#[derive(Debug)]
pub struct Backends {
    contacts: ContactBook,
    calendar: CalendarStore,
    reminders: ReminderStore,
    settings: SettingsStore,
    /// Skills have no backend yet; the grant exists so `permissions` can
    /// report the capability alongside the others.
    skills: Authorization,
}

impl Backends {
    /// Assembles the registry.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Store`] when a persisted settings file
    /// exists but cannot be loaded.
    pub fn new(
        resolver: Arc<dyn AccessResolver>,
        settings_path: Option<PathBuf>,
    ) -> Result<Self, CapabilityError> {
        Ok(Self {
            contacts: ContactBook::new(Arc::clone(&resolver)),
            calendar: CalendarStore::new(Arc::clone(&resolver)),
            reminders: ReminderStore::new(Arc::clone(&resolver)),
            settings: SettingsStore::open(Arc::clone(&resolver), settings_path)?,
            skills: Authorization::new(Capability::Skills, resolver),
        })
    }

    /// The contact book backend.
    pub const fn contacts(&self) -> &ContactBook {
        &self.contacts
    }

    /// The calendar backend.
    pub const fn calendar(&self) -> &CalendarStore {
        &self.calendar
    }

    /// The reminder backend.
    pub const fn reminders(&self) -> &ReminderStore {
        &self.reminders
    }

    /// The settings backend.
    pub const fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Current authorization state of every capability, in wire order.
    pub fn authorization_states(&self) -> Vec<(Capability, AuthorizationState)> {
        vec![
            (Capability::Contacts, self.contacts.authorization().state()),
            (Capability::Calendar, self.calendar.authorization().state()),
            (Capability::Reminders, self.reminders.authorization().state()),
            (Capability::Config, self.settings.authorization().state()),
            (Capability::Skills, self.skills.state()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::super::authorization::PolicyResolver;
    use super::*;

    #[test]
    fn registry_reports_every_capability() {
        let backends =
            Backends::new(Arc::new(PolicyResolver::default()), None).expect("registry");
        let states = backends.authorization_states();
        let capabilities: Vec<Capability> = states.iter().map(|(c, _)| *c).collect();
        assert_eq!(capabilities, Capability::ALL);
        assert!(
            states
                .iter()
                .all(|(_, state)| *state == AuthorizationState::NotDetermined)
        );
    }
}
