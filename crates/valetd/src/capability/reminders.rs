//! In-memory reminder list backend.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use valet_config::Capability;
use valet_protocol::Value;

use super::authorization::{AccessResolver, Authorization};
use super::error::CapabilityError;
use super::to_wire;

/// One reminder.
#[derive(Debug, Clone, Serialize)]
struct Reminder {
    id: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    completed: bool,
}

/// Fields for `reminders.create`.
#[derive(Debug, Default)]
pub struct ReminderDraft {
    pub title: String,
    pub due: Option<String>,
    pub notes: Option<String>,
}

/// Partial fields for `reminders.update`.
#[derive(Debug, Default)]
pub struct ReminderPatch {
    pub title: Option<String>,
    pub due: Option<String>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    entries: BTreeMap<String, Reminder>,
}

/// The reminder store, guarded by its authorization grant.
#[derive(Debug)]
pub struct ReminderStore {
    auth: Authorization,
    inner: Mutex<State>,
}

impl ReminderStore {
    /// Creates an empty reminder store.
    pub fn new(resolver: Arc<dyn AccessResolver>) -> Self {
        Self {
            auth: Authorization::new(Capability::Reminders, resolver),
            inner: Mutex::new(State::default()),
        }
    }

    /// The grant guarding this backend.
    pub const fn authorization(&self) -> &Authorization {
        &self.auth
    }

    /// Case-insensitive substring search over reminder titles.
    pub fn search(&self, query: &str) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let state = self.lock();
        let needle = query.to_lowercase();
        let matches: Vec<&Reminder> = state
            .entries
            .values()
            .filter(|reminder| reminder.title.to_lowercase().contains(&needle))
            .collect();
        to_wire(&matches)
    }

    /// Fetches one reminder by id.
    pub fn get(&self, id: &str) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let state = self.lock();
        let reminder = state
            .entries
            .get(id)
            .ok_or_else(|| CapabilityError::not_found("reminder", id))?;
        to_wire(reminder)
    }

    /// Lists up to `limit` reminders in id order.
    pub fn list(&self, limit: usize) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let state = self.lock();
        let page: Vec<&Reminder> = state.entries.values().take(limit).collect();
        to_wire(&page)
    }

    /// Creates a reminder; new reminders start incomplete.
    pub fn create(&self, draft: ReminderDraft) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("reminder-{}", state.next_id);
        let reminder = Reminder {
            id: id.clone(),
            title: draft.title,
            due: draft.due,
            notes: draft.notes,
            completed: false,
        };
        let wire = to_wire(&reminder)?;
        state.entries.insert(id, reminder);
        Ok(wire)
    }

    /// Applies a partial update.
    pub fn update(&self, id: &str, patch: ReminderPatch) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let mut state = self.lock();
        let reminder = state
            .entries
            .get_mut(id)
            .ok_or_else(|| CapabilityError::not_found("reminder", id))?;
        if let Some(title) = patch.title {
            reminder.title = title;
        }
        if let Some(due) = patch.due {
            reminder.due = Some(due);
        }
        if let Some(notes) = patch.notes {
            reminder.notes = Some(notes);
        }
        if let Some(completed) = patch.completed {
            reminder.completed = completed;
        }
        to_wire(reminder)
    }

    /// Deletes a reminder by id.
    pub fn delete(&self, id: &str) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let mut state = self.lock();
        if state.entries.remove(id).is_none() {
            return Err(CapabilityError::not_found("reminder", id));
        }
        Ok(Value::map([
            ("id", Value::str(id)),
            ("deleted", Value::Bool(true)),
        ]))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::super::authorization::PolicyResolver;
    use super::*;

    fn open_store() -> ReminderStore {
        ReminderStore::new(Arc::new(PolicyResolver::default()))
    }

    #[test]
    fn new_reminders_start_incomplete() {
        let store = open_store();
        let created = store
            .create(ReminderDraft {
                title: "Water the plants".to_owned(),
                ..ReminderDraft::default()
            })
            .expect("create");
        assert_eq!(
            created.as_map().and_then(|m| m.get("completed")).and_then(Value::as_bool),
            Some(false)
        );
    }

    #[test]
    fn completing_a_reminder_persists() {
        let store = open_store();
        let created = store
            .create(ReminderDraft {
                title: "File taxes".to_owned(),
                due: Some("2027-04-15".to_owned()),
                ..ReminderDraft::default()
            })
            .expect("create");
        let id = created
            .as_map()
            .and_then(|m| m.get("id"))
            .and_then(Value::as_str)
            .expect("id")
            .to_owned();

        store
            .update(
                &id,
                ReminderPatch {
                    completed: Some(true),
                    ..ReminderPatch::default()
                },
            )
            .expect("update");
        let fetched = store.get(&id).expect("get");
        assert_eq!(
            fetched.as_map().and_then(|m| m.get("completed")).and_then(Value::as_bool),
            Some(true)
        );
    }

    #[test]
    fn unknown_id_reports_not_found() {
        let store = open_store();
        assert!(matches!(
            store.update("reminder-404", ReminderPatch::default()),
            Err(CapabilityError::NotFound { .. })
        ));
    }
}
