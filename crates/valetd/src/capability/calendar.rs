//! In-memory calendar event backend.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use valet_config::Capability;
use valet_protocol::Value;

use super::authorization::{AccessResolver, Authorization};
use super::error::CapabilityError;
use super::to_wire;

/// One calendar event. Timestamps are opaque RFC3339 text; the daemon stores
/// and echoes them without interpreting the instant.
#[derive(Debug, Clone, Serialize)]
struct Event {
    id: String,
    title: String,
    start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

/// Fields for `calendar.create`.
#[derive(Debug, Default)]
pub struct EventDraft {
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub location: Option<String>,
}

/// Partial fields for `calendar.update`.
#[derive(Debug, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    entries: BTreeMap<String, Event>,
}

/// The calendar store, guarded by its authorization grant.
#[derive(Debug)]
pub struct CalendarStore {
    auth: Authorization,
    inner: Mutex<State>,
}

impl CalendarStore {
    /// Creates an empty calendar.
    pub fn new(resolver: Arc<dyn AccessResolver>) -> Self {
        Self {
            auth: Authorization::new(Capability::Calendar, resolver),
            inner: Mutex::new(State::default()),
        }
    }

    /// The grant guarding this backend.
    pub const fn authorization(&self) -> &Authorization {
        &self.auth
    }

    /// Case-insensitive substring search over event titles.
    pub fn search(&self, query: &str) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let state = self.lock();
        let needle = query.to_lowercase();
        let matches: Vec<&Event> = state
            .entries
            .values()
            .filter(|event| event.title.to_lowercase().contains(&needle))
            .collect();
        to_wire(&matches)
    }

    /// Fetches one event by id.
    pub fn get(&self, id: &str) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let state = self.lock();
        let event = state
            .entries
            .get(id)
            .ok_or_else(|| CapabilityError::not_found("event", id))?;
        to_wire(event)
    }

    /// Lists up to `limit` events in id order.
    pub fn list(&self, limit: usize) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let state = self.lock();
        let page: Vec<&Event> = state.entries.values().take(limit).collect();
        to_wire(&page)
    }

    /// Creates an event.
    pub fn create(&self, draft: EventDraft) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("event-{}", state.next_id);
        let event = Event {
            id: id.clone(),
            title: draft.title,
            start: draft.start,
            end: draft.end,
            location: draft.location,
        };
        let wire = to_wire(&event)?;
        state.entries.insert(id, event);
        Ok(wire)
    }

    /// Applies a partial update.
    pub fn update(&self, id: &str, patch: EventPatch) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let mut state = self.lock();
        let event = state
            .entries
            .get_mut(id)
            .ok_or_else(|| CapabilityError::not_found("event", id))?;
        if let Some(title) = patch.title {
            event.title = title;
        }
        if let Some(start) = patch.start {
            event.start = start;
        }
        if let Some(end) = patch.end {
            event.end = Some(end);
        }
        if let Some(location) = patch.location {
            event.location = Some(location);
        }
        to_wire(event)
    }

    /// Deletes an event by id.
    pub fn delete(&self, id: &str) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let mut state = self.lock();
        if state.entries.remove(id).is_none() {
            return Err(CapabilityError::not_found("event", id));
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

    fn open_store() -> CalendarStore {
        CalendarStore::new(Arc::new(PolicyResolver::default()))
    }

    fn created_id(value: &Value) -> String {
        value
            .as_map()
            .and_then(|map| map.get("id"))
            .and_then(Value::as_str)
            .expect("id")
            .to_owned()
    }

    #[test]
    fn create_update_delete_round_trips() {
        let store = open_store();
        let created = store
            .create(EventDraft {
                title: "Standup".to_owned(),
                start: "2026-08-27T09:00:00Z".to_owned(),
                ..EventDraft::default()
            })
            .expect("create");
        let id = created_id(&created);

        let updated = store
            .update(
                &id,
                EventPatch {
                    location: Some("Room 2".to_owned()),
                    ..EventPatch::default()
                },
            )
            .expect("update");
        assert_eq!(
            updated.as_map().and_then(|m| m.get("location")).and_then(Value::as_str),
            Some("Room 2")
        );

        store.delete(&id).expect("delete");
        assert!(matches!(
            store.get(&id),
            Err(CapabilityError::NotFound { .. })
        ));
    }

    #[test]
    fn search_matches_titles() {
        let store = open_store();
        store
            .create(EventDraft {
                title: "Dentist appointment".to_owned(),
                start: "2026-09-01T14:00:00Z".to_owned(),
                ..EventDraft::default()
            })
            .expect("create");
        let hits = store.search("dentist").expect("search");
        assert_eq!(hits.as_list().map(<[Value]>::len), Some(1));
    }

    #[test]
    fn optional_fields_are_omitted_from_the_wire() {
        let store = open_store();
        let created = store
            .create(EventDraft {
                title: "Flight".to_owned(),
                start: "2026-10-02T06:30:00Z".to_owned(),
                ..EventDraft::default()
            })
            .expect("create");
        let map = created.as_map().expect("map");
        assert!(!map.contains_key("end"));
        assert!(!map.contains_key("location"));
    }
}
