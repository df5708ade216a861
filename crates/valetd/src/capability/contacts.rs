//! In-memory contact book backend.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use valet_config::Capability;
use valet_protocol::Value;

use super::authorization::{AccessResolver, Authorization};
use super::error::CapabilityError;
use super::to_wire;

/// One contact record.
#[derive(Debug, Clone, Serialize)]
struct Contact {
    id: String,
    name: String,
    phones: Vec<String>,
    emails: Vec<String>,
}

/// Fields for `contacts.create`.
#[derive(Debug, Default)]
pub struct ContactDraft {
    pub name: String,
    pub phones: Vec<String>,
    pub emails: Vec<String>,
}

/// Partial fields for `contacts.update`.
#[derive(Debug, Default)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub add_phone: Option<String>,
    pub add_email: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    entries: BTreeMap<String, Contact>,
}

/// The contact book, guarded by its authorization grant.
#[derive(Debug)]
pub struct ContactBook {
    auth: Authorization,
    inner: Mutex<State>,
}

impl ContactBook {
    /// Creates an empty contact book.
    pub fn new(resolver: Arc<dyn AccessResolver>) -> Self {
        Self {
            auth: Authorization::new(Capability::Contacts, resolver),
            inner: Mutex::new(State::default()),
        }
    }

    /// The grant guarding this backend.
    pub const fn authorization(&self) -> &Authorization {
        &self.auth
    }

    /// Case-insensitive substring search over contact names.
    pub fn search(&self, query: &str) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let state = self.lock();
        let needle = query.to_lowercase();
        let matches: Vec<&Contact> = state
            .entries
            .values()
            .filter(|contact| contact.name.to_lowercase().contains(&needle))
            .collect();
        to_wire(&matches)
    }

    /// Fetches one contact by id.
    pub fn get(&self, id: &str) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let state = self.lock();
        let contact = state
            .entries
            .get(id)
            .ok_or_else(|| CapabilityError::not_found("contact", id))?;
        to_wire(contact)
    }

    /// Lists up to `limit` contacts in id order.
    pub fn list(&self, limit: usize) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let state = self.lock();
        let page: Vec<&Contact> = state.entries.values().take(limit).collect();
        to_wire(&page)
    }

    /// Creates a contact, deduplicating the initial phone and email lists.
    pub fn create(&self, draft: ContactDraft) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("contact-{}", state.next_id);
        let mut contact = Contact {
            id: id.clone(),
            name: draft.name,
            phones: Vec::new(),
            emails: Vec::new(),
        };
        for phone in draft.phones {
            add_unique(&mut contact.phones, phone, normalize_phone);
        }
        for email in draft.emails {
            add_unique(&mut contact.emails, email, normalize_email);
        }
        let wire = to_wire(&contact)?;
        state.entries.insert(id, contact);
        Ok(wire)
    }

    /// Applies a partial update.
    ///
    /// Collection adds are set-like and idempotent: a phone or email already
    /// present after normalization leaves the stored list unchanged.
    pub fn update(&self, id: &str, patch: ContactPatch) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let mut state = self.lock();
        let contact = state
            .entries
            .get_mut(id)
            .ok_or_else(|| CapabilityError::not_found("contact", id))?;
        if let Some(name) = patch.name {
            contact.name = name;
        }
        if let Some(phone) = patch.add_phone {
            add_unique(&mut contact.phones, phone, normalize_phone);
        }
        if let Some(email) = patch.add_email {
            add_unique(&mut contact.emails, email, normalize_email);
        }
        to_wire(contact)
    }

    /// Deletes a contact by id.
    pub fn delete(&self, id: &str) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let mut state = self.lock();
        if state.entries.remove(id).is_none() {
            return Err(CapabilityError::not_found("contact", id));
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

/// Strips formatting from a phone number: digits plus a leading `+`.
fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut normalized = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        normalized.push('+');
    }
    normalized.extend(trimmed.chars().filter(char::is_ascii_digit));
    normalized
}

/// Case-folds an email address.
fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Appends `value` unless a normalized-equal entry already exists.
fn add_unique(list: &mut Vec<String>, value: String, normalize: fn(&str) -> String) -> bool {
    let normalized = normalize(&value);
    if list.iter().any(|existing| normalize(existing) == normalized) {
        return false;
    }
    list.push(value);
    true
}
