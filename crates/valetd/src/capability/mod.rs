//! Capability backends and their authorization state machines.
//!
//! Each backend guards one protected resource. Every operation calls
//! [`Authorization::ensure_authorized`] before touching its store, so a
//! denied or restricted grant surfaces as a single permission error with a
//! remediation hint. Stores serialize their own writes behind a `Mutex`;
//! the registry built at startup is immutable afterwards.

mod authorization;
mod calendar;
mod contacts;
mod error;
mod registry;
mod reminders;
mod settings;

use serde::Serialize;
use valet_protocol::Value;

pub use self::authorization::{
    AccessResolver, Authorization, AuthorizationState, PolicyResolver,
};
pub use self::calendar::{CalendarStore, EventDraft, EventPatch};
pub use self::contacts::{ContactBook, ContactDraft, ContactPatch};
pub use self::error::CapabilityError;
pub use self::registry::Backends;
pub use self::reminders::{ReminderDraft, ReminderPatch, ReminderStore};
pub use self::settings::SettingsStore;

/// Serializes a backend record into the wire value type.
fn to_wire<T: Serialize>(record: &T) -> Result<Value, CapabilityError> {
    serde_json::to_value(record)
        .map(Value::from)
        .map_err(|error| CapabilityError::store(error.to_string()))
}
