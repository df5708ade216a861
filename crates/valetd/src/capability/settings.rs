//! Key/value settings backend, optionally persisted to a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use valet_config::Capability;
use valet_protocol::Value;

use super::authorization::{AccessResolver, Authorization};
use super::error::CapabilityError;

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Value>,
}

/// The settings store behind `config.get` / `config.set`.
///
/// With a path, the store loads the file once at startup and rewrites it on
/// every `set`; without one it is purely in-memory. There is no durability
/// guarantee beyond the rewrite itself.
#[derive(Debug)]
pub struct SettingsStore {
    auth: Authorization,
    path: Option<PathBuf>,
    inner: Mutex<State>,
}

impl SettingsStore {
    /// Opens the store, loading persisted settings when `path` exists.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Store`] when the file exists but cannot be
    /// read or is not a JSON object.
    pub fn open(
        resolver: Arc<dyn AccessResolver>,
        path: Option<PathBuf>,
    ) -> Result<Self, CapabilityError> {
        let entries = match &path {
            Some(file) if file.exists() => load_entries(file)?,
            _ => BTreeMap::new(),
        };
        Ok(Self {
            auth: Authorization::new(Capability::Config, resolver),
            path,
            inner: Mutex::new(State { entries }),
        })
    }

    /// The grant guarding this backend.
    pub const fn authorization(&self) -> &Authorization {
        &self.auth
    }

    /// Reads one setting; absent keys succeed with `Null`.
    pub fn get(&self, key: &str) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let state = self.lock();
        Ok(state.entries.get(key).cloned().unwrap_or(Value::Null))
    }

    /// Writes one setting and returns the stored value.
    pub fn set(&self, key: &str, value: Value) -> Result<Value, CapabilityError> {
        self.auth.ensure_authorized()?;
        let mut state = self.lock();
        state.entries.insert(key.to_owned(), value.clone());
        if let Some(file) = &self.path {
            persist_entries(file, &state.entries)?;
        }
        Ok(value)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_entries(path: &PathBuf) -> Result<BTreeMap<String, Value>, CapabilityError> {
    let bytes = fs::read(path)
        .map_err(|error| CapabilityError::store(format!("read {}: {error}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|error| CapabilityError::store(format!("parse {}: {error}", path.display())))
}

fn persist_entries(
    path: &PathBuf,
    entries: &BTreeMap<String, Value>,
) -> Result<(), CapabilityError> {
    let rendered = serde_json::to_string_pretty(entries)
        .map_err(|error| CapabilityError::store(error.to_string()))?;
    fs::write(path, rendered)
        .map_err(|error| CapabilityError::store(format!("write {}: {error}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::super::authorization::PolicyResolver;
    use super::*;

    fn resolver() -> Arc<PolicyResolver> {
        Arc::new(PolicyResolver::default())
    }

    #[test]
    fn absent_keys_read_as_null() {
        let store = SettingsStore::open(resolver(), None).expect("open");
        assert_eq!(store.get("missing").expect("get"), Value::Null);
    }

    #[test]
    fn set_then_get_round_trips_in_memory() {
        let store = SettingsStore::open(resolver(), None).expect("open");
        store.set("voice", Value::str("quiet")).expect("set");
        assert_eq!(store.get("voice").expect("get"), Value::str("quiet"));
    }

    #[test]
    fn settings_survive_a_reopen_when_persisted() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");

        let store = SettingsStore::open(resolver(), Some(path.clone())).expect("open");
        store.set("greeting", Value::str("hello")).expect("set");
        store.set("retries", Value::Int(3)).expect("set");
        drop(store);

        let reopened = SettingsStore::open(resolver(), Some(path)).expect("reopen");
        assert_eq!(reopened.get("greeting").expect("get"), Value::str("hello"));
        assert_eq!(reopened.get("retries").expect("get"), Value::Int(3));
    }

    #[test]
    fn corrupt_settings_files_fail_to_open() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");
        fs::write(&path, b"not json").expect("write");

        assert!(matches!(
            SettingsStore::open(resolver(), Some(path)),
            Err(CapabilityError::Store { .. })
        ));
    }
}
