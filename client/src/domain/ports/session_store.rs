//! Driven port for durable session storage.
//!
//! Two keys are stored: the raw bearer token and the serialised user. Every
//! writer overwrites whole keys; there are no partial-field updates.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::define_port_error;

/// Named keys held in durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Raw bearer token.
    Token,
    /// JSON-serialised user profile.
    User,
}

impl StorageKey {
    /// All keys, in the order they are cleared.
    pub const ALL: [Self; 2] = [Self::Token, Self::User];

    /// Storage name of the key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::User => "user",
        }
    }
}

define_port_error! {
    /// Errors surfaced by session storage.
    pub enum SessionStoreError {
        /// The backing medium could not be read or written.
        Io { message: String } =>
            "session storage i/o failed: {message}",
    }
}

/// Port for `get/set/remove/clear` on named keys.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    /// Read a key; `None` when absent.
    fn get(&self, key: StorageKey) -> Result<Option<String>, SessionStoreError>;

    /// Overwrite a key.
    fn set(&self, key: StorageKey, value: &str) -> Result<(), SessionStoreError>;

    /// Delete a key; deleting an absent key succeeds.
    fn remove(&self, key: StorageKey) -> Result<(), SessionStoreError>;

    /// Delete every session key.
    fn clear(&self) -> Result<(), SessionStoreError> {
        for key in StorageKey::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Process-local store, used when no durable directory is configured and in
/// tests.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<StorageKey, String>>,
}

impl InMemorySessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (StorageKey, &'a str)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key, value.to_owned()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<StorageKey, String>>, SessionStoreError> {
        self.entries
            .lock()
            .map_err(|_| SessionStoreError::io("in-memory session store lock poisoned"))
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, SessionStoreError> {
        Ok(self.lock()?.get(&key).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), SessionStoreError> {
        self.lock()?.insert(key, value.to_owned());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), SessionStoreError> {
        self.lock()?.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[test]
    fn set_get_remove_round_trip() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get(StorageKey::Token).expect("get"), None);

        store.set(StorageKey::Token, "t1").expect("set");
        assert_eq!(store.get(StorageKey::Token).expect("get").as_deref(), Some("t1"));

        store.remove(StorageKey::Token).expect("remove");
        store.remove(StorageKey::Token).expect("removing twice is fine");
        assert_eq!(store.get(StorageKey::Token).expect("get"), None);
    }

    #[test]
    fn clear_removes_every_key() {
        let store = InMemorySessionStore::with_entries([
            (StorageKey::Token, "t1"),
            (StorageKey::User, r#"{"id":"1","username":"alice"}"#),
        ]);
        store.clear().expect("clear");
        for key in StorageKey::ALL {
            assert_eq!(store.get(key).expect("get"), None, "{} survived", key.as_str());
        }
    }
}
