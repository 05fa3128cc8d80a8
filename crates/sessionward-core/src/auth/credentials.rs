use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use keyring::Entry;

use super::storage::{SlotStorage, StorageError};

/// Keychain service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "sessionward";

/// Slots stored as OS keychain entries, one entry per slot key.
///
/// Entries are opened once per key and reused, so every operation on a slot
/// goes through the same credential handle.
pub struct KeyringStorage {
    service: String,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: &str) -> Result<Arc<Entry>, StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("keychain entries poisoned".to_string()))?;
        if let Some(entry) = entries.get(key) {
            return Ok(Arc::clone(entry));
        }
        let entry = Arc::new(Entry::new(&self.service, key)?);
        entries.insert(key.to_string(), Arc::clone(&entry));
        Ok(entry)
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl SlotStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStore;

    fn use_mock_keychain() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
    }

    #[test]
    fn test_slot_round_trip() {
        use_mock_keychain();
        let storage = KeyringStorage::new("sessionward-test");

        assert_eq!(storage.get("access_token").unwrap(), None);

        storage.set("access_token", "a.b.c").unwrap();
        assert_eq!(storage.get("access_token").unwrap().as_deref(), Some("a.b.c"));

        storage.set("access_token", "d.e.f").unwrap();
        assert_eq!(storage.get("access_token").unwrap().as_deref(), Some("d.e.f"));
        assert_eq!(storage.get("refresh_token").unwrap(), None);

        storage.remove("access_token").unwrap();
        assert_eq!(storage.get("access_token").unwrap(), None);
        storage.remove("access_token").unwrap();
    }

    #[test]
    fn test_token_store_on_keychain() {
        use_mock_keychain();
        let tokens = TokenStore::new(Arc::new(KeyringStorage::new("sessionward-test-tokens")));

        tokens.set_access_token("a.b.c");
        tokens.set_refresh_token("r.s.t");
        assert_eq!(tokens.access_token().as_deref(), Some("a.b.c"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r.s.t"));

        tokens.clear_all();
        assert_eq!(tokens.access_token(), None);
        assert_eq!(tokens.refresh_token(), None);
    }
}
