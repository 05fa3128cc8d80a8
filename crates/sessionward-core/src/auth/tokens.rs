use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use super::storage::SlotStorage;

/// Slot holding the short-lived access token
const ACCESS_TOKEN_SLOT: &str = "access_token";

/// Slot holding the refresh token
const REFRESH_TOKEN_SLOT: &str = "refresh_token";

/// Access and refresh tokens persisted in two independent slots.
///
/// Every operation is infallible from the caller's point of view: storage
/// failures are logged and read back as "no token".
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn SlotStorage>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn SlotStorage>) -> Self {
        Self { storage }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_SLOT)
    }

    pub fn set_access_token(&self, token: &str) {
        self.write(ACCESS_TOKEN_SLOT, token);
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_SLOT)
    }

    pub fn set_refresh_token(&self, token: &str) {
        self.write(REFRESH_TOKEN_SLOT, token);
    }

    /// Remove both tokens
    pub fn clear_all(&self) {
        for slot in [ACCESS_TOKEN_SLOT, REFRESH_TOKEN_SLOT] {
            if let Err(e) = self.storage.remove(slot) {
                warn!(slot, error = %e, "Failed to clear token slot");
            }
        }
    }

    /// `Authorization: Bearer <access token>`, or an empty map when there is
    /// no usable token.
    pub fn auth_header(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.access_token() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(e) => warn!(error = %e, "Stored access token is not a valid header value"),
            }
        }
        headers
    }

    fn read(&self, slot: &str) -> Option<String> {
        match self.storage.get(slot) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                debug!(slot, error = %e, "Token slot unreadable, treating as absent");
                None
            }
        }
    }

    fn write(&self, slot: &str, value: &str) {
        if let Err(e) = self.storage.set(slot, value) {
            warn!(slot, error = %e, "Failed to persist token");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::storage::{MemoryStorage, StorageError};

    /// Storage that fails every call, like a browser with storage disabled.
    pub(crate) struct UnavailableStorage;

    impl SlotStorage for UnavailableStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    fn memory_store() -> TokenStore {
        TokenStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_tokens_are_independent_slots() {
        let store = memory_store();
        store.set_access_token("access");
        assert_eq!(store.access_token().as_deref(), Some("access"));
        assert_eq!(store.refresh_token(), None);

        store.set_refresh_token("refresh");
        assert_eq!(store.refresh_token().as_deref(), Some("refresh"));
    }

    #[test]
    fn test_clear_all_removes_both() {
        let store = memory_store();
        store.set_access_token("access");
        store.set_refresh_token("refresh");
        store.clear_all();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
    }

    #[test]
    fn test_auth_header_with_token() {
        let store = memory_store();
        store.set_access_token("abc.def.ghi");

        let headers = store.auth_header();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "Bearer abc.def.ghi"
        );
    }

    #[test]
    fn test_auth_header_without_token_is_empty() {
        assert!(memory_store().auth_header().is_empty());
    }

    #[test]
    fn test_auth_header_skips_unrepresentable_token() {
        let store = memory_store();
        store.set_access_token("bad\ntoken");
        assert!(store.auth_header().is_empty());
    }

    #[test]
    fn test_unavailable_storage_never_fails() {
        let store = TokenStore::new(Arc::new(UnavailableStorage));
        store.set_access_token("access");
        store.set_refresh_token("refresh");
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert!(store.auth_header().is_empty());
        store.clear_all();
    }
}
