//! The access/refresh token pair for the current session.

use std::sync::{Arc, Mutex, PoisonError};

use super::store::{self, KeyValueStore};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Holds at most one credential pair. No validation is performed here.
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    // Serializes the two-key writes so readers never see a mixed pair.
    lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// The stored pair, or `None` when either half is missing.
    pub fn get(&self) -> Option<Credential> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let access_token = self.store.get(ACCESS_TOKEN_KEY)?;
        let refresh_token = self.store.get(REFRESH_TOKEN_KEY)?;
        Some(Credential {
            access_token,
            refresh_token,
        })
    }

    pub fn access_token(&self) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// Replace the stored pair.
    pub fn set(&self, access_token: &str, refresh_token: &str) -> Result<(), store::Error> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.set(ACCESS_TOKEN_KEY, access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, refresh_token)
    }

    /// Replace the access token, keeping the refresh token unless a new one is given.
    pub fn rotate(&self, access_token: &str, refresh_token: Option<&str>) -> Result<(), store::Error> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.set(ACCESS_TOKEN_KEY, access_token)?;
        if let Some(refresh_token) = refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh_token)?;
        }
        Ok(())
    }

    /// Safe to call when already empty.
    pub fn clear(&self) -> Result<(), store::Error> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryStore;

    fn credentials() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn set_replaces_pair() {
        let creds = credentials();
        creds.set("a1", "r1").unwrap();
        creds.set("a2", "r2").unwrap();
        assert_eq!(
            creds.get(),
            Some(Credential {
                access_token: "a2".into(),
                refresh_token: "r2".into(),
            })
        );
    }

    #[test]
    fn missing_half_reads_as_logged_out() {
        let backing = Arc::new(MemoryStore::new());
        backing.set(ACCESS_TOKEN_KEY, "a1").unwrap();
        let creds = CredentialStore::new(backing);
        assert_eq!(creds.get(), None);
        assert_eq!(creds.access_token().as_deref(), Some("a1"));
    }

    #[test]
    fn rotate_keeps_refresh_token() {
        let creds = credentials();
        creds.set("a1", "r1").unwrap();
        creds.rotate("a2", None).unwrap();
        assert_eq!(creds.refresh_token().as_deref(), Some("r1"));
        creds.rotate("a3", Some("r3")).unwrap();
        assert_eq!(creds.access_token().as_deref(), Some("a3"));
        assert_eq!(creds.refresh_token().as_deref(), Some("r3"));
    }

    #[test]
    fn clear_twice() {
        let creds = credentials();
        creds.set("a1", "r1").unwrap();
        creds.clear().unwrap();
        creds.clear().unwrap();
        assert_eq!(creds.access_token(), None);
        assert_eq!(creds.refresh_token(), None);
    }
}
