//! Clearing the session and sending the user back to the login entry point.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{debug, info, warn};

use super::credentials::CredentialStore;

pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

/// Records the redirect in the log. Suitable for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn redirect(&self, path: &str) {
        info!(message = "Redirecting to unauthenticated entry point", path);
    }
}

pub struct LogoutCascade {
    credentials: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    // Set once a redirect has been issued; cleared again on login.
    navigated: AtomicBool,
}

impl LogoutCascade {
    pub fn new(
        credentials: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            navigator,
            login_path: login_path.into(),
            navigated: AtomicBool::new(false),
        }
    }

    /// Clear the credential store and redirect, at most once per session.
    ///
    /// Re-entrant: overlapping calls from the request and response paths
    /// both clear the store, only the first navigates.
    pub fn logout(&self) {
        if let Err(err) = self.credentials.clear() {
            warn!(message = "Failed to clear credentials during logout", error = %err);
        }

        if self
            .navigated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!(message = "Logged out", login_path = %self.login_path);
            self.navigator.redirect(&self.login_path);
        } else {
            debug!(message = "Logout already navigated, skipping redirect");
        }
    }

    /// Allow the next logout to navigate again.
    pub fn arm(&self) {
        self.navigated.store(false, Ordering::Release);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::auth::store::MemoryStore;

    #[derive(Default)]
    pub(crate) struct RecordingNavigator {
        pub(crate) paths: Mutex<Vec<String>>,
    }

    impl RecordingNavigator {
        pub(crate) fn count(&self) -> usize {
            self.paths.lock().unwrap().len()
        }
    }

    impl Navigator for RecordingNavigator {
        fn redirect(&self, path: &str) {
            self.paths.lock().unwrap().push(path.to_owned());
        }
    }

    fn cascade() -> (Arc<CredentialStore>, Arc<RecordingNavigator>, LogoutCascade) {
        let credentials = Arc::new(CredentialStore::new(Arc::new(MemoryStore::new())));
        let navigator = Arc::new(RecordingNavigator::default());
        let cascade = LogoutCascade::new(credentials.clone(), navigator.clone(), "/login");
        (credentials, navigator, cascade)
    }

    #[test]
    fn twice_is_same_as_once() {
        let (credentials, navigator, cascade) = cascade();
        credentials.set("a1", "r1").unwrap();

        cascade.logout();
        cascade.logout();

        assert_eq!(credentials.get(), None);
        assert_eq!(*navigator.paths.lock().unwrap(), vec!["/login".to_owned()]);
    }

    #[test]
    fn arm_allows_next_redirect() {
        let (_credentials, navigator, cascade) = cascade();
        cascade.logout();
        cascade.arm();
        cascade.logout();
        assert_eq!(navigator.count(), 2);
    }

    #[test]
    fn concurrent_logouts_navigate_once() {
        let (credentials, navigator, cascade) = cascade();
        credentials.set("a1", "r1").unwrap();
        let cascade = Arc::new(cascade);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cascade = cascade.clone();
                std::thread::spawn(move || cascade.logout())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(credentials.get(), None);
        assert_eq!(navigator.count(), 1);
    }
}
