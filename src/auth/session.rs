//! Login state derived from the stored access token.

use std::sync::Arc;

use tracing::{info, warn};

use super::{
    credentials::CredentialStore,
    jwt::{self, Claims},
    logout::LogoutCascade,
    store,
};

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("access token could not be decoded: {0}")]
    Token(#[from] jwt::Error),
    #[error("store: {0}")]
    Store(#[from] store::Error),
}

/// Ordered from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    const HIERARCHY: [Role; 3] = [Role::Admin, Role::Teacher, Role::Student];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: Option<String>,
    /// Every scope entry with the `ROLE_` prefix removed.
    pub roles: Vec<String>,
    /// Highest known role among `roles`.
    pub role: Option<Role>,
    pub expires_at: Option<i64>,
}

impl User {
    pub fn from_claims(claims: Claims) -> Self {
        let roles: Vec<String> = claims
            .scope
            .as_deref()
            .unwrap_or_default()
            .split(' ')
            .filter(|scope| !scope.is_empty())
            .map(|scope| scope.strip_prefix("ROLE_").unwrap_or(scope).to_owned())
            .collect();

        let role = Role::HIERARCHY
            .into_iter()
            .find(|role| roles.iter().any(|name| name == role.as_str()));

        Self {
            email: claims.sub,
            roles,
            role,
            expires_at: claims.exp,
        }
    }

    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        self.role.is_some_and(|role| allowed.contains(&role))
    }
}

pub struct Session {
    credentials: Arc<CredentialStore>,
    logout: Arc<LogoutCascade>,
}

impl Session {
    pub fn new(credentials: Arc<CredentialStore>, logout: Arc<LogoutCascade>) -> Self {
        Self {
            credentials,
            logout,
        }
    }

    /// Store the pair handed over by the login form.
    ///
    /// A pair whose access token cannot be decoded is not kept: the session is
    /// logged out instead.
    pub fn login(&self, access_token: &str, refresh_token: &str) -> Result<User, LoginError> {
        let claims = match jwt::decode_claims(access_token) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(message = "Rejecting login with undecodable access token", error = %err);
                self.logout.logout();
                return Err(err.into());
            }
        };

        self.credentials.set(access_token, refresh_token)?;
        self.logout.arm();

        let user = User::from_claims(claims);
        info!(message = "Logged in", role = ?user.role);
        Ok(user)
    }

    /// The user behind the stored access token, while it is unexpired.
    ///
    /// An expired token still counts as a session for the HTTP client, which
    /// refreshes it on the next rejected call.
    pub fn current_user(&self) -> Option<User> {
        let token = self.credentials.access_token()?;
        if !jwt::is_valid(&token) {
            return None;
        }
        jwt::decode_claims(&token).ok().map(User::from_claims)
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn logout(&self) {
        self.logout.logout();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::auth::{logout::tests::RecordingNavigator, store::MemoryStore};

    fn session() -> (Arc<CredentialStore>, Arc<RecordingNavigator>, Session) {
        let credentials = Arc::new(CredentialStore::new(Arc::new(MemoryStore::new())));
        let navigator = Arc::new(RecordingNavigator::default());
        let logout = Arc::new(LogoutCascade::new(
            credentials.clone(),
            navigator.clone(),
            "/login",
        ));
        (credentials.clone(), navigator, Session::new(credentials, logout))
    }

    fn token(scope: &str, exp: i64) -> String {
        jwt::encode_unsigned(&json!({
            "sub": "grace@example.com",
            "scope": scope,
            "exp": exp,
        }))
    }

    #[test]
    fn highest_role_wins() {
        let (_, _, session) = session();
        let user = session
            .login(&token("ROLE_STUDENT ROLE_TEACHER", 4_000_000_000), "r1")
            .unwrap();
        assert_eq!(user.role, Some(Role::Teacher));
        assert_eq!(user.roles, ["STUDENT", "TEACHER"]);
        assert_eq!(user.email.as_deref(), Some("grace@example.com"));
        assert!(user.has_any_role(&[Role::Admin, Role::Teacher]));
        assert!(!user.has_any_role(&[Role::Admin]));
    }

    #[test]
    fn unknown_roles_have_no_rank() {
        let user = User::from_claims(Claims {
            sub: None,
            scope: Some("ROLE_GUEST read".into()),
            exp: None,
        });
        assert_eq!(user.roles, ["GUEST", "read"]);
        assert_eq!(user.role, None);
        assert!(!user.has_any_role(&[Role::Student]));
    }

    #[test]
    fn expired_token_is_not_a_current_user() {
        let (credentials, _, session) = session();
        session.login(&token("ROLE_ADMIN", 1), "r1").unwrap();
        assert!(credentials.get().is_some());
        assert_eq!(session.current_user(), None);
        assert!(!session.is_logged_in());
    }

    #[test]
    fn bad_token_logs_out() {
        let (credentials, navigator, session) = session();
        credentials.set("old", "r0").unwrap();
        assert!(session.login("garbage", "r1").is_err());
        assert_eq!(credentials.get(), None);
        assert_eq!(navigator.count(), 1);
    }

    #[test]
    fn login_rearms_logout_navigation() {
        let (_, navigator, session) = session();
        session.logout();
        session.login(&token("ROLE_STUDENT", 4_000_000_000), "r1").unwrap();
        assert!(session.is_logged_in());
        session.logout();
        assert!(!session.is_logged_in());
        assert_eq!(navigator.count(), 2);
    }
}
