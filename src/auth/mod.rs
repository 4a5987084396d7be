//! Credential handling and the token refresh machinery.

pub mod coordinator;
pub mod credentials;
pub mod jwt;
pub mod logout;
pub mod refresh;
pub mod session;
pub mod store;

pub use self::{
    coordinator::{Coordinator, Phase},
    credentials::{Credential, CredentialStore},
    logout::{LogoutCascade, Navigator, TracingNavigator},
    refresh::{HttpRefresher, RefreshError, RefreshExecutor, TokenPair},
    session::{Role, Session, User},
    store::{FileStore, KeyValueStore, MemoryStore},
};
