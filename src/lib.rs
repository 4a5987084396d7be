pub mod api;
pub mod auth;
pub mod config;
pub mod http;

use std::sync::Arc;

use self::{
    auth::{
        Coordinator, CredentialStore, FileStore, HttpRefresher, KeyValueStore, LogoutCascade,
        MemoryStore, Navigator, Session,
    },
    config::Config,
    http::{transport::ReqwestTransport, Client},
};

/// Wire the credential store, coordinator and client described by `config`.
pub fn bootstrap(
    config: &Config,
    navigator: Arc<dyn Navigator>,
) -> Result<(Client, Session), reqwest::Error> {
    let reqwest_client = reqwest::Client::builder().build()?;

    let store: Arc<dyn KeyValueStore> = match &config.token_file {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    };
    let credentials = Arc::new(CredentialStore::new(store));
    let logout = Arc::new(LogoutCascade::new(
        credentials.clone(),
        navigator,
        config.login_path.clone(),
    ));

    let transport = Arc::new(ReqwestTransport::new(
        reqwest_client.clone(),
        config.api_url.clone(),
    ));
    let refresher = Arc::new(HttpRefresher::new(reqwest_client, config.api_url.clone()));

    let coordinator = Coordinator::new(
        credentials.clone(),
        refresher,
        transport.clone(),
        logout.clone(),
    )
    .with_deadline(config.refresh_timeout);

    let client = Client::new(transport, credentials.clone(), coordinator)
        .with_proactive_refresh(config.proactive_refresh);
    let session = Session::new(credentials, logout);

    Ok((client, session))
}
