//! Exchange a refresh token for a new access token.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{auth::store, http::utils::ServerError};

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token available")]
    CredentialMissing,
    #[error("refresh rejected: {0}")]
    Rejected(#[from] ServerError),
    #[error("reqwest: {0}")]
    Network(#[from] reqwest::Error),
    #[error("refresh response carried no access token")]
    MissingAccessToken,
    #[error("refresh did not settle within {0:?}")]
    TimedOut(Duration),
    #[error("storing refreshed credential: {0}")]
    Store(#[from] store::Error),
    #[error("refresh task ended without a result")]
    Abandoned,
}

#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("rotated_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

#[async_trait::async_trait]
pub trait RefreshExecutor: Send + Sync {
    /// Called only with a non-empty token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError>;
}

/// Run `executor`, failing fast on an absent or empty token.
pub async fn execute(
    executor: &dyn RefreshExecutor,
    refresh_token: Option<&str>,
    deadline: Option<Duration>,
) -> Result<TokenPair, RefreshError> {
    let refresh_token = match refresh_token {
        Some(token) if !token.is_empty() => token,
        _ => return Err(RefreshError::CredentialMissing),
    };

    let pair = match deadline {
        Some(deadline) => tokio::time::timeout(deadline, executor.refresh(refresh_token))
            .await
            .map_err(|_| RefreshError::TimedOut(deadline))??,
        None => executor.refresh(refresh_token).await?,
    };

    if pair.access_token.is_empty() {
        return Err(RefreshError::MissingAccessToken);
    }
    Ok(pair)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// The new access token. A success response without one is a failure.
    access_token: Option<String>,
    /// Present when the server rotates the refresh token.
    refresh_token: Option<String>,
}

impl TryFrom<RefreshResponse> for TokenPair {
    type Error = RefreshError;

    fn try_from(res: RefreshResponse) -> Result<Self, Self::Error> {
        let RefreshResponse {
            access_token,
            refresh_token,
        } = res;
        let access_token = access_token
            .filter(|token| !token.is_empty())
            .ok_or(RefreshError::MissingAccessToken)?;
        Ok(Self {
            access_token,
            refresh_token: refresh_token.filter(|token| !token.is_empty()),
        })
    }
}

/// Calls `POST {base_url}/auth/refresh`.
pub struct HttpRefresher {
    pub client: reqwest::Client,
    pub base_url: String,
}

impl HttpRefresher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn perform(&self, refresh_token: &str) -> Result<RefreshResponse, RefreshError> {
        let url = format!("{}/auth/refresh", self.base_url.trim_end_matches('/'));

        let req = self
            .client
            .post(url)
            .json(&RefreshRequest { refresh_token })
            .build()?;

        let res = self.client.execute(req).await?;
        ServerError::check(res.status())?;
        let refresh_response = res.json().await?;
        Ok(refresh_response)
    }
}

#[async_trait::async_trait]
impl RefreshExecutor for HttpRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        let res = self.perform(refresh_token).await?;
        TokenPair::try_from(res)
    }
}
