//! Authenticated HTTP client.
//!
//! Every request gets the stored access token attached before it is sent.
//! A 401 answer is handed to the [`Coordinator`], which refreshes the token
//! once for all concurrently rejected requests and replays them. Callers only
//! ever see the final outcome.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use self::{
    request::{RequestDescriptor, Response},
    transport::Transport,
    utils::{check_status, ServerError},
};
use crate::auth::{jwt, Coordinator, CredentialStore, RefreshError};

pub mod request;
pub mod transport;
pub mod utils;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport: {0}")]
    Transport(#[from] transport::Error),
    #[error("server: {0}")]
    Server(#[from] ServerError),
    #[error("refresh: {0}")]
    Refresh(#[source] Arc<RefreshError>),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("refresh coordinator dropped the request")]
    CoordinatorGone,
}

impl Error {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Server(ServerError { status_code }) => Some(*status_code),
            _ => None,
        }
    }
}

pub struct Client {
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialStore>,
    coordinator: Coordinator,
    proactive_refresh: bool,
}

impl Client {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialStore>,
        coordinator: Coordinator,
    ) -> Self {
        Self {
            transport,
            credentials,
            coordinator,
            proactive_refresh: false,
        }
    }

    /// Refresh an expired access token before sending instead of waiting for the 401.
    pub fn with_proactive_refresh(mut self, enabled: bool) -> Self {
        self.proactive_refresh = enabled;
        self
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Attach the current access token, if any.
    async fn intercept(&self, request: RequestDescriptor) -> Result<RequestDescriptor, Error> {
        let mut token = self.credentials.access_token();

        if self.proactive_refresh {
            if let Some(current) = &token {
                if !jwt::is_valid(current) {
                    debug!(message = "Stored access token expired, refreshing before send");
                    token = Some(self.coordinator.refresh().await.map_err(Error::Refresh)?);
                }
            }
        }

        Ok(request.authorized(token.as_deref()))
    }

    /// Send `request`, refreshing and replaying once on 401.
    ///
    /// Non-2xx outcomes, including a second 401, surface as [`Error::Server`].
    pub async fn execute(&self, request: RequestDescriptor) -> Result<Response, Error> {
        let request = self.intercept(request).await?;
        let res = self.transport.send(&request).await?;

        let res = if res.status() == StatusCode::UNAUTHORIZED {
            self.coordinator.handle_unauthorized(request, res).await?
        } else {
            res
        };

        check_status(&res)?;
        Ok(res)
    }

    pub async fn execute_json<T>(&self, request: RequestDescriptor) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let res = self.execute(request).await?;
        Self::parse_json(&res)
    }

    pub async fn send_json<B, T>(&self, request: RequestDescriptor, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let res = self.execute(request.with_json(body)).await?;
        Self::parse_json(&res)
    }

    /// Execute and discard the body, for endpoints that may answer 204.
    pub async fn execute_empty(&self, request: RequestDescriptor) -> Result<(), Error> {
        self.execute(request).await?;
        Ok(())
    }

    fn parse_json<T>(res: &Response) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        res.json().map_err(Error::Json)
    }
}
