//! Single-flight token refresh for requests rejected with 401.
//!
//! The first unanswered 401 moves the coordinator from idle to refreshing and
//! starts one refresh. Every 401 that arrives while the refresh is in flight
//! is queued. When the refresh settles the trigger and the queue are replayed
//! with the new token in arrival order, or all of them fail with the same
//! error and the session is logged out.
//!
//! The in-flight check and the enqueue share one critical section with no
//! await point inside, so two refreshes can never start concurrently.

use std::{
    collections::VecDeque,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use futures::{future::join_all, FutureExt};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::{
    credentials::CredentialStore,
    logout::LogoutCascade,
    refresh::{self, RefreshError, RefreshExecutor, TokenPair},
};
use crate::http::{
    request::{RequestDescriptor, Response},
    transport::Transport,
    Error,
};

pub type Reply = Result<Response, Error>;
pub type TokenReply = Result<String, Arc<RefreshError>>;

/// A request suspended until the in-flight refresh settles.
struct PendingRequest {
    /// Already carries the incremented attempt count.
    request: RequestDescriptor,
    reply: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    queue: VecDeque<PendingRequest>,
    // Callers that only need the new token (the proactive request path).
    token_waiters: Vec<oneshot::Sender<TokenReply>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Refreshing,
}

pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<RefreshState>,
    credentials: Arc<CredentialStore>,
    executor: Arc<dyn RefreshExecutor>,
    transport: Arc<dyn Transport>,
    logout: Arc<LogoutCascade>,
    deadline: Option<Duration>,
}

impl Coordinator {
    pub fn new(
        credentials: Arc<CredentialStore>,
        executor: Arc<dyn RefreshExecutor>,
        transport: Arc<dyn Transport>,
        logout: Arc<LogoutCascade>,
    ) -> Self {
        let inner = Inner {
            state: Mutex::new(RefreshState::default()),
            credentials,
            executor,
            transport,
            logout,
            deadline: None,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Bound how long a refresh may take before it counts as failed.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.deadline = deadline,
            None => warn!("Coordinator already in use, deadline not applied"),
        }
        self
    }

    pub fn phase(&self) -> Phase {
        if self.inner.lock_state().in_flight {
            Phase::Refreshing
        } else {
            Phase::Idle
        }
    }

    pub fn queued(&self) -> usize {
        self.inner.lock_state().queue.len()
    }

    /// Resolve a 401 received for `request`.
    ///
    /// A request that was already retried gets its 401 back untouched.
    /// Otherwise the result is the outcome of replaying the request with the
    /// refreshed token, or the shared refresh failure.
    pub async fn handle_unauthorized(&self, request: RequestDescriptor, response: Response) -> Reply {
        if request.attempt() >= 1 {
            debug!(
                message = "Retried request rejected again, not refreshing",
                path = request.path(),
                attempt = request.attempt(),
            );
            return Ok(response);
        }

        let (reply, settled) = oneshot::channel();
        let pending = PendingRequest {
            request: request.retried(),
            reply,
        };

        let trigger = {
            let mut state = self.inner.lock_state();
            if state.in_flight {
                state.queue.push_back(pending);
                debug!(
                    message = "Refresh in flight, request queued",
                    queued = state.queue.len(),
                );
                None
            } else {
                state.in_flight = true;
                Some(pending)
            }
        };

        if let Some(trigger) = trigger {
            debug!(message = "Unauthorized response, starting refresh", path = request.path());
            self.spawn_refresh(Some(trigger));
        }

        settled.await.map_err(|_| Error::CoordinatorGone)?
    }

    /// Obtain a fresh access token, joining a refresh already in flight.
    pub async fn refresh(&self) -> TokenReply {
        let (reply, settled) = oneshot::channel();

        let start = {
            let mut state = self.inner.lock_state();
            state.token_waiters.push(reply);
            !std::mem::replace(&mut state.in_flight, true)
        };

        if start {
            self.spawn_refresh(None);
        }

        settled
            .await
            .unwrap_or_else(|_| Err(Arc::new(RefreshError::Abandoned)))
    }

    fn spawn_refresh(&self, trigger: Option<PendingRequest>) {
        let inner = Arc::clone(&self.inner);
        // Spawned so that dropping the triggering future cannot strand the queue.
        tokio::spawn(async move { inner.run(trigger).await });
    }
}

impl Inner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(&self, trigger: Option<PendingRequest>) {
        info!(message = "Refreshing access token");

        // A panicking executor or store must still leave the refreshing phase.
        let outcome = AssertUnwindSafe(self.exchange())
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!(message = "Token refresh panicked");
                Err(RefreshError::Abandoned)
            });

        match outcome {
            Ok(pair) => self.settle_success(trigger, pair).await,
            Err(err) => self.settle_failure(trigger, err),
        }
    }

    async fn exchange(&self) -> Result<TokenPair, RefreshError> {
        let refresh_token = self.credentials.refresh_token();
        let pair =
            refresh::execute(self.executor.as_ref(), refresh_token.as_deref(), self.deadline)
                .await?;
        self.credentials
            .rotate(&pair.access_token, pair.refresh_token.as_deref())?;
        Ok(pair)
    }

    /// Leave the refreshing phase, handing back everything that waited on it.
    fn drain(&self) -> (VecDeque<PendingRequest>, Vec<oneshot::Sender<TokenReply>>) {
        let mut state = self.lock_state();
        state.in_flight = false;
        (
            std::mem::take(&mut state.queue),
            std::mem::take(&mut state.token_waiters),
        )
    }

    async fn settle_success(&self, trigger: Option<PendingRequest>, pair: TokenPair) {
        let (queue, token_waiters) = self.drain();
        let token = pair.access_token;

        info!(
            message = "Access token refreshed",
            replaying = queue.len() + usize::from(trigger.is_some()),
            rotated_refresh_token = pair.refresh_token.is_some(),
        );

        for waiter in token_waiters {
            let _ = waiter.send(Ok(token.clone()));
        }

        // Resubmissions start in the order their 401 was observed.
        let replays = trigger
            .into_iter()
            .chain(queue)
            .map(|pending| self.replay(pending, &token));
        join_all(replays).await;
    }

    async fn replay(&self, pending: PendingRequest, token: &str) {
        let PendingRequest { request, reply } = pending;
        let request = request.authorized(Some(token));
        debug!(
            message = "Replaying request",
            path = request.path(),
            attempt = request.attempt(),
        );
        let outcome = self.transport.send(&request).await.map_err(Error::from);
        if reply.send(outcome).is_err() {
            debug!(message = "Caller went away before replay settled", path = request.path());
        }
    }

    fn settle_failure(&self, trigger: Option<PendingRequest>, err: RefreshError) {
        warn!(message = "Token refresh failed, logging out", error = %err);

        self.logout.logout();

        let (queue, token_waiters) = self.drain();
        let err = Arc::new(err);

        for waiter in token_waiters {
            let _ = waiter.send(Err(Arc::clone(&err)));
        }
        for pending in trigger.into_iter().chain(queue) {
            let _ = pending.reply.send(Err(Error::Refresh(Arc::clone(&err))));
        }
    }
}
