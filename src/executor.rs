//! Query execution over the two transports.
//!
//! At render time values come from a single HTTP request. Once interactive they
//! come from the first value pushed on a live subscription, which is released as
//! soon as that value arrives; ongoing updates are the binding's concern.

use crate::auth::AuthTokenCoordinator;
use crate::error::QueryError;
use crate::function::FunctionReference;
use crate::transport::{parse_envelope, LiveClient, OneShotTransport, RemoteCall, UpdateCallback};
use futures::channel::oneshot;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where the executor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContext {
    /// Server-side rendering: one-shot requests only.
    Render,
    /// Interactive client: live subscriptions available.
    Interactive,
}

pub struct QueryExecutor {
    context: ExecutionContext,
    transport: Option<Arc<dyn OneShotTransport>>,
    live: Option<Arc<dyn LiveClient>>,
    auth: Option<Arc<AuthTokenCoordinator>>,
}

impl QueryExecutor {
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            transport: None,
            live: None,
            auth: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn OneShotTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_live_client(mut self, live: Arc<dyn LiveClient>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn with_auth(mut self, auth: Arc<AuthTokenCoordinator>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn auth(&self) -> Option<&Arc<AuthTokenCoordinator>> {
        self.auth.as_ref()
    }

    pub fn live_client(&self) -> Result<&Arc<dyn LiveClient>, QueryError> {
        if self.context == ExecutionContext::Render {
            return Err(QueryError::ClientUnavailable(
                "live subscriptions are not available during render".to_string(),
            ));
        }
        self.live.as_ref().ok_or_else(|| {
            QueryError::ClientUnavailable("no live transport client is configured".to_string())
        })
    }

    /// One request/response round trip. The endpoint follows the function's kind;
    /// non-public calls carry a bearer token when one is available.
    pub async fn fetch_once(
        &self,
        function: &FunctionReference,
        args: &Map<String, Value>,
        public: bool,
    ) -> Result<Value, QueryError> {
        let transport = self.transport.as_ref().ok_or_else(|| {
            QueryError::Configuration("deployment URL is not configured".to_string())
        })?;

        let bearer = if public { None } else { self.bearer().await };
        let call = RemoteCall::new(function, args);
        debug!(function = %function, authenticated = bearer.is_some(), "one-shot request");

        let body = transport
            .send(function.kind, &call, bearer.as_deref())
            .await
            .map_err(|err| {
                warn!(function = %function, error = %err, "one-shot request failed");
                err
            })?;
        parse_envelope(body)
    }

    /// Run a mutation or action. These always take the one-shot path, whatever
    /// the context.
    pub async fn call(
        &self,
        function: &FunctionReference,
        args: &Map<String, Value>,
        public: bool,
    ) -> Result<Value, QueryError> {
        self.fetch_once(function, args, public).await
    }

    /// Open a live subscription and resolve with its first pushed value, then
    /// release that subscription.
    pub async fn first_result(
        &self,
        function: &FunctionReference,
        args: &Map<String, Value>,
    ) -> Result<Value, QueryError> {
        let live = self.live_client()?;
        let (tx, rx) = oneshot::channel();
        let sender = Arc::new(Mutex::new(Some(tx)));
        let on_update: UpdateCallback = Arc::new(move |value| {
            if let Some(tx) = sender.lock().take() {
                let _ = tx.send(value);
            }
        });

        let unsubscribe = live.subscribe(function, args, on_update);
        let first = rx.await;
        unsubscribe.unsubscribe();

        first.map_err(|_| {
            QueryError::Transport(format!(
                "live subscription for {} closed before its first value",
                function
            ))
        })
    }

    /// Initial value for a query, using the path appropriate to the context.
    pub async fn initial_value(
        &self,
        function: &FunctionReference,
        args: &Map<String, Value>,
        public: bool,
    ) -> Result<Value, QueryError> {
        match self.context {
            ExecutionContext::Render => self.fetch_once(function, args, public).await,
            ExecutionContext::Interactive => self.first_result(function, args).await,
        }
    }

    async fn bearer(&self) -> Option<String> {
        match &self.auth {
            Some(auth) => auth.fetch_token(false).await,
            None => None,
        }
    }
}
