//! Test doubles for the transports and the token endpoint.

use async_trait::async_trait;
use livequery::auth::{AuthTokenCoordinator, TokenFetch, TokenSource};
use livequery::transport::RemoteCall;
use livequery::{FunctionKind, FunctionReference, LiveClient, OneShotTransport, QueryError, Unsubscribe, UpdateCallback};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// One-shot transport that records every request. Requests whose `id` argument has
/// a gate wait until the test releases it; all others echo their arguments.
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<(FunctionKind, RemoteCall, Option<String>)>>,
    gates: Mutex<HashMap<i64, oneshot::Receiver<Value>>>,
}

impl MockTransport {
    pub fn gate(&self, id: i64) -> oneshot::Sender<Value> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(id, rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn bearers(&self) -> Vec<Option<String>> {
        self.requests.lock().iter().map(|(_, _, b)| b.clone()).collect()
    }

    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl OneShotTransport for MockTransport {
    async fn send(
        &self,
        kind: FunctionKind,
        call: &RemoteCall,
        bearer: Option<&str>,
    ) -> Result<Value, QueryError> {
        let id = call.args.get("id").and_then(Value::as_i64);
        let gate = id.and_then(|id| self.gates.lock().remove(&id));
        self.requests
            .lock()
            .push((kind, call.clone(), bearer.map(str::to_string)));
        let value = match gate {
            Some(rx) => rx.await.unwrap_or(Value::Null),
            None => Value::Object(call.args.clone()),
        };
        Ok(json!({ "status": "success", "value": value }))
    }
}

/// Live client that answers every subscription with `initial` and lets the test
/// push further values to all open subscriptions.
pub struct MockLive {
    initial: Value,
    open: Arc<Mutex<Vec<(usize, String, UpdateCallback)>>>,
    opened: AtomicUsize,
    auth: Mutex<Option<Arc<AuthTokenCoordinator>>>,
}

impl MockLive {
    pub fn new(initial: Value) -> Self {
        Self {
            initial,
            open: Arc::new(Mutex::new(Vec::new())),
            opened: AtomicUsize::new(0),
            auth: Mutex::new(None),
        }
    }

    /// Subscriptions currently open.
    pub fn active(&self) -> usize {
        self.open.lock().len()
    }

    /// Subscriptions opened over the client's lifetime.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn push(&self, path: &str, value: Value) {
        let callbacks: Vec<UpdateCallback> = self
            .open
            .lock()
            .iter()
            .filter(|(_, p, _)| p == path)
            .map(|(_, _, cb)| cb.clone())
            .collect();
        for cb in callbacks {
            cb(value.clone());
        }
    }

    pub fn auth(&self) -> Option<Arc<AuthTokenCoordinator>> {
        self.auth.lock().clone()
    }
}

impl LiveClient for MockLive {
    fn subscribe(
        &self,
        function: &FunctionReference,
        _args: &Map<String, Value>,
        on_update: UpdateCallback,
    ) -> Unsubscribe {
        let id = self.opened.fetch_add(1, Ordering::SeqCst);
        self.open
            .lock()
            .push((id, function.path(), on_update.clone()));
        on_update(self.initial.clone());
        let open = self.open.clone();
        Unsubscribe::new(move || open.lock().retain(|(sid, _, _)| *sid != id))
    }

    fn set_auth(&self, auth: Arc<AuthTokenCoordinator>) {
        *self.auth.lock() = Some(auth);
    }
}

/// Token endpoint that counts calls and always issues the same token.
#[derive(Default)]
pub struct CountingTokenSource {
    calls: AtomicUsize,
}

impl CountingTokenSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for CountingTokenSource {
    async fn fetch_remote_token(&self) -> Result<TokenFetch, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TokenFetch::Token("refreshed-token".to_string()))
    }
}

pub fn args(value: Value) -> livequery::QueryArgs {
    livequery::QueryArgs::from_serialize(&value).unwrap()
}
