//! Transports: the one-shot request/response path and the live subscription interface.
//!
//! One-shot requests post a `{path, args, format}` envelope to
//! `<deployment>/api/<kind>` and decode the response envelope with
//! [`parse_envelope`]. Live subscriptions are provided by an external client
//! implementing [`LiveClient`].

use crate::auth::source::join_url;
use crate::auth::AuthTokenCoordinator;
use crate::error::QueryError;
use crate::function::{FunctionKind, FunctionReference};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Request envelope for the one-shot path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCall {
    pub path: String,
    pub args: Map<String, Value>,
    pub format: String,
}

impl RemoteCall {
    pub fn new(function: &FunctionReference, args: &Map<String, Value>) -> Self {
        Self {
            path: function.path(),
            args: args.clone(),
            format: "json".to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Envelope {
    Success {
        #[serde(default)]
        value: Value,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: Option<String>,
        #[serde(rename = "errorData")]
        error_data: Option<Value>,
    },
}

/// Decode a response envelope into its value, or into the application error it carries.
pub fn parse_envelope(body: Value) -> Result<Value, QueryError> {
    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|e| QueryError::InvalidResponse(format!("unrecognized response envelope: {}", e)))?;
    match envelope {
        Envelope::Success { value } => Ok(value),
        Envelope::Error {
            error_message,
            error_data,
        } => Err(QueryError::Application {
            message: error_message.unwrap_or_else(|| "Unknown error".to_string()),
            data: error_data,
        }),
    }
}

/// One-shot request/response transport. Returns the raw response envelope.
#[async_trait]
pub trait OneShotTransport: Send + Sync {
    async fn send(
        &self,
        kind: FunctionKind,
        call: &RemoteCall,
        bearer: Option<&str>,
    ) -> Result<Value, QueryError>;
}

pub(crate) fn map_http_error(error: reqwest::Error) -> QueryError {
    if error.is_timeout() {
        QueryError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        QueryError::Transport(format!("Connection error: {}", error))
    } else if error.is_decode() {
        QueryError::InvalidResponse(format!("Failed to decode response: {}", error))
    } else {
        QueryError::Transport(format!("HTTP error: {}", error))
    }
}

/// HTTP implementation of the one-shot path.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, QueryError> {
        if base_url.trim().is_empty() {
            return Err(QueryError::Configuration(
                "deployment URL is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| QueryError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, kind: FunctionKind) -> String {
        join_url(&self.base_url, &format!("api/{}", kind.as_str()))
    }
}

#[async_trait]
impl OneShotTransport for HttpTransport {
    async fn send(
        &self,
        kind: FunctionKind,
        call: &RemoteCall,
        bearer: Option<&str>,
    ) -> Result<Value, QueryError> {
        let mut request = self
            .client
            .post(self.endpoint(kind))
            .header("Content-Type", "application/json")
            .json(call);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        let response = request.send().await.map_err(map_http_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_http_error)?;
        // Application errors arrive as an error envelope on a non-2xx status.
        match serde_json::from_str::<Value>(&text) {
            Ok(body) if body.get("status").is_some() => Ok(body),
            _ if !status.is_success() => Err(QueryError::Transport(format!(
                "Request failed with status {}: {}",
                status, text
            ))),
            _ => Err(QueryError::InvalidResponse(format!(
                "response is not an envelope: {}",
                text
            ))),
        }
    }
}

/// Callback receiving each value pushed by a live subscription.
pub type UpdateCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Idempotent handle that ends a live subscription. Dropping it unsubscribes.
pub struct Unsubscribe {
    inner: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Unsubscribe {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Mutex::new(Some(Box::new(f))),
        }
    }

    pub fn noop() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub fn unsubscribe(&self) {
        let f = self.inner.lock().take();
        if let Some(f) = f {
            f();
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().is_some()
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Persistent push transport, consumed by the core.
pub trait LiveClient: Send + Sync {
    /// Open a live subscription. `on_update` may be called zero or more times,
    /// possibly from another thread, until the returned handle is used.
    fn subscribe(
        &self,
        function: &FunctionReference,
        args: &Map<String, Value>,
        on_update: UpdateCallback,
    ) -> Unsubscribe;

    /// Hand the client the token coordinator; its reconnect and refresh logic calls
    /// `fetch_token` directly.
    fn set_auth(&self, _auth: Arc<AuthTokenCoordinator>) {}
}
