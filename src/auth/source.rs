//! Token sources: where fresh credentials come from.

use crate::error::QueryError;
use crate::transport::map_http_error;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Outcome of a remote token request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenFetch {
    Token(String),
    Error(String),
}

/// Injected async function that obtains a fresh token from the identity provider.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_remote_token(&self) -> Result<TokenFetch, QueryError>;
}

#[derive(Deserialize)]
struct TokenBody {
    token: Option<String>,
    error: Option<serde_json::Value>,
}

/// Fetches tokens from the site's auth forwarding endpoint over HTTP.
pub struct HttpTokenSource {
    client: Client,
    url: String,
    cookie: Option<String>,
}

impl HttpTokenSource {
    pub fn new(site_url: &str, token_path: &str, timeout: Duration) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: join_url(site_url, token_path),
            cookie: None,
        })
    }

    /// Forward the caller's session cookie (render-time requests carry no cookie jar).
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    async fn fetch_remote_token(&self) -> Result<TokenFetch, QueryError> {
        let mut request = self.client.get(&self.url);
        if let Some(cookie) = &self.cookie {
            request = request.header("Cookie", cookie);
        }
        let response = request.send().await.map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Ok(TokenFetch::Error(format!("status {}: {}", status, text)));
        }

        let body: TokenBody = response
            .json()
            .await
            .map_err(|e| QueryError::InvalidResponse(format!("Failed to parse token response: {}", e)))?;
        Ok(token_fetch_from_body(body))
    }
}

fn token_fetch_from_body(body: TokenBody) -> TokenFetch {
    match (body.token, body.error) {
        (Some(token), _) if !token.is_empty() => TokenFetch::Token(token),
        (_, Some(error)) => TokenFetch::Error(match error {
            serde_json::Value::String(message) => message,
            other => other.to_string(),
        }),
        _ => TokenFetch::Error("response carried no token".to_string()),
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
