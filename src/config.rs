//! Configuration System
//!
//! Layered configuration for a query session: deployment endpoint, auth token
//! coordination, query defaults and logging. Sources are merged by [`ConfigLoader`]
//! with environment variable overrides applied last.

use crate::auth::DEFAULT_TOKEN_TTL;
use crate::error::QueryError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveQueryConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub query: QueryDefaults,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote function deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Deployment URL. Required before any one-shot request is made.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl EndpointConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Token coordination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Site hosting the auth forwarding endpoint.
    #[serde(default)]
    pub site_url: Option<String>,

    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Window after a validation during which forced refreshes reuse the token.
    #[serde(default = "default_token_ttl_ms")]
    pub token_ttl_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_token_path() -> String {
    "/api/auth/convex/token".to_string()
}

fn default_token_ttl_ms() -> u64 {
    DEFAULT_TOKEN_TTL.as_millis() as u64
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            site_url: None,
            token_path: default_token_path(),
            token_ttl_ms: default_token_ttl_ms(),
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_millis(self.token_ttl_ms)
    }
}

/// Defaults applied to every binding created by a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDefaults {
    #[serde(default = "default_true")]
    pub server: bool,

    #[serde(default = "default_true")]
    pub subscribe: bool,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            server: true,
            subscribe: true,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Endpoint(String),
    Auth(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Endpoint(msg) => write!(f, "Endpoint: {}", msg),
            ValidationError::Auth(msg) => write!(f, "Auth: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

fn is_http_url(url: &str) -> bool {
    (url.starts_with("http://") || url.starts_with("https://"))
        && url.split("://").nth(1).is_some_and(|rest| !rest.is_empty())
}

impl LiveQueryConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(url) = &self.endpoint.url {
            if !is_http_url(url) {
                errors.push(ValidationError::Endpoint(format!(
                    "url must start with http:// or https://, got '{}'",
                    url
                )));
            }
        }
        if self.endpoint.request_timeout_ms == 0 {
            errors.push(ValidationError::Endpoint(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if let Some(site_url) = &self.auth.site_url {
            if !is_http_url(site_url) {
                errors.push(ValidationError::Auth(format!(
                    "site_url must start with http:// or https://, got '{}'",
                    site_url
                )));
            }
        }
        if self.auth.token_ttl_ms == 0 {
            errors.push(ValidationError::Auth(
                "token_ttl_ms must be greater than zero".to_string(),
            ));
        }
        if !self.auth.token_path.starts_with('/') {
            errors.push(ValidationError::Auth(format!(
                "token_path must start with '/', got '{}'",
                self.auth.token_path
            )));
        }

        if !matches!(self.logging.format.as_str(), "json" | "text") {
            errors.push(ValidationError::Logging(format!(
                "format must be 'json' or 'text', got '{}'",
                self.logging.format
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every problem into one configuration error.
    pub fn ensure_valid(&self) -> Result<(), QueryError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            QueryError::Configuration(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })
    }
}
