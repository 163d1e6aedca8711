//! Authentication token coordination.
//!
//! The coordinator reconciles a token hydrated at render time with tokens fetched
//! later on the interactive side. Both transports ask it for credentials; the live
//! transport's reconnect heuristics arrive as `fetch_token(true)` calls and are
//! debounced by the validation TTL.

pub mod identity;
pub mod source;

pub use identity::{decode_identity, UserIdentity};
pub use source::{HttpTokenSource, TokenFetch, TokenSource};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_millis(10_000);

/// Render-time hydration channel: token and identity computed during rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationPayload {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserIdentity>,
}

/// Observable token state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Provided by the render-time context without a network call.
    SsrHydrated,
    /// Present and validated within the TTL window.
    CachedValid,
    /// Present but outside the TTL window; the next forced fetch refreshes it.
    Stale,
    Unauthenticated,
}

#[derive(Default)]
struct TokenState {
    token: Option<String>,
    last_validated_at: Option<Instant>,
    identity: Option<UserIdentity>,
    hydrated: bool,
}

impl TokenState {
    fn clear(&mut self) {
        *self = TokenState::default();
    }
}

pub struct AuthTokenCoordinator {
    source: Arc<dyn TokenSource>,
    ttl: Duration,
    state: Mutex<TokenState>,
    // Serializes the check-then-fetch sequence so close calls cannot both refresh.
    refresh: tokio::sync::Mutex<()>,
}

impl AuthTokenCoordinator {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            ttl: DEFAULT_TOKEN_TTL,
            state: Mutex::new(TokenState::default()),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Seed state from the render-time hydration channel.
    pub fn with_hydration(self, payload: HydrationPayload) -> Self {
        {
            let mut state = self.state.lock();
            state.hydrated = payload.token.is_some();
            state.last_validated_at = payload.token.as_ref().map(|_| Instant::now());
            state.token = payload.token;
            state.identity = payload.user;
        }
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return a usable token, refreshing from the identity provider only when needed.
    ///
    /// A hydrated token is returned as-is unless `force_refresh` is set. Any other
    /// token is reused only while its last validation is inside the TTL window, and
    /// reuse does not extend that window. With neither a token nor a known identity
    /// there is nothing to refresh and no request is made. Failures clear the token
    /// and identity and yield `None`.
    pub async fn fetch_token(&self, force_refresh: bool) -> Option<String> {
        let _guard = self.refresh.lock().await;

        {
            let mut state = self.state.lock();
            if let Some(token) = state.token.clone() {
                if state.hydrated && !force_refresh {
                    state.last_validated_at = Some(Instant::now());
                    return Some(token);
                }
                let fresh = state
                    .last_validated_at
                    .is_some_and(|at| at.elapsed() < self.ttl);
                if fresh {
                    debug!("token validated within ttl, skipping refresh");
                    return Some(token);
                }
            } else if state.identity.is_none() {
                return None;
            }
        }

        let fetched = self.source.fetch_remote_token().await;

        let mut state = self.state.lock();
        match fetched {
            Ok(TokenFetch::Token(token)) => {
                if state.identity.is_none() {
                    state.identity = decode_identity(&token);
                }
                state.token = Some(token.clone());
                state.last_validated_at = Some(Instant::now());
                state.hydrated = false;
                info!("auth token refreshed");
                Some(token)
            }
            Ok(TokenFetch::Error(message)) => {
                warn!(error = %message, "token endpoint returned no token, clearing auth state");
                state.clear();
                None
            }
            Err(err) => {
                warn!(error = %err, "token fetch failed, clearing auth state");
                state.clear();
                None
            }
        }
    }

    pub fn status(&self) -> TokenStatus {
        let state = self.state.lock();
        match (&state.token, state.last_validated_at) {
            (None, _) => TokenStatus::Unauthenticated,
            (Some(_), _) if state.hydrated => TokenStatus::SsrHydrated,
            (Some(_), Some(at)) if at.elapsed() < self.ttl => TokenStatus::CachedValid,
            (Some(_), _) => TokenStatus::Stale,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.state.lock().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().token.is_some()
    }

    /// Record a signed-in identity so the next fetch has something to refresh.
    pub fn set_identity(&self, identity: UserIdentity) {
        self.state.lock().identity = Some(identity);
    }

    /// Explicit sign-out.
    pub fn clear(&self) {
        self.state.lock().clear();
        info!("auth state cleared");
    }
}
