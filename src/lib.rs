//! livequery: reactive remote query bindings.
//!
//! Presents one stable view (current value, loading state, error) of a remote query
//! that is first resolved over a one-shot HTTP request at render time and then kept
//! current through a live subscription once the client is interactive. Live
//! subscriptions are deduplicated per cache key and credentials are shared across
//! both transports by a debounced token coordinator.

pub mod auth;
pub mod binding;
pub mod cache;
pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod executor;
pub mod function;
pub mod logging;
pub mod optimistic;
pub mod registry;
pub mod session;
pub mod transport;

pub use auth::{AuthTokenCoordinator, HydrationPayload, TokenFetch, TokenSource, TokenStatus, UserIdentity};
pub use binding::{QueryOptions, QueryState, QueryStatus, ReactiveQueryBinding};
pub use cache::{derive_key, CacheKey, QueryCache};
pub use config::{ConfigLoader, LiveQueryConfig};
pub use error::QueryError;
pub use executor::{ExecutionContext, QueryExecutor};
pub use function::{FunctionKind, FunctionReference, QueryArgs};
pub use registry::SubscriptionRegistry;
pub use session::{LiveQuerySession, SessionBuilder};
pub use transport::{LiveClient, OneShotTransport, Unsubscribe, UpdateCallback};
