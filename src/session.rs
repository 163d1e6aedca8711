//! Client session: the scope that owns the subscription registry, the query cache
//! and the executor with its token coordinator.
//!
//! Nothing here is process-global. Two sessions never share subscriptions or tokens.

use crate::auth::{AuthTokenCoordinator, HttpTokenSource, HydrationPayload, TokenFetch, TokenSource};
use crate::binding::{QueryOptions, ReactiveQueryBinding};
use crate::cache::QueryCache;
use crate::config::{LiveQueryConfig, QueryDefaults};
use crate::error::QueryError;
use crate::executor::{ExecutionContext, QueryExecutor};
use crate::function::{FunctionKind, FunctionReference, QueryArgs};
use crate::registry::SubscriptionRegistry;
use crate::transport::{HttpTransport, LiveClient, OneShotTransport};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

pub struct LiveQuerySession {
    executor: Arc<QueryExecutor>,
    registry: Arc<SubscriptionRegistry>,
    cache: Arc<QueryCache>,
    defaults: QueryDefaults,
}

impl LiveQuerySession {
    pub fn builder(config: LiveQueryConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    /// Create an unbound binding. Nothing runs until its arguments are set.
    pub fn binding(&self, function: FunctionReference, options: QueryOptions) -> ReactiveQueryBinding {
        ReactiveQueryBinding::new(
            function,
            options,
            self.executor.clone(),
            self.registry.clone(),
            self.cache.clone(),
        )
    }

    /// Bind a query to `args` and wait for its first state.
    pub async fn query(
        &self,
        function: FunctionReference,
        args: QueryArgs,
        options: QueryOptions,
    ) -> Result<ReactiveQueryBinding, QueryError> {
        expect_kind(&function, FunctionKind::Query)?;
        let binding = self.binding(function, options);
        binding.set_args(args).await;
        Ok(binding)
    }

    pub async fn mutation<T: Serialize>(
        &self,
        function: &FunctionReference,
        args: &T,
    ) -> Result<Value, QueryError> {
        expect_kind(function, FunctionKind::Mutation)?;
        self.executor.call(function, &args_map(args)?, false).await
    }

    pub async fn action<T: Serialize>(
        &self,
        function: &FunctionReference,
        args: &T,
    ) -> Result<Value, QueryError> {
        expect_kind(function, FunctionKind::Action)?;
        self.executor.call(function, &args_map(args)?, false).await
    }

    /// Options carrying this session's configured defaults.
    pub fn default_options(&self) -> QueryOptions {
        QueryOptions::from_defaults(&self.defaults)
    }

    pub fn sign_out(&self) {
        if let Some(auth) = self.executor.auth() {
            auth.clear();
        }
    }

    pub fn context(&self) -> ExecutionContext {
        self.executor.context()
    }

    pub fn auth(&self) -> Option<&Arc<AuthTokenCoordinator>> {
        self.executor.auth()
    }

    pub fn executor(&self) -> &Arc<QueryExecutor> {
        &self.executor
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }
}

fn expect_kind(function: &FunctionReference, kind: FunctionKind) -> Result<(), QueryError> {
    if function.kind == kind {
        Ok(())
    } else {
        Err(QueryError::Configuration(format!(
            "{} cannot be called as a {}",
            function,
            kind.as_str()
        )))
    }
}

fn args_map<T: Serialize>(args: &T) -> Result<Map<String, Value>, QueryError> {
    match QueryArgs::from_serialize(args)? {
        QueryArgs::Args(map) => Ok(map),
        QueryArgs::Skip => Ok(Map::new()),
    }
}

/// Stands in when a hydrated token exists but no endpoint can refresh it.
struct HydrationOnlySource;

#[async_trait]
impl TokenSource for HydrationOnlySource {
    async fn fetch_remote_token(&self) -> Result<TokenFetch, QueryError> {
        Ok(TokenFetch::Error("no token endpoint is configured".to_string()))
    }
}

pub struct SessionBuilder {
    config: LiveQueryConfig,
    context: ExecutionContext,
    transport: Option<Arc<dyn OneShotTransport>>,
    live: Option<Arc<dyn LiveClient>>,
    token_source: Option<Arc<dyn TokenSource>>,
    hydration: Option<HydrationPayload>,
    cookie: Option<String>,
}

impl SessionBuilder {
    fn new(config: LiveQueryConfig) -> Self {
        Self {
            config,
            context: ExecutionContext::Interactive,
            transport: None,
            live: None,
            token_source: None,
            hydration: None,
            cookie: None,
        }
    }

    pub fn context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Override the HTTP transport built from `endpoint.url`.
    pub fn transport(mut self, transport: Arc<dyn OneShotTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn live_client(mut self, live: Arc<dyn LiveClient>) -> Self {
        self.live = Some(live);
        self
    }

    /// Override the HTTP token source built from `auth.site_url`.
    pub fn token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    pub fn hydration(mut self, payload: HydrationPayload) -> Self {
        self.hydration = Some(payload);
        self
    }

    /// Cookie forwarded to the token endpoint by the HTTP token source.
    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn build(self) -> Result<LiveQuerySession, QueryError> {
        self.config.ensure_valid()?;
        let endpoint = &self.config.endpoint;

        let transport = match (self.transport, &endpoint.url) {
            (Some(transport), _) => Some(transport),
            (None, Some(url)) => Some(Arc::new(HttpTransport::new(
                url,
                endpoint.connect_timeout(),
                endpoint.request_timeout(),
            )?) as Arc<dyn OneShotTransport>),
            (None, None) => None,
        };

        let auth = if self.config.auth.enabled {
            let source = match (self.token_source, &self.config.auth.site_url) {
                (Some(source), _) => Some(source),
                (None, Some(site_url)) => {
                    let mut source = HttpTokenSource::new(
                        site_url,
                        &self.config.auth.token_path,
                        endpoint.request_timeout(),
                    )?;
                    if let Some(cookie) = self.cookie {
                        source = source.with_cookie(cookie);
                    }
                    Some(Arc::new(source) as Arc<dyn TokenSource>)
                }
                (None, None) if self.hydration.is_some() => {
                    Some(Arc::new(HydrationOnlySource) as Arc<dyn TokenSource>)
                }
                (None, None) => None,
            };
            source.map(|source| {
                let mut coordinator =
                    AuthTokenCoordinator::new(source).with_ttl(self.config.auth.token_ttl());
                if let Some(payload) = self.hydration {
                    coordinator = coordinator.with_hydration(payload);
                }
                Arc::new(coordinator)
            })
        } else {
            None
        };

        let mut executor = QueryExecutor::new(self.context);
        if let Some(transport) = transport {
            executor = executor.with_transport(transport);
        }
        if let Some(live) = self.live {
            if let Some(auth) = &auth {
                live.set_auth(auth.clone());
            }
            executor = executor.with_live_client(live);
        }
        if let Some(auth) = auth {
            executor = executor.with_auth(auth);
        }

        info!(
            context = ?self.context,
            endpoint = ?self.config.endpoint.url,
            auth = executor.auth().is_some(),
            "query session ready"
        );

        Ok(LiveQuerySession {
            executor: Arc::new(executor),
            registry: Arc::new(SubscriptionRegistry::new()),
            cache: Arc::new(QueryCache::new()),
            defaults: self.config.query,
        })
    }
}
