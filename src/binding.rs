//! Reactive query binding: the caller-facing view of one query.
//!
//! A binding follows a function's arguments over time. Each argument change that
//! alters the cache key bumps the generation, tears down this binding's hold on the
//! previous key's live subscription and resolves a fresh initial value. Results that
//! come back for a superseded generation are dropped. Once interactive, the binding
//! holds a shared live subscription for its key and applies every push.

use crate::cache::{derive_key, CacheKey, QueryCache};
use crate::config::QueryDefaults;
use crate::error::QueryError;
use crate::executor::{ExecutionContext, QueryExecutor};
use crate::function::{FunctionReference, QueryArgs};
use crate::registry::SubscriptionRegistry;
use crate::transport::UpdateCallback;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Maps a resolved value into the shape the caller stores.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct QueryOptions {
    /// Resolve during render. When false the binding stays idle at render time.
    pub server: bool,
    /// Hold a live subscription once interactive.
    pub subscribe: bool,
    /// Skip credentials on one-shot requests.
    pub public: bool,
    pub default: Option<Value>,
    pub transform: Option<Transform>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            server: true,
            subscribe: true,
            public: false,
            default: None,
            transform: None,
        }
    }
}

impl QueryOptions {
    pub fn from_defaults(defaults: &QueryDefaults) -> Self {
        Self {
            server: defaults.server,
            subscribe: defaults.subscribe,
            ..Self::default()
        }
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("server", &self.server)
            .field("subscribe", &self.subscribe)
            .field("public", &self.public)
            .field("default", &self.default)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Idle,
    Pending,
    Success,
    Error,
}

/// Published state of a binding.
#[derive(Debug, Clone)]
pub struct QueryState {
    pub status: QueryStatus,
    /// Last successfully resolved value, or the caller-supplied default.
    pub data: Option<Value>,
    /// Last failure; cleared when a new attempt starts.
    pub error: Option<QueryError>,
    pub generation: u64,
    pub key: Option<CacheKey>,
}

impl QueryState {
    fn initial(default: Option<Value>) -> Self {
        Self {
            status: QueryStatus::Idle,
            data: default,
            error: None,
            generation: 0,
            key: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == QueryStatus::Pending
    }
}

struct Control {
    key: Option<CacheKey>,
    args: QueryArgs,
    generation: u64,
    live_key: Option<CacheKey>,
    feed: Option<JoinHandle<()>>,
    torn_down: bool,
}

struct BindingInner {
    function: FunctionReference,
    options: QueryOptions,
    executor: Arc<QueryExecutor>,
    registry: Arc<SubscriptionRegistry>,
    cache: Arc<QueryCache>,
    state: watch::Sender<QueryState>,
    control: Mutex<Control>,
}

/// Handle to a reactive query. Clones share the same binding; the binding is torn
/// down by [`ReactiveQueryBinding::teardown`] or when the last clone is dropped.
#[derive(Clone)]
pub struct ReactiveQueryBinding {
    inner: Arc<BindingInner>,
}

impl ReactiveQueryBinding {
    pub fn new(
        function: FunctionReference,
        options: QueryOptions,
        executor: Arc<QueryExecutor>,
        registry: Arc<SubscriptionRegistry>,
        cache: Arc<QueryCache>,
    ) -> Self {
        let (state, _) = watch::channel(QueryState::initial(options.default.clone()));
        Self {
            inner: Arc::new(BindingInner {
                function,
                options,
                executor,
                registry,
                cache,
                state,
                control: Mutex::new(Control {
                    key: None,
                    args: QueryArgs::Skip,
                    generation: 0,
                    live_key: None,
                    feed: None,
                    torn_down: false,
                }),
            }),
        }
    }

    pub fn function(&self) -> &FunctionReference {
        &self.inner.function
    }

    pub fn state(&self) -> QueryState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that wakes on every state change.
    pub fn watch_state(&self) -> watch::Receiver<QueryState> {
        self.inner.state.subscribe()
    }

    pub fn key(&self) -> Option<CacheKey> {
        self.inner.control.lock().key.clone()
    }

    /// Rebind to new arguments. Arguments that canonicalize to the current key are
    /// ignored. Resolves once this generation's initial value has been applied or
    /// superseded.
    pub async fn set_args(&self, args: QueryArgs) -> QueryState {
        let key = derive_key(&self.inner.function, &args);
        let (generation, released) = {
            let mut control = self.inner.control.lock();
            if control.torn_down || control.key.as_ref() == Some(&key) {
                return self.state();
            }
            debug!(function = %self.inner.function, key = %key, "binding arguments changed");
            control.key = Some(key.clone());
            control.args = args.clone();
            control.generation += 1;
            let released = detach_feed(&mut control);

            if args.is_skip() {
                let generation = control.generation;
                let default = self.inner.options.default.clone();
                self.inner.state.send_modify(|state| {
                    state.status = QueryStatus::Idle;
                    state.data = default;
                    state.error = None;
                    state.generation = generation;
                    state.key = Some(key.clone());
                });
            }
            (control.generation, released)
        };
        if let Some(old) = released {
            self.inner.registry.release(&old);
        }

        if let QueryArgs::Args(map) = args {
            self.inner.run(generation, key, map).await;
        }
        self.state()
    }

    /// Re-resolve the current arguments under a new generation.
    pub async fn refetch(&self) -> QueryState {
        let job = {
            let mut control = self.inner.control.lock();
            match (&control.key, &control.args) {
                (Some(key), QueryArgs::Args(map)) if !control.torn_down => {
                    let job = (key.clone(), map.clone());
                    control.generation += 1;
                    Some((control.generation, job))
                }
                _ => None,
            }
        };
        if let Some((generation, (key, map))) = job {
            self.inner.run(generation, key, map).await;
        }
        self.state()
    }

    /// Release this binding's live subscription and stop all further updates.
    pub fn teardown(&self) {
        self.inner.shut_down();
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.control.lock().torn_down
    }
}

impl BindingInner {
    async fn run(self: &Arc<Self>, generation: u64, key: CacheKey, args: Map<String, Value>) {
        {
            let control = self.control.lock();
            if control.torn_down || control.generation != generation {
                return;
            }
            let status = if self.executor.context() == ExecutionContext::Render
                && !self.options.server
            {
                QueryStatus::Idle
            } else {
                QueryStatus::Pending
            };
            self.state.send_modify(|state| {
                state.status = status;
                state.error = None;
                state.generation = generation;
                state.key = Some(key.clone());
            });
            if status == QueryStatus::Idle {
                return;
            }
        }

        let result = self
            .executor
            .initial_value(&self.function, &args, self.options.public)
            .await
            .map(|value| {
                // Shaped before locking; a transform may call back into the binding.
                let data = self.shape(value.clone());
                (value, data)
            });

        let pushes = {
            let control = self.control.lock();
            if control.torn_down || control.generation != generation {
                debug!(key = %key, generation, "discarding superseded result");
                return;
            }
            match result {
                Ok((value, data)) => {
                    self.cache.insert(&self.function, &args, value);
                    self.state.send_modify(|state| {
                        state.status = QueryStatus::Success;
                        state.data = Some(data);
                        state.error = None;
                    });
                }
                Err(err) => {
                    self.state.send_modify(|state| {
                        state.status = QueryStatus::Error;
                        state.error = Some(err);
                    });
                    return;
                }
            }
            if self.executor.context() != ExecutionContext::Interactive
                || !self.options.subscribe
                || control.live_key.as_ref() == Some(&key)
            {
                return;
            }
            // Must exist before the subscription opens so no push is marked seen.
            self.cache.watch(&key, &self.function, &args)
        };

        match self.attach_live(&key, &args) {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                warn!(key = %key, error = %err, "live updates unavailable for query");
                return;
            }
        }

        let mut control = self.control.lock();
        if control.torn_down
            || control.generation != generation
            || control.live_key.as_ref() == Some(&key)
        {
            drop(control);
            self.registry.release(&key);
            return;
        }
        control.live_key = Some(key.clone());
        control.feed = Some(tokio::spawn(forward_pushes(
            Arc::downgrade(self),
            key,
            pushes,
        )));
    }

    /// Take a hold on the live subscription for `key`, opening one when no other
    /// binding already holds it. Returns false when the hold could not be taken.
    fn attach_live(&self, key: &CacheKey, args: &Map<String, Value>) -> Result<bool, QueryError> {
        if self.registry.retain(key) {
            debug!(key = %key, "reusing live subscription");
            return Ok(true);
        }

        let live = self.executor.live_client()?;
        let cache = self.cache.clone();
        let push_key = key.clone();
        let on_update: UpdateCallback = Arc::new(move |value| {
            cache.publish(&push_key, value);
        });
        let unsubscribe = Arc::new(live.subscribe(&self.function, args, on_update));

        let handle = unsubscribe.clone();
        if self.registry.register(key, move || handle.unsubscribe()) {
            return Ok(true);
        }
        // Another binding registered the key first; its subscription wins.
        unsubscribe.unsubscribe();
        Ok(self.registry.retain(key))
    }

    fn apply_push(&self, key: &CacheKey, value: Value) {
        let data = self.shape(value);
        let control = self.control.lock();
        if control.torn_down || control.key.as_ref() != Some(key) {
            return;
        }
        self.state.send_modify(|state| {
            state.status = QueryStatus::Success;
            state.data = Some(data);
            state.error = None;
        });
    }

    fn shape(&self, value: Value) -> Value {
        match &self.options.transform {
            Some(transform) => transform(value),
            None => value,
        }
    }

    fn shut_down(&self) {
        let released = {
            let mut control = self.control.lock();
            if control.torn_down {
                return;
            }
            control.torn_down = true;
            control.generation += 1;
            detach_feed(&mut control)
        };
        if let Some(key) = released {
            self.registry.release(&key);
        }
    }
}

impl Drop for BindingInner {
    fn drop(&mut self) {
        self.shut_down();
    }
}

fn detach_feed(control: &mut Control) -> Option<CacheKey> {
    if let Some(feed) = control.feed.take() {
        feed.abort();
    }
    control.live_key.take()
}

async fn forward_pushes(
    binding: Weak<BindingInner>,
    key: CacheKey,
    mut pushes: watch::Receiver<Option<Value>>,
) {
    while pushes.changed().await.is_ok() {
        let value = pushes.borrow_and_update().clone();
        let Some(inner) = binding.upgrade() else {
            break;
        };
        if let Some(value) = value {
            inner.apply_push(&key, value);
        }
    }
}
