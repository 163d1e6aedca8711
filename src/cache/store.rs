//! Session-scoped keyed query cache.
//!
//! Every binding bound to a key observes the same slot, so a live subscription
//! opened by one binding feeds all bindings that share its key.

use crate::cache::keys::{derive_key, CacheKey};
use crate::function::{FunctionReference, QueryArgs};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::watch;
use tracing::trace;

/// Snapshot of one cached query.
#[derive(Debug, Clone)]
pub struct CachedQuery {
    pub key: CacheKey,
    pub function: FunctionReference,
    pub args: Map<String, Value>,
    pub value: Option<Value>,
}

struct Slot {
    function: FunctionReference,
    args: Map<String, Value>,
    sender: watch::Sender<Option<Value>>,
}

#[derive(Default)]
pub struct QueryCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch the slot for `key`, creating an empty slot when none exists.
    pub fn watch(
        &self,
        key: &CacheKey,
        function: &FunctionReference,
        args: &Map<String, Value>,
    ) -> watch::Receiver<Option<Value>> {
        let mut slots = self.slots.lock();
        slots
            .entry(key.clone())
            .or_insert_with(|| Slot {
                function: function.clone(),
                args: args.clone(),
                sender: watch::channel(None).0,
            })
            .sender
            .subscribe()
    }

    /// Store a value for `key` and wake every watcher. Returns false when the key
    /// has no slot.
    pub fn publish(&self, key: &CacheKey, value: Value) -> bool {
        let slots = self.slots.lock();
        match slots.get(key) {
            Some(slot) => {
                trace!(key = %key, "publishing cached value");
                slot.sender.send_replace(Some(value));
                true
            }
            None => false,
        }
    }

    /// Store a value, creating the slot when needed.
    pub fn insert(&self, function: &FunctionReference, args: &Map<String, Value>, value: Value) {
        let key = derive_key(function, &QueryArgs::Args(args.clone()));
        let mut slots = self.slots.lock();
        let slot = slots.entry(key).or_insert_with(|| Slot {
            function: function.clone(),
            args: args.clone(),
            sender: watch::channel(None).0,
        });
        slot.sender.send_replace(Some(value));
    }

    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.slots
            .lock()
            .get(key)
            .and_then(|slot| slot.sender.borrow().clone())
    }

    /// All cached queries for `function`, ordered by key.
    pub fn entries_for(&self, function: &FunctionReference) -> Vec<CachedQuery> {
        let slots = self.slots.lock();
        let mut entries: Vec<CachedQuery> = slots
            .iter()
            .filter(|(_, slot)| &slot.function == function)
            .map(|(key, slot)| CachedQuery {
                key: key.clone(),
                function: slot.function.clone(),
                args: slot.args.clone(),
                value: slot.sender.borrow().clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
