//! Subscription registry: at most one live subscription per cache key.
//!
//! One registry exists per client session. Each entry holds the teardown for the
//! underlying live subscription and a count of the bindings currently sharing it.
//! Map updates happen under a single lock acquisition; teardowns run after the
//! lock is released so they may call back into the registry.

use crate::cache::CacheKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info};

/// Teardown handle for a live subscription. Invoked at most once.
pub type Teardown = Box<dyn FnOnce() + Send + 'static>;

struct SubscriptionEntry {
    teardown: Teardown,
    holders: usize,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: Mutex<HashMap<CacheKey, SubscriptionEntry>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, key: &CacheKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Store `teardown` for `key` unless an entry already exists, in which case the
    /// existing subscription wins and `teardown` is dropped without being called.
    /// Returns true when the entry was stored.
    pub fn register<F>(&self, key: &CacheKey, teardown: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            debug!(key = %key, "subscription already registered, reusing");
            return false;
        }
        entries.insert(
            key.clone(),
            SubscriptionEntry {
                teardown: Box::new(teardown),
                holders: 1,
            },
        );
        info!(key = %key, "subscription registered");
        true
    }

    /// Invoke the stored teardown and remove the entry. No-op when absent.
    /// Returns true when a teardown ran.
    pub fn cleanup(&self, key: &CacheKey) -> bool {
        let entry = self.entries.lock().remove(key);
        match entry {
            Some(entry) => {
                info!(key = %key, "subscription torn down");
                (entry.teardown)();
                true
            }
            None => false,
        }
    }

    /// Drop the bookkeeping for `key` without calling its teardown.
    pub fn remove_without_teardown(&self, key: &CacheKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Add a holder to an existing entry. Returns false when no entry exists.
    pub fn retain(&self, key: &CacheKey) -> bool {
        match self.entries.lock().get_mut(key) {
            Some(entry) => {
                entry.holders += 1;
                debug!(key = %key, holders = entry.holders, "subscription shared");
                true
            }
            None => false,
        }
    }

    /// Remove a holder; the last holder out tears the subscription down.
    /// Returns true when the teardown ran.
    pub fn release(&self, key: &CacheKey) -> bool {
        let entry = {
            let mut entries = self.entries.lock();
            match entries.get_mut(key) {
                Some(entry) if entry.holders > 1 => {
                    entry.holders -= 1;
                    debug!(key = %key, holders = entry.holders, "subscription released");
                    None
                }
                Some(_) => entries.remove(key),
                None => None,
            }
        };
        match entry {
            Some(entry) => {
                info!(key = %key, "last holder released, subscription torn down");
                (entry.teardown)();
                true
            }
            None => false,
        }
    }

    pub fn holders(&self, key: &CacheKey) -> usize {
        self.entries.lock().get(key).map_or(0, |entry| entry.holders)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        for (_, entry) in self.entries.get_mut().drain() {
            (entry.teardown)();
        }
    }
}
