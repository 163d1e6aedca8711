//! Cache keys and the session-scoped keyed query cache.

pub mod keys;
pub mod store;

pub use keys::{canonical_json, derive_key, derive_key_from, CacheKey};
pub use store::{CachedQuery, QueryCache};
