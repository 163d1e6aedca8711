//! Canonical cache key derivation.
//!
//! A key is `livequery:<module:name>:<canonical args>`. Canonical args are the JSON
//! rendering of the argument mapping with every nested object's keys sorted and
//! sequence order preserved, so insertion order never affects identity. The skip
//! sentinel renders as `$skip`, which can never be produced by an argument mapping
//! (those always render starting with `{`).

use crate::compare::I128_SAFE;
use crate::error::QueryError;
use crate::function::{FunctionReference, QueryArgs};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

const KEY_PREFIX: &str = "livequery";
const SKIP_MARKER: &str = "$skip";

/// Canonical string identifying a function + arguments pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_skip(&self) -> bool {
        self.0.ends_with(SKIP_MARKER)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the cache key for a function and its arguments. Total over all inputs.
pub fn derive_key(function: &FunctionReference, args: &QueryArgs) -> CacheKey {
    let rendered = match args {
        QueryArgs::Skip => SKIP_MARKER.to_string(),
        QueryArgs::Args(map) => canonical_object(map),
    };
    CacheKey(format!("{}:{}:{}", KEY_PREFIX, function.path(), rendered))
}

/// Derive a key from any serializable argument value, failing fast when it cannot
/// be represented as an argument mapping.
pub fn derive_key_from<T: Serialize>(
    function: &FunctionReference,
    args: &T,
) -> Result<CacheKey, QueryError> {
    let args = QueryArgs::from_serialize(args)?;
    Ok(derive_key(function, &args))
}

/// Render a value as deterministic JSON with sorted object keys.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn canonical_object(map: &Map<String, Value>) -> String {
    let mut out = String::new();
    write_object(map, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_object(map, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Number(n) => write_number(n, out),
        // Remaining scalars already have a single rendering.
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Integral floats render in integer form so `1.0` and `1` share a key.
fn write_number(n: &Number, out: &mut String) {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < I128_SAFE => {
            out.push_str(&(f as i128).to_string())
        }
        _ => out.push_str(&n.to_string()),
    }
}

fn write_object(map: &Map<String, Value>, out: &mut String) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_canonical(value, out);
    }
    out.push('}');
}
