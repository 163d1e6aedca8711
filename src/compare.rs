//! Structural equality, partial argument matching and total ordering over
//! JSON-shaped values.
//!
//! Ordering across types: null < boolean < number < string < array < object.
//! Numbers compare numerically regardless of integer/float representation.

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// Recursive structural equality. Numbers compare by numeric value, so `1` and `1.0`
/// are equal.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Ordering::Equal,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| deep_equal(l, r)))
        }
        _ => false,
    }
}

/// True when every key of `partial` (except `skip_keys`) is present in `full` with a
/// structurally equal value.
pub fn args_match(full: &Map<String, Value>, partial: &Map<String, Value>, skip_keys: &[&str]) -> bool {
    partial
        .iter()
        .filter(|(key, _)| !skip_keys.contains(&key.as_str()))
        .all(|(key, expected)| full.get(key).is_some_and(|actual| deep_equal(actual, expected)))
}

/// Total order over values, usable as a sort comparator.
///
/// Arrays compare element by element with the first mismatch deciding, then by length.
/// Objects compare by their sorted key lists, then by values in key order.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_sequences(x, y),
        (Value::Object(x), Value::Object(y)) => compare_objects(x, y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Multi-key comparator: compares `a` and `b` on each key in turn, first mismatch
/// decides. Missing keys compare as null and therefore sort first.
pub fn compare_by_keys(a: &Value, b: &Value, keys: &[&str]) -> Ordering {
    for key in keys {
        let left = a.get(key).unwrap_or(&Value::Null);
        let right = b.get(key).unwrap_or(&Value::Null);
        let ord = compare(left, right);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_sequences(x: &[Value], y: &[Value]) -> Ordering {
    for (l, r) in x.iter().zip(y) {
        let ord = compare(l, r);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    x.len().cmp(&y.len())
}

fn compare_objects(x: &Map<String, Value>, y: &Map<String, Value>) -> Ordering {
    let mut x_keys: Vec<&String> = x.keys().collect();
    let mut y_keys: Vec<&String> = y.keys().collect();
    x_keys.sort();
    y_keys.sort();
    let ord = x_keys.cmp(&y_keys);
    if ord != Ordering::Equal {
        return ord;
    }
    for key in x_keys {
        let ord = compare(&x[key], &y[key]);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Integral floats inside this range convert to i128 exactly.
pub(crate) const I128_SAFE: f64 = 1.0e38;

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    match (as_integer(x), as_integer(y)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(a), None) => compare_int_float(a, y.as_f64().unwrap_or(0.0)),
        (None, Some(b)) => compare_int_float(b, x.as_f64().unwrap_or(0.0)).reverse(),
        (None, None) => {
            let a = x.as_f64().unwrap_or(0.0);
            let b = y.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
    }
}

fn compare_int_float(int: i128, float: f64) -> Ordering {
    if float.fract() == 0.0 && float.abs() < I128_SAFE {
        return int.cmp(&(float as i128));
    }
    (int as f64).partial_cmp(&float).unwrap_or(Ordering::Equal)
}
