//! Cache key derivation properties

use livequery::cache::derive_key;
use livequery::{FunctionReference, QueryArgs};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,4}", inner), 0..4)
                .prop_map(|pairs| Value::Object(pairs.into_iter().collect())),
        ]
    })
}

fn entries() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z]{1,5}", value(), 0..6)
        .prop_map(|map| map.into_iter().collect())
}

fn function() -> FunctionReference {
    FunctionReference::query("tasks", "list").unwrap()
}

/// Insertion order of argument keys never changes the key
#[test]
fn test_key_is_insertion_order_independent() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&entries(), |pairs| {
            let forward: Map<String, Value> = pairs.iter().cloned().collect();
            let backward: Map<String, Value> = pairs.iter().rev().cloned().collect();

            let a = derive_key(&function(), &QueryArgs::Args(forward));
            let b = derive_key(&function(), &QueryArgs::Args(backward));
            prop_assert_eq!(a, b);
            Ok(())
        })
        .unwrap();
}

/// The skip sentinel never collides with real arguments
#[test]
fn test_skip_key_is_distinct() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let skip = derive_key(&function(), &QueryArgs::Skip);

    runner
        .run(&entries(), |pairs| {
            let args: Map<String, Value> = pairs.into_iter().collect();
            prop_assert_ne!(&derive_key(&function(), &QueryArgs::Args(args)), &skip);
            Ok(())
        })
        .unwrap();
}

/// Equal keys imply structurally equal arguments
#[test]
fn test_distinct_args_give_distinct_keys() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(entries(), entries()), |(left, right)| {
            let left: Map<String, Value> = left.into_iter().collect();
            let right: Map<String, Value> = right.into_iter().collect();
            let same_key = derive_key(&function(), &QueryArgs::Args(left.clone()))
                == derive_key(&function(), &QueryArgs::Args(right.clone()));
            prop_assert_eq!(same_key, left == right);
            Ok(())
        })
        .unwrap();
}
