//! Equality and ordering properties over JSON-shaped values

use livequery::compare::{compare, deep_equal};
use proptest::prelude::*;
use serde_json::Value;
use std::cmp::Ordering;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6f64).prop_map(Value::from),
        "[a-c]{0,3}".prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
            prop::collection::vec(("[a-c]{1,2}", inner), 0..3)
                .prop_map(|pairs| Value::Object(pairs.into_iter().collect())),
        ]
    })
}

#[test]
fn test_deep_equal_reflexive_and_symmetric() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(value(), value()), |(a, b)| {
            prop_assert!(deep_equal(&a, &a.clone()));
            prop_assert_eq!(deep_equal(&a, &b), deep_equal(&b, &a));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_compare_is_antisymmetric_and_agrees_with_equality() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(value(), value()), |(a, b)| {
            prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
            prop_assert_eq!(compare(&a, &b) == Ordering::Equal, deep_equal(&a, &b));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_compare_is_transitive() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(value(), value(), value()), |(a, b, c)| {
            let mut sorted = vec![a, b, c];
            sorted.sort_by(compare);
            prop_assert_ne!(compare(&sorted[0], &sorted[1]), Ordering::Greater);
            prop_assert_ne!(compare(&sorted[1], &sorted[2]), Ordering::Greater);
            prop_assert_ne!(compare(&sorted[0], &sorted[2]), Ordering::Greater);
            Ok(())
        })
        .unwrap();
}
