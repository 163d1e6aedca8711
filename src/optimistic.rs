//! Optimistic local edits to cached query results.
//!
//! A mutation can patch every cached result it is expected to affect before the
//! server confirms it. Targets are chosen with [`QueryFilter`], which matches cached
//! arguments partially through [`args_match`]. List helpers only touch results that
//! are arrays; other values are left alone.

use crate::cache::QueryCache;
use crate::compare::{args_match, compare_by_keys};
use crate::function::FunctionReference;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use tracing::debug;

/// Local view of cached results that optimistic updates read and overwrite.
pub trait OptimisticLocalStore {
    /// Arguments and current value of every cached query for `function`.
    fn all_queries(&self, function: &FunctionReference) -> Vec<(Map<String, Value>, Option<Value>)>;

    fn set_query(&self, function: &FunctionReference, args: &Map<String, Value>, value: Value);
}

impl OptimisticLocalStore for QueryCache {
    fn all_queries(&self, function: &FunctionReference) -> Vec<(Map<String, Value>, Option<Value>)> {
        self.entries_for(function)
            .into_iter()
            .map(|entry| (entry.args, entry.value))
            .collect()
    }

    fn set_query(&self, function: &FunctionReference, args: &Map<String, Value>, value: Value) {
        self.insert(function, args, value);
    }
}

/// Selects which cached queries of a function an edit applies to.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryFilter<'a> {
    /// Partial arguments a cached query must match. `None` matches every query.
    pub args: Option<&'a Map<String, Value>>,
    /// Keys of `args` that are ignored while matching.
    pub skip_keys: &'a [&'a str],
}

impl<'a> QueryFilter<'a> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matching(args: &'a Map<String, Value>) -> Self {
        Self {
            args: Some(args),
            skip_keys: &[],
        }
    }

    pub fn skipping(mut self, skip_keys: &'a [&'a str]) -> Self {
        self.skip_keys = skip_keys;
        self
    }

    pub fn accepts(&self, args: &Map<String, Value>) -> bool {
        match self.args {
            Some(partial) => args_match(args, partial, self.skip_keys),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Replace the value of every matching cached query that has one with
/// `updater(value)`. Returns how many queries were updated.
pub fn update_query<S, F>(
    store: &S,
    function: &FunctionReference,
    filter: QueryFilter<'_>,
    mut updater: F,
) -> usize
where
    S: OptimisticLocalStore + ?Sized,
    F: FnMut(&Value) -> Value,
{
    let mut updated = 0;
    for (args, value) in store.all_queries(function) {
        let Some(value) = value else { continue };
        if !filter.accepts(&args) {
            continue;
        }
        store.set_query(function, &args, updater(&value));
        updated += 1;
    }
    debug!(function = %function, updated, "optimistic update");
    updated
}

pub fn insert_at_top<S>(store: &S, function: &FunctionReference, filter: QueryFilter<'_>, item: Value) -> usize
where
    S: OptimisticLocalStore + ?Sized,
{
    edit_lists(store, function, filter, |list| list.insert(0, item.clone()))
}

pub fn insert_at_bottom<S>(store: &S, function: &FunctionReference, filter: QueryFilter<'_>, item: Value) -> usize
where
    S: OptimisticLocalStore + ?Sized,
{
    edit_lists(store, function, filter, |list| list.push(item.clone()))
}

/// Insert `item` into lists already sorted by `sort_keys` in `order`, before the
/// first element it sorts ahead of. Ties keep existing elements first.
pub fn insert_at_position<S>(
    store: &S,
    function: &FunctionReference,
    filter: QueryFilter<'_>,
    item: Value,
    sort_keys: &[&str],
    order: SortOrder,
) -> usize
where
    S: OptimisticLocalStore + ?Sized,
{
    edit_lists(store, function, filter, |list| {
        let index = list
            .iter()
            .position(|existing| ordered(&item, existing, sort_keys, order) == Ordering::Less)
            .unwrap_or(list.len());
        list.insert(index, item.clone());
    })
}

/// Remove every element for which `predicate` returns true.
pub fn delete_from_query<S, P>(
    store: &S,
    function: &FunctionReference,
    filter: QueryFilter<'_>,
    mut predicate: P,
) -> usize
where
    S: OptimisticLocalStore + ?Sized,
    P: FnMut(&Value) -> bool,
{
    edit_lists(store, function, filter, |list| list.retain(|item| !predicate(item)))
}

fn ordered(a: &Value, b: &Value, sort_keys: &[&str], order: SortOrder) -> Ordering {
    let ord = compare_by_keys(a, b, sort_keys);
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

fn edit_lists<S, F>(store: &S, function: &FunctionReference, filter: QueryFilter<'_>, mut edit: F) -> usize
where
    S: OptimisticLocalStore + ?Sized,
    F: FnMut(&mut Vec<Value>),
{
    let mut edited = 0;
    for (args, value) in store.all_queries(function) {
        let Some(Value::Array(mut list)) = value else { continue };
        if !filter.accepts(&args) {
            continue;
        }
        edit(&mut list);
        store.set_query(function, &args, Value::Array(list));
        edited += 1;
    }
    debug!(function = %function, edited, "optimistic list edit");
    edited
}
