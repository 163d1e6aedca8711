use criterion::{black_box, criterion_group, criterion_main, Criterion};
use livequery::cache::derive_key;
use livequery::{FunctionReference, QueryArgs};
use serde_json::json;

fn bench_derive_key(c: &mut Criterion) {
    let function = FunctionReference::query("messages", "list").unwrap();
    let flat = QueryArgs::from_serialize(&json!({ "channel": "general", "limit": 50 })).unwrap();
    let nested = QueryArgs::from_serialize(&json!({
        "filter": { "tags": ["a", "b", "c"], "author": { "id": 7, "name": "x" } },
        "page": { "cursor": null, "size": 100 },
        "sort": [{ "key": "createdAt", "desc": true }, { "key": "id", "desc": false }]
    }))
    .unwrap();

    c.bench_function("derive_key_flat", |b| {
        b.iter(|| derive_key(black_box(&function), black_box(&flat)))
    });
    c.bench_function("derive_key_nested", |b| {
        b.iter(|| derive_key(black_box(&function), black_box(&nested)))
    });
    c.bench_function("derive_key_skip", |b| {
        b.iter(|| derive_key(black_box(&function), black_box(&QueryArgs::Skip)))
    });
}

criterion_group!(benches, bench_derive_key);
criterion_main!(benches);
