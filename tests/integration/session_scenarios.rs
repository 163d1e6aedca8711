//! End-to-end binding scenarios through a session

use crate::integration::support::{args, CountingTokenSource, MockLive, MockTransport};
use livequery::optimistic::{insert_at_top, QueryFilter};
use livequery::{
    ExecutionContext, FunctionReference, HydrationPayload, LiveQueryConfig, LiveQuerySession,
    QueryArgs, QueryStatus, ReactiveQueryBinding, TokenStatus,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn get() -> FunctionReference {
    FunctionReference::parse("tasks:get", livequery::FunctionKind::Query).unwrap()
}

fn render_session(transport: Arc<MockTransport>) -> LiveQuerySession {
    LiveQuerySession::builder(LiveQueryConfig::default())
        .context(ExecutionContext::Render)
        .transport(transport)
        .build()
        .unwrap()
}

fn interactive_session(live: Arc<MockLive>) -> LiveQuerySession {
    LiveQuerySession::builder(LiveQueryConfig::default())
        .live_client(live)
        .build()
        .unwrap()
}

async fn wait_for_data(binding: &ReactiveQueryBinding, expected: Value) {
    let mut rx = binding.watch_state();
    while rx.borrow_and_update().data.as_ref() != Some(&expected) {
        rx.changed().await.unwrap();
    }
}

#[tokio::test]
async fn test_skip_then_args_fetches_once() {
    let transport = Arc::new(MockTransport::default());
    let session = render_session(transport.clone());
    let binding = session.binding(get(), session.default_options());

    let state = binding.set_args(QueryArgs::Skip).await;
    assert_eq!(state.status, QueryStatus::Idle);
    assert_eq!(transport.calls(), 0);

    let state = binding.set_args(args(json!({ "id": 5 }))).await;
    assert_eq!(state.status, QueryStatus::Success);
    assert_eq!(state.data, Some(json!({ "id": 5 })));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_skip_then_args_registers_one_subscription() {
    let live = Arc::new(MockLive::new(json!({ "title": "write tests" })));
    let session = interactive_session(live.clone());
    let binding = session.binding(get(), session.default_options());

    binding.set_args(QueryArgs::Skip).await;
    assert!(session.registry().is_empty());
    assert_eq!(live.opened(), 0);

    let state = binding.set_args(args(json!({ "id": 5 }))).await;
    assert_eq!(state.data, Some(json!({ "title": "write tests" })));
    assert_eq!(session.registry().len(), 1);
    assert!(session.registry().has(&binding.key().unwrap()));
    assert_eq!(live.active(), 1);

    binding.set_args(QueryArgs::Skip).await;
    assert!(session.registry().is_empty());
    assert_eq!(live.active(), 0);
}

#[tokio::test]
async fn test_superseded_result_is_discarded() {
    let transport = Arc::new(MockTransport::default());
    let release_one = transport.gate(1);
    let release_two = transport.gate(2);
    let session = render_session(transport.clone());
    let binding = session.binding(get(), session.default_options());

    let first = tokio::spawn({
        let binding = binding.clone();
        async move { binding.set_args(args(json!({ "id": 1 }))).await }
    });
    transport.wait_for_calls(1).await;
    let second = tokio::spawn({
        let binding = binding.clone();
        async move { binding.set_args(args(json!({ "id": 2 }))).await }
    });
    transport.wait_for_calls(2).await;

    release_two.send(json!({ "v": "b" })).unwrap();
    second.await.unwrap();
    release_one.send(json!({ "v": "a" })).unwrap();
    first.await.unwrap();

    let state = binding.state();
    assert_eq!(state.generation, 2);
    assert_eq!(state.data, Some(json!({ "v": "b" })));
}

#[tokio::test]
async fn test_hydrated_token_is_sent_as_bearer() {
    let transport = Arc::new(MockTransport::default());
    let source = Arc::new(CountingTokenSource::default());
    let session = LiveQuerySession::builder(LiveQueryConfig::default())
        .context(ExecutionContext::Render)
        .transport(transport.clone())
        .token_source(source.clone())
        .hydration(HydrationPayload {
            token: Some("ssr-token".to_string()),
            user: None,
        })
        .build()
        .unwrap();

    session
        .query(get(), args(json!({ "id": 1 })), session.default_options())
        .await
        .unwrap();
    session
        .query(get(), args(json!({ "id": 2 })), session.default_options().public())
        .await
        .unwrap();

    assert_eq!(
        transport.bearers(),
        vec![Some("ssr-token".to_string()), None]
    );
    assert_eq!(source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_live_client_refresh_is_debounced() {
    let live = Arc::new(MockLive::new(json!(null)));
    let source = Arc::new(CountingTokenSource::default());
    let session = LiveQuerySession::builder(LiveQueryConfig::default())
        .live_client(live.clone())
        .token_source(source.clone())
        .hydration(HydrationPayload {
            token: Some("ssr-token".to_string()),
            user: None,
        })
        .build()
        .unwrap();

    let auth = live.auth().unwrap();
    tokio::time::advance(std::time::Duration::from_millis(3_000)).await;
    assert_eq!(auth.fetch_token(true).await.as_deref(), Some("ssr-token"));
    assert_eq!(source.calls(), 0);

    tokio::time::advance(std::time::Duration::from_millis(8_000)).await;
    assert_eq!(auth.fetch_token(true).await.as_deref(), Some("refreshed-token"));
    assert_eq!(source.calls(), 1);
    assert_eq!(session.auth().unwrap().status(), TokenStatus::CachedValid);
}

#[tokio::test]
async fn test_shared_subscription_outlives_first_binding() {
    let live = Arc::new(MockLive::new(json!([])));
    let session = interactive_session(live.clone());
    let a = session.binding(get(), session.default_options());
    let b = session.binding(get(), session.default_options());
    a.set_args(args(json!({ "id": 1 }))).await;
    b.set_args(args(json!({ "id": 1 }))).await;
    assert_eq!(live.active(), 1);

    drop(a);
    live.push("tasks:get", json!(["pushed"]));
    wait_for_data(&b, json!(["pushed"])).await;

    b.teardown();
    assert_eq!(live.active(), 0);
    assert!(session.registry().is_empty());
}

#[tokio::test]
async fn test_optimistic_edit_reaches_bound_query() {
    let live = Arc::new(MockLive::new(json!([{ "body": "first" }])));
    let session = interactive_session(live);
    let list = FunctionReference::query("messages", "list").unwrap();
    let binding = session.binding(list.clone(), session.default_options());
    binding.set_args(args(json!({ "channel": "general" }))).await;

    let channel = serde_json::Map::from_iter([("channel".to_string(), json!("general"))]);
    let edited = insert_at_top(
        session.cache().as_ref(),
        &list,
        QueryFilter::matching(&channel),
        json!({ "body": "optimistic" }),
    );
    assert_eq!(edited, 1);
    wait_for_data(&binding, json!([{ "body": "optimistic" }, { "body": "first" }])).await;
}
