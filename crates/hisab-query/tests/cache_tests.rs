//! Read-through cache behaviour
//!
//! Exercises `QueryClient::get`, invalidation, refetch and local patches
//! against a scripted transport.

use futures::future::join_all;
use hisab_query::{EntryState, Method, QueryError, ResourceKey, TransportError};
use hisab_test_utils::{client, client_with, transactions_payload, FakeTransport};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_second_get_is_served_from_cache() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond(Method::Get, "/transactions", transactions_payload(3));
    let client = client(Arc::clone(&transport));

    let first = client.get(&ResourceKey::TRANSACTIONS).await.unwrap();
    let second = client.get(&ResourceKey::TRANSACTIONS).await.unwrap();

    assert_eq!(first.len(), 3);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(transport.call_count(Method::Get, "/transactions"), 1);
}

#[tokio::test]
async fn test_concurrent_gets_share_one_request() {
    let transport = Arc::new(FakeTransport::new().with_latency(Duration::from_millis(50)));
    transport.respond(Method::Get, "/projects", json!([{"id": 1, "name": "برج الأمل"}]));
    let client = client(Arc::clone(&transport));

    let key = ResourceKey::PROJECTS;
    let results = join_all((0..8).map(|_| client.get(&key))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(transport.call_count(Method::Get, "/projects"), 1);
}

#[tokio::test]
async fn test_state_is_loading_while_fetch_in_flight() {
    let transport = Arc::new(FakeTransport::new().with_latency(Duration::from_millis(200)));
    transport.respond(Method::Get, "/employees", json!([]));
    let client = client(Arc::clone(&transport));

    let background = client.clone();
    let handle = tokio::spawn(async move { background.get(&ResourceKey::EMPLOYEES).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.state(&ResourceKey::EMPLOYEES), EntryState::Loading);
    assert_eq!(client.stats().loading, 1);

    handle.await.unwrap().unwrap();
    assert_eq!(client.state(&ResourceKey::EMPLOYEES), EntryState::Fresh);
    assert_eq!(client.stats().loading, 0);
}

#[tokio::test]
async fn test_invalidate_then_get_fetches_once() {
    let transport = Arc::new(FakeTransport::new());
    transport
        .respond(Method::Get, "/documents", json!([{"id": 1}]))
        .respond(Method::Get, "/documents", json!([{"id": 1}, {"id": 2}]));
    let client = client(Arc::clone(&transport));

    client.get(&ResourceKey::DOCUMENTS).await.unwrap();
    client.invalidate(&ResourceKey::DOCUMENTS).await;
    assert_eq!(client.state(&ResourceKey::DOCUMENTS), EntryState::Stale);
    assert_eq!(transport.call_count(Method::Get, "/documents"), 1);

    let refreshed = client.get(&ResourceKey::DOCUMENTS).await.unwrap();
    client.get(&ResourceKey::DOCUMENTS).await.unwrap();

    assert_eq!(refreshed.len(), 2);
    assert_eq!(transport.call_count(Method::Get, "/documents"), 2);
}

#[tokio::test]
async fn test_invalidate_during_fetch_forces_next_fetch() {
    let transport = Arc::new(FakeTransport::new().with_latency(Duration::from_millis(100)));
    transport.respond(Method::Get, "/users", json!([{"id": 1}]));
    let client = client(Arc::clone(&transport));

    let background = client.clone();
    let handle = tokio::spawn(async move { background.get(&ResourceKey::USERS).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.invalidate(&ResourceKey::USERS).await;

    let entry = handle.await.unwrap().unwrap();
    assert_eq!(entry.len(), 1);
    assert_eq!(client.state(&ResourceKey::USERS), EntryState::Stale);

    client.get(&ResourceKey::USERS).await.unwrap();
    assert_eq!(transport.call_count(Method::Get, "/users"), 2);
}

#[tokio::test]
async fn test_coalesced_callers_still_receive_invalidated_result() {
    let transport = Arc::new(FakeTransport::new().with_latency(Duration::from_millis(100)));
    transport.respond(Method::Get, "/projects", json!([{"id": 1}, {"id": 2}]));
    let client = client(Arc::clone(&transport));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let background = client.clone();
            tokio::spawn(async move { background.get(&ResourceKey::PROJECTS).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.invalidate(&ResourceKey::PROJECTS).await;

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().len(), 2);
    }
    assert_eq!(transport.call_count(Method::Get, "/projects"), 1);

    client.get(&ResourceKey::PROJECTS).await.unwrap();
    assert_eq!(transport.call_count(Method::Get, "/projects"), 2);
}

#[tokio::test]
async fn test_entry_goes_stale_after_freshness_window() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond(Method::Get, "/users", json!([{"id": 1}]));
    let client = client_with(Arc::clone(&transport), Duration::from_millis(40));

    client.get(&ResourceKey::USERS).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    client.get(&ResourceKey::USERS).await.unwrap();

    assert_eq!(transport.call_count(Method::Get, "/users"), 2);
}

#[tokio::test]
async fn test_refetch_always_requests() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond(Method::Get, "/dashboard_stats", json!({"income": 10, "expenses": 4}));
    let client = client(Arc::clone(&transport));

    client.get(&ResourceKey::DASHBOARD).await.unwrap();
    let entry = client.refetch(&ResourceKey::DASHBOARD).await.unwrap();

    assert_eq!(entry.records(), &[json!({"income": 10, "expenses": 4})]);
    assert_eq!(transport.call_count(Method::Get, "/dashboard_stats"), 2);
    assert_eq!(client.state(&ResourceKey::DASHBOARD), EntryState::Fresh);
}

#[tokio::test]
async fn test_failed_get_reports_error_and_caches_nothing() {
    let transport = Arc::new(FakeTransport::new());
    transport
        .fail(Method::Get, "/transactions", TransportError::status(500, "boom"))
        .respond(Method::Get, "/transactions", transactions_payload(1));
    let client = client(Arc::clone(&transport));

    let err = client.get(&ResourceKey::TRANSACTIONS).await.unwrap_err();
    assert!(matches!(err, QueryError::Fetch { .. }));
    assert!(err.is_retryable());
    assert_eq!(client.state(&ResourceKey::TRANSACTIONS), EntryState::Empty);

    let entry = client.get(&ResourceKey::TRANSACTIONS).await.unwrap();
    assert_eq!(entry.len(), 1);
}

#[tokio::test]
async fn test_failed_refetch_keeps_existing_entry() {
    let transport = Arc::new(FakeTransport::new());
    transport
        .respond(Method::Get, "/projects", json!([{"id": 1}]))
        .fail(Method::Get, "/projects", TransportError::Timeout);
    let client = client(Arc::clone(&transport));

    client.get(&ResourceKey::PROJECTS).await.unwrap();
    assert!(client.refetch(&ResourceKey::PROJECTS).await.is_err());

    assert_eq!(client.state(&ResourceKey::PROJECTS), EntryState::Fresh);
    let cached = client.cache().peek(&ResourceKey::PROJECTS).await.unwrap();
    assert_eq!(cached.records(), &[json!({"id": 1})]);
}

#[tokio::test]
async fn test_unknown_resource_makes_no_request() {
    let transport = Arc::new(FakeTransport::new());
    let client = client(Arc::clone(&transport));
    let key: ResourceKey = "invoices".parse().unwrap();

    let err = client.get(&key).await.unwrap_err();

    assert!(matches!(err, QueryError::UnknownResource(k) if k == key));
    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test]
async fn test_add_record_patches_without_request() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond(Method::Get, "/transactions", transactions_payload(4));
    let client = client(Arc::clone(&transport));

    let before = client.get(&ResourceKey::TRANSACTIONS).await.unwrap().len();
    assert!(
        client
            .add_record(&ResourceKey::TRANSACTIONS, json!({"id": 5, "amount": 75}))
            .await
    );
    let after = client.get(&ResourceKey::TRANSACTIONS).await.unwrap();

    assert_eq!(after.len(), before + 1);
    assert_eq!(transport.total_calls(), 1);
}

#[tokio::test]
async fn test_patches_on_stale_entry_are_ignored() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond(Method::Get, "/employees", json!([{"id": 1, "name": "سالم"}]));
    let client = client(Arc::clone(&transport));

    client.get(&ResourceKey::EMPLOYEES).await.unwrap();
    client.invalidate(&ResourceKey::EMPLOYEES).await;

    assert!(
        !client
            .update_record(&ResourceKey::EMPLOYEES, &json!(1), json!({"name": "سعيد"}))
            .await
    );
    assert!(!client.remove_record(&ResourceKey::EMPLOYEES, &json!(1)).await);
    assert_eq!(client.state(&ResourceKey::EMPLOYEES), EntryState::Stale);
}

#[derive(Debug, Deserialize, PartialEq)]
struct Transaction {
    id: u64,
    amount: u64,
}

#[tokio::test]
async fn test_get_as_decodes_records() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond(Method::Get, "/transactions", transactions_payload(2));
    let client = client(Arc::clone(&transport));

    let decoded: Vec<Transaction> = client.get_as(&ResourceKey::TRANSACTIONS).await.unwrap();

    assert_eq!(
        decoded,
        vec![Transaction { id: 1, amount: 100 }, Transaction { id: 2, amount: 200 }]
    );
}

#[tokio::test]
async fn test_get_as_reports_shape_mismatch() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond(Method::Get, "/transactions", json!([{"id": "x"}]));
    let client = client(Arc::clone(&transport));

    let err = client
        .get_as::<Transaction>(&ResourceKey::TRANSACTIONS)
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Decode { .. }));
}
