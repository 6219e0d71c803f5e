// SPDX-License-Identifier: PMPL-1.0-or-later
//! End-to-end behaviour of the DynamoDB adapter over the in-memory wire client,
//! alone and behind the typed client and the metrics proxy.

use std::sync::Arc;
use std::time::Duration;

use kvs_core::{
    Context, ContextError, InMemoryBackend, KvsError, MetricsBackend, MetricsConfig, Operation,
    Outcome, PrometheusSink, Record, StorageBackend, TypedClient, MAX_BULK_KEYS,
};
use kvs_dynamodb::attribute::{EXPIRY_ATTRIBUTE, VALUE_ATTRIBUTE};
use kvs_dynamodb::model::AttributeValue;
use kvs_dynamodb::{DynamoDbBackend, DynamoDbBuilder, InMemoryAttributeClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
}

fn user(id: u32, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn adapter(latency: Option<Duration>) -> (DynamoDbBackend<InMemoryAttributeClient>, Arc<InMemoryAttributeClient>) {
    init_tracing();
    let mut client = InMemoryAttributeClient::new();
    if let Some(latency) = latency {
        client = client.with_latency(latency);
    }
    let client = Arc::new(client);
    let backend = DynamoDbBuilder::new()
        .container_name("users")
        .build_with(client.clone())
        .unwrap();
    (backend, client)
}

#[tokio::test]
async fn test_john_doe_round_trip() {
    let (backend, client) = adapter(None);
    let users: TypedClient<User, _> = TypedClient::new(backend);

    users.save("1", Some(&user(1, "John Doe")), None).await.unwrap();

    let stored = client.item("users", "1").await.unwrap();
    assert_eq!(
        stored[VALUE_ATTRIBUTE],
        AttributeValue::S(r#"{"id":1,"name":"John Doe"}"#.into())
    );
    assert!(!stored.contains_key(EXPIRY_ATTRIBUTE));

    let record = users.backend().get("1").await.unwrap();
    assert_eq!(record.expiry, None);
    assert_eq!(users.get("1").await.unwrap(), user(1, "John Doe"));
}

#[tokio::test]
async fn test_bulk_save_with_key_mapper_then_bulk_get() {
    let (backend, client) = adapter(None);
    let users: TypedClient<User, _> = TypedClient::new(backend);

    let batch = vec![user(101, "a"), user(102, "b"), user(103, "c")];
    users
        .bulk_save(&batch, |u| u.id.to_string(), None)
        .await
        .unwrap();
    assert_eq!(client.calls().batch_write_item(), 1);

    let mut found = users.bulk_get(&["101", "102", "103"]).await.unwrap();
    found.sort_by_key(|(_, u)| u.id);
    let found: Vec<User> = found.into_iter().map(|(_, u)| u).collect();
    assert_eq!(found, batch);
    assert_eq!(client.calls().batch_get_item(), 1);
}

#[tokio::test]
async fn test_ttl_is_written_as_absolute_number() {
    let (backend, client) = adapter(None);
    let users: TypedClient<User, _> = TypedClient::new(backend);

    let before = chrono::Utc::now().timestamp();
    users
        .save("1", Some(&user(1, "John Doe")), Some(Duration::from_secs(1)))
        .await
        .unwrap();
    let after = chrono::Utc::now().timestamp();

    let item = client.last_put().unwrap();
    let ttl: i64 = item[EXPIRY_ATTRIBUTE].as_n().unwrap().parse().unwrap();
    assert!(ttl >= before + 1 && ttl <= after + 1, "ttl {} outside window", ttl);
}

#[tokio::test]
async fn test_validation_errors() {
    let (backend, client) = adapter(None);

    assert!(matches!(backend.get("").await, Err(KvsError::EmptyKey)));
    assert!(matches!(
        backend.save("", Some(Record::new("", &1, None))).await,
        Err(KvsError::EmptyKey)
    ));
    assert!(matches!(backend.save("k", None).await, Err(KvsError::NilItem)));

    let keys: Vec<String> = (0..=MAX_BULK_KEYS).map(|i| i.to_string()).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    assert!(matches!(
        backend.bulk_get(&refs).await,
        Err(KvsError::TooManyKeys { count: 101, max: 100 })
    ));

    assert_eq!(client.calls().total(), 0);
}

#[tokio::test]
async fn test_partial_bulk_get_returns_saved_subset() {
    let (backend, _client) = adapter(None);

    for key in ["a", "c"] {
        backend
            .save(key, Some(Record::new(key, &key, None)))
            .await
            .unwrap();
    }

    let found = backend.bulk_get(&["a", "b", "c", "d"]).await.unwrap();
    let mut keys: Vec<&str> = found.keys().collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["a", "c"]);
}

#[tokio::test]
async fn test_bulk_get_agrees_with_in_memory_backend() {
    let (adapter, _client) = adapter(None);
    let reference = InMemoryBackend::new("users");

    let backends: [&dyn StorageBackend; 2] = [&adapter, &reference];
    for backend in backends {
        for key in ["a", "b"] {
            backend
                .save(key, Some(Record::new(key, &key, None)))
                .await
                .unwrap();
        }
    }

    let inputs: [&[&str]; 5] = [
        &[],
        &["a", "a"],
        &["a", "missing", "b", "a"],
        &["a", ""],
        &["", " "],
    ];
    for keys in inputs {
        let from_adapter = adapter.bulk_get(keys).await;
        let from_reference = reference.bulk_get(keys).await;
        match (from_adapter, from_reference) {
            (Ok(left), Ok(right)) => {
                let mut left: Vec<&str> = left.keys().collect();
                let mut right: Vec<&str> = right.keys().collect();
                left.sort_unstable();
                right.sort_unstable();
                assert_eq!(left, right, "keys {:?}", keys);
            }
            (Err(KvsError::EmptyKey), Err(KvsError::EmptyKey)) => {}
            (left, right) => panic!("keys {:?}: adapter {:?}, in-memory {:?}", keys, left, right),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_gets_of_missing_key_share_one_call() {
    let (backend, client) = adapter(Some(Duration::from_millis(50)));

    let reads = (0..16).map(|_| backend.get("ghost"));
    let results = futures::future::join_all(reads).await;

    assert_eq!(client.calls().get_item(), 1);
    assert!(results
        .iter()
        .all(|r| matches!(r, Err(KvsError::KeyNotFound))));
    assert_eq!(backend.in_flight_reads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_gets_of_present_key_share_one_call() {
    let (backend, client) = adapter(Some(Duration::from_millis(50)));
    backend
        .save("1", Some(Record::new("1", &user(1, "John Doe"), None)))
        .await
        .unwrap();

    let backend = Arc::new(backend);
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let backend = backend.clone();
            tokio::spawn(async move { backend.get("1").await })
        })
        .collect();

    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(client.calls().get_item(), 1);
    assert!(values.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(values[0].try_decode_as::<User>().unwrap(), user(1, "John Doe"));
}

#[tokio::test]
async fn test_cancelled_context_makes_no_call() {
    let (backend, client) = adapter(None);
    let (ctx, token) = Context::with_cancel();
    token.cancel();

    assert!(matches!(
        backend.get_with_context(&ctx, "1").await,
        Err(KvsError::Cancelled(ContextError::Canceled))
    ));
    assert!(matches!(
        backend
            .save_with_context(&ctx, "1", Some(Record::new("1", &1, None)))
            .await,
        Err(KvsError::Cancelled(_))
    ));
    assert!(matches!(
        backend.bulk_get_with_context(&ctx, &["1"]).await,
        Err(KvsError::Cancelled(_))
    ));
    assert_eq!(client.calls().total(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_during_slow_save() {
    let (backend, _client) = adapter(Some(Duration::from_secs(5)));
    let ctx = Context::with_timeout(Duration::from_millis(100));

    let result = backend
        .save_with_context(&ctx, "1", Some(Record::new("1", &1, None)))
        .await;
    assert!(matches!(
        result,
        Err(KvsError::Cancelled(ContextError::DeadlineExceeded))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_initiator_timeout_does_not_fail_other_readers() {
    let (backend, client) = adapter(Some(Duration::from_millis(200)));
    backend
        .save("1", Some(Record::new("1", &1, None)))
        .await
        .unwrap();

    let impatient = Context::with_timeout(Duration::from_millis(10));
    let (first, second) = tokio::join!(
        backend.get_with_context(&impatient, "1"),
        backend.get("1"),
    );

    assert!(matches!(
        first,
        Err(KvsError::Cancelled(ContextError::DeadlineExceeded))
    ));
    assert_eq!(second.unwrap().try_decode_as::<i32>().unwrap(), 1);
    assert_eq!(client.calls().get_item(), 1);
}

#[tokio::test]
async fn test_metrics_proxy_counts_miss_then_hit() {
    let (backend, _client) = adapter(None);
    let sink = Arc::new(PrometheusSink::new(MetricsConfig::default()).unwrap());
    let metered = MetricsBackend::new(backend, sink.clone());

    assert!(matches!(metered.get("1").await, Err(KvsError::KeyNotFound)));
    metered
        .save("1", Some(Record::new("1", &user(1, "John Doe"), None)))
        .await
        .unwrap();
    metered.get("1").await.unwrap();

    assert_eq!(sink.counter_value("users", Operation::Get, Outcome::Miss), 1);
    assert_eq!(sink.counter_value("users", Operation::Get, Outcome::Hit), 1);
    assert_eq!(sink.counter_value("users", Operation::Get, Outcome::Error), 0);
}

#[tokio::test]
async fn test_metrics_proxy_counts_wire_failure_as_error() {
    let (backend, client) = adapter(None);
    let sink = Arc::new(PrometheusSink::new(MetricsConfig::default()).unwrap());
    let metered = MetricsBackend::new(backend, sink.clone());

    client.fail_with(Some("throttled"));
    assert!(metered.get("1").await.unwrap_err().is_backend());
    assert!(metered.bulk_get(&["1", "2"]).await.is_err());

    assert_eq!(sink.counter_value("users", Operation::Get, Outcome::Error), 1);
    assert_eq!(sink.counter_value("users", Operation::BulkGet, Outcome::Error), 1);
    assert_eq!(sink.counter_value("users", Operation::BulkGet, Outcome::Miss), 0);
}
