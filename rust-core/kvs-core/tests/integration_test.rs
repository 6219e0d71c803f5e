// SPDX-License-Identifier: PMPL-1.0-or-later
//! Integration tests composing the typed client, the metrics proxy and the
//! in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use kvs_core::{
    Context, ContextError, InMemoryBackend, KvsError, MetricsBackend, MetricsConfig, Operation,
    Outcome, PrometheusSink, StorageBackend, TypedClient,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
}

fn john() -> User {
    User {
        id: 1,
        name: "John Doe".to_string(),
    }
}

#[tokio::test]
async fn test_typed_client_over_metered_backend() {
    let sink = Arc::new(PrometheusSink::new(MetricsConfig::default()).unwrap());
    let metered = MetricsBackend::new(InMemoryBackend::new("users"), sink.clone());
    let users: TypedClient<User, _> = TypedClient::new(metered);

    assert!(matches!(users.get("1").await, Err(KvsError::KeyNotFound)));
    users.save("1", Some(&john()), None).await.unwrap();
    assert_eq!(users.get("1").await.unwrap(), john());

    assert_eq!(sink.counter_value("users", Operation::Get, Outcome::Miss), 1);
    assert_eq!(sink.counter_value("users", Operation::Get, Outcome::Hit), 1);
    assert_eq!(sink.counter_value("users", Operation::Save, Outcome::Save), 1);
}

#[tokio::test]
async fn test_ttl_sets_future_expiry() {
    let backend = InMemoryBackend::new("users");
    let users: TypedClient<User, _> = TypedClient::new(backend.clone());

    let before = chrono::Utc::now().timestamp();
    users
        .save("1", Some(&john()), Some(Duration::from_secs(60)))
        .await
        .unwrap();

    let record = backend.get("1").await.unwrap();
    let expiry = record.expiry.unwrap();
    assert!(expiry >= before + 60);
    assert!(expiry <= before + 61);
}

#[tokio::test]
async fn test_cancelled_context_through_the_stack() {
    let sink = Arc::new(PrometheusSink::new(MetricsConfig::default()).unwrap());
    let metered = MetricsBackend::new(InMemoryBackend::new("users"), sink.clone());
    let users: TypedClient<User, _> = TypedClient::new(metered);

    let (ctx, token) = Context::with_cancel();
    token.cancel();

    assert!(matches!(
        users.get_with_context(&ctx, "1").await,
        Err(KvsError::Cancelled(ContextError::Canceled))
    ));
    assert_eq!(sink.counter_value("users", Operation::Get, Outcome::Error), 1);
}

#[tokio::test]
async fn test_shared_backend_behind_arc() {
    let backend: Arc<dyn StorageBackend> = Arc::new(InMemoryBackend::new("shared"));
    let a: TypedClient<User, _> = TypedClient::new(backend.clone());
    let b: TypedClient<User, _> = TypedClient::new(backend);

    a.save("1", Some(&john()), None).await.unwrap();
    assert_eq!(b.get("1").await.unwrap(), john());
}
