// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// KVS Core
//
// This crate provides the backend-agnostic half of the KVS client: the record
// model, the `StorageBackend` port every adapter implements, and the
// instrumentation proxy that wraps any backend with call metrics.
//
// # Modules
//
// - [`backend`] -- The `StorageBackend` trait and shared key validation.
// - [`context`] -- Cancellation/deadline signal passed to every operation.
// - [`error`] -- The `KvsError` enum covering all observable failures.
// - [`memory`] -- An in-memory `BTreeMap`-based backend for tests and local use.
// - [`metrics`] -- A transparent wrapper that emits hit/miss/error counters.
// - [`record`] -- `Record` and `Records`, the unit of storage.
// - [`typed`] -- A serde-based typed client over any backend.
//
// # Example
//
// ```rust
// use std::sync::Arc;
// use kvs_core::memory::InMemoryBackend;
// use kvs_core::metrics::{MetricsBackend, MetricsConfig, PrometheusSink};
// use kvs_core::typed::TypedClient;
//
// # tokio_test::block_on(async {
// let sink = Arc::new(PrometheusSink::new(MetricsConfig::default()).unwrap());
// let metered = MetricsBackend::new(InMemoryBackend::new("entities"), sink);
//
// let store: TypedClient<serde_json::Value, _> = TypedClient::new(metered);
// store.save("e1", Some(&serde_json::json!({"name": "test"})), None).await.unwrap();
//
// let val = store.get("e1").await.unwrap();
// assert_eq!(val["name"], "test");
// # });
// ```

pub mod backend;
pub mod context;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod record;
pub mod typed;

// Re-export the most commonly used types at the crate root for convenience.
pub use backend::{StorageBackend, MAX_BULK_KEYS};
pub use context::{Context, ContextError};
pub use error::{KvsError, KvsResult};
pub use memory::InMemoryBackend;
pub use metrics::{MetricsBackend, MetricsConfig, MetricsSink, Operation, Outcome, PrometheusSink};
pub use record::{Record, RecordValue, Records};
pub use typed::TypedClient;
