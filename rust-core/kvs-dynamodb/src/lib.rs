// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// KVS DynamoDB Adapter
//
// A `StorageBackend` for attribute stores that speak the DynamoDB JSON 1.0
// protocol. One container maps to one table keyed by a single string
// attribute; values are stored as JSON text with an optional numeric expiry.
//
// # Modules
//
// - [`attribute`] -- Record to attribute-map mapping.
// - [`builder`] -- `DynamoDbBuilder` for assembling a backend.
// - [`client`] -- `DynamoDbBackend`, the adapter itself.
// - [`coalesce`] -- The in-flight read table shared by concurrent gets.
// - [`config`] -- Serde/env configuration.
// - [`error`] -- `WireError`, failures raised below the adapter.
// - [`fake`] -- An in-memory wire client for tests and local development.
// - [`http`] -- The signed `reqwest` wire client.
// - [`model`] -- Request/response shapes of the protocol.
// - [`resolver`] -- Endpoint override and validation.
// - [`sigv4`] -- AWS Signature Version 4.
// - [`table`] -- Container name to table name.
// - [`wire`] -- The `AttributeClient` port.
//
// # Example
//
// ```rust
// use std::sync::Arc;
// use kvs_core::metrics::{MetricsBackend, MetricsConfig, PrometheusSink};
// use kvs_core::typed::TypedClient;
// use kvs_dynamodb::builder::DynamoDbBuilder;
//
// # tokio_test::block_on(async {
// let sink = Arc::new(PrometheusSink::new(MetricsConfig::default()).unwrap());
// let backend = DynamoDbBuilder::new().container_name("users").build_in_memory().unwrap();
// let users: TypedClient<serde_json::Value, _> =
//     TypedClient::new(MetricsBackend::new(backend, sink));
//
// users.save("1", Some(&serde_json::json!({"id": 1, "name": "John Doe"})), None).await.unwrap();
// assert_eq!(users.get("1").await.unwrap()["name"], "John Doe");
// # });
// ```

pub mod attribute;
pub mod builder;
pub mod client;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod fake;
pub mod http;
pub mod model;
pub mod resolver;
pub mod sigv4;
pub mod table;
pub mod wire;

pub use builder::DynamoDbBuilder;
pub use client::DynamoDbBackend;
pub use config::KvsConfig;
pub use error::WireError;
pub use fake::InMemoryAttributeClient;
pub use http::HttpAttributeClient;
pub use resolver::EndpointResolver;
pub use sigv4::Credentials;
pub use table::TableNaming;
pub use wire::AttributeClient;
