// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Step-by-step assembly of a [`DynamoDbBackend`].

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use kvs_core::error::{KvsError, KvsResult};

use crate::client::DynamoDbBackend;
use crate::config::KvsConfig;
use crate::fake::InMemoryAttributeClient;
use crate::http::HttpAttributeClient;
use crate::resolver::EndpointResolver;
use crate::sigv4::Credentials;
use crate::table::TableNaming;
use crate::wire::AttributeClient;

/// Container used by [`DynamoDbBuilder::build_in_memory`] when none is set.
pub const IN_MEMORY_CONTAINER: &str = "__kvs-test";

/// Builder for [`DynamoDbBackend`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use kvs_core::backend::StorageBackend;
/// use kvs_core::record::Record;
/// use kvs_dynamodb::builder::DynamoDbBuilder;
///
/// # tokio_test::block_on(async {
/// let users = DynamoDbBuilder::new()
///     .container_name("users")
///     .ttl(Duration::from_secs(3600))
///     .build_in_memory()
///     .unwrap();
///
/// users.save("1", Some(Record::new("1", &"John Doe", None))).await.unwrap();
/// assert!(users.get("1").await.unwrap().has_expiry());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct DynamoDbBuilder {
    container_name: Option<String>,
    ttl: Option<Duration>,
    resolver: EndpointResolver,
    naming: TableNaming,
    region: Option<String>,
    credentials: Option<Credentials>,
}

impl DynamoDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from `config`.
    pub fn from_config(config: &KvsConfig) -> Self {
        let mut builder = Self::new().region(config.resolved_region());
        if !config.container_name.is_empty() {
            builder = builder.container_name(config.container_name.clone());
        }
        if let Some(ttl) = config.ttl() {
            builder = builder.ttl(ttl);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint(endpoint.clone());
        }
        builder
    }

    pub fn container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = Some(name.into());
        self
    }

    /// Default expiry for records saved without one. Zero disables it.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Send requests to `url` instead of the regional endpoint.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.resolver = EndpointResolver::custom(url);
        self
    }

    pub fn table_naming(mut self, naming: TableNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Build over an existing wire client.
    ///
    /// # Errors
    ///
    /// Returns [`KvsError::Configuration`] if no container name was set.
    pub fn build_with<C: AttributeClient>(self, client: Arc<C>) -> KvsResult<DynamoDbBackend<C>> {
        let container = self
            .container_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| KvsError::Configuration("container name is required".into()))?;
        Ok(DynamoDbBackend::new(client, container, &self.naming, self.ttl))
    }

    /// Build over a signed HTTP client.
    ///
    /// Credentials fall back to the environment; the region falls back to the
    /// environment, then `us-east-1`.
    ///
    /// # Errors
    ///
    /// Returns [`KvsError::Configuration`] if the endpoint is invalid, no
    /// credentials are available, or no container name was set.
    pub fn build_http(self) -> KvsResult<DynamoDbBackend<HttpAttributeClient>> {
        let region = KvsConfig {
            region: self.region.clone(),
            ..KvsConfig::default()
        }
        .resolved_region();
        let credentials = self
            .credentials
            .clone()
            .or_else(Credentials::from_env)
            .ok_or_else(|| {
                KvsError::Configuration(
                    "no credentials configured and AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY unset"
                        .into(),
                )
            })?;

        let client = HttpAttributeClient::new(&self.resolver, &region, credentials)?;
        self.build_with(Arc::new(client))
    }

    /// Build over a fresh in-memory wire client.
    pub fn build_in_memory(self) -> KvsResult<DynamoDbBackend<InMemoryAttributeClient>> {
        let mut builder = self;
        if builder.container_name.is_none() {
            debug!(container = IN_MEMORY_CONTAINER, "no container set, using test container");
            builder.container_name = Some(IN_MEMORY_CONTAINER.to_string());
        }
        builder.build_with(Arc::new(InMemoryAttributeClient::new()))
    }
}
