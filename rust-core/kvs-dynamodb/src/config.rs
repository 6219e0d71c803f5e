// SPDX-License-Identifier: PMPL-1.0-or-later
//! Adapter configuration.
//!
//! Every field has a default, so a partial document deserializes. Environment
//! overrides:
//! - `KVS_CONTAINER_NAME`
//! - `KVS_TTL_SECONDS` (0 or unset: no default expiry)
//! - `KVS_ENDPOINT`
//! - `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::resolver::DEFAULT_REGION;

/// Configuration for a DynamoDB-style backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KvsConfig {
    /// Logical container; also the base of the physical table name.
    pub container_name: String,
    /// Expiry applied to records saved without one.
    pub ttl_seconds: Option<u64>,
    /// Endpoint override, e.g. a local emulator.
    pub endpoint: Option<String>,
    /// Region; `None` falls back to the environment, then `us-east-1`.
    pub region: Option<String>,
}

impl KvsConfig {
    /// Defaults overridden by whatever the environment sets.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = std::env::var("KVS_CONTAINER_NAME") {
            config.container_name = name;
        }
        if let Ok(raw) = std::env::var("KVS_TTL_SECONDS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.ttl_seconds = Some(secs),
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid KVS_TTL_SECONDS"),
            }
        }
        config.endpoint = std::env::var("KVS_ENDPOINT").ok().filter(|e| !e.is_empty());
        config.region = env_region();
        config
    }

    /// Default TTL as a duration; zero means none.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Configured region, then the environment, then `us-east-1`.
    pub fn resolved_region(&self) -> String {
        self.region
            .clone()
            .filter(|r| !r.is_empty())
            .or_else(env_region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }
}

fn env_region() -> Option<String> {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .ok()
        .filter(|r| !r.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: KvsConfig = serde_json::from_str(r#"{"container_name":"users"}"#).unwrap();
        assert_eq!(config.container_name, "users");
        assert_eq!(config.ttl_seconds, None);
        assert_eq!(config.endpoint, None);
    }

    #[test]
    fn test_zero_ttl_means_none() {
        let config = KvsConfig {
            ttl_seconds: Some(0),
            ..KvsConfig::default()
        };
        assert_eq!(config.ttl(), None);

        let config = KvsConfig {
            ttl_seconds: Some(90),
            ..KvsConfig::default()
        };
        assert_eq!(config.ttl(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_explicit_region_wins() {
        let config = KvsConfig {
            region: Some("ap-south-1".into()),
            ..KvsConfig::default()
        };
        assert_eq!(config.resolved_region(), "ap-south-1");
    }
}
