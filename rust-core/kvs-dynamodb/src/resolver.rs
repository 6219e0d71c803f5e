// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Endpoint resolution for the HTTP wire client.
//!
//! An explicit endpoint (a local emulator, a VPC endpoint) overrides the
//! regional default. Overrides are validated up front so a typo fails at build
//! time rather than on the first request.

use tracing::{debug, warn};
use url::Url;

use kvs_core::error::{KvsError, KvsResult};

/// Region used when neither configuration nor environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointResolver {
    custom: Option<String>,
}

impl EndpointResolver {
    /// Resolve to the regional endpoint.
    pub fn regional() -> Self {
        Self { custom: None }
    }

    /// Resolve every region to `url`.
    pub fn custom(url: impl Into<String>) -> Self {
        Self {
            custom: Some(url.into()),
        }
    }

    /// The raw override, if any.
    pub fn custom_url(&self) -> Option<&str> {
        self.custom.as_deref()
    }

    /// The endpoint for `region`.
    ///
    /// # Errors
    ///
    /// Returns [`KvsError::Configuration`] if the override cannot be parsed or
    /// has no host.
    pub fn resolve(&self, region: &str) -> KvsResult<Url> {
        let Some(raw) = self.custom.as_deref() else {
            let regional = format!("https://dynamodb.{}.amazonaws.com", region);
            return Url::parse(&regional).map_err(|e| {
                KvsError::Configuration(format!("invalid region '{}': {}", region, e))
            });
        };

        let url = Url::parse(raw).map_err(|e| {
            warn!(endpoint = raw, error = %e, "invalid custom endpoint");
            KvsError::Configuration(format!("invalid endpoint URL '{}': {}", raw, e))
        })?;

        if url.host_str().map_or(true, str::is_empty) {
            warn!(endpoint = raw, "custom endpoint has no host");
            return Err(KvsError::Configuration(format!(
                "endpoint URL '{}' has no host",
                raw
            )));
        }

        debug!(endpoint = %url, region, "using custom endpoint");
        Ok(url)
    }
}
