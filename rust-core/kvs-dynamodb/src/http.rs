// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! HTTP transport speaking the DynamoDB JSON 1.0 protocol.
//!
//! [`HttpAttributeClient`] owns the resolved endpoint, the `reqwest` client,
//! the signing credentials and the region. Every operation is a signed
//! `POST /` whose `X-Amz-Target` header names the operation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use kvs_core::error::{KvsError, KvsResult};

use crate::error::WireError;
use crate::model::{
    BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput, BatchWriteItemOutput, ErrorBody,
    GetItemInput, GetItemOutput, PutItemInput, PutItemOutput,
};
use crate::resolver::EndpointResolver;
use crate::sigv4::{self, Credentials};
use crate::wire::{AttributeClient, WireResult};

const CONTENT_TYPE_JSON_1_0: &str = "application/x-amz-json-1.0";
const TARGET_PREFIX: &str = "DynamoDB_20120810";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Signed HTTP client for the attribute store.
///
/// # Examples
///
/// ```rust,no_run
/// use kvs_dynamodb::http::HttpAttributeClient;
/// use kvs_dynamodb::resolver::EndpointResolver;
/// use kvs_dynamodb::sigv4::Credentials;
///
/// let client = HttpAttributeClient::new(
///     &EndpointResolver::custom("http://localhost:8000"),
///     "us-east-1",
///     Credentials::new("local", "local"),
/// )
/// .unwrap();
/// assert_eq!(client.endpoint().port(), Some(8000));
/// ```
#[derive(Debug, Clone)]
pub struct HttpAttributeClient {
    endpoint: Url,
    region: String,
    credentials: Credentials,
    http: reqwest::Client,
}

impl HttpAttributeClient {
    /// Build a client for `region`, resolving the endpoint with `resolver`.
    ///
    /// # Errors
    ///
    /// Returns [`KvsError::Configuration`] if the endpoint is invalid or the
    /// HTTP client cannot be built.
    pub fn new(resolver: &EndpointResolver, region: &str, credentials: Credentials) -> KvsResult<Self> {
        Self::with_timeout(resolver, region, credentials, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        resolver: &EndpointResolver,
        region: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> KvsResult<Self> {
        // Installs ring as the process-wide TLS provider; a provider installed
        // earlier by the embedding application wins.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let endpoint = resolver.resolve(region)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KvsError::Configuration(format!("cannot build HTTP client: {e}")))?;

        debug!(endpoint = %endpoint, region, "http attribute client ready");
        Ok(Self {
            endpoint,
            region: region.to_string(),
            credentials,
            http,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sign and send one operation, decoding the JSON response.
    async fn call<I: Serialize, O: DeserializeOwned>(
        &self,
        operation: &str,
        input: &I,
    ) -> WireResult<O> {
        let body = serde_json::to_vec(input)?;
        let target = format!("{}.{}", TARGET_PREFIX, operation);
        let signed = sigv4::sign(
            &self.credentials,
            &self.region,
            &self.endpoint,
            &target,
            CONTENT_TYPE_JSON_1_0,
            &body,
            Utc::now(),
        )?;

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON_1_0)
            .header("x-amz-target", target.as_str());
        for (name, value) in signed.headers {
            request = request.header(name, value);
        }

        let response = request.body(body).send().await?;
        self.handle_response(operation, response).await
    }

    /// Deserialize a successful response or extract an error from the body.
    async fn handle_response<O: DeserializeOwned>(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> WireResult<O> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            debug!(operation, status = status.as_u16(), "request complete");
            serde_json::from_str(&body).map_err(WireError::Serialization)
        } else {
            Err(Self::extract_error(response).await)
        }
    }

    /// Turn a non-2xx response into [`WireError::Service`].
    async fn extract_error(response: reqwest::Response) -> WireError {
        let status = response.status().as_u16();

        // Attempt to parse a structured error body.
        let text = response.text().await.unwrap_or_default();
        let (code, message) = parse_error_body(&text)
            .unwrap_or_else(|| (format!("HTTP {status}"), text.clone()));

        WireError::Service {
            status,
            code,
            message,
        }
    }
}

fn parse_error_body(text: &str) -> Option<(String, String)> {
    let body: ErrorBody = serde_json::from_str(text).ok()?;
    if body.error_type.is_empty() {
        return None;
    }
    Some((body.code().to_string(), body.message))
}

#[async_trait]
impl AttributeClient for HttpAttributeClient {
    async fn get_item(&self, input: GetItemInput) -> WireResult<GetItemOutput> {
        self.call("GetItem", &input).await
    }

    async fn put_item(&self, input: PutItemInput) -> WireResult<PutItemOutput> {
        self.call("PutItem", &input).await
    }

    async fn batch_get_item(&self, input: BatchGetItemInput) -> WireResult<BatchGetItemOutput> {
        self.call("BatchGetItem", &input).await
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> WireResult<BatchWriteItemOutput> {
        self.call("BatchWriteItem", &input).await
    }
}
