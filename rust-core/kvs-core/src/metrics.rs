// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for KVS storage backends.
//
// Wraps any `StorageBackend` and emits a counter and a latency sample for
// every call, labelled by container, operation and outcome. The sink that
// receives them is injected at construction; whoever assembles the proxy owns
// its lifetime. Results from the wrapped backend are returned untouched.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use serde::{Deserialize, Serialize};

use crate::backend::StorageBackend;
use crate::context::Context;
use crate::error::{KvsError, KvsResult};
use crate::record::{Record, Records};

/// Backend operation being measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Save,
    BulkGet,
    BulkSave,
}

impl Operation {
    /// Label value used for the `event_type` dimension.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Save => "save",
            Operation::BulkGet => "bulk_get",
            Operation::BulkSave => "bulk_save",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome class of a measured call.
///
/// `Miss` is a normal outcome of a read and must stay distinct from `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Hit,
    Miss,
    Error,
    Save,
}

impl Outcome {
    /// Label value used for the `event_subtype` dimension.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
            Outcome::Error => "error",
            Outcome::Save => "save",
        }
    }

    /// Classify the result of a point read.
    pub fn of_get<T>(result: &KvsResult<T>) -> Self {
        match result {
            Ok(_) => Outcome::Hit,
            Err(KvsError::KeyNotFound) => Outcome::Miss,
            Err(_) => Outcome::Error,
        }
    }

    /// Classify the result of a write.
    pub fn of_save<T>(result: &KvsResult<T>) -> Self {
        match result {
            Ok(_) => Outcome::Save,
            Err(_) => Outcome::Error,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for the proxy's counters and timers.
///
/// Implementations must tolerate concurrent calls.
pub trait MetricsSink: Send + Sync {
    /// Add `value` to the counter for this label set.
    fn increment_counter(&self, client_name: &str, operation: Operation, outcome: Outcome, value: u64);

    /// Record one latency sample for this label set.
    fn record_execution_time(
        &self,
        client_name: &str,
        operation: Operation,
        outcome: Outcome,
        elapsed: Duration,
    );
}

/// Process-level labels attached to every sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Kind of client emitting the metrics.
    pub service_type: String,
    /// Deployment environment, lower-cased.
    pub environment: String,
    /// Name of the application embedding the client.
    pub application: String,
}

impl MetricsConfig {
    /// Read `ENV` and `APP_NAME` from the process environment.
    pub fn from_env() -> Self {
        Self {
            environment: std::env::var("ENV").unwrap_or_default().to_lowercase(),
            application: std::env::var("APP_NAME").unwrap_or_default(),
            ..Self::default()
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            service_type: "kvs-client".to_string(),
            environment: String::new(),
            application: String::new(),
        }
    }
}

const METRICS_NAMESPACE: &str = "kvs";

const LABEL_NAMES: [&str; 6] = [
    "service_type",
    "environment",
    "application",
    "client_name",
    "event_type",
    "event_subtype",
];

/// Latency buckets in milliseconds.
const TIMER_BUCKETS_MS: [f64; 12] = [
    1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

/// Prometheus-backed [`MetricsSink`].
///
/// Exposes `kvs_counter` (integer counter) and `kvs_timer` (histogram in
/// milliseconds), both labelled by [`LABEL_NAMES`].
#[derive(Clone)]
pub struct PrometheusSink {
    config: MetricsConfig,
    counter: IntCounterVec,
    timer: HistogramVec,
}

impl PrometheusSink {
    /// Create the metric families without registering them anywhere.
    pub fn new(config: MetricsConfig) -> KvsResult<Self> {
        let counter = IntCounterVec::new(
            Opts::new("counter", "KVS client call counter").namespace(METRICS_NAMESPACE),
            &LABEL_NAMES,
        )
        .map_err(|e| KvsError::Configuration(e.to_string()))?;

        let timer = HistogramVec::new(
            HistogramOpts::new("timer", "KVS client call latency in milliseconds")
                .namespace(METRICS_NAMESPACE)
                .buckets(TIMER_BUCKETS_MS.to_vec()),
            &LABEL_NAMES,
        )
        .map_err(|e| KvsError::Configuration(e.to_string()))?;

        Ok(Self {
            config,
            counter,
            timer,
        })
    }

    /// Create the metric families and register them with `registry`.
    ///
    /// Registering twice against the same registry fails with
    /// [`KvsError::Configuration`]; build one sink at startup and share it.
    pub fn register(registry: &Registry, config: MetricsConfig) -> KvsResult<Self> {
        let sink = Self::new(config)?;
        registry
            .register(Box::new(sink.counter.clone()))
            .map_err(|e| KvsError::Configuration(e.to_string()))?;
        registry
            .register(Box::new(sink.timer.clone()))
            .map_err(|e| KvsError::Configuration(e.to_string()))?;
        Ok(sink)
    }

    /// Current counter value for a label set.
    pub fn counter_value(&self, client_name: &str, operation: Operation, outcome: Outcome) -> u64 {
        self.counter
            .with_label_values(&self.label_values(client_name, operation, outcome))
            .get()
    }

    /// Number of latency samples recorded for a label set.
    pub fn timer_count(&self, client_name: &str, operation: Operation, outcome: Outcome) -> u64 {
        self.timer
            .with_label_values(&self.label_values(client_name, operation, outcome))
            .get_sample_count()
    }

    fn label_values<'a>(
        &'a self,
        client_name: &'a str,
        operation: Operation,
        outcome: Outcome,
    ) -> [&'a str; 6] {
        [
            self.config.service_type.as_str(),
            self.config.environment.as_str(),
            self.config.application.as_str(),
            client_name,
            operation.as_str(),
            outcome.as_str(),
        ]
    }
}

impl fmt::Debug for PrometheusSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusSink")
            .field("config", &self.config)
            .finish()
    }
}

impl MetricsSink for PrometheusSink {
    fn increment_counter(&self, client_name: &str, operation: Operation, outcome: Outcome, value: u64) {
        self.counter
            .with_label_values(&self.label_values(client_name, operation, outcome))
            .inc_by(value);
    }

    fn record_execution_time(
        &self,
        client_name: &str,
        operation: Operation,
        outcome: Outcome,
        elapsed: Duration,
    ) {
        self.timer
            .with_label_values(&self.label_values(client_name, operation, outcome))
            .observe(elapsed.as_secs_f64() * 1000.0);
    }
}

/// A storage backend wrapper that emits call metrics.
///
/// Delegates every operation to an inner backend while measuring wall-clock
/// latency and classifying the outcome. Wrapping a `MetricsBackend` in another
/// one is allowed, but both will count the same calls.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use kvs_core::backend::StorageBackend;
/// use kvs_core::memory::InMemoryBackend;
/// use kvs_core::metrics::{MetricsBackend, MetricsConfig, Operation, Outcome, PrometheusSink};
///
/// # tokio_test::block_on(async {
/// let sink = Arc::new(PrometheusSink::new(MetricsConfig::default()).unwrap());
/// let metered = MetricsBackend::new(InMemoryBackend::new("users"), sink.clone());
///
/// let _ = metered.get("missing").await;
/// assert_eq!(sink.counter_value("users", Operation::Get, Outcome::Miss), 1);
/// # });
/// ```
pub struct MetricsBackend<B: StorageBackend> {
    /// The wrapped backend that performs the actual storage operations.
    inner: B,
    /// Receiver of counters and timers.
    sink: Arc<dyn MetricsSink>,
}

impl<B: StorageBackend> MetricsBackend<B> {
    /// Wrap `inner`, reporting to `sink`.
    pub fn new(inner: B, sink: Arc<dyn MetricsSink>) -> Self {
        Self { inner, sink }
    }

    /// Return a reference to the inner backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Return the sink this proxy reports to.
    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    fn observe(&self, operation: Operation, outcome: Outcome, elapsed: Duration) {
        let client_name = self.inner.container_name();
        self.sink
            .increment_counter(client_name, operation, outcome, 1);
        self.sink
            .record_execution_time(client_name, operation, outcome, elapsed);
    }
}

impl<B: StorageBackend + fmt::Debug> fmt::Debug for MetricsBackend<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsBackend")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<B: StorageBackend> StorageBackend for MetricsBackend<B> {
    async fn get_with_context(&self, ctx: &Context, key: &str) -> KvsResult<Record> {
        let start = Instant::now();
        let result = self.inner.get_with_context(ctx, key).await;
        self.observe(Operation::Get, Outcome::of_get(&result), start.elapsed());
        result
    }

    async fn save_with_context(
        &self,
        ctx: &Context,
        key: &str,
        record: Option<Record>,
    ) -> KvsResult<()> {
        let start = Instant::now();
        let result = self.inner.save_with_context(ctx, key, record).await;
        self.observe(Operation::Save, Outcome::of_save(&result), start.elapsed());
        result
    }

    async fn bulk_get_with_context(&self, ctx: &Context, keys: &[&str]) -> KvsResult<Records> {
        let start = Instant::now();
        let result = self.inner.bulk_get_with_context(ctx, keys).await;
        let elapsed = start.elapsed();
        let client_name = self.inner.container_name();

        match &result {
            Ok(records) => {
                let requested: HashSet<&str> = keys.iter().copied().collect();
                let returned: HashSet<&str> = records.keys().collect();
                let hits = returned.len() as u64;
                let misses = requested.difference(&returned).count() as u64;
                if hits > 0 {
                    self.sink
                        .increment_counter(client_name, Operation::BulkGet, Outcome::Hit, hits);
                }
                // A call that found nothing still leaves a miss sample, even a zero one.
                if misses > 0 || hits == 0 {
                    self.sink
                        .increment_counter(client_name, Operation::BulkGet, Outcome::Miss, misses);
                }
                let outcome = if hits > 0 { Outcome::Hit } else { Outcome::Miss };
                self.sink
                    .record_execution_time(client_name, Operation::BulkGet, outcome, elapsed);
            }
            Err(_) => self.observe(Operation::BulkGet, Outcome::Error, elapsed),
        }

        result
    }

    async fn bulk_save_with_context(&self, ctx: &Context, records: Records) -> KvsResult<()> {
        let start = Instant::now();
        let result = self.inner.bulk_save_with_context(ctx, records).await;
        self.observe(Operation::BulkSave, Outcome::of_save(&result), start.elapsed());
        result
    }

    fn container_name(&self) -> &str {
        self.inner.container_name()
    }
}
