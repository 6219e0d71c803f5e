// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory wire client.
//
// Behaves like the attribute store for the subset of the protocol the adapter
// uses: tables spring into existence on first write, missing items come back
// as an absent `Item`, batch reads only return what exists. Every call is
// counted so tests can assert on round trips, and an optional latency keeps
// calls in flight long enough for concurrent readers to overlap.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::RwLock;

use crate::attribute::KEY_ATTRIBUTE;
use crate::error::WireError;
use crate::model::{
    AttributeMap, AttributeValue, BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput,
    BatchWriteItemOutput, GetItemInput, GetItemOutput, PutItemInput, PutItemOutput,
};
use crate::wire::{AttributeClient, WireResult};

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    get_item: AtomicUsize,
    put_item: AtomicUsize,
    batch_get_item: AtomicUsize,
    batch_write_item: AtomicUsize,
}

impl CallCounts {
    pub fn get_item(&self) -> usize {
        self.get_item.load(Ordering::SeqCst)
    }

    pub fn put_item(&self) -> usize {
        self.put_item.load(Ordering::SeqCst)
    }

    pub fn batch_get_item(&self) -> usize {
        self.batch_get_item.load(Ordering::SeqCst)
    }

    pub fn batch_write_item(&self) -> usize {
        self.batch_write_item.load(Ordering::SeqCst)
    }

    /// Sum over all operations.
    pub fn total(&self) -> usize {
        self.get_item() + self.put_item() + self.batch_get_item() + self.batch_write_item()
    }
}

type Tables = HashMap<String, HashMap<String, AttributeMap>>;

/// An [`AttributeClient`] backed by in-process tables.
///
/// Clones share tables, counters and settings.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttributeClient {
    tables: Arc<RwLock<Tables>>,
    calls: Arc<CallCounts>,
    latency: Option<Duration>,
    last_put: Arc<Mutex<Option<AttributeMap>>>,
    last_batch_write: Arc<Mutex<Option<BatchWriteItemInput>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl InMemoryAttributeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before touching the tables.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    /// Item written by the most recent `put_item`.
    pub fn last_put(&self) -> Option<AttributeMap> {
        self.last_put.lock().clone()
    }

    /// Request of the most recent `batch_write_item`.
    pub fn last_batch_write(&self) -> Option<BatchWriteItemInput> {
        self.last_batch_write.lock().clone()
    }

    /// Make every subsequent call fail with `message`, or stop failing with `None`.
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }

    /// Stored item for `key` in `table`, bypassing the counters.
    pub async fn item(&self, table: &str, key: &str) -> Option<AttributeMap> {
        self.tables.read().await.get(table)?.get(key).cloned()
    }

    /// Number of items in `table`.
    pub async fn table_len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, HashMap::len)
    }

    /// Store `item` directly, bypassing the counters.
    pub async fn insert_raw(&self, table: &str, item: AttributeMap) -> WireResult<()> {
        let key = item_key(&item)?;
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .insert(key, item);
        Ok(())
    }

    async fn enter(&self, counter: &AtomicUsize) -> WireResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let failure = self.failure.lock().clone();
        match failure {
            Some(message) => Err(WireError::Injected(message)),
            None => Ok(()),
        }
    }
}

fn item_key(item: &AttributeMap) -> WireResult<String> {
    match item.get(KEY_ATTRIBUTE) {
        Some(AttributeValue::S(key)) => Ok(key.clone()),
        _ => Err(WireError::Service {
            status: 400,
            code: "ValidationException".to_string(),
            message: format!("item is missing string attribute '{}'", KEY_ATTRIBUTE),
        }),
    }
}

#[async_trait]
impl AttributeClient for InMemoryAttributeClient {
    async fn get_item(&self, input: GetItemInput) -> WireResult<GetItemOutput> {
        self.enter(&self.calls.get_item).await?;

        let key = item_key(&input.key)?;
        let tables = self.tables.read().await;
        let item = tables
            .get(&input.table_name)
            .and_then(|table| table.get(&key))
            .cloned();
        Ok(GetItemOutput { item })
    }

    async fn put_item(&self, input: PutItemInput) -> WireResult<PutItemOutput> {
        self.enter(&self.calls.put_item).await?;

        let key = item_key(&input.item)?;
        *self.last_put.lock() = Some(input.item.clone());
        self.tables
            .write()
            .await
            .entry(input.table_name)
            .or_default()
            .insert(key, input.item);
        Ok(PutItemOutput {})
    }

    async fn batch_get_item(&self, input: BatchGetItemInput) -> WireResult<BatchGetItemOutput> {
        self.enter(&self.calls.batch_get_item).await?;

        let tables = self.tables.read().await;
        let mut responses = HashMap::with_capacity(input.request_items.len());
        for (table_name, request) in input.request_items {
            let mut found = Vec::new();
            if let Some(table) = tables.get(&table_name) {
                for key_map in &request.keys {
                    if let Some(item) = table.get(&item_key(key_map)?) {
                        found.push(item.clone());
                    }
                }
            }
            responses.insert(table_name, found);
        }
        Ok(BatchGetItemOutput {
            responses,
            unprocessed_keys: HashMap::new(),
        })
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> WireResult<BatchWriteItemOutput> {
        self.enter(&self.calls.batch_write_item).await?;

        *self.last_batch_write.lock() = Some(input.clone());
        let mut tables = self.tables.write().await;
        for (table_name, requests) in input.request_items {
            let table = tables.entry(table_name).or_default();
            for put in requests.into_iter().filter_map(|r| r.put_request) {
                let key = item_key(&put.item)?;
                table.insert(key, put.item);
            }
        }
        Ok(BatchWriteItemOutput::default())
    }
}
