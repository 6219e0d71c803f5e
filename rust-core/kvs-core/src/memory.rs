// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory storage backend for the KVS client.
//
// Uses a `BTreeMap` wrapped in a tokio `RwLock` for thread-safe key-value
// storage. Records are kept in their wire-encoded form so reads behave exactly
// like reads from a remote backend. Intended for testing and local
// development of code that depends on a `StorageBackend`.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::backend::{validate_bulk_keys, validate_key, StorageBackend};
use crate::context::Context;
use crate::error::{KvsError, KvsResult};
use crate::record::{Record, Records};

/// Value and expiry of one stored entry.
#[derive(Debug, Clone)]
struct StoredEntry {
    json: String,
    expiry: Option<i64>,
}

/// An in-memory storage backend backed by a sorted `BTreeMap`.
///
/// All data lives in process memory and is lost on drop. Clones share state.
/// Entries whose expiry has passed are treated as absent.
///
/// # Example
///
/// ```rust
/// use kvs_core::backend::StorageBackend;
/// use kvs_core::memory::InMemoryBackend;
/// use kvs_core::record::Record;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryBackend::new("users");
/// store.save("hello", Some(Record::new("hello", &"world", None))).await.unwrap();
/// let record = store.get("hello").await.unwrap();
/// assert_eq!(record.try_decode_as::<String>().unwrap(), "world");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    container_name: Arc<str>,
    data: Arc<RwLock<BTreeMap<String, StoredEntry>>>,
}

impl InMemoryBackend {
    /// Create a new, empty in-memory backend for `container_name`.
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: Arc::from(container_name.into()),
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Return the number of keys currently stored, expired ones included.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Return true if the store contains no keys.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    fn lookup(map: &BTreeMap<String, StoredEntry>, key: &str, now: i64) -> Option<Record> {
        let entry = map.get(key)?;
        let record = Record::from_encoded(key, entry.json.clone(), entry.expiry);
        if record.is_expired_at(now) {
            return None;
        }
        Some(record)
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn get_with_context(&self, ctx: &Context, key: &str) -> KvsResult<Record> {
        validate_key(key)?;
        ctx.check()?;

        let map = self.data.read().await;
        Self::lookup(&map, key, Utc::now().timestamp()).ok_or(KvsError::KeyNotFound)
    }

    async fn save_with_context(
        &self,
        ctx: &Context,
        key: &str,
        record: Option<Record>,
    ) -> KvsResult<()> {
        validate_key(key)?;
        let record = record.ok_or(KvsError::NilItem)?;
        ctx.check()?;

        let json = record.encode_value()?;
        let mut map = self.data.write().await;
        map.insert(
            key.to_string(),
            StoredEntry {
                json,
                expiry: record.expiry.filter(|ts| *ts > 0),
            },
        );
        Ok(())
    }

    async fn bulk_get_with_context(&self, ctx: &Context, keys: &[&str]) -> KvsResult<Records> {
        validate_bulk_keys(keys)?;
        for key in keys {
            validate_key(key)?;
        }
        ctx.check()?;

        let now = Utc::now().timestamp();
        let map = self.data.read().await;
        let mut seen = HashSet::with_capacity(keys.len());
        Ok(keys
            .iter()
            .filter(|key| seen.insert(**key))
            .filter_map(|key| Self::lookup(&map, key, now))
            .collect())
    }

    async fn bulk_save_with_context(&self, ctx: &Context, records: Records) -> KvsResult<()> {
        ctx.check()?;

        let mut map = self.data.write().await;
        for record in records {
            if validate_key(&record.key).is_err() {
                warn!(container = %self.container_name, "skipping record with empty key");
                continue;
            }
            match record.encode_value() {
                Ok(json) => {
                    map.insert(
                        record.key,
                        StoredEntry {
                            json,
                            expiry: record.expiry.filter(|ts| *ts > 0),
                        },
                    );
                }
                Err(err) => {
                    warn!(container = %self.container_name, key = %record.key, error = %err, "skipping unencodable record");
                }
            }
        }
        Ok(())
    }

    fn container_name(&self) -> &str {
        &self.container_name
    }
}
