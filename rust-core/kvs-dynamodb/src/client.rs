// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DynamoDB-style storage backend.
//
// Maps records onto single-partition-key items of one table per container.
// Validation always happens before any wire call. Point reads of the same key
// are coalesced; writes and batch reads go straight to the wire client and
// race the caller's context.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, warn};

use kvs_core::backend::{validate_bulk_keys, validate_key, StorageBackend};
use kvs_core::context::Context;
use kvs_core::error::{KvsError, KvsResult};
use kvs_core::record::{Record, Records};

use crate::attribute::{decode_record, encode_record, key_map};
use crate::coalesce::Coalescer;
use crate::model::{
    BatchGetItemInput, BatchWriteItemInput, GetItemInput, KeysAndAttributes, PutItemInput,
    WriteRequest,
};
use crate::table::TableNaming;
use crate::wire::AttributeClient;

/// A [`StorageBackend`] over an [`AttributeClient`].
///
/// Usually assembled with [`DynamoDbBuilder`](crate::builder::DynamoDbBuilder).
pub struct DynamoDbBackend<C: AttributeClient> {
    client: Arc<C>,
    container_name: String,
    table_name: String,
    default_ttl: Option<Duration>,
    coalescer: Coalescer,
}

impl<C: AttributeClient> DynamoDbBackend<C> {
    /// Bind `client` to `container_name`. The physical table name is derived
    /// once, here.
    pub fn new(
        client: Arc<C>,
        container_name: impl Into<String>,
        naming: &TableNaming,
        default_ttl: Option<Duration>,
    ) -> Self {
        let container_name = container_name.into();
        let table_name = naming.resolve(&container_name);
        debug!(
            container = %container_name,
            table = %table_name,
            default_ttl_secs = default_ttl.map(|ttl| ttl.as_secs()),
            "dynamodb backend ready"
        );
        Self {
            client,
            container_name,
            table_name,
            default_ttl: default_ttl.filter(|ttl| !ttl.is_zero()),
            coalescer: Coalescer::new(),
        }
    }

    /// The wire client this backend delegates to.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Number of keys with a coalesced read in flight.
    pub fn in_flight_reads(&self) -> usize {
        self.coalescer.in_flight()
    }

    /// Expiry to write for `record`: its own if set, otherwise now plus the
    /// default TTL, otherwise none.
    fn expiry_for(&self, record: &Record) -> Option<i64> {
        if record.has_expiry() {
            return record.expiry;
        }
        self.default_ttl.map(|ttl| {
            let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
            Utc::now().timestamp().saturating_add(secs)
        })
    }
}

async fn fetch_item<C: AttributeClient>(client: Arc<C>, input: GetItemInput) -> KvsResult<Record> {
    let output = client.get_item(input).await?;
    match output.item {
        Some(item) if !item.is_empty() => decode_record(item),
        _ => Err(KvsError::KeyNotFound),
    }
}

impl<C: AttributeClient> fmt::Debug for DynamoDbBackend<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamoDbBackend")
            .field("container_name", &self.container_name)
            .field("table_name", &self.table_name)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C: AttributeClient> StorageBackend for DynamoDbBackend<C> {
    async fn get_with_context(&self, ctx: &Context, key: &str) -> KvsResult<Record> {
        validate_key(key)?;

        let client = self.client.clone();
        let input = GetItemInput {
            table_name: self.table_name.clone(),
            key: key_map(key),
        };
        self.coalescer
            .run(ctx, key, move || fetch_item(client, input))
            .await
    }

    async fn save_with_context(
        &self,
        ctx: &Context,
        key: &str,
        record: Option<Record>,
    ) -> KvsResult<()> {
        validate_key(key)?;
        let record = record.ok_or(KvsError::NilItem)?;
        let json = record.encode_value()?;

        let input = PutItemInput {
            table_name: self.table_name.clone(),
            item: encode_record(key, json, self.expiry_for(&record)),
        };
        ctx.run(async { self.client.put_item(input).await.map_err(KvsError::from) })
            .await?;

        debug!(table = %self.table_name, key, "item saved");
        Ok(())
    }

    async fn bulk_get_with_context(&self, ctx: &Context, keys: &[&str]) -> KvsResult<Records> {
        validate_bulk_keys(keys)?;
        for key in keys {
            validate_key(key)?;
        }
        ctx.check()?;

        if keys.is_empty() {
            return Ok(Records::new());
        }

        // The backend rejects a batch that names the same key twice.
        let mut seen = HashSet::with_capacity(keys.len());
        let key_maps = keys
            .iter()
            .filter(|key| seen.insert(**key))
            .map(|key| key_map(key))
            .collect();

        let mut request_items = HashMap::with_capacity(1);
        request_items.insert(self.table_name.clone(), KeysAndAttributes { keys: key_maps });
        let input = BatchGetItemInput { request_items };

        let output = ctx
            .run(async {
                self.client
                    .batch_get_item(input)
                    .await
                    .map_err(KvsError::from)
            })
            .await?;

        for (table, unprocessed) in &output.unprocessed_keys {
            if !unprocessed.keys.is_empty() {
                warn!(
                    table = %table,
                    count = unprocessed.keys.len(),
                    "batch get left keys unprocessed"
                );
            }
        }

        let mut records = Records::with_capacity(keys.len());
        for (table, items) in output.responses {
            for item in items {
                match decode_record(item) {
                    Ok(record) => records.add(record),
                    Err(err) => warn!(table = %table, error = %err, "dropping undecodable item"),
                }
            }
        }

        debug!(
            table = %self.table_name,
            requested = keys.len(),
            found = records.len(),
            "batch get complete"
        );
        Ok(records)
    }

    async fn bulk_save_with_context(&self, ctx: &Context, records: Records) -> KvsResult<()> {
        ctx.check()?;

        let mut requests = Vec::with_capacity(records.len());
        for record in records {
            if validate_key(&record.key).is_err() {
                warn!(table = %self.table_name, "skipping record with empty key");
                continue;
            }
            match record.encode_value() {
                Ok(json) => {
                    let expiry = self.expiry_for(&record);
                    requests.push(WriteRequest::put(encode_record(&record.key, json, expiry)));
                }
                Err(err) => {
                    warn!(table = %self.table_name, key = %record.key, error = %err, "skipping unencodable record");
                }
            }
        }

        if requests.is_empty() {
            debug!(table = %self.table_name, "nothing to write");
            return Ok(());
        }

        let count = requests.len();
        let mut request_items = HashMap::with_capacity(1);
        request_items.insert(self.table_name.clone(), requests);
        let input = BatchWriteItemInput { request_items };

        let output = ctx
            .run(async {
                self.client
                    .batch_write_item(input)
                    .await
                    .map_err(KvsError::from)
            })
            .await
            .map_err(|err| {
                error!(table = %self.table_name, count, error = %err, "batch write failed");
                err
            })?;

        for (table, unprocessed) in &output.unprocessed_items {
            if !unprocessed.is_empty() {
                warn!(
                    table = %table,
                    count = unprocessed.len(),
                    "batch write left items unprocessed"
                );
            }
        }

        debug!(table = %self.table_name, count, "batch write complete");
        Ok(())
    }

    fn container_name(&self) -> &str {
        &self.container_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{EXPIRY_ATTRIBUTE, KEY_ATTRIBUTE, VALUE_ATTRIBUTE};
    use crate::fake::InMemoryAttributeClient;
    use crate::model::{AttributeMap, AttributeValue};

    fn backend(ttl: Option<Duration>) -> (DynamoDbBackend<InMemoryAttributeClient>, Arc<InMemoryAttributeClient>) {
        let client = Arc::new(InMemoryAttributeClient::new());
        let backend = DynamoDbBackend::new(client.clone(), "users", &TableNaming::default(), ttl);
        (backend, client)
    }

    #[tokio::test]
    async fn test_save_writes_key_argument() {
        let (backend, client) = backend(None);

        backend
            .save("1", Some(Record::new("ignored", &"v", None)))
            .await
            .unwrap();

        let item = client.last_put().unwrap();
        assert_eq!(item[KEY_ATTRIBUTE], AttributeValue::S("1".into()));
        assert_eq!(item[VALUE_ATTRIBUTE], AttributeValue::S(r#""v""#.into()));
        assert!(!item.contains_key(EXPIRY_ATTRIBUTE));
    }

    #[tokio::test]
    async fn test_default_ttl_applies_only_without_expiry() {
        let (backend, client) = backend(Some(Duration::from_secs(300)));

        let before = Utc::now().timestamp();
        backend
            .save("1", Some(Record::new("1", &1, None)))
            .await
            .unwrap();
        let item = client.last_put().unwrap();
        let ttl: i64 = item[EXPIRY_ATTRIBUTE].as_n().unwrap().parse().unwrap();
        assert!(ttl >= before + 300 && ttl <= before + 301);

        backend
            .save("2", Some(Record::from_encoded("2", "2", Some(42))))
            .await
            .unwrap();
        let item = client.last_put().unwrap();
        assert_eq!(item[EXPIRY_ATTRIBUTE], AttributeValue::N("42".into()));
    }

    #[tokio::test]
    async fn test_validation_happens_before_io() {
        let (backend, client) = backend(None);

        assert!(matches!(backend.get("").await, Err(KvsError::EmptyKey)));
        assert!(matches!(backend.save("k", None).await, Err(KvsError::NilItem)));
        assert!(matches!(
            backend.bulk_get(&["a", ""]).await,
            Err(KvsError::EmptyKey)
        ));
        assert_eq!(client.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_empty_bulk_get_skips_io() {
        let (backend, client) = backend(None);
        assert!(backend.bulk_get(&[]).await.unwrap().is_empty());
        assert_eq!(client.calls().batch_get_item(), 0);
    }

    #[tokio::test]
    async fn test_bulk_get_dedupes_keys() {
        let (backend, client) = backend(None);
        backend
            .save("a", Some(Record::new("a", &1, None)))
            .await
            .unwrap();

        let found = backend.bulk_get(&["a", "a"]).await.unwrap();
        assert_eq!(found.len(), 1);
        let request = client.calls().batch_get_item();
        assert_eq!(request, 1);
    }

    #[tokio::test]
    async fn test_bulk_get_drops_undecodable_items() {
        let (backend, client) = backend(None);
        client
            .insert_raw("users", key_map("broken"))
            .await
            .unwrap();
        backend
            .save("ok", Some(Record::new("ok", &1, None)))
            .await
            .unwrap();

        let found = backend.bulk_get(&["broken", "ok"]).await.unwrap();
        let keys: Vec<&str> = found.keys().collect();
        assert_eq!(keys, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_bulk_save_with_nothing_valid_sends_nothing() {
        let (backend, client) = backend(None);

        let mut records = Records::new();
        records.add(Record::new("", &1, None));
        backend.bulk_save(records).await.unwrap();
        backend.bulk_save(Records::new()).await.unwrap();

        assert_eq!(client.calls().batch_write_item(), 0);
    }

    #[tokio::test]
    async fn test_bulk_save_is_one_request() {
        let (backend, client) = backend(Some(Duration::from_secs(60)));

        let records: Records = (0..30)
            .map(|i| Record::new(i.to_string(), &i, None))
            .collect();
        backend.bulk_save(records).await.unwrap();

        assert_eq!(client.calls().batch_write_item(), 1);
        let request = client.last_batch_write().unwrap();
        let puts = &request.request_items["users"];
        assert_eq!(puts.len(), 30);
        assert!(puts.iter().all(|w| w
            .put_request
            .as_ref()
            .is_some_and(|p| p.item.contains_key(EXPIRY_ATTRIBUTE))));
    }

    #[tokio::test]
    async fn test_bulk_save_skips_unencodable_and_keeps_explicit_expiry() {
        let (backend, client) = backend(Some(Duration::from_secs(60)));

        // JSON objects need string keys, so this value cannot be encoded.
        let mut unencodable = HashMap::new();
        unencodable.insert((1u8, 2u8), 3u8);

        let mut pinned = Record::new("pinned", &"p", None);
        pinned.expiry = Some(42);

        let mut records = Records::new();
        records.add(Record::new("a", &"a", None));
        records.add(Record::new("broken", &unencodable, None));
        records.add(pinned);
        records.add(Record::new("b", &"b", None));

        let before = Utc::now().timestamp();
        backend.bulk_save(records).await.unwrap();

        assert_eq!(client.calls().batch_write_item(), 1);
        let request = client.last_batch_write().unwrap();
        let items: HashMap<String, AttributeMap> = request.request_items["users"]
            .iter()
            .filter_map(|w| w.put_request.as_ref())
            .map(|p| (p.item[KEY_ATTRIBUTE].as_s().unwrap().to_string(), p.item.clone()))
            .collect();
        assert_eq!(items.len(), 3);
        assert!(!items.contains_key("broken"));

        assert_eq!(items["pinned"][EXPIRY_ATTRIBUTE], AttributeValue::N("42".into()));
        for key in ["a", "b"] {
            let ttl: i64 = items[key][EXPIRY_ATTRIBUTE].as_n().unwrap().parse().unwrap();
            assert!(ttl >= before + 60 && ttl <= before + 61, "ttl {} for {}", ttl, key);
        }
    }

    #[tokio::test]
    async fn test_wire_failure_is_backend_error() {
        let (backend, client) = backend(None);
        client.fail_with(Some("throttled"));

        let err = backend.get("k").await.unwrap_err();
        assert!(err.is_backend());
        assert!(!err.is_not_found());

        let err = backend
            .save("k", Some(Record::new("k", &1, None)))
            .await
            .unwrap_err();
        assert!(matches!(err, KvsError::Backend(_)));
    }

    #[tokio::test]
    async fn test_prefixed_table_naming() {
        let client = Arc::new(InMemoryAttributeClient::new());
        let backend = DynamoDbBackend::new(
            client.clone(),
            "users",
            &TableNaming::prefixed("__kvs-"),
            None,
        );
        assert_eq!(backend.container_name(), "users");
        assert_eq!(backend.table_name(), "__kvs-users");

        backend
            .save("1", Some(Record::new("1", &1, None)))
            .await
            .unwrap();
        assert!(client.item("__kvs-users", "1").await.is_some());
    }
}
