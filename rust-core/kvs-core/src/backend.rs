// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core storage backend trait for the KVS client.
//
// Defines the `StorageBackend` trait that every backend adapter and every
// decorator (such as the metrics proxy) implements. Each operation comes in a
// context-aware form and a convenience form that runs without a deadline.
// Backends are expected to be thread-safe (`Send + Sync`) and asynchronous.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::{KvsError, KvsResult};
use crate::record::{Record, Records};

/// Maximum number of keys a single bulk read may carry.
pub const MAX_BULK_KEYS: usize = 100;

/// Reject empty or whitespace-only keys.
pub fn validate_key(key: &str) -> KvsResult<()> {
    if key.trim().is_empty() {
        return Err(KvsError::EmptyKey);
    }
    Ok(())
}

/// Reject bulk reads above [`MAX_BULK_KEYS`].
pub fn validate_bulk_keys(keys: &[&str]) -> KvsResult<()> {
    if keys.len() > MAX_BULK_KEYS {
        return Err(KvsError::TooManyKeys {
            count: keys.len(),
            max: MAX_BULK_KEYS,
        });
    }
    Ok(())
}

/// A key-value storage backend.
///
/// Validation (empty keys, missing records, oversized batches) must happen
/// before any network call. Implementations must be safe to share across
/// threads and tokio tasks.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Retrieve the record stored under `key`.
    ///
    /// Fails with [`KvsError::KeyNotFound`] when nothing is stored, never with
    /// an empty record.
    async fn get_with_context(&self, ctx: &Context, key: &str) -> KvsResult<Record>;

    /// Store `record` under `key`. `None` is rejected with [`KvsError::NilItem`].
    async fn save_with_context(
        &self,
        ctx: &Context,
        key: &str,
        record: Option<Record>,
    ) -> KvsResult<()>;

    /// Retrieve up to [`MAX_BULK_KEYS`] records in one call.
    ///
    /// Keys with no stored record are omitted from the result rather than
    /// reported as errors. Order of the result is unspecified.
    async fn bulk_get_with_context(&self, ctx: &Context, keys: &[&str]) -> KvsResult<Records>;

    /// Store every record in one call.
    ///
    /// Records that cannot be encoded are logged and skipped; the rest are
    /// still written. There is no rollback.
    async fn bulk_save_with_context(&self, ctx: &Context, records: Records) -> KvsResult<()>;

    /// Logical container (table/namespace) this backend is bound to.
    fn container_name(&self) -> &str;

    /// [`get_with_context`](StorageBackend::get_with_context) without a deadline.
    async fn get(&self, key: &str) -> KvsResult<Record> {
        self.get_with_context(&Context::background(), key).await
    }

    /// [`save_with_context`](StorageBackend::save_with_context) without a deadline.
    async fn save(&self, key: &str, record: Option<Record>) -> KvsResult<()> {
        self.save_with_context(&Context::background(), key, record)
            .await
    }

    /// [`bulk_get_with_context`](StorageBackend::bulk_get_with_context) without a deadline.
    async fn bulk_get(&self, keys: &[&str]) -> KvsResult<Records> {
        self.bulk_get_with_context(&Context::background(), keys)
            .await
    }

    /// [`bulk_save_with_context`](StorageBackend::bulk_save_with_context) without a deadline.
    async fn bulk_save(&self, records: Records) -> KvsResult<()> {
        self.bulk_save_with_context(&Context::background(), records)
            .await
    }
}

#[async_trait]
impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    async fn get_with_context(&self, ctx: &Context, key: &str) -> KvsResult<Record> {
        (**self).get_with_context(ctx, key).await
    }

    async fn save_with_context(
        &self,
        ctx: &Context,
        key: &str,
        record: Option<Record>,
    ) -> KvsResult<()> {
        (**self).save_with_context(ctx, key, record).await
    }

    async fn bulk_get_with_context(&self, ctx: &Context, keys: &[&str]) -> KvsResult<Records> {
        (**self).bulk_get_with_context(ctx, keys).await
    }

    async fn bulk_save_with_context(&self, ctx: &Context, records: Records) -> KvsResult<()> {
        (**self).bulk_save_with_context(ctx, records).await
    }

    fn container_name(&self) -> &str {
        (**self).container_name()
    }
}

#[async_trait]
impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    async fn get_with_context(&self, ctx: &Context, key: &str) -> KvsResult<Record> {
        (**self).get_with_context(ctx, key).await
    }

    async fn save_with_context(
        &self,
        ctx: &Context,
        key: &str,
        record: Option<Record>,
    ) -> KvsResult<()> {
        (**self).save_with_context(ctx, key, record).await
    }

    async fn bulk_get_with_context(&self, ctx: &Context, keys: &[&str]) -> KvsResult<Records> {
        (**self).bulk_get_with_context(ctx, keys).await
    }

    async fn bulk_save_with_context(&self, ctx: &Context, records: Records) -> KvsResult<()> {
        (**self).bulk_save_with_context(ctx, records).await
    }

    fn container_name(&self) -> &str {
        (**self).container_name()
    }
}
