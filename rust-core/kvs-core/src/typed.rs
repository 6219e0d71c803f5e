// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed client for the KVS storage layer.
//
// Provides a serde-based interface on top of any `StorageBackend`, so callers
// deal in their own domain types instead of `Record`s. Encoding goes through
// the record model, so typed and untyped callers can share a container.

use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::backend::StorageBackend;
use crate::context::Context;
use crate::error::{KvsError, KvsResult};
use crate::record::{Record, Records};

/// A typed wrapper around a [`StorageBackend`] bound to one value type.
///
/// # Example
///
/// ```rust
/// use kvs_core::memory::InMemoryBackend;
/// use kvs_core::typed::TypedClient;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Serialize, Deserialize, PartialEq)]
/// struct User { id: u32, name: String }
///
/// # tokio_test::block_on(async {
/// let users: TypedClient<User, _> = TypedClient::new(InMemoryBackend::new("users"));
///
/// let john = User { id: 1, name: "John Doe".into() };
/// users.save("1", Some(&john), None).await.unwrap();
///
/// assert_eq!(users.get("1").await.unwrap(), john);
/// # });
/// ```
pub struct TypedClient<T, B: StorageBackend> {
    /// The underlying record backend.
    backend: B,
    _marker: PhantomData<fn() -> T>,
}

impl<T, B> TypedClient<T, B>
where
    T: Serialize + DeserializeOwned,
    B: StorageBackend,
{
    /// Create a typed client over `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            _marker: PhantomData,
        }
    }

    /// Return a reference to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Retrieve and decode the value stored under `key`.
    pub async fn get(&self, key: &str) -> KvsResult<T> {
        self.get_with_context(&Context::background(), key).await
    }

    /// [`get`](Self::get) bounded by `ctx`.
    pub async fn get_with_context(&self, ctx: &Context, key: &str) -> KvsResult<T> {
        let record = self.backend.get_with_context(ctx, key).await?;
        record.try_decode_as()
    }

    /// Encode and store `value` under `key`, optionally expiring after `ttl`.
    pub async fn save(&self, key: &str, value: Option<&T>, ttl: Option<Duration>) -> KvsResult<()> {
        self.save_with_context(&Context::background(), key, value, ttl)
            .await
    }

    /// [`save`](Self::save) bounded by `ctx`.
    pub async fn save_with_context(
        &self,
        ctx: &Context,
        key: &str,
        value: Option<&T>,
        ttl: Option<Duration>,
    ) -> KvsResult<()> {
        let record = value.map(|v| Record::new(key, v, ttl));
        self.backend.save_with_context(ctx, key, record).await
    }

    /// Retrieve every stored value among `keys` as `(key, value)` pairs.
    ///
    /// Missing keys are omitted. Values that do not decode as `T` are logged
    /// and skipped.
    pub async fn bulk_get(&self, keys: &[&str]) -> KvsResult<Vec<(String, T)>> {
        self.bulk_get_with_context(&Context::background(), keys)
            .await
    }

    /// [`bulk_get`](Self::bulk_get) bounded by `ctx`.
    pub async fn bulk_get_with_context(
        &self,
        ctx: &Context,
        keys: &[&str],
    ) -> KvsResult<Vec<(String, T)>> {
        let records = self.backend.bulk_get_with_context(ctx, keys).await?;

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            match record.try_decode_as::<T>() {
                Ok(value) => results.push((record.key, value)),
                Err(err) => {
                    warn!(
                        container = self.backend.container_name(),
                        key = %record.key,
                        error = %err,
                        "skipping record that does not decode"
                    );
                }
            }
        }
        Ok(results)
    }

    /// Store every value, deriving each key with `key_of`.
    pub async fn bulk_save<F>(&self, values: &[T], key_of: F, ttl: Option<Duration>) -> KvsResult<()>
    where
        F: Fn(&T) -> String,
    {
        self.bulk_save_with_context(&Context::background(), values, key_of, ttl)
            .await
    }

    /// [`bulk_save`](Self::bulk_save) bounded by `ctx`. An empty slice is a no-op.
    pub async fn bulk_save_with_context<F>(
        &self,
        ctx: &Context,
        values: &[T],
        key_of: F,
        ttl: Option<Duration>,
    ) -> KvsResult<()>
    where
        F: Fn(&T) -> String,
    {
        if values.is_empty() {
            return Ok(());
        }
        let records: Records = values
            .iter()
            .map(|value| Record::new(key_of(value), value, ttl))
            .collect();
        self.backend.bulk_save_with_context(ctx, records).await
    }

    /// Like [`get`](Self::get), but maps a missing key to `Ok(None)`.
    pub async fn find(&self, key: &str) -> KvsResult<Option<T>> {
        self.find_with_context(&Context::background(), key).await
    }

    /// [`find`](Self::find) bounded by `ctx`.
    pub async fn find_with_context(&self, ctx: &Context, key: &str) -> KvsResult<Option<T>> {
        match self.get_with_context(ctx, key).await {
            Ok(value) => Ok(Some(value)),
            Err(KvsError::KeyNotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
