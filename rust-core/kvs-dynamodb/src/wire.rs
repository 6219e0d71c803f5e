// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw wire client port.
//
// The adapter talks to the backend only through this trait, so the HTTP
// client and the in-memory fake are interchangeable.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WireError;
use crate::model::{
    BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput, BatchWriteItemOutput,
    GetItemInput, GetItemOutput, PutItemInput, PutItemOutput,
};

/// Result alias for wire calls.
pub type WireResult<T> = Result<T, WireError>;

/// The four attribute-store operations the adapter issues.
#[async_trait]
pub trait AttributeClient: Send + Sync + 'static {
    async fn get_item(&self, input: GetItemInput) -> WireResult<GetItemOutput>;

    async fn put_item(&self, input: PutItemInput) -> WireResult<PutItemOutput>;

    async fn batch_get_item(&self, input: BatchGetItemInput) -> WireResult<BatchGetItemOutput>;

    async fn batch_write_item(&self, input: BatchWriteItemInput)
        -> WireResult<BatchWriteItemOutput>;
}

#[async_trait]
impl<C: AttributeClient + ?Sized> AttributeClient for Arc<C> {
    async fn get_item(&self, input: GetItemInput) -> WireResult<GetItemOutput> {
        (**self).get_item(input).await
    }

    async fn put_item(&self, input: PutItemInput) -> WireResult<PutItemOutput> {
        (**self).put_item(input).await
    }

    async fn batch_get_item(&self, input: BatchGetItemInput) -> WireResult<BatchGetItemOutput> {
        (**self).batch_get_item(input).await
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> WireResult<BatchWriteItemOutput> {
        (**self).batch_write_item(input).await
    }
}
