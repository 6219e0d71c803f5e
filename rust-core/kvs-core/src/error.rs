// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error taxonomy for the KVS client.
//
// Every failure a caller can observe maps to one `KvsError` variant, so that
// expected outcomes (most importantly `KeyNotFound`) can be matched exactly
// without inspecting error strings. The enum is `Clone` because a single
// coalesced read result is delivered to every waiting caller.

use std::sync::Arc;

use thiserror::Error;

use crate::context::ContextError;

/// Boxed error type carried by [`KvsError::Backend`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when interacting with a key-value backend.
#[derive(Debug, Clone, Error)]
pub enum KvsError {
    /// The key was empty or contained only whitespace.
    #[error("key cannot be empty")]
    EmptyKey,

    /// No record exists for the requested key.
    #[error("key not found")]
    KeyNotFound,

    /// A save was attempted without a record.
    #[error("item cannot be nil")]
    NilItem,

    /// A bulk read asked for more keys than a single request may carry.
    #[error("too many keys: {count} (max: {max})")]
    TooManyKeys {
        /// Number of keys supplied by the caller.
        count: usize,
        /// Maximum number of keys per request.
        max: usize,
    },

    /// The stored value is not in its wire-encoded form.
    #[error("failed to convert item")]
    Convert,

    /// The value could not be encoded to, or decoded from, JSON.
    #[error("failed to marshal item: {0}")]
    Marshal(String),

    /// The backend returned a response that violates the adapter's invariants.
    #[error("internal error: {0}")]
    Internal(String),

    /// The client was configured with an unusable setting.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The caller's context was cancelled or its deadline passed.
    #[error("operation cancelled: {0}")]
    Cancelled(ContextError),

    /// A failure surfaced unchanged from the underlying wire call.
    #[error("backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl KvsError {
    /// Wrap any wire-level error as [`KvsError::Backend`].
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        KvsError::Backend(Arc::from(err.into()))
    }

    /// True for the expected "no such key" outcome of a point read.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvsError::KeyNotFound)
    }

    /// True for errors raised before any network attempt.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            KvsError::EmptyKey | KvsError::NilItem | KvsError::TooManyKeys { .. }
        )
    }

    /// True for failures passed through from the wire layer, cancellation included.
    pub fn is_backend(&self) -> bool {
        matches!(self, KvsError::Backend(_) | KvsError::Cancelled(_))
    }
}

/// Crate-level result alias using [`KvsError`].
pub type KvsResult<T> = Result<T, KvsError>;
