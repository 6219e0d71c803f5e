// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Failures raised by wire clients.
//!
//! These never reach callers directly: the adapter wraps them in
//! [`KvsError::Backend`] so the source chain survives.

use kvs_core::error::KvsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    /// An underlying HTTP / network transport error from `reqwest`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A request or response body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The service answered with a non-2xx status.
    #[error("service error ({status}) {code}: {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Error code without namespace, e.g. `ResourceNotFoundException`.
        code: String,
        /// Message from the response body.
        message: String,
    },

    /// The request could not be signed.
    #[error("signing error: {0}")]
    Signing(String),

    /// The fake client was told to fail.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl From<WireError> for KvsError {
    fn from(err: WireError) -> Self {
        KvsError::backend(err)
    }
}
