// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cancellation and deadline signal passed to every backend operation.
//
// A `Context` pairs a `CancellationToken` with an optional deadline. Cloning a
// context shares its token, so cancelling any clone cancels them all.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{KvsError, KvsResult};

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context's token was cancelled.
    #[error("context canceled")]
    Canceled,
    /// The context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation/deadline signal for a single logical request.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use kvs_core::context::Context;
///
/// # tokio_test::block_on(async {
/// let ctx = Context::with_timeout(Duration::from_secs(5));
/// assert!(ctx.err().is_none());
///
/// let (ctx, token) = Context::with_cancel();
/// token.cancel();
/// assert!(ctx.err().is_some());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// A context together with the token that cancels it.
    pub fn with_cancel() -> (Self, CancellationToken) {
        let ctx = Self::background();
        let token = ctx.token.clone();
        (ctx, token)
    }

    /// Derive a context that is cancelled with this one but can also be
    /// cancelled on its own. The deadline is inherited.
    pub fn child(&self) -> (Self, CancellationToken) {
        let token = self.token.child_token();
        let ctx = Self {
            token: token.clone(),
            deadline: self.deadline,
        };
        (ctx, token)
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The cancellation token shared by all clones of this context.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns the reason this context is done, or `None` if it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Fail fast with [`KvsError::Cancelled`] if this context is already done.
    pub fn check(&self) -> KvsResult<()> {
        match self.err() {
            Some(reason) => Err(KvsError::Cancelled(reason)),
            None => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// For a background context this never resolves.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => ContextError::Canceled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }

    /// Drive `fut` to completion unless this context finishes first.
    ///
    /// A context that is already done fails before `fut` is polled.
    pub async fn run<F, T>(&self, fut: F) -> KvsResult<T>
    where
        F: Future<Output = KvsResult<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.done() => Err(KvsError::Cancelled(reason)),
            result = fut => result,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
