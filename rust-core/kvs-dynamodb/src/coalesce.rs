// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-flight read table.
//
// Concurrent point reads of one key share a single backend call. The first
// caller starts the call as a detached task; later callers subscribe to its
// result. Each caller waits under its own context, and the shared task is
// cancelled only once every waiter has stopped waiting. Results are not
// cached: an entry lives exactly as long as its call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use kvs_core::context::{Context, ContextError};
use kvs_core::error::{KvsError, KvsResult};
use kvs_core::record::Record;

type Shared = Option<KvsResult<Record>>;

struct Call {
    /// Callers currently waiting. Only changed while the table lock is held.
    waiters: AtomicUsize,
    cancel: CancellationToken,
    result: watch::Sender<Shared>,
}

#[derive(Default)]
struct Table {
    calls: Mutex<HashMap<String, Arc<Call>>>,
}

impl Table {
    /// Remove `key` if it still maps to `call`.
    fn remove_current(calls: &mut HashMap<String, Arc<Call>>, key: &str, call: &Arc<Call>) -> bool {
        if calls.get(key).is_some_and(|c| Arc::ptr_eq(c, call)) {
            calls.remove(key);
            return true;
        }
        false
    }
}

/// Deduplicates concurrent reads of the same key.
#[derive(Clone, Default)]
pub struct Coalescer {
    table: Arc<Table>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a read in flight.
    pub fn in_flight(&self) -> usize {
        self.table.calls.lock().len()
    }

    /// Wait for the shared read of `key`, starting it with `fetch` if none is
    /// in flight.
    ///
    /// A context that is already done fails with [`KvsError::Cancelled`]
    /// without starting or joining anything.
    pub async fn run<F, Fut>(&self, ctx: &Context, key: &str, fetch: F) -> KvsResult<Record>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = KvsResult<Record>> + Send + 'static,
    {
        ctx.check()?;

        let call = self.join_or_start(key, fetch);
        let _waiter = WaiterGuard {
            table: self.table.clone(),
            key: key.to_string(),
            call: call.clone(),
        };
        let mut rx = call.result.subscribe();

        let outcome = tokio::select! {
            biased;
            reason = ctx.done() => Err(KvsError::Cancelled(reason)),
            shared = rx.wait_for(Option::is_some) => match shared {
                Ok(value) => (*value)
                    .clone()
                    .unwrap_or_else(|| Err(KvsError::Internal("shared read published nothing".into()))),
                Err(_) => Err(KvsError::Internal("shared read dropped its result".into())),
            },
        };
        outcome
    }

    fn join_or_start<F, Fut>(&self, key: &str, fetch: F) -> Arc<Call>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = KvsResult<Record>> + Send + 'static,
    {
        let call = {
            let mut calls = self.table.calls.lock();
            if let Some(call) = calls.get(key) {
                call.waiters.fetch_add(1, Ordering::Relaxed);
                trace!(key, "joining in-flight read");
                return call.clone();
            }

            let (result, _) = watch::channel(None);
            let call = Arc::new(Call {
                waiters: AtomicUsize::new(1),
                cancel: CancellationToken::new(),
                result,
            });
            calls.insert(key.to_string(), call.clone());
            call
        };

        let mut publisher = Publisher {
            table: self.table.clone(),
            key: key.to_string(),
            call: call.clone(),
            published: false,
        };
        let cancel = call.cancel.clone();
        let fut = fetch();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(KvsError::Cancelled(ContextError::Canceled)),
                result = fut => result,
            };
            publisher.publish(result);
        });

        call
    }
}

/// Owned by the shared task. Publishes the outcome exactly once, even if the
/// task is dropped before finishing.
struct Publisher {
    table: Arc<Table>,
    key: String,
    call: Arc<Call>,
    published: bool,
}

impl Publisher {
    fn publish(&mut self, result: KvsResult<Record>) {
        self.published = true;
        self.finish(result);
    }

    fn finish(&self, result: KvsResult<Record>) {
        {
            let mut calls = self.table.calls.lock();
            Table::remove_current(&mut calls, &self.key, &self.call);
        }
        self.call.result.send_replace(Some(result));
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        if !self.published {
            self.finish(Err(KvsError::Internal(
                "shared read ended without a result".into(),
            )));
        }
    }
}

/// Held by each waiting caller.
struct WaiterGuard {
    table: Arc<Table>,
    key: String,
    call: Arc<Call>,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        let mut calls = self.table.calls.lock();
        let remaining = self.call.waiters.fetch_sub(1, Ordering::Relaxed) - 1;
        if remaining == 0 && Table::remove_current(&mut calls, &self.key, &self.call) {
            self.call.cancel.cancel();
            debug!(key = %self.key, "all waiters left, cancelling shared read");
        }
    }
}
