// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Container name to physical table name.

use std::fmt;
use std::sync::Arc;

/// Pure function deriving the physical table name from the container name.
#[derive(Clone)]
pub struct TableNaming(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl TableNaming {
    /// Use the container name unchanged.
    pub fn verbatim() -> Self {
        Self::custom(str::to_string)
    }

    /// Prepend `prefix`, e.g. `"__kvs-"`.
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::custom(move |base| format!("{}{}", prefix, base))
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn resolve(&self, base: &str) -> String {
        (self.0)(base)
    }
}

impl Default for TableNaming {
    fn default() -> Self {
        Self::verbatim()
    }
}

impl fmt::Debug for TableNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TableNaming(..)")
    }
}
