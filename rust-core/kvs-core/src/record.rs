// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record model for the KVS client.
//
// A `Record` is one key/value/expiry entry. Its value is opaque to the
// storage layer: callers hand in any serializable payload, backends store it
// as JSON text, and reads hand back that JSON text for the caller to decode.
// `Records` is the ordered collection used by the bulk operations.

use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{KvsError, KvsResult};

/// The value held by a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A caller-supplied payload that has not been wire-encoded yet.
    Payload(serde_json::Value),
    /// JSON text exactly as stored by the backend.
    Encoded(String),
    /// A payload whose serialization failed when the record was built.
    Invalid(String),
}

/// A single key/value/expiry entry.
///
/// `expiry` is an absolute Unix timestamp in seconds. Relative TTLs are turned
/// into absolute time when the record is built, not when it is sent.
///
/// # Example
///
/// ```rust
/// use kvs_core::record::Record;
///
/// let record = Record::from_encoded("1", r#"{"id":1,"name":"John Doe"}"#, None);
/// let value: serde_json::Value = record.try_decode_as().unwrap();
/// assert_eq!(value["name"], "John Doe");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Partition key of the entry.
    pub key: String,
    /// Opaque payload.
    pub value: RecordValue,
    /// Absolute expiry in Unix seconds; `None` means the entry never expires.
    pub expiry: Option<i64>,
}

impl Record {
    /// Build a record from any serializable value.
    ///
    /// Never fails: a value that cannot be serialized is kept as
    /// [`RecordValue::Invalid`] and reported when the record is saved.
    pub fn new<V>(key: impl Into<String>, value: &V, ttl: Option<Duration>) -> Self
    where
        V: Serialize + ?Sized,
    {
        let value = match serde_json::to_value(value) {
            Ok(json) => RecordValue::Payload(json),
            Err(err) => RecordValue::Invalid(err.to_string()),
        };
        let mut record = Self {
            key: key.into(),
            value,
            expiry: None,
        };
        if let Some(ttl) = ttl {
            record.set_expiry_after(ttl);
        }
        record
    }

    /// Build a record whose value is already wire-encoded JSON text.
    pub fn from_encoded(key: impl Into<String>, json: impl Into<String>, expiry: Option<i64>) -> Self {
        Self {
            key: key.into(),
            value: RecordValue::Encoded(json.into()),
            expiry,
        }
    }

    /// Set the expiry to `now + ttl`, rounded down to whole seconds.
    pub fn set_expiry_after(&mut self, ttl: Duration) {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.expiry = Some(Utc::now().timestamp().saturating_add(ttl_secs));
    }

    /// True when the record carries a positive expiry timestamp.
    pub fn has_expiry(&self) -> bool {
        matches!(self.expiry, Some(ts) if ts > 0)
    }

    /// True when the record carries an expiry at or before `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.expiry, Some(ts) if ts > 0 && ts <= now)
    }

    /// The JSON text to store on the wire.
    ///
    /// Payloads are encoded; already-encoded values pass through unchanged.
    pub fn encode_value(&self) -> KvsResult<String> {
        match &self.value {
            RecordValue::Payload(json) => {
                serde_json::to_string(json).map_err(|err| KvsError::Marshal(err.to_string()))
            }
            RecordValue::Encoded(text) => Ok(text.clone()),
            RecordValue::Invalid(reason) => Err(KvsError::Marshal(reason.clone())),
        }
    }

    /// Decode the wire-encoded value into `T`.
    ///
    /// Fails with [`KvsError::Convert`] when the value was never wire-encoded
    /// and with [`KvsError::Marshal`] when the JSON text does not fit `T`.
    pub fn try_decode_as<T: DeserializeOwned>(&self) -> KvsResult<T> {
        match &self.value {
            RecordValue::Encoded(text) => {
                serde_json::from_str(text).map_err(|err| KvsError::Marshal(err.to_string()))
            }
            RecordValue::Payload(_) | RecordValue::Invalid(_) => Err(KvsError::Convert),
        }
    }
}

/// An insertion-ordered collection of records.
///
/// Duplicate keys are allowed and kept as separate entries. Iteration never
/// consumes the collection and always starts from the first record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Records {
    items: Vec<Record>,
}

impl Records {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection with room for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Append a record.
    pub fn add(&mut self, record: Record) {
        self.items.push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the collection holds no records.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate the records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.items.iter()
    }

    /// Keys of all records, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|r| r.key.as_str())
    }
}

impl IntoIterator for Records {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Records {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Record> for Records {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Record>> for Records {
    fn from(items: Vec<Record>) -> Self {
        Self { items }
    }
}
