// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Mapping between [`Record`]s and attribute maps.
//!
//! Every item carries `key` (S) and `value` (S, JSON text). `ttl` (N, Unix
//! seconds) is written only for a positive expiry.

use kvs_core::error::{KvsError, KvsResult};
use kvs_core::record::Record;

use crate::model::{AttributeMap, AttributeValue};

pub const KEY_ATTRIBUTE: &str = "key";
pub const VALUE_ATTRIBUTE: &str = "value";
pub const EXPIRY_ATTRIBUTE: &str = "ttl";

/// Attribute map addressing a single item by key.
pub fn key_map(key: &str) -> AttributeMap {
    let mut map = AttributeMap::with_capacity(1);
    map.insert(KEY_ATTRIBUTE.to_string(), AttributeValue::S(key.to_string()));
    map
}

/// Build the stored item for `key` with wire-encoded `json` and optional expiry.
pub fn encode_record(key: &str, json: String, expiry: Option<i64>) -> AttributeMap {
    let mut map = AttributeMap::with_capacity(3);
    map.insert(KEY_ATTRIBUTE.to_string(), AttributeValue::S(key.to_string()));
    map.insert(VALUE_ATTRIBUTE.to_string(), AttributeValue::S(json));
    if let Some(ts) = expiry.filter(|ts| *ts > 0) {
        map.insert(EXPIRY_ATTRIBUTE.to_string(), AttributeValue::N(ts.to_string()));
    }
    map
}

/// Turn a stored item back into a [`Record`] holding the raw JSON text.
pub fn decode_record(mut item: AttributeMap) -> KvsResult<Record> {
    let key = take_string(&mut item, KEY_ATTRIBUTE)?;
    let value = take_string(&mut item, VALUE_ATTRIBUTE)?;

    let expiry = match item.remove(EXPIRY_ATTRIBUTE) {
        None => None,
        Some(AttributeValue::N(text)) => {
            let ts = parse_expiry(&text)?;
            Some(ts).filter(|ts| *ts > 0)
        }
        Some(other) => {
            return Err(KvsError::Internal(format!(
                "attribute '{}' is not a number: {:?}",
                EXPIRY_ATTRIBUTE, other
            )))
        }
    };

    Ok(Record::from_encoded(key, value, expiry))
}

fn take_string(item: &mut AttributeMap, name: &str) -> KvsResult<String> {
    match item.remove(name) {
        Some(AttributeValue::S(s)) => Ok(s),
        Some(other) => Err(KvsError::Internal(format!(
            "attribute '{}' is not a string: {:?}",
            name, other
        ))),
        None => Err(KvsError::Internal(format!("attribute '{}' is missing", name))),
    }
}

// Numbers may come back in a non-integral form such as "1.7e9".
fn parse_expiry(text: &str) -> KvsResult<i64> {
    if let Ok(ts) = text.parse::<i64>() {
        return Ok(ts);
    }
    match text.parse::<f64>() {
        Ok(ts) if ts.is_finite() => Ok(ts.trunc() as i64),
        _ => Err(KvsError::Internal(format!(
            "attribute '{}' is not a valid timestamp: {}",
            EXPIRY_ATTRIBUTE, text
        ))),
    }
}
