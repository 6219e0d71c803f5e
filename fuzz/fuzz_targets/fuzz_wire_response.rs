// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for decoding wire responses into records

#![no_main]

use kvs_dynamodb::attribute::decode_record;
use kvs_dynamodb::model::{BatchGetItemOutput, GetItemOutput};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Point read responses
    if let Ok(output) = serde_json::from_slice::<GetItemOutput>(data) {
        if let Some(item) = output.item {
            let _ = decode_record(item);
        }
    }

    // Batch read responses, decoded item by item like the adapter does
    if let Ok(output) = serde_json::from_slice::<BatchGetItemOutput>(data) {
        for item in output.responses.into_values().flatten() {
            if let Ok(record) = decode_record(item) {
                let _ = record.try_decode_as::<serde_json::Value>();
            }
        }
    }
});
