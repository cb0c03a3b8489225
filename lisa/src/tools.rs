//! JSON envelopes for tool-call results.
//!
//! Successful results are flattened objects with `"success": true`; failures
//! are `{"success": false, "error": "<message>"}`. Status lookups use
//! `found` instead of `success`.

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::LisaError;

/// Serialize `value` and mark it successful. Non-object values are wrapped
/// under `result`.
pub fn success<T: Serialize>(value: &T) -> Result<Value> {
    let mut object = match serde_json::to_value(value)? {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
    };
    object.insert("success".to_string(), Value::Bool(true));
    Ok(Value::Object(object))
}

pub fn failure(err: &LisaError) -> Value {
    json!({ "success": false, "error": err.to_string() })
}

pub fn not_found(err: &LisaError) -> Value {
    json!({ "found": false, "error": err.to_string() })
}
