//! Firestore typed-value encoding.
//!
//! Firestore REST documents wrap every value in a one-key object naming
//! its type (`{"integerValue": "3"}`, `{"mapValue": {"fields": {..}}}`).
//! These helpers convert between that form and plain `serde_json` values
//! so records can be (de)serialized with their ordinary serde derives.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::error::StorageError;

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    json!({ "timestampValue": at.to_rfc3339() })
}

pub fn decode_value(value: &Value) -> Result<Value, StorageError> {
    let obj = value
        .as_object()
        .ok_or_else(|| StorageError::Malformed(format!("expected typed value, got {value}")))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| StorageError::Malformed("empty typed value".into()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or_default())),
        "integerValue" => {
            // Sent as a string, but tolerate a bare number.
            let n = match inner {
                Value::String(s) => s
                    .parse::<i64>()
                    .map_err(|e| StorageError::Malformed(format!("integerValue '{s}': {e}")))?,
                other => other
                    .as_i64()
                    .ok_or_else(|| StorageError::Malformed(format!("integerValue {other}")))?,
            };
            Ok(Value::from(n))
        }
        "doubleValue" => Ok(inner.as_f64().map(Value::from).unwrap_or(Value::Null)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            Ok(Value::String(inner.as_str().unwrap_or_default().to_string()))
        }
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields").and_then(Value::as_object) {
            Some(fields) => decode_fields(fields),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(StorageError::Malformed(format!("unsupported value type {other}"))),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Value, StorageError> {
    let mut out = Map::new();
    for (k, v) in fields {
        out.insert(k.clone(), decode_value(v)?);
    }
    Ok(Value::Object(out))
}

/// Decode the `fields` of a document resource (missing = empty).
pub fn decode_document(doc: &Value) -> Result<Value, StorageError> {
    match doc.get("fields").and_then(Value::as_object) {
        Some(fields) => decode_fields(fields),
        None => Ok(Value::Object(Map::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_record_survives_encoding() {
        let plain = json!({
            "completedSessions": 3,
            "settings": { "focus": 1500, "autoStart": false },
            "lastSaveDate": "2026-10-19",
            "ratio": 0.5,
            "tags": ["a", "b"],
            "note": null
        });
        let encoded = encode_value(&plain);
        assert_eq!(
            encoded["mapValue"]["fields"]["completedSessions"],
            json!({ "integerValue": "3" })
        );
        assert_eq!(decode_value(&encoded).unwrap(), plain);
    }

    #[test]
    fn timestamps_decode_to_strings() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/users/u/timer/data",
            "fields": { "updatedAt": { "timestampValue": "2026-10-19T09:00:00Z" } }
        });
        assert_eq!(
            decode_document(&doc).unwrap(),
            json!({ "updatedAt": "2026-10-19T09:00:00Z" })
        );
    }

    #[test]
    fn bad_integer_is_malformed() {
        let err = decode_value(&json!({ "integerValue": "three" })).unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));
    }

    #[test]
    fn document_without_fields_is_empty_object() {
        assert_eq!(decode_document(&json!({ "name": "x" })).unwrap(), json!({}));
    }
}
