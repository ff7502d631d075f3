//! Firestore typed values
//!
//! The REST API wraps every value in a single-key object naming its type
//! (`{"integerValue": "42"}`). These helpers convert between that form and
//! plain JSON.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde_json::json;

/// Convert a typed Firestore value to plain JSON
///
/// Timestamps, bytes and references become strings; geo points become
/// `{latitude, longitude}` objects.
pub fn decode_value(value: &JsonValue) -> Result<JsonValue> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::decode(format!("expected typed value object, got {value}")))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| Error::decode("empty typed value"))?;

    match kind.as_str() {
        "nullValue" => Ok(JsonValue::Null),
        "booleanValue" => Ok(inner.clone()),
        "integerValue" => match inner {
            JsonValue::String(s) => s
                .parse::<i64>()
                .map(JsonValue::from)
                .map_err(|e| Error::decode(format!("bad integerValue '{s}': {e}"))),
            JsonValue::Number(_) => Ok(inner.clone()),
            other => Err(Error::decode(format!("bad integerValue {other}"))),
        },
        // NaN and the infinities arrive as strings and stay that way
        "doubleValue" => Ok(inner.clone()),
        "timestampValue" | "stringValue" | "bytesValue" | "referenceValue" => Ok(inner.clone()),
        "geoPointValue" => Ok(json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(JsonValue::from(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(JsonValue::from(0.0)),
        })),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(JsonValue::as_array)
                .map(|vs| vs.iter().map(decode_value).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Ok(JsonValue::Array(values))
        }
        "mapValue" => {
            let fields = match inner.get("fields").and_then(JsonValue::as_object) {
                Some(fields) => decode_fields(fields)?,
                None => JsonObject::new(),
            };
            Ok(JsonValue::Object(fields))
        }
        other => Err(Error::decode(format!("unknown value type '{other}'"))),
    }
}

/// Convert a document's `fields` map to a plain JSON object
pub fn decode_fields(fields: &JsonObject) -> Result<JsonObject> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), decode_value(value)?)))
        .collect()
}

/// Convert plain JSON to a typed Firestore value
pub fn encode_value(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Null => json!({ "nullValue": null }),
        JsonValue::Bool(b) => json!({ "booleanValue": b }),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n })
            }
        }
        JsonValue::String(s) => json!({ "stringValue": s }),
        JsonValue::Array(items) => {
            let values: Vec<JsonValue> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        JsonValue::Object(map) => {
            let fields: JsonObject = map
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}
