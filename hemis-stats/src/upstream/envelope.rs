//! Total accessors over raw HEMIS response envelopes
//!
//! HEMIS endpoints are not uniform: pagination may sit at the top level or under `data`,
//! item lists may be `data.items` or `data` itself, ids may be numbers or strings.
//! Every shape check lives here; callers get plain values and never a panic.

use serde_json::{Map, Value};

/// Pagination block of a listing response
///
/// Checks top-level `pagination` first, then `data.pagination`. An empty object counts
/// as missing.
pub fn pagination(payload: &Value) -> Option<&Map<String, Value>> {
    let top = payload
        .get("pagination")
        .and_then(Value::as_object)
        .filter(|p| !p.is_empty());

    top.or_else(|| {
        payload
            .get("data")
            .and_then(|d| d.get("pagination"))
            .and_then(Value::as_object)
            .filter(|p| !p.is_empty())
    })
}

/// Total matching count reported by a listing response
///
/// A missing pagination block means 0. An unusable `totalCount` also yields 0.
pub fn total_count(payload: &Value) -> u64 {
    let Some(block) = pagination(payload) else {
        return 0;
    };

    let raw = block
        .get("totalCount")
        .filter(|v| !v.is_null())
        .or_else(|| block.get("total_count"));

    match raw {
        None | Some(Value::Null) => 0,
        Some(value) => coerce_count(value).unwrap_or_else(|| {
            tracing::warn!(value = %value, "Unexpected totalCount value from HEMIS");
            0
        }),
    }
}

/// Coerce a JSON count to an unsigned integer; negatives clamp to 0
pub fn coerce_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u)
            } else if let Some(i) = n.as_i64() {
                Some(i.max(0) as u64)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f.max(0.0) as u64)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<i64>().ok().map(|i| i.max(0) as u64))
        }
        _ => None,
    }
}

/// Item list of a listing response: `data.items`, else `data` when it is an array
pub fn items(payload: &Value) -> &[Value] {
    match payload.get("data") {
        Some(Value::Object(data)) => data
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        Some(Value::Array(list)) => list.as_slice(),
        _ => &[],
    }
}

/// Coerce an upstream id (number or numeric string) to an integer
pub fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Read `key` from an object item and coerce it to an id
pub fn id_field(item: &Value, key: &str) -> Option<i64> {
    item.get(key).and_then(coerce_id)
}

/// Human-readable rendering of an arbitrary upstream value
///
/// Objects render as their first non-empty `name`, `title` or `code`.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => ["name", "title", "code"]
            .iter()
            .filter_map(|k| map.get(*k))
            .map(display_string)
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| value.to_string()),
        Value::Array(_) => value.to_string(),
    }
}

/// Non-empty string field of an object item
pub fn text_field(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .map(display_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
