use crate::core::errors::ClientError;
use serde_json::{Map, Value};

/// Return a copy of `value` with the keys of every object sorted by byte order.
///
/// Objects nested inside arrays are sorted as well, but array elements keep
/// their positions. Scalars pass through untouched. Applying this to an
/// already canonical value returns an identical value.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            // `String: Ord` compares bytes, which keeps the order locale independent
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, inner) in entries {
                sorted.insert(key.clone(), canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON text used for request bodies and signable messages.
///
/// serde_json leaves `/` and non-ASCII characters unescaped, so the output is
/// byte-for-byte stable across platforms.
pub fn canonical_json(value: &Value) -> Result<String, ClientError> {
    Ok(serde_json::to_string(&canonicalize(value))?)
}

/// True when `value` carries no parameters worth sending.
pub fn is_empty_params(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
