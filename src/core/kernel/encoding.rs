use crate::core::errors::ClientError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

/// RFC 3986 unreserved characters stay literal: 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', '~'.
static RAW_URL_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Flatten a parameter tree into ordered `(key, value)` pairs using bracket notation.
///
/// `{"a": {"b": 1}, "c": [true, null, "x"]}` becomes
/// `a[b]=1`, `c[0]=1`, `c[2]=x`. Nulls are dropped and booleans render as `1`/`0`.
/// Pair order follows the input, so canonicalize first for a stable result.
pub fn flatten_params(params: &Value) -> Result<Vec<(String, String)>, ClientError> {
    let mut pairs = Vec::new();
    match params {
        Value::Null => {}
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(key.clone(), value, &mut pairs);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                flatten_into(index.to_string(), value, &mut pairs);
            }
        }
        scalar => {
            return Err(ClientError::InvalidParameters(format!(
                "Cannot encode scalar {} as key-value parameters",
                scalar
            )));
        }
    }
    Ok(pairs)
}

fn flatten_into(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => pairs.push((prefix, if *flag { "1" } else { "0" }.to_string())),
        Value::Number(number) => pairs.push((prefix, number.to_string())),
        Value::String(text) => pairs.push((prefix, text.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(format!("{}[{}]", prefix, index), item, pairs);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_into(format!("{}[{}]", prefix, key), item, pairs);
            }
        }
    }
}

/// `application/x-www-form-urlencoded` text, spaces as `+`.
pub fn form_encode(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// RFC 3986 percent-encoding, spaces as `%20`.
pub fn raw_url_encode(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, &RAW_URL_ENCODE_SET),
                utf8_percent_encode(value, &RAW_URL_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the query string for `params`, or an empty string when there is nothing to send.
pub fn build_query_string(params: &Value) -> Result<String, ClientError> {
    Ok(form_encode(&flatten_params(params)?))
}
