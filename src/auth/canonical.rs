//! Data-check string construction.
//!
//! Telegram signs `key=value` lines sorted by key and joined with `\n`,
//! excluding the `hash` field itself.

use serde_json::Value;

use super::payload::{AuthPayload, HASH_FIELD};

/// Textual form of a field value as it takes part in the signature.
///
/// Scalars use their plain form (strings verbatim, numbers in JSON notation,
/// `true`/`false`, `null`). Arrays and objects are rendered as compact JSON
/// with sorted keys.
///
/// JSON integers are exact only within the `i64`/`u64` range. Larger ones are
/// parsed as `f64` and no longer render as the client wrote them, so such
/// values must be sent as strings (form and `initData` bodies always are).
pub fn canonical_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => "null".to_string(),
        structured => structured.to_string(),
    }
}

/// Builds the data-check string for `payload`.
///
/// The output depends only on the set of fields and their values, never on
/// insertion order. There is no trailing newline.
pub fn data_check_string(payload: &AuthPayload) -> String {
    payload
        .fields()
        .filter(|(key, _)| *key != HASH_FIELD)
        .map(|(key, value)| format!("{}={}", key, canonical_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}
