use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::form_urlencoded;

use super::canonical::canonical_value;

/// Name of the signature field
pub const HASH_FIELD: &str = "hash";

/// Name of the signing timestamp field (Unix seconds)
pub const AUTH_DATE_FIELD: &str = "auth_date";

/// Flat set of fields sent by a Telegram client, signature included.
///
/// Fields are kept in a `BTreeMap`, so iteration is always in byte order of
/// the field names regardless of the order they arrived in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthPayload {
    fields: BTreeMap<String, Value>,
}

impl AuthPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Reads an integer field given either as a JSON number or a decimal string.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(value_as_i64)
    }

    /// Removes the signature field and returns it as text.
    ///
    /// Only a non-empty string counts as a signature; `null`, numbers or an
    /// empty string are treated as absent.
    pub fn take_hash(&mut self) -> Option<String> {
        match self.fields.remove(HASH_FIELD)? {
            Value::String(hash) if !hash.trim().is_empty() => Some(hash),
            _ => None,
        }
    }

    pub fn auth_date(&self) -> Option<i64> {
        self.get_i64(AUTH_DATE_FIELD)
    }

    /// Fields in canonical (byte) order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders the payload as a form-encoded query string, the format of
    /// `Telegram.WebApp.initData`.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.fields {
            serializer.append_pair(key, &canonical_value(value));
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AuthPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
