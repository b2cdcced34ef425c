use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AuthError;
use super::payload::{value_as_i64, AuthPayload};
use super::scheme::AuthScheme;

/// Public projection of an authenticated Telegram user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
}

impl Identity {
    /// Reads the user fields out of a verified payload.
    ///
    /// The Login Widget sends them flat. Mini App `initData` nests them in a
    /// `user` field holding JSON (usually as a string); flat fields are used
    /// when `user` is absent.
    pub fn from_payload(scheme: AuthScheme, payload: &AuthPayload) -> Result<Self, AuthError> {
        match (scheme, payload.get("user")) {
            (AuthScheme::WebApp, Some(user)) => Self::from_user_field(user),
            _ => Self::from_flat(payload),
        }
    }

    fn from_flat(payload: &AuthPayload) -> Result<Self, AuthError> {
        let id = payload
            .get_i64("id")
            .ok_or_else(|| AuthError::MalformedPayload("missing or non-numeric id".to_string()))?;

        Ok(Self {
            id,
            username: payload.get_str("username").map(str::to_string),
            first_name: payload.get_str("first_name").map(str::to_string),
            last_name: payload.get_str("last_name").map(str::to_string),
            photo_url: payload.get_str("photo_url").map(str::to_string),
        })
    }

    fn from_user_field(user: &Value) -> Result<Self, AuthError> {
        let parsed;
        let object = match user {
            Value::Object(object) => object,
            Value::String(raw) => {
                parsed = serde_json::from_str::<Map<String, Value>>(raw)
                    .map_err(|e| AuthError::MalformedPayload(format!("failed to parse user JSON: {}", e)))?;
                &parsed
            }
            _ => {
                return Err(AuthError::MalformedPayload(
                    "user field is not a JSON object".to_string(),
                ))
            }
        };

        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        let id = object
            .get("id")
            .and_then(value_as_i64)
            .ok_or_else(|| AuthError::MalformedPayload("missing user id in user JSON".to_string()))?;

        Ok(Self {
            id,
            username: text("username"),
            first_name: text("first_name"),
            last_name: text("last_name"),
            photo_url: text("photo_url"),
        })
    }
}
