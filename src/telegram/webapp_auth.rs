use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use url::form_urlencoded;

use crate::auth::{record_rejection, AuthError, AuthPayload, AuthScheme};
use crate::telegram::webapp::{InitDataRejection, WebAppState};

/// Header carrying the raw `Telegram.WebApp.initData` query string
pub const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";

/// Upper bound for a request body inspected by the middleware
const MAX_INIT_DATA_BODY_BYTES: usize = 64 * 1024;

/// Parses Telegram init data (query string format) into a payload.
///
/// Decoding follows `application/x-www-form-urlencoded` rules, the same as
/// `URLSearchParams`: `+` is a space and percent escapes are UTF-8. Pairs
/// with an empty key are skipped.
///
/// # Example
/// ```rust
/// use lingvo::telegram::webapp_auth::parse_init_data;
///
/// let payload = parse_init_data("query_id=AAH&auth_date=1700000000&last_name=Van+Dyke&hash=abc");
/// assert_eq!(payload.auth_date(), Some(1700000000));
/// assert_eq!(payload.get_str("last_name"), Some("Van Dyke"));
/// ```
pub fn parse_init_data(init_data: &str) -> AuthPayload {
    form_urlencoded::parse(init_data.as_bytes())
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Extracts the init-data payload from a request.
///
/// The `X-Telegram-Init-Data` header wins; otherwise the body is read as a
/// JSON object of already-decoded fields. An empty body is an empty payload.
pub fn extract_init_data(headers: &HeaderMap, body: &[u8]) -> Result<AuthPayload, AuthError> {
    if let Some(raw) = headers.get(INIT_DATA_HEADER) {
        let raw = raw
            .to_str()
            .map_err(|_| AuthError::MalformedPayload("init data header is not valid text".to_string()))?;
        return Ok(parse_init_data(raw));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AuthPayload::new());
    }

    serde_json::from_slice(body).map_err(|e| AuthError::MalformedPayload(format!("invalid init data body: {}", e)))
}

/// Middleware guarding Mini App routes.
///
/// On success the [`crate::auth::VerifiedAuth`] is stored in the request
/// extensions and the request continues with its body intact.
pub async fn require_webapp_auth(State(state): State<Arc<WebAppState>>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, MAX_INIT_DATA_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = AuthError::MalformedPayload(format!("unreadable request body: {}", e));
            return InitDataRejection(record_rejection(AuthScheme::WebApp, err)).into_response();
        }
    };

    let verified = extract_init_data(&parts.headers, &bytes)
        .map_err(|err| record_rejection(AuthScheme::WebApp, err))
        .and_then(|payload| state.gate.verify(AuthScheme::WebApp, payload));

    match verified {
        Ok(verified) => {
            let mut request = Request::from_parts(parts, Body::from(bytes));
            request.extensions_mut().insert(verified);
            next.run(request).await
        }
        Err(err) => InitDataRejection(err).into_response(),
    }
}
