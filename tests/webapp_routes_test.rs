//! Integration tests for the HTTP routes (Login Widget, Mini App middleware)
//!
//! Run with: cargo test --test webapp_routes_test

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{ann_payload, webapp_payload, TestEnvironment};
use lingvo::auth::{AuthPayload, AuthScheme, FreshnessPolicy};
use lingvo::core::metrics::AUTH_ATTEMPTS_TOTAL;

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(path: &str, payload: &AuthPayload) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

fn post_init_data_header(path: &str, payload: &AuthPayload) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("X-Telegram-Init-Data", payload.to_query_string())
        .body(Body::empty())
        .unwrap()
}

fn post_form(path: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn malformed_attempts(scheme: &str) -> u64 {
    AUTH_ATTEMPTS_TOTAL.with_label_values(&[scheme, "malformed_payload"]).get()
}

fn flip_last_hex(payload: AuthPayload) -> AuthPayload {
    let hash = payload.get_str("hash").unwrap().to_string();
    let last = if hash.ends_with('0') { '1' } else { '0' };
    let flipped = format!("{}{}", &hash[..hash.len() - 1], last);
    payload.with("hash", flipped)
}

// ============================================================================
// Login Widget
// ============================================================================

mod login_widget {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn valid_payload_returns_identity_and_stores_user() {
        let env = TestEnvironment::new();
        let payload = env.sign(AuthScheme::LoginWidget, ann_payload(0));

        let (status, body) = send(&env.router, post_json("/api/auth/telegram", &payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "user": {
                    "id": 123,
                    "username": null,
                    "first_name": "Ann",
                    "last_name": null,
                    "photo_url": null
                }
            })
        );
        assert_eq!(env.user_count(), 1);
        assert_eq!(env.user(123).unwrap().first_name.as_deref(), Some("Ann"));
    }

    #[tokio::test]
    async fn form_encoded_body_is_accepted() {
        let env = TestEnvironment::new();
        let payload = env.sign(AuthScheme::LoginWidget, ann_payload(0).with("username", "ann_k"));

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/telegram")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(payload.to_query_string()))
            .unwrap();
        let (status, body) = send(&env.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "ann_k");
    }

    #[tokio::test]
    async fn plus_encoded_spaces_in_form_body_are_accepted() {
        let env = TestEnvironment::new();
        let payload = env.sign(AuthScheme::LoginWidget, ann_payload(0).with("last_name", "Van Dyke"));
        let body = format!(
            "id=123&first_name=Ann&last_name=Van+Dyke&auth_date={}&hash={}",
            payload.auth_date().unwrap(),
            payload.get_str("hash").unwrap()
        );

        let (status, body) = send(&env.router, post_form("/api/auth/telegram", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["last_name"], "Van Dyke");
        assert_eq!(env.user(123).unwrap().last_name.as_deref(), Some("Van Dyke"));
    }

    #[tokio::test]
    async fn null_or_empty_hash_is_reported_missing() {
        let env = TestEnvironment::new();

        for hash in [Value::Null, json!("")] {
            let payload = env.sign(AuthScheme::LoginWidget, ann_payload(0)).with("hash", hash);
            let (status, body) = send(&env.router, post_json("/api/auth/telegram", &payload)).await;

            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["message"], "Hash is missing");
        }
        assert_eq!(env.user_count(), 0);
    }

    #[tokio::test]
    async fn unreadable_json_is_counted_as_malformed() {
        let env = TestEnvironment::new();
        let before = malformed_attempts("login_widget");

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/telegram")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&env.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(malformed_attempts("login_widget") > before);
    }

    #[tokio::test]
    async fn flipped_hash_is_unauthorized_without_side_effects() {
        let env = TestEnvironment::new();
        let payload = flip_last_hex(env.sign(AuthScheme::LoginWidget, ann_payload(0)));

        let (status, body) = send(&env.router, post_json("/api/auth/telegram", &payload)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"success": false, "message": "Invalid hash"}));
        assert_eq!(env.user_count(), 0);
    }

    #[tokio::test]
    async fn missing_hash_is_unauthorized_without_side_effects() {
        let env = TestEnvironment::new();

        let (status, body) = send(&env.router, post_json("/api/auth/telegram", &ann_payload(0))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Hash is missing");
        assert_eq!(env.user_count(), 0);
    }

    #[tokio::test]
    async fn stale_payload_is_unauthorized() {
        let env = TestEnvironment::new();
        let payload = env.sign(AuthScheme::LoginWidget, ann_payload(86_401 + 5));

        let (status, body) = send(&env.router, post_json("/api/auth/telegram", &payload)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Auth date expired");
        assert_eq!(env.user_count(), 0);
    }

    #[tokio::test]
    async fn web_app_signature_is_rejected_by_login_widget() {
        let env = TestEnvironment::new();
        let payload = env.sign(AuthScheme::WebApp, ann_payload(0));

        let (status, _) = send(&env.router, post_json("/api/auth/telegram", &payload)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn repeated_logins_keep_one_row_with_latest_profile() {
        let env = TestEnvironment::new();
        let first = env.sign(AuthScheme::LoginWidget, ann_payload(60).with("username", "ann"));
        let second = env.sign(AuthScheme::LoginWidget, ann_payload(0).with("username", "ann_renamed"));

        let (status, _) = send(&env.router, post_json("/api/auth/telegram", &first)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&env.router, post_json("/api/auth/telegram", &second)).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(env.user_count(), 1);
        assert_eq!(env.user(123).unwrap().username.as_deref(), Some("ann_renamed"));
    }

    #[tokio::test]
    async fn signed_payload_without_id_is_bad_request() {
        let env = TestEnvironment::new();
        let payload = env.sign(
            AuthScheme::LoginWidget,
            AuthPayload::new()
                .with("first_name", "NoId")
                .with("auth_date", lingvo::auth::now_unix()),
        );

        let (status, _) = send(&env.router, post_json("/api/auth/telegram", &payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(env.user_count(), 0);
    }
}

// ============================================================================
// Mini App initData
// ============================================================================

mod webapp {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn init_data_header_passes_middleware() {
        let env = TestEnvironment::new();
        let payload = env.sign(AuthScheme::WebApp, webapp_payload(0));

        let (status, body) = send(&env.router, post_init_data_header("/api/webapp/session", &payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["id"], 279_058_397);
        assert_eq!(body["user"]["username"], "vdkfrost");
        assert_eq!(env.user_count(), 1);
    }

    #[tokio::test]
    async fn plus_encoded_header_passes_middleware() {
        let env = TestEnvironment::new();
        let payload = env.sign(
            AuthScheme::WebApp,
            webapp_payload(0).with("user", r#"{"id":42,"first_name":"Mary Ann"}"#),
        );
        let header = payload.to_query_string();
        assert!(header.contains("Mary+Ann"));

        let request = Request::builder()
            .method("POST")
            .uri("/api/webapp/session")
            .header("X-Telegram-Init-Data", header)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&env.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["first_name"], "Mary Ann");
    }

    #[tokio::test]
    async fn json_body_passes_middleware() {
        let env = TestEnvironment::new();
        let payload = env.sign(AuthScheme::WebApp, webapp_payload(0));

        let (status, body) = send(&env.router, post_json("/api/webapp/session", &payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["first_name"], "Vladislav");
    }

    #[tokio::test]
    async fn missing_hash_message() {
        let env = TestEnvironment::new();

        let (status, body) = send(&env.router, post_json("/api/webapp/session", &webapp_payload(0))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "Hash is missing"}));
        assert_eq!(env.user_count(), 0);
    }

    #[tokio::test]
    async fn empty_body_is_missing_hash() {
        let env = TestEnvironment::new();
        let request = Request::builder()
            .method("POST")
            .uri("/api/webapp/session")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&env.router, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "Hash is missing"}));
    }

    #[tokio::test]
    async fn invalid_hash_message() {
        let env = TestEnvironment::new();
        let payload = flip_last_hex(env.sign(AuthScheme::WebApp, webapp_payload(0)));

        let (status, body) = send(&env.router, post_init_data_header("/api/webapp/session", &payload)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "Invalid hash"}));
        assert_eq!(env.user_count(), 0);
    }

    #[tokio::test]
    async fn login_widget_signature_is_rejected() {
        let env = TestEnvironment::new();
        let payload = env.sign(AuthScheme::LoginWidget, webapp_payload(0));

        let (status, body) = send(&env.router, post_init_data_header("/api/webapp/session", &payload)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid hash");
    }

    #[tokio::test]
    async fn expired_auth_date_message() {
        let env = TestEnvironment::new();
        let payload = env.sign(AuthScheme::WebApp, webapp_payload(2 * 86_400));

        let (status, body) = send(&env.router, post_init_data_header("/api/webapp/session", &payload)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "Auth date expired"}));
    }

    #[tokio::test]
    async fn future_auth_date_respects_configured_skew() {
        let env = TestEnvironment::with_policy(FreshnessPolicy {
            max_clock_skew_secs: Some(60),
            ..FreshnessPolicy::default()
        });
        let payload = env.sign(AuthScheme::WebApp, webapp_payload(-3_600));

        let (status, body) = send(&env.router, post_init_data_header("/api/webapp/session", &payload)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Auth date expired");
    }

    #[tokio::test]
    async fn non_object_body_is_bad_request() {
        let env = TestEnvironment::new();
        let request = Request::builder()
            .method("POST")
            .uri("/api/webapp/session")
            .header("content-type", "application/json")
            .body(Body::from("[1,2,3]"))
            .unwrap();

        let (status, body) = send(&env.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Malformed init data"}));
    }

    #[tokio::test]
    async fn malformed_body_is_counted() {
        let env = TestEnvironment::new();
        let before = malformed_attempts("web_app");

        let request = Request::builder()
            .method("POST")
            .uri("/api/webapp/session")
            .header("content-type", "application/json")
            .body(Body::from("\"just a string\""))
            .unwrap();
        let (status, _) = send(&env.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(malformed_attempts("web_app") > before);
    }

    #[tokio::test]
    async fn null_hash_in_body_is_reported_missing() {
        let env = TestEnvironment::new();
        let payload = env.sign(AuthScheme::WebApp, webapp_payload(0)).with("hash", Value::Null);

        let (status, body) = send(&env.router, post_json("/api/webapp/session", &payload)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "Hash is missing"}));
    }
}

// ============================================================================
// Service endpoints
// ============================================================================

#[tokio::test]
async fn health_check_reports_ok() {
    let env = TestEnvironment::new();
    let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();

    let (status, body) = send(&env.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn metrics_expose_auth_counters() {
    let env = TestEnvironment::new();
    let payload = env.sign(AuthScheme::LoginWidget, ann_payload(0));
    send(&env.router, post_json("/api/auth/telegram", &payload)).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = env.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("lingvo_auth_attempts_total"));
}
