use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{record_rejection, AuthError, AuthGate, AuthPayload, AuthScheme, Identity, VerifiedAuth};
use crate::core::metrics;
use crate::telegram::webapp_auth::{parse_init_data, require_webapp_auth};

// ============================================================================
// STATE
// ============================================================================

/// Shared state for all endpoints
#[derive(Clone)]
pub struct WebAppState {
    pub gate: Arc<AuthGate>,
}

/// Successful login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Identity,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::MissingSignature | AuthError::InvalidSignature | AuthError::ExpiredAuth { .. } => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        AuthError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing message. Internal details stay in the log.
fn public_message(err: &AuthError) -> &'static str {
    match err {
        AuthError::MissingSignature => "Hash is missing",
        AuthError::InvalidSignature => "Invalid hash",
        AuthError::ExpiredAuth { .. } => "Auth date expired",
        AuthError::MalformedPayload(_) => "Malformed init data",
        AuthError::Persistence(_) => "Authentication failed",
    }
}

/// Rejection for the Login Widget endpoint: `{ success: false, message }`
#[derive(Debug)]
pub struct LoginRejection(pub AuthError);

impl IntoResponse for LoginRejection {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "message": public_message(&self.0),
        }));

        (status_for(&self.0), body).into_response()
    }
}

/// Rejection for Mini App routes: `{ message }`
#[derive(Debug)]
pub struct InitDataRejection(pub AuthError);

impl IntoResponse for InitDataRejection {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "message": public_message(&self.0),
        }));

        (status_for(&self.0), body).into_response()
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Creates the router for the mini-app backend
pub fn create_webapp_router(gate: Arc<AuthGate>) -> Router {
    let state = Arc::new(WebAppState { gate });

    // CORS for the Mini App front-end
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let webapp_routes = Router::new()
        .route("/api/webapp/session", post(handle_webapp_session))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), require_webapp_auth));

    Router::new()
        .route("/api/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/auth/telegram", post(handle_login_widget))
        .merge(webapp_routes)
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server for the mini-app backend
pub async fn run_webapp_server(port: u16, gate: Arc<AuthGate>) -> anyhow::Result<()> {
    let app = create_webapp_router(gate);

    let addr = format!("0.0.0.0:{}", port);
    log::info!("Starting Lingvo auth server on http://{}", addr);
    log::info!("  POST /api/auth/telegram   - Login Widget");
    log::info!("  POST /api/webapp/session  - Mini App initData");
    log::info!("  GET  /metrics             - Prometheus metrics");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received, stopping web server");
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "lingvo-auth",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /metrics - Prometheus text format
async fn metrics_handler() -> Response {
    match metrics::render() {
        Ok((content_type, buffer)) => ([(header::CONTENT_TYPE, content_type)], buffer).into_response(),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to encode metrics: {}", e)).into_response()
        }
    }
}

/// Reads a Login Widget payload from a form-encoded or JSON body.
fn parse_login_body(headers: &HeaderMap, body: &[u8]) -> Result<AuthPayload, AuthError> {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let text = std::str::from_utf8(body)
            .map_err(|_| AuthError::MalformedPayload("form body is not valid UTF-8".to_string()))?;
        return Ok(parse_init_data(text));
    }

    serde_json::from_slice(body).map_err(|e| AuthError::MalformedPayload(format!("invalid JSON body: {}", e)))
}

/// POST /api/auth/telegram - Login Widget authentication
async fn handle_login_widget(
    State(state): State<Arc<WebAppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<LoginResponse>, LoginRejection> {
    let payload = parse_login_body(&headers, &body)
        .map_err(|err| LoginRejection(record_rejection(AuthScheme::LoginWidget, err)))?;

    let user = state
        .gate
        .authenticate(AuthScheme::LoginWidget, payload)
        .await
        .map_err(LoginRejection)?;

    Ok(Json(LoginResponse { success: true, user }))
}

/// POST /api/webapp/session - runs behind `require_webapp_auth`
async fn handle_webapp_session(
    State(state): State<Arc<WebAppState>>,
    Extension(verified): Extension<VerifiedAuth>,
) -> Result<Json<LoginResponse>, InitDataRejection> {
    let user = state.gate.persist(&verified).await.map_err(InitDataRejection)?;

    Ok(Json(LoginResponse { success: true, user }))
}
