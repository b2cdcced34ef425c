//! Prometheus metrics for the authentication flow
//!
//! Tracks verification outcomes per scheme and the result of user upserts.
//! Exposed in text format at `/metrics` by the web server.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

use crate::auth::AuthScheme;

/// Authentication attempts
/// Labels: scheme (login_widget/web_app), outcome (success/missing_signature/...)
pub static AUTH_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lingvo_auth_attempts_total",
        "Total number of Telegram authentication attempts by scheme and outcome",
        &["scheme", "outcome"]
    )
    .expect("auth attempts metric registers once")
});

/// User record upserts
/// Labels: result (ok/error)
pub static USER_UPSERTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lingvo_user_upserts_total",
        "Total number of user upserts after successful authentication",
        &["result"]
    )
    .expect("user upserts metric registers once")
});

pub fn record_auth_attempt(scheme: AuthScheme, outcome: &str) {
    AUTH_ATTEMPTS_TOTAL.with_label_values(&[scheme.as_str(), outcome]).inc();
}

pub fn record_user_upsert(ok: bool) {
    USER_UPSERTS_TOTAL
        .with_label_values(&[if ok { "ok" } else { "error" }])
        .inc();
}

/// Encodes every registered metric in the Prometheus text exposition format.
pub fn render() -> Result<(String, Vec<u8>), prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok((encoder.format_type().to_string(), buffer))
}
