use thiserror::Error;

use crate::core::error::AppError;

/// Why an authentication attempt was denied.
///
/// The first four variants are caused by the client and are never retried.
/// `Persistence` is a server-side fault raised only after verification passed.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("hash is missing")]
    MissingSignature,

    #[error("invalid hash - data may be tampered")]
    InvalidSignature,

    /// Negative ages mean the payload is dated in the future.
    #[error("auth date expired ({age_secs} seconds old)")]
    ExpiredAuth { age_secs: i64 },

    #[error("malformed auth payload: {0}")]
    MalformedPayload(String),

    #[error("failed to persist user: {0}")]
    Persistence(#[from] AppError),
}

impl AuthError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingSignature => "missing_signature",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ExpiredAuth { .. } => "expired_auth",
            AuthError::MalformedPayload(_) => "malformed_payload",
            AuthError::Persistence(_) => "persistence_failure",
        }
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthError::Persistence(_))
    }
}
