use std::sync::Arc;

use super::error::AuthError;
use super::freshness::{Freshness, FreshnessPolicy};
use super::identity::Identity;
use super::payload::AuthPayload;
use super::scheme::{AuthKeys, AuthScheme};
use crate::core::metrics;
use crate::storage::{UserRecord, UserStore};

/// A payload that passed signature and freshness checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAuth {
    pub scheme: AuthScheme,
    pub identity: Identity,
    pub auth_date: i64,
}

impl VerifiedAuth {
    fn to_record(&self) -> UserRecord {
        UserRecord {
            id: self.identity.id,
            username: self.identity.username.clone(),
            first_name: self.identity.first_name.clone(),
            last_name: self.identity.last_name.clone(),
            photo_url: self.identity.photo_url.clone(),
            auth_date: self.auth_date,
        }
    }
}

/// Runs every check on `payload` without touching storage.
///
/// Order: signature presence, signature match, freshness, identity fields.
pub fn verify_payload(
    keys: &AuthKeys,
    policy: &FreshnessPolicy,
    scheme: AuthScheme,
    mut payload: AuthPayload,
    now: i64,
) -> Result<VerifiedAuth, AuthError> {
    let received_hash = payload.take_hash().ok_or(AuthError::MissingSignature)?;

    if !keys.verify(scheme, &payload, &received_hash) {
        return Err(AuthError::InvalidSignature);
    }

    // Without a readable auth_date the payload cannot be shown to be fresh
    let auth_date = payload.auth_date().ok_or(AuthError::ExpiredAuth { age_secs: i64::MAX })?;
    match policy.check(auth_date, now) {
        Freshness::Fresh => {}
        Freshness::Expired { age_secs } => return Err(AuthError::ExpiredAuth { age_secs }),
        Freshness::FromFuture { ahead_secs } => {
            return Err(AuthError::ExpiredAuth {
                age_secs: ahead_secs.saturating_neg(),
            })
        }
    }

    let identity = Identity::from_payload(scheme, &payload)?;

    Ok(VerifiedAuth {
        scheme,
        identity,
        auth_date,
    })
}

/// Verifies Telegram payloads and records the users they authenticate.
pub struct AuthGate {
    keys: Arc<AuthKeys>,
    policy: FreshnessPolicy,
    store: Arc<dyn UserStore>,
}

impl AuthGate {
    pub fn new(keys: Arc<AuthKeys>, policy: FreshnessPolicy, store: Arc<dyn UserStore>) -> Self {
        Self { keys, policy, store }
    }

    pub fn keys(&self) -> &AuthKeys {
        &self.keys
    }

    /// Checks `payload` against the current wall clock.
    pub fn verify(&self, scheme: AuthScheme, payload: AuthPayload) -> Result<VerifiedAuth, AuthError> {
        self.verify_at(scheme, payload, now_unix())
    }

    pub fn verify_at(&self, scheme: AuthScheme, payload: AuthPayload, now: i64) -> Result<VerifiedAuth, AuthError> {
        verify_payload(&self.keys, &self.policy, scheme, payload, now).map_err(|err| record_rejection(scheme, err))
    }

    /// Stores the verified user (insert or update) and returns its identity.
    pub async fn persist(&self, verified: &VerifiedAuth) -> Result<Identity, AuthError> {
        match self.store.upsert_user(verified.to_record()).await {
            Ok(()) => {
                metrics::record_user_upsert(true);
                metrics::record_auth_attempt(verified.scheme, "success");
                log::info!(
                    "Telegram auth succeeded for user {} ({})",
                    verified.identity.id,
                    verified.scheme
                );
                Ok(verified.identity.clone())
            }
            Err(e) => {
                metrics::record_user_upsert(false);
                let err = AuthError::from(e);
                metrics::record_auth_attempt(verified.scheme, err.kind());
                log::error!("Failed to upsert user {}: {}", verified.identity.id, err);
                Err(err)
            }
        }
    }

    /// Full flow: verify, then upsert. Nothing is written unless every check passed.
    pub async fn authenticate(&self, scheme: AuthScheme, payload: AuthPayload) -> Result<Identity, AuthError> {
        self.authenticate_at(scheme, payload, now_unix()).await
    }

    pub async fn authenticate_at(
        &self,
        scheme: AuthScheme,
        payload: AuthPayload,
        now: i64,
    ) -> Result<Identity, AuthError> {
        let verified = self.verify_at(scheme, payload, now)?;
        self.persist(&verified).await
    }
}

/// Logs and counts a rejected attempt, then hands the error back.
///
/// Every client-side auth failure goes through here, including payloads that
/// could not be read before verification started.
pub fn record_rejection(scheme: AuthScheme, err: AuthError) -> AuthError {
    log::warn!("Telegram auth rejected ({}): {}", scheme, err);
    metrics::record_auth_attempt(scheme, err.kind());
    err
}

pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
