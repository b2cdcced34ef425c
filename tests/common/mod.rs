//! Common test utilities
//!
//! This module is shared across all integration tests

use axum::Router;
use secrecy::SecretString;
use std::sync::Arc;
use tempfile::TempDir;

use lingvo::auth::{now_unix, AuthGate, AuthKeys, AuthPayload, AuthScheme, FreshnessPolicy};
use lingvo::storage::{create_pool, DbPool, SqliteUserStore};
use lingvo::telegram::create_webapp_router;

pub const BOT_TOKEN: &str = "BOT:TOKEN";

/// Router backed by a throwaway SQLite database.
///
/// Keep the `TempDir` alive for the duration of the test.
pub struct TestEnvironment {
    pub router: Router,
    pub pool: Arc<DbPool>,
    pub keys: AuthKeys,
    _dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::with_policy(FreshnessPolicy::default())
    }

    pub fn with_policy(policy: FreshnessPolicy) -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("lingvo.sqlite");
        let pool = Arc::new(create_pool(path.to_str().expect("utf-8 path")).expect("failed to create pool"));

        let token = SecretString::from(BOT_TOKEN.to_string());
        let gate = AuthGate::new(
            Arc::new(AuthKeys::derive(&token)),
            policy,
            Arc::new(SqliteUserStore::new(Arc::clone(&pool))),
        );

        Self {
            router: create_webapp_router(Arc::new(gate)),
            pool,
            keys: AuthKeys::derive(&token),
            _dir: dir,
        }
    }

    /// Adds a valid `hash` for `scheme` to `payload`.
    pub fn sign(&self, scheme: AuthScheme, payload: AuthPayload) -> AuthPayload {
        let hash = self.keys.sign(scheme, &payload);
        payload.with("hash", hash)
    }

    pub fn user_count(&self) -> i64 {
        let conn = self.pool.get().expect("connection");
        lingvo::storage::db::count_users(&conn).expect("count users")
    }

    pub fn user(&self, id: i64) -> Option<lingvo::storage::UserRecord> {
        let conn = self.pool.get().expect("connection");
        lingvo::storage::db::get_user(&conn, id).expect("get user")
    }
}

/// Login Widget payload for user 123 signed `age_secs` ago.
pub fn ann_payload(age_secs: i64) -> AuthPayload {
    AuthPayload::new()
        .with("id", 123)
        .with("first_name", "Ann")
        .with("auth_date", now_unix() - age_secs)
}

/// Mini App payload for user 279058397 signed `age_secs` ago.
pub fn webapp_payload(age_secs: i64) -> AuthPayload {
    AuthPayload::new()
        .with("query_id", "AAHdF6IQAAAAAN0XohDhrOrc")
        .with(
            "user",
            r#"{"id":279058397,"first_name":"Vladislav","last_name":"Kibenko","username":"vdkfrost","language_code":"ru"}"#,
        )
        .with("auth_date", (now_unix() - age_secs).to_string())
}
