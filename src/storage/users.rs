use async_trait::async_trait;
use std::sync::Arc;

use crate::core::error::AppResult;
use crate::storage::db::{self, DbPool, UserRecord};

/// Persistence for authenticated users.
///
/// `upsert_user` must be a single conditional write keyed by user id.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert_user(&self, user: UserRecord) -> AppResult<()>;

    async fn get_user(&self, id: i64) -> AppResult<Option<UserRecord>>;

    async fn count_users(&self) -> AppResult<i64>;
}

/// SQLite-backed store. Queries run on the blocking thread pool.
#[derive(Clone)]
pub struct SqliteUserStore {
    pool: Arc<DbPool>,
}

impl SqliteUserStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<DbPool> {
        &self.pool
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn upsert_user(&self, user: UserRecord) -> AppResult<()> {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || -> AppResult<()> {
            let conn = db::get_connection(&pool)?;
            db::upsert_user(&conn, &user)?;
            Ok(())
        })
        .await?
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<UserRecord>> {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || -> AppResult<Option<UserRecord>> {
            let conn = db::get_connection(&pool)?;
            Ok(db::get_user(&conn, id)?)
        })
        .await?
    }

    async fn count_users(&self) -> AppResult<i64> {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || -> AppResult<i64> {
            let conn = db::get_connection(&pool)?;
            Ok(db::count_users(&conn)?)
        })
        .await?
    }
}
