use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::core::error::AppResult;
use crate::storage::migrations;

/// A Telegram user as stored in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Telegram user id (primary key)
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    /// `auth_date` of the most recent successful authentication (Unix seconds)
    pub auth_date: i64,
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and applies the
/// embedded schema migrations.
///
/// # Example
///
/// ```no_run
/// use lingvo::storage::db;
///
/// let pool = db::create_pool("database.sqlite")?;
/// # Ok::<(), lingvo::core::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
    });
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    let mut conn = pool.get()?;
    migrations::run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Inserts the user or refreshes an existing row with the latest profile.
///
/// Expressed as a single `INSERT ... ON CONFLICT` statement so concurrent
/// logins of the same user never produce duplicate rows.
pub fn upsert_user(conn: &Connection, user: &UserRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, first_name, last_name, photo_url, auth_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
         username = excluded.username,
         first_name = excluded.first_name,
         last_name = excluded.last_name,
         photo_url = excluded.photo_url,
         auth_date = excluded.auth_date,
         updated_at = CURRENT_TIMESTAMP",
        params![
            user.id,
            user.username,
            user.first_name,
            user.last_name,
            user.photo_url,
            user.auth_date,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<UserRecord>> {
    conn.query_row(
        "SELECT id, username, first_name, last_name, photo_url, auth_date FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                username: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                photo_url: row.get(4)?,
                auth_date: row.get(5)?,
            })
        },
    )
    .optional()
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}
