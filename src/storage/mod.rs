//! Database access and the user store

pub mod db;
pub mod migrations;
pub mod users;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool, UserRecord};
pub use users::{SqliteUserStore, UserStore};
