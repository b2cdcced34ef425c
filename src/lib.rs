//! Lingvo - authentication backend for a Telegram language-learning mini-app
//!
//! Verifies Telegram Login Widget and Mini App (`initData`) signatures and
//! keeps a record of every user who signed in.
//!
//! # Module Structure
//!
//! - `auth`: canonicalization, HMAC schemes, freshness and the auth gate
//! - `core`: configuration, errors, logging and metrics
//! - `storage`: SQLite pool, migrations and the user store
//! - `telegram`: axum routes and the Mini App middleware

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod auth;
pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use auth::{AuthError, AuthGate, AuthKeys, AuthPayload, AuthScheme, Identity};
pub use crate::core::{config, AppConfig, AppError};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
