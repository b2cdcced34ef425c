//! Telegram authentication: Login Widget and Mini App `initData` verification
//!
//! Both schemes sign the same data-check string (sorted `key=value` lines)
//! with HMAC-SHA256 but derive the key from the bot token differently.
//! [`AuthGate`] runs the checks in order and records the user on success.

pub mod canonical;
pub mod error;
pub mod freshness;
pub mod gate;
pub mod identity;
pub mod payload;
pub mod scheme;

pub use canonical::data_check_string;
pub use error::AuthError;
pub use freshness::{Freshness, FreshnessPolicy};
pub use gate::{now_unix, record_rejection, verify_payload, AuthGate, VerifiedAuth};
pub use identity::Identity;
pub use payload::{AuthPayload, AUTH_DATE_FIELD, HASH_FIELD};
pub use scheme::{AuthKeys, AuthScheme};
