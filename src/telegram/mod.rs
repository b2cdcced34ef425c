//! HTTP surface for the Telegram Login Widget and the Mini App

pub mod webapp;
pub mod webapp_auth;

pub use webapp::{create_webapp_router, run_webapp_server, WebAppState};
pub use webapp_auth::{parse_init_data, require_webapp_auth};
