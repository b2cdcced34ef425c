use secrecy::SecretString;
use std::env;

use crate::auth::FreshnessPolicy;
use crate::core::error::{AppError, AppResult};

/// Default values used when the corresponding environment variable is unset
pub mod defaults {
    /// Database file path (`DATABASE_PATH`)
    pub const DATABASE_PATH: &str = "database.sqlite";

    /// Log file path (`LOG_FILE_PATH`)
    pub const LOG_FILE_PATH: &str = "app.log";

    /// Port for the mini-app API (`WEB_PORT`)
    pub const WEB_PORT: u16 = 3000;

    /// Maximum age of a signed payload in seconds (`AUTH_MAX_AGE_SECS`)
    pub const AUTH_MAX_AGE_SECS: i64 = 86_400;
}

/// Process-wide configuration.
///
/// Built once in `main` and handed to the components that need it. Nothing
/// else in the crate reads the environment.
#[derive(Debug)]
pub struct AppConfig {
    /// Bot token used to derive both signature keys. Never logged.
    pub bot_token: SecretString,
    pub database_path: String,
    pub log_file_path: String,
    pub web_port: u16,
    pub freshness: FreshnessPolicy,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if `.env` files should be honoured.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when the bot token is missing or a numeric
    /// variable cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let bot_token = lookup("BOT_TOKEN")
            .or_else(|| lookup("TELOXIDE_TOKEN"))
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| AppError::Config("BOT_TOKEN environment variable not set".to_string()))?;

        let database_path = lookup("DATABASE_PATH").unwrap_or_else(|| defaults::DATABASE_PATH.to_string());
        let log_file_path = lookup("LOG_FILE_PATH").unwrap_or_else(|| defaults::LOG_FILE_PATH.to_string());
        let web_port = parse_var(&lookup, "WEB_PORT")?.unwrap_or(defaults::WEB_PORT);

        let max_age_secs = parse_var(&lookup, "AUTH_MAX_AGE_SECS")?.unwrap_or(defaults::AUTH_MAX_AGE_SECS);
        if max_age_secs < 0 {
            return Err(AppError::Config("AUTH_MAX_AGE_SECS must not be negative".to_string()));
        }
        let max_clock_skew_secs: Option<i64> = parse_var(&lookup, "AUTH_MAX_CLOCK_SKEW_SECS")?;
        if max_clock_skew_secs.is_some_and(|skew| skew < 0) {
            return Err(AppError::Config("AUTH_MAX_CLOCK_SKEW_SECS must not be negative".to_string()));
        }

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            database_path,
            log_file_path,
            web_port,
            freshness: FreshnessPolicy {
                max_age_secs,
                max_clock_skew_secs,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {:?}", key, raw))),
    }
}
