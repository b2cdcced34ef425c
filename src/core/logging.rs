//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup summary of the effective configuration (without secrets)

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config::AppConfig;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger was already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup.
///
/// The bot token is only reported as configured; its value never reaches the log.
pub fn log_startup_configuration(config: &AppConfig) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Lingvo auth service configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("BOT_TOKEN: configured");
    log::info!("DATABASE_PATH: {}", config.database_path);
    log::info!("WEB_PORT: {}", config.web_port);
    log::info!("AUTH_MAX_AGE_SECS: {}", config.freshness.max_age_secs);

    match config.freshness.max_clock_skew_secs {
        Some(skew) => log::info!("AUTH_MAX_CLOCK_SKEW_SECS: {}", skew),
        None => {
            log::warn!("AUTH_MAX_CLOCK_SKEW_SECS: not set");
            log::warn!("   Payloads with a future auth_date will be accepted");
        }
    }
}
