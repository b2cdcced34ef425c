use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;

use lingvo::auth::{now_unix, AuthGate, AuthKeys, AuthScheme};
use lingvo::cli::{sign_fields, verify_fields, Cli, Commands};
use lingvo::core::{init_logger, log_startup_configuration, AppConfig};
use lingvo::storage::{create_pool, SqliteUserStore};
use lingvo::telegram::run_webapp_server;

/// Main entry point
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if configuration, logging, the database or the server fail.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    let config = AppConfig::from_env()?;

    match cli.command {
        Some(Commands::Serve { port }) => run_server(config, port).await,
        Some(Commands::Migrate) => run_migrate(config),
        Some(Commands::Sign { scheme, stamp, fields }) => run_sign(&config, scheme.into(), stamp, fields),
        Some(Commands::Verify { scheme, fields }) => run_verify(&config, scheme.into(), fields),
        None => run_server(config, None).await,
    }
}

/// Run the HTTP server
async fn run_server(config: AppConfig, port: Option<u16>) -> Result<()> {
    init_logger(&config.log_file_path)?;
    log_startup_configuration(&config);

    let db_pool = Arc::new(create_pool(&config.database_path)?);
    let keys = Arc::new(AuthKeys::derive(&config.bot_token));
    let store = Arc::new(SqliteUserStore::new(db_pool));
    let gate = Arc::new(AuthGate::new(keys, config.freshness, store));

    run_webapp_server(port.unwrap_or(config.web_port), gate).await
}

/// Apply migrations and exit
fn run_migrate(config: AppConfig) -> Result<()> {
    init_logger(&config.log_file_path)?;
    create_pool(&config.database_path)?;
    log::info!("Database at {} is up to date", config.database_path);
    Ok(())
}

/// Print the signature and the signed query string for a payload
fn run_sign(config: &AppConfig, scheme: AuthScheme, stamp: bool, fields: Vec<(String, String)>) -> Result<()> {
    let keys = AuthKeys::derive(&config.bot_token);
    println!("{}", sign_fields(&keys, scheme, stamp, fields, now_unix()));
    Ok(())
}

/// Verify a payload (hash included) against the configured token
fn run_verify(config: &AppConfig, scheme: AuthScheme, fields: Vec<(String, String)>) -> Result<()> {
    let keys = AuthKeys::derive(&config.bot_token);

    let report = verify_fields(&keys, &config.freshness, scheme, fields, now_unix())
        .map_err(|e| anyhow::anyhow!("verification failed ({}): {}", scheme, e))?;
    println!("{}", report);
    Ok(())
}
