use clap::{Parser, Subcommand, ValueEnum};
use std::fmt;

use crate::auth::{
    verify_payload, AuthError, AuthKeys, AuthPayload, AuthScheme, FreshnessPolicy, AUTH_DATE_FIELD, HASH_FIELD,
};

#[derive(Parser)]
#[command(name = "lingvo")]
#[command(author, version, about = "Telegram authentication backend for the Lingvo mini-app", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Port to listen on (overrides WEB_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply database migrations and exit
    Migrate,

    /// Print the signature of a payload under the configured bot token
    Sign {
        /// Signature scheme to use
        #[arg(long, value_enum, default_value_t = SchemeArg::LoginWidget)]
        scheme: SchemeArg,

        /// Add auth_date=<now> when the payload has none
        #[arg(long)]
        stamp: bool,

        /// Payload fields as key=value
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Check a signed payload (including its hash field) without touching the database
    Verify {
        /// Signature scheme to use
        #[arg(long, value_enum, default_value_t = SchemeArg::LoginWidget)]
        scheme: SchemeArg,

        /// Payload fields as key=value
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemeArg {
    LoginWidget,
    WebApp,
}

impl From<SchemeArg> for AuthScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::LoginWidget => AuthScheme::LoginWidget,
            SchemeArg::WebApp => AuthScheme::WebApp,
        }
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {:?}", raw)),
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Result of `lingvo sign`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutput {
    pub hash: String,
    /// Signed payload as a query string, ready for `X-Telegram-Init-Data`
    pub init_data: String,
}

impl fmt::Display for SignOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "hash: {}", self.hash)?;
        write!(f, "init data: {}", self.init_data)
    }
}

/// Signs `fields` under `scheme`. Any `hash` given on the command line is
/// dropped; with `stamp`, `auth_date` is set to `now` unless present.
pub fn sign_fields(
    keys: &AuthKeys,
    scheme: AuthScheme,
    stamp: bool,
    fields: Vec<(String, String)>,
    now: i64,
) -> SignOutput {
    let mut payload: AuthPayload = fields.into_iter().collect();
    payload.remove(HASH_FIELD);
    if stamp && payload.get(AUTH_DATE_FIELD).is_none() {
        payload.insert(AUTH_DATE_FIELD, now);
    }

    let hash = keys.sign(scheme, &payload);
    let init_data = payload.with(HASH_FIELD, hash.clone()).to_query_string();
    SignOutput { hash, init_data }
}

/// Runs every gate check on `fields` and describes the accepted user.
pub fn verify_fields(
    keys: &AuthKeys,
    policy: &FreshnessPolicy,
    scheme: AuthScheme,
    fields: Vec<(String, String)>,
    now: i64,
) -> Result<String, AuthError> {
    let verified = verify_payload(keys, policy, scheme, fields.into_iter().collect(), now)?;
    Ok(format!("valid ({}): user {}", scheme, verified.identity.id))
}
