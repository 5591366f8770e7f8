//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::token::{Identity, SessionTokens};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info, warn};

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// A token lifetime. `None` means tokens of that class never expire.
#[derive(Debug, Clone, Copy)]
pub struct Ttl(pub Option<Duration>);

#[derive(Parser, Debug, Clone)]
#[command(
    name = "wrenpost-session",
    about = "Session token service for the Wrenpost app"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7320")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "wrenpost.db")]
    pub database: String,

    /// Access token lifetime: humantime ("15m"), seconds ("900"), or "none"
    #[arg(long, default_value = "15m", value_parser = parse_ttl)]
    pub access_ttl: Ttl,

    /// Refresh token lifetime: humantime ("7d"), seconds, or "none"
    #[arg(long, default_value = "7d", value_parser = parse_ttl)]
    pub refresh_ttl: Ttl,

    /// Path to file containing the access token secret. Prefer the ACCESS_TOKEN_SECRET env var
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer the REFRESH_TOKEN_SECRET env var
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Issue and store a session (refresh + access token) for the given
    /// email, creating the user if needed, then exit
    #[arg(long, value_name = "EMAIL")]
    pub issue_session: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Parse a token lifetime: a humantime span ("15m", "7d"), a plain
/// integer count of seconds, or "none" for non-expiring tokens.
fn parse_ttl(s: &str) -> Result<Ttl, String> {
    if s.eq_ignore_ascii_case("none") {
        return Ok(Ttl(None));
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Ttl(Some(Duration::from_secs(secs))));
    }
    humantime::parse_duration(s)
        .map(|d| Ttl(Some(d)))
        .map_err(|e| format!("Invalid duration '{}': {}", s, e))
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load one token secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
fn load_token_secret(env_var: &str, secret_file: Option<&str>) -> Option<Vec<u8>> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "Token secret is required. Set the {} environment variable (recommended) or use the matching --*-secret-file flag",
            env_var
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret.into_bytes())
}

/// Load both token secrets. Each token class has its own secret so
/// compromise of one does not compromise the other; identical secrets
/// are refused at startup.
pub fn load_secrets(args: &Args) -> Option<(Vec<u8>, Vec<u8>)> {
    let access = load_token_secret("ACCESS_TOKEN_SECRET", args.access_secret_file.as_deref())?;
    let refresh = load_token_secret("REFRESH_TOKEN_SECRET", args.refresh_secret_file.as_deref())?;

    if access == refresh {
        error!("Access and refresh token secrets must differ");
        return None;
    }

    Some((access, refresh))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    args: &Args,
) -> ServerConfig {
    if args.access_ttl.0.is_none() {
        warn!("Access tokens configured without expiry");
    }
    if args.refresh_ttl.0.is_none() {
        warn!("Refresh tokens configured without expiry");
    }

    ServerConfig {
        db,
        access_secret,
        refresh_secret,
        access_ttl: args.access_ttl.0,
        refresh_ttl: args.refresh_ttl.0,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Handle the --issue-session flag: issue a refresh + access token pair
/// for the given email (creating the user if needed), store the refresh
/// token as the user's single active one, and print both tokens.
pub async fn handle_issue_session(db: &Database, tokens: &SessionTokens, email: &str) {
    let user = match db.users().get_by_email(email).await {
        Ok(user) => user,
        Err(e) => {
            error!(error = %e, "Failed to look up user");
            std::process::exit(1);
        }
    };

    let id = match user {
        Some(user) => user.id,
        None => match db.users().create(email).await {
            Ok(id) => {
                info!(email = %email, "User created");
                id
            }
            Err(e) => {
                error!(error = %e, "Failed to create user");
                std::process::exit(1);
            }
        },
    };

    let identity = Identity::new(id, email);

    let refresh = match tokens.issue_refresh(&identity) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Failed to issue refresh token");
            std::process::exit(1);
        }
    };

    let access = match tokens.issue_access(&identity) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Failed to issue access token");
            std::process::exit(1);
        }
    };

    // Replaces any previously stored refresh token for this user
    if let Err(e) = db.users().set_refresh_token(id, &refresh).await {
        error!(error = %e, "Failed to store refresh token");
        std::process::exit(1);
    }

    println!();
    println!("Session issued for {}", email);
    println!("Access token:  {}", access);
    println!("Refresh token: {}", refresh);
    println!();
}
