//! Runtime configuration.
//!
//! Every flag falls back to an environment variable; `load_env` pulls those
//! from a `.env` file first when one exists.

use crate::auth::models::AppId;
use clap::{builder::NonEmptyStringValueParser, Args, Parser, Subcommand};
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "credential-authority")]
#[command(about = "Multi-tenant credential authority - users, passwords and per-app tokens")]
pub struct Cli {
    /// SQLite database path
    #[arg(
        long,
        env = "AUTH_DB_PATH",
        default_value = "credential_authority.db",
        global = true
    )]
    pub db_path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the auth RPC endpoints
    Serve(ServeConfig),
    /// Insert or update an app and its signing secret
    ProvisionApp(AppConfig),
}

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Address to listen on
    #[arg(long, env = "AUTH_LISTEN_ADDR", default_value = "0.0.0.0:44044")]
    pub listen_addr: SocketAddr,

    /// Lifetime of issued tokens in seconds
    #[arg(
        long,
        env = "TOKEN_TTL_SECS",
        default_value = "3600",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub token_ttl_secs: u64,

    /// bcrypt cost factor for new password hashes
    #[arg(
        long,
        env = "BCRYPT_COST",
        default_value_t = bcrypt::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31)
    )]
    pub bcrypt_cost: u32,

    /// Per-request deadline in milliseconds
    #[arg(
        long,
        env = "REQUEST_TIMEOUT_MS",
        default_value = "5000",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout_ms: u64,
}

impl ServeConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Args, Debug, Clone)]
pub struct AppConfig {
    /// Numeric app id callers pass on login
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
    pub id: AppId,

    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub name: String,

    /// Token signing secret for this app
    #[arg(long, env = "APP_SECRET", value_parser = NonEmptyStringValueParser::new())]
    pub secret: String,
}

/// Load `.env` from the working directory (and parents), then from the crate root.
pub fn load_env() {
    let _ = dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
