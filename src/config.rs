use axum::http::HeaderValue;
use axum::http::header::InvalidHeaderValue;
use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

const DEFAULT_DATABASE_NAME: &str = "user_db";

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub cors: CorsConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

/// Configuration for the standalone fixture import job.
#[derive(Clone, Debug, Parser)]
#[command(version, about = "Wipe the users collection and reload it from a JSON fixture", long_about = None)]
pub struct ImportConfig {
    /// Path to the fixture file containing a top-level `users` array
    #[arg(long, env = "USERS_FIXTURE", default_value = "udata.json")]
    pub fixture: PathBuf,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// MongoDB connection string
    #[arg(long = "database-url", env = "MONGO_URI", default_value = "mongodb://localhost:27017/user_db")]
    pub url: String,

    /// Database name (defaults to the last path segment of the connection string)
    #[arg(long = "database-name", env = "MONGO_DB_NAME")]
    pub name: Option<String>,

    /// Collection holding user documents
    #[arg(long, env = "USERS_API_COLLECTION", default_value = "users")]
    pub collection: String,
}

impl DatabaseConfig {
    /// Resolves the database to use: the explicit override, else the last
    /// path segment of the connection string, else `user_db`.
    #[must_use]
    pub fn database_name(&self) -> String {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| database_from_uri(&self.url))
            .unwrap_or(DEFAULT_DATABASE_NAME)
            .to_string()
    }
}

fn database_from_uri(uri: &str) -> Option<&str> {
    let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    let (_, path) = rest.split_once('/')?;
    let path = path.split('?').next().unwrap_or_default();
    path.rsplit('/').next().filter(|segment| !segment.is_empty())
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "USERS_API_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "USERS_API_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Port for the management (health) server
    #[arg(long, env = "USERS_API_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Seconds to wait for in-flight work after a shutdown signal
    #[arg(long, env = "USERS_API_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct CorsConfig {
    /// The single origin allowed to make cross-origin requests to /api
    #[arg(
        long,
        env = "USERS_API_ALLOWED_ORIGIN",
        default_value = "http://localhost:5173",
        value_parser = parse_origin
    )]
    pub allowed_origin: HeaderValue,
}

fn parse_origin(raw: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(raw)
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the database readiness check
    #[arg(long, env = "USERS_API_HEALTH_DB_TIMEOUT_MS", default_value_t = 2000)]
    pub db_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "USERS_API_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; traces and metrics are only exported when set
    #[arg(long, env = "USERS_API_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

impl ImportConfig {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
