//! Configuration management.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{ErrorCode, LibrisError, Result};
use crate::relations::DependentSalesPolicy;

const ENV_PREFIX: &str = "LIBRIS";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Relationship rules
    #[serde(default)]
    pub relations: RelationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which [`LibraryStore`](crate::db::LibraryStore) implementation to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    #[default]
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Store backend
    #[serde(default)]
    pub backend: StoreBackend,

    /// PostgreSQL connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long to wait for a pooled connection
    #[serde(default = "default_acquire_timeout", with = "humantime_serde")]
    pub acquire_timeout: Duration,

    /// Apply embedded migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout: default_acquire_timeout(),
            run_migrations: default_run_migrations(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// OpenTelemetry OTLP endpoint
    pub otlp_endpoint: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Install the Prometheus recorder and serve `/metrics`
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationsConfig {
    /// What happens to sales when their book, client or author is deleted
    #[serde(default)]
    pub dependent_sales: DependentSalesPolicy,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_database_url() -> String { "postgres://localhost:5432/libris".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 1 }
fn default_acquire_timeout() -> Duration { Duration::from_secs(5) }
fn default_run_migrations() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_metrics_enabled() -> bool { true }

impl Config {
    /// Environment only (`LIBRIS__SERVER__PORT=9000`, ...).
    ///
    /// With no `LIBRIS__*` variables set this yields the defaults; any variable
    /// that is set must produce a valid config.
    pub fn load() -> anyhow::Result<Self> {
        Self::build(None, Self::environment())
    }

    /// A TOML/YAML/JSON file, with environment variables taking precedence.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        Self::build(Some(path), Self::environment())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX).separator("__")
    }

    fn build(path: Option<&str>, env: config::Environment) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let cfg: Config = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would only fail later, at pool or bind time.
    pub fn validate(&self) -> Result<()> {
        let db = &self.database;
        if db.max_connections == 0 || db.min_connections > db.max_connections {
            return Err(LibrisError::new(
                ErrorCode::ConfigurationError,
                format!(
                    "database pool bounds are invalid (min {}, max {})",
                    db.min_connections, db.max_connections
                ),
            ));
        }
        if db.backend == StoreBackend::Postgres
            && !(db.url.starts_with("postgres://") || db.url.starts_with("postgresql://"))
        {
            return Err(LibrisError::new(
                ErrorCode::ConfigurationError,
                "database.url must be a postgres:// URL when backend is postgres",
            ));
        }
        Ok(())
    }

    /// Socket address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
