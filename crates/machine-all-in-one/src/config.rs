use config::{Config, ConfigError, Environment};
use machine_api::{CorsConfig, HttpServerConfig};
use machine_domain::{Credentials, EnvelopeIdentity, LocalDb};
use machine_envelope::{EnvelopeKey, Result as EnvelopeResult};
use machine_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // HTTP configuration
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// CORS allowed origins (comma-separated list, "*" for all origins)
    #[serde(default = "default_http_cors_allowed_origins")]
    pub http_cors_allowed_origins: String,

    // PostgreSQL configuration
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    /// Apply embedded schema migrations at startup
    #[serde(default = "default_true")]
    pub postgres_run_migrations: bool,

    // Envelope configuration
    /// AES-256 key: 64 hex digits or 32 raw characters
    #[serde(default)]
    pub envelope_key: String,

    /// CBC IV: 32 hex digits or 16 raw characters
    #[serde(default)]
    pub envelope_iv: String,

    /// Static transport credential expected in `apikey`
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_unique_id")]
    pub unique_id: String,

    #[serde(default = "default_datacore")]
    pub datacore: String,

    #[serde(default = "default_group")]
    pub group: String,

    #[serde(default = "default_property")]
    pub property: String,

    // OpenTelemetry configuration
    #[serde(default)]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_http_cors_allowed_origins() -> String {
    "*".to_string()
}

fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "machine".to_string()
}

fn default_postgres_username() -> String {
    "machine".to_string()
}

fn default_postgres_password() -> String {
    "machine".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_unique_id() -> String {
    "machine-backend".to_string()
}

fn default_datacore() -> String {
    "MACHINE".to_string()
}

fn default_group() -> String {
    "MACHINE".to_string()
}

fn default_property() -> String {
    "MASTERDATA".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "machine-all-in-one".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("MACHINE"))
            .build()?
            .try_deserialize()
    }

    pub fn envelope_key(&self) -> EnvelopeResult<EnvelopeKey> {
        EnvelopeKey::from_config(&self.envelope_key, &self.envelope_iv)
    }

    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("MACHINE_API_KEY must be set");
        }
        Ok(Credentials {
            api_key: self.api_key.clone(),
            unique_id: self.unique_id.clone(),
            local_db: LocalDb::No,
        })
    }

    pub fn identity(&self) -> EnvelopeIdentity {
        EnvelopeIdentity::new(&self.datacore, &self.group, &self.property)
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_database.clone(),
            username: self.postgres_username.clone(),
            password: self.postgres_password.clone(),
            max_pool_size: self.postgres_max_pool_size,
            run_migrations: self.postgres_run_migrations,
        }
    }

    pub fn http_server_config(&self) -> HttpServerConfig {
        HttpServerConfig {
            host: self.http_host.clone(),
            port: self.http_port,
            cors_config: CorsConfig::from_comma_separated(&self.http_cors_allowed_origins),
        }
    }
}

/// Secrets are never printed
impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("log_level", &self.log_level)
            .field("http_host", &self.http_host)
            .field("http_port", &self.http_port)
            .field("http_cors_allowed_origins", &self.http_cors_allowed_origins)
            .field("postgres_host", &self.postgres_host)
            .field("postgres_port", &self.postgres_port)
            .field("postgres_database", &self.postgres_database)
            .field("postgres_username", &self.postgres_username)
            .field("postgres_max_pool_size", &self.postgres_max_pool_size)
            .field("postgres_run_migrations", &self.postgres_run_migrations)
            .field("unique_id", &self.unique_id)
            .field("datacore", &self.datacore)
            .field("group", &self.group)
            .field("property", &self.property)
            .field("otel_enabled", &self.otel_enabled)
            .field("otel_endpoint", &self.otel_endpoint)
            .field("otel_service_name", &self.otel_service_name)
            .finish_non_exhaustive()
    }
}
