//! Configuration for the invoice server.
//!
//! Built once at startup, from environment variables (with an optional
//! `.env` file) or from a TOML file, and handed to the components that need
//! it. Nothing else in the service reads the environment.

use invoice_llm::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use invoice_store::{PgSettings, DEFAULT_PG_PORT};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default upload limit: 20 MiB, the model's inline data ceiling
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Required environment variable not set
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// Environment variable set to an unusable value
    #[error("Invalid value for {name}: {value:?}")]
    InvalidVar {
        /// Variable name
        name: &'static str,
        /// Value as found
        value: String,
    },

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),
}

/// Server configuration
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 8000)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Extraction model settings
    pub gemini: GeminiConfig,

    /// Database settings
    pub database: DatabaseConfig,
}

/// Gemini model settings
#[derive(Clone, Deserialize)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Database backend selection
#[derive(Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// PostgreSQL server
    Postgres {
        /// Server host
        host: String,
        /// Server port
        #[serde(default = "default_pg_port")]
        port: u16,
        /// Database name
        name: String,
        /// Login role
        user: String,
        /// Login password
        password: String,
    },

    /// SQLite file
    Sqlite {
        /// Database file path
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_pg_port() -> u16 {
    DEFAULT_PG_PORT
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("invoices.db")
}

impl ServerConfig {
    /// Load configuration from the process environment
    ///
    /// A `.env` file in the working directory is read first if present;
    /// variables already set in the environment win.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        // Unset and blank are treated the same
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::MissingVar(name));

        let database = match var("DB_BACKEND").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("postgres") | Some("postgresql") => DatabaseConfig::Postgres {
                host: required("DB_HOST")?,
                port: parse_var(&var, "DB_PORT")?.unwrap_or(DEFAULT_PG_PORT),
                name: required("DB_NAME")?,
                user: required("DB_USER")?,
                password: required("DB_PASSWORD")?,
            },
            Some("sqlite") => DatabaseConfig::Sqlite {
                path: var("DB_PATH").map(PathBuf::from).unwrap_or_else(default_sqlite_path),
            },
            Some(other) => {
                return Err(ConfigError::InvalidVar {
                    name: "DB_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let config = ServerConfig {
            bind_address: var("BIND_ADDRESS").unwrap_or_else(default_bind_address),
            bind_port: parse_var(&var, "BIND_PORT")?.unwrap_or_else(default_bind_port),
            max_upload_bytes: parse_var(&var, "MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            gemini: GeminiConfig {
                api_key: required("GEMINI_API_KEY")?,
                model: var("GEMINI_MODEL").unwrap_or_else(default_model),
                endpoint: var("GEMINI_ENDPOINT").unwrap_or_else(default_endpoint),
                timeout_secs: parse_var(&var, "GEMINI_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
            database,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields are non-empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("gemini.api_key".to_string()));
        }
        if self.gemini.timeout_secs == 0 {
            return Err(ConfigError::MissingField("gemini.timeout_secs".to_string()));
        }

        if let DatabaseConfig::Postgres {
            host,
            name,
            user,
            password,
            ..
        } = &self.database
        {
            for (field, value) in [
                ("database.host", host),
                ("database.name", name),
                ("database.user", user),
                ("database.password", password),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::MissingField(field.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Create a default configuration for testing
    ///
    /// Uses an in-memory SQLite database and a placeholder API key.
    pub fn default_test_config() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            gemini: GeminiConfig {
                api_key: "test-key-do-not-use-in-production".to_string(),
                model: default_model(),
                endpoint: default_endpoint(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            database: DatabaseConfig::Sqlite {
                path: PathBuf::from(":memory:"),
            },
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

impl GeminiConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DatabaseConfig {
    /// Backend name, for logging
    pub fn backend(&self) -> &'static str {
        match self {
            DatabaseConfig::Postgres { .. } => "postgres",
            DatabaseConfig::Sqlite { .. } => "sqlite",
        }
    }

    /// PostgreSQL connection settings, if this is the Postgres backend
    pub fn pg_settings(&self) -> Option<PgSettings> {
        match self {
            DatabaseConfig::Postgres {
                host,
                port,
                name,
                user,
                password,
            } => Some(PgSettings {
                host: host.clone(),
                port: *port,
                database: name.clone(),
                user: user.clone(),
                password: password.clone(),
            }),
            DatabaseConfig::Sqlite { .. } => None,
        }
    }
}

fn parse_var<T, F>(var: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidVar { name, value })
        })
        .transpose()
}

// Secrets never reach the logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_address", &self.bind_address)
            .field("bind_port", &self.bind_port)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("gemini", &self.gemini)
            .field("database", &self.database)
            .finish()
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseConfig::Postgres {
                host,
                port,
                name,
                user,
                ..
            } => f
                .debug_struct("Postgres")
                .field("host", host)
                .field("port", port)
                .field("name", name)
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            DatabaseConfig::Sqlite { path } => {
                f.debug_struct("Sqlite").field("path", path).finish()
            }
        }
    }
}
