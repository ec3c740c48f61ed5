//! Process-wide settings
//!
//! Settings are loaded once at startup (TOML file and/or environment) and are
//! immutable afterwards; components that need them receive them at
//! construction time rather than reading ambient global state.

use crate::error::{ErrorContext, WardenError, WardenResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Token signing and credential hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// HMAC secret used to sign tokens
    pub secret_key: String,
    /// Signing algorithm (only HS256 is supported)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Access token lifetime in minutes
    #[serde(default = "default_access_minutes")]
    pub access_token_expire_minutes: i64,
    /// Refresh token lifetime in days
    #[serde(default = "default_refresh_days")]
    pub refresh_token_expire_days: i64,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_minutes() -> i64 {
    30
}

fn default_refresh_days() -> i64 {
    7
}

/// Persistence backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL; `sqlite::memory:` for ephemeral dev storage
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> WardenResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| WardenError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("settings")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| WardenError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("settings")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Build settings from environment variables, falling back to defaults.
    ///
    /// `SECRET_KEY` is required; everything else has a sensible default.
    pub fn from_env() -> WardenResult<Self> {
        let secret_key = std::env::var("SECRET_KEY").map_err(|_| WardenError::Config {
            message: "SECRET_KEY environment variable is not set".to_string(),
            source: None,
            context: ErrorContext::new("settings")
                .with_operation("from_env")
                .with_suggestion("Export SECRET_KEY or provide a config file"),
        })?;

        let settings = Self {
            server: ServerConfig {
                host: std::env::var("WARDEN_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: std::env::var("WARDEN_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            security: SecurityConfig {
                secret_key,
                algorithm: std::env::var("ALGORITHM").unwrap_or_else(|_| default_algorithm()),
                access_token_expire_minutes: std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_access_minutes),
                refresh_token_expire_days: std::env::var("REFRESH_TOKEN_EXPIRE_DAYS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_refresh_days),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite::memory:".to_string()),
            },
            logging: LoggingConfig::default(),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> WardenResult<()> {
        if self.security.secret_key.len() < 16 {
            return Err(WardenError::Config {
                message: "secret_key must be at least 16 bytes".to_string(),
                source: None,
                context: ErrorContext::new("settings")
                    .with_operation("validate")
                    .with_suggestion("Use a long random value for security.secret_key"),
            });
        }

        if self.security.algorithm != "HS256" {
            return Err(WardenError::Config {
                message: format!("Unsupported algorithm: {}", self.security.algorithm),
                source: None,
                context: ErrorContext::new("settings")
                    .with_operation("validate")
                    .with_suggestion("Set security.algorithm to HS256"),
            });
        }

        if self.security.access_token_expire_minutes <= 0
            || self.security.refresh_token_expire_days <= 0
        {
            return Err(WardenError::Config {
                message: "Token lifetimes must be positive".to_string(),
                source: None,
                context: ErrorContext::new("settings").with_operation("validate"),
            });
        }

        Ok(())
    }

    /// Settings suitable for tests: in-memory storage, fixed secret
    pub fn for_tests() -> Self {
        Self {
            server: ServerConfig::default(),
            security: SecurityConfig {
                secret_key: "warden-test-secret-not-for-production".to_string(),
                algorithm: default_algorithm(),
                access_token_expire_minutes: default_access_minutes(),
                refresh_token_expire_days: default_refresh_days(),
            },
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
