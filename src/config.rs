//! Configuration management for Ekiwi
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides
//! of the account credentials.

use crate::error::{EkiwiError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

pub use defaults::DEFAULT_SESSION_TTL_MINUTES;

/// Environment variable overriding `account.email`
pub const ENV_EMAIL: &str = "EKIWI_EMAIL";

/// Environment variable overriding `account.password`
pub const ENV_PASSWORD: &str = "EKIWI_PASSWORD";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider account credentials
    pub account: AccountConfig,

    /// Remote API endpoint and client identity
    pub api: ApiConfig,

    /// Credential lifetimes and storage
    pub session: SessionConfig,

    /// Hour of Power reporting options
    pub hop: HopConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Provider timezone used to compute "today" for consumption queries
    pub timezone: String,
}

/// Provider account credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Login email address
    pub email: String,

    /// Plain-text password; only its MD5 digest is sent
    pub password: String,

    /// Which customer record of the login response to use
    pub customer_index: usize,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("customer_index", &self.customer_index)
            .finish()
    }
}

/// Remote API endpoint and static client headers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL without trailing slash
    pub base_url: String,

    /// Per-call timeout in seconds
    pub timeout_seconds: u64,

    /// `x-client` header
    pub client_id: String,

    /// `x-apiversion` header
    pub api_version: String,

    /// `user-agent` header
    pub user_agent: String,

    /// `X-Requested-With` header
    pub requested_with: String,
}

/// Credential lifetimes and storage location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime assumed for a bootstrap auth session
    pub auth_ttl_minutes: u32,

    /// Lifetime assumed for a customer login
    pub customer_ttl_minutes: u32,

    /// JSON file holding the persisted session records
    pub store_path: String,
}

/// Hour of Power reporting options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HopConfig {
    /// Window used for the average utilisation figure
    pub average_days: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level; falls back to `level`
    pub console_level: Option<String>,

    /// Optional file-specific level; falls back to `level`
    pub file_level: Option<String>,

    /// Path to log file; empty disables file logging
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists,
    /// then apply environment overrides
    pub fn load() -> Result<Self> {
        let default_paths = [
            "ekiwi_config.yaml",
            "/data/ekiwi_config.yaml",
            "/etc/ekiwi/config.yaml",
        ];

        let mut config = default_paths
            .iter()
            .find(|p| Path::new(p).exists())
            .map(Self::from_file)
            .transpose()?
            .unwrap_or_default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override credentials from `EKIWI_EMAIL` / `EKIWI_PASSWORD` when set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(email) = std::env::var(ENV_EMAIL)
            && !email.trim().is_empty()
        {
            self.account.email = email;
        }
        if let Ok(password) = std::env::var(ENV_PASSWORD)
            && !password.is_empty()
        {
            self.account.password = password;
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed provider timezone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| EkiwiError::Validation {
                field: "timezone".to_string(),
                message: format!("Unknown timezone '{}'", self.timezone),
            })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.account.email.trim().is_empty() || self.account.password.is_empty() {
            return Err(EkiwiError::config(
                "account.email and account.password must both be set",
            ));
        }

        if self.api.base_url.trim().is_empty() {
            return Err(EkiwiError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.api.timeout_seconds == 0 {
            return Err(EkiwiError::validation(
                "api.timeout_seconds",
                "Must be greater than 0",
            ));
        }

        if self.session.auth_ttl_minutes == 0 {
            return Err(EkiwiError::validation(
                "session.auth_ttl_minutes",
                "Must be greater than 0",
            ));
        }

        if self.session.customer_ttl_minutes == 0 {
            return Err(EkiwiError::validation(
                "session.customer_ttl_minutes",
                "Must be greater than 0",
            ));
        }

        if self.hop.average_days == 0 {
            return Err(EkiwiError::validation(
                "hop.average_days",
                "Must be greater than 0",
            ));
        }

        self.tz()?;

        Ok(())
    }
}
