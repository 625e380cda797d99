//! Migration configuration
//!
//! `NetworkInfo` is the immutable bundle of endpoints for both networks plus
//! the migration service URL. `MigrationConfig` adds the tunables of the
//! orchestrator. `ConfigLoader` reads either from a TOML or JSON file and
//! lets environment variables override individual fields.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

/// Default timeout of a single HTTP attempt, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts at each retrying call site
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Prefix of the environment variables read by `ConfigLoader`
pub const ENV_PREFIX: &str = "KIN_MIGRATION_";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        ConfigError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::ParseError(error.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(error: toml::de::Error) -> Self {
        ConfigError::ParseError(error.to_string())
    }
}

/// Endpoints and identifiers of both networks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Horizon URL of the legacy network
    pub old_network_url: String,
    /// Network passphrase of the legacy network
    pub old_network_passphrase: String,
    /// Horizon URL of the successor network
    pub new_network_url: String,
    /// Network passphrase of the successor network
    pub new_network_passphrase: String,
    /// Issuer of the asset on the legacy network
    pub old_network_issuer: String,
    /// Migration endpoint; the public address is appended verbatim
    pub migration_service_url: String,
}

impl NetworkInfo {
    pub fn new(
        old_network_url: impl Into<String>,
        old_network_passphrase: impl Into<String>,
        new_network_url: impl Into<String>,
        new_network_passphrase: impl Into<String>,
        old_network_issuer: impl Into<String>,
        migration_service_url: impl Into<String>,
    ) -> Self {
        Self {
            old_network_url: old_network_url.into(),
            old_network_passphrase: old_network_passphrase.into(),
            new_network_url: new_network_url.into(),
            new_network_passphrase: new_network_passphrase.into(),
            old_network_issuer: old_network_issuer.into(),
            migration_service_url: migration_service_url.into(),
        }
    }

    /// Full migration URL for the given account
    pub fn migration_url(&self, public_address: &str) -> String {
        format!("{}{}", self.migration_service_url, public_address)
    }

    /// Check that every field is set and the URLs look like URLs
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("old_network_url", &self.old_network_url),
            ("old_network_passphrase", &self.old_network_passphrase),
            ("new_network_url", &self.new_network_url),
            ("new_network_passphrase", &self.new_network_passphrase),
            ("old_network_issuer", &self.old_network_issuer),
            ("migration_service_url", &self.migration_service_url),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(name.to_string()));
            }
        }

        let urls = [
            ("old_network_url", &self.old_network_url),
            ("new_network_url", &self.new_network_url),
            ("migration_service_url", &self.migration_service_url),
        ];
        for (name, value) in urls {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be an http(s) URL, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Full orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub network: NetworkInfo,

    /// Timeout of each HTTP attempt
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Attempts per retrying call site
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Where the completion store lives; in-memory when absent
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl MigrationConfig {
    /// Configuration with default tunables
    pub fn new(network: NetworkInfo) -> Self {
        Self {
            network,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            store_path: None,
            log_level: default_log_level(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("http_timeout_secs must be positive".into()));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue("max_retries must be positive".into()));
        }
        Ok(())
    }
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension, JSON when unknown
    pub fn from_path(path: &Path) -> ConfigFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Loads `MigrationConfig` from a file and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    load_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            env_prefix: ENV_PREFIX.to_string(),
            load_env: true,
        }
    }

    /// Loader that ignores the environment
    pub fn without_env() -> Self {
        Self {
            env_prefix: ENV_PREFIX.to_string(),
            load_env: false,
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: prefix.into(),
            load_env: true,
        }
    }

    /// Read, override from the environment and validate
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<MigrationConfig, ConfigError> {
        let path = path.as_ref();
        debug!("Loading migration configuration from {:?}", path);

        if !path.exists() {
            error!("Configuration file not found: {:?}", path);
            return Err(ConfigError::FileNotFound(path.to_string_lossy().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let mut config = Self::parse_content(&content, ConfigFormat::from_path(path))?;
        if self.load_env {
            self.override_from_env(&mut config)?;
        }
        config.validate()?;

        info!("Migration configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Build the whole configuration from environment variables
    pub fn load_from_env(&self) -> Result<MigrationConfig, ConfigError> {
        let network = NetworkInfo {
            old_network_url: self.require("OLD_NETWORK_URL")?,
            old_network_passphrase: self.require("OLD_NETWORK_PASSPHRASE")?,
            new_network_url: self.require("NEW_NETWORK_URL")?,
            new_network_passphrase: self.require("NEW_NETWORK_PASSPHRASE")?,
            old_network_issuer: self.require("OLD_NETWORK_ISSUER")?,
            migration_service_url: self.require("MIGRATION_SERVICE_URL")?,
        };
        let mut config = MigrationConfig::new(network);
        self.override_from_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse_content(content: &str, format: ConfigFormat) -> Result<MigrationConfig, ConfigError> {
        let config = match format {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        Ok(config)
    }

    fn var(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", self.env_prefix, key))
            .ok()
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.var(key)
            .ok_or_else(|| ConfigError::MissingField(format!("{}{}", self.env_prefix, key)))
    }

    fn override_from_env(&self, config: &mut MigrationConfig) -> Result<(), ConfigError> {
        let network = &mut config.network;
        let string_fields: [(&str, &mut String); 6] = [
            ("OLD_NETWORK_URL", &mut network.old_network_url),
            ("OLD_NETWORK_PASSPHRASE", &mut network.old_network_passphrase),
            ("NEW_NETWORK_URL", &mut network.new_network_url),
            ("NEW_NETWORK_PASSPHRASE", &mut network.new_network_passphrase),
            ("OLD_NETWORK_ISSUER", &mut network.old_network_issuer),
            ("MIGRATION_SERVICE_URL", &mut network.migration_service_url),
        ];
        for (key, field) in string_fields {
            if let Some(value) = self.var(key) {
                debug!("Overriding {} from environment", key);
                *field = value;
            }
        }

        if let Some(value) = self.var("HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = value.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("HTTP_TIMEOUT_SECS is not a number: {}", value))
            })?;
        }
        if let Some(value) = self.var("MAX_RETRIES") {
            config.max_retries = value.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("MAX_RETRIES is not a number: {}", value))
            })?;
        }
        if let Some(value) = self.var("STORE_PATH") {
            config.store_path = Some(PathBuf::from(value));
        }
        if let Some(value) = self.var("LOG_LEVEL") {
            config.log_level = value;
        }
        Ok(())
    }
}
