//! Configuration System
//!
//! Loads the schema periods and logging settings from a file. TOML is the
//! default format; files ending in `.yaml` or `.yml` are read as YAML.
//! Environment variables override logging settings. A loaded configuration
//! has already passed schema validation.

use crate::schema::{SchemaConfig, SchemaError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default, alias = "schema_config")]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(path)?;
        config.schema.validate()?;
        Ok(config)
    }

    /// Read a configuration file without validating the schema
    ///
    /// Callers must run `schema.validate()` before using the periods.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let parsed: Result<Self, String> = if is_yaml {
            serde_yaml::from_str(content).map_err(|e| e.to_string())
        } else {
            toml::from_str(content).map_err(|e| e.to_string())
        };

        parsed.map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Load and validate configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_with_env(path)?;
        config.schema.validate()?;
        Ok(config)
    }

    /// Read a configuration file and apply environment overrides, without
    /// validating the schema
    pub fn read_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Find the first default config location that exists
    pub fn default_path() -> Option<PathBuf> {
        first_existing([
            dirs::config_dir().map(|p| p.join("schemactl").join("config.toml")),
            Some(PathBuf::from("/etc/schemactl/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ])
    }

    /// Use `explicit` when given, else the first default location
    pub fn locate(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        explicit
            .or_else(Self::default_path)
            .ok_or(ConfigError::NotFound)
    }

    /// Load from the first default location that exists
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::locate(None)?;
        tracing::info!("Loading config from {:?}", path);
        Self::load_with_env(&path)
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("SCHEMACTL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SCHEMACTL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn first_existing(candidates: impl IntoIterator<Item = Option<PathBuf>>) -> Option<PathBuf> {
    candidates.into_iter().flatten().find(|p| p.exists())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid schema config: {0}")]
    Schema(#[from] SchemaError),

    #[error("No config file found in default locations")]
    NotFound,
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Schema configuration
#
# Environment variables override the logging settings:
# - SCHEMACTL_LOG_LEVEL
# - SCHEMACTL_LOG_FORMAT

# Periods must be listed in increasing `from` order. Add a new period with a
# later `from` to change schema; never edit a period that is already active.
[[schema.configs]]
# First day (UTC) this period applies to
from = "2019-01-02"
# Index and chunk store kinds
store = "cassandra"
object_store = "cassandra"
# Schema version
schema = "v10"
# Index row shard factor (defaults to 16 for v10 and later)
row_shards = 16

[schema.configs.index]
prefix = "index_"
# Table rotation period: 0 for one static table, else a multiple of 1d
period = "1w"

[schema.configs.chunks]
prefix = "chunks_"
period = "1w"

[[schema.configs]]
from = "2020-07-31"
store = "boltdb-shipper"
object_store = "gcs"
schema = "v11"

[schema.configs.index]
prefix = "index_"
period = "1d"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
