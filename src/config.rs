//! Configuration loaded from TOML.
//!
//! Every section is optional and falls back to defaults, so an empty file
//! is a valid configuration.

use serde::Deserialize;
use std::path::Path;

use crate::block::Block;
use crate::hasher::HasherKind;
use crate::store::DEFAULT_CAPACITY;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Store sizing and hashing.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Blocks admitted, in order, when the store is created.
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Maximum number of live blocks.
    #[serde(default = "StoreConfig::default_capacity")]
    pub capacity: usize,

    /// Hash-function pair used by the key index.
    #[serde(default)]
    pub hasher: HasherKind,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
            hasher: HasherKind::default(),
        }
    }
}

impl StoreConfig {
    fn default_capacity() -> usize {
        DEFAULT_CAPACITY
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter, e.g. "info" or "blockheap=trace".
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include timestamps in log lines.
    #[serde(default = "LoggingConfig::default_timestamps")]
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: LogFormat::default(),
            timestamps: Self::default_timestamps(),
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }

    fn default_timestamps() -> bool {
        true
    }
}

/// An initial block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockConfig {
    /// Block key.
    pub key: String,
    /// Ordering timestamp.
    pub timestamp: u64,
    /// Payload, zero when omitted.
    #[serde(default)]
    pub nonce: f64,
}

impl From<&BlockConfig> for Block {
    fn from(config: &BlockConfig) -> Self {
        Block::new(config.key.clone(), config.timestamp, config.nonce)
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        contents.parse()
    }

    /// Check values that deserialization alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.capacity == 0 {
            return Err(ConfigError::Invalid(
                "store.capacity must be positive".to_string(),
            ));
        }
        if self.blocks.iter().any(|block| block.key.is_empty()) {
            return Err(ConfigError::Invalid(
                "blocks must have a non-empty key".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
