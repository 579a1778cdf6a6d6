//! Configuration module for rewrite-testing
//!
//! Handles the TOML configuration of the tool: where the site snapshot and
//! test cases live, and where the last summary is kept.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Site settings
    #[serde(default)]
    pub site: SiteConfig,

    /// Test case sources
    #[serde(default)]
    pub tests: TestsConfig,

    /// Summary cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a string
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.snapshot.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "site.snapshot must be specified".to_string(),
            ));
        }

        if !self.tests.include_defaults && self.tests.cases.is_none() {
            return Err(ConfigError::ValidationError(
                "no test cases: enable tests.include_defaults or set tests.cases".to_string(),
            ));
        }

        if self.cache.storage == CacheStorage::Disk && self.cache.disk_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "cache.disk_path must be specified for disk storage".to_string(),
            ));
        }

        Ok(())
    }
}

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Path to the site snapshot
    #[serde(default = "default_snapshot")]
    pub snapshot: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            snapshot: default_snapshot(),
        }
    }
}

fn default_snapshot() -> String {
    "site.toml".to_string()
}

/// Test case sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestsConfig {
    /// Include the built-in corpus
    #[serde(default = "default_true")]
    pub include_defaults: bool,

    /// Extra case file, merged over the built-in corpus
    #[serde(default)]
    pub cases: Option<String>,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            include_defaults: true,
            cases: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Summary cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable caching
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Cache storage backend
    #[serde(default = "default_cache_storage")]
    pub storage: CacheStorage,

    /// Disk cache path
    #[serde(default = "default_cache_path")]
    pub disk_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: true,
            storage: CacheStorage::Memory,
            disk_path: default_cache_path(),
        }
    }
}

fn default_cache_storage() -> CacheStorage {
    CacheStorage::Memory
}

fn default_cache_path() -> String {
    "/var/cache/rewrite-testing".to_string()
}

/// Cache storage backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CacheStorage {
    Memory,
    Disk,
}
