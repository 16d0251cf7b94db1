// Configuration File Support
//
// Configuration file parsing for the anptop execution engine.
// Supports TOML format with environment variable overrides.
// Configuration files are loaded from the XDG config directory: ~/.config/anptop/config.toml

use crate::tools::{
    ExecutorConfig, DEFAULT_EVIDENCE_ROOT, DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_OUTPUT_BYTES,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Evidence storage configuration
    pub evidence: EvidenceConfig,

    /// Execution limits
    pub execution: ExecutionConfig,

    /// Tool catalog source
    pub catalog: CatalogConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Evidence storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Root directory for per-execution scratch directories
    pub storage_path: String,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            storage_path: DEFAULT_EVIDENCE_ROOT.to_string(),
        }
    }
}

/// Execution configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Maximum captured bytes per output stream
    pub max_output_bytes: usize,

    /// Number of results kept in the in-memory history
    pub history_capacity: usize,

    /// Bound for tools with no timeout (0 keeps them unbounded)
    pub daemon_timeout_cap_secs: u64,

    /// Fill missing placeholders from declared parameter defaults
    pub merge_default_parameters: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            daemon_timeout_cap_secs: 0,
            merge_default_parameters: false,
        }
    }
}

/// Tool catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// TOML catalog replacing the built-in one
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// Environment overrides are applied whether or not the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// if the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/anptop/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "anptop", "ANPTOP") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            // Fallback if XDG dirs cannot be determined
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config").join("anptop").join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - ANPTOP_LOG_LEVEL
    /// - ANPTOP_LOG_FORMAT
    /// - EVIDENCE_STORAGE_PATH
    /// - ANPTOP_HISTORY_CAPACITY
    /// - ANPTOP_DAEMON_TIMEOUT_CAP_SECS
    /// - ANPTOP_CATALOG_PATH
    fn apply_env_overrides(mut self) -> Self {
        // Logging overrides
        if let Ok(level) = std::env::var("ANPTOP_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("ANPTOP_LOG_FORMAT") {
            self.logging.format = format;
        }

        // Evidence overrides
        if let Ok(path) = std::env::var("EVIDENCE_STORAGE_PATH") {
            if !path.is_empty() {
                self.evidence.storage_path = path;
            }
        }

        // Execution overrides
        if let Ok(capacity) = std::env::var("ANPTOP_HISTORY_CAPACITY") {
            if let Ok(capacity) = capacity.parse::<usize>() {
                if capacity > 0 {
                    self.execution.history_capacity = capacity;
                }
            }
        }
        if let Ok(cap) = std::env::var("ANPTOP_DAEMON_TIMEOUT_CAP_SECS") {
            if let Ok(cap) = cap.parse::<u64>() {
                self.execution.daemon_timeout_cap_secs = cap;
            }
        }

        // Catalog overrides
        if let Ok(path) = std::env::var("ANPTOP_CATALOG_PATH") {
            if !path.is_empty() {
                self.catalog.path = Some(path);
            }
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        // Validate logging level
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        // Validate logging format
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.evidence.storage_path.trim().is_empty() {
            anyhow::bail!("Evidence storage path must not be empty");
        }

        if self.execution.max_output_bytes == 0 {
            anyhow::bail!("Output ceiling must be > 0 bytes");
        }
        if self.execution.history_capacity == 0 {
            anyhow::bail!("History capacity must be > 0");
        }

        if let Some(path) = &self.catalog.path {
            if path.trim().is_empty() {
                anyhow::bail!("Catalog path must not be empty when set");
            }
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }

    /// Executor settings derived from this configuration
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::with_evidence_root(&self.evidence.storage_path)
            .max_output_bytes(self.execution.max_output_bytes)
            .daemon_timeout_cap(self.execution.daemon_timeout_cap_secs)
            .merge_defaults(self.execution.merge_default_parameters)
    }
}
