//! Configuration management for nodexport
//!
//! This module handles loading, parsing, and managing configuration from:
//! - Configuration files (TOML format)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::export::{DEFAULT_PAGE_SIZE, ExportOptions, ExportScope, unescape_delimiter};
use crate::store::ColumnKey;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Export defaults
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node store connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database holding the nodes
    #[serde(default = "default_database")]
    pub database: String,

    /// Collection holding the nodes
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Default export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Field delimiter; escapes like `\t` are allowed
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Write a UTF-8 byte order mark
    #[serde(default = "default_true")]
    pub byte_order_mark: bool,

    /// Replace line breaks inside cells with spaces
    #[serde(default = "default_true")]
    pub strip_line_breaks: bool,

    /// Nodes fetched per page when exporting everything
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Custom columns extracted from node responses
    #[serde(default)]
    pub custom_columns: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "facepager".to_string()
}

fn default_collection() -> String {
    "nodes".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_delimiter() -> String {
    ";".to_string()
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            collection: default_collection(),
            timeout: default_timeout(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            byte_order_mark: true,
            strip_line_breaks: true,
            page_size: default_page_size(),
            custom_columns: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: true,
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Load configuration, using defaults when the file does not exist
    ///
    /// # Arguments
    /// * `path` - Explicit path, or `None` for [`Config::default_path`]
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nodexport")
            .join("config.toml")
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error naming the first bad field otherwise
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, value: String| -> Result<()> {
            Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value,
            }
            .into())
        };

        if self.connection.uri.trim().is_empty() {
            return invalid("connection.uri", self.connection.uri.clone());
        }
        if self.connection.database.trim().is_empty() {
            return invalid("connection.database", self.connection.database.clone());
        }
        if self.connection.collection.trim().is_empty() {
            return invalid("connection.collection", self.connection.collection.clone());
        }
        if self.connection.timeout == 0 {
            return invalid("connection.timeout", "0".to_string());
        }
        if self.export.page_size == 0 {
            return invalid("export.page_size", "0".to_string());
        }
        if unescape_delimiter(&self.export.delimiter).is_err() {
            return invalid("export.delimiter", self.export.delimiter.clone());
        }
        ColumnKey::parse_all(&self.export.custom_columns)?;

        Ok(())
    }

    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout)
    }
}

impl ExportConfig {
    /// Build export options for the given scope
    pub fn to_options(&self, scope: ExportScope) -> ExportOptions {
        ExportOptions {
            use_byte_order_mark: self.byte_order_mark,
            strip_line_breaks: self.strip_line_breaks,
            delimiter: self.delimiter.clone(),
            scope,
        }
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
