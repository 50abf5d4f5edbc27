//! Configuration management for the sft CLI
//!
//! Configuration is stored in TOML format.
//!
//! # Configuration File Locations
//!
//! - Linux: `~/.config/sft/cli.toml`
//! - macOS: `~/Library/Application Support/sft/cli.toml`
//! - Windows: `%APPDATA%\sft\config\cli.toml`
//!
//! Command line flags take precedence over file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sft_core::DEFAULT_MAX_FILE_SIZE;
use sft_crypto::{KeyParams, SignatureAlgorithm};
use sft_transport::{ConnectPolicy, LengthCodec, DEFAULT_MAX_FRAME_SIZE};
use thiserror::Error;

use crate::output::OutputFormat;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// CLI configuration
///
/// # Example TOML
///
/// ```toml
/// [keys]
/// algorithm = "RSASSA-PKCS1-v1_5-SHA256"  # or "Ed25519"
/// rsa_modulus_bits = 2048
///
/// [transport]
/// relay_addr = "127.0.0.1:5000"
/// connect_attempts = 5
/// retry_delay_ms = 1000
/// max_frame_size = 100663296
///
/// [transfer]
/// max_file_size = 67108864
///
/// [output]
/// format = "table"  # "table" | "json" | "quiet"
///
/// [logging]
/// level = "warn"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub keys: KeysConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Key generation defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysConfig {
    #[serde(default)]
    pub algorithm: SignatureAlgorithm,

    /// RSA modulus length, ignored for Ed25519
    #[serde(default = "default_rsa_modulus_bits")]
    pub rsa_modulus_bits: usize,
}

fn default_rsa_modulus_bits() -> usize {
    KeyParams::default().rsa_modulus_bits
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::default(),
            rsa_modulus_bits: default_rsa_modulus_bits(),
        }
    }
}

/// Relay connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Relay address as `host:port`
    #[serde(default = "default_relay_addr")]
    pub relay_addr: String,

    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

fn default_relay_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_connect_attempts() -> u32 {
    ConnectPolicy::default().attempts
}

fn default_retry_delay_ms() -> u64 {
    ConnectPolicy::default().delay.as_millis() as u64
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            relay_addr: default_relay_addr(),
            connect_attempts: default_connect_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

/// Transfer limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Largest file `send` and `seal` will read
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format: "table", "json", "quiet"
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default)]
    pub verbose: bool,
}

fn default_format() -> String {
    "table".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            verbose: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from custom path or default
    pub fn load_from(custom_path: Option<&Path>) -> Result<Self, ConfigError> {
        match custom_path {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        }
    }

    /// Platform-specific default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "sft").map(|dirs| dirs.config_dir().join("cli.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.key_params()
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.output.format.parse::<OutputFormat>().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "Invalid output format '{}'. Valid values: {:?}",
                self.output.format,
                ["table", "json", "quiet"]
            )));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level '{}'. Valid values: {:?}",
                self.logging.level, valid_levels
            )));
        }

        if self.transport.relay_addr.trim().is_empty() {
            return Err(ConfigError::ValidationError("relay_addr must not be empty".to_string()));
        }
        if self.transport.connect_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "connect_attempts must be greater than 0".to_string(),
            ));
        }
        if self.transport.max_frame_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_frame_size must be greater than 0".to_string(),
            ));
        }
        if self.transfer.max_file_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_file_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn key_params(&self) -> KeyParams {
        KeyParams {
            algorithm: self.keys.algorithm,
            rsa_modulus_bits: self.keys.rsa_modulus_bits,
        }
    }

    pub fn connect_policy(&self) -> ConnectPolicy {
        ConnectPolicy {
            attempts: self.transport.connect_attempts,
            delay: Duration::from_millis(self.transport.retry_delay_ms),
        }
    }

    pub fn codec(&self) -> LengthCodec {
        LengthCodec::new(self.transport.max_frame_size)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output.format.parse().unwrap_or_default()
    }
}

/// CLI configuration overrides
///
/// Command-line arguments take precedence over config file values.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output_format: Option<OutputFormat>,
    pub verbose: Option<bool>,
    pub debug: Option<bool>,
    pub relay_addr: Option<String>,
}

impl Config {
    /// Apply CLI overrides to configuration
    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Self {
        if let Some(format) = overrides.output_format {
            self.output.format = format.to_string();
        }
        if let Some(verbose) = overrides.verbose {
            self.output.verbose = verbose;
            if verbose && self.logging.level != "debug" && self.logging.level != "trace" {
                self.logging.level = "info".to_string();
            }
        }
        if overrides.debug == Some(true) {
            self.logging.level = "debug".to_string();
        }
        if let Some(ref addr) = overrides.relay_addr {
            self.transport.relay_addr = addr.clone();
        }
        self
    }
}
