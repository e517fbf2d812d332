//! Broker configuration.
//!
//! Supports configuration from:
//! - TOML file (default: `mqboard.toml`, missing file tolerated)
//! - Environment variables with `MQBOARD__` prefix (double underscore for
//!   nesting)
//! - In-file variable substitution: `${VAR}` or `${VAR:-default}`
//!
//! Environment variable examples:
//! - `MQBOARD__SERVER__BIND=0.0.0.0:1884`
//! - `MQBOARD__MQTT__QOS_TIMEOUT_MS=2000`
//! - `MQBOARD__LOG__LEVEL=debug`

use std::net::SocketAddr;
use std::path::Path;

use config::{Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

// === Default Constants ===

/// Default maximum packet size (1MB).
pub const DEFAULT_MAX_PACKET_SIZE: u32 = 1024 * 1024;

/// Default QoS retransmission timeout in milliseconds.
pub const DEFAULT_QOS_TIMEOUT_MS: u64 = 5000;

/// Default retransmission budget before a session is closed.
pub const DEFAULT_MAX_QOS_RETRIES: u8 = 3;

/// Default number of records kept for the status message log.
pub const DEFAULT_MESSAGE_LOG_CAPACITY: usize = 50;

/// MQTT protocol maximum Remaining Length.
const MQTT_MAX_PACKET_SIZE: u32 = 268_435_455;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

// === Environment Variable Substitution ===

/// Substitute environment variables in a string.
/// Supports `${VAR}` and `${VAR:-default}` syntax.
fn substitute_env_vars(content: &str) -> String {
    let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").unwrap();
    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

// === Configuration Structures ===

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub log: LogConfig,
    /// MQTT listener configuration.
    pub server: ServerConfig,
    /// Status HTTP listener configuration.
    pub http: HttpConfig,
    /// Network identity echoed in the status snapshot.
    pub network: NetworkConfig,
    /// Limits configuration.
    pub limits: LimitsConfig,
    /// MQTT behavior configuration.
    pub mqtt: MqttConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// MQTT listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP bind address for the MQTT listener.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

fn default_bind() -> SocketAddr {
    "0.0.0.0:1883".parse().unwrap()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Status HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// TCP bind address for the status endpoint.
    #[serde(default = "default_http_bind")]
    pub bind: SocketAddr,
}

fn default_http_bind() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_http_bind(),
        }
    }
}

/// Network identity, reported verbatim by the status snapshot.
/// Link setup itself is outside the broker.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub ssid: String,
    pub ip: String,
}

/// Limits configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum MQTT packet size in bytes. Larger frames close the session.
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: u32,
}

fn default_max_packet_size() -> u32 {
    DEFAULT_MAX_PACKET_SIZE
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }
}

/// MQTT behavior configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Retransmission timeout for unacknowledged QoS 1/2 messages.
    #[serde(default = "default_qos_timeout_ms")]
    pub qos_timeout_ms: u64,

    /// Retransmissions allowed before the session is closed.
    #[serde(default = "default_max_qos_retries")]
    pub max_qos_retries: u8,

    /// Records kept in the status message log.
    #[serde(default = "default_message_log_capacity")]
    pub message_log_capacity: usize,
}

fn default_qos_timeout_ms() -> u64 {
    DEFAULT_QOS_TIMEOUT_MS
}

fn default_max_qos_retries() -> u8 {
    DEFAULT_MAX_QOS_RETRIES
}

fn default_message_log_capacity() -> usize {
    DEFAULT_MESSAGE_LOG_CAPACITY
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            qos_timeout_ms: DEFAULT_QOS_TIMEOUT_MS,
            max_qos_retries: DEFAULT_MAX_QOS_RETRIES,
            message_log_capacity: DEFAULT_MESSAGE_LOG_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file layered with `MQBOARD__`
    /// environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        // Load from file with env var substitution
        let path = path.as_ref();
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    let substituted = substitute_env_vars(&content);
                    builder = builder.add_source(File::from_str(&substituted, FileFormat::Toml));
                }
                Err(e) => return Err(ConfigError::Io(e)),
            }
        }

        // Override with environment variables (MQBOARD__SERVER__BIND, etc.)
        let cfg = builder
            .add_source(
                Environment::with_prefix("MQBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let substituted = substitute_env_vars(content);
        let config: Config = toml::from_str(&substituted)
            .map_err(|e| ConfigError::Validation(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // MQTT protocol maximum is 268,435,455 bytes
        if self.limits.max_packet_size > MQTT_MAX_PACKET_SIZE {
            return Err(ConfigError::Validation(
                "max_packet_size cannot exceed MQTT protocol maximum (268,435,455)".into(),
            ));
        }

        if self.mqtt.qos_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "qos_timeout_ms must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

// === Tests ===
