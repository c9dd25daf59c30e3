//! Configuration management for the bridge
//!
//! Settings come from an optional YAML file, overridden by environment
//! variables such as `SOLAREDGE__HUB__SCAN_INTERVAL_SECS=10`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "SOLAREDGE_CONFIG";
const ENV_PREFIX: &str = "SOLAREDGE";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inverter connection and polling
    pub hub: HubConfig,
    /// MQTT broker configuration
    pub mqtt: MqttConfig,
    /// HTTP API configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Name used in MQTT topics and API responses
    pub name: String,
    /// Seconds between decode passes
    pub scan_interval_secs: u64,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    pub connection: ConnectionConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: "solaredge".to_string(),
            scan_interval_secs: 30,
            timeout_ms: 3000,
            connection: ConnectionConfig::Tcp(TcpConnection::default()),
        }
    }
}

impl HubConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionConfig {
    Tcp(TcpConnection),
    Rtu(RtuConnection),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConnection {
    /// Host name or address
    pub host: String,
    /// Port (default: 1502)
    #[serde(default = "default_tcp_port")]
    pub port: u16,
    /// Modbus unit ID
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
}

impl Default for TcpConnection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_tcp_port(),
            unit_id: default_unit_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtuConnection {
    /// Serial port path (e.g., /dev/ttyUSB0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Stop bits
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Parity: "none", "even", "odd"
    #[serde(default = "default_parity")]
    pub parity: String,
    /// Modbus unit ID
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
}

fn default_tcp_port() -> u16 {
    1502
}

fn default_unit_id() -> u8 {
    1
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_parity() -> String {
    "none".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub enabled: bool,
    /// MQTT broker host
    pub host: String,
    /// MQTT broker port
    pub port: u16,
    /// Client ID
    pub client_id: String,
    /// Topic prefix
    pub topic_prefix: String,
    /// QoS level (0, 1, or 2)
    pub qos: u8,
    /// Retain published values
    pub retain: bool,
    /// Username (optional)
    pub username: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 1883,
            client_id: "solaredge-bridge".to_string(),
            topic_prefix: "solaredge".to_string(),
            qos: 1,
            retain: false,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    /// HTTP API host
    pub host: String,
    /// HTTP API port
    pub port: u16,
    /// Enable metrics endpoint
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 3000,
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Reject settings the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.hub.scan_interval_secs == 0 {
            bail!("hub.scan_interval_secs must be greater than 0");
        }
        if self.hub.timeout_ms == 0 {
            bail!("hub.timeout_ms must be greater than 0");
        }
        if self.mqtt.qos > 2 {
            bail!("mqtt.qos must be 0, 1 or 2 (got {})", self.mqtt.qos);
        }
        Ok(())
    }
}

/// Build the layered configuration from an optional file plus the environment
pub fn load_from(path: &Path) -> Result<Config> {
    let settings = config::Config::builder()
        .add_source(
            config::File::from(path)
                .format(config::FileFormat::Yaml)
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = settings
        .try_deserialize()
        .with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Load configuration from file or use defaults
pub fn load_config() -> Result<Config> {
    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.yaml".to_string());
    let path = Path::new(&config_path);

    if !path.exists() {
        tracing::warn!("Config file {} not found, using defaults", config_path);
    }

    load_from(path)
}
