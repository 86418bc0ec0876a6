//! Server configuration.
//!
//! Configuration can be loaded from:
//! - A TOML file passed with `--config`
//! - `huddle.toml`, `/etc/huddle/huddle.toml` or `~/.config/huddle/huddle.toml`
//! - Environment variables (HUDDLE_HOST, HUDDLE_PORT) when no file is found

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name, reported by the health endpoint.
    #[serde(default = "default_name")]
    pub name: String,

    /// Deployment environment label (e.g. "local", "production").
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Transport configuration.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Heartbeat configuration.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Path for the WebSocket endpoint.
    #[serde(default = "default_ws_path")]
    pub websocket_path: String,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of connected users.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Outbound queue capacity per user.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long a send may wait on a full recipient queue (0 = never wait).
    #[serde(default = "default_enqueue_timeout")]
    pub enqueue_timeout_ms: u64,

    /// Maximum message body size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Heartbeat configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Heartbeat interval advertised to clients, in milliseconds.
    #[serde(default = "default_heartbeat_interval")]
    pub interval_ms: u64,

    /// Idle time after which a silent session is closed, in milliseconds.
    #[serde(default = "default_heartbeat_timeout")]
    pub timeout_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_name() -> String {
    "huddle".to_string()
}

fn default_environment() -> String {
    std::env::var("HUDDLE_ENVIRONMENT").unwrap_or_else(|_| "local".to_string())
}

fn default_host() -> String {
    std::env::var("HUDDLE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("HUDDLE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080)
}

fn default_true() -> bool {
    true
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_max_connections() -> usize {
    100_000
}

fn default_queue_capacity() -> usize {
    100
}

fn default_enqueue_timeout() -> u64 {
    100
}

fn default_max_message_size() -> usize {
    16 * 1024
}

fn default_heartbeat_interval() -> u64 {
    30_000
}

fn default_heartbeat_timeout() -> u64 {
    90_000
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            environment: default_environment(),
            host: default_host(),
            port: default_port(),
            transport: TransportConfig::default(),
            limits: LimitsConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            websocket_path: default_ws_path(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            queue_capacity: default_queue_capacity(),
            enqueue_timeout_ms: default_enqueue_timeout(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_heartbeat_interval(),
            timeout_ms: default_heartbeat_timeout(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl LimitsConfig {
    /// Enqueue wait as a duration.
    #[must_use]
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }
}

impl HeartbeatConfig {
    /// Idle timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from an explicit path, the default paths, or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let config_paths = [
            "huddle.toml",
            "/etc/huddle/huddle.toml",
            "~/.config/huddle/huddle.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.name, "huddle");
        assert_eq!(config.transport.websocket_path, "/ws");
        assert_eq!(config.limits.queue_capacity, 100);
        assert_eq!(config.limits.enqueue_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "0.0.0.0"
            port = 9000
            environment = "staging"

            [limits]
            queue_capacity = 16
            enqueue_timeout_ms = 0
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.environment, "staging");
        assert_eq!(config.limits.queue_capacity, 16);
        assert!(config.limits.enqueue_timeout().is_zero());
        assert_eq!(config.limits.max_message_size, 16 * 1024);
        assert_eq!(config.bind_addr().unwrap().port(), 9000);
    }

    #[test]
    fn test_bad_bind_addr() {
        let config: Config = toml::from_str(r#"host = "not a host""#).unwrap();
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::from_file("/nonexistent/huddle.toml").is_err());
    }
}
