//! Configuration loading for courierd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.courier/config.toml` (user)
//! 3. `/etc/courier/config.toml` (system)
//! 4. Built-in defaults
//!
//! Every field has a default, so a file only needs the values it changes.

use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CourierError, Result};

/// Server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:8081).
    #[serde(default = "default_address")]
    pub address: String,
    /// Deadline for the TLS handshake and the request line (default: 5000).
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_read_timeout() -> u64 {
    5000
}

/// Certificate and key presented by the listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TlsConfig {
    /// PEM certificate chain (default: lb.crt).
    #[serde(default = "default_cert_path")]
    pub cert_path: PathBuf,
    /// PEM private key (default: lb.key).
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: default_cert_path(),
            key_path: default_key_path(),
        }
    }
}

fn default_cert_path() -> PathBuf {
    PathBuf::from("lb.crt")
}

fn default_key_path() -> PathBuf {
    PathBuf::from("lb.key")
}

/// Liveness reporting to the load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeartbeatConfig {
    /// Whether to report at all (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Heartbeat address of the load balancer (default: 127.0.0.1:8080).
    #[serde(default = "default_load_balancer")]
    pub load_balancer: String,
    /// Address announced to the load balancer. Defaults to the bound address,
    /// with an unspecified IP replaced by loopback.
    #[serde(default)]
    pub advertise: Option<String>,
    /// Time between reports (default: 1000).
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    /// Deadline for a single report (default: 500).
    #[serde(default = "default_report_timeout")]
    pub timeout_ms: u64,
    /// Consecutive failures before the load balancer is declared down (default: 3).
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            load_balancer: default_load_balancer(),
            advertise: None,
            interval_ms: default_interval(),
            timeout_ms: default_report_timeout(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_load_balancer() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_interval() -> u64 {
    1000
}

fn default_report_timeout() -> u64 {
    500
}

fn default_failure_threshold() -> u32 {
    3
}

/// Shutdown behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LifecycleConfig {
    /// How long in-flight connections get to finish (default: 1000).
    #[serde(default = "default_grace_period")]
    pub grace_period_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period(),
        }
    }
}

fn default_grace_period() -> u64 {
    1000
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided, must exist)
    /// 2. `~/.courier/config.toml`
    /// 3. `/etc/courier/config.toml`
    /// 4. Built-in defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CourierError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            CourierError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path; `None` means use defaults.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(CourierError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".courier").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/courier/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Replace the port of the listen address, keeping its host.
    pub fn with_port(mut self, port: u16) -> Self {
        let host = match self.server.address.rsplit_once(':') {
            Some((host, _)) => host.to_string(),
            None => self.server.address.clone(),
        };
        self.server.address = format!("{host}:{port}");
        self
    }

    /// Parsed listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server.address.parse().map_err(|e| {
            CourierError::Configuration(format!(
                "invalid listen address {:?}: {e}",
                self.server.address
            ))
        })
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.server.read_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat.interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat.timeout_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.lifecycle.grace_period_ms)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if self.server.read_timeout_ms == 0 {
            return Err(CourierError::Configuration(
                "server.read_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat.enabled {
            if self.heartbeat.interval_ms == 0 {
                return Err(CourierError::Configuration(
                    "heartbeat.interval_ms must be greater than zero".to_string(),
                ));
            }
            if self.heartbeat.failure_threshold == 0 {
                return Err(CourierError::Configuration(
                    "heartbeat.failure_threshold must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}
