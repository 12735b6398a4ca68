//! Client configuration.
//!
//! Sources, later overriding earlier:
//! 1. [`ClientConfig::default`]
//! 2. a JSON document ([`ClientConfig::from_json`])
//! 3. environment variables ([`ClientConfig::apply_env`])
//!
//! Environment variables:
//! - `PLUGWIRE_HOST`: device hostname or IP
//! - `PLUGWIRE_PORT`: device port (default 9999)
//! - `PLUGWIRE_TRANSPORT`: `udp` or `tcp`
//! - `PLUGWIRE_TIMEOUT_MS`: default per-command timeout
//! - `PLUGWIRE_IDLE_TIMEOUT_MS`: close the socket after this much idle time
//! - `PLUGWIRE_LOG_LEVEL`: trace|debug|info|warn|error|silent

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::constants::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT_MS};
use crate::core::{ConfigError, Destination, TransportKind};
use crate::logging::LogLevel;
use crate::transport::{QueueConfig, TimeoutPolicy};

/// Device client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Device hostname or IP address.
    pub host: String,

    /// Device port.
    pub port: u16,

    /// Transport used for commands.
    pub transport: TransportKind,

    /// Timeout for commands sent without an explicit one, and the baseline
    /// for variable-duration commands.
    pub default_timeout_ms: u64,

    /// Close the shared socket after this long without commands.
    pub idle_timeout_ms: Option<u64>,

    /// Minimum level logged.
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            transport: TransportKind::Tcp,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            idle_timeout_ms: None,
            log_level: LogLevel::default(),
        }
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

impl ClientConfig {
    /// Parse and validate a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `PLUGWIRE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from a variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PLUGWIRE_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PLUGWIRE_PORT") {
            self.port = parse_number("PLUGWIRE_PORT", &port)?;
        }
        if let Some(transport) = lookup("PLUGWIRE_TRANSPORT") {
            self.transport = transport.parse()?;
        }
        if let Some(timeout) = lookup("PLUGWIRE_TIMEOUT_MS") {
            self.default_timeout_ms = parse_number("PLUGWIRE_TIMEOUT_MS", &timeout)?;
        }
        if let Some(idle) = lookup("PLUGWIRE_IDLE_TIMEOUT_MS") {
            self.idle_timeout_ms = Some(parse_number("PLUGWIRE_IDLE_TIMEOUT_MS", &idle)?);
        }
        if let Some(level) = lookup("PLUGWIRE_LOG_LEVEL") {
            self.log_level = level.parse()?;
        }
        self.validate()
    }

    /// Reject values the transport cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "host",
                value: self.host.clone(),
            });
        }
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "default_timeout_ms",
                value: "0".into(),
            });
        }
        if self.idle_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "idle_timeout_ms",
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Device address.
    pub fn destination(&self) -> Destination {
        Destination::new(self.host.clone(), self.port)
    }

    /// Default per-command timeout.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Queue settings derived from this configuration.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            default_timeout: self.default_timeout(),
            idle_timeout: self.idle_timeout_ms.map(Duration::from_millis),
        }
    }

    /// Timeout policy using the configured default as baseline.
    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::with_baseline(Some(self.default_timeout()))
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the device port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the transport.
    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.config.transport = transport;
        self
    }

    /// Set the default per-command timeout.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Close the socket after this much idle time.
    pub fn idle_timeout(mut self, idle: Duration) -> Self {
        self.config.idle_timeout_ms = Some(u64::try_from(idle.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Set the log level.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
