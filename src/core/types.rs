//! Addressing and transport selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::constants::DEFAULT_PORT;
use super::error::ConfigError;

/// Which kind of socket a connector produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Connectionless datagrams; one datagram per request and response.
    Udp,
    /// Connection-oriented stream with length-prefixed messages.
    #[default]
    Tcp,
}

impl TransportKind {
    /// Lowercase name, as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Udp => "udp",
            TransportKind::Tcp => "tcp",
        }
    }

    /// Whether the transport keeps a connection open between sends.
    pub fn is_connection_oriented(&self) -> bool {
        matches!(self, TransportKind::Tcp)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(TransportKind::Udp),
            "tcp" => Ok(TransportKind::Tcp),
            other => Err(ConfigError::InvalidTransport(other.to_string())),
        }
    }
}

/// Remote host and port a command is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    /// Hostname or IP address.
    pub host: String,
    /// Port number.
    pub port: u16,
}

impl Destination {
    /// Create a destination.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Destination on the default device port.
    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_PORT)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
