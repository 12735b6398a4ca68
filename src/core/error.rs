//! Error types for configuration and the crate as a whole.

use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown log level name.
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    /// Unknown transport name.
    #[error("invalid transport: {0} (expected udp or tcp)")]
    InvalidTransport(String),

    /// A numeric value could not be parsed or was out of range.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Configuration key.
        key: &'static str,
        /// Offending value.
        value: String,
    },

    /// Malformed JSON configuration document.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level plugwire errors.
#[derive(Debug, Error)]
pub enum PlugwireError {
    /// Queue or transport error.
    #[cfg(feature = "transport")]
    #[error("queue error: {0}")]
    Queue(#[from] crate::transport::QueueError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
