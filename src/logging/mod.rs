//! Leveled logging capability.
//!
//! The transport never picks a logging backend. It is handed an
//! `Arc<dyn Logger>` at construction and emits records through it; whether a
//! record is kept is the logger's decision.
//!
//! Built-in implementations:
//!
//! - [`TracingLogger`]: forwards to the `tracing` macros
//! - [`LevelFilter`]: drops records below a minimum level, wrapping any logger
//! - [`SilentLogger`]: discards everything
//!
//! [`LoggerConfig`] selects between the built-in backend and a caller-supplied
//! sink once, at startup.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::ConfigError;

/// Log target used for every record emitted by this crate.
pub const LOG_TARGET: &str = "plugwire";

/// Severity of a log record, or `Silent` to discard everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Very fine-grained detail (payload contents).
    Trace,
    /// Diagnostic detail (socket lifecycle, send attempts).
    Debug,
    /// Normal operation.
    Info,
    /// Recoverable problems.
    #[default]
    Warn,
    /// Failures.
    Error,
    /// Record nothing. Only meaningful as a filter threshold.
    Silent,
}

impl LogLevel {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" | "off" => Ok(LogLevel::Silent),
            other => Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
    }
}

/// A leveled logging sink.
///
/// Implementors provide [`log`](Logger::log); the per-level methods forward to
/// it. Records are passed as [`fmt::Arguments`] so nothing is formatted unless
/// the sink keeps the record.
pub trait Logger: Send + Sync {
    /// Record a message at the given level. `level` is never `Silent`.
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>);

    /// Record at trace level.
    fn trace(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Trace, args);
    }

    /// Record at debug level.
    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Debug, args);
    }

    /// Record at info level.
    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Info, args);
    }

    /// Record at warn level.
    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Warn, args);
    }

    /// Record at error level.
    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Error, args);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        (**self).log(level, args);
    }
}

/// Forwards records to the `tracing` macros under [`LOG_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        match level {
            LogLevel::Trace => tracing::trace!(target: LOG_TARGET, "{}", args),
            LogLevel::Debug => tracing::debug!(target: LOG_TARGET, "{}", args),
            LogLevel::Info => tracing::info!(target: LOG_TARGET, "{}", args),
            LogLevel::Warn => tracing::warn!(target: LOG_TARGET, "{}", args),
            LogLevel::Error => tracing::error!(target: LOG_TARGET, "{}", args),
            LogLevel::Silent => {}
        }
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentLogger;

impl Logger for SilentLogger {
    fn log(&self, _level: LogLevel, _args: fmt::Arguments<'_>) {}
}

/// Drops records below `min` before handing the rest to `inner`.
#[derive(Debug, Clone)]
pub struct LevelFilter<L> {
    min: LogLevel,
    inner: L,
}

impl<L: Logger> LevelFilter<L> {
    /// Wrap `inner`, keeping records at `min` or above.
    pub fn new(min: LogLevel, inner: L) -> Self {
        Self { min, inner }
    }

    /// Current threshold.
    pub fn level(&self) -> LogLevel {
        self.min
    }

    /// Whether a record at `level` would be kept.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Silent && level >= self.min
    }
}

impl<L: Logger> Logger for LevelFilter<L> {
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        if self.enabled(level) {
            self.inner.log(level, args);
        }
    }
}

/// Startup-time logging selection.
#[derive(Clone, Default)]
pub struct LoggerConfig {
    /// Minimum level kept.
    pub level: LogLevel,
    /// Caller-supplied sink. `None` uses [`TracingLogger`].
    pub sink: Option<Arc<dyn Logger>>,
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfig")
            .field("level", &self.level)
            .field("sink", &self.sink.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl LoggerConfig {
    /// Built-in backend at the given level.
    pub fn new(level: LogLevel) -> Self {
        Self { level, sink: None }
    }

    /// Forward to a caller-supplied sink.
    pub fn with_sink(mut self, sink: Arc<dyn Logger>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the capability to hand to a queue.
    pub fn build(self) -> Arc<dyn Logger> {
        if self.level == LogLevel::Silent {
            return Arc::new(SilentLogger);
        }
        match self.sink {
            Some(sink) => Arc::new(LevelFilter::new(self.level, sink)),
            None => Arc::new(LevelFilter::new(self.level, TracingLogger)),
        }
    }
}

/// Install a global `tracing-subscriber` fmt subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set. Returns `false` if a
/// global subscriber was already installed.
#[cfg(feature = "subscriber")]
#[cfg_attr(docsrs, doc(cfg(feature = "subscriber")))]
pub fn init_subscriber(level: LogLevel) -> bool {
    use tracing_subscriber::EnvFilter;

    let default_directive = match level {
        LogLevel::Silent => "off".to_string(),
        other => format!("{}={}", LOG_TARGET, other.as_str()),
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// Captures records in memory for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingLogger {
        records: Mutex<Vec<(LogLevel, String)>>,
    }

    impl RecordingLogger {
        pub fn records(&self) -> Vec<(LogLevel, String)> {
            self.records.lock().clone()
        }

        pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
            self.records()
                .iter()
                .any(|(l, msg)| *l == level && msg.contains(needle))
        }
    }

    impl Logger for RecordingLogger {
        fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
            self.records.lock().push((level, args.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingLogger;
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("off".parse::<LogLevel>().unwrap(), LogLevel::Silent);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Error < LogLevel::Silent);
    }

    #[test]
    fn test_per_level_methods_forward() {
        let logger = RecordingLogger::default();
        logger.trace(format_args!("t"));
        logger.debug(format_args!("d"));
        logger.info(format_args!("i"));
        logger.warn(format_args!("w"));
        logger.error(format_args!("e {}", 1));

        let levels: Vec<_> = logger.records().into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            levels,
            vec![
                LogLevel::Trace,
                LogLevel::Debug,
                LogLevel::Info,
                LogLevel::Warn,
                LogLevel::Error
            ]
        );
        assert!(logger.contains(LogLevel::Error, "e 1"));
    }

    #[test]
    fn test_filter_drops_below_threshold() {
        let sink = Arc::new(RecordingLogger::default());
        let filter = LevelFilter::new(LogLevel::Warn, sink.clone());

        filter.debug(format_args!("hidden"));
        filter.warn(format_args!("shown"));
        filter.error(format_args!("also shown"));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], (LogLevel::Warn, "shown".to_string()));
    }

    #[test]
    fn test_config_routes_to_custom_sink() {
        let sink = Arc::new(RecordingLogger::default());
        let logger = LoggerConfig::new(LogLevel::Debug)
            .with_sink(sink.clone())
            .build();

        logger.trace(format_args!("too fine"));
        logger.debug(format_args!("kept"));

        assert_eq!(sink.records(), vec![(LogLevel::Debug, "kept".to_string())]);
    }

    #[test]
    fn test_silent_config_discards_everything() {
        let sink = Arc::new(RecordingLogger::default());
        let logger = LoggerConfig::new(LogLevel::Silent)
            .with_sink(sink.clone())
            .build();

        logger.error(format_args!("dropped"));
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_level_serde() {
        let level: LogLevel = serde_json::from_str("\"info\"").unwrap();
        assert_eq!(level, LogLevel::Info);
    }
}
