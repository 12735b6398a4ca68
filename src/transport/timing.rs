//! Wait budgets for commands whose device-side duration varies.
//!
//! Some commands (a wireless network scan, for instance) ask the device to
//! work for a caller-chosen number of seconds before replying. The wait budget
//! for such a command is
//!
//! ```text
//! budget_ms = expected_device_seconds * 1000 * 2 + baseline_ms
//! ```
//!
//! Every call site that issues a variable-duration command goes through
//! [`TimeoutPolicy`] instead of repeating the arithmetic.

use std::time::Duration;

/// Timing constants.
pub mod constants {
    pub use crate::core::constants::{DEFAULT_TIMEOUT, DEFAULT_TIMEOUT_MS, DEVICE_DURATION_FACTOR};
}

/// Compute the wait budget in milliseconds.
///
/// `baseline_ms` falls back to [`DEFAULT_TIMEOUT_MS`](constants::DEFAULT_TIMEOUT_MS)
/// when `None`. Saturates instead of overflowing.
pub fn effective_timeout_ms(expected_device_secs: u64, baseline_ms: Option<u64>) -> u64 {
    let baseline = baseline_ms.unwrap_or(constants::DEFAULT_TIMEOUT_MS);
    expected_device_secs
        .saturating_mul(1000)
        .saturating_mul(constants::DEVICE_DURATION_FACTOR)
        .saturating_add(baseline)
}

/// Timeout calculation bound to a baseline network allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    baseline: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeoutPolicy {
    /// Policy with the default 5000 ms baseline.
    pub fn new() -> Self {
        Self {
            baseline: constants::DEFAULT_TIMEOUT,
        }
    }

    /// Policy with a caller-configured baseline. `None` keeps the default.
    pub fn with_baseline(baseline: Option<Duration>) -> Self {
        Self {
            baseline: baseline.unwrap_or(constants::DEFAULT_TIMEOUT),
        }
    }

    /// Baseline network allowance.
    pub fn baseline(&self) -> Duration {
        self.baseline
    }

    /// Wait budget for a command the device reports will take
    /// `expected_device_secs` seconds.
    pub fn budget(&self, expected_device_secs: u64) -> Duration {
        let baseline_ms = u64::try_from(self.baseline.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(effective_timeout_ms(expected_device_secs, Some(baseline_ms)))
    }

    /// An explicit timeout always wins; the formula is only consulted
    /// without one.
    pub fn resolve(&self, explicit: Option<Duration>, expected_device_secs: u64) -> Duration {
        explicit.unwrap_or_else(|| self.budget(expected_device_secs))
    }
}
