//! Fixed defaults used when the caller does not configure a value.

use std::time::Duration;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Baseline network allowance for one request/response round trip.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// [`DEFAULT_TIMEOUT_MS`] as a [`Duration`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(DEFAULT_TIMEOUT_MS);

/// Multiplier applied to the device-reported duration of a long-running
/// command. Devices retry and settle internally, so the observed wall time is
/// roughly twice what they report.
pub const DEVICE_DURATION_FACTOR: u64 = 2;

// =============================================================================
// ADDRESSING
// =============================================================================

/// Port smart plugs and bulbs listen on for both UDP and TCP commands.
pub const DEFAULT_PORT: u16 = 9999;

/// Default host when none is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

// =============================================================================
// FRAMING
// =============================================================================

/// Size of the big-endian length header prefixed to every TCP message.
pub const TCP_HEADER_SIZE: usize = 4;

/// Largest TCP response accepted before the connection is considered corrupt.
pub const MAX_TCP_FRAME: usize = 1024 * 1024;

/// Receive buffer for a single UDP datagram.
pub const UDP_RECV_BUFFER_SIZE: usize = 65535;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_matches_ms() {
        assert_eq!(DEFAULT_TIMEOUT.as_millis() as u64, DEFAULT_TIMEOUT_MS);
    }
}
