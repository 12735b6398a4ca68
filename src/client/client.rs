//! High-level device client.
//!
//! Binds one [`SocketQueue`] to one device address. Every command goes through
//! the queue, so callers on any number of tasks can share a client and still
//! get one command in flight at a time.

use std::sync::Arc;
use std::time::Duration;

use super::config::ClientConfig;
use crate::core::Destination;
use crate::logging::{Logger, LoggerConfig};
use crate::transport::{
    Connector, NetConnector, QueueId, ResponseFuture, SendOptions, SocketQueue, SocketState,
    TimeoutPolicy,
};

/// A client for one networked device.
///
/// # Example
///
/// ```no_run
/// use plugwire::client::{ClientConfigBuilder, DeviceClient};
/// use plugwire::core::TransportKind;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfigBuilder::new()
///     .host("192.168.1.20")
///     .transport(TransportKind::Tcp)
///     .build()?;
/// let client = DeviceClient::connect(&config);
///
/// let info = client.send(br#"{"system":{"get_sysinfo":{}}}"#.to_vec()).await?;
///
/// // The device scans for 10 seconds before answering; wait 25 s.
/// let scan = br#"{"netif":{"get_scaninfo":{"refresh":1,"timeout":10}}}"#.to_vec();
/// let networks = client.send_timed(scan, 10).await?;
/// # let _ = (info, networks);
/// # Ok(())
/// # }
/// ```
pub struct DeviceClient<C: Connector> {
    queue: SocketQueue<C>,
    destination: Destination,
    policy: TimeoutPolicy,
}

impl DeviceClient<NetConnector> {
    /// Client over the configured transport, logging through `tracing` at
    /// the configured level.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(config: &ClientConfig) -> Self {
        let logger = LoggerConfig::new(config.log_level).build();
        Self::with_connector(NetConnector::for_kind(config.transport), config, logger)
    }
}

impl<C: Connector> DeviceClient<C> {
    /// Client over a specific connector and logger.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_connector(connector: C, config: &ClientConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            queue: SocketQueue::new(connector, config.queue_config(), logger),
            destination: config.destination(),
            policy: config.timeout_policy(),
        }
    }

    /// Device address.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Identity of the underlying socket.
    pub fn id(&self) -> QueueId {
        self.queue.id()
    }

    /// Underlying queue.
    pub fn queue(&self) -> &SocketQueue<C> {
        &self.queue
    }

    /// Current socket state.
    pub fn state(&self) -> SocketState {
        self.queue.state()
    }

    /// Send a command with the default timeout.
    pub fn send(&self, payload: C::Request) -> ResponseFuture<C::Response> {
        self.send_with(payload, SendOptions::default())
    }

    /// Send a command with per-call options.
    pub fn send_with(&self, payload: C::Request, options: SendOptions) -> ResponseFuture<C::Response> {
        self.queue.send(payload, self.destination.clone(), options)
    }

    /// Send a command the device will spend `expected_device_secs` seconds
    /// executing before it replies.
    pub fn send_timed(&self, payload: C::Request, expected_device_secs: u64) -> ResponseFuture<C::Response> {
        self.send_with(
            payload,
            SendOptions::with_timeout(self.timeout_for(None, expected_device_secs)),
        )
    }

    /// Timeout a variable-duration command would get. An explicit timeout is
    /// returned unchanged.
    pub fn timeout_for(&self, explicit: Option<Duration>, expected_device_secs: u64) -> Duration {
        self.policy.resolve(explicit, expected_device_secs)
    }

    /// Gracefully close the socket. The next command reopens it.
    pub async fn close(&self) {
        self.queue.close().await;
    }

    /// Abort the socket and fail every pending command.
    pub fn destroy(&self, reason: impl Into<String>) {
        self.queue.destroy(reason);
    }
}

impl<C: Connector> std::fmt::Debug for DeviceClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("destination", &self.destination)
            .field("queue", &self.queue)
            .finish()
    }
}
