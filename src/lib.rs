//! # plugwire
//!
//! Client-side transport for request/response commands to networked embedded
//! devices (smart plugs, bulbs, power strips) over UDP or TCP.
//!
//! - **Single flight**: commands from any number of tasks are queued and sent
//!   one at a time over one socket, completing in the order they were sent
//! - **Fail safe**: a transport error or timeout closes the socket so a late
//!   response can never be read as the answer to the next command
//! - **Adaptive timeouts**: commands that keep the device busy for a known
//!   time get a wait budget derived from that time
//! - **Injected logging**: the queue logs through a [`Logger`](logging::Logger)
//!   capability it is handed, never one it picks
//!
//! ## Feature Flags
//!
//! - `transport` (default): socket queue, timeout policy, UDP/TCP connectors
//! - `client` (default): [`DeviceClient`](client::DeviceClient) and its configuration
//! - `subscriber`: `tracing-subscriber` initialisation helper
//!
//! ## Modules
//!
//! - [`core`]: constants, addressing, and error types (always included)
//! - [`logging`]: the logging capability (always included)
//! - [`transport`]: socket queue and connectors (requires `transport` feature)
//! - [`client`]: device client (requires `client` feature)
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use plugwire::prelude::*;
//!
//! # async fn run() -> Result<(), PlugwireError> {
//! let logger = LoggerConfig::new(LogLevel::Debug).build();
//! let queue = Arc::new(SocketQueue::new(
//!     TcpConnector::new(),
//!     QueueConfig::default(),
//!     logger,
//! ));
//! let plug = Destination::with_default_port("192.168.1.20");
//!
//! // Both commands are queued immediately and sent one after the other.
//! let on = queue.send(b"relay on".to_vec(), plug.clone(), SendOptions::default());
//! let info = queue.send(b"sysinfo".to_vec(), plug.clone(), SendOptions::default());
//! let (on, info) = (on.await?, info.await?);
//! # let _ = (on, info);
//!
//! queue.close().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Logging capability (always included)
pub mod logging;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;
    pub use crate::logging::{LogLevel, Logger, LoggerConfig};

    #[cfg(feature = "transport")]
    pub use crate::transport::{
        Connector, NetConnector, QueueConfig, QueueError, QueueResult, SendOptions, SocketQueue,
        SocketState, TcpConnector, TimeoutPolicy, UdpConnector,
    };

    #[cfg(feature = "client")]
    pub use crate::client::{ClientConfig, ClientConfigBuilder, DeviceClient};
}

// Re-export commonly used items at crate root
pub use crate::core::{ConfigError, Destination, PlugwireError, TransportKind};

#[cfg(feature = "transport")]
pub use transport::{QueueError, SocketQueue, SocketState, TimeoutPolicy};
