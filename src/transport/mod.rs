//! plugwire - Transport Layer
//!
//! This module serializes request/response commands onto a single socket:
//!
//! - **Socket queue**: [`SocketQueue`] with at-most-one command in flight,
//!   strict FIFO completion, lazy socket creation, and teardown on error
//! - **Socket lifecycle**: [`SocketState`] (`Unbound`, `Bound`, `Destroyed`)
//! - **Timeout policy**: [`TimeoutPolicy`] for commands whose device-side
//!   duration varies
//! - **Connectors**: the [`Connector`] capability, with tokio-backed
//!   [`UdpConnector`] and [`TcpConnector`], and [`NetConnector`] to pick one
//!   at runtime
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │    callers (device client, commands)    │
//! ├─────────────────────────────────────────┤
//! │   SocketQueue: FIFO, single-flight,     │  ← This module
//! │   timeouts, teardown on error           │
//! ├─────────────────────────────────────────┤
//! │   Connector: create / write_and_await / │
//! │   teardown / force_teardown             │
//! ├─────────────────────────────────────────┤
//! │              UDP | TCP                  │
//! └─────────────────────────────────────────┘
//! ```

mod connector;
mod error;
mod net;
mod socket;
mod state;
pub mod tcp;
mod timing;
pub mod udp;

#[cfg(test)]
pub(crate) mod testing;

pub use connector::Connector;
pub use error::*;
pub use net::{NetConnector, NetHandle};
pub use socket::{QueueConfig, QueueConfigBuilder, ResponseFuture, SendOptions, SocketQueue};
pub use state::{QueueId, SocketState};
pub use tcp::{TcpConnector, TcpHandle};
pub use timing::{constants as timing_constants, effective_timeout_ms, TimeoutPolicy};
pub use udp::{UdpConnector, UdpHandle};
