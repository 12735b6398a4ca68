//! The I/O capability a [`SocketQueue`](super::SocketQueue) drives.

use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use crate::core::{Destination, TransportKind};

/// Creates, uses, and tears down one kind of socket.
///
/// The queue guarantees that at most one method taking a handle runs at a
/// time, so implementations need no internal locking around the handle.
pub trait Connector: Send + Sync + 'static {
    /// Live socket handle.
    type Handle: Send + 'static;
    /// Opaque command payload.
    type Request: fmt::Debug + Send + Sync + 'static;
    /// Opaque response payload.
    type Response: Send + 'static;

    /// Transport kind of the handles this connector produces.
    fn kind(&self) -> TransportKind;

    /// Create a new handle for talking to `destination`.
    fn create(
        &self,
        destination: &Destination,
    ) -> impl Future<Output = io::Result<Self::Handle>> + Send;

    /// Write `request` and wait for its response.
    ///
    /// `timeout` is the entry's whole budget. The queue enforces it from the
    /// moment the entry became active, socket creation included; it is passed
    /// through for implementations that also set socket-level limits.
    fn write_and_await(
        &self,
        handle: &mut Self::Handle,
        request: &Self::Request,
        destination: &Destination,
        timeout: Duration,
    ) -> impl Future<Output = io::Result<Self::Response>> + Send;

    /// Graceful close. The handle is gone either way; an error only reports
    /// that the peer may not have seen an orderly shutdown.
    fn teardown(&self, handle: Self::Handle) -> impl Future<Output = io::Result<()>> + Send;

    /// Abortive close. Must not block.
    fn force_teardown(&self, handle: Self::Handle, reason: &str);
}
