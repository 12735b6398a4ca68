//! Connector chosen at runtime from a [`TransportKind`].

use std::io;
use std::time::Duration;

use super::connector::Connector;
use super::tcp::{TcpConnector, TcpHandle};
use super::udp::{UdpConnector, UdpHandle};
use crate::core::{Destination, TransportKind};

/// Either a UDP or a TCP connector.
#[derive(Debug, Clone)]
pub enum NetConnector {
    /// Datagram transport.
    Udp(UdpConnector),
    /// Stream transport.
    Tcp(TcpConnector),
}

impl NetConnector {
    /// Default connector for `kind`.
    pub fn for_kind(kind: TransportKind) -> Self {
        match kind {
            TransportKind::Udp => NetConnector::Udp(UdpConnector::new()),
            TransportKind::Tcp => NetConnector::Tcp(TcpConnector::new()),
        }
    }
}

impl From<UdpConnector> for NetConnector {
    fn from(connector: UdpConnector) -> Self {
        NetConnector::Udp(connector)
    }
}

impl From<TcpConnector> for NetConnector {
    fn from(connector: TcpConnector) -> Self {
        NetConnector::Tcp(connector)
    }
}

/// Handle produced by a [`NetConnector`].
#[derive(Debug)]
pub enum NetHandle {
    /// UDP socket.
    Udp(UdpHandle),
    /// TCP connection.
    Tcp(TcpHandle),
}

fn mismatched() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        "handle does not belong to this connector",
    )
}

impl Connector for NetConnector {
    type Handle = NetHandle;
    type Request = Vec<u8>;
    type Response = Vec<u8>;

    fn kind(&self) -> TransportKind {
        match self {
            NetConnector::Udp(c) => c.kind(),
            NetConnector::Tcp(c) => c.kind(),
        }
    }

    async fn create(&self, destination: &Destination) -> io::Result<NetHandle> {
        match self {
            NetConnector::Udp(c) => c.create(destination).await.map(NetHandle::Udp),
            NetConnector::Tcp(c) => c.create(destination).await.map(NetHandle::Tcp),
        }
    }

    async fn write_and_await(
        &self,
        handle: &mut NetHandle,
        request: &Vec<u8>,
        destination: &Destination,
        timeout: Duration,
    ) -> io::Result<Vec<u8>> {
        match (self, handle) {
            (NetConnector::Udp(c), NetHandle::Udp(h)) => {
                c.write_and_await(h, request, destination, timeout).await
            }
            (NetConnector::Tcp(c), NetHandle::Tcp(h)) => {
                c.write_and_await(h, request, destination, timeout).await
            }
            _ => Err(mismatched()),
        }
    }

    async fn teardown(&self, handle: NetHandle) -> io::Result<()> {
        match (self, handle) {
            (NetConnector::Udp(c), NetHandle::Udp(h)) => c.teardown(h).await,
            (NetConnector::Tcp(c), NetHandle::Tcp(h)) => c.teardown(h).await,
            (_, other) => {
                drop(other);
                Err(mismatched())
            }
        }
    }

    fn force_teardown(&self, handle: NetHandle, reason: &str) {
        match (self, handle) {
            (NetConnector::Udp(c), NetHandle::Udp(h)) => c.force_teardown(h, reason),
            (NetConnector::Tcp(c), NetHandle::Tcp(h)) => c.force_teardown(h, reason),
            (_, other) => drop(other),
        }
    }
}
