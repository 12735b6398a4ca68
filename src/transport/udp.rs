//! Datagram connector over tokio UDP.
//!
//! One request datagram out, one response datagram back. Datagrams arriving
//! from any address other than the destination are ignored.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{UdpSocket, lookup_host};

use super::connector::Connector;
use crate::core::constants::UDP_RECV_BUFFER_SIZE;
use crate::core::{Destination, TransportKind};

/// Live UDP socket owned by a queue.
#[derive(Debug)]
pub struct UdpHandle {
    socket: UdpSocket,
    recv_buffer: Vec<u8>,
}

impl UdpHandle {
    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

/// Creates ephemeral UDP sockets.
#[derive(Debug, Clone)]
pub struct UdpConnector {
    bind_addr: Option<SocketAddr>,
    recv_buffer_size: usize,
}

impl Default for UdpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpConnector {
    /// Bind to an unspecified address of the destination's family.
    pub fn new() -> Self {
        Self {
            bind_addr: None,
            recv_buffer_size: UDP_RECV_BUFFER_SIZE,
        }
    }

    /// Bind to a specific local address instead.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Set the receive buffer size (largest response accepted).
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }
}

/// Resolve a destination to its first socket address.
pub(crate) async fn resolve(destination: &Destination) -> io::Result<SocketAddr> {
    lookup_host((destination.host.as_str(), destination.port))
        .await?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address for {}", destination),
            )
        })
}

impl Connector for UdpConnector {
    type Handle = UdpHandle;
    type Request = Vec<u8>;
    type Response = Vec<u8>;

    fn kind(&self) -> TransportKind {
        TransportKind::Udp
    }

    async fn create(&self, destination: &Destination) -> io::Result<UdpHandle> {
        let bind_addr = match self.bind_addr {
            Some(addr) => addr,
            None => match resolve(destination).await? {
                SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
                SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
            },
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        Ok(UdpHandle {
            socket,
            recv_buffer: vec![0u8; self.recv_buffer_size],
        })
    }

    async fn write_and_await(
        &self,
        handle: &mut UdpHandle,
        request: &Vec<u8>,
        destination: &Destination,
        _timeout: Duration,
    ) -> io::Result<Vec<u8>> {
        let target = resolve(destination).await?;
        handle.socket.send_to(request, target).await?;

        loop {
            let (len, from) = handle.socket.recv_from(&mut handle.recv_buffer).await?;
            if from == target {
                return Ok(handle.recv_buffer[..len].to_vec());
            }
        }
    }

    async fn teardown(&self, handle: UdpHandle) -> io::Result<()> {
        drop(handle);
        Ok(())
    }

    fn force_teardown(&self, handle: UdpHandle, _reason: &str) {
        drop(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn echo_peer() -> (UdpSocket, Destination) {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = peer.local_addr().unwrap();
        (peer, Destination::new("127.0.0.1", addr.port()))
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (peer, dest) = echo_peer().await;
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, from) = peer.recv_from(&mut buf).await.unwrap();
            let mut reply = b"re:".to_vec();
            reply.extend_from_slice(&buf[..len]);
            peer.send_to(&reply, from).await.unwrap();
        });

        let connector = UdpConnector::new();
        let mut handle = connector.create(&dest).await.unwrap();
        assert!(handle.local_addr().unwrap().ip().is_unspecified());

        let response = connector
            .write_and_await(&mut handle, &b"ping".to_vec(), &dest, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response, b"re:ping");
    }

    #[tokio::test]
    async fn test_ignores_datagrams_from_other_peers() {
        let (peer, dest) = echo_peer().await;
        let stranger = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let connector = UdpConnector::new().bind_addr("127.0.0.1:0".parse().unwrap());
        let mut handle = connector.create(&dest).await.unwrap();
        let local = handle.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, from) = peer.recv_from(&mut buf).await.unwrap();
            stranger.send_to(b"spoofed", from).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            peer.send_to(b"genuine", from).await.unwrap();
        });

        let response = connector
            .write_and_await(&mut handle, &b"hello".to_vec(), &dest, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response, b"genuine");
        assert_eq!(local.ip(), Ipv4Addr::LOCALHOST);
    }
}
