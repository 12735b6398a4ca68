//! Stream connector over tokio TCP.
//!
//! Every message in either direction is prefixed with a 4-byte big-endian
//! length header. The connection is opened on creation and reused for every
//! command until the queue closes it.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::connector::Connector;
use crate::core::constants::{MAX_TCP_FRAME, TCP_HEADER_SIZE};
use crate::core::{Destination, TransportKind};

/// Prefix `payload` with its length header.
pub fn encode_frame(payload: &[u8]) -> io::Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("payload of {} bytes exceeds frame limit", payload.len()),
        )
    })?;

    let mut frame = Vec::with_capacity(TCP_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Read one length-prefixed frame.
///
/// Empty frames and frames larger than [`MAX_TCP_FRAME`] are rejected as
/// `InvalidData`.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut header = [0u8; TCP_HEADER_SIZE];
    reader.read_exact(&mut header).await?;

    let len = u32::from_be_bytes(header) as usize;
    if len == 0 || len > MAX_TCP_FRAME {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid frame length {}", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Live TCP connection owned by a queue.
#[derive(Debug)]
pub struct TcpHandle {
    stream: TcpStream,
    peer: Destination,
}

impl TcpHandle {
    /// Destination this connection was opened to.
    pub fn peer(&self) -> &Destination {
        &self.peer
    }
}

/// Opens one TCP connection per socket.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    nodelay: bool,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpConnector {
    /// Connector with Nagle's algorithm disabled.
    pub fn new() -> Self {
        Self { nodelay: true }
    }

    /// Enable or disable `TCP_NODELAY`.
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

impl Connector for TcpConnector {
    type Handle = TcpHandle;
    type Request = Vec<u8>;
    type Response = Vec<u8>;

    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    async fn create(&self, destination: &Destination) -> io::Result<TcpHandle> {
        let stream = TcpStream::connect((destination.host.as_str(), destination.port)).await?;
        stream.set_nodelay(self.nodelay)?;
        Ok(TcpHandle {
            stream,
            peer: destination.clone(),
        })
    }

    async fn write_and_await(
        &self,
        handle: &mut TcpHandle,
        request: &Vec<u8>,
        destination: &Destination,
        _timeout: Duration,
    ) -> io::Result<Vec<u8>> {
        if handle.peer != *destination {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("connection is to {}, not {}", handle.peer, destination),
            ));
        }

        let frame = encode_frame(request)?;
        handle.stream.write_all(&frame).await?;
        handle.stream.flush().await?;

        read_frame(&mut handle.stream).await
    }

    async fn teardown(&self, mut handle: TcpHandle) -> io::Result<()> {
        handle.stream.shutdown().await
    }

    fn force_teardown(&self, handle: TcpHandle, _reason: &str) {
        drop(handle);
    }
}
