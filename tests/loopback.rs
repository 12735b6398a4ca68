//! End-to-end tests against loopback UDP and TCP devices.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use plugwire::client::{ClientConfigBuilder, DeviceClient};
use plugwire::logging::LogLevel;
use plugwire::transport::tcp::{encode_frame, read_frame};
use plugwire::transport::{NetConnector, QueueError, SendOptions, SocketState};
use plugwire::TransportKind;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, UdpSocket};

/// UDP device answering every datagram with `ack:<payload>`.
async fn udp_device() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        loop {
            let (len, from) = socket.recv_from(&mut buf).await.unwrap();
            let mut reply = b"ack:".to_vec();
            reply.extend_from_slice(&buf[..len]);
            socket.send_to(&reply, from).await.unwrap();
        }
    });
    port
}

/// TCP device echoing framed commands; `drop` closes the connection instead.
async fn tcp_device() -> (u16, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let connections = Arc::new(AtomicUsize::new(0));
    let accepted = Arc::clone(&connections);

    tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            accepted.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                while let Ok(request) = read_frame(&mut stream).await {
                    if request == b"drop" {
                        return;
                    }
                    let reply = encode_frame(&[b"ack:".as_slice(), &request].concat()).unwrap();
                    if stream.write_all(&reply).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    (port, connections)
}

fn client(transport: TransportKind, port: u16) -> DeviceClient<NetConnector> {
    let config = ClientConfigBuilder::new()
        .host("127.0.0.1")
        .port(port)
        .transport(transport)
        .default_timeout(Duration::from_secs(2))
        .log_level(LogLevel::Silent)
        .build()
        .unwrap();
    DeviceClient::connect(&config)
}

#[tokio::test]
async fn udp_concurrent_callers_complete_in_order() {
    let port = udp_device().await;
    let client = client(TransportKind::Udp, port);

    let futures: Vec<_> = (0..5)
        .map(|i| client.send(format!("cmd-{}", i).into_bytes()))
        .collect();

    for (i, future) in futures.into_iter().enumerate() {
        let reply = future.await.unwrap();
        assert_eq!(reply, format!("ack:cmd-{}", i).into_bytes());
    }
    assert_eq!(client.state(), SocketState::Bound);
}

#[tokio::test]
async fn udp_silent_device_times_out() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = silent.local_addr().unwrap().port();
    let client = client(TransportKind::Udp, port);

    let err = client
        .send_with(
            b"anyone?".to_vec(),
            SendOptions::with_timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, QueueError::Timeout(_)));
    assert_eq!(client.state(), SocketState::Unbound);
    drop(silent);
}

#[tokio::test]
async fn tcp_connection_is_reused_until_closed() {
    let (port, connections) = tcp_device().await;
    let client = client(TransportKind::Tcp, port);

    for word in ["on", "off", "info"] {
        let reply = client.send(word.as_bytes().to_vec()).await.unwrap();
        assert_eq!(reply, format!("ack:{}", word).into_bytes());
    }
    assert_eq!(connections.load(Ordering::SeqCst), 1);

    client.close().await;
    assert_eq!(client.state(), SocketState::Unbound);

    client.send(b"again".to_vec()).await.unwrap();
    assert_eq!(connections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn tcp_dropped_connection_does_not_strand_queue() {
    let (port, connections) = tcp_device().await;
    let client = client(TransportKind::Tcp, port);

    let dropped = client.send(b"drop".to_vec());
    let after = client.send(b"after".to_vec());

    assert!(matches!(dropped.await, Err(QueueError::Transport(_))));
    assert_eq!(after.await.unwrap(), b"ack:after");
    assert_eq!(connections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn destroy_fails_queued_commands() {
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = silent.local_addr().unwrap().port();
    let client = client(TransportKind::Tcp, port);

    let pending: Vec<_> = (0..3).map(|_| client.send(b"hello".to_vec())).collect();
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.destroy("device hung");

    for future in pending {
        match future.await {
            Err(QueueError::Destroyed(reason)) => assert_eq!(reason, "device hung"),
            other => panic!("expected destroyed, got {:?}", other),
        }
    }
    assert_eq!(client.state(), SocketState::Destroyed);
    drop(silent);
}
