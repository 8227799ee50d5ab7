//! End-to-end scenarios against a loopback echo server, covering the
//! literal inputs/outputs from the testable-properties section: raw
//! write/read, request/response with and without a pattern, RR timeout,
//! and remote EOF during streaming.

use compio::buf::BufResult;
use compio::io::{AsyncReadExt, AsyncWriteExt};
use compio::net::TcpListener;

use tcpio::{ConnectOptions, Event, ReadOptions, RrOptions, TcpClient};

/// Bind an ephemeral loopback listener and spawn a task that echoes
/// whatever it reads back to the first connecting peer, closing on EOF.
async fn spawn_echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    compio::runtime::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        loop {
            let buf = vec![0u8; 1024];
            let BufResult(res, buf) = stream.read(buf).await;
            match res {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let BufResult(res, _) = stream.write_all(buf[..n].to_vec()).await;
                    if res.is_err() {
                        break;
                    }
                }
            }
        }
    })
    .detach();
    port
}

/// Bind an ephemeral loopback listener and spawn a task that writes a
/// fixed reply once connected, then leaves the socket open (or closes it
/// immediately, depending on `close_after`).
async fn spawn_reply_server(reply: Vec<u8>, close_after: bool) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    compio::runtime::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        // Drain the request before replying.
        let buf = vec![0u8; 1024];
        let BufResult(_, _) = stream.read(buf).await;
        let BufResult(_, _) = stream.write_all(reply).await;
        if close_after {
            drop(stream);
        } else {
            // Keep the connection open but idle.
            compio::time::sleep(std::time::Duration::from_secs(2)).await;
        }
    })
    .detach();
    port
}

/// Bind an ephemeral loopback listener that accepts and immediately
/// closes, simulating a silent peer for RR-timeout scenarios.
async fn spawn_silent_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    compio::runtime::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        compio::time::sleep(std::time::Duration::from_secs(5)).await;
        drop(stream);
    })
    .detach();
    port
}

#[compio::test]
async fn echo_server_raw_write_and_read() {
    let port = spawn_echo_server().await;
    let client = TcpClient::new();
    client
        .connect(ConnectOptions::new("127.0.0.1").with_port(port).with_timeout_ms(1000))
        .await
        .unwrap();

    let sent = client.write(vec![0x41, 0x42, 0x43]).await.unwrap();
    assert_eq!(sent, 3);

    client
        .start_read(ReadOptions::default().with_chunk_size(1024))
        .await
        .unwrap();
    let events = client.events().await.unwrap();

    let event = events.recv_async().await.unwrap();
    match event {
        Event::Data(data) => assert_eq!(&data[..], &[0x41, 0x42, 0x43]),
        other => panic!("expected Data event, got {other:?}"),
    }
}

#[compio::test]
async fn rr_without_pattern_collects_reply_and_times_out_successfully() {
    let port = spawn_reply_server(vec![0xA0, 0xA1, 0xA2], false).await;
    let client = TcpClient::new();
    client
        .connect(ConnectOptions::new("127.0.0.1").with_port(port))
        .await
        .unwrap();

    let outcome = client
        .write_and_read(RrOptions::new(vec![0x01]).with_timeout_ms(300).with_max_bytes(4096))
        .await
        .unwrap();

    assert_eq!(outcome.bytes_sent, 1);
    assert_eq!(outcome.data, vec![0xA0, 0xA1, 0xA2]);
    assert!(!outcome.matched);
}

#[compio::test]
async fn rr_with_pattern_matches_early() {
    let port = spawn_reply_server(vec![0x12, 0x00, 0x00], false).await;
    let client = TcpClient::new();
    client
        .connect(ConnectOptions::new("127.0.0.1").with_port(port))
        .await
        .unwrap();

    let outcome = client
        .write_and_read(
            RrOptions::new(vec![0x10, 0x04, 0x01])
                .with_timeout_ms(500)
                .with_max_bytes(32)
                .with_expect(vec![0x00]),
        )
        .await
        .unwrap();

    assert_eq!(outcome.bytes_sent, 3);
    assert!(outcome.matched);
    assert!(outcome.data.windows(1).any(|w| w == [0x00]));
}

#[compio::test]
async fn rr_timeout_with_no_reply_reports_bytes_sent() {
    let port = spawn_silent_server().await;
    let client = TcpClient::new();
    client
        .connect(ConnectOptions::new("127.0.0.1").with_port(port))
        .await
        .unwrap();

    let err = client
        .write_and_read(RrOptions::new(vec![0x01]).with_timeout_ms(100))
        .await
        .unwrap_err();

    match err {
        tcpio::ClientError::Timeout { millis } => assert_eq!(millis, 100),
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[compio::test]
async fn remote_eof_during_streaming_emits_disconnect_once() {
    let port = spawn_reply_server(vec![0xFF], true).await;
    let client = TcpClient::new();
    client
        .connect(ConnectOptions::new("127.0.0.1").with_port(port))
        .await
        .unwrap();

    client
        .start_read(ReadOptions::default().with_chunk_size(1024))
        .await
        .unwrap();
    client.write(vec![0x01]).await.unwrap();
    let events = client.events().await.unwrap();

    let mut saw_disconnect = false;
    for _ in 0..4 {
        match events.recv_async().await {
            Ok(Event::Data(_)) => continue,
            Ok(Event::Disconnect(reason)) => {
                assert_eq!(reason, tcpio::DisconnectReason::Remote);
                saw_disconnect = true;
                break;
            }
            Err(_) => break,
        }
    }
    assert!(saw_disconnect);
    assert!(!client.is_connected().await);
}

#[compio::test]
async fn disconnect_is_idempotent() {
    let port = spawn_echo_server().await;
    let client = TcpClient::new();
    client
        .connect(ConnectOptions::new("127.0.0.1").with_port(port))
        .await
        .unwrap();

    assert!(client.disconnect().await.unwrap());
    assert!(client.disconnect().await.unwrap());
}

#[compio::test]
async fn start_read_is_idempotent() {
    let port = spawn_echo_server().await;
    let client = TcpClient::new();
    client
        .connect(ConnectOptions::new("127.0.0.1").with_port(port))
        .await
        .unwrap();

    assert!(client.start_read(ReadOptions::default()).await.unwrap());
    assert!(client.start_read(ReadOptions::default()).await.unwrap());
}

#[compio::test]
async fn connect_to_closed_port_fails_without_disconnect_event() {
    // Bind and immediately drop to free the port, then connect to it —
    // nothing is listening, so the OS refuses the connection.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = TcpClient::new();
    let result = client
        .connect(ConnectOptions::new("127.0.0.1").with_port(port).with_timeout_ms(500))
        .await;
    assert!(result.is_err());
    assert!(!client.is_connected().await);
}
