//! Timeout utilities for I/O operations
//!
//! Provides timeout wrappers for async read/write operations using compio's timeout support.

use compio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use compio::time::timeout;
use std::io;
use std::time::Duration;

/// Execute a single partial read with a timeout, returning however many bytes
/// arrived rather than filling the buffer.
///
/// # Arguments
///
/// * `duration` - Maximum time to wait
///    - `None`: Block indefinitely (no timeout)
///    - `Some(duration)`: Wait up to duration
///
/// # Returns
///
/// * `Ok(result)` if the read completed within the timeout (may be a short read)
/// * `Err(io::ErrorKind::TimedOut)` if the timeout elapsed before any data arrived
pub async fn read_with_timeout<S, B>(
    stream: &mut S,
    buf: B,
    duration: Option<Duration>,
) -> io::Result<compio::buf::BufResult<usize, B>>
where
    S: AsyncRead + Unpin,
    B: compio::buf::IoBufMut,
{
    match duration {
        None => Ok(stream.read(buf).await),
        Some(d) => match timeout(d, stream.read(buf)).await {
            Ok(result) => Ok(result),
            Err(_elapsed) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "Read operation timed out",
            )),
        },
    }
}

/// Execute an async write_all operation with a timeout.
///
/// Writes the entire buffer or returns an error.
pub async fn write_all_with_timeout<S, B>(
    stream: &mut S,
    buf: B,
    duration: Option<Duration>,
) -> io::Result<compio::buf::BufResult<(), B>>
where
    S: AsyncWrite + Unpin,
    B: compio::buf::IoBuf,
{
    match duration {
        None => Ok(stream.write_all(buf).await),
        Some(d) => match timeout(d, stream.write_all(buf)).await {
            Ok(result) => Ok(result),
            Err(_elapsed) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "Write operation timed out",
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compio::net::{TcpListener, TcpStream};

    // Compile-time check that the API accepts the Duration shapes the
    // session actor and RR engine actually pass.
    #[test]
    fn test_timeout_types() {
        let _infinite: Option<Duration> = None;
        let _timed = Some(Duration::from_secs(5));
    }

    #[compio::test]
    async fn write_and_read_with_timeout_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        compio::runtime::spawn(async move {
            let (mut server, _) = listener.accept().await.unwrap();
            let compio::buf::BufResult(res, buf) = server.read(vec![0u8; 5]).await;
            let n = res.unwrap();
            let compio::buf::BufResult(res, _) = server.write_all(buf[..n].to_vec()).await;
            res.unwrap();
        })
        .detach();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let compio::buf::BufResult(res, _) =
            write_all_with_timeout(&mut client, b"hello".to_vec(), Some(Duration::from_millis(500)))
                .await
                .unwrap();
        res.unwrap();

        let compio::buf::BufResult(res, buf) =
            read_with_timeout(&mut client, vec![0u8; 5], Some(Duration::from_millis(500)))
                .await
                .unwrap();
        let n = res.unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[compio::test]
    async fn read_with_timeout_elapses_on_silent_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        compio::runtime::spawn(async move {
            let (server, _) = listener.accept().await.unwrap();
            std::mem::forget(server);
        })
        .detach();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let err = read_with_timeout(&mut client, vec![0u8; 5], Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
