//! The Client Coordinator (§4.5): the public façade. Owns the session,
//! enforces the single-connection invariant, and fans out events.
//!
//! Grounded on the teacher's `DealerSocket::connect()`/`.monitor()` facade
//! pattern: a thin public struct whose async methods build a command,
//! send it over an internal channel, and await a oneshot reply from the
//! Session Actor that actually owns the socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::channel::oneshot;
use tracing::{info_span, Instrument};

use tcpio_core::error::{ClientError, Result};
use tcpio_core::options::{ConnectOptions, ReadOptions, RrOptions};
use tcpio_core::tcp::SocketHandle;

use crate::actor::{Cmd, SessionActor};
use crate::events::{create_event_channel, EventReceiver};
use crate::rr::RrOutcome;

struct Session {
    cmd_tx: flume::Sender<Cmd>,
    event_rx: EventReceiver,
    rr_in_flight: Arc<AtomicBool>,
}

/// The public TCP client core. One instance owns at most one active
/// session at a time (§3, invariant 1).
pub struct TcpClient {
    state: async_lock::Mutex<Option<Session>>,
}

impl TcpClient {
    pub fn new() -> Self {
        Self {
            state: async_lock::Mutex::new(None),
        }
    }

    /// Tear down any prior session (emitting `Manual` only if one
    /// existed), then connect with the given options.
    pub async fn connect(&self, opts: ConnectOptions) -> Result<bool> {
        let span = info_span!("connect", host = %opts.host, port = opts.port);
        async {
            let mut guard = self.state.lock().await;
            if let Some(session) = guard.take() {
                teardown(&session).await;
            }

            let socket = SocketHandle::connect(&opts).await?;
            let (event_tx, event_rx) = create_event_channel();
            let cmd_tx = SessionActor::spawn(socket, event_tx);
            *guard = Some(Session {
                cmd_tx,
                event_rx,
                rr_in_flight: Arc::new(AtomicBool::new(false)),
            });
            Ok(true)
        }
        .instrument(span)
        .await
    }

    /// Idempotent: stops the reader, flushes pending data, closes the
    /// socket, and emits `Manual` iff a session existed.
    pub async fn disconnect(&self) -> Result<bool> {
        let span = info_span!("disconnect");
        async {
            let mut guard = self.state.lock().await;
            if let Some(session) = guard.take() {
                teardown(&session).await;
            }
            Ok(true)
        }
        .instrument(span)
        .await
    }

    /// May itself observe a disconnect via the health probe.
    pub async fn is_connected(&self) -> bool {
        let guard = self.state.lock().await;
        match guard.as_ref() {
            None => false,
            Some(session) => {
                let (tx, rx) = oneshot::channel();
                if session.cmd_tx.send(Cmd::IsConnected { reply: tx }).is_err() {
                    return false;
                }
                rx.await.unwrap_or(false)
            }
        }
    }

    pub async fn is_reading(&self) -> bool {
        let guard = self.state.lock().await;
        match guard.as_ref() {
            None => false,
            Some(session) => {
                let (tx, rx) = oneshot::channel();
                if session.cmd_tx.send(Cmd::IsReading { reply: tx }).is_err() {
                    return false;
                }
                rx.await.unwrap_or(false)
            }
        }
    }

    /// Fails `NotConnected` or `Busy` if an RR call is in flight.
    pub async fn write(&self, data: Vec<u8>) -> Result<usize> {
        let guard = self.state.lock().await;
        let session = guard.as_ref().ok_or(ClientError::NotConnected)?;
        if session.rr_in_flight.load(Ordering::Acquire) {
            return Err(ClientError::Busy);
        }
        let (tx, rx) = oneshot::channel();
        session
            .cmd_tx
            .send(Cmd::Write { data, reply: tx })
            .map_err(|_| ClientError::NotConnected)?;
        rx.await.map_err(|_| ClientError::NotConnected)?
    }

    /// Idempotent start; resets the Event Batcher state.
    pub async fn start_read(&self, opts: ReadOptions) -> Result<bool> {
        let guard = self.state.lock().await;
        let session = guard.as_ref().ok_or(ClientError::NotConnected)?;
        let (tx, rx) = oneshot::channel();
        session
            .cmd_tx
            .send(Cmd::StartRead { opts, reply: tx })
            .map_err(|_| ClientError::NotConnected)?;
        Ok(rx.await.unwrap_or(false))
    }

    /// Idempotent stop; flushes the Event Batcher before returning.
    pub async fn stop_read(&self) -> Result<bool> {
        let guard = self.state.lock().await;
        let session = guard.as_ref().ok_or(ClientError::NotConnected)?;
        let (tx, rx) = oneshot::channel();
        session
            .cmd_tx
            .send(Cmd::StopRead { reply: tx })
            .map_err(|_| ClientError::NotConnected)?;
        Ok(rx.await.unwrap_or(false))
    }

    pub async fn set_read_timeout(&self, ms: u64) -> Result<()> {
        let guard = self.state.lock().await;
        let session = guard.as_ref().ok_or(ClientError::NotConnected)?;
        let (tx, rx) = oneshot::channel();
        session
            .cmd_tx
            .send(Cmd::SetReadTimeout { ms, reply: tx })
            .map_err(|_| ClientError::NotConnected)?;
        let _ = rx.await;
        Ok(())
    }

    /// Runs the Request/Response Engine. The CAS on `rr_in_flight` happens
    /// here, outside the actor, so a second overlapping call observes
    /// `Busy` immediately instead of queuing behind the actor's channel
    /// (§5). The guard that clears it lives on this call's own stack, so
    /// a caller that drops this future early (e.g. its own outer timeout)
    /// still releases the flag.
    pub async fn write_and_read(&self, opts: RrOptions) -> Result<RrOutcome> {
        let (cmd_tx, rr_in_flight) = {
            let guard = self.state.lock().await;
            let session = guard.as_ref().ok_or(ClientError::NotConnected)?;
            (session.cmd_tx.clone(), session.rr_in_flight.clone())
        };

        if rr_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ClientError::Busy);
        }
        let _guard = tcpio_core::poison::RrGuard::new(&rr_in_flight);

        let (tx, rx) = oneshot::channel();
        cmd_tx
            .send(Cmd::WriteAndRead { opts, reply: tx })
            .map_err(|_| ClientError::NotConnected)?;
        rx.await.map_err(|_| ClientError::NotConnected)?
    }

    /// A clone of this session's event receiver. Safe to call repeatedly;
    /// every clone observes the same FIFO stream.
    pub async fn events(&self) -> Result<EventReceiver> {
        let guard = self.state.lock().await;
        let session = guard.as_ref().ok_or(ClientError::NotConnected)?;
        Ok(session.event_rx.clone())
    }
}

impl Default for TcpClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn teardown(session: &Session) {
    let (tx, rx) = oneshot::channel();
    if session.cmd_tx.send(Cmd::Disconnect { reply: tx }).is_ok() {
        let _ = rx.await;
    }
}
