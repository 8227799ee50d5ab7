//! The Session Actor (§5, item 6): one `compio` task per session, owning
//! the socket exclusively and draining an internal command queue.
//!
//! This is the teacher's split-pump idiom (`SocketActor::run`) adapted
//! from a push model to a readiness/deadline model: instead of polling a
//! command queue between unconditional reads, the actor races its command
//! queue against a single timed read whenever the Stream Reader is active,
//! via `futures::select_biased!`. Serializing every socket operation
//! through this one task is what makes the write lock and the
//! reader/RR mutual exclusion fall out "for free" rather than needing a
//! separate `Mutex`.

use std::time::{Duration, Instant};

use futures::channel::oneshot;
use futures::{select_biased, FutureExt};
use tracing::{debug, info_span, warn, Instrument};

use tcpio_core::batch::EventBatcher;
use tcpio_core::error::{ClientError, Result};
use tcpio_core::options::{ReadOptions, RrOptions};
use tcpio_core::tcp::SocketHandle;

use crate::events::{DisconnectReason, Event, EventSender};
use crate::rr::{self, RrOutcome};
use crate::session::ConnectionState;

const READ_CHUNK: usize = 4096;

/// Outcome of racing the command queue against a timed read; carries only
/// owned data so producing it ends both futures' borrows of `self`.
enum Racer {
    Cmd(std::result::Result<Cmd, flume::RecvError>),
    Read(std::io::Result<(usize, Vec<u8>)>),
}

/// Commands the Coordinator submits to the actor. Each carries a oneshot
/// reply channel so the public async method can `await` its own completion.
pub enum Cmd {
    Write {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<usize>>,
    },
    StartRead {
        opts: ReadOptions,
        reply: oneshot::Sender<bool>,
    },
    StopRead {
        reply: oneshot::Sender<bool>,
    },
    IsReading {
        reply: oneshot::Sender<bool>,
    },
    IsConnected {
        reply: oneshot::Sender<bool>,
    },
    SetReadTimeout {
        ms: u64,
        reply: oneshot::Sender<()>,
    },
    WriteAndRead {
        opts: RrOptions,
        reply: oneshot::Sender<Result<RrOutcome>>,
    },
    Disconnect {
        reply: oneshot::Sender<bool>,
    },
}

pub struct SessionActor {
    socket: SocketHandle,
    cmd_rx: flume::Receiver<Cmd>,
    event_tx: EventSender,
    state: ConnectionState,
    reader_active: bool,
    read_timeout_ms: u64,
    batcher: EventBatcher,
    disconnect_emitted: bool,
}

impl SessionActor {
    pub fn spawn(socket: SocketHandle, event_tx: EventSender) -> flume::Sender<Cmd> {
        let (cmd_tx, cmd_rx) = flume::unbounded();
        let actor = SessionActor {
            socket,
            cmd_rx,
            event_tx,
            state: ConnectionState::Open,
            reader_active: false,
            read_timeout_ms: ReadOptions::default().read_timeout_ms,
            batcher: EventBatcher::new(ReadOptions::default().chunk_size),
            disconnect_emitted: false,
        };
        compio::runtime::spawn(actor.run()).detach();
        cmd_tx
    }

    async fn run(mut self) {
        loop {
            let should_exit = if self.reader_active {
                match self.race_cmd_and_read().await {
                    Racer::Cmd(Ok(cmd)) => self.handle_cmd(cmd).await,
                    Racer::Cmd(Err(_)) => true,
                    Racer::Read(outcome) => {
                        self.handle_read_outcome(outcome).await;
                        self.state.is_closed()
                    }
                }
            } else {
                match self.cmd_rx.recv_async().await {
                    Ok(cmd) => self.handle_cmd(cmd).await,
                    Err(_) => true,
                }
            };

            if should_exit {
                break;
            }
        }
    }

    /// Race the command queue against one readiness-windowed read attempt,
    /// bounded by whichever is sooner: the reader's idle tick or the Event
    /// Batcher's pending flush deadline.
    ///
    /// The two futures below borrow disjoint fields (`cmd_rx` vs.
    /// `socket`) directly, so both borrows can be held across the
    /// `select_biased!` without conflicting; the winning arm only
    /// produces an owned [`Racer`] value, so by the time this function
    /// returns and its caller calls back into `&mut self`, both borrows
    /// have already ended.
    async fn race_cmd_and_read(&mut self) -> Racer {
        let tick = Duration::from_millis(self.read_timeout_ms);
        let step = match self.batcher.flush_deadline() {
            Some(deadline) => tick.min(deadline.saturating_duration_since(Instant::now())),
            None => tick,
        };
        let buf = vec![0u8; READ_CHUNK];

        let cmd_fut = self.cmd_rx.recv_async().fuse();
        let read_fut = self.socket.read_timeout(buf, step).fuse();
        futures::pin_mut!(cmd_fut, read_fut);
        select_biased! {
            cmd = cmd_fut => Racer::Cmd(cmd),
            res = read_fut => Racer::Read(res),
        }
    }

    async fn handle_read_outcome(&mut self, outcome: std::io::Result<(usize, Vec<u8>)>) {
        match outcome {
            Ok((0, _)) => {
                debug!("peer closed connection during streaming read");
                self.reader_active = false;
                self.flush_and_emit(DisconnectReason::Remote);
            }
            Ok((n, buf)) => {
                if self.batcher.append(&buf[..n]) {
                    self.flush_batch();
                } else if let Some(deadline) = self.batcher.flush_deadline() {
                    if Instant::now() >= deadline {
                        self.flush_batch();
                    }
                }
            }
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                if let Some(deadline) = self.batcher.flush_deadline() {
                    if Instant::now() >= deadline {
                        self.flush_batch();
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "fatal read error during streaming read");
                self.reader_active = false;
                self.flush_and_emit(DisconnectReason::Error(e.to_string()));
            }
        }
    }

    fn flush_batch(&mut self) {
        for chunk in self.batcher.flush_now() {
            let _ = self.event_tx.send(Event::Data(chunk));
        }
    }

    /// Flush any pending batch, then emit `Disconnect` exactly once.
    fn flush_and_emit(&mut self, reason: DisconnectReason) {
        self.flush_batch();
        self.state = ConnectionState::Closed;
        if !self.disconnect_emitted {
            self.disconnect_emitted = true;
            let _ = self.event_tx.send(Event::Disconnect(reason));
        }
        let _ = self.socket.shutdown();
    }

    /// Returns `true` if the actor loop should exit after this command.
    async fn handle_cmd(&mut self, cmd: Cmd) -> bool {
        if !self.state.is_open() {
            return self.reject_closed(cmd);
        }
        match cmd {
            Cmd::Write { data, reply } => {
                let result = self.do_write(data).await;
                let _ = reply.send(result);
                false
            }
            Cmd::StartRead { opts, reply } => {
                let reading = self.do_start_read(opts);
                let _ = reply.send(reading);
                false
            }
            Cmd::StopRead { reply } => {
                self.flush_batch();
                self.reader_active = false;
                let _ = reply.send(false);
                false
            }
            Cmd::IsReading { reply } => {
                let _ = reply.send(self.reader_active && self.state.is_open());
                false
            }
            Cmd::IsConnected { reply } => {
                let connected = self.do_is_connected();
                let _ = reply.send(connected);
                false
            }
            Cmd::SetReadTimeout { ms, reply } => {
                self.read_timeout_ms = ms;
                let _ = reply.send(());
                false
            }
            Cmd::WriteAndRead { opts, reply } => {
                let result = self.do_write_and_read(opts).await;
                let _ = reply.send(result);
                false
            }
            Cmd::Disconnect { reply } => {
                self.flush_and_emit(DisconnectReason::Manual);
                let _ = reply.send(true);
                true
            }
        }
    }

    /// A session that has transitioned to `Closed` (observed by any
    /// command handler) rejects exactly one more command with a
    /// terminal-shaped reply and then the actor exits; the Coordinator
    /// treats a subsequently-closed `cmd_tx` the same as `NotConnected`.
    fn reject_closed(&mut self, cmd: Cmd) -> bool {
        match cmd {
            Cmd::Write { reply, .. } => {
                let _ = reply.send(Err(ClientError::NotConnected));
            }
            Cmd::StartRead { reply, .. } => {
                let _ = reply.send(false);
            }
            Cmd::StopRead { reply } => {
                let _ = reply.send(false);
            }
            Cmd::IsReading { reply } => {
                let _ = reply.send(false);
            }
            Cmd::IsConnected { reply } => {
                let _ = reply.send(false);
            }
            Cmd::SetReadTimeout { reply, .. } => {
                let _ = reply.send(());
            }
            Cmd::WriteAndRead { reply, .. } => {
                let _ = reply.send(Err(ClientError::NotConnected));
            }
            Cmd::Disconnect { reply } => {
                let _ = reply.send(true);
            }
        }
        true
    }

    async fn do_write(&mut self, data: Vec<u8>) -> Result<usize> {
        let len = data.len();
        match self.socket.write_all(data).await {
            Ok(()) => Ok(len),
            Err(e) => {
                let reason = disconnect_reason_for(&e);
                self.flush_and_emit(reason);
                Err(ClientError::Io(e))
            }
        }
    }

    fn do_start_read(&mut self, opts: ReadOptions) -> bool {
        if self.reader_active {
            return true;
        }
        self.read_timeout_ms = opts.read_timeout_ms;
        self.batcher = EventBatcher::new(opts.chunk_size);
        self.reader_active = true;
        true
    }

    fn do_is_connected(&mut self) -> bool {
        if self.reader_active {
            return true;
        }
        match self.socket.peek_health() {
            Ok(tcpio_core::tcp::HealthProbe::Healthy) | Ok(tcpio_core::tcp::HealthProbe::WouldBlock) => true,
            Ok(tcpio_core::tcp::HealthProbe::PeerClosed) => {
                self.flush_and_emit(DisconnectReason::Remote);
                false
            }
            Err(e) => {
                let reason = disconnect_reason_for(&e);
                self.flush_and_emit(reason);
                false
            }
        }
    }

    async fn do_write_and_read(&mut self, opts: RrOptions) -> Result<RrOutcome> {
        let span = info_span!("write_and_read", bytes_sent = opts.data.len(), timeout_ms = opts.timeout_ms);
        async {
            let was_reading = self.reader_active;
            if opts.suspend_stream_during_rr && was_reading {
                self.reader_active = false;
            }

            let result = rr::run(&mut self.socket, &opts).await;

            match &result {
                Ok(_) => {}
                Err(ClientError::Closed) => {
                    self.flush_and_emit(DisconnectReason::Remote);
                }
                Err(ClientError::Io(e)) => {
                    let reason = disconnect_reason_for(e);
                    self.flush_and_emit(reason);
                }
                Err(_) => {}
            }

            if opts.suspend_stream_during_rr && was_reading && self.state.is_open() {
                self.reader_active = true;
            }

            result
        }
        .instrument(span)
        .await
    }
}

fn disconnect_reason_for(e: &std::io::Error) -> DisconnectReason {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            DisconnectReason::Remote
        }
        _ => DisconnectReason::Error(e.to_string()),
    }
}
