//! The Request/Response Engine (§4.4): one atomic write-then-read cycle
//! bounded by a global deadline, a response cap, an optional byte-pattern
//! early exit, and adaptive idle detection when no pattern is given.
//!
//! This module is pure receive-loop logic over a [`SocketHandle`]; it does
//! not know about the Session Actor, the RR in-flight flag, or reader
//! suspension — those are the actor's job (see `actor.rs`), which calls
//! [`run`] once it has already taken care of both.

use std::io;
use std::time::{Duration, Instant};

use tcpio_core::error::{ClientError, Result};
use tcpio_core::idle::IdleSamples;
use tcpio_core::options::RrOptions;
use tcpio_core::pattern;
use tcpio_core::tcp::SocketHandle;

/// Upper bound on the readiness-wait step when a pattern is set or no
/// bytes have arrived yet.
const PATTERNED_STEP_CAP: Duration = Duration::from_millis(200);

/// Read syscall size per iteration, capped by whatever room remains under
/// the response cap.
const READ_CHUNK: usize = 4096;

/// Result of a completed (or deadline-truncated) request/response call.
#[derive(Debug, Clone)]
pub struct RrOutcome {
    pub bytes_sent: usize,
    pub bytes_read: usize,
    pub data: Vec<u8>,
    pub matched: bool,
}

/// Run the write+read cycle described by `opts` against `socket`.
///
/// Returns `Err(ClientError::Timeout)` only when the deadline elapsed with
/// zero bytes collected; a deadline with partial data is a successful
/// outcome with `matched: false`, per §7.
pub async fn run(socket: &mut SocketHandle, opts: &RrOptions) -> Result<RrOutcome> {
    let deadline_at = Instant::now() + opts.deadline();
    let bytes_sent = opts.data.len();

    write_phase(socket, opts, deadline_at).await?;
    receive_phase(socket, opts, deadline_at, bytes_sent).await
}

/// A broken-pipe-class write failure means the peer is gone, not that this
/// particular write was malformed; §4.4 step 2 requires that to surface as
/// `Closed` so the actor's disconnect classification (`Remote`) and the RR
/// result agree about what happened.
fn is_broken_pipe_class(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
    )
}

async fn write_phase(
    socket: &mut SocketHandle,
    opts: &RrOptions,
    deadline_at: Instant,
) -> Result<()> {
    let remaining = deadline_at.saturating_duration_since(Instant::now());
    match socket.write_all_timeout(opts.data.clone(), remaining).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(ClientError::timeout(opts.timeout_ms)),
        Err(e) if is_broken_pipe_class(&e) => Err(ClientError::Closed),
        Err(e) => Err(ClientError::Io(e)),
    }
}

async fn receive_phase(
    socket: &mut SocketHandle,
    opts: &RrOptions,
    deadline_at: Instant,
    bytes_sent: usize,
) -> Result<RrOutcome> {
    let cap = opts.max_bytes.max(1);
    let pattern_bytes = opts.expect.as_deref();
    let mut data: Vec<u8> = Vec::with_capacity(cap.min(READ_CHUNK));
    let mut samples = IdleSamples::new();
    let mut last_arrival: Option<Instant> = None;

    loop {
        let now = Instant::now();
        if now >= deadline_at {
            return on_deadline(opts, bytes_sent, data);
        }
        let remaining = deadline_at - now;

        let step = if pattern_bytes.is_some() || data.is_empty() {
            remaining.min(PATTERNED_STEP_CAP)
        } else {
            remaining.min(samples.threshold())
        };

        let want = READ_CHUNK.min(cap - data.len());
        let buf = vec![0u8; want];

        match socket.read_timeout(buf, step).await {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                if pattern_bytes.is_none() && !data.is_empty() {
                    if let Some(last) = last_arrival {
                        if last.elapsed() >= samples.threshold() {
                            return Ok(RrOutcome {
                                bytes_sent,
                                bytes_read: data.len(),
                                data,
                                matched: false,
                            });
                        }
                    }
                }
                // Either a pattern is pending, or we haven't gone idle
                // long enough yet; keep waiting against the deadline.
            }
            Ok((0, _)) => return Err(ClientError::Closed),
            Ok((n, buf)) => {
                if let Some(last) = last_arrival {
                    samples.push(last.elapsed());
                }
                last_arrival = Some(Instant::now());
                data.extend_from_slice(&buf[..n]);

                if let Some(pat) = pattern_bytes {
                    if pattern::contains(&data, pat) {
                        return Ok(RrOutcome {
                            bytes_sent,
                            bytes_read: data.len(),
                            data,
                            matched: true,
                        });
                    }
                }
                if data.len() >= cap {
                    return Ok(RrOutcome {
                        bytes_sent,
                        bytes_read: data.len(),
                        data,
                        matched: false,
                    });
                }
            }
            Err(e) => return Err(ClientError::Io(e)),
        }
    }
}

fn on_deadline(opts: &RrOptions, bytes_sent: usize, data: Vec<u8>) -> Result<RrOutcome> {
    if data.is_empty() {
        Err(ClientError::timeout(opts.timeout_ms))
    } else {
        let bytes_read = data.len();
        Ok(RrOutcome {
            bytes_sent,
            bytes_read,
            data,
            matched: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_carries_the_fields_callers_branch_on() {
        let outcome = RrOutcome {
            bytes_sent: 3,
            bytes_read: 2,
            data: vec![0x00, 0x01],
            matched: true,
        };
        assert_eq!(outcome.bytes_sent, 3);
        assert!(outcome.matched);
    }
}
