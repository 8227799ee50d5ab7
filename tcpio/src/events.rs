//! Session lifecycle events, delivered to the host on a single FIFO channel
//! per session (§4.2, §9).
//!
//! A single channel — rather than separate `Data`/`Disconnect` streams —
//! is what makes the ordering invariant ("`Disconnect` never precedes a
//! `Data` event whose bytes arrived first") trivial to guarantee: there is
//! only one queue to order.

use bytes::Bytes;
use std::fmt;

/// Why a session was torn down. Exactly one is reported per session that
/// reached `Open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The caller invoked `disconnect()`.
    Manual,
    /// The peer closed its send direction (read returned 0 bytes, or the
    /// health probe observed EOF).
    Remote,
    /// A fatal I/O error occurred.
    Error(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Remote => write!(f, "remote"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// An event delivered to a session's host listener.
#[derive(Debug, Clone)]
pub enum Event {
    /// A coalesced, chunk-sliced batch of bytes received from the peer.
    /// Never empty.
    Data(Bytes),
    /// The session has ended. Emitted at most once.
    Disconnect(DisconnectReason),
}

/// Handle for receiving session events.
pub type EventReceiver = flume::Receiver<Event>;

/// Internal sender used by the Session Actor to emit events.
pub type EventSender = flume::Sender<Event>;

/// Create a new event channel pair for a session.
#[must_use]
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    flume::unbounded()
}
