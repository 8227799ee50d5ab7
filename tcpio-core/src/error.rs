/// tcpio Error Types
///
/// Comprehensive error handling for all tcpio client operations.
use std::io;
use thiserror::Error;

/// Main error type for tcpio client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No active session; `connect()` was never called or a prior
    /// disconnect was never followed by a new one.
    #[error("not connected")]
    NotConnected,

    /// A request/response call is already in flight on this session.
    #[error("a request/response call is already in flight")]
    Busy,

    /// A request/response call did not observe its terminating condition
    /// before its deadline elapsed.
    #[error("request/response timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The session has already been torn down (manually, remotely, or by
    /// error) and cannot accept further operations.
    #[error("connection closed")]
    Closed,

    /// A caller-supplied option failed validation before any I/O occurred.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error during socket operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for tcpio client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Create an invalid argument error with a message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a timeout error carrying the elapsed deadline in milliseconds.
    pub fn timeout(millis: u64) -> Self {
        Self::Timeout { millis }
    }

    /// Check if this error is recoverable without establishing a new session.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            Self::Busy | Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a connection-lifecycle error, i.e. the session
    /// itself is gone rather than a single call having failed.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Closed)
    }
}
