//! Configuration surface for the client core.
//!
//! These structs are the typed realization of the "recognized options"
//! tables the host plugin bridge passes across its boundary: one struct per
//! operation family, `Default` impls matching the documented defaults, and
//! builder-style `with_*` setters in the usual idiom.

use std::time::Duration;

use crate::error::Result;
use crate::pattern;

/// Options for establishing a connection.
///
/// # Examples
///
/// ```
/// use tcpio_core::options::ConnectOptions;
///
/// let opts = ConnectOptions::new("192.168.1.50")
///     .with_port(9100)
///     .with_timeout_ms(5000);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Target hostname or IP address. Required; no default.
    pub host: String,

    /// TCP port.
    /// - Default: 9100
    pub port: u16,

    /// Connect deadline in milliseconds, global across all resolved
    /// candidates.
    /// - Default: 3000
    /// - A value of 0 is treated as a 1ms minimum, never as "no deadline".
    pub timeout_ms: u64,

    /// Disable Nagle's algorithm (`TCP_NODELAY`).
    /// - Default: true
    pub no_delay: bool,

    /// Enable TCP keepalive probes.
    /// - Default: true
    pub keep_alive: bool,
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_no_delay(mut self, no_delay: bool) -> Self {
        self.no_delay = no_delay;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// The connect deadline, with the 0ms-means-1ms-minimum rule applied.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 9100,
            timeout_ms: 3000,
            no_delay: true,
            keep_alive: true,
        }
    }
}

/// Options for starting the background stream reader.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Maximum bytes per emitted `Data` event, after batch slicing.
    /// - Default: 4096
    pub chunk_size: usize,

    /// Reader idle tick in milliseconds: how long the reader waits for
    /// readiness before re-checking its command queue.
    /// - Default: 1000
    pub read_timeout_ms: u64,
}

impl ReadOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_read_timeout_ms(mut self, read_timeout_ms: u64) -> Self {
        self.read_timeout_ms = read_timeout_ms;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            read_timeout_ms: 1000,
        }
    }
}

/// Options for a single request/response call.
#[derive(Debug, Clone)]
pub struct RrOptions {
    /// Request payload. Required.
    pub data: Vec<u8>,

    /// Global deadline for the whole write+read cycle, in milliseconds.
    /// - Default: 1000
    pub timeout_ms: u64,

    /// Maximum bytes to accumulate in the response.
    /// - Default: 4096
    pub max_bytes: usize,

    /// Optional literal byte pattern that, once observed as a contiguous
    /// substring of the accumulated response, ends the receive loop early.
    /// - Default: none (adaptive idle governs termination instead)
    pub expect: Option<Vec<u8>>,

    /// Pause the stream reader for the duration of this call so it is not
    /// racing the RR engine for bytes off the same socket.
    /// - Default: true
    pub suspend_stream_during_rr: bool,
}

impl RrOptions {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_expect(mut self, expect: Vec<u8>) -> Self {
        self.expect = Some(expect);
        self
    }

    /// Like [`with_expect`](Self::with_expect), but takes a hex string (an
    /// optional `0x`/`0X` prefix, whitespace ignored) and decodes it via
    /// [`pattern::normalize_expect_hex`]. Malformed hex is rejected here, up
    /// front, as `InvalidArgument` rather than surfacing later out of the
    /// receive loop.
    pub fn try_with_expect_hex(mut self, hex_str: &str) -> Result<Self> {
        self.expect = Some(pattern::normalize_expect_hex(hex_str)?);
        Ok(self)
    }

    pub fn with_suspend_stream_during_rr(mut self, suspend: bool) -> Self {
        self.suspend_stream_during_rr = suspend;
        self
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl Default for RrOptions {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            timeout_ms: 1000,
            max_bytes: 4096,
            expect: None,
            suspend_stream_during_rr: true,
        }
    }
}
