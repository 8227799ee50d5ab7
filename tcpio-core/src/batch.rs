//! The Event Batcher: coalesces stream-reader bytes into size-bounded
//! `Data` events on a debounce window or a size cap (§4.2).
//!
//! This struct only owns the buffer and the bookkeeping; the actual sleep
//! that fires a debounced flush is driven by the Session Actor's `select!`
//! loop, which asks [`EventBatcher::flush_deadline`] how long to wait.

use bytes::Bytes;
use std::time::{Duration, Instant};

/// Debounce window: a flush is scheduled this long after the first byte of
/// a new pending batch arrives, unless the cap is hit first.
pub const MERGE_WINDOW: Duration = Duration::from_millis(10);

/// Size cap: once the pending buffer reaches this many bytes, flush
/// immediately rather than waiting out the debounce window.
pub const MERGE_CAP: usize = 16 * 1024;

/// Accumulates bytes from the Stream Reader and slices flushes by
/// `chunk_size` before they become `Data` events.
pub struct EventBatcher {
    buffer: Vec<u8>,
    pending_since: Option<Instant>,
    chunk_size: usize,
}

impl EventBatcher {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            pending_since: None,
            chunk_size,
        }
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
    }

    /// Append freshly read bytes. Arms the debounce timer if nothing was
    /// already pending. Returns `true` if the cap was reached and the
    /// caller should flush immediately rather than wait for the window.
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        if self.pending_since.is_none() {
            self.pending_since = Some(Instant::now());
        }
        self.buffer.extend_from_slice(bytes);
        self.buffer.len() >= MERGE_CAP
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// How long until the debounce window closes, if a batch is pending.
    /// `None` means nothing is pending and the actor need not wake for a
    /// flush on our account.
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.pending_since.map(|since| since + MERGE_WINDOW)
    }

    /// Drain the buffer now, slicing it into `chunk_size`-sized pieces in
    /// order. Returns an empty vec if nothing was pending.
    pub fn flush_now(&mut self) -> Vec<Bytes> {
        if self.buffer.is_empty() {
            self.pending_since = None;
            return Vec::new();
        }
        let drained = std::mem::take(&mut self.buffer);
        self.pending_since = None;
        let full = Bytes::from(drained);
        if self.chunk_size == 0 {
            return vec![full];
        }
        full.chunks(self.chunk_size)
            .map(|c| full.slice_ref(c))
            .collect()
    }
}
