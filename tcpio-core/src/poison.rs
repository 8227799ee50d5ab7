//! RAII guard for the Request/Response Engine's in-flight flag (§4.4, §9).
//!
//! # The Problem
//!
//! The RR in-flight flag gives overlapping `write_and_read` calls a fast
//! `Busy` instead of queuing silently. If the receive loop panics or its
//! Future is dropped mid-operation, the flag must still come back down —
//! otherwise every later RR call on the session is wrongly rejected as
//! `Busy` forever.
//!
//! # The Solution
//!
//! `RrGuard` is the mirror image of a poison guard: instead of staying
//! poisoned unless explicitly disarmed, it clears the flag on *every* drop
//! path, success or not. There is nothing to disarm; the guard's only job
//! is to make "cleared on return" true by construction rather than by
//! remembering to do it at every `return`/`?` site in the receive loop.
//!
//! ```
//! use tcpio_core::poison::RrGuard;
//! use std::sync::atomic::AtomicBool;
//!
//! # fn run_rr() -> Result<(), ()> { Ok(()) }
//! let in_flight = AtomicBool::new(false);
//! {
//!     let _guard = RrGuard::new(&in_flight);
//!     run_rr().ok();
//!     // flag clears here regardless of how run_rr() returned, or if this
//!     // block panicked instead.
//! }
//! assert!(!in_flight.load(std::sync::atomic::Ordering::Acquire));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

/// A RAII guard that clears an `AtomicBool` flag when dropped, including on
/// an unwinding panic.
pub struct RrGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RrGuard<'a> {
    /// Create a guard over an already-set flag. Callers are expected to
    /// have set `flag` to `true` via compare-and-set immediately before
    /// constructing this guard, so the two steps together form the atomic
    /// acquire-or-fail-with-`Busy` check from §4.4.
    #[inline]
    pub fn new(flag: &'a AtomicBool) -> Self {
        Self { flag }
    }
}

impl Drop for RrGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clears_flag_on_normal_drop() {
        let flag = AtomicBool::new(true);
        {
            let _guard = RrGuard::new(&flag);
        }
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn clears_flag_on_early_drop() {
        let flag = AtomicBool::new(true);
        let guard = RrGuard::new(&flag);
        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn clears_flag_on_unwind() {
        let flag = AtomicBool::new(true);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = RrGuard::new(&flag);
            panic!("simulated receive-loop panic");
        }));
        assert!(result.is_err());
        assert!(!flag.load(Ordering::Acquire));
    }
}
