//! tcpio Core
//!
//! Runtime-agnostic building blocks shared by the `tcpio` client crate:
//! - The Socket Handle: non-blocking TCP connect/read/write/peek (`tcp`)
//! - Typed errors (`error`)
//! - Configuration surface (`options`)
//! - Timeout-wrapped async I/O helpers (`timeout`)
//! - Literal byte-pattern matching for `expect` (`pattern`)
//! - Adaptive idle-threshold tracking (`idle`)
//! - The Event Batcher (`batch`)
//! - The always-clear-on-drop RR guard (`poison`)

#![deny(unsafe_code)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]

pub mod batch;
pub mod error;
pub mod idle;
pub mod options;
pub mod pattern;
pub mod poison;
pub mod tcp;
pub mod timeout;

pub mod prelude {
    pub use crate::batch::EventBatcher;
    pub use crate::error::{ClientError, Result};
    pub use crate::idle::IdleSamples;
    pub use crate::options::{ConnectOptions, ReadOptions, RrOptions};
    pub use crate::poison::RrGuard;
    pub use crate::tcp::{HealthProbe, SocketHandle};
}
