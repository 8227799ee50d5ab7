//! # tcpio
//!
//! An async TCP client core for line-oriented peers — printers, scanners,
//! cash drawers, industrial devices reachable over a plain TCP socket.
//!
//! ## Architecture
//!
//! `tcpio` owns exactly one TCP connection at a time and exposes three
//! intertwined behaviors: a lifecycle (connect/disconnect/status), a
//! streaming read path that delivers incoming bytes as batched events, and
//! a request/response path that atomically writes a request and collects
//! a bounded reply under a deadline.
//!
//! - **`tcpio-core`**: socket, timing, and pattern-matching primitives
//! - **`tcpio`**: the Session Actor, the Request/Response Engine, and the
//!   public `TcpClient` façade (this crate)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tcpio::{ConnectOptions, ReadOptions, TcpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TcpClient::new();
//! client.connect(ConnectOptions::new("192.168.1.50").with_port(9100)).await?;
//!
//! client.start_read(ReadOptions::default()).await?;
//! let events = client.events().await?;
//! if let Ok(event) = events.recv_async().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! A single-threaded cooperative Session Actor (one `compio::runtime::spawn`
//! task per connection) serializes all socket operations, so the write
//! lock and reader/RR mutual exclusion fall out of the actor's
//! single-threadedness rather than requiring separate locks on the hot
//! path.
//!
//! ## Safety
//!
//! `unsafe` code is isolated to `tcpio-core::tcp` (raw fd duplication for
//! socket option tweaks and the health-probe peek). Everything in this
//! crate is safe Rust.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::future_not_send)] // Runtime-agnostic design
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod actor;
mod client;
mod events;
mod rr;
mod session;

/// Development helpers (tests, examples).
pub mod dev_tracing;

// Re-export the core crate's types callers need without a second `use`.
pub use tcpio_core::error::{ClientError, Result};
pub use tcpio_core::options::{ConnectOptions, ReadOptions, RrOptions};

pub use client::TcpClient;
pub use events::{DisconnectReason, Event};
pub use rr::RrOutcome;
