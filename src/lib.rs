//! ringmpmc-rs - Lock-Free Multi-Producer Multi-Consumer Ring
//!
//! A cache-optimized, bounded MPMC FIFO of machine-word opaque handles over a
//! fixed power-of-two circular buffer. Each side keeps a reservation cursor
//! and a visibility cursor; multi-producer and multi-consumer batches reserve
//! their slot ranges with a single CAS and publish in reservation order, so no
//! operation ever takes a lock or blocks on a kernel primitive.
//!
//! # Key features
//!
//! - Dual 32-bit cursors per side: CAS reservation decoupled from visibility
//! - Batched push/pop with all-or-nothing ([`Behavior::Fixed`]) or
//!   best-effort ([`Behavior::Variable`]) semantics
//! - Single-producer/single-consumer fast paths selected by [`Flags`]
//! - 128-byte alignment of producer and consumer metadata (prefetcher false
//!   sharing elimination)
//! - Pause/yield backoff in the publication handoff, tunable via
//!   [`Config::pause_rep`]
//!
//! # Example
//!
//! ```
//! use ringmpmc_rs::{Behavior, Flags, Ring};
//!
//! let ring = Ring::new(8, Flags::empty()).unwrap();
//! assert_eq!(ring.push(&[10, 20, 30], Behavior::Fixed), 3);
//!
//! let mut out = [0; 3];
//! assert_eq!(ring.pop(&mut out, Behavior::Fixed), 3);
//! assert_eq!(out, [10, 20, 30]);
//! ```
//!
//! To queue owned values instead of raw handles, wrap the ring in the typed
//! [`BoxQueue`] adapter:
//!
//! ```
//! use ringmpmc_rs::{BoxQueue, Flags};
//!
//! let queue = BoxQueue::<String>::new(8, Flags::empty()).unwrap();
//! queue.push(Box::new(String::from("hello"))).unwrap();
//! assert_eq!(*queue.pop().unwrap(), "hello");
//! ```

mod backoff;
mod config;
mod invariants;
mod metrics;
mod queue;
mod ring;

pub use backoff::Backoff;
pub use config::{Behavior, Config, Flags, RingError, SIZE_MASK};
pub use metrics::{Metrics, MetricsSnapshot};
pub use queue::{BoxQueue, PushError};
pub use ring::{Handle, Ring};
