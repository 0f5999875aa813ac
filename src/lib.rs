//! Ringchannel - bounded lock-free single-producer single-consumer queue
//!
//! A fixed-capacity circular buffer shared by exactly one producer thread and
//! one consumer thread. Non-blocking `try_push` / `try_pop` only; callers pick
//! their own retry or back-off strategy.
//!
//! ```
//! use ringchannel::core::{InlineChannel, RingChannel};
//!
//! let mut channel: InlineChannel<u32, 1024> = RingChannel::new()?;
//! let (mut tx, mut rx) = channel.split();
//!
//! std::thread::scope(|s| {
//!     s.spawn(move || {
//!         for i in 0..10_000 {
//!             while tx.try_push(i).is_err() {}
//!         }
//!     });
//!     s.spawn(move || {
//!         for i in 0..10_000 {
//!             loop {
//!                 if let Some(v) = rx.try_pop() {
//!                     assert_eq!(v, i);
//!                     break;
//!                 }
//!             }
//!         }
//!     });
//! });
//! # Ok::<(), ringchannel::Error>(())
//! ```

pub mod core;
pub mod error;
pub mod trace;

pub use crate::error::{Error, Result};
