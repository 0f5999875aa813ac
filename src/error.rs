//! Construction errors.
//!
//! Only building a channel can fail. A full or empty channel is an ordinary
//! outcome of `try_push` / `try_pop`, not an error.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("ring capacity must be at least one slot")]
    ZeroCapacity,

    #[error("ring capacity {0} is not a power of two (required by mask wraparound)")]
    NotPowerOfTwo(usize),

    #[error("ring capacity {0} overflows the addressable size of its storage")]
    CapacityOverflow(usize),

    #[error("element alignment {align} exceeds mapped storage alignment {limit}")]
    Alignment { align: usize, limit: usize },

    #[error("failed to map ring storage: {0}")]
    Map(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
