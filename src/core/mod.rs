//! Core module: Lock-Free SPSC Ring Channel
//!
//! Prinsip desain:
//! - Lock-Free: dua cursor, masing-masing satu writer, pasangan acquire/release
//! - No-Allocation: storage dialokasikan sekali saat init, tidak pernah resize
//! - Compile-time policy: storage dan wraparound adalah type parameter

mod mmap_storage;
mod padding;
mod ring_channel;
mod storage;
mod wrap;

pub use mmap_storage::Mapped;
pub use padding::CACHE_LINE_SIZE;
pub use ring_channel::{
    Consumer, HeapChannel, InlineChannel, MappedChannel, Producer, RingChannel,
};
pub use storage::{Heap, Inline, Storage};
pub use wrap::{Branch, Mask, Wrap};
