//! Isolasi cache line untuk field cursor (mencegah false sharing).

use std::ops::{Deref, DerefMut};

/// Cache-line size used to pad every cursor (64 bytes on x86-64 and most ARM cores).
///
/// Process-wide and fixed at compile time; `CacheLinePadded` is aligned to it.
pub const CACHE_LINE_SIZE: usize = 64;

/// Wraps a value so it owns a whole cache line.
///
/// Keeps the producer's writes and the consumer's writes from landing on the
/// same line (false sharing).
#[repr(C, align(64))]
pub(crate) struct CacheLinePadded<T> {
    value: T,
}

const _: () = assert!(std::mem::align_of::<CacheLinePadded<u8>>() == CACHE_LINE_SIZE);

impl<T> CacheLinePadded<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> Deref for CacheLinePadded<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CacheLinePadded<T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}
