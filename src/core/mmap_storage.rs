//! Memory-Mapped Slot Storage (anonymous mmap)
//!
//! Slot di-mmap langsung dari kernel, bukan dari global allocator:
//! - Lazy commit: page baru dipakai saat pertama disentuh producer
//! - Ring besar tidak membebani heap
//! - Dilepas sekali `munmap` saat channel di-drop

use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};

use memmap2::MmapMut;

use super::storage::Storage;
use crate::error::{Error, Result};
use crate::trace::debug;

/// Alignment every anonymous mapping is guaranteed to have (smallest common page size).
const MAP_ALIGN: usize = 4096;

/// Slots backed by an anonymous mapping; capacity chosen at runtime.
pub struct Mapped<T> {
    // Owns the pages `base` points into. Never accessed again after
    // construction, only dropped.
    _map: MmapMut,
    base: *mut MaybeUninit<T>,
    capacity: usize,
    _marker: PhantomData<T>,
}

impl<T> Mapped<T> {
    /// Map room for `capacity` elements.
    ///
    /// Fails if the byte size overflows, if `T` needs more than page
    /// alignment, or if the kernel refuses the mapping.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let align = mem::align_of::<T>();
        if align > MAP_ALIGN {
            return Err(Error::Alignment {
                align,
                limit: MAP_ALIGN,
            });
        }

        let bytes = capacity
            .checked_mul(mem::size_of::<T>())
            .ok_or(Error::CapacityOverflow(capacity))?;

        // Zero-sized maps are rejected by the OS; zero-sized T still needs a base address.
        let mut map = MmapMut::map_anon(bytes.max(1))?;
        let base = map.as_mut_ptr().cast::<MaybeUninit<T>>();

        debug!(capacity, bytes, "mapped ring storage");

        Ok(Self {
            _map: map,
            base,
            capacity,
            _marker: PhantomData,
        })
    }
}

// SAFETY: the mapping is exclusively owned; moving it to another thread moves
// the elements with it.
unsafe impl<T: Send> Send for Mapped<T> {}

// SAFETY: `base` is page aligned (so aligned for T), the mapping covers
// `capacity * size_of::<T>()` bytes and is never remapped.
unsafe impl<T> Storage<T> for Mapped<T> {
    const KIND: &'static str = "mapped";

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> *mut MaybeUninit<T> {
        debug_assert!(index < self.capacity);
        self.base.add(index)
    }
}
