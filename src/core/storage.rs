//! Strategi storage untuk slot ring (inline, heap).
//!
//! A slot is raw, possibly-uninitialised memory for one element. Whether a
//! slot currently holds a live value is decided by the channel's cursors, not
//! by the storage, so storage never drops elements itself.

use std::cell::UnsafeCell;
use std::mem::{self, MaybeUninit};

use crate::error::{Error, Result};

/// Backing memory for a ring of `T` slots.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - `capacity()` never changes for the lifetime of the value,
/// - `slot(i)` for every `i < capacity()` returns a pointer that is valid for
///   reads and writes of `T`, properly aligned, and distinct from every other
///   slot,
/// - `slot` may be called from the producer and the consumer concurrently
///   (the channel guarantees they never touch the same slot at once).
pub unsafe trait Storage<T> {
    /// Short name used in logs and benchmark output.
    const KIND: &'static str;

    /// Number of slots.
    fn capacity(&self) -> usize;

    /// Pointer to slot `index`.
    ///
    /// # Safety
    ///
    /// `index < self.capacity()`.
    unsafe fn slot(&self, index: usize) -> *mut MaybeUninit<T>;
}

#[repr(transparent)]
pub(crate) struct Slot<T> {
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub(crate) const fn new() -> Self {
        Self {
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline(always)]
    pub(crate) fn get(&self) -> *mut MaybeUninit<T> {
        self.data.get()
    }
}

/// Slots embedded directly in the channel value; capacity fixed at compile time.
///
/// A channel built on this lives wherever its owner puts it (stack, static,
/// or inside another struct) with no allocation at all.
pub struct Inline<T, const N: usize> {
    slots: [Slot<T>; N],
}

impl<T, const N: usize> Inline<T, N> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::new()),
        }
    }
}

impl<T, const N: usize> Default for Inline<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: N is a const; each array element is its own UnsafeCell.
unsafe impl<T, const N: usize> Storage<T> for Inline<T, N> {
    const KIND: &'static str = "inline";

    #[inline(always)]
    fn capacity(&self) -> usize {
        N
    }

    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> *mut MaybeUninit<T> {
        debug_assert!(index < N);
        self.slots.get_unchecked(index).get()
    }
}

/// Heap-allocated slots; capacity chosen at runtime.
///
/// Allocated once at construction, never resized.
pub struct Heap<T> {
    slots: Box<[Slot<T>]>,
}

impl<T> Heap<T> {
    /// Allocate `capacity` slots.
    ///
    /// Fails with `CapacityOverflow` if the byte size does not fit an
    /// allocation or the allocator refuses it.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let bytes = capacity
            .checked_mul(mem::size_of::<T>())
            .ok_or(Error::CapacityOverflow(capacity))?;
        if bytes > isize::MAX as usize {
            return Err(Error::CapacityOverflow(capacity));
        }

        // Build through a Vec to keep large rings off the stack.
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| Error::CapacityOverflow(capacity))?;
        slots.resize_with(capacity, Slot::new);

        Ok(Self {
            slots: slots.into_boxed_slice(),
        })
    }
}

// SAFETY: the boxed slice is never reallocated; each element is its own UnsafeCell.
unsafe impl<T> Storage<T> for Heap<T> {
    const KIND: &'static str = "heap";

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> *mut MaybeUninit<T> {
        debug_assert!(index < self.slots.len());
        self.slots.get_unchecked(index).get()
    }
}
