//! Lock-Free Single-Producer Single-Consumer (SPSC) Ring Channel
//!
//! Implementasi Lamport Queue dengan cached cursor di tiap sisi.
//! Tidak ada Mutex, tidak ada alokasi setelah inisialisasi.
//!
//! Fixed capacity `C` slots, one of which always stays empty: the channel is
//! empty when `read == write` and full when advancing `write` would land on
//! `read`, so at most `C - 1` elements are live at once and no separate
//! counter is needed.
//!
//! # Ordering
//!
//! ```text
//! producer: write slot, Release-store write  ->  consumer: Acquire-load write, read slot
//! consumer: read slot,  Release-store read   ->  producer: Acquire-load read,  write slot
//! ```
//!
//! Each side also keeps a cached copy of the other side's cursor and only
//! reloads the real one when the cached value says "maybe full" / "maybe
//! empty", which keeps the fast path off the other core's cache line.
//!
//! # Roles
//!
//! Producer-only and consumer-only operations live on [`Producer`] and
//! [`Consumer`], obtained from [`RingChannel::split`]. Both take `&mut self`,
//! so a second producer or consumer cannot exist while the pair is alive.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::mmap_storage::Mapped;
use super::padding::CacheLinePadded;
use super::storage::{Heap, Inline, Storage};
use super::wrap::{Mask, Wrap};
use crate::error;
use crate::trace::{debug, trace};

/// Bounded SPSC ring of `T`, stored in `S`, wrapping by policy `W`.
#[repr(C)]
pub struct RingChannel<T, S: Storage<T>, W: Wrap = Mask> {
    // Consumer-owned cursor: next slot to read.
    read: CacheLinePadded<AtomicUsize>,
    // Producer's last observed value of `read`.
    read_cached: CacheLinePadded<Cell<usize>>,
    // Producer-owned cursor: next slot to write.
    write: CacheLinePadded<AtomicUsize>,
    // Consumer's last observed value of `write`.
    write_cached: CacheLinePadded<Cell<usize>>,
    storage: S,
    _marker: PhantomData<(T, W)>,
}

/// Channel with slots embedded in the value; `N` slots, `N - 1` usable.
pub type InlineChannel<T, const N: usize, W = Mask> = RingChannel<T, Inline<T, N>, W>;

/// Channel with a heap slice sized at runtime.
pub type HeapChannel<T, W = Mask> = RingChannel<T, Heap<T>, W>;

/// Channel with slots in an anonymous memory map.
pub type MappedChannel<T, W = Mask> = RingChannel<T, Mapped<T>, W>;

// SAFETY: the cursor protocol hands each slot to exactly one side at a time,
// and the `Cell` caches are each touched by one role only. Role exclusivity
// comes from `split` borrowing the channel mutably.
unsafe impl<T: Send, S: Storage<T> + Send, W: Wrap> Send for RingChannel<T, S, W> {}
unsafe impl<T: Send, S: Storage<T> + Send, W: Wrap> Sync for RingChannel<T, S, W> {}

impl<T, S: Storage<T>, W: Wrap> RingChannel<T, S, W> {
    /// Build a channel over `storage`.
    ///
    /// Fails if the storage capacity is not valid for `W`. No slot is
    /// initialised; the channel starts empty.
    pub fn with_storage(storage: S) -> error::Result<Self> {
        let capacity = storage.capacity();
        W::validate(capacity)?;

        debug!(
            capacity,
            wrap = W::NAME,
            storage = S::KIND,
            "ring channel created"
        );

        Ok(Self {
            read: CacheLinePadded::new(AtomicUsize::new(0)),
            read_cached: CacheLinePadded::new(Cell::new(0)),
            write: CacheLinePadded::new(AtomicUsize::new(0)),
            write_cached: CacheLinePadded::new(Cell::new(0)),
            storage,
            _marker: PhantomData,
        })
    }

    /// Hand out the producer and consumer roles.
    ///
    /// The handles borrow the channel; once both are dropped the channel can
    /// be split again and picks up where it left off.
    pub fn split(&mut self) -> (Producer<'_, T, S, W>, Consumer<'_, T, S, W>) {
        let ring = &*self;
        (Producer { ring }, Consumer { ring })
    }

    /// Number of slots, including the one that always stays empty.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Largest number of elements the channel can hold at once.
    #[inline(always)]
    pub fn usable_capacity(&self) -> usize {
        self.capacity() - 1
    }

    /// Snapshot of the number of live elements.
    ///
    /// Advisory only while the other side is running.
    #[inline]
    pub fn len(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        W::distance(read, write, self.capacity())
    }

    /// Snapshot emptiness check; advisory while the other side is running.
    #[inline]
    pub fn is_empty(&self) -> bool {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        read == write
    }

    /// Snapshot fullness check; advisory while the other side is running.
    #[inline]
    pub fn is_full(&self) -> bool {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        W::advance(write, self.capacity()) == read
    }

    /// Producer side: find the slot to write and the cursor value that publishes it.
    #[inline(always)]
    fn claim_write(&self) -> Option<(usize, usize)> {
        // Only the producer stores `write`.
        let write = self.write.load(Ordering::Relaxed);
        let next = W::advance(write, self.capacity());

        if next == self.read_cached.get() {
            self.read_cached.set(self.read.load(Ordering::Acquire));
            if next == self.read_cached.get() {
                return None;
            }
        }

        Some((write, next))
    }

    /// Consumer side: find the slot to read.
    #[inline(always)]
    fn claim_read(&self) -> Option<usize> {
        // Only the consumer stores `read`.
        let read = self.read.load(Ordering::Relaxed);

        if read == self.write_cached.get() {
            self.write_cached.set(self.write.load(Ordering::Acquire));
            if read == self.write_cached.get() {
                return None;
            }
        }

        Some(read)
    }
}

impl<T, const N: usize, W: Wrap> RingChannel<T, Inline<T, N>, W> {
    /// Channel with `N` slots embedded in the value.
    pub fn new() -> error::Result<Self> {
        Self::with_storage(Inline::new())
    }
}

impl<T, W: Wrap> RingChannel<T, Heap<T>, W> {
    /// Channel with `capacity` heap slots.
    pub fn with_capacity(capacity: usize) -> error::Result<Self> {
        W::validate(capacity)?;
        Self::with_storage(Heap::with_capacity(capacity)?)
    }
}

impl<T, W: Wrap> RingChannel<T, Mapped<T>, W> {
    /// Channel with `capacity` slots in an anonymous memory map.
    pub fn mapped(capacity: usize) -> error::Result<Self> {
        W::validate(capacity)?;
        Self::with_storage(Mapped::with_capacity(capacity)?)
    }
}

impl<T, S: Storage<T>, W: Wrap> Drop for RingChannel<T, S, W> {
    fn drop(&mut self) {
        let capacity = self.capacity();
        let write = *self.write.get_mut();
        let mut read = *self.read.get_mut();

        trace!(
            live = W::distance(read, write, capacity),
            "dropping ring channel"
        );

        if std::mem::needs_drop::<T>() {
            while read != write {
                // SAFETY: slots in [read, write) hold live values and nobody
                // else can reach them through `&mut self`.
                unsafe { (*self.storage.slot(read)).assume_init_drop() };
                read = W::advance(read, capacity);
            }
        }
    }
}

impl<T, S: Storage<T>, W: Wrap> fmt::Debug for RingChannel<T, S, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingChannel")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("wrap", &W::NAME)
            .field("storage", &S::KIND)
            .finish()
    }
}

/// Producer role of a [`RingChannel`].
pub struct Producer<'a, T, S: Storage<T>, W: Wrap = Mask> {
    ring: &'a RingChannel<T, S, W>,
}

impl<'a, T, S: Storage<T>, W: Wrap> Producer<'a, T, S, W> {
    /// Push `value`, or hand it back if the channel is full.
    ///
    /// Wait-free and allocation-free. A full channel is left untouched.
    #[inline(always)]
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        let Some((index, next)) = self.ring.claim_write() else {
            return Err(value);
        };

        // SAFETY: `index` is outside [read, write), so the consumer is not
        // looking at it and it holds no live value.
        unsafe { (*self.ring.storage.slot(index)).write(value) };
        self.ring.write.store(next, Ordering::Release);

        Ok(())
    }

    /// Build the element directly in its slot.
    ///
    /// `make` runs only after a slot has been claimed; on a full channel it is
    /// returned without being called.
    #[inline(always)]
    pub fn try_emplace<F>(&mut self, make: F) -> Result<(), F>
    where
        F: FnOnce() -> T,
    {
        let Some((index, next)) = self.ring.claim_write() else {
            return Err(make);
        };

        // SAFETY: as in `try_push`.
        unsafe { (*self.ring.storage.slot(index)).write(make()) };
        self.ring.write.store(next, Ordering::Release);

        Ok(())
    }

    /// Number of slots, including the one that always stays empty.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Largest number of elements the channel can hold at once.
    pub fn usable_capacity(&self) -> usize {
        self.ring.usable_capacity()
    }

    /// Snapshot of the number of live elements.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Snapshot emptiness check.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Snapshot fullness check; the consumer may free a slot at any moment.
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }
}

/// Consumer role of a [`RingChannel`].
pub struct Consumer<'a, T, S: Storage<T>, W: Wrap = Mask> {
    ring: &'a RingChannel<T, S, W>,
}

impl<'a, T, S: Storage<T>, W: Wrap> Consumer<'a, T, S, W> {
    /// Pop the oldest element, or `None` if the channel is empty.
    ///
    /// Wait-free and allocation-free. An empty channel is left untouched.
    #[inline(always)]
    pub fn try_pop(&mut self) -> Option<T> {
        let index = self.ring.claim_read()?;

        // SAFETY: `index` is in [read, write): the producer published it with
        // a Release store we Acquire-loaded, and won't reuse it until `read`
        // moves past it below.
        let value = unsafe { (*self.ring.storage.slot(index)).assume_init_read() };
        self.ring
            .read
            .store(W::advance(index, self.ring.capacity()), Ordering::Release);

        Some(value)
    }

    /// Pop into `out`. Returns `false` and leaves `out` alone when empty.
    #[inline(always)]
    pub fn try_pop_into(&mut self, out: &mut T) -> bool {
        match self.try_pop() {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Number of slots, including the one that always stays empty.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Largest number of elements the channel can hold at once.
    pub fn usable_capacity(&self) -> usize {
        self.ring.usable_capacity()
    }

    /// Snapshot of the number of live elements.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Snapshot emptiness check; the producer may publish at any moment.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Snapshot fullness check.
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wrap::Branch;
    use crate::error::{Error, Result};

    #[test]
    fn test_basic_push_pop() {
        let mut ch: InlineChannel<u64, 16> = RingChannel::new().unwrap();
        let (mut tx, mut rx) = ch.split();

        assert!(rx.is_empty());
        assert!(!tx.is_full());

        assert!(tx.try_push(42).is_ok());
        assert!(!rx.is_empty());

        assert_eq!(rx.try_pop(), Some(42));
        assert!(rx.is_empty());
    }

    #[test]
    fn test_full_buffer_keeps_one_slot_empty() {
        let mut ch: InlineChannel<u64, 4> = RingChannel::new().unwrap();
        assert_eq!(ch.usable_capacity(), 3);
        let (mut tx, mut rx) = ch.split();

        assert!(tx.try_push(1).is_ok());
        assert!(tx.try_push(2).is_ok());
        assert!(tx.try_push(3).is_ok());

        assert!(tx.is_full());
        assert_eq!(tx.try_push(4), Err(4));
        assert_eq!(tx.len(), 3);

        assert_eq!(rx.try_pop(), Some(1));
        assert!(tx.try_push(4).is_ok());
    }

    #[test]
    fn test_consumer_sees_full_and_usable_capacity() {
        let mut ch: HeapChannel<u8, Branch> = RingChannel::with_capacity(3).unwrap();
        let (mut tx, mut rx) = ch.split();

        assert_eq!(rx.capacity(), 3);
        assert_eq!(rx.usable_capacity(), 2);
        assert!(!rx.is_full());

        tx.try_push(1).unwrap();
        tx.try_push(2).unwrap();
        assert!(rx.is_full());
        assert_eq!(rx.len(), 2);

        assert_eq!(rx.try_pop(), Some(1));
        assert!(!rx.is_full());
    }

    #[test]
    fn test_heap_overflow_is_an_error() {
        let huge: Result<HeapChannel<u64>> = RingChannel::with_capacity(1 << 62);
        assert!(matches!(huge, Err(Error::CapacityOverflow(c)) if c == 1 << 62));
    }

    #[test]
    fn test_wraparound() {
        let mut ch: InlineChannel<u64, 4> = RingChannel::new().unwrap();
        let (mut tx, mut rx) = ch.split();

        for round in 0..10 {
            for i in 0..3 {
                assert!(tx.try_push(round * 3 + i).is_ok());
            }
            for i in 0..3 {
                assert_eq!(rx.try_pop(), Some(round * 3 + i));
            }
        }
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_branch_wrap_odd_capacity() {
        let mut ch: HeapChannel<u32, Branch> = RingChannel::with_capacity(5).unwrap();
        let (mut tx, mut rx) = ch.split();

        for round in 0..7u32 {
            for i in 0..4 {
                assert!(tx.try_push(round * 10 + i).is_ok());
            }
            assert!(tx.try_push(99).is_err());
            assert_eq!(tx.len(), 4);
            for i in 0..4 {
                assert_eq!(rx.try_pop(), Some(round * 10 + i));
            }
        }
    }

    #[test]
    fn test_single_slot_is_always_full() {
        let mut ch: InlineChannel<u8, 1> = RingChannel::new().unwrap();
        assert_eq!(ch.usable_capacity(), 0);
        let (mut tx, mut rx) = ch.split();

        assert_eq!(tx.try_push(7), Err(7));
        assert_eq!(rx.try_pop(), None);
        assert!(tx.is_full());
        assert!(rx.is_empty());
    }

    #[test]
    fn test_construction_errors() {
        let zero: Result<InlineChannel<u8, 0>> = RingChannel::new();
        assert!(matches!(zero, Err(Error::ZeroCapacity)));

        let odd: Result<HeapChannel<u8>> = RingChannel::with_capacity(12);
        assert!(matches!(odd, Err(Error::NotPowerOfTwo(12))));

        let odd_branch: Result<HeapChannel<u8, Branch>> = RingChannel::with_capacity(12);
        assert!(odd_branch.is_ok());

        let mapped_zero: Result<MappedChannel<u8, Branch>> = RingChannel::mapped(0);
        assert!(matches!(mapped_zero, Err(Error::ZeroCapacity)));
    }

    #[test]
    fn test_emplace_skips_constructor_when_full() {
        let mut ch: InlineChannel<String, 2> = RingChannel::new().unwrap();
        let (mut tx, mut rx) = ch.split();

        assert!(tx.try_emplace(|| "first".repeat(2)).is_ok());

        let mut called = false;
        let rejected = tx.try_emplace(|| {
            called = true;
            String::from("second")
        });
        assert!(rejected.is_err());
        assert!(!called);

        assert_eq!(rx.try_pop().as_deref(), Some("firstfirst"));
    }

    #[test]
    fn test_pop_into_leaves_out_untouched_when_empty() {
        let mut ch: InlineChannel<i32, 4> = RingChannel::new().unwrap();
        let (mut tx, mut rx) = ch.split();

        let mut out = -1;
        assert!(!rx.try_pop_into(&mut out));
        assert_eq!(out, -1);

        tx.try_push(5).unwrap();
        assert!(rx.try_pop_into(&mut out));
        assert_eq!(out, 5);
    }

    #[test]
    fn test_resplit_keeps_contents() {
        let mut ch: HeapChannel<u32> = RingChannel::with_capacity(8).unwrap();
        {
            let (mut tx, _) = ch.split();
            for i in 0..5 {
                tx.try_push(i).unwrap();
            }
        }
        assert_eq!(ch.len(), 5);

        let (_, mut rx) = ch.split();
        for i in 0..5 {
            assert_eq!(rx.try_pop(), Some(i));
        }
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_cursor_fields_on_separate_lines() {
        use crate::core::padding::CACHE_LINE_SIZE;

        let ch: InlineChannel<u8, 4> = RingChannel::new().unwrap();
        let fields = [
            &*ch.read as *const AtomicUsize as usize,
            &*ch.read_cached as *const Cell<usize> as usize,
            &*ch.write as *const AtomicUsize as usize,
            &*ch.write_cached as *const Cell<usize> as usize,
        ];
        for pair in fields.windows(2) {
            assert_eq!(pair[1] - pair[0], CACHE_LINE_SIZE);
        }
    }

    #[test]
    fn test_debug_format() {
        let mut ch: HeapChannel<u8, Branch> = RingChannel::with_capacity(3).unwrap();
        ch.split().0.try_push(1).unwrap();
        let text = format!("{:?}", ch);
        assert_eq!(
            text,
            "RingChannel { capacity: 3, len: 1, wrap: \"branch\", storage: \"heap\" }"
        );
    }
}
