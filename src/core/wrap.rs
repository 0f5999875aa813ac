//! Policy wraparound untuk cursor ring (bitmask atau branch).
//!
//! The policy is a type parameter of the channel, so the choice between a
//! bitmask and a compare-and-reset is made at compile time and the mask path
//! carries no branch.

use crate::error::{Error, Result};

mod sealed {
    pub trait Sealed {}
}

/// How a cursor steps past the last slot.
///
/// Sealed: the channel trusts `advance` to stay inside `[0, capacity)` when it
/// indexes storage without bounds checks.
pub trait Wrap: sealed::Sealed + 'static {
    /// Short name used in logs and benchmark output.
    const NAME: &'static str;

    /// Rejects capacities this policy cannot index.
    fn validate(capacity: usize) -> Result<()>;

    /// The slot after `index`.
    fn advance(index: usize, capacity: usize) -> usize;

    /// Number of steps from `from` forward to `to`, i.e. `(to - from) mod capacity`.
    fn distance(from: usize, to: usize, capacity: usize) -> usize;
}

/// Bitmask wraparound. Capacity must be a power of two.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mask;

/// Conditional wraparound. Any capacity of at least one slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Branch;

impl sealed::Sealed for Mask {}
impl sealed::Sealed for Branch {}

impl Wrap for Mask {
    const NAME: &'static str = "mask";

    fn validate(capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        if !capacity.is_power_of_two() {
            return Err(Error::NotPowerOfTwo(capacity));
        }
        Ok(())
    }

    #[inline(always)]
    fn advance(index: usize, capacity: usize) -> usize {
        (index + 1) & (capacity - 1)
    }

    #[inline(always)]
    fn distance(from: usize, to: usize, capacity: usize) -> usize {
        to.wrapping_sub(from) & (capacity - 1)
    }
}

impl Wrap for Branch {
    const NAME: &'static str = "branch";

    fn validate(capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        Ok(())
    }

    #[inline(always)]
    fn advance(index: usize, capacity: usize) -> usize {
        let next = index + 1;
        if next == capacity {
            0
        } else {
            next
        }
    }

    #[inline(always)]
    fn distance(from: usize, to: usize, capacity: usize) -> usize {
        if to >= from {
            to - from
        } else {
            capacity - from + to
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_rejects_bad_capacity() {
        assert!(matches!(Mask::validate(0), Err(Error::ZeroCapacity)));
        assert!(matches!(Mask::validate(6), Err(Error::NotPowerOfTwo(6))));
        assert!(Mask::validate(1).is_ok());
        assert!(Mask::validate(1024).is_ok());
    }

    #[test]
    fn test_branch_accepts_any_nonzero() {
        assert!(matches!(Branch::validate(0), Err(Error::ZeroCapacity)));
        assert!(Branch::validate(1).is_ok());
        assert!(Branch::validate(6).is_ok());
        assert!(Branch::validate(1000).is_ok());
    }

    #[test]
    fn test_advance_wraps_at_capacity() {
        assert_eq!(Mask::advance(2, 4), 3);
        assert_eq!(Mask::advance(3, 4), 0);
        assert_eq!(Branch::advance(4, 6), 5);
        assert_eq!(Branch::advance(5, 6), 0);
        // Single slot: every step lands back on slot 0.
        assert_eq!(Mask::advance(0, 1), 0);
        assert_eq!(Branch::advance(0, 1), 0);
    }

    #[test]
    fn test_policies_agree_on_power_of_two() {
        for from in 0..8 {
            for to in 0..8 {
                assert_eq!(Mask::distance(from, to, 8), Branch::distance(from, to, 8));
            }
            assert_eq!(Mask::advance(from, 8), Branch::advance(from, 8));
        }
    }

    #[test]
    fn test_distance_across_wrap() {
        assert_eq!(Branch::distance(4, 1, 6), 3);
        assert_eq!(Branch::distance(2, 2, 6), 0);
        assert_eq!(Mask::distance(3, 1, 4), 2);
    }
}
