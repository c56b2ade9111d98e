// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Expiration times: priorities expressed as deadlines.
//!
//! An [`ExpirationTime`] is a deadline in 10 ms units, offset by two so that
//! the two smallest values can carry meaning of their own:
//!
//! - [`NO_WORK`](ExpirationTime::NO_WORK) (`0`): nothing is pending.
//! - [`SYNC`](ExpirationTime::SYNC) (`1`): must run before the call returns.
//! - everything above is a real deadline; [`NEVER`](ExpirationTime::NEVER)
//!   is the latest possible one.
//!
//! Smaller values run first. Deadlines are rounded up to buckets so that
//! updates scheduled close together share one expiration time and are
//! flushed in one pass.

use core::fmt;

/// Size of one expiration unit in milliseconds.
const UNIT_SIZE: u64 = 10;
/// Offset keeping real deadlines clear of `NO_WORK` and `SYNC`.
const MAGIC_NUMBER_OFFSET: u32 = 2;

/// A priority expressed as a deadline. Smaller values are more urgent.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ExpirationTime(pub u32);

impl ExpirationTime {
    /// No pending work.
    pub const NO_WORK: Self = Self(0);
    /// Synchronous work.
    pub const SYNC: Self = Self(1);
    /// The latest possible deadline.
    pub const NEVER: Self = Self(u32::MAX);

    /// Converts elapsed milliseconds into the current expiration time.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "clamped to the u32 range before narrowing"
    )]
    pub const fn from_ms(ms: u64) -> Self {
        let units = ms / UNIT_SIZE;
        let max = (u32::MAX - MAGIC_NUMBER_OFFSET - 1) as u64;
        let units = if units > max { max } else { units };
        Self(units as u32 + MAGIC_NUMBER_OFFSET)
    }

    /// Converts this expiration time back into elapsed milliseconds.
    #[inline]
    #[must_use]
    pub const fn to_ms(self) -> u64 {
        (self.0.saturating_sub(MAGIC_NUMBER_OFFSET)) as u64 * UNIT_SIZE
    }

    /// Computes a bucketed deadline `expiration_ms` after `current`, rounded
    /// up to a multiple of `bucket_ms`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "bucketed deadlines are saturated into the u32 range"
    )]
    pub const fn bucket(current: Self, expiration_ms: u64, bucket_ms: u64) -> Self {
        let precision = bucket_ms / UNIT_SIZE;
        let precision = if precision == 0 { 1 } else { precision };
        let num =
            (current.0.saturating_sub(MAGIC_NUMBER_OFFSET)) as u64 + expiration_ms / UNIT_SIZE;
        let ceiling = (num / precision + 1) * precision;
        let value = ceiling + MAGIC_NUMBER_OFFSET as u64;
        if value >= u32::MAX as u64 {
            Self(u32::MAX - 1)
        } else {
            Self(value as u32)
        }
    }

    /// Returns whether this is [`NO_WORK`](Self::NO_WORK).
    #[inline]
    #[must_use]
    pub const fn is_no_work(self) -> bool {
        self.0 == Self::NO_WORK.0
    }

    /// Returns whether this is [`SYNC`](Self::SYNC).
    #[inline]
    #[must_use]
    pub const fn is_sync(self) -> bool {
        self.0 == Self::SYNC.0
    }

    /// Returns whether work at this expiration time should run in a render
    /// bounded by `limit` (both pending and not later than the limit).
    #[inline]
    #[must_use]
    pub const fn within(self, limit: Self) -> bool {
        self.0 != Self::NO_WORK.0 && self.0 <= limit.0
    }

    /// Returns whether the deadline has passed at `now`.
    #[inline]
    #[must_use]
    pub const fn has_expired(self, now: Self) -> bool {
        self.0 != Self::NO_WORK.0 && self.0 <= now.0
    }

    /// Returns the more urgent of two pending expiration times, treating
    /// [`NO_WORK`](Self::NO_WORK) as absent.
    #[inline]
    #[must_use]
    pub const fn most_urgent(self, other: Self) -> Self {
        if self.0 == Self::NO_WORK.0 || (other.0 != Self::NO_WORK.0 && other.0 < self.0) {
            other
        } else {
            self
        }
    }
}

impl fmt::Debug for ExpirationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NO_WORK => f.write_str("ExpirationTime(NoWork)"),
            Self::SYNC => f.write_str("ExpirationTime(Sync)"),
            Self::NEVER => f.write_str("ExpirationTime(Never)"),
            Self(t) => write!(f, "ExpirationTime({t})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_conversion_uses_unit_and_offset() {
        assert_eq!(ExpirationTime::from_ms(0), ExpirationTime(2));
        assert_eq!(ExpirationTime::from_ms(15), ExpirationTime(3));
        assert_eq!(ExpirationTime::from_ms(1000), ExpirationTime(102));
        assert_eq!(ExpirationTime(102).to_ms(), 1000);
    }

    #[test]
    fn reserved_values_sort_first() {
        assert!(ExpirationTime::NO_WORK < ExpirationTime::SYNC);
        assert!(ExpirationTime::SYNC < ExpirationTime::from_ms(0));
        assert!(ExpirationTime::from_ms(u64::MAX) < ExpirationTime::NEVER);
    }

    #[test]
    fn bucket_rounds_up() {
        let now = ExpirationTime::from_ms(0);
        // 5000 ms in 250 ms buckets: (0 + 500) / 25 + 1 = 21 buckets.
        assert_eq!(ExpirationTime::bucket(now, 5000, 250), ExpirationTime(527));
        // Updates a few ms apart land in the same bucket.
        let later = ExpirationTime::from_ms(40);
        assert_eq!(
            ExpirationTime::bucket(later, 5000, 250),
            ExpirationTime::bucket(now, 5000, 250)
        );
    }

    #[test]
    fn interactive_bucket_is_earlier_than_async() {
        let now = ExpirationTime::from_ms(1234);
        let interactive = ExpirationTime::bucket(now, 150, 100);
        let deferred = ExpirationTime::bucket(now, 5000, 250);
        assert!(interactive < deferred);
        assert!(interactive > now);
    }

    #[test]
    fn most_urgent_ignores_no_work() {
        let a = ExpirationTime(50);
        assert_eq!(ExpirationTime::NO_WORK.most_urgent(a), a);
        assert_eq!(a.most_urgent(ExpirationTime::NO_WORK), a);
        assert_eq!(a.most_urgent(ExpirationTime::SYNC), ExpirationTime::SYNC);
    }

    #[test]
    fn within_and_expiry() {
        let limit = ExpirationTime(40);
        assert!(ExpirationTime(40).within(limit));
        assert!(!ExpirationTime(41).within(limit));
        assert!(!ExpirationTime::NO_WORK.within(limit));
        assert!(ExpirationTime(30).has_expired(ExpirationTime(30)));
        assert!(!ExpirationTime(31).has_expired(ExpirationTime(30)));
    }
}
