//! Core escrow types: points, lock records, identifiers.
//!
//! All amounts are u64 base units; bias/slope arithmetic uses i128
//! intermediates so that `amount * duration` products cannot overflow.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::MAX_LOCK_DURATION;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Identifier of a lock record. Allocated sequentially starting at 1;
/// zero is reserved as the "no lock" sentinel of the checkpoint engine.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct LockId(u64);

impl LockId {
    /// Wrap a raw id. The ledger only ever mints nonzero ids.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw numeric id.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock#{}", self.0)
    }
}

/// Opaque identifier of an external party (lock owner or delegatee).
///
/// Zero is the reserved [`PartyId::NONE`] sentinel marking a burned lock's
/// terminal un-delegation in the delegatee-history trace.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct PartyId(pub u64);

impl PartyId {
    /// The "no party" sentinel.
    pub const NONE: Self = Self(0);

    /// Whether this is the reserved sentinel.
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party#{}", self.0)
    }
}

/// A weight reading that decays linearly from the instant it was taken.
///
/// At elapsed time Δ since the point's checkpoint, the effective weight is
/// `max(0, bias − slope·Δ) + permanent`. The `permanent` component never
/// decays. Raw fields may transiently go negative inside the catch-up walk;
/// the effective slope is always clamped to ≥ 0 before a decay is applied.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Point {
    /// Decaying weight at the checkpoint instant.
    pub bias: i128,
    /// Decay rate per second.
    pub slope: i128,
    /// Non-decaying weight component.
    pub permanent: i128,
}

impl Point {
    /// The identity point (all fields zero).
    pub const ZERO: Self = Self { bias: 0, slope: 0, permanent: 0 };

    /// Compute a lock's point at instant `now`.
    ///
    /// - Permanent lock: the whole amount sits in `permanent`.
    /// - Active temporary lock: `slope = amount / MAX_LOCK_DURATION`
    ///   (integer division — dust amounts truncate to zero weight) and
    ///   `bias = slope · (end − now)`.
    /// - Expired or empty lock: zero.
    ///
    /// Pure; called symmetrically for the old and new state of a mutation so
    /// the checkpoint engine can subtract one contribution and add the other.
    pub fn from_lock(amount: u64, end: Timestamp, permanent: bool, now: Timestamp) -> Self {
        if permanent {
            return Self { bias: 0, slope: 0, permanent: amount as i128 };
        }
        if end > now && amount > 0 {
            let slope = (amount / MAX_LOCK_DURATION) as i128;
            Self { bias: slope * (end - now) as i128, slope, permanent: 0 }
        } else {
            Self::ZERO
        }
    }

    /// Effective weight at `ts`, given that this point was recorded at
    /// `point_ts`. Requires `ts >= point_ts`.
    pub fn weight_at(&self, point_ts: Timestamp, ts: Timestamp) -> u64 {
        let decayed = self.bias - self.slope.max(0) * (ts - point_ts) as i128;
        (decayed.max(0) + self.permanent) as u64
    }
}

/// A single escrow position.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct LockRecord {
    /// Escrowed amount in base units. Zero only for the pre-creation
    /// snapshot fed to the checkpoint engine.
    pub amount: u64,
    /// Creation time.
    pub start: Timestamp,
    /// Expiry, rounded down to the clock unit. Zero while permanent.
    pub end: Timestamp,
    /// Whether the lock never decays.
    pub permanent: bool,
}

impl LockRecord {
    /// Whether the lock's weight has run out. Permanent locks never expire.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        !self.permanent && now >= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CLOCK_UNIT, UNIT};
    use proptest::prelude::*;

    const NOW: Timestamp = 1_700_000_000;

    // --- Point::from_lock ---

    #[test]
    fn permanent_point_holds_full_amount() {
        let p = Point::from_lock(500 * UNIT, 0, true, NOW);
        assert_eq!(p.bias, 0);
        assert_eq!(p.slope, 0);
        assert_eq!(p.permanent, (500 * UNIT) as i128);
    }

    #[test]
    fn active_point_decays_to_zero_at_end() {
        let amount = 1_000 * UNIT;
        let end = NOW + MAX_LOCK_DURATION;
        let p = Point::from_lock(amount, end, false, NOW);
        assert!(p.slope > 0);
        assert_eq!(p.bias, p.slope * MAX_LOCK_DURATION as i128);
        assert_eq!(p.weight_at(NOW, end), 0);
    }

    #[test]
    fn expired_point_is_zero() {
        assert_eq!(Point::from_lock(1_000 * UNIT, NOW, false, NOW), Point::ZERO);
        assert_eq!(Point::from_lock(1_000 * UNIT, NOW - 1, false, NOW), Point::ZERO);
    }

    #[test]
    fn empty_point_is_zero() {
        assert_eq!(Point::from_lock(0, NOW + CLOCK_UNIT, false, NOW), Point::ZERO);
    }

    #[test]
    fn dust_amount_truncates_to_zero_weight() {
        // Below MAX_LOCK_DURATION base units the integer slope is zero, so
        // the bias is zero too: dust locks carry no voting weight.
        let p = Point::from_lock(MAX_LOCK_DURATION - 1, NOW + MAX_LOCK_DURATION, false, NOW);
        assert_eq!(p, Point::ZERO);
        let p = Point::from_lock(MAX_LOCK_DURATION, NOW + MAX_LOCK_DURATION, false, NOW);
        assert_eq!(p.slope, 1);
    }

    #[test]
    fn bias_close_to_amount_for_full_horizon() {
        let amount = 1_000 * UNIT;
        let p = Point::from_lock(amount, NOW + MAX_LOCK_DURATION, false, NOW);
        let bias = p.bias as u64;
        assert!(bias <= amount);
        // Truncation loses at most MAX_LOCK_DURATION base units.
        assert!(amount - bias < MAX_LOCK_DURATION);
    }

    // --- weight_at ---

    #[test]
    fn weight_at_clamps_past_expiry() {
        let end = NOW + 4 * CLOCK_UNIT;
        let p = Point::from_lock(1_000 * UNIT, end, false, NOW);
        assert_eq!(p.weight_at(NOW, end + CLOCK_UNIT), 0);
    }

    #[test]
    fn weight_at_adds_permanent() {
        let p = Point { bias: 10, slope: 1, permanent: 100 };
        assert_eq!(p.weight_at(0, 5), 105);
        assert_eq!(p.weight_at(0, 50), 100);
    }

    #[test]
    fn weight_at_ignores_negative_slope() {
        let p = Point { bias: 10, slope: -3, permanent: 0 };
        assert_eq!(p.weight_at(0, 100), 10);
    }

    // --- LockRecord ---

    #[test]
    fn permanent_lock_never_expires() {
        let lock = LockRecord { amount: UNIT, start: NOW, end: 0, permanent: true };
        assert!(!lock.is_expired(u64::MAX));
    }

    #[test]
    fn temporary_lock_expires_exactly_at_end() {
        let lock = LockRecord { amount: UNIT, start: NOW, end: NOW + CLOCK_UNIT, permanent: false };
        assert!(!lock.is_expired(NOW + CLOCK_UNIT - 1));
        assert!(lock.is_expired(NOW + CLOCK_UNIT));
    }

    #[test]
    fn party_none_sentinel() {
        assert!(PartyId::NONE.is_none());
        assert!(!PartyId(1).is_none());
        assert_eq!(PartyId::default(), PartyId::NONE);
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn weight_monotonically_decreases(
            amount in 1u64..=u64::MAX / 2,
            horizon in 1u64..=MAX_LOCK_DURATION,
            t1 in 0u64..=MAX_LOCK_DURATION,
            t2 in 0u64..=MAX_LOCK_DURATION,
        ) {
            let end = NOW + horizon;
            let p = Point::from_lock(amount, end, false, NOW);
            let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            prop_assert!(p.weight_at(NOW, NOW + lo) >= p.weight_at(NOW, NOW + hi));
        }

        #[test]
        fn weight_never_exceeds_amount(
            amount in 1u64..=u64::MAX / 2,
            horizon in 1u64..=MAX_LOCK_DURATION,
            elapsed in 0u64..=2 * MAX_LOCK_DURATION,
        ) {
            let p = Point::from_lock(amount, NOW + horizon, false, NOW);
            prop_assert!(p.weight_at(NOW, NOW + elapsed) <= amount);
        }

        #[test]
        fn permanent_weight_is_flat(
            amount in 0u64..=u64::MAX / 2,
            elapsed in 0u64..=10 * MAX_LOCK_DURATION,
        ) {
            let p = Point::from_lock(amount, 0, true, NOW);
            prop_assert_eq!(p.weight_at(NOW, NOW + elapsed), amount);
        }
    }
}
