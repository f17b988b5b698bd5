//! Protocol constants. All escrowed amounts are in base units
//! (1 token = 10^8 base units).

/// Base units per whole token.
pub const UNIT: u64 = 100_000_000;

/// Rounding granularity for lock expiries: one week, in seconds.
///
/// Every expiry timestamp is snapped down to a multiple of this value,
/// which bounds the number of distinct slope-schedule entries.
pub const CLOCK_UNIT: u64 = 7 * 24 * 60 * 60;

/// Maximum lock horizon: four years, in seconds.
///
/// A lock's decay rate is `amount / MAX_LOCK_DURATION`, so a lock taken out
/// for the full horizon decays from its full amount to zero. Amounts below
/// `MAX_LOCK_DURATION` base units truncate to a zero rate and carry no
/// voting weight (a deliberate minimum-amount constraint, not a bug).
pub const MAX_LOCK_DURATION: u64 = 4 * 365 * 24 * 60 * 60;

/// Hard cap on lazy catch-up iterations per call.
///
/// A trace can be stale by at most `MAX_LOCK_DURATION` before every
/// scheduled slope change inside the walked window has been applied and the
/// aggregate has fully decayed, so one extra step past the horizon is
/// always enough to reach the target exactly.
///
/// # Examples
///
/// ```
/// use velock_core::constants::{CLOCK_UNIT, MAX_CATCH_UP_STEPS, MAX_LOCK_DURATION};
/// assert!(MAX_CATCH_UP_STEPS * CLOCK_UNIT > MAX_LOCK_DURATION);
/// ```
pub const MAX_CATCH_UP_STEPS: u64 = MAX_LOCK_DURATION / CLOCK_UNIT + 1;

/// Round a timestamp down to the clock-unit boundary.
///
/// # Examples
///
/// ```
/// use velock_core::constants::{round_to_unit, CLOCK_UNIT};
/// assert_eq!(round_to_unit(CLOCK_UNIT + 1), CLOCK_UNIT);
/// assert_eq!(round_to_unit(CLOCK_UNIT), CLOCK_UNIT);
/// assert_eq!(round_to_unit(CLOCK_UNIT - 1), 0);
/// ```
pub const fn round_to_unit(ts: u64) -> u64 {
    ts / CLOCK_UNIT * CLOCK_UNIT
}
