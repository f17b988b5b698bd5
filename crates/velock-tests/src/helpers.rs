//! Shared helpers for the invariant tests.

use std::collections::BTreeSet;

use velock_core::constants::CLOCK_UNIT;
use velock_core::types::{LockId, PartyId, Timestamp};
use velock_ledger::EscrowLedger;

/// A week-aligned genesis instant, far from zero so "before genesis"
/// queries are expressible.
pub const GENESIS: Timestamp = 2_800 * CLOCK_UNIT;

/// Sum of every live lock's weight at `ts`, recomputed lock by lock.
pub fn ground_truth_supply(ledger: &EscrowLedger, locks: &[LockId], ts: Timestamp) -> u64 {
    locks.iter().map(|&id| ledger.balance_of_lock_at(id, ts)).sum()
}

/// Sum of delegated votes over every distinct delegatee in use at `ts`.
pub fn ground_truth_votes(ledger: &EscrowLedger, locks: &[LockId], ts: Timestamp) -> u64 {
    let delegatees: BTreeSet<PartyId> = locks
        .iter()
        .filter_map(|&id| ledger.delegatee_of_at(id, ts))
        .collect();
    delegatees.iter().map(|&d| ledger.past_votes(d, ts)).sum()
}

/// Assert the two conservation invariants at `ts`, tolerating one base
/// unit of rounding dust per live lock.
pub fn assert_conservation(ledger: &EscrowLedger, locks: &[LockId], ts: Timestamp) {
    let tolerance = locks.len() as u64;
    let supply = ledger.past_total_supply(ts);

    let per_lock = ground_truth_supply(ledger, locks, ts);
    assert!(
        supply.abs_diff(per_lock) <= tolerance,
        "global conservation broken at {ts}: supply {supply} vs per-lock sum {per_lock}"
    );

    let per_delegatee = ground_truth_votes(ledger, locks, ts);
    assert!(
        supply.abs_diff(per_delegatee) <= tolerance,
        "delegation conservation broken at {ts}: supply {supply} vs votes sum {per_delegatee}"
    );
}
