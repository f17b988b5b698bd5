//! Sparse slope schedules.
//!
//! A schedule maps a (clock-unit-aligned) expiry timestamp to the pending
//! slope delta the catch-up walker applies when it reaches that instant.
//! Deltas at an expiry are negative: the decay rate drops when a lock runs
//! out. Missing keys read as zero, so only timestamps where some lock
//! actually expires occupy storage.
//!
//! Entries are never removed. Historical queries replay the walk from an
//! old checkpoint and need every delta that was in force at the time; the
//! guards in the checkpoint engine (`end > now`) ensure a key is only ever
//! rewritten while it still lies in the future, which keeps old replay
//! windows immutable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use velock_core::types::Timestamp;

/// Sparse map from expiry timestamp to pending slope delta.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct SlopeSchedule {
    deltas: BTreeMap<Timestamp, i128>,
}

impl SlopeSchedule {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pending delta at exactly `ts` (zero if none is scheduled).
    pub fn delta_at(&self, ts: Timestamp) -> i128 {
        self.deltas.get(&ts).copied().unwrap_or(0)
    }

    /// Accumulate `delta` into the entry at `ts`.
    pub fn add(&mut self, ts: Timestamp, delta: i128) {
        if delta != 0 {
            *self.deltas.entry(ts).or_insert(0) += delta;
        }
    }

    /// Number of scheduled timestamps.
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}
