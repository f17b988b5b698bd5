//! Append-only, time-ordered checkpoint traces.
//!
//! A [`Trace`] is a strictly-increasing-by-key log of `(timestamp, value)`
//! pairs supporting O(log n) historical lookup. Two pushes at the same
//! timestamp update the last entry in place, so a burst of mutations inside
//! one clock tick collapses into a single checkpoint.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// How many entries to probe linearly from the tail before falling back to
/// a full binary search. Historical lookups usually target recent keys.
const TAIL_PROBE: usize = 8;

/// One recorded reading.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Checkpoint<V> {
    /// When the reading was taken.
    pub ts: Timestamp,
    /// The recorded value (a point, or a delegatee id).
    pub value: V,
}

/// An append-only, binary-searchable log of checkpoints.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Trace<V> {
    checkpoints: Vec<Checkpoint<V>>,
}

impl<V: Copy> Trace<V> {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self { checkpoints: Vec::new() }
    }

    /// Number of stored checkpoints.
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Whether no checkpoint has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// The most recent checkpoint, if any.
    pub fn latest(&self) -> Option<&Checkpoint<V>> {
        self.checkpoints.last()
    }

    /// The oldest checkpoint, if any.
    pub fn first(&self) -> Option<&Checkpoint<V>> {
        self.checkpoints.first()
    }

    /// The checkpoint at position `pos` (insertion order).
    pub fn at(&self, pos: usize) -> Option<&Checkpoint<V>> {
        self.checkpoints.get(pos)
    }

    /// Record `value` at `ts`.
    ///
    /// Overwrites the last entry if its key equals `ts`; appends otherwise.
    ///
    /// # Panics
    ///
    /// Panics if `ts` precedes the most recent key. Callers drive the trace
    /// with a monotone clock; a regression is a programming error, not an
    /// input to recover from.
    pub fn push(&mut self, ts: Timestamp, value: V) {
        if let Some(last) = self.checkpoints.last_mut() {
            assert!(ts >= last.ts, "checkpoint key regression: {ts} < {}", last.ts);
            if last.ts == ts {
                last.value = value;
                return;
            }
        }
        self.checkpoints.push(Checkpoint { ts, value });
    }

    /// The last checkpoint with key ≤ `ts`, or `None` if every stored key
    /// is later (or the trace is empty).
    ///
    /// Probes a few entries backward from the tail first — the common case
    /// is a query at or after the most recent key — then falls back to a
    /// binary search over the remaining prefix.
    pub fn upper_lookup_recent(&self, ts: Timestamp) -> Option<&Checkpoint<V>> {
        let mut hi = self.checkpoints.len();
        for _ in 0..TAIL_PROBE {
            if hi == 0 {
                return None;
            }
            if self.checkpoints[hi - 1].ts <= ts {
                return Some(&self.checkpoints[hi - 1]);
            }
            hi -= 1;
        }
        let idx = self.checkpoints[..hi].partition_point(|cp| cp.ts <= ts);
        if idx == 0 { None } else { Some(&self.checkpoints[idx - 1]) }
    }
}
