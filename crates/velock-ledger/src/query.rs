//! Historical queries.
//!
//! All reads here are pure: they replay the catch-up walk in local
//! variables from the last checkpoint at or before the query instant and
//! never persist anything. A lock's own weight needs no walk at all — its
//! decay is a pure function of the last recorded point.

use velock_core::types::{LockId, PartyId, Timestamp};

use crate::ledger::EscrowLedger;
use crate::schedule::SlopeSchedule;
use crate::walker;

impl EscrowLedger {
    /// Lock `id`'s decayed weight at instant `ts`.
    ///
    /// Zero before the lock existed, after it expired, and forever after it
    /// was claimed, merged away, or split away.
    pub fn balance_of_lock_at(&self, id: LockId, ts: Timestamp) -> u64 {
        self.lock_traces
            .get(&id)
            .and_then(|t| t.upper_lookup_recent(ts))
            .map(|cp| cp.value.weight_at(cp.ts, ts))
            .unwrap_or(0)
    }

    /// Aggregate weight delegated to `delegatee` at instant `ts`.
    pub fn past_votes(&self, delegatee: PartyId, ts: Timestamp) -> u64 {
        let Some(trace) = self.delegatee_traces.get(&delegatee) else {
            return 0;
        };
        let Some(cp) = trace.upper_lookup_recent(ts) else {
            return 0;
        };
        let empty = SlopeSchedule::new();
        let schedule = self.delegatee_schedules.get(&delegatee).unwrap_or(&empty);
        let point = walker::catch_up(cp.ts, cp.value, ts, schedule, None);
        (point.bias.max(0) + point.permanent) as u64
    }

    /// Global aggregate weight at instant `ts`.
    pub fn past_total_supply(&self, ts: Timestamp) -> u64 {
        let Some(cp) = self.global_trace.upper_lookup_recent(ts) else {
            return 0;
        };
        let point = walker::catch_up(cp.ts, cp.value, ts, &self.global_schedule, None);
        (point.bias.max(0) + point.permanent) as u64
    }

    /// The party lock `id` delegated to as of instant `ts`, if the lock
    /// existed (and had not been burned) at that instant.
    pub fn delegatee_of_at(&self, id: LockId, ts: Timestamp) -> Option<PartyId> {
        self.delegatee_history
            .get(&id)
            .and_then(|t| t.upper_lookup_recent(ts))
            .map(|cp| cp.value)
            .filter(|d| !d.is_none())
    }
}
