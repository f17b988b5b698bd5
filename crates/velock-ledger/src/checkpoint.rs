//! Checkpoint orchestration: the single mutating entry point.
//!
//! Every lifecycle mutation funnels its old and new lock snapshots through
//! [`EscrowLedger::checkpoint_lock`], which re-points the global slope
//! schedule, swaps the lock's contribution inside its delegatee's trace,
//! records the lock's own new point, and catches up + updates the global
//! aggregate — in that order, all at the same `now`.

use velock_core::constants::round_to_unit;
use velock_core::types::{LockId, LockRecord, Point, Timestamp};

use crate::delegation::Direction;
use crate::ledger::EscrowLedger;
use crate::walker;

/// A lifecycle mutation's before/after snapshots of one lock.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LockUpdate {
    pub id: LockId,
    pub old: LockRecord,
    pub new: LockRecord,
}

impl EscrowLedger {
    /// Apply a lock mutation (or, with `update = None`, a bare global
    /// catch-up) at instant `now`.
    ///
    /// The new snapshot's end time is rounded down to the clock unit here;
    /// the old one was already rounded when it was stored. Callers must have
    /// validated every precondition — this routine only does arithmetic.
    pub(crate) fn checkpoint_lock(&mut self, update: Option<LockUpdate>, now: Timestamp) {
        let mut fold = None;

        if let Some(u) = update {
            let old_end = u.old.end;
            let new_end = round_to_unit(u.new.end);
            let u_old = Point::from_lock(u.old.amount, old_end, u.old.permanent, now);
            let u_new = Point::from_lock(u.new.amount, new_end, u.new.permanent, now);

            // Re-point the global schedule. Only future expiries may be
            // touched: past keys were already consumed by the walker and
            // must stay immutable for historical replay.
            if old_end > now {
                // The old slope no longer stops decaying at old_end.
                let mut delta = u_old.slope;
                if new_end == old_end {
                    // Same expiry: net out the new slope in one entry.
                    delta -= u_new.slope;
                }
                self.global_schedule.add(old_end, delta);
            }
            if new_end > now && new_end > old_end {
                self.global_schedule.add(new_end, -u_new.slope);
            }

            // Swap the contribution inside the current delegatee's ledger.
            if let Some(d) = self.delegatee_of(u.id) {
                self.checkpoint_delegatee(d, u_old, old_end, Direction::Decrease, now);
                self.checkpoint_delegatee(d, u_new, new_end, Direction::Increase, now);
            }

            // The lock's own trace needs no catch-up walk: its decay is a
            // pure function of the last recorded point.
            self.lock_traces.entry(u.id).or_default().push(now, u_new);

            fold = Some((u_old, u_new));
        }

        // Catch up the global aggregate, then fold in the instantaneous
        // adjustment at `now`.
        let (start_ts, start) = match self.global_trace.latest() {
            Some(cp) => (cp.ts, cp.value),
            None => (now, Point::ZERO),
        };
        let mut point = walker::catch_up(
            start_ts,
            start,
            now,
            &self.global_schedule,
            Some(&mut self.global_trace),
        );
        if let Some((u_old, u_new)) = fold {
            point.bias += u_new.bias - u_old.bias;
            point.slope += u_new.slope - u_old.slope;
            if point.bias < 0 {
                point.bias = 0;
            }
            if point.slope < 0 {
                point.slope = 0;
            }
        }
        point.permanent = self.permanent_total as i128;
        self.global_trace.push(now, point);
    }

    /// Force a global catch-up without any other mutation.
    ///
    /// # Panics
    ///
    /// Panics if `now` precedes the last recorded global checkpoint.
    pub fn global_checkpoint(&mut self, now: Timestamp) {
        self.checkpoint_lock(None, now);
    }
}
