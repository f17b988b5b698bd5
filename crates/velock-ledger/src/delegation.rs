//! The delegation engine.
//!
//! A live lock's weight contribution always sits in exactly one delegatee's
//! aggregate trace (the owner's, by default). Redelegating moves the
//! current decayed contribution between traces and adjusts the two
//! delegatee-scoped slope schedules; the assignment itself is recorded in
//! the lock's delegatee-history trace so it can be queried historically.

use tracing::debug;

use velock_core::error::{DelegationError, EscrowError, LockError};
use velock_core::types::{LockId, PartyId, Point, Timestamp};

use crate::ledger::EscrowLedger;
use crate::walker;

/// Whether a contribution enters or leaves a delegatee's aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Increase,
    Decrease,
}

impl EscrowLedger {
    /// Redirect lock `id`'s weight to `delegatee`.
    ///
    /// No-op when `delegatee` already receives the lock's weight. An expired
    /// lock may still be redelegated; it simply moves a zero contribution.
    ///
    /// # Errors
    ///
    /// - [`LockError::LockNotFound`] for a dead or unknown lock
    /// - [`DelegationError::InvalidDelegatee`] for the reserved zero party
    ///
    /// # Panics
    ///
    /// Panics if `now` precedes the last recorded mutation.
    pub fn delegate(
        &mut self,
        id: LockId,
        delegatee: PartyId,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        let lock = *self.locks.get(&id).ok_or(LockError::LockNotFound(id.get()))?;
        if delegatee.is_none() {
            return Err(DelegationError::InvalidDelegatee.into());
        }
        let current = self.delegatee_of(id);
        if current == Some(delegatee) {
            return Ok(());
        }

        // The lock's latest point decayed to `now` — identical to
        // recomputing from the record, and zero once expired.
        let point = Point::from_lock(lock.amount, lock.end, lock.permanent, now);
        if let Some(prev) = current {
            self.checkpoint_delegatee(prev, point, lock.end, Direction::Decrease, now);
        }
        self.checkpoint_delegatee(delegatee, point, lock.end, Direction::Increase, now);
        self.delegatee_history.entry(id).or_default().push(now, delegatee);

        debug!(
            lock = id.get(),
            from = current.map(|p| p.0).unwrap_or(0),
            to = delegatee.0,
            "delegation: redirected"
        );
        Ok(())
    }

    /// Redirect every lock owned by `owner` to `delegatee` — the
    /// whole-balance delegation variant.
    ///
    /// # Errors
    ///
    /// Same as [`delegate`](Self::delegate); fails fast on the first
    /// offending lock (only [`DelegationError::InvalidDelegatee`] can occur,
    /// and it is checked before any lock is touched).
    pub fn delegate_owned(
        &mut self,
        owner: PartyId,
        delegatee: PartyId,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        if delegatee.is_none() {
            return Err(DelegationError::InvalidDelegatee.into());
        }
        for id in self.locks_of(owner) {
            self.delegate(id, delegatee, now)?;
        }
        Ok(())
    }

    /// Catch up `delegatee`'s aggregate to `now`, then add or remove the
    /// contribution `point` (whose decay stops at `end`).
    ///
    /// Removal floors each component at zero; if the resulting slope is
    /// exactly zero the bias is forced to zero as well — a zero-slope
    /// nonzero-bias aggregate is residual rounding dust, not a balance.
    pub(crate) fn checkpoint_delegatee(
        &mut self,
        delegatee: PartyId,
        point: Point,
        end: Timestamp,
        direction: Direction,
        now: Timestamp,
    ) {
        let schedule = self.delegatee_schedules.entry(delegatee).or_default();
        let trace = self.delegatee_traces.entry(delegatee).or_default();
        let (start_ts, start) = match trace.latest() {
            Some(cp) => (cp.ts, cp.value),
            None => (now, Point::ZERO),
        };
        let mut agg = walker::catch_up(start_ts, start, now, schedule, Some(&mut *trace));

        match direction {
            Direction::Increase => {
                agg.bias += point.bias;
                agg.slope += point.slope;
                agg.permanent += point.permanent;
                if end > now {
                    schedule.add(end, -point.slope);
                }
            }
            Direction::Decrease => {
                agg.bias = (agg.bias - point.bias).max(0);
                agg.slope = (agg.slope - point.slope).max(0);
                agg.permanent = (agg.permanent - point.permanent).max(0);
                if end > now {
                    schedule.add(end, point.slope);
                }
            }
        }
        if agg.slope == 0 {
            agg.bias = 0;
        }
        trace.push(now, agg);
    }
}
