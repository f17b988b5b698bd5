//! Lock lifecycle state machine.
//!
//! States: non-existent → active (temporary) ⇄ active (permanent) →
//! expired → claimed. Merged-away and split-away are terminal and
//! equivalent to claimed for accounting. Every transition validates its
//! preconditions first, then funnels the old/new snapshots through the
//! checkpoint orchestrator in one atomic step.
//!
//! Token custody and authorization live with the caller; the ledger only
//! tracks the escrowed totals.

use tracing::{debug, info};

use velock_core::constants::{round_to_unit, MAX_LOCK_DURATION};
use velock_core::error::{DelegationError, EscrowError, LockError};
use velock_core::types::{LockId, LockRecord, PartyId, Timestamp};

use crate::checkpoint::LockUpdate;
use crate::ledger::EscrowLedger;

impl EscrowLedger {
    /// Escrow `amount` for `duration` seconds, minting a new temporary lock.
    ///
    /// The expiry is `now + duration` rounded down to the clock unit; it
    /// must land strictly in the future and within the maximum horizon.
    /// The lock delegates to `delegatee` (the owner when `None`).
    ///
    /// # Errors
    ///
    /// - [`LockError::ZeroAmount`]
    /// - [`LockError::DurationNotInFuture`] if rounding lands at or before `now`
    /// - [`LockError::DurationTooLong`]
    /// - [`LockError::AmountOverflow`] if total custody would overflow
    /// - [`DelegationError::InvalidDelegatee`] for the reserved zero party
    ///
    /// # Panics
    ///
    /// Panics if `now` precedes the last recorded mutation (all mutating
    /// operations share this clock-monotonicity contract).
    pub fn create_lock(
        &mut self,
        amount: u64,
        duration: u64,
        owner: PartyId,
        delegatee: Option<PartyId>,
        now: Timestamp,
    ) -> Result<LockId, EscrowError> {
        if amount == 0 {
            return Err(LockError::ZeroAmount.into());
        }
        let end = round_to_unit(
            now.checked_add(duration)
                .ok_or(LockError::DurationTooLong { end: u64::MAX, max: now + MAX_LOCK_DURATION })?,
        );
        if end <= now {
            return Err(LockError::DurationNotInFuture.into());
        }
        if end > now + MAX_LOCK_DURATION {
            return Err(LockError::DurationTooLong { end, max: now + MAX_LOCK_DURATION }.into());
        }
        let record = LockRecord { amount, start: now, end, permanent: false };
        self.mint(record, owner, delegatee, now)
    }

    /// Escrow `amount` into a new permanent (never-decaying) lock.
    ///
    /// # Errors
    ///
    /// As [`create_lock`](Self::create_lock), minus the duration checks.
    pub fn create_lock_permanent(
        &mut self,
        amount: u64,
        owner: PartyId,
        delegatee: Option<PartyId>,
        now: Timestamp,
    ) -> Result<LockId, EscrowError> {
        if amount == 0 {
            return Err(LockError::ZeroAmount.into());
        }
        let record = LockRecord { amount, start: now, end: 0, permanent: true };
        self.mint(record, owner, delegatee, now)
    }

    /// Add `amount` to an existing lock without changing its expiry.
    ///
    /// # Errors
    ///
    /// - [`LockError::ZeroAmount`] / [`LockError::LockNotFound`]
    /// - [`LockError::LockExpired`] for an expired temporary lock
    /// - [`LockError::AmountOverflow`]
    pub fn increase_amount(
        &mut self,
        id: LockId,
        amount: u64,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        if amount == 0 {
            return Err(LockError::ZeroAmount.into());
        }
        let old = *self.locks.get(&id).ok_or(LockError::LockNotFound(id.get()))?;
        if old.is_expired(now) {
            return Err(LockError::LockExpired.into());
        }
        let new_total = self
            .total_locked
            .checked_add(amount)
            .ok_or(LockError::AmountOverflow)?;
        let mut new = old;
        new.amount = old.amount.checked_add(amount).ok_or(LockError::AmountOverflow)?;

        self.total_locked = new_total;
        if new.permanent {
            self.permanent_total += amount;
        }
        self.locks.insert(id, new);
        self.checkpoint_lock(Some(LockUpdate { id, old, new }), now);
        debug!(lock = id.get(), amount, "escrow: amount increased");
        Ok(())
    }

    /// Extend a temporary lock's expiry, or (with `permanent` set, the
    /// duration is ignored) convert it into a permanent lock.
    ///
    /// # Errors
    ///
    /// - [`LockError::LockNotFound`]
    /// - [`LockError::PermanentLock`] if the lock is already permanent
    /// - [`LockError::LockExpired`]
    /// - [`LockError::DurationNotInFuture`] if the new expiry does not move
    ///   strictly past the current one
    /// - [`LockError::DurationTooLong`]
    pub fn increase_unlock_time(
        &mut self,
        id: LockId,
        duration: u64,
        permanent: bool,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        let old = *self.locks.get(&id).ok_or(LockError::LockNotFound(id.get()))?;
        if old.permanent {
            return Err(LockError::PermanentLock.into());
        }
        if old.is_expired(now) {
            return Err(LockError::LockExpired.into());
        }
        let mut new = old;
        if permanent {
            new.end = 0;
            new.permanent = true;
            self.permanent_total += old.amount;
        } else {
            let end = round_to_unit(
                now.checked_add(duration)
                    .ok_or(LockError::DurationTooLong { end: u64::MAX, max: now + MAX_LOCK_DURATION })?,
            );
            if end <= old.end {
                return Err(LockError::DurationNotInFuture.into());
            }
            if end > now + MAX_LOCK_DURATION {
                return Err(LockError::DurationTooLong { end, max: now + MAX_LOCK_DURATION }.into());
            }
            new.end = end;
        }
        self.locks.insert(id, new);
        self.checkpoint_lock(Some(LockUpdate { id, old, new }), now);
        info!(
            lock = id.get(),
            end = new.end,
            permanent = new.permanent,
            "escrow: unlock time increased"
        );
        Ok(())
    }

    /// Revert a permanent lock to a temporary one expiring a full horizon
    /// from now — the decay clock restarts at the maximum, it does not
    /// resume from the original lock date.
    ///
    /// # Errors
    ///
    /// - [`LockError::LockNotFound`] / [`LockError::NotPermanentLock`]
    pub fn unlock_permanent(&mut self, id: LockId, now: Timestamp) -> Result<(), EscrowError> {
        let old = *self.locks.get(&id).ok_or(LockError::LockNotFound(id.get()))?;
        if !old.permanent {
            return Err(LockError::NotPermanentLock.into());
        }
        let mut new = old;
        new.permanent = false;
        new.end = round_to_unit(now + MAX_LOCK_DURATION);

        self.permanent_total -= old.amount;
        self.locks.insert(id, new);
        self.checkpoint_lock(Some(LockUpdate { id, old, new }), now);
        info!(lock = id.get(), end = new.end, "escrow: permanent lock reverted");
        Ok(())
    }

    /// Absorb lock `from` into lock `to`. The destination keeps the later
    /// of the two expiries; the source is burned.
    ///
    /// Permanence flags must match — merging a permanent lock into a
    /// temporary one (or vice versa) is rejected rather than silently
    /// adopting the destination's flag.
    ///
    /// # Errors
    ///
    /// - [`LockError::SameLock`] / [`LockError::LockNotFound`]
    /// - [`LockError::PermanentLockMismatch`]
    /// - [`LockError::LockExpired`] if either side has expired
    pub fn merge(&mut self, from: LockId, to: LockId, now: Timestamp) -> Result<(), EscrowError> {
        if from == to {
            return Err(LockError::SameLock.into());
        }
        let src = *self.locks.get(&from).ok_or(LockError::LockNotFound(from.get()))?;
        let dst = *self.locks.get(&to).ok_or(LockError::LockNotFound(to.get()))?;
        if src.permanent != dst.permanent {
            return Err(LockError::PermanentLockMismatch.into());
        }
        if src.is_expired(now) || dst.is_expired(now) {
            return Err(LockError::LockExpired.into());
        }
        let amount = dst.amount.checked_add(src.amount).ok_or(LockError::AmountOverflow)?;

        self.burn(from, now);
        let mut new = dst;
        new.amount = amount;
        new.end = src.end.max(dst.end);
        if new.permanent {
            // The burn dropped the source's share of the permanent tally;
            // it lives on inside the destination.
            self.permanent_total += src.amount;
        }
        self.locks.insert(to, new);
        self.checkpoint_lock(Some(LockUpdate { id: to, old: dst, new }), now);
        info!(from = from.get(), to = to.get(), amount, "escrow: locks merged");
        Ok(())
    }

    /// Divide a lock proportionally across `weights`, returning the sibling
    /// ids. The original record keeps the first share in place; the last
    /// share absorbs the rounding remainder so the shares sum exactly.
    /// Siblings keep the source's expiry, permanence, owner, and delegatee.
    ///
    /// # Errors
    ///
    /// - [`LockError::InvalidWeights`] for fewer than two weights, a zero
    ///   weight sum, or any share that rounds down to zero
    /// - [`LockError::LockNotFound`] / [`LockError::LockExpired`]
    pub fn split(
        &mut self,
        id: LockId,
        weights: &[u64],
        now: Timestamp,
    ) -> Result<Vec<LockId>, EscrowError> {
        if weights.len() < 2 {
            return Err(LockError::InvalidWeights.into());
        }
        let total: u128 = weights.iter().map(|&w| w as u128).sum();
        if total == 0 {
            return Err(LockError::InvalidWeights.into());
        }
        let old = *self.locks.get(&id).ok_or(LockError::LockNotFound(id.get()))?;
        if old.is_expired(now) {
            return Err(LockError::LockExpired.into());
        }

        let mut shares = Vec::with_capacity(weights.len());
        let mut carved = 0u64;
        for &w in &weights[..weights.len() - 1] {
            let share = (old.amount as u128 * w as u128 / total) as u64;
            carved += share;
            shares.push(share);
        }
        shares.push(old.amount - carved);
        if shares.iter().any(|&s| s == 0) {
            return Err(LockError::InvalidWeights.into());
        }

        let owner = self
            .owners
            .get(&id)
            .copied()
            .ok_or(LockError::LockNotFound(id.get()))?;
        let delegatee = self.delegatee_of(id);

        // The first share shrinks the source in place; the carved-out
        // remainder momentarily leaves the custody tallies and re-enters
        // through the sibling mints at the same timestamp.
        let mut new = old;
        new.amount = shares[0];
        let carved_out = old.amount - shares[0];
        self.total_locked -= carved_out;
        if old.permanent {
            self.permanent_total -= carved_out;
        }
        self.locks.insert(id, new);
        self.checkpoint_lock(Some(LockUpdate { id, old, new }), now);

        let mut ids = vec![id];
        for &share in &shares[1..] {
            let record = LockRecord { amount: share, start: now, end: old.end, permanent: old.permanent };
            let sibling = self.mint(record, owner, delegatee, now)?;
            ids.push(sibling);
        }
        info!(lock = id.get(), siblings = ids.len() - 1, "escrow: lock split");
        Ok(ids)
    }

    /// Pay out an expired temporary lock. Returns the escrowed amount; the
    /// record is burned. The actual token transfer is the caller's job.
    ///
    /// # Errors
    ///
    /// - [`LockError::LockNotFound`]
    /// - [`LockError::PermanentLock`] — permanent locks never become claimable
    /// - [`LockError::LockNotExpired`]
    pub fn claim(&mut self, id: LockId, now: Timestamp) -> Result<u64, EscrowError> {
        let lock = *self.locks.get(&id).ok_or(LockError::LockNotFound(id.get()))?;
        if lock.permanent {
            return Err(LockError::PermanentLock.into());
        }
        if now < lock.end {
            return Err(LockError::LockNotExpired.into());
        }
        let payout = lock.amount;
        self.total_locked -= payout;
        self.burn(id, now);
        info!(lock = id.get(), payout, "escrow: lock claimed");
        Ok(payout)
    }

    /// Mint a new lock record: updates custody tallies, assigns the default
    /// delegation, and checkpoints the fresh contribution.
    fn mint(
        &mut self,
        record: LockRecord,
        owner: PartyId,
        delegatee: Option<PartyId>,
        now: Timestamp,
    ) -> Result<LockId, EscrowError> {
        let delegatee = delegatee.unwrap_or(owner);
        if delegatee.is_none() {
            return Err(DelegationError::InvalidDelegatee.into());
        }
        self.total_locked = self
            .total_locked
            .checked_add(record.amount)
            .ok_or(LockError::AmountOverflow)?;
        if record.permanent {
            // Bounded by total_locked, so this cannot overflow.
            self.permanent_total += record.amount;
        }

        let id = LockId::new(self.next_id);
        self.next_id += 1;
        self.locks.insert(id, record);
        self.owners.insert(id, owner);
        self.locks_by_owner.entry(owner).or_default().insert(id);

        // The delegation must be on record before the checkpoint so the
        // orchestrator routes the new contribution into the right trace.
        self.delegatee_history.entry(id).or_default().push(now, delegatee);
        self.checkpoint_lock(
            Some(LockUpdate { id, old: LockRecord::default(), new: record }),
            now,
        );
        info!(
            lock = id.get(),
            amount = record.amount,
            end = record.end,
            permanent = record.permanent,
            owner = owner.0,
            "escrow: lock created"
        );
        Ok(id)
    }

    /// Remove a lock from every live index and checkpoint its contribution
    /// out of the aggregates. Terminal: claimed, merged-away, split-away.
    fn burn(&mut self, id: LockId, now: Timestamp) {
        let old = self.locks.remove(&id).unwrap_or_default();
        if let Some(owner) = self.owners.remove(&id) {
            if let Some(set) = self.locks_by_owner.get_mut(&owner) {
                set.remove(&id);
                if set.is_empty() {
                    self.locks_by_owner.remove(&owner);
                }
            }
        }
        if old.permanent {
            self.permanent_total -= old.amount;
        }
        // The checkpoint reads the still-current delegatee to pull the old
        // contribution out; only then is the terminal un-delegation logged.
        self.checkpoint_lock(
            Some(LockUpdate { id, old, new: LockRecord::default() }),
            now,
        );
        self.delegatee_history.entry(id).or_default().push(now, PartyId::NONE);
    }
}
