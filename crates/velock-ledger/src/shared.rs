//! Concurrent wrapper around the single-threaded ledger.
//!
//! The engine itself is `&mut self` per mutation; atomicity comes from the
//! caller's execution model. [`SharedLedger`] provides that model for a
//! threaded embedding: one write lock per mutation, so each call runs to
//! completion with no interleaving, and reads see the state as of the start
//! of their own lock acquisition.

use std::sync::Arc;

use parking_lot::RwLock;

use velock_core::error::EscrowError;
use velock_core::types::{LockId, LockRecord, PartyId, Timestamp};

use crate::ledger::EscrowLedger;

/// A cloneable, thread-safe handle to an [`EscrowLedger`].
#[derive(Clone, Debug, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<EscrowLedger>>,
}

impl SharedLedger {
    /// Wrap a fresh ledger.
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(EscrowLedger::new())) }
    }

    /// Wrap an existing ledger.
    pub fn from_ledger(ledger: EscrowLedger) -> Self {
        Self { inner: Arc::new(RwLock::new(ledger)) }
    }

    /// Run a closure with shared read access.
    pub fn read<R>(&self, f: impl FnOnce(&EscrowLedger) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run a closure with exclusive write access.
    pub fn write<R>(&self, f: impl FnOnce(&mut EscrowLedger) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn create_lock(
        &self,
        amount: u64,
        duration: u64,
        owner: PartyId,
        delegatee: Option<PartyId>,
        now: Timestamp,
    ) -> Result<LockId, EscrowError> {
        self.inner.write().create_lock(amount, duration, owner, delegatee, now)
    }

    pub fn create_lock_permanent(
        &self,
        amount: u64,
        owner: PartyId,
        delegatee: Option<PartyId>,
        now: Timestamp,
    ) -> Result<LockId, EscrowError> {
        self.inner.write().create_lock_permanent(amount, owner, delegatee, now)
    }

    pub fn increase_amount(&self, id: LockId, amount: u64, now: Timestamp) -> Result<(), EscrowError> {
        self.inner.write().increase_amount(id, amount, now)
    }

    pub fn increase_unlock_time(
        &self,
        id: LockId,
        duration: u64,
        permanent: bool,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        self.inner.write().increase_unlock_time(id, duration, permanent, now)
    }

    pub fn unlock_permanent(&self, id: LockId, now: Timestamp) -> Result<(), EscrowError> {
        self.inner.write().unlock_permanent(id, now)
    }

    pub fn merge(&self, from: LockId, to: LockId, now: Timestamp) -> Result<(), EscrowError> {
        self.inner.write().merge(from, to, now)
    }

    pub fn split(&self, id: LockId, weights: &[u64], now: Timestamp) -> Result<Vec<LockId>, EscrowError> {
        self.inner.write().split(id, weights, now)
    }

    pub fn delegate(&self, id: LockId, delegatee: PartyId, now: Timestamp) -> Result<(), EscrowError> {
        self.inner.write().delegate(id, delegatee, now)
    }

    pub fn delegate_owned(&self, owner: PartyId, delegatee: PartyId, now: Timestamp) -> Result<(), EscrowError> {
        self.inner.write().delegate_owned(owner, delegatee, now)
    }

    pub fn claim(&self, id: LockId, now: Timestamp) -> Result<u64, EscrowError> {
        self.inner.write().claim(id, now)
    }

    pub fn global_checkpoint(&self, now: Timestamp) {
        self.inner.write().global_checkpoint(now);
    }

    pub fn lock(&self, id: LockId) -> Option<LockRecord> {
        self.inner.read().lock(id).copied()
    }

    pub fn balance_of_lock_at(&self, id: LockId, ts: Timestamp) -> u64 {
        self.inner.read().balance_of_lock_at(id, ts)
    }

    pub fn past_votes(&self, delegatee: PartyId, ts: Timestamp) -> u64 {
        self.inner.read().past_votes(delegatee, ts)
    }

    pub fn past_total_supply(&self, ts: Timestamp) -> u64 {
        self.inner.read().past_total_supply(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use velock_core::constants::{CLOCK_UNIT, MAX_LOCK_DURATION, UNIT};

    const T0: Timestamp = 2_800 * CLOCK_UNIT;
    const ALICE: PartyId = PartyId(11);

    #[test]
    fn handle_clones_share_state() {
        let shared = SharedLedger::new();
        let other = shared.clone();
        let id = shared
            .create_lock(1_000 * UNIT, MAX_LOCK_DURATION, ALICE, None, T0)
            .unwrap();
        assert!(other.lock(id).is_some());
        assert_eq!(other.past_total_supply(T0), shared.past_total_supply(T0));
    }

    #[test]
    fn concurrent_reads_during_mutations() {
        let shared = SharedLedger::new();
        shared
            .create_lock(1_000 * UNIT, MAX_LOCK_DURATION, ALICE, None, T0)
            .unwrap();

        let readers: Vec<_> = (0..4)
            .map(|i| {
                let handle = shared.clone();
                thread::spawn(move || {
                    let ts = T0 + i * CLOCK_UNIT;
                    // Reads are pure; they may interleave freely.
                    let supply = handle.past_total_supply(ts);
                    assert_eq!(supply, handle.past_votes(ALICE, ts));
                })
            })
            .collect();

        let writer = {
            let handle = shared.clone();
            thread::spawn(move || {
                handle.global_checkpoint(T0 + 10 * CLOCK_UNIT);
            })
        };

        for r in readers {
            r.join().unwrap();
        }
        writer.join().unwrap();
    }
}
