//! The escrow ledger state container.
//!
//! All mutation flows through the checkpoint orchestrator (see
//! [`checkpoint`](crate::checkpoint)), which keeps the global trace, the
//! affected delegatee trace, and the slope schedules synchronized — that
//! synchronization is what makes the conservation invariant hold:
//! at any instant, the global aggregate equals the sum of every live lock's
//! decayed weight, which equals the sum over delegatees of their votes.
//!
//! Execution is single-threaded and atomic per call: every precondition is
//! checked before the first trace write, so a returned error implies no
//! state change. For a concurrent embedding, wrap the ledger in
//! [`SharedLedger`](crate::shared::SharedLedger).

use std::collections::{BTreeSet, HashMap};

use velock_core::trace::Trace;
use velock_core::types::{LockId, LockRecord, PartyId, Point};

use crate::schedule::SlopeSchedule;

/// The time-decaying balance ledger.
///
/// Mutating operations take an explicit `now` timestamp that must be
/// monotone non-decreasing across mutations; see the lifecycle methods for
/// the per-operation contracts. Historical queries are pure reads.
#[derive(Clone, Debug)]
pub struct EscrowLedger {
    /// Live lock records. Burned locks (claimed, merged-away, split-away)
    /// are removed outright.
    pub(crate) locks: HashMap<LockId, LockRecord>,
    /// Lock owner, as an opaque party id. Authorization is the caller's job.
    pub(crate) owners: HashMap<LockId, PartyId>,
    /// Owner → live locks, for the whole-balance delegation variant.
    pub(crate) locks_by_owner: HashMap<PartyId, BTreeSet<LockId>>,
    /// Per-lock point history.
    pub(crate) lock_traces: HashMap<LockId, Trace<Point>>,
    /// Per-lock delegatee history ("who did lock X delegate to at time T").
    pub(crate) delegatee_history: HashMap<LockId, Trace<PartyId>>,
    /// Global aggregate point history.
    pub(crate) global_trace: Trace<Point>,
    /// Global pending slope deltas keyed by expiry.
    pub(crate) global_schedule: SlopeSchedule,
    /// Per-delegatee aggregate point histories.
    pub(crate) delegatee_traces: HashMap<PartyId, Trace<Point>>,
    /// Per-delegatee pending slope deltas.
    pub(crate) delegatee_schedules: HashMap<PartyId, SlopeSchedule>,
    /// Total escrowed base units currently in custody.
    pub(crate) total_locked: u64,
    /// Sum of permanent-lock amounts; folded into the global point's
    /// `permanent` field at every checkpoint.
    pub(crate) permanent_total: u64,
    /// Next lock id to mint. Starts at 1; zero is reserved.
    pub(crate) next_id: u64,
}

impl Default for EscrowLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl EscrowLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            locks: HashMap::new(),
            owners: HashMap::new(),
            locks_by_owner: HashMap::new(),
            lock_traces: HashMap::new(),
            delegatee_history: HashMap::new(),
            global_trace: Trace::new(),
            global_schedule: SlopeSchedule::new(),
            delegatee_traces: HashMap::new(),
            delegatee_schedules: HashMap::new(),
            total_locked: 0,
            permanent_total: 0,
            next_id: 1,
        }
    }

    /// The live record for `id`, if any.
    pub fn lock(&self, id: LockId) -> Option<&LockRecord> {
        self.locks.get(&id)
    }

    /// Owner of a live lock.
    pub fn owner_of(&self, id: LockId) -> Option<PartyId> {
        self.owners.get(&id).copied()
    }

    /// Live locks held by `owner`, in id order.
    pub fn locks_of(&self, owner: PartyId) -> Vec<LockId> {
        self.locks_by_owner
            .get(&owner)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of live locks.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Total escrowed base units currently in custody.
    pub fn total_locked(&self) -> u64 {
        self.total_locked
    }

    /// Sum of permanent-lock amounts.
    pub fn permanent_total(&self) -> u64 {
        self.permanent_total
    }

    /// The party lock `id` currently delegates to, if the lock is live.
    pub fn delegatee_of(&self, id: LockId) -> Option<PartyId> {
        self.delegatee_history
            .get(&id)
            .and_then(|t| t.latest())
            .map(|cp| cp.value)
            .filter(|d| !d.is_none())
    }

    /// Number of checkpoints in the global trace (diagnostics).
    pub fn global_checkpoint_count(&self) -> usize {
        self.global_trace.len()
    }
}
