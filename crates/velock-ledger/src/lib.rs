//! # velock-ledger — time-decaying vote-escrow accounting.
//!
//! All arithmetic is integer-only for determinism.
//!
//! This crate implements the escrow's sparse, lazily-evaluated time series:
//! - **Checkpoint traces**: one per lock, per delegatee, and one global,
//!   answering "what was the weight at instant T" by binary search.
//! - **Slope schedules**: sparse maps from future expiry → pending decay-rate
//!   change, consumed lazily instead of ticking every clock unit.
//! - **Lazy catch-up walker**: advances a stale aggregate through every
//!   elapsed clock unit on demand, bounded by the maximum lock horizon.
//! - **Lock lifecycle**: create, top-up, extend, permanent conversion and
//!   reversion, merge, split, claim.
//! - **Delegation**: a lock's contribution always sits in exactly one
//!   delegatee's aggregate (the owner by default), and the assignment is
//!   itself a historical trace.

pub mod checkpoint;
pub mod delegation;
pub mod ledger;
pub mod lifecycle;
pub mod query;
pub mod schedule;
pub mod shared;
pub mod walker;

pub use ledger::EscrowLedger;
pub use schedule::SlopeSchedule;
pub use shared::SharedLedger;
