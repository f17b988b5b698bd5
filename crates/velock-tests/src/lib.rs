//! Invariant test suite for the Velock escrow.
//!
//! This crate contains integration tests that recompute the conservation
//! invariants from first principles and drive the ledger through randomized
//! lifecycle sequences, checking that the lazily-maintained aggregates
//! never drift from the per-lock ground truth.

pub mod helpers;
