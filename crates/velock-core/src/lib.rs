//! # velock-core
//! Foundation types for the Velock vote-escrow ledger.

pub mod constants;
pub mod error;
pub mod trace;
pub mod types;
