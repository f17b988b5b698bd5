//! Error types for the Velock escrow.
//!
//! Every precondition is checked before any state mutation; a violation
//! aborts the whole call with a typed error and no partial state change.
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    #[error("amount must be nonzero")] ZeroAmount,
    #[error("lock not found: {0}")] LockNotFound(u64),
    #[error("lock has expired")] LockExpired,
    #[error("lock has not expired yet")] LockNotExpired,
    #[error("unlock time must move forward")] DurationNotInFuture,
    #[error("unlock time {end} exceeds the maximum horizon {max}")] DurationTooLong { end: u64, max: u64 },
    #[error("lock is permanent")] PermanentLock,
    #[error("lock is not permanent")] NotPermanentLock,
    #[error("merging locks with mismatched permanence")] PermanentLockMismatch,
    #[error("merge source equals destination")] SameLock,
    #[error("split weights must have at least two nonzero shares")] InvalidWeights,
    #[error("escrowed amount overflow")] AmountOverflow,
}

/// Delegation failures. The signature variants belong to the external
/// authorization collaborator; the ledger itself never raises them but
/// shares the taxonomy so callers surface one error type.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegationError {
    #[error("invalid delegatee")] InvalidDelegatee,
    #[error("invalid signature")] InvalidSignature,
    #[error("invalid nonce")] InvalidNonce,
    #[error("signature expired")] SignatureExpired,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowError {
    #[error(transparent)] Lock(#[from] LockError),
    #[error(transparent)] Delegation(#[from] DelegationError),
}
