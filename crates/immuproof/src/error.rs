//! Error types for verification sessions.
//!
//! Errors fall in two families. Structural errors mean the input could not
//! even be interpreted: malformed wire data, a state for the wrong database,
//! a broken state holder. Verification failures mean a cryptographic check
//! did not hold and the server or the network may be lying. Neither family
//! is transient; retrying with the same data cannot succeed.
//!
//! The one transient error is a state conflict: another session moved the
//! trusted state while this one was verifying. The data was checked against
//! a checkpoint that is no longer held, so it must be fetched and verified
//! again against the new one.

use immuproof_core::{Error as CoreError, TxId};
use immuproof_state::StateError;
use thiserror::Error;

/// A check that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    /// The entry is not stored under the requested key.
    #[error("entry key does not match the requested key")]
    KeyMismatch,

    /// The entry is marked as deleted.
    #[error("entry is marked as deleted")]
    EntryDeleted,

    /// The data belongs to another transaction than the one claimed.
    #[error("tx mismatch: expected {expected}, got {actual}")]
    TxMismatch { expected: TxId, actual: TxId },

    /// The transaction header differs from the one the dual proof covers.
    #[error("header of tx {tx_id} differs from the proven header")]
    HeaderMismatch { tx_id: TxId },

    /// The entry digest is not included in its transaction's entries hash.
    #[error("inclusion proof failed in tx {tx_id}")]
    Inclusion { tx_id: TxId },

    /// The dual proof does not link the two transactions.
    #[error("dual proof failed from tx {source_tx_id} to tx {target_tx_id}")]
    DualProof {
        source_tx_id: TxId,
        target_tx_id: TxId,
    },

    /// The state signature does not check against the server key.
    #[error("state signature does not verify for tx {tx_id}")]
    Signature { tx_id: TxId },

    /// A write receipt does not carry exactly one entry.
    #[error("write receipt carries {0} entries")]
    UnexpectedEntries(usize),

    /// A write landed in a transaction no newer than the trusted one.
    #[error("tx {tx_id} is not newer than trusted tx {trusted}")]
    NotNewer { tx_id: TxId, trusted: TxId },
}

/// Errors that can occur during verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Malformed or self-inconsistent input.
    #[error("structural error: {0}")]
    Structural(#[from] CoreError),

    /// The state holder failed.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// A state for another database was offered to the session.
    #[error("state for database {actual} offered to session on {expected}")]
    DatabaseMismatch { expected: String, actual: String },

    /// A check did not hold.
    #[error("verification failed: {0}")]
    Verification(#[from] VerificationFailure),

    /// The trusted state moved while the data was being verified against it.
    #[error("trusted state moved from tx {expected} to tx {held} during verification")]
    StateConflict { expected: TxId, held: TxId },
}

impl VerifyError {
    /// Whether this error reports possible tampering rather than bad input.
    pub fn is_tamper_signal(&self) -> bool {
        matches!(self, VerifyError::Verification(_))
    }

    pub fn is_structural(&self) -> bool {
        !self.is_tamper_signal() && !self.is_conflict()
    }

    /// Whether verifying again against the current trusted state may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, VerifyError::StateConflict { .. })
    }
}

/// Result type for verification sessions.
pub type Result<T> = std::result::Result<T, VerifyError>;
