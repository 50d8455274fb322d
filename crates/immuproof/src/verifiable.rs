//! Server responses to verified operations.
//!
//! Plain values as handed over by the transport. Nothing in here is trusted
//! until a [`crate::Verifier`] has checked it.

use immuproof_core::{DualProof, InclusionProof, TxEntry, TxHeader, TxId};
use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// A transaction together with the proof linking it to the trusted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableTx {
    pub header: TxHeader,
    pub entries: Vec<TxEntry>,
    pub dual_proof: DualProof,
    /// Server signature over the resulting state.
    pub signature: Option<Vec<u8>>,
}

/// An entry, its transaction and the entry's inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableEntry {
    pub entry: Entry,
    pub verifiable_tx: VerifiableTx,
    /// Proof of the stored pair in the proving transaction's entries hash.
    pub inclusion_proof: InclusionProof,
}

/// What was asked for in a verified read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRequest {
    pub key: Vec<u8>,
    /// Transaction the entry must come from, 0 for any.
    pub at_tx: TxId,
}

impl EntryRequest {
    /// Request the latest value of `key`.
    pub fn latest(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            at_tx: 0,
        }
    }

    /// Request the value of `key` written by `tx`.
    pub fn at(key: impl Into<Vec<u8>>, tx: TxId) -> Self {
        Self {
            key: key.into(),
            at_tx: tx,
        }
    }
}
