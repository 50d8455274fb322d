//! Proof artifacts returned by the server.
//!
//! These are plain value objects; see [`crate::verification`] for the checks.

use serde::{Deserialize, Serialize};

use crate::crypto::Sha256Hash;
use crate::tx::TxHeader;
use crate::types::TxId;

/// A chain of consecutive transactions from `source_tx_id` to `target_tx_id`.
///
/// `terms[0]` is the source alh; every following term is the inner hash of
/// the next transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearProof {
    pub source_tx_id: TxId,
    pub target_tx_id: TxId,
    pub terms: Vec<Sha256Hash>,
}

/// Everything needed to show that one transaction precedes another in the
/// same ledger history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualProof {
    pub source_tx_header: TxHeader,
    pub target_tx_header: TxHeader,
    /// Source alh into the target's linked root.
    pub inclusion_proof: Vec<Sha256Hash>,
    /// Source linked root to target linked root.
    pub consistency_proof: Vec<Sha256Hash>,
    /// Alh of the target's linked boundary transaction.
    pub target_bl_tx_alh: Sha256Hash,
    /// Boundary alh as the last leaf of the target's linked root.
    pub last_inclusion_proof: Vec<Sha256Hash>,
    /// Chain over the part of history the linked tree does not cover yet.
    pub linear_proof: LinearProof,
}
