//! Proof verification.
//!
//! Every check here is a pure predicate: `true` if the claim holds, `false`
//! otherwise. Nothing is logged and nothing is retried; callers decide how to
//! surface a failed check.
//!
//! The linked tree (the ledger's append-only tree over transaction alhs) is
//! indexed from 1: leaf `i` is `sha256(0x00 || alh(i))`.

use crate::crypto::{leaf_hash, node_hash, Sha256Hash};
use crate::proof::{DualProof, LinearProof};
use crate::types::TxId;

pub use crate::htree::verify_inclusion;

/// Leaf of the linked tree for a transaction with the given alh.
pub fn leaf_for(alh: &Sha256Hash) -> Sha256Hash {
    leaf_hash(alh)
}

/// Verify that `i_leaf` is leaf `i` of the linked tree of size `j` with
/// root `j_root`.
pub fn verify_linked_inclusion(
    terms: &[Sha256Hash],
    i: u64,
    j: u64,
    i_leaf: &Sha256Hash,
    j_root: &Sha256Hash,
) -> bool {
    if i > j || i == 0 || (i < j && terms.is_empty()) {
        return false;
    }

    let mut i1 = i - 1;
    let mut j1 = j - 1;
    let mut calc = *i_leaf;

    for term in terms {
        calc = if i1 % 2 == 0 && i1 != j1 {
            node_hash(&calc, term)
        } else {
            node_hash(term, &calc)
        };
        i1 >>= 1;
        j1 >>= 1;
    }

    calc == *j_root
}

/// Verify that a tree of size `j` with root `j_root` extends the tree of
/// size `i` with root `i_root`.
pub fn verify_consistency(
    terms: &[Sha256Hash],
    i: u64,
    j: u64,
    i_root: &Sha256Hash,
    j_root: &Sha256Hash,
) -> bool {
    if i > j || i == 0 || (i < j && terms.is_empty()) {
        return false;
    }
    if i == j && terms.is_empty() {
        return i_root == j_root;
    }

    let mut fn_ = i - 1;
    let mut sn = j - 1;

    // Skip the levels where the old tree is a complete left subtree
    while fn_ % 2 == 1 {
        fn_ >>= 1;
        sn >>= 1;
    }

    let mut ci_root = terms[0];
    let mut cj_root = terms[0];

    for term in &terms[1..] {
        if fn_ % 2 == 1 || fn_ == sn {
            ci_root = node_hash(term, &ci_root);
            cj_root = node_hash(term, &cj_root);

            while fn_ % 2 == 0 && fn_ != 0 {
                fn_ >>= 1;
                sn >>= 1;
            }
        } else {
            cj_root = node_hash(&cj_root, term);
        }
        fn_ >>= 1;
        sn >>= 1;
    }

    ci_root == *i_root && cj_root == *j_root
}

/// Verify that `leaf` is the last leaf of the linked tree of size `i` with
/// the given root.
pub fn verify_last_inclusion(
    terms: &[Sha256Hash],
    i: u64,
    leaf: &Sha256Hash,
    root: &Sha256Hash,
) -> bool {
    if i == 0 {
        return false;
    }

    // The last leaf always sits on the right
    let calc = terms
        .iter()
        .fold(*leaf, |calc, term| node_hash(term, &calc));

    calc == *root
}

/// Verify a chain of alhs from `source_tx_id` to `target_tx_id`.
pub fn verify_linear_proof(
    proof: &LinearProof,
    source_tx_id: TxId,
    target_tx_id: TxId,
    source_alh: &Sha256Hash,
    target_alh: &Sha256Hash,
) -> bool {
    if proof.source_tx_id != source_tx_id || proof.target_tx_id != target_tx_id {
        return false;
    }
    if source_tx_id == 0 || source_tx_id > target_tx_id {
        return false;
    }
    if proof.terms.is_empty() || proof.terms[0] != *source_alh {
        return false;
    }
    if proof.terms.len() as u64 != target_tx_id - source_tx_id + 1 {
        return false;
    }

    let mut calc = proof.terms[0];
    for (k, inner_hash) in proof.terms.iter().enumerate().skip(1) {
        let id = source_tx_id + k as u64;
        calc = Sha256Hash::hash_parts(&[&id.to_be_bytes(), &calc.0, &inner_hash.0]);
    }

    calc == *target_alh
}

/// Verify that the transaction `source_tx_id` with alh `source_alh` precedes
/// `target_tx_id` with alh `target_alh` in one history.
///
/// Combines up to four checks, each applied only when the headers call for
/// it:
///
/// 1. the source is a leaf of the target's linked tree,
/// 2. the source's linked tree is a prefix of the target's,
/// 3. the target's linked boundary is the last leaf of its linked tree,
/// 4. a linear chain covers the transactions the linked tree does not.
pub fn verify_dual_proof(
    proof: &DualProof,
    source_tx_id: TxId,
    target_tx_id: TxId,
    source_alh: &Sha256Hash,
    target_alh: &Sha256Hash,
) -> bool {
    let source = &proof.source_tx_header;
    let target = &proof.target_tx_header;

    if source.id != source_tx_id || target.id != target_tx_id {
        return false;
    }
    if source.id == 0 || source.id > target.id {
        return false;
    }
    if source.alh() != *source_alh || target.alh() != *target_alh {
        return false;
    }

    if source_tx_id < target.bl_tx_id
        && !verify_linked_inclusion(
            &proof.inclusion_proof,
            source_tx_id,
            target.bl_tx_id,
            &leaf_for(source_alh),
            &target.bl_root,
        )
    {
        return false;
    }

    if source.bl_tx_id > 0
        && !verify_consistency(
            &proof.consistency_proof,
            source.bl_tx_id,
            target.bl_tx_id,
            &source.bl_root,
            &target.bl_root,
        )
    {
        return false;
    }

    if target.bl_tx_id > 0
        && !verify_last_inclusion(
            &proof.last_inclusion_proof,
            target.bl_tx_id,
            &leaf_for(&proof.target_bl_tx_alh),
            &target.bl_root,
        )
    {
        return false;
    }

    if source_tx_id < target.bl_tx_id {
        verify_linear_proof(
            &proof.linear_proof,
            target.bl_tx_id,
            target_tx_id,
            &proof.target_bl_tx_alh,
            target_alh,
        )
    } else {
        verify_linear_proof(
            &proof.linear_proof,
            source_tx_id,
            target_tx_id,
            source_alh,
            target_alh,
        )
    }
}
