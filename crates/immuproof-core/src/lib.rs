//! # immuproof core
//!
//! Pure primitives for verifying an immutable ledger on the client side:
//! entry digests, per-transaction hash trees, transaction headers and the
//! proof checks that tie one trusted checkpoint to a later one.
//!
//! This crate contains no I/O, no storage, no locks. It is pure computation
//! over values received from an untrusted server.
//!
//! ## Key Types
//!
//! - [`Kv`] / [`TxEntry`] - Entries and their digests
//! - [`HTree`] - Hash tree over one transaction's entry digests
//! - [`Tx`] - A transaction checked against its header's entries hash
//! - [`TxHeader`] - Header with the accumulated linked hash (`alh`)
//! - [`DualProof`] - Links a trusted transaction to a newer one
//! - [`ImmuState`] - A signed checkpoint
//!
//! ## Verification
//!
//! The checks in [`verification`] return `bool` and never error. Malformed
//! input discovered while digesting or assembling is reported as [`Error`].
//!
//! ## Signatures
//!
//! States are signed with Ed25519 over the server's signed payload layout
//! (see [`ImmuState::signed_payload`]). Servers that sign states with ECDSA
//! P-256, as the reference ledger server does, are not supported: their
//! signatures never check here. Hash, tree and proof compatibility does not
//! depend on the signature scheme.

pub mod crypto;
pub mod digest;
pub mod error;
pub mod htree;
pub mod metadata;
pub mod proof;
pub mod state;
pub mod tx;
pub mod types;
pub mod verification;

pub use crypto::{Keypair, PublicKey, Sha256Hash, EMPTY_HASH};
pub use digest::{entry_digest, Kv};
pub use error::{Error, Result};
pub use htree::{HTree, InclusionProof};
pub use metadata::{Attribute, KvMetadata};
pub use proof::{DualProof, LinearProof};
pub use state::ImmuState;
pub use tx::{Tx, TxEntry, TxHeader};
pub use types::{TxId, TxVersion};
pub use verification::{
    leaf_for, verify_consistency, verify_dual_proof, verify_inclusion, verify_last_inclusion,
    verify_linear_proof, verify_linked_inclusion,
};
