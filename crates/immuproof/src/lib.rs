//! # immuproof
//!
//! Client-side verification for a tamper-evident, append-only ledger.
//!
//! ## Overview
//!
//! The server is not trusted. Every value it returns comes with proofs, and
//! a [`Verifier`] checks them against the last state the client trusted:
//!
//! - **Inclusion**: the entry is part of its transaction
//! - **Dual proof**: that transaction and the trusted one share one history
//! - **Signature**: the server vouches for the resulting state
//!
//! Only when all of them hold does the trusted state move forward, and it
//! only ever moves forward. Transport, retries and persistence belong to the
//! caller.
//!
//! Sessions sharing a state holder never adopt a state proven against a
//! checkpoint that another session has since replaced; such a call fails
//! with [`VerifyError::StateConflict`] and can be verified again.
//!
//! State signatures are Ed25519. Signature compatibility with servers that
//! sign with ECDSA P-256 is out of scope; configure no server key to skip
//! signature checks against such a server.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use immuproof::{EntryRequest, ImmuState, VerifiableEntry, Verifier, VerifierConfig};
//! use immuproof::state::MemoryStateHolder;
//!
//! fn example(server_state: ImmuState, response: VerifiableEntry) -> immuproof::Result<()> {
//!     let verifier = Verifier::new(VerifierConfig::default(), MemoryStateHolder::new());
//!
//!     // Trust the server's state once, on first connection
//!     verifier.bootstrap(&server_state)?;
//!
//!     // Every later read is checked against it
//!     let verified = verifier.verify_entry(&EntryRequest::latest(b"key".to_vec()), &response)?;
//!     println!("{:?} at tx {}", verified.value.value, verified.state.tx_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `immuproof::core` - Digests, hash trees, transactions and proof checks
//! - `immuproof::state` - Trusted state holders

pub mod entry;
pub mod error;
pub mod verifiable;
pub mod verifier;

// Re-export component crates
pub use immuproof_core as core;
pub use immuproof_state as state;

// Re-export main types for convenience
pub use entry::{Entry, Reference};
pub use error::{Result, VerificationFailure, VerifyError};
pub use verifiable::{EntryRequest, VerifiableEntry, VerifiableTx};
pub use verifier::{Verified, Verifier, VerifierConfig};

// Re-export commonly used core types
pub use immuproof_core::{
    DualProof, ImmuState, InclusionProof, Keypair, KvMetadata, PublicKey, Sha256Hash, Tx,
    TxEntry, TxHeader, TxId, TxVersion,
};
