//! # immuproof testkit
//!
//! Testing utilities for immuproof.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A reference Merkle log and a simulated ledger server that
//!   issue signed states and proofs
//! - **Generators**: Proptest strategies for property-based testing
//! - **Golden vectors**: Known digests computed by an independent implementation
//!
//! ## Golden Vectors
//!
//! ```rust
//! use immuproof_testkit::vectors::{all_vectors, compute};
//!
//! for vector in all_vectors() {
//!     let digest = compute(&vector).unwrap();
//!     assert_eq!(digest.to_hex(), vector.expected, "{}", vector.name);
//! }
//! ```
//!
//! ## Simulated Ledger
//!
//! ```rust
//! use immuproof::EntryRequest;
//! use immuproof_testkit::fixtures::LedgerFixture;
//!
//! let mut ledger = LedgerFixture::new().with_bl_lag(2);
//! ledger.set(b"key", b"value");
//! ledger.fill(5, 3);
//!
//! let verifier = ledger.verifier();
//! verifier.bootstrap(&ledger.current_state()).unwrap();
//!
//! let trusted = verifier.state().unwrap().tx_id;
//! let response = ledger.verifiable_entry(b"key", trusted);
//! let verified = verifier
//!     .verify_entry(&EntryRequest::latest(b"key".to_vec()), &response)
//!     .unwrap();
//! assert_eq!(verified.value.value, b"value");
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use immuproof_testkit::generators::{ledger_from_params, LedgerParams};
//!
//! proptest! {
//!     #[test]
//!     fn every_dual_proof_verifies(params: LedgerParams) {
//!         let ledger = ledger_from_params(&params);
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{letter_digests, tx_entry, LedgerFixture, MerkleLog};
pub use generators::{ledger_from_params, LedgerParams};
pub use vectors::{
    all_vectors, compute, export_json, verify_all_vectors, GoldenVector, VectorInput, VectorRecord,
};
