//! Golden vectors for byte-exact compatibility with the server.
//!
//! Every digest, alh and state signature must match these exactly, or
//! proofs from a real server will never verify.

use immuproof::core::EMPTY_HASH;
use immuproof::{ImmuState, Keypair, Sha256Hash};
use immuproof_testkit::{all_vectors, compute, export_json, verify_all_vectors, VectorRecord};

const STATE_SEED: [u8; 32] = [0x42; 32];
const STATE_PUBLIC_KEY: &str = "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12";
const STATE_PAYLOAD: &str = "0000000964656661756c746462000000000000002a\
                             f35e847ea336984240b3a34112101347b6dd7c60b32c59da37f223e6e3660834";
const STATE_SIGNATURE: &str = "f6428a77bd4641297aab29e00bf479ff39c8f234a9ec6372177c07e90946379e\
                               0c433f948b87de35b1a11cf87b11dd26dc08db9b0da4313b31c814286822d301";

fn golden_state() -> ImmuState {
    ImmuState::new("defaultdb", 42, Sha256Hash::hash(b"alh"))
}

#[test]
fn test_all_vectors_match() {
    let failed = verify_all_vectors();
    assert!(failed.is_empty(), "vectors failed: {failed:?}");
}

#[test]
fn test_each_vector() {
    for vector in all_vectors() {
        let digest = compute(&vector).unwrap();
        assert_eq!(digest.to_hex(), vector.expected, "{}", vector.name);
    }
}

#[test]
fn test_vectors_deterministic() {
    for (a, b) in all_vectors().iter().zip(all_vectors().iter()) {
        assert_eq!(compute(a).unwrap(), compute(b).unwrap(), "{}", a.name);
    }
}

#[test]
fn test_empty_hash_constant() {
    assert_eq!(EMPTY_HASH, Sha256Hash::hash(b""));
    assert_eq!(EMPTY_HASH.to_hex(), all_vectors()[0].expected);
}

#[test]
fn test_state_signed_payload() {
    let payload = golden_state().signed_payload().unwrap();
    assert_eq!(hex::encode(payload), STATE_PAYLOAD);
}

#[test]
fn test_state_signature_deterministic() {
    let keypair = Keypair::from_seed(&STATE_SEED);
    assert_eq!(keypair.public_key().to_hex(), STATE_PUBLIC_KEY);

    let signed = golden_state().signed(&keypair).unwrap();
    assert_eq!(signed.signature.as_deref().map(hex::encode).as_deref(), Some(STATE_SIGNATURE));
    assert!(signed.check_signature(Some(&keypair.public_key())));
}

#[test]
fn test_state_signature_from_hex() {
    let key = immuproof::PublicKey::from_hex(STATE_PUBLIC_KEY).unwrap();
    let state = golden_state().with_signature(hex::decode(STATE_SIGNATURE).unwrap());
    assert!(state.check_signature(Some(&key)));

    // Any change to the signed fields breaks it
    let mut moved = state.clone();
    moved.tx_id += 1;
    assert!(!moved.check_signature(Some(&key)));

    let mut renamed = state;
    renamed.database = "otherdb".to_string();
    assert!(!renamed.check_signature(Some(&key)));
}

#[test]
fn print_golden_vectors_json() {
    let json = export_json().unwrap();
    let records: Vec<VectorRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(records.len(), all_vectors().len());
    println!("{json}");
}
