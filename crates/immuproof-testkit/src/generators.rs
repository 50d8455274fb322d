//! Proptest generators for property-based testing.

use proptest::prelude::*;

use immuproof_core::{Attribute, Keypair, Kv, KvMetadata, Sha256Hash, TxVersion};

use crate::fixtures::LedgerFixture;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random digest.
pub fn sha256_hash() -> impl Strategy<Value = Sha256Hash> {
    any::<[u8; 32]>().prop_map(Sha256Hash)
}

/// Generate `1..=max` random digests.
pub fn digests(max: usize) -> impl Strategy<Value = Vec<Sha256Hash>> {
    prop::collection::vec(sha256_hash(), 1..=max)
}

/// Generate a header version.
pub fn tx_version() -> impl Strategy<Value = TxVersion> {
    prop_oneof![Just(TxVersion::V0), Just(TxVersion::V1)]
}

/// Generate metadata with any subset of the attributes.
pub fn kv_metadata() -> impl Strategy<Value = KvMetadata> {
    (any::<bool>(), any::<Option<u64>>(), any::<bool>()).prop_map(
        |(deleted, expires_at, non_indexable)| {
            let mut md = KvMetadata::new();
            if deleted {
                md.set(Attribute::Deleted);
            }
            if let Some(secs) = expires_at {
                md.set(Attribute::ExpiresAt(secs));
            }
            if non_indexable {
                md.set(Attribute::NonIndexable);
            }
            md
        },
    )
}

/// Generate key bytes of up to `max_len` bytes, at least one.
pub fn key(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len)
}

/// Generate value bytes of up to `max_len` bytes.
pub fn value(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a pair without metadata, valid under every version.
pub fn plain_kv() -> impl Strategy<Value = Kv> {
    (key(64), value(256)).prop_map(|(k, v)| Kv::new(k, v))
}

/// Generate a pair with optional metadata, valid under v1.
pub fn kv() -> impl Strategy<Value = Kv> {
    (key(64), prop::option::of(kv_metadata()), value(256)).prop_map(|(k, md, v)| Kv {
        key: k,
        metadata: md,
        value: Some(v),
    })
}

/// Parameters for generating a ledger history.
#[derive(Debug, Clone)]
pub struct LedgerParams {
    pub version: TxVersion,
    pub bl_lag: u64,
    pub txs: usize,
    pub width: usize,
}

impl Arbitrary for LedgerParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            tx_version(),
            0u64..=8,  // linked tree lag
            1usize..=24, // transactions
            1usize..=5,  // entries per tx
        )
            .prop_map(|(version, bl_lag, txs, width)| LedgerParams {
                version,
                bl_lag,
                txs,
                width,
            })
            .boxed()
    }
}

/// Build a ledger from parameters.
pub fn ledger_from_params(params: &LedgerParams) -> LedgerFixture {
    let mut ledger = LedgerFixture::new()
        .with_version(params.version)
        .with_bl_lag(params.bl_lag);
    ledger.fill(params.txs, params.width);
    ledger
}
