//! Database entries and how the server encodes them into transactions.
//!
//! Transactions do not hold user keys and values verbatim. The database
//! prefixes every key, and every value with its kind:
//!
//! ```text
//! key       = 0x00 || key
//! plain     = 0x00 || value
//! reference = 0x01 || be64(at_tx) || 0x00 || referenced_key
//! ```
//!
//! A reference is stored under its own key and metadata; its value points at
//! the referenced key, optionally pinned to a transaction (`at_tx == 0`
//! follows the latest value).

use immuproof_core::{Kv, KvMetadata, Result, Sha256Hash, TxId, TxVersion};
use serde::{Deserialize, Serialize};

/// Prefix of every key written through the key/value interface.
pub const SET_KEY_PREFIX: u8 = 0x00;

/// Prefix of a value holding user data.
pub const PLAIN_VALUE_PREFIX: u8 = 0x00;

/// Prefix of a value pointing at another key.
pub const REFERENCE_VALUE_PREFIX: u8 = 0x01;

/// `0x00 || key`
pub fn encode_key(key: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(1 + key.len());
    encoded.push(SET_KEY_PREFIX);
    encoded.extend_from_slice(key);
    encoded
}

/// `0x00 || value`
pub fn encode_value(value: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(1 + value.len());
    encoded.push(PLAIN_VALUE_PREFIX);
    encoded.extend_from_slice(value);
    encoded
}

/// `0x01 || be64(at_tx) || 0x00 || referenced_key`
pub fn encode_reference_value(referenced_key: &[u8], at_tx: TxId) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(1 + 8 + 1 + referenced_key.len());
    encoded.push(REFERENCE_VALUE_PREFIX);
    encoded.extend_from_slice(&at_tx.to_be_bytes());
    encoded.extend_from_slice(&encode_key(referenced_key));
    encoded
}

/// Key/value pair as written by a plain set.
pub fn encoded_kv(key: &[u8], metadata: Option<KvMetadata>, value: &[u8]) -> Kv {
    Kv {
        key: encode_key(key),
        metadata,
        value: Some(encode_value(value)),
    }
}

/// Key/value pair as written by a reference set.
pub fn encoded_reference(
    key: &[u8],
    metadata: Option<KvMetadata>,
    referenced_key: &[u8],
    at_tx: TxId,
) -> Kv {
    Kv {
        key: encode_key(key),
        metadata,
        value: Some(encode_reference_value(referenced_key, at_tx)),
    }
}

/// The reference through which an entry was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Transaction that wrote the reference.
    pub tx: TxId,
    /// The reference's own key.
    pub key: Vec<u8>,
    pub metadata: Option<KvMetadata>,
    /// Transaction the reference is pinned to, 0 for none.
    pub at_tx: TxId,
}

/// A resolved database entry, with user-facing key and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Transaction that wrote the value.
    pub tx: TxId,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub metadata: Option<KvMetadata>,
    /// Set when the entry was read through a reference.
    pub referenced_by: Option<Reference>,
}

impl Entry {
    pub fn new(tx: TxId, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tx,
            key: key.into(),
            value: value.into(),
            metadata: None,
            referenced_by: None,
        }
    }

    /// Key the entry was requested under: the reference key if any.
    pub fn lookup_key(&self) -> &[u8] {
        match &self.referenced_by {
            Some(reference) => &reference.key,
            None => &self.key,
        }
    }

    /// Transaction whose entries hash proves this entry.
    pub fn proving_tx(&self) -> TxId {
        match &self.referenced_by {
            Some(reference) => reference.tx,
            None => self.tx,
        }
    }

    /// Whether the entry, or the reference it was read through, is deleted.
    pub fn is_deleted(&self) -> bool {
        let deleted = |md: &Option<KvMetadata>| md.as_ref().is_some_and(KvMetadata::is_deleted);
        deleted(&self.metadata)
            || self
                .referenced_by
                .as_ref()
                .is_some_and(|reference| deleted(&reference.metadata))
    }

    /// The key/value pair the server actually stored for this entry.
    pub fn encoded_kv(&self) -> Kv {
        match &self.referenced_by {
            None => encoded_kv(&self.key, self.metadata, &self.value),
            Some(reference) => {
                encoded_reference(&reference.key, reference.metadata, &self.key, reference.at_tx)
            }
        }
    }

    /// Digest of the stored pair under the given header version.
    pub fn digest_for(&self, version: TxVersion) -> Result<Sha256Hash> {
        self.encoded_kv().digest(version)
    }
}
