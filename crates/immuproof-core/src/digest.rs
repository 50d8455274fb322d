//! Entry digests.
//!
//! The digest of an entry is the leaf value of its transaction's hash tree,
//! so it must reproduce the server's layout byte for byte:
//!
//! - v0: `sha256(key || sha256(value))`
//! - v1: `sha256(be16(len(md)) || md || be16(len(key)) || key || sha256(value))`
//!
//! Version 0 predates metadata. Supplying metadata under v0 is an error, not
//! something to drop silently.

use serde::{Deserialize, Serialize};

use crate::crypto::{hash_value, Sha256Hash};
use crate::error::{Error, Result};
use crate::metadata::KvMetadata;
use crate::types::TxVersion;

/// A key/value pair as stored by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kv {
    pub key: Vec<u8>,
    pub metadata: Option<KvMetadata>,
    /// `None` hashes to the empty-input SHA-256, not to zeros.
    pub value: Option<Vec<u8>>,
}

impl Kv {
    /// Create a key/value pair without metadata.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            metadata: None,
            value: Some(value.into()),
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: KvMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Hash of the value as it appears in the transaction.
    pub fn value_hash(&self) -> Sha256Hash {
        hash_value(self.value.as_deref())
    }

    /// Digest this pair under the given header version.
    pub fn digest(&self, version: TxVersion) -> Result<Sha256Hash> {
        entry_digest(version, &self.key, self.metadata.as_ref(), &self.value_hash())
    }
}

/// Digest an entry from its key, metadata and already-hashed value.
///
/// Transaction listings only carry value hashes, so this is the form both
/// [`Kv::digest`] and transaction entries reduce to.
pub fn entry_digest(
    version: TxVersion,
    key: &[u8],
    metadata: Option<&KvMetadata>,
    value_hash: &Sha256Hash,
) -> Result<Sha256Hash> {
    match version {
        TxVersion::V0 => {
            if metadata.is_some() {
                return Err(Error::MetadataUnsupported);
            }
            Ok(Sha256Hash::hash_parts(&[key, &value_hash.0]))
        }
        TxVersion::V1 => {
            let md_bytes = metadata.map(KvMetadata::bytes).unwrap_or_default();
            let md_len = u16::try_from(md_bytes.len())
                .map_err(|_| Error::IllegalArguments("metadata too long".into()))?;
            let key_len = u16::try_from(key.len()).map_err(|_| {
                Error::IllegalArguments(format!("key length {} exceeds 65535", key.len()))
            })?;

            Ok(Sha256Hash::hash_parts(&[
                &md_len.to_be_bytes(),
                &md_bytes,
                &key_len.to_be_bytes(),
                key,
                &value_hash.0,
            ]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EMPTY_HASH;
    use crate::metadata::Attribute;

    #[test]
    fn test_v0_layout() {
        let kv = Kv::new(b"key".to_vec(), b"value".to_vec());
        let mut expected = b"key".to_vec();
        expected.extend_from_slice(&Sha256Hash::hash(b"value").0);

        assert_eq!(kv.digest(TxVersion::V0).unwrap(), Sha256Hash::hash(&expected));
    }

    #[test]
    fn test_v1_layout_without_metadata() {
        let kv = Kv::new(b"key".to_vec(), b"value".to_vec());
        let mut expected = vec![0, 0, 0, 3];
        expected.extend_from_slice(b"key");
        expected.extend_from_slice(&Sha256Hash::hash(b"value").0);

        assert_eq!(kv.digest(TxVersion::V1).unwrap(), Sha256Hash::hash(&expected));
    }

    #[test]
    fn test_v1_layout_with_metadata() {
        let md = KvMetadata::new().with(Attribute::Deleted);
        let kv = Kv::new(b"k".to_vec(), b"v".to_vec()).with_metadata(md);
        let mut expected = vec![0, 1, 0, 0, 1, b'k'];
        expected.extend_from_slice(&Sha256Hash::hash(b"v").0);

        assert_eq!(kv.digest(TxVersion::V1).unwrap(), Sha256Hash::hash(&expected));
    }

    #[test]
    fn test_v1_empty_metadata_matches_none() {
        let plain = Kv::new(b"k".to_vec(), b"v".to_vec());
        let empty_md = plain.clone().with_metadata(KvMetadata::new());
        assert_eq!(
            plain.digest(TxVersion::V1).unwrap(),
            empty_md.digest(TxVersion::V1).unwrap()
        );
    }

    #[test]
    fn test_v0_rejects_metadata() {
        let kv = Kv::new(b"k".to_vec(), b"v".to_vec()).with_metadata(KvMetadata::new());
        assert_eq!(kv.digest(TxVersion::V0), Err(Error::MetadataUnsupported));
    }

    #[test]
    fn test_absent_value_uses_empty_hash() {
        let kv = Kv {
            key: b"k".to_vec(),
            metadata: None,
            value: None,
        };
        assert_eq!(kv.value_hash(), EMPTY_HASH);
        assert_eq!(
            kv.digest(TxVersion::V0).unwrap(),
            Kv::new(b"k".to_vec(), Vec::new()).digest(TxVersion::V0).unwrap()
        );
    }

    #[test]
    fn test_digest_is_deterministic_and_version_dependent() {
        let kv = Kv::new(b"key".to_vec(), b"value".to_vec());
        assert_eq!(kv.digest(TxVersion::V1).unwrap(), kv.digest(TxVersion::V1).unwrap());
        assert_ne!(kv.digest(TxVersion::V0).unwrap(), kv.digest(TxVersion::V1).unwrap());
    }
}
