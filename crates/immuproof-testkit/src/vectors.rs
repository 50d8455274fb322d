//! Golden test vectors for byte-exact hashing.
//!
//! Expected values were computed by an independent implementation of the
//! server's hashing rules. Any change in layout, prefix or byte order shows
//! up here first.

use immuproof_core::{
    Attribute, HTree, Kv, KvMetadata, Result, Sha256Hash, TxHeader, TxVersion, EMPTY_HASH,
};
use serde::{Deserialize, Serialize};

use crate::fixtures::letter_digests;

/// What a vector hashes.
#[derive(Debug, Clone)]
pub enum VectorInput {
    /// The hash of an absent value.
    HashOfNothing,
    /// Digest of a key/value pair.
    KvDigest {
        version: TxVersion,
        key: &'static [u8],
        value: &'static [u8],
        /// `None` for no metadata at all.
        metadata: Option<&'static [Attribute]>,
    },
    /// Alh of a header. Hash fields are given as the preimages of their
    /// SHA-256, the empty preimage standing for the zero hash.
    HeaderAlh {
        version: TxVersion,
        id: u64,
        prev_alh: &'static [u8],
        ts: i64,
        nentries: u32,
        eh: &'static [u8],
        bl_tx_id: u64,
        bl_root: &'static [u8],
    },
    /// Root of the hash tree over the first `n` letter digests.
    LetterTreeRoot { n: usize },
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub input: VectorInput,
    /// Expected digest (hex).
    pub expected: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "hash of nothing",
            input: VectorInput::HashOfNothing,
            expected: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        },
        GoldenVector {
            name: "v0 key/value",
            input: VectorInput::KvDigest {
                version: TxVersion::V0,
                key: b"key",
                value: b"value",
                metadata: None,
            },
            expected: "d5112982fb16717b8247efcf820beddf70d568a9e05741bc23f01747b2ed1992",
        },
        GoldenVector {
            name: "v1 key/value without metadata",
            input: VectorInput::KvDigest {
                version: TxVersion::V1,
                key: b"key",
                value: b"value",
                metadata: None,
            },
            expected: "92c2e88f896a401a5c36befed0f989554c566a0e82ae7ae37a7d6e3e222e3c56",
        },
        GoldenVector {
            name: "v1 key/value with every attribute",
            input: VectorInput::KvDigest {
                version: TxVersion::V1,
                key: b"key",
                value: b"value",
                metadata: Some(&[
                    Attribute::NonIndexable,
                    Attribute::ExpiresAt(1_700_000_000),
                    Attribute::Deleted,
                ]),
            },
            expected: "1e537a6895abe03e7435d74dd25a394cf0f63076711d42db6220aa7eaf15fc6b",
        },
        GoldenVector {
            name: "v1 deleted key with empty value",
            input: VectorInput::KvDigest {
                version: TxVersion::V1,
                key: b"key",
                value: b"",
                metadata: Some(&[Attribute::Deleted]),
            },
            expected: "76672693d0a87d1ac3e937249ca9790d88cde0c8786f8479360277e0f277685c",
        },
        GoldenVector {
            name: "v0 header alh",
            input: VectorInput::HeaderAlh {
                version: TxVersion::V0,
                id: 1,
                prev_alh: b"",
                ts: 1_700_000_000,
                nentries: 1,
                eh: b"eh",
                bl_tx_id: 0,
                bl_root: b"",
            },
            expected: "db4f82bc62384fe198dd565ff9fe357b7baa3735f919b1452fc0c0ed34b1b45f",
        },
        GoldenVector {
            name: "v1 header alh",
            input: VectorInput::HeaderAlh {
                version: TxVersion::V1,
                id: 5,
                prev_alh: b"prev",
                ts: 1_700_000_000,
                nentries: 3,
                eh: b"eh",
                bl_tx_id: 4,
                bl_root: b"bl",
            },
            expected: "b2163432a48b01c66b9cfe4300a9e803f86ef2d40ddab68909fb00f248659362",
        },
        GoldenVector {
            name: "tree of five letters",
            input: VectorInput::LetterTreeRoot { n: 5 },
            expected: "4dc1abc938a0141a3c7cd1fed88948c35c4452e7e8aff9b1503eb5100a2c77b3",
        },
        GoldenVector {
            name: "tree of seven letters",
            input: VectorInput::LetterTreeRoot { n: 7 },
            expected: "42cabb02e47f518fdebde8adcaa3563f6adce2df233ff01083e5026a58ac9184",
        },
    ]
}

fn preimage_hash(preimage: &[u8]) -> Sha256Hash {
    if preimage.is_empty() {
        Sha256Hash::ZERO
    } else {
        Sha256Hash::hash(preimage)
    }
}

/// Compute the digest a vector describes.
pub fn compute(vector: &GoldenVector) -> Result<Sha256Hash> {
    match &vector.input {
        VectorInput::HashOfNothing => Ok(Kv {
            key: Vec::new(),
            metadata: None,
            value: None,
        }
        .value_hash()),
        VectorInput::KvDigest {
            version,
            key,
            value,
            metadata,
        } => {
            let mut kv = Kv::new(key.to_vec(), value.to_vec());
            if let Some(attributes) = metadata {
                let md = attributes
                    .iter()
                    .fold(KvMetadata::new(), |md, attribute| md.with(*attribute));
                kv = kv.with_metadata(md);
            }
            kv.digest(*version)
        }
        VectorInput::HeaderAlh {
            version,
            id,
            prev_alh,
            ts,
            nentries,
            eh,
            bl_tx_id,
            bl_root,
        } => {
            let header = TxHeader {
                id: *id,
                prev_alh: preimage_hash(prev_alh),
                ts: *ts,
                version: *version,
                nentries: *nentries,
                eh: preimage_hash(eh),
                bl_tx_id: *bl_tx_id,
                bl_root: preimage_hash(bl_root),
            };
            header.validate()?;
            Ok(header.alh())
        }
        VectorInput::LetterTreeRoot { n } => HTree::build(&letter_digests(*n))?.root(),
    }
}

/// A vector as exported for other implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub name: String,
    /// Hex of the exact bytes fed to the outermost SHA-256, when the vector
    /// hashes a flat preimage.
    pub preimage: Option<String>,
    pub expected: String,
}

fn preimage(input: &VectorInput) -> Option<Vec<u8>> {
    match input {
        VectorInput::HashOfNothing => Some(Vec::new()),
        VectorInput::KvDigest {
            version: TxVersion::V0,
            key,
            value,
            metadata: None,
        } => {
            let mut bytes = key.to_vec();
            bytes.extend_from_slice(&Sha256Hash::hash(value).0);
            Some(bytes)
        }
        _ => None,
    }
}

/// Export every vector as pretty-printed JSON.
pub fn export_json() -> serde_json::Result<String> {
    let records: Vec<VectorRecord> = all_vectors()
        .iter()
        .map(|v| VectorRecord {
            name: v.name.to_string(),
            preimage: preimage(&v.input).map(hex::encode),
            expected: v.expected.to_string(),
        })
        .collect();
    serde_json::to_string_pretty(&records)
}

/// Verify all vectors, returning the names of those that do not match.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .iter()
        .filter(|v| compute(v).map(|d| d.to_hex()).ok().as_deref() != Some(v.expected))
        .map(|v| v.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        assert!(verify_all_vectors().is_empty(), "{:?}", verify_all_vectors());
    }

    #[test]
    fn test_hash_of_nothing_is_the_empty_constant() {
        let vector = &all_vectors()[0];
        assert_eq!(compute(vector).unwrap(), EMPTY_HASH);
    }

    #[test]
    fn test_export_json() {
        let json = export_json().unwrap();
        let records: Vec<VectorRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(records.len(), all_vectors().len());

        for record in records.iter().filter(|r| r.preimage.is_some()) {
            let bytes = hex::decode(record.preimage.as_deref().unwrap()).unwrap();
            assert_eq!(Sha256Hash::hash(&bytes).to_hex(), record.expected, "{}", record.name);
        }
    }

    #[test]
    fn test_vector_names_unique() {
        let vectors = all_vectors();
        let mut names: Vec<_> = vectors.iter().map(|v| v.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), vectors.len());
    }
}
