//! Transactions: header hashing and assembly from wire data.
//!
//! A header commits to the whole ledger history through its accumulated
//! linked hash:
//!
//! ```text
//! alh        = sha256(be64(id) || prev_alh || inner_hash)
//! inner_hash = sha256(be64(ts) || be16(version) || <count> || eh || be64(bl_tx_id) || bl_root)
//! ```
//!
//! where `<count>` is `be16(n)` for v0 and `be16(0) || be32(n)` for v1. The
//! two zero bytes in v1 are the length of a header metadata block that is
//! never populated; they must stay for hash compatibility.

use serde::{Deserialize, Serialize};

use crate::crypto::Sha256Hash;
use crate::digest::entry_digest;
use crate::error::{Error, Result};
use crate::htree::{HTree, InclusionProof};
use crate::metadata::KvMetadata;
use crate::types::{TxId, TxVersion};

/// Transaction header as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHeader {
    pub id: TxId,
    pub prev_alh: Sha256Hash,
    /// Commit time, unix seconds.
    pub ts: i64,
    pub version: TxVersion,
    /// Number of entries in the transaction.
    pub nentries: u32,
    /// Root of the entries hash tree.
    pub eh: Sha256Hash,
    /// Id of the last transaction included in the linked tree at commit time.
    pub bl_tx_id: TxId,
    /// Root of the linked tree at `bl_tx_id`.
    pub bl_root: Sha256Hash,
}

impl TxHeader {
    /// Accumulated linked hash of this transaction.
    pub fn alh(&self) -> Sha256Hash {
        Sha256Hash::hash_parts(&[
            &self.id.to_be_bytes(),
            &self.prev_alh.0,
            &self.inner_hash().0,
        ])
    }

    /// Hash of this header's own fields, excluding id and previous alh.
    pub fn inner_hash(&self) -> Sha256Hash {
        let mut buf = Vec::with_capacity(8 + 2 + 2 + 4 + 32 + 8 + 32);
        buf.extend_from_slice(&self.ts.to_be_bytes());
        buf.extend_from_slice(&self.version.as_u16().to_be_bytes());

        match self.version {
            TxVersion::V0 => {
                buf.extend_from_slice(&(self.nentries as u16).to_be_bytes());
            }
            TxVersion::V1 => {
                // Reserved header metadata length, always empty
                buf.extend_from_slice(&0u16.to_be_bytes());
                buf.extend_from_slice(&self.nentries.to_be_bytes());
            }
        }

        buf.extend_from_slice(&self.eh.0);
        buf.extend_from_slice(&self.bl_tx_id.to_be_bytes());
        buf.extend_from_slice(&self.bl_root.0);

        Sha256Hash::hash(&buf)
    }

    /// Check fields the hash layout cannot represent.
    pub fn validate(&self) -> Result<()> {
        if self.id == 0 {
            return Err(Error::IllegalArguments("tx id must be non-zero".into()));
        }
        if self.version == TxVersion::V0 && self.nentries > u32::from(u16::MAX) {
            return Err(Error::IllegalArguments(format!(
                "v0 header cannot encode {} entries",
                self.nentries
            )));
        }
        if self.bl_tx_id >= self.id {
            return Err(Error::IllegalArguments(format!(
                "linked tx {} is not older than tx {}",
                self.bl_tx_id, self.id
            )));
        }
        Ok(())
    }
}

/// One entry of a transaction listing.
///
/// Listings carry the value hash and length, never the value itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEntry {
    pub key: Vec<u8>,
    pub metadata: Option<KvMetadata>,
    pub value_len: u32,
    pub value_hash: Sha256Hash,
}

impl TxEntry {
    /// Digest this entry under the given header version.
    pub fn digest(&self, version: TxVersion) -> Result<Sha256Hash> {
        entry_digest(version, &self.key, self.metadata.as_ref(), &self.value_hash)
    }
}

/// A transaction whose entries have been checked against its header.
///
/// Built once per verification from wire data and never mutated.
#[derive(Debug, Clone)]
pub struct Tx {
    header: TxHeader,
    entries: Vec<TxEntry>,
    htree: HTree,
}

impl Tx {
    /// Assemble a transaction and check its entries hash.
    ///
    /// Fails with [`Error::CorruptedData`] if the tree rebuilt from `entries`
    /// does not have root `header.eh`.
    pub fn from_wire(header: TxHeader, entries: Vec<TxEntry>) -> Result<Self> {
        header.validate()?;

        if header.nentries as usize != entries.len() {
            return Err(Error::EntryCountMismatch {
                expected: header.nentries,
                actual: entries.len(),
            });
        }

        let digests = entries
            .iter()
            .map(|e| e.digest(header.version))
            .collect::<Result<Vec<_>>>()?;

        let htree = HTree::build(&digests)?;
        if htree.root()? != header.eh {
            return Err(Error::CorruptedData(format!(
                "entries hash of tx {} does not match its entries",
                header.id
            )));
        }

        Ok(Self {
            header,
            entries,
            htree,
        })
    }

    pub fn header(&self) -> &TxHeader {
        &self.header
    }

    pub fn entries(&self) -> &[TxEntry] {
        &self.entries
    }

    pub fn id(&self) -> TxId {
        self.header.id
    }

    /// Index of the first entry with the given key.
    pub fn index_of(&self, key: &[u8]) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// Inclusion proof of the first entry with the given key.
    pub fn proof(&self, key: &[u8]) -> Result<InclusionProof> {
        let index = self.index_of(key).ok_or(Error::KeyNotFound)?;
        self.htree.inclusion_proof(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Kv;
    use crate::htree::verify_inclusion;
    use crate::metadata::Attribute;

    fn entry(kv: &Kv) -> TxEntry {
        TxEntry {
            key: kv.key.clone(),
            metadata: kv.metadata,
            value_len: kv.value.as_ref().map_or(0, |v| v.len() as u32),
            value_hash: kv.value_hash(),
        }
    }

    fn header_for(version: TxVersion, entries: &[TxEntry]) -> TxHeader {
        let digests: Vec<_> = entries.iter().map(|e| e.digest(version).unwrap()).collect();
        TxHeader {
            id: 7,
            prev_alh: Sha256Hash::hash(b"prev"),
            ts: 1_700_000_000,
            version,
            nentries: entries.len() as u32,
            eh: HTree::build(&digests).unwrap().root().unwrap(),
            bl_tx_id: 5,
            bl_root: Sha256Hash::hash(b"bl"),
        }
    }

    fn sample_entries() -> Vec<TxEntry> {
        vec![
            entry(&Kv::new(b"alpha".to_vec(), b"1".to_vec())),
            entry(&Kv::new(b"beta".to_vec(), b"2".to_vec())),
            entry(&Kv::new(b"gamma".to_vec(), b"3".to_vec())),
        ]
    }

    #[test]
    fn test_inner_hash_v0_layout() {
        let hdr = header_for(TxVersion::V0, &sample_entries());

        let mut expected = Vec::new();
        expected.extend_from_slice(&hdr.ts.to_be_bytes());
        expected.extend_from_slice(&[0, 0]);
        expected.extend_from_slice(&[0, 3]);
        expected.extend_from_slice(&hdr.eh.0);
        expected.extend_from_slice(&5u64.to_be_bytes());
        expected.extend_from_slice(&hdr.bl_root.0);

        assert_eq!(hdr.inner_hash(), Sha256Hash::hash(&expected));
    }

    #[test]
    fn test_inner_hash_v1_keeps_metadata_placeholder() {
        let hdr = header_for(TxVersion::V1, &sample_entries());

        let mut expected = Vec::new();
        expected.extend_from_slice(&hdr.ts.to_be_bytes());
        expected.extend_from_slice(&[0, 1]);
        expected.extend_from_slice(&[0, 0]);
        expected.extend_from_slice(&[0, 0, 0, 3]);
        expected.extend_from_slice(&hdr.eh.0);
        expected.extend_from_slice(&5u64.to_be_bytes());
        expected.extend_from_slice(&hdr.bl_root.0);

        assert_eq!(hdr.inner_hash(), Sha256Hash::hash(&expected));
    }

    #[test]
    fn test_alh_chains_id_prev_and_inner() {
        let hdr = header_for(TxVersion::V1, &sample_entries());
        let mut expected = 7u64.to_be_bytes().to_vec();
        expected.extend_from_slice(&hdr.prev_alh.0);
        expected.extend_from_slice(&hdr.inner_hash().0);
        assert_eq!(hdr.alh(), Sha256Hash::hash(&expected));
    }

    #[test]
    fn test_from_wire_accepts_consistent_tx() {
        let entries = sample_entries();
        let hdr = header_for(TxVersion::V1, &entries);
        let tx = Tx::from_wire(hdr.clone(), entries.clone()).unwrap();

        let proof = tx.proof(b"beta").unwrap();
        let digest = entries[1].digest(TxVersion::V1).unwrap();
        assert!(verify_inclusion(&proof, &digest, &hdr.eh));
    }

    #[test]
    fn test_from_wire_rejects_tampered_entries() {
        let mut entries = sample_entries();
        let hdr = header_for(TxVersion::V1, &entries);
        entries[2].value_hash = Sha256Hash::hash(b"forged");

        let result = Tx::from_wire(hdr, entries);
        assert!(matches!(result, Err(Error::CorruptedData(_))));
    }

    #[test]
    fn test_from_wire_rejects_tampered_eh() {
        let entries = sample_entries();
        let mut hdr = header_for(TxVersion::V0, &entries);
        hdr.eh.0[0] ^= 0xff;

        assert!(matches!(
            Tx::from_wire(hdr, entries),
            Err(Error::CorruptedData(_))
        ));
    }

    #[test]
    fn test_from_wire_rejects_count_mismatch() {
        let entries = sample_entries();
        let mut hdr = header_for(TxVersion::V1, &entries);
        hdr.nentries = 4;

        assert!(matches!(
            Tx::from_wire(hdr, entries),
            Err(Error::EntryCountMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_from_wire_rejects_metadata_under_v0() {
        let md = KvMetadata::new().with(Attribute::NonIndexable);
        let mut entries = sample_entries();
        let hdr = header_for(TxVersion::V0, &entries);
        entries[0].metadata = Some(md);

        assert_eq!(
            Tx::from_wire(hdr, entries).unwrap_err(),
            Error::MetadataUnsupported
        );
    }

    #[test]
    fn test_proof_missing_key() {
        let entries = sample_entries();
        let tx = Tx::from_wire(header_for(TxVersion::V1, &entries), entries).unwrap();
        assert_eq!(tx.proof(b"delta").unwrap_err(), Error::KeyNotFound);
    }

    #[test]
    fn test_proof_uses_first_matching_key() {
        let kv = Kv::new(b"dup".to_vec(), b"x".to_vec());
        let entries = vec![entry(&kv), entry(&Kv::new(b"dup".to_vec(), b"y".to_vec()))];
        let tx = Tx::from_wire(header_for(TxVersion::V1, &entries), entries).unwrap();
        assert_eq!(tx.proof(b"dup").unwrap().leaf, 0);
    }

    #[test]
    fn test_validate_rejects_bad_headers() {
        let entries = sample_entries();
        let mut hdr = header_for(TxVersion::V1, &entries);
        hdr.bl_tx_id = hdr.id;
        assert!(hdr.validate().is_err());

        let mut hdr = header_for(TxVersion::V1, &entries);
        hdr.id = 0;
        assert!(hdr.validate().is_err());

        let mut hdr = header_for(TxVersion::V0, &entries);
        hdr.nentries = 70_000;
        assert!(hdr.validate().is_err());
    }
}
