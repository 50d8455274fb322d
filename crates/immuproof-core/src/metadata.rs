//! Key/value entry metadata.
//!
//! Metadata is a closed set of at most three attributes. Each attribute is
//! serialized as `code || payload`, always in ascending code order:
//!
//! | code | attribute       | payload                    |
//! |------|-----------------|----------------------------|
//! | 0    | deleted         | none                       |
//! | 1    | expires-at      | 8 bytes, big-endian secs   |
//! | 2    | non-indexable   | none                       |

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DELETED_CODE: u8 = 0;
const EXPIRES_AT_CODE: u8 = 1;
const NON_INDEXABLE_CODE: u8 = 2;

const ATTRIBUTE_COUNT: usize = 3;
const EXPIRES_AT_SIZE: usize = 8;

/// A single metadata attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// The entry is a logical deletion.
    Deleted,
    /// The entry expires at the given unix time, in seconds.
    ExpiresAt(u64),
    /// The entry is excluded from the key index.
    NonIndexable,
}

impl Attribute {
    /// The attribute's wire code.
    pub const fn code(&self) -> u8 {
        match self {
            Attribute::Deleted => DELETED_CODE,
            Attribute::ExpiresAt(_) => EXPIRES_AT_CODE,
            Attribute::NonIndexable => NON_INDEXABLE_CODE,
        }
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(self.code());
        if let Attribute::ExpiresAt(secs) = self {
            buf.extend_from_slice(&secs.to_be_bytes());
        }
    }
}

/// Metadata attached to a key/value entry.
///
/// Holds at most one attribute of each kind; setting an attribute that is
/// already present replaces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvMetadata {
    attributes: [Option<Attribute>; ATTRIBUTE_COUNT],
}

impl KvMetadata {
    /// Create metadata with no attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any previous attribute of the same kind.
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.set(attribute);
        self
    }

    /// Set an attribute in place.
    pub fn set(&mut self, attribute: Attribute) {
        self.attributes[attribute.code() as usize] = Some(attribute);
    }

    /// Remove the attribute with the given code, if present.
    pub fn clear(&mut self, code: u8) {
        if let Some(slot) = self.attributes.get_mut(code as usize) {
            *slot = None;
        }
    }

    /// Iterate present attributes in code order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().flatten()
    }

    /// Whether no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.attributes.iter().all(Option::is_none)
    }

    pub fn is_deleted(&self) -> bool {
        self.attributes[DELETED_CODE as usize].is_some()
    }

    pub fn is_non_indexable(&self) -> bool {
        self.attributes[NON_INDEXABLE_CODE as usize].is_some()
    }

    /// Expiration time in unix seconds, if any.
    pub fn expires_at(&self) -> Option<u64> {
        match self.attributes[EXPIRES_AT_CODE as usize] {
            Some(Attribute::ExpiresAt(secs)) => Some(secs),
            _ => None,
        }
    }

    /// Whether the entry has expired at `now` (unix seconds).
    pub fn expired_at(&self, now: u64) -> bool {
        self.expires_at().map_or(false, |secs| secs <= now)
    }

    /// Serialize in ascending code order.
    pub fn bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ATTRIBUTE_COUNT + EXPIRES_AT_SIZE);
        for attribute in self.attributes() {
            attribute.write_to(&mut buf);
        }
        buf
    }

    /// Parse the serialized form produced by [`KvMetadata::bytes`].
    ///
    /// Attributes must appear at most once and in ascending code order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut md = Self::new();
        let mut last_code: Option<u8> = None;
        let mut i = 0;

        while i < bytes.len() {
            let code = bytes[i];
            i += 1;

            if last_code.map_or(false, |last| code <= last) {
                return Err(Error::MalformedMetadata(format!(
                    "attribute {code} is duplicated or out of order"
                )));
            }
            last_code = Some(code);

            let attribute = match code {
                DELETED_CODE => Attribute::Deleted,
                NON_INDEXABLE_CODE => Attribute::NonIndexable,
                EXPIRES_AT_CODE => {
                    let end = i + EXPIRES_AT_SIZE;
                    let payload = bytes.get(i..end).ok_or_else(|| {
                        Error::MalformedMetadata("truncated expiration payload".into())
                    })?;
                    let mut secs = [0u8; EXPIRES_AT_SIZE];
                    secs.copy_from_slice(payload);
                    i = end;
                    Attribute::ExpiresAt(u64::from_be_bytes(secs))
                }
                other => {
                    return Err(Error::MalformedMetadata(format!(
                        "unknown attribute code {other}"
                    )))
                }
            };
            md.set(attribute);
        }

        Ok(md)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metadata_serializes_to_nothing() {
        assert!(KvMetadata::new().bytes().is_empty());
        assert!(KvMetadata::new().is_empty());
    }

    #[test]
    fn test_attributes_serialize_in_code_order() {
        // Insertion order must not matter
        let md = KvMetadata::new()
            .with(Attribute::NonIndexable)
            .with(Attribute::ExpiresAt(0x0102030405060708))
            .with(Attribute::Deleted);

        assert_eq!(
            md.bytes(),
            vec![0, 1, 1, 2, 3, 4, 5, 6, 7, 8, 2],
        );
    }

    #[test]
    fn test_set_replaces_same_kind() {
        let md = KvMetadata::new()
            .with(Attribute::ExpiresAt(10))
            .with(Attribute::ExpiresAt(20));
        assert_eq!(md.expires_at(), Some(20));
        assert_eq!(md.attributes().count(), 1);
    }

    #[test]
    fn test_queries() {
        let mut md = KvMetadata::new().with(Attribute::Deleted).with(Attribute::ExpiresAt(100));
        assert!(md.is_deleted());
        assert!(!md.is_non_indexable());
        assert!(md.expired_at(100));
        assert!(!md.expired_at(99));

        md.clear(DELETED_CODE);
        assert!(!md.is_deleted());
    }

    #[test]
    fn test_parse_roundtrip() {
        let md = KvMetadata::new()
            .with(Attribute::Deleted)
            .with(Attribute::ExpiresAt(1_700_000_000));
        assert_eq!(KvMetadata::from_bytes(&md.bytes()).unwrap(), md);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        // Unknown code
        assert!(KvMetadata::from_bytes(&[7]).is_err());
        // Out of order
        assert!(KvMetadata::from_bytes(&[2, 0]).is_err());
        // Duplicated
        assert!(KvMetadata::from_bytes(&[0, 0]).is_err());
        // Truncated expiration
        assert!(KvMetadata::from_bytes(&[1, 0, 0, 0]).is_err());
    }
}
