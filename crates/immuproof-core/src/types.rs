//! Strong type definitions shared across immuproof.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// Transaction identifier. Ids start at 1; 0 means "no transaction".
pub type TxId = u64;

/// Transaction header version.
///
/// The version selects both the header's inner hash layout and the digest
/// rule for the transaction's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum TxVersion {
    /// Legacy layout. Entries carry no metadata.
    V0,
    /// Entries may carry metadata; the header has a reserved metadata field.
    V1,
}

impl TxVersion {
    /// The raw wire value.
    pub const fn as_u16(self) -> u16 {
        match self {
            TxVersion::V0 => 0,
            TxVersion::V1 => 1,
        }
    }
}

impl TryFrom<u16> for TxVersion {
    type Error = Error;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(TxVersion::V0),
            1 => Ok(TxVersion::V1),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

impl From<TxVersion> for u16 {
    fn from(version: TxVersion) -> Self {
        version.as_u16()
    }
}

impl fmt::Display for TxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u16())
    }
}
