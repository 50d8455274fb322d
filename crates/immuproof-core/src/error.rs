//! Error types for immuproof core.
//!
//! Everything here is a structural error: malformed or self-inconsistent
//! input. Failed cryptographic checks are reported by the verification
//! predicates as `false`, never through this type.

use thiserror::Error;

/// Structural errors raised while digesting, building trees or assembling
/// transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unsupported tx header version: {0}")]
    UnsupportedVersion(u16),

    #[error("metadata is not supported by tx header version 0")]
    MetadataUnsupported,

    #[error("illegal arguments: {0}")]
    IllegalArguments(String),

    #[error("max tree width exceeded: {width} > {max_width}")]
    MaxWidthExceeded { width: usize, max_width: usize },

    #[error("hash tree has not been built")]
    TreeNotBuilt,

    #[error("key not found")]
    KeyNotFound,

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("entry count mismatch: header declares {expected}, got {actual}")]
    EntryCountMismatch { expected: u32, actual: usize },

    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
