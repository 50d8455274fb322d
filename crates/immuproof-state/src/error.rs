//! Error types for state holders.

use thiserror::Error;

/// Errors that can occur while reading or updating a held state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A previous holder of the lock panicked.
    #[error("state lock poisoned")]
    Poisoned,

    /// The state belongs to a different database than the holder serves.
    #[error("state for database {actual} offered to holder of {expected}")]
    DatabaseMismatch { expected: String, actual: String },

    /// The state cannot be held at all.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Result type for state holder operations.
pub type Result<T> = std::result::Result<T, StateError>;
