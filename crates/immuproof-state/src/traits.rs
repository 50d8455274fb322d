//! StateHolder trait: the interface for trusted checkpoint storage.

use immuproof_core::ImmuState;

use crate::error::Result;

/// Result of offering a candidate state to a holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetResult {
    /// The candidate was newer and is now the held state.
    Advanced,
    /// The candidate was not newer than the held state and was discarded.
    Stale {
        /// Tx id of the state that is still held.
        held: u64,
    },
    /// The held state is no longer the one the candidate was checked
    /// against. Nothing was written.
    Conflict {
        /// Tx id of the state that is held instead, 0 if none.
        held: u64,
    },
}

impl SetResult {
    pub fn is_advanced(&self) -> bool {
        matches!(self, SetResult::Advanced)
    }
}

/// Storage for the trusted state of one or more databases.
///
/// # Design Notes
///
/// - **Compare-and-set**: `compare_and_set` writes only while the held state
///   is still `expected` (same tx id and hash, or nothing held for `None`).
///   A candidate proven against an older state can never replace a state
///   that moved on in the meantime.
/// - **Monotonic**: a candidate is adopted only if its tx id is strictly
///   greater than the held one. Equal ids are stale, never overwritten.
/// - **Atomic**: the comparison and the write are a single step with respect
///   to every other call on the same holder.
/// - **Unverified**: holders trust their callers. Signatures and proofs are
///   checked before a state reaches this trait.
pub trait StateHolder: Send + Sync {
    /// Get the held state of a database, if any.
    fn get_state(&self, database: &str) -> Result<Option<ImmuState>>;

    /// Offer a candidate state for its database, checked against the state
    /// it was verified from.
    ///
    /// Returns [`SetResult::Stale`] if the candidate is already held or not
    /// newer than `expected`, and [`SetResult::Conflict`] if the held state
    /// differs from `expected`.
    fn compare_and_set(
        &self,
        expected: Option<&ImmuState>,
        candidate: &ImmuState,
    ) -> Result<SetResult>;
}

impl<H: StateHolder + ?Sized> StateHolder for std::sync::Arc<H> {
    fn get_state(&self, database: &str) -> Result<Option<ImmuState>> {
        (**self).get_state(database)
    }

    fn compare_and_set(
        &self,
        expected: Option<&ImmuState>,
        candidate: &ImmuState,
    ) -> Result<SetResult> {
        (**self).compare_and_set(expected, candidate)
    }
}
