//! In-memory implementation of the StateHolder trait.
//!
//! Keeps one state per database name. Nothing is persisted; all states are
//! lost when the holder is dropped. Thread-safe via RwLock.

use std::collections::HashMap;
use std::sync::RwLock;

use immuproof_core::ImmuState;

use crate::error::{Result, StateError};
use crate::traits::{SetResult, StateHolder};

/// In-memory state holder.
#[derive(Debug, Default)]
pub struct MemoryStateHolder {
    /// Only states of this database are accepted, if set.
    database: Option<String>,
    states: RwLock<HashMap<String, ImmuState>>,
}

impl MemoryStateHolder {
    /// Create an empty holder accepting states of any database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty holder that only accepts states of `database`.
    pub fn for_database(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            states: RwLock::new(HashMap::new()),
        }
    }

    fn check_database(&self, database: &str) -> Result<()> {
        match &self.database {
            Some(expected) if expected != database => Err(StateError::DatabaseMismatch {
                expected: expected.clone(),
                actual: database.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl StateHolder for MemoryStateHolder {
    fn get_state(&self, database: &str) -> Result<Option<ImmuState>> {
        self.check_database(database)?;
        let states = self.states.read().map_err(|_| StateError::Poisoned)?;
        Ok(states.get(database).cloned())
    }

    fn compare_and_set(
        &self,
        expected: Option<&ImmuState>,
        state: &ImmuState,
    ) -> Result<SetResult> {
        self.check_database(&state.database)?;
        if state.is_zero() {
            return Err(StateError::InvalidState(
                "tx id 0 cannot be held".to_string(),
            ));
        }

        let mut states = self.states.write().map_err(|_| StateError::Poisoned)?;
        let held = states.get(&state.database);

        if !same_checkpoint(held, expected) {
            let held_id = held.map_or(0, |h| h.tx_id);
            // Someone else already adopted this exact state
            if held.is_some_and(|h| same_checkpoint(Some(h), Some(state))) {
                return Ok(SetResult::Stale { held: held_id });
            }
            tracing::debug!(
                database = %state.database,
                held = held_id,
                expected = expected.map_or(0, |e| e.tx_id),
                candidate = state.tx_id,
                "held state moved, refusing candidate"
            );
            return Ok(SetResult::Conflict { held: held_id });
        }

        if let Some(held) = held {
            if state.tx_id <= held.tx_id {
                tracing::debug!(
                    database = %state.database,
                    held = held.tx_id,
                    candidate = state.tx_id,
                    "discarding stale state"
                );
                return Ok(SetResult::Stale { held: held.tx_id });
            }
        }

        tracing::debug!(
            database = %state.database,
            tx_id = state.tx_id,
            "advancing state"
        );
        states.insert(state.database.clone(), state.clone());
        Ok(SetResult::Advanced)
    }
}

/// Two checkpoints are the same if they commit to the same tx id and alh.
fn same_checkpoint(a: Option<&ImmuState>, b: Option<&ImmuState>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.tx_id == b.tx_id && a.tx_hash == b.tx_hash,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use immuproof_core::Sha256Hash;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    fn state(db: &str, tx_id: u64) -> ImmuState {
        ImmuState::new(db, tx_id, Sha256Hash::hash(&tx_id.to_be_bytes()))
    }

    /// Offer `candidate` against whatever is held right now.
    fn offer(holder: &MemoryStateHolder, candidate: &ImmuState) -> SetResult {
        let held = holder.get_state(&candidate.database).unwrap();
        holder.compare_and_set(held.as_ref(), candidate).unwrap()
    }

    #[test]
    fn test_empty_holder() {
        let holder = MemoryStateHolder::new();
        assert_eq!(holder.get_state("defaultdb").unwrap(), None);
    }

    #[test]
    fn test_advance_and_get() {
        let holder = MemoryStateHolder::new();
        assert_eq!(
            holder.compare_and_set(None, &state("db", 3)).unwrap(),
            SetResult::Advanced
        );
        assert_eq!(holder.get_state("db").unwrap(), Some(state("db", 3)));

        let result = holder.compare_and_set(Some(&state("db", 3)), &state("db", 4));
        assert!(result.unwrap().is_advanced());
        assert_eq!(holder.get_state("db").unwrap().unwrap().tx_id, 4);
    }

    #[test]
    fn test_stale_and_replayed_states_discarded() {
        let holder = MemoryStateHolder::new();
        offer(&holder, &state("db", 10));

        assert_eq!(offer(&holder, &state("db", 9)), SetResult::Stale { held: 10 });

        // Same id, different hash: still not newer
        let mut replay = state("db", 10);
        replay.tx_hash = Sha256Hash::hash(b"forged");
        assert_eq!(offer(&holder, &replay), SetResult::Stale { held: 10 });
        assert_eq!(holder.get_state("db").unwrap(), Some(state("db", 10)));
    }

    #[test]
    fn test_moved_state_refuses_candidate() {
        let holder = MemoryStateHolder::new();
        offer(&holder, &state("db", 4));
        offer(&holder, &state("db", 6));

        // Checked against 4, but 6 is held now
        let result = holder.compare_and_set(Some(&state("db", 4)), &state("db", 8));
        assert_eq!(result.unwrap(), SetResult::Conflict { held: 6 });
        assert_eq!(holder.get_state("db").unwrap(), Some(state("db", 6)));

        // Checked against nothing, but something is held
        let result = holder.compare_and_set(None, &state("db", 9));
        assert_eq!(result.unwrap(), SetResult::Conflict { held: 6 });
    }

    #[test]
    fn test_expected_compares_hash_too() {
        let holder = MemoryStateHolder::new();
        offer(&holder, &state("db", 5));

        let mut forked = state("db", 5);
        forked.tx_hash = Sha256Hash::hash(b"fork");
        let result = holder.compare_and_set(Some(&forked), &state("db", 7));
        assert_eq!(result.unwrap(), SetResult::Conflict { held: 5 });
        assert_eq!(holder.get_state("db").unwrap().unwrap().tx_id, 5);
    }

    #[test]
    fn test_candidate_already_held_is_stale() {
        let holder = MemoryStateHolder::new();
        offer(&holder, &state("db", 2));
        offer(&holder, &state("db", 6));

        // Another session adopted the same state first
        let result = holder.compare_and_set(Some(&state("db", 2)), &state("db", 6));
        assert_eq!(result.unwrap(), SetResult::Stale { held: 6 });
    }

    #[test]
    fn test_databases_are_independent() {
        let holder = MemoryStateHolder::new();
        offer(&holder, &state("a", 10));
        assert!(offer(&holder, &state("b", 2)).is_advanced());
        assert_eq!(holder.get_state("a").unwrap().unwrap().tx_id, 10);
        assert_eq!(holder.get_state("b").unwrap().unwrap().tx_id, 2);
    }

    #[test]
    fn test_bound_holder_rejects_other_database() {
        let holder = MemoryStateHolder::for_database("a");
        assert!(holder.compare_and_set(None, &state("a", 1)).is_ok());
        assert!(matches!(
            holder.compare_and_set(None, &state("b", 1)),
            Err(StateError::DatabaseMismatch { .. })
        ));
        assert!(holder.get_state("b").is_err());
    }

    #[test]
    fn test_zero_state_rejected() {
        let holder = MemoryStateHolder::new();
        assert!(matches!(
            holder.compare_and_set(None, &ImmuState::zero("db")),
            Err(StateError::InvalidState(_))
        ));
    }

    #[test]
    fn test_concurrent_updates_never_regress() {
        let holder = Arc::new(MemoryStateHolder::new());

        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let holder = Arc::clone(&holder);
                thread::spawn(move || {
                    // Interleave ids so threads race on both sides of each other
                    for k in 0..200u64 {
                        let id = 1 + ((k * 8 + t) * 7919) % 1600;
                        let candidate = state("db", id);
                        loop {
                            let held = holder.get_state("db").unwrap();
                            match holder.compare_and_set(held.as_ref(), &candidate).unwrap() {
                                SetResult::Conflict { .. } => continue,
                                _ => break,
                            }
                        }
                        let held = holder.get_state("db").unwrap().unwrap().tx_id;
                        assert!(held >= id);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let max = (0..8u64)
            .flat_map(|t| (0..200u64).map(move |k| 1 + ((k * 8 + t) * 7919) % 1600))
            .max()
            .unwrap();
        assert_eq!(holder.get_state("db").unwrap().unwrap().tx_id, max);
    }

    proptest! {
        #[test]
        fn prop_held_id_is_running_max(ids in proptest::collection::vec(1u64..1000, 1..50)) {
            let holder = MemoryStateHolder::new();
            let mut max = 0;
            for id in ids {
                let result = offer(&holder, &state("db", id));
                prop_assert_eq!(result.is_advanced(), id > max);
                max = max.max(id);
                prop_assert_eq!(holder.get_state("db").unwrap().unwrap().tx_id, max);
            }
        }
    }
}
