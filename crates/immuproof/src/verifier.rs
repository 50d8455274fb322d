//! The Verifier: verified reads and writes against a trusted state.
//!
//! Every operation follows the same protocol. Recompute the digest of what
//! the server returned, prove it into its transaction, prove that
//! transaction and the trusted one belong to the same history, check the
//! server's signature over the resulting state, and only then offer that
//! state to the holder. Any failure leaves the held state untouched.

use std::sync::Arc;

use immuproof_core::{
    verify_dual_proof, verify_inclusion, DualProof, Error as CoreError, ImmuState, KvMetadata,
    PublicKey, Sha256Hash, Tx, TxHeader, TxId,
};
use immuproof_state::{SetResult, StateHolder};

use crate::entry::{encode_key, encoded_kv, Entry};
use crate::error::{Result, VerificationFailure, VerifyError};
use crate::verifiable::{EntryRequest, VerifiableEntry, VerifiableTx};

/// Database a session is bound to unless configured otherwise.
pub const DEFAULT_DATABASE: &str = "defaultdb";

/// Largest transaction the server builds by default.
pub const DEFAULT_MAX_TX_ENTRIES: usize = 1024;

/// Configuration for a Verifier.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Database whose states the session verifies.
    pub database: String,
    /// Key the server signs states with. `None` disables signature checks.
    pub server_signing_key: Option<PublicKey>,
    /// Largest number of entries accepted in one transaction.
    pub max_tx_entries: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            server_signing_key: None,
            max_tx_entries: DEFAULT_MAX_TX_ENTRIES,
        }
    }
}

impl VerifierConfig {
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_server_signing_key(mut self, key: PublicKey) -> Self {
        self.server_signing_key = Some(key);
        self
    }

    pub fn with_max_tx_entries(mut self, max_tx_entries: usize) -> Self {
        self.max_tx_entries = max_tx_entries;
        self
    }
}

/// A verified value and the trusted state after verifying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified<T> {
    pub value: T,
    pub state: ImmuState,
}

/// Source and target of a dual proof, and the header proving the data.
struct Link<'a> {
    carrier: &'a TxHeader,
    target_tx_id: TxId,
    target_alh: Sha256Hash,
}

/// A verification session on one database.
///
/// Sessions are `Send + Sync` whenever their holder is; concurrent calls are
/// safe because every state update goes through the holder's
/// compare-and-set.
pub struct Verifier<H: StateHolder> {
    config: VerifierConfig,
    holder: Arc<H>,
}

impl<H: StateHolder> Verifier<H> {
    /// Create a session owning its state holder.
    pub fn new(config: VerifierConfig, holder: H) -> Self {
        Self::with_shared_holder(config, Arc::new(holder))
    }

    /// Create a session on a holder shared with other sessions.
    pub fn with_shared_holder(config: VerifierConfig, holder: Arc<H>) -> Self {
        Self { config, holder }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn holder(&self) -> &H {
        &self.holder
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────────

    /// The trusted state, or the zero state if nothing is held yet.
    pub fn state(&self) -> Result<ImmuState> {
        Ok(self
            .holder
            .get_state(&self.config.database)?
            .unwrap_or_else(|| ImmuState::zero(&self.config.database)))
    }

    /// Trust the server's current state on first connection.
    ///
    /// The state must be for the configured database and carry a valid
    /// signature. It is stored only if nothing is held yet; a held state is
    /// only ever advanced by proofs. Returns the state held afterwards.
    pub fn bootstrap(&self, server_state: &ImmuState) -> Result<ImmuState> {
        if server_state.database != self.config.database {
            return Err(VerifyError::DatabaseMismatch {
                expected: self.config.database.clone(),
                actual: server_state.database.clone(),
            });
        }
        if !server_state.check_signature(self.config.server_signing_key.as_ref()) {
            return self.fail(VerificationFailure::Signature {
                tx_id: server_state.tx_id,
            });
        }

        if server_state.is_zero() {
            tracing::debug!(database = %server_state.database, "bootstrapped empty database");
            return self.state();
        }

        match self.holder.compare_and_set(None, server_state)? {
            SetResult::Advanced => tracing::debug!(
                database = %server_state.database,
                tx_id = server_state.tx_id,
                "bootstrapped state"
            ),
            SetResult::Stale { held } | SetResult::Conflict { held } => tracing::debug!(
                database = %server_state.database,
                tx_id = server_state.tx_id,
                held,
                "already bootstrapped, keeping held state"
            ),
        }
        self.state()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verified Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify an entry returned for a read of `request`.
    pub fn verify_entry(
        &self,
        request: &EntryRequest,
        response: &VerifiableEntry,
    ) -> Result<Verified<Entry>> {
        let entry = &response.entry;
        let vtx = &response.verifiable_tx;

        if entry.lookup_key() != request.key.as_slice() {
            return self.fail(VerificationFailure::KeyMismatch);
        }
        if entry.is_deleted() {
            return self.fail(VerificationFailure::EntryDeleted);
        }
        if request.at_tx != 0 && entry.tx != request.at_tx {
            return self.fail(VerificationFailure::TxMismatch {
                expected: request.at_tx,
                actual: entry.tx,
            });
        }

        vtx.header.validate()?;

        let trusted = self.state()?;
        let tx_id = entry.proving_tx();
        let link = self.link(&trusted, tx_id, &vtx.header, &vtx.dual_proof)?;

        let digest = entry.digest_for(vtx.header.version)?;
        if !verify_inclusion(&response.inclusion_proof, &digest, &link.carrier.eh) {
            return self.fail(VerificationFailure::Inclusion { tx_id });
        }

        let state = self.advance(&trusted, &link, vtx.signature.as_ref())?;
        Ok(Verified {
            value: entry.clone(),
            state,
        })
    }

    /// Verify a transaction returned for a read of `tx_id`.
    pub fn verify_tx(&self, tx_id: TxId, response: &VerifiableTx) -> Result<Verified<Tx>> {
        if response.header.id != tx_id {
            return self.fail(VerificationFailure::TxMismatch {
                expected: tx_id,
                actual: response.header.id,
            });
        }

        let tx = self.assemble(response)?;

        let trusted = self.state()?;
        let link = self.link(&trusted, tx_id, tx.header(), &response.dual_proof)?;

        let state = self.advance(&trusted, &link, response.signature.as_ref())?;
        Ok(Verified { value: tx, state })
    }

    /// Verify the receipt of a write of `key` with `value`.
    ///
    /// The receipt must be a transaction holding exactly that one entry,
    /// newer than the trusted state. A write that deletes the key is
    /// rejected.
    pub fn verify_write(
        &self,
        key: &[u8],
        metadata: Option<KvMetadata>,
        value: &[u8],
        response: &VerifiableTx,
    ) -> Result<Verified<TxHeader>> {
        let tx = self.assemble(response)?;
        let header = tx.header();

        if tx.entries().len() != 1 {
            return self.fail(VerificationFailure::UnexpectedEntries(tx.entries().len()));
        }
        let mut written = metadata.iter().chain(tx.entries()[0].metadata.iter());
        if written.any(KvMetadata::is_deleted) {
            return self.fail(VerificationFailure::EntryDeleted);
        }

        let trusted = self.state()?;
        if header.id <= trusted.tx_id {
            return self.fail(VerificationFailure::NotNewer {
                tx_id: header.id,
                trusted: trusted.tx_id,
            });
        }

        let proof = tx.proof(&encode_key(key))?;
        let digest = encoded_kv(key, metadata, value).digest(header.version)?;
        if !verify_inclusion(&proof, &digest, &header.eh) {
            return self.fail(VerificationFailure::Inclusion { tx_id: header.id });
        }

        let link = self.link(&trusted, header.id, header, &response.dual_proof)?;
        let state = self.advance(&trusted, &link, response.signature.as_ref())?;
        Ok(Verified {
            value: header.clone(),
            state,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn assemble(&self, response: &VerifiableTx) -> Result<Tx> {
        if response.entries.len() > self.config.max_tx_entries {
            return Err(CoreError::MaxWidthExceeded {
                width: response.entries.len(),
                max_width: self.config.max_tx_entries,
            }
            .into());
        }
        Ok(Tx::from_wire(
            response.header.clone(),
            response.entries.clone(),
        )?)
    }

    /// Tie `tx_id` to the trusted state.
    ///
    /// The older of the two is the dual proof's source. The header of
    /// `tx_id` inside the proof must be the one the server sent as `header`.
    fn link<'a>(
        &self,
        trusted: &ImmuState,
        tx_id: TxId,
        header: &TxHeader,
        proof: &'a DualProof,
    ) -> Result<Link<'a>> {
        let (carrier, source_tx_id, source_alh, target_tx_id, target_alh) =
            if trusted.tx_id <= tx_id {
                let target = &proof.target_tx_header;
                (target, trusted.tx_id, trusted.tx_hash, tx_id, target.alh())
            } else {
                let source = &proof.source_tx_header;
                (source, tx_id, source.alh(), trusted.tx_id, trusted.tx_hash)
            };

        if carrier.id != tx_id {
            return self.fail(VerificationFailure::TxMismatch {
                expected: tx_id,
                actual: carrier.id,
            });
        }
        if carrier != header {
            return self.fail(VerificationFailure::HeaderMismatch { tx_id });
        }

        // A fresh database has no checkpoint to link from
        if trusted.tx_id > 0
            && !verify_dual_proof(proof, source_tx_id, target_tx_id, &source_alh, &target_alh)
        {
            return self.fail(VerificationFailure::DualProof {
                source_tx_id,
                target_tx_id,
            });
        }

        Ok(Link {
            carrier,
            target_tx_id,
            target_alh,
        })
    }

    /// Check the signature over the linked target and offer it as the new
    /// state, provided `trusted` is still the held one.
    fn advance(
        &self,
        trusted: &ImmuState,
        link: &Link<'_>,
        signature: Option<&Vec<u8>>,
    ) -> Result<ImmuState> {
        let candidate = ImmuState {
            database: self.config.database.clone(),
            tx_id: link.target_tx_id,
            tx_hash: link.target_alh,
            signature: signature.cloned(),
        };

        if !candidate.check_signature(self.config.server_signing_key.as_ref()) {
            return self.fail(VerificationFailure::Signature {
                tx_id: candidate.tx_id,
            });
        }

        // Older data proves nothing new; trusted is already held or extended
        if candidate.tx_id > trusted.tx_id {
            self.offer(trusted, &candidate)?;
        }
        self.state()
    }

    fn offer(&self, trusted: &ImmuState, candidate: &ImmuState) -> Result<()> {
        let expected = (!trusted.is_zero()).then_some(trusted);
        match self.holder.compare_and_set(expected, candidate)? {
            SetResult::Advanced => {
                tracing::debug!(
                    database = %candidate.database,
                    tx_id = candidate.tx_id,
                    "adopted state"
                );
            }
            SetResult::Stale { held } => {
                tracing::debug!(
                    database = %candidate.database,
                    tx_id = candidate.tx_id,
                    held,
                    "state already adopted"
                );
            }
            SetResult::Conflict { held } => {
                tracing::warn!(
                    database = %candidate.database,
                    tx_id = candidate.tx_id,
                    expected = trusted.tx_id,
                    held,
                    "trusted state moved during verification"
                );
                return Err(VerifyError::StateConflict {
                    expected: trusted.tx_id,
                    held,
                });
            }
        }
        Ok(())
    }

    fn fail<T>(&self, failure: VerificationFailure) -> Result<T> {
        tracing::warn!(database = %self.config.database, "verification failed: {}", failure);
        Err(failure.into())
    }
}
