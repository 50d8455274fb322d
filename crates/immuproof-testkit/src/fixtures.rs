//! Test fixtures: a reference Merkle log and a simulated ledger server.
//!
//! The verifier only ever checks proofs. These fixtures produce them, the
//! way the server does, so tests can drive full verified reads and writes.

use immuproof::entry::{encode_key, encoded_kv, encoded_reference, REFERENCE_VALUE_PREFIX};
use immuproof::{Entry, Reference, VerifiableEntry, VerifiableTx, Verifier, VerifierConfig};
use immuproof_core::crypto::{leaf_hash, node_hash};
use immuproof_core::{
    DualProof, HTree, ImmuState, Keypair, Kv, KvMetadata, LinearProof, Sha256Hash, Tx, TxEntry,
    TxHeader, TxId, TxVersion,
};
use immuproof_state::MemoryStateHolder;

/// An append-only Merkle log with the linked tree's shape.
///
/// Proofs are derived from the recursive definitions (largest power of two
/// split), independently of the iterative verifiers. Positions are 1-based.
#[derive(Debug, Clone, Default)]
pub struct MerkleLog {
    leaves: Vec<Sha256Hash>,
}

impl MerkleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log over `digests`.
    pub fn from_digests(digests: &[Sha256Hash]) -> Self {
        let mut log = Self::new();
        for digest in digests {
            log.append(digest);
        }
        log
    }

    /// Append a digest; it is stored as the leaf `sha256(0x00 || digest)`.
    pub fn append(&mut self, digest: &Sha256Hash) -> u64 {
        self.leaves.push(leaf_hash(digest));
        self.leaves.len() as u64
    }

    pub fn len(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Root of the first `n` leaves, zero for an empty prefix.
    pub fn root(&self, n: u64) -> Sha256Hash {
        if n == 0 {
            return Sha256Hash::ZERO;
        }
        mth(&self.leaves[..n as usize])
    }

    /// Path of leaf `i` in the tree of the first `j` leaves, leaf first.
    pub fn inclusion_proof(&self, i: u64, j: u64) -> Vec<Sha256Hash> {
        assert!(0 < i && i <= j && j <= self.len(), "bad inclusion range {i}..{j}");
        path((i - 1) as usize, &self.leaves[..j as usize])
    }

    /// Proof that the first `i` leaves are a prefix of the first `j`.
    ///
    /// When `i` is a power of two its own root leads the proof.
    pub fn consistency_proof(&self, i: u64, j: u64) -> Vec<Sha256Hash> {
        assert!(0 < i && i <= j && j <= self.len(), "bad consistency range {i}..{j}");
        if i == j {
            return Vec::new();
        }
        let mut proof = Vec::new();
        if i.is_power_of_two() {
            proof.push(self.root(i));
        }
        proof.extend(subproof(i as usize, &self.leaves[..j as usize], true));
        proof
    }

    /// Path of the last leaf of the tree of the first `n` leaves.
    pub fn last_inclusion_proof(&self, n: u64) -> Vec<Sha256Hash> {
        self.inclusion_proof(n, n)
    }
}

fn split(n: usize) -> usize {
    let mut k = 1;
    while k * 2 < n {
        k *= 2;
    }
    k
}

fn mth(leaves: &[Sha256Hash]) -> Sha256Hash {
    if leaves.len() == 1 {
        return leaves[0];
    }
    let k = split(leaves.len());
    node_hash(&mth(&leaves[..k]), &mth(&leaves[k..]))
}

fn path(m: usize, leaves: &[Sha256Hash]) -> Vec<Sha256Hash> {
    if leaves.len() == 1 {
        return Vec::new();
    }
    let k = split(leaves.len());
    if m < k {
        let mut proof = path(m, &leaves[..k]);
        proof.push(mth(&leaves[k..]));
        proof
    } else {
        let mut proof = path(m - k, &leaves[k..]);
        proof.push(mth(&leaves[..k]));
        proof
    }
}

fn subproof(m: usize, leaves: &[Sha256Hash], complete: bool) -> Vec<Sha256Hash> {
    let n = leaves.len();
    if m == n {
        return if complete { Vec::new() } else { vec![mth(leaves)] };
    }
    let k = split(n);
    if m <= k {
        let mut proof = subproof(m, &leaves[..k], complete);
        proof.push(mth(&leaves[k..]));
        proof
    } else {
        let mut proof = subproof(m - k, &leaves[k..], false);
        proof.push(mth(&leaves[..k]));
        proof
    }
}

/// A simulated ledger server.
///
/// Commits transactions, keeps the linked tree over their alhs and answers
/// verified operations with signed states and proofs. The linked tree trails
/// the head by `bl_lag` transactions: tx `n` links to tx `n - 1 - bl_lag`.
#[derive(Debug)]
pub struct LedgerFixture {
    pub keypair: Keypair,
    pub database: String,
    pub version: TxVersion,
    pub bl_lag: u64,
    headers: Vec<TxHeader>,
    kvs: Vec<Vec<Kv>>,
    linked: MerkleLog,
}

/// Base commit time of fixture transactions.
const BASE_TS: i64 = 1_700_000_000;

impl LedgerFixture {
    /// Create an empty v1 ledger that links every transaction immediately.
    pub fn new() -> Self {
        Self::with_seed([0x42; 32])
    }

    /// Create with a deterministic signing key.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
            database: "defaultdb".to_string(),
            version: TxVersion::V1,
            bl_lag: 0,
            headers: Vec::new(),
            kvs: Vec::new(),
            linked: MerkleLog::new(),
        }
    }

    pub fn with_version(mut self, version: TxVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_bl_lag(mut self, bl_lag: u64) -> Self {
        self.bl_lag = bl_lag;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Id of the last committed transaction, 0 if none.
    pub fn head(&self) -> TxId {
        self.headers.len() as TxId
    }

    pub fn header(&self, id: TxId) -> &TxHeader {
        &self.headers[(id - 1) as usize]
    }

    pub fn alh(&self, id: TxId) -> Sha256Hash {
        if id == 0 {
            return Sha256Hash::ZERO;
        }
        self.header(id).alh()
    }

    /// The linked tree over every committed alh.
    pub fn linked_tree(&self) -> &MerkleLog {
        &self.linked
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commits
    // ─────────────────────────────────────────────────────────────────────────

    /// Commit a transaction of already encoded pairs.
    pub fn commit(&mut self, kvs: Vec<Kv>) -> TxId {
        let id = self.head() + 1;
        let entries: Vec<TxEntry> = kvs.iter().map(tx_entry).collect();
        let digests: Vec<Sha256Hash> = entries
            .iter()
            .map(|e| e.digest(self.version).expect("entry digest"))
            .collect();
        let eh = HTree::build(&digests)
            .and_then(|tree| tree.root())
            .expect("entries hash");

        let bl_tx_id = (id - 1).saturating_sub(self.bl_lag);
        let header = TxHeader {
            id,
            prev_alh: self.alh(id - 1),
            ts: BASE_TS + id as i64,
            version: self.version,
            nentries: entries.len() as u32,
            eh,
            bl_tx_id,
            bl_root: self.linked.root(bl_tx_id),
        };

        self.linked.append(&header.alh());
        self.headers.push(header);
        self.kvs.push(kvs);
        id
    }

    /// Commit one plain key/value pair.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> TxId {
        self.commit(vec![encoded_kv(key, None, value)])
    }

    /// Commit one plain key/value pair with metadata.
    pub fn set_with_metadata(&mut self, key: &[u8], metadata: KvMetadata, value: &[u8]) -> TxId {
        self.commit(vec![encoded_kv(key, Some(metadata), value)])
    }

    /// Commit a reference from `key` to `referenced_key`.
    pub fn set_reference(&mut self, key: &[u8], referenced_key: &[u8], at_tx: TxId) -> TxId {
        self.commit(vec![encoded_reference(key, None, referenced_key, at_tx)])
    }

    /// Commit `count` transactions of `width` filler pairs each.
    pub fn fill(&mut self, count: usize, width: usize) -> TxId {
        for _ in 0..count {
            let id = self.head() + 1;
            let kvs = (0..width)
                .map(|i| encoded_kv(format!("fill-{id}-{i}").as_bytes(), None, &id.to_be_bytes()))
                .collect();
            self.commit(kvs);
        }
        self.head()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // States
    // ─────────────────────────────────────────────────────────────────────────

    /// Signed state at `id`.
    pub fn state_at(&self, id: TxId) -> ImmuState {
        ImmuState::new(self.database.clone(), id, self.alh(id))
            .signed(&self.keypair)
            .expect("signable state")
    }

    /// Signed state at the head.
    pub fn current_state(&self) -> ImmuState {
        self.state_at(self.head())
    }

    /// Session configuration trusting this ledger's signing key.
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig::default()
            .with_database(self.database.clone())
            .with_server_signing_key(self.keypair.public_key())
    }

    /// A fresh session on this ledger with an empty in-memory holder.
    pub fn verifier(&self) -> Verifier<MemoryStateHolder> {
        Verifier::new(self.verifier_config(), MemoryStateHolder::new())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Proofs
    // ─────────────────────────────────────────────────────────────────────────

    /// Chain from `source` to `target`.
    pub fn linear_proof(&self, source: TxId, target: TxId) -> LinearProof {
        let mut terms = vec![self.alh(source)];
        terms.extend(((source + 1)..=target).map(|id| self.header(id).inner_hash()));
        LinearProof {
            source_tx_id: source,
            target_tx_id: target,
            terms,
        }
    }

    /// Dual proof from `source` to `target`, `source <= target`.
    pub fn dual_proof(&self, source: TxId, target: TxId) -> DualProof {
        let source_header = self.header(source).clone();
        let target_header = self.header(target).clone();
        let bl_tx_id = target_header.bl_tx_id;

        let inclusion_proof = if source < bl_tx_id {
            self.linked.inclusion_proof(source, bl_tx_id)
        } else {
            Vec::new()
        };
        let consistency_proof = if source_header.bl_tx_id > 0 {
            self.linked.consistency_proof(source_header.bl_tx_id, bl_tx_id)
        } else {
            Vec::new()
        };
        let (target_bl_tx_alh, last_inclusion_proof) = if bl_tx_id > 0 {
            (self.alh(bl_tx_id), self.linked.last_inclusion_proof(bl_tx_id))
        } else {
            (Sha256Hash::ZERO, Vec::new())
        };

        DualProof {
            source_tx_header: source_header,
            target_tx_header: target_header,
            inclusion_proof,
            consistency_proof,
            target_bl_tx_alh,
            last_inclusion_proof,
            linear_proof: self.linear_proof(source.max(bl_tx_id), target),
        }
    }

    /// Transaction `id` with a dual proof from or to the client's `trusted`
    /// tx, signed at the newer of the two.
    pub fn verifiable_tx(&self, id: TxId, trusted: TxId) -> VerifiableTx {
        let dual_proof = match trusted {
            0 => self.dual_proof(id, id),
            t if t <= id => self.dual_proof(t, id),
            t => self.dual_proof(id, t),
        };
        let signed = self.state_at(id.max(trusted));

        VerifiableTx {
            header: self.header(id).clone(),
            entries: self.kvs[(id - 1) as usize].iter().map(tx_entry).collect(),
            dual_proof,
            signature: signed.signature,
        }
    }

    /// Commit a plain pair and answer with its write receipt.
    pub fn verified_set(
        &mut self,
        key: &[u8],
        metadata: Option<KvMetadata>,
        value: &[u8],
        trusted: TxId,
    ) -> VerifiableTx {
        let id = self.commit(vec![encoded_kv(key, metadata, value)]);
        self.verifiable_tx(id, trusted)
    }

    /// Latest value of `key`, resolving references.
    pub fn verifiable_entry(&self, key: &[u8], trusted: TxId) -> VerifiableEntry {
        let tx = self.latest_tx_of(key).expect("key was never written");
        self.resolve(key, tx, trusted)
    }

    /// Value of `key` written by `tx`, resolving references.
    pub fn verifiable_entry_at(&self, key: &[u8], tx: TxId, trusted: TxId) -> VerifiableEntry {
        self.resolve(key, tx, trusted)
    }

    fn resolve(&self, key: &[u8], tx: TxId, trusted: TxId) -> VerifiableEntry {
        let kv = self.stored(key, tx);
        let stored_value = kv.value.clone().unwrap_or_default();

        let entry = if stored_value.first() == Some(&REFERENCE_VALUE_PREFIX) {
            let mut at_tx = [0u8; 8];
            at_tx.copy_from_slice(&stored_value[1..9]);
            let at_tx = u64::from_be_bytes(at_tx);
            let referenced_key = &stored_value[10..];

            let resolved_tx = match at_tx {
                0 => self.latest_tx_of(referenced_key).expect("dangling reference"),
                at => at,
            };
            let resolved = self.stored(referenced_key, resolved_tx);

            Entry {
                tx: resolved_tx,
                key: referenced_key.to_vec(),
                value: resolved.value.clone().unwrap_or_default()[1..].to_vec(),
                metadata: resolved.metadata,
                referenced_by: Some(Reference {
                    tx,
                    key: key.to_vec(),
                    metadata: kv.metadata,
                    at_tx,
                }),
            }
        } else {
            Entry {
                tx,
                key: key.to_vec(),
                value: stored_value[1..].to_vec(),
                metadata: kv.metadata,
                referenced_by: None,
            }
        };

        let verifiable_tx = self.verifiable_tx(tx, trusted);
        let inclusion_proof = Tx::from_wire(
            verifiable_tx.header.clone(),
            verifiable_tx.entries.clone(),
        )
        .and_then(|t| t.proof(&encode_key(key)))
        .expect("inclusion proof");

        VerifiableEntry {
            entry,
            verifiable_tx,
            inclusion_proof,
        }
    }

    fn stored(&self, key: &[u8], tx: TxId) -> &Kv {
        let encoded = encode_key(key);
        self.kvs[(tx - 1) as usize]
            .iter()
            .find(|kv| kv.key == encoded)
            .expect("key not in tx")
    }

    fn latest_tx_of(&self, key: &[u8]) -> Option<TxId> {
        let encoded = encode_key(key);
        self.kvs
            .iter()
            .rposition(|kvs| kvs.iter().any(|kv| kv.key == encoded))
            .map(|i| i as TxId + 1)
    }
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Listing entry of an encoded pair.
pub fn tx_entry(kv: &Kv) -> TxEntry {
    TxEntry {
        key: kv.key.clone(),
        metadata: kv.metadata,
        value_len: kv.value.as_ref().map_or(0, |v| v.len() as u32),
        value_hash: kv.value_hash(),
    }
}

/// Digests `sha256(b"a")`, `sha256(b"b")`, ... of `n` letters.
pub fn letter_digests(n: usize) -> Vec<Sha256Hash> {
    (b'a'..=b'z')
        .take(n)
        .map(|c| Sha256Hash::hash(&[c]))
        .collect()
}
