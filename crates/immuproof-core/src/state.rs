//! The trusted checkpoint of one database.

use serde::{Deserialize, Serialize};

use crate::crypto::{Keypair, PublicKey, Sha256Hash};
use crate::error::{Error, Result};
use crate::types::TxId;

/// A signed checkpoint: the last verified transaction of a database and its
/// accumulated hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmuState {
    pub database: String,
    pub tx_id: TxId,
    /// Alh of `tx_id`.
    pub tx_hash: Sha256Hash,
    pub signature: Option<Vec<u8>>,
}

impl ImmuState {
    /// Create an unsigned state.
    pub fn new(database: impl Into<String>, tx_id: TxId, tx_hash: Sha256Hash) -> Self {
        Self {
            database: database.into(),
            tx_id,
            tx_hash,
            signature: None,
        }
    }

    /// State of a database nothing has been verified against yet.
    pub fn zero(database: impl Into<String>) -> Self {
        Self::new(database, 0, Sha256Hash::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.tx_id == 0
    }

    /// Attach a signature blob.
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Sign with the given keypair, replacing any previous signature.
    pub fn signed(self, keypair: &Keypair) -> Result<Self> {
        let payload = self.signed_payload()?;
        Ok(self.with_signature(keypair.sign(&payload)))
    }

    /// Bytes covered by the signature:
    /// `be32(len(database)) || database || be64(tx_id) || tx_hash`.
    pub fn signed_payload(&self) -> Result<Vec<u8>> {
        let db = self.database.as_bytes();
        let db_len = u32::try_from(db.len())
            .map_err(|_| Error::IllegalArguments("database name too long".into()))?;

        let mut buf = Vec::with_capacity(4 + db.len() + 8 + 32);
        buf.extend_from_slice(&db_len.to_be_bytes());
        buf.extend_from_slice(db);
        buf.extend_from_slice(&self.tx_id.to_be_bytes());
        buf.extend_from_slice(&self.tx_hash.0);
        Ok(buf)
    }

    /// Check the signature against the server's public key.
    ///
    /// Without a key, checking is disabled and this is always true. With a
    /// key, a missing signature fails.
    pub fn check_signature(&self, public_key: Option<&PublicKey>) -> bool {
        let Some(key) = public_key else {
            return true;
        };
        let Some(signature) = &self.signature else {
            return false;
        };
        match self.signed_payload() {
            Ok(payload) => key.verify(&payload, signature).is_ok(),
            Err(_) => false,
        }
    }
}
