//! Chain RPC collaborator.
//!
//! The chain client builds, signs, and submits transactions; this crate
//! only needs the shapes below. Transaction encoding stays on the client
//! side of the [`ChainClient`] trait.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use outblock_types::{FlowAddress, HashAlgo, OutblockError, Result, SignAlgo};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// One key registered on an account.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountKey {
    /// Position of the key in the account's key list.
    pub index: u32,
    /// Public key hex (uncompressed point without prefix).
    pub public_key: String,
    /// Signature scheme.
    pub sign_algo: SignAlgo,
    /// Hash scheme.
    pub hash_algo: HashAlgo,
    /// Signing weight.
    pub weight: u32,
    /// Proposal sequence number.
    pub sequence_number: u64,
    /// Whether the key was revoked.
    pub revoked: bool,
}

/// Account state at the latest block.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account address.
    pub address: FlowAddress,
    /// Registered keys, revoked ones included.
    pub keys: Vec<AccountKey>,
}

impl Account {
    /// Finds the non-revoked key whose public key equals `public_key`.
    ///
    /// Hex comparison ignores case and an optional `0x` prefix.
    pub fn find_key(&self, public_key: &str) -> Option<&AccountKey> {
        let wanted = normalize_key(public_key);
        self.keys
            .iter()
            .find(|k| !k.revoked && normalize_key(&k.public_key) == wanted)
    }

    /// Sum of the weights of all non-revoked keys.
    pub fn active_weight(&self) -> u32 {
        self.keys.iter().filter(|k| !k.revoked).map(|k| k.weight).sum()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim_start_matches("0x").to_ascii_lowercase()
}

/// Descriptor of a key to add to an account.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccountKey {
    /// Public key hex.
    pub public_key: String,
    /// Signature scheme.
    pub sign_algo: SignAlgo,
    /// Hash scheme.
    pub hash_algo: HashAlgo,
    /// Signing weight.
    pub weight: u32,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Identifier of a submitted transaction.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of waiting for a transaction to seal.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SealOutcome {
    /// The transaction executed with an error.
    pub is_failed: bool,
    /// The transaction reached the sealed state.
    pub is_complete: bool,
    /// Execution error reported by the chain, if any.
    pub error_message: Option<String>,
}

impl SealOutcome {
    /// A sealed, successful outcome.
    pub fn sealed() -> Self {
        Self {
            is_failed: false,
            is_complete: true,
            error_message: None,
        }
    }

    /// Maps the outcome to a result.
    ///
    /// # Errors
    ///
    /// - [`OutblockError::SealFailed`] if `is_failed`.
    /// - [`OutblockError::SealIncomplete`] if not complete.
    pub fn into_result(self, tx_id: &TransactionId) -> Result<()> {
        if self.is_failed {
            return Err(OutblockError::SealFailed {
                reason: self
                    .error_message
                    .unwrap_or_else(|| format!("transaction {tx_id} failed")),
            });
        }
        if !self.is_complete {
            return Err(OutblockError::SealIncomplete {
                tx_id: tx_id.to_string(),
            });
        }
        Ok(())
    }
}

/// Proposal key of a transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProposalKey {
    /// Proposer account.
    pub address: FlowAddress,
    /// Proposer key index.
    pub key_index: u32,
    /// Sequence number of that key.
    pub sequence_number: u64,
}

/// Something that can sign transaction payloads for one account key.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Account the key belongs to.
    fn address(&self) -> FlowAddress;

    /// Index of the key in the account's key list.
    fn key_index(&self) -> u32;

    /// Signs `message` and returns the 64-byte `r || s` signature.
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// An add-key transaction signed by several parties.
pub struct MultiSignAddKey<'a> {
    /// Account receiving the key.
    pub address: FlowAddress,
    /// Key to add.
    pub key: NewAccountKey,
    /// Proposer of the transaction.
    pub proposal_key: ProposalKey,
    /// Signers, in signing order.
    pub signers: Vec<&'a dyn TransactionSigner>,
}

// ---------------------------------------------------------------------------
// ChainClient
// ---------------------------------------------------------------------------

/// Chain RPC client.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetches the account at the latest sealed block.
    async fn get_account_at_latest_block(&self, address: FlowAddress) -> Result<Account>;

    /// Submits a transaction adding `key` to `address`, signed by `signer`.
    async fn add_key_to_account(
        &self,
        address: FlowAddress,
        key: NewAccountKey,
        signer: &dyn TransactionSigner,
    ) -> Result<TransactionId>;

    /// Submits an add-key transaction signed by several parties.
    async fn add_key_with_multi(&self, request: MultiSignAddKey<'_>) -> Result<TransactionId>;

    /// Waits until `tx_id` is sealed.
    async fn once_sealed(&self, tx_id: &TransactionId) -> Result<SealOutcome>;
}

/// Waits for `tx_id` to seal, giving up after `timeout`.
///
/// # Errors
///
/// Returns [`OutblockError::Timeout`] on expiry, or whatever the client's
/// wait returns.
pub async fn await_seal(
    chain: &dyn ChainClient,
    tx_id: &TransactionId,
    timeout: Duration,
) -> Result<SealOutcome> {
    match tokio::time::timeout(timeout, chain.once_sealed(tx_id)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(%tx_id, ?timeout, "seal wait timed out");
            Err(OutblockError::Timeout {
                operation: format!("waiting for transaction {tx_id} to seal"),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
