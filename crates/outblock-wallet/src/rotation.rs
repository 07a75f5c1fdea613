//! Two-signer key rotation.
//!
//! When a user restores from two independent custodians, each recovered
//! backup key carries half of the account threshold. Together with the
//! service co-signer they add a new full-weight device key to the
//! account, so the lost primary key is no longer needed.
//!
//! ```text
//! 1. look up both backup keys on the account (index, sequence number)
//! 2. generate a device key in secure storage
//! 3. submit add-key signed by [co-signer 1, co-signer 2, service]
//! 4. await seal; on success sign USER-tag || user_id with both
//!    co-signers and POST addSigned
//! 5. persist the device key, register the store user, restore session
//! ```
//!
//! The on-chain step is irreversible. If step 4's POST or step 5 fails,
//! the sealed rotation is kept as a [`PendingRotation`]; a later
//! [`QuorumKeyRotation::rotate`] for the same account (or
//! [`QuorumKeyRotation::finalize_pending`]) detects that the device key
//! is already on the account and only re-runs finalization.

use std::sync::Arc;

use async_trait::async_trait;
use outblock_crypto::hash::user_id_message;
use outblock_types::config::BackupConfig;
use outblock_types::{DeviceInfo, FlowAddress, OutblockError, Result};
use tokio::sync::Mutex;

use crate::backend::{AddSignedRequest, BackendApi};
use crate::chain::{
    await_seal, Account, ChainClient, MultiSignAddKey, NewAccountKey, ProposalKey,
    TransactionId, TransactionSigner,
};
use crate::cosigner::CoSigner;
use crate::keystore::{DeviceKey, SecureKeyStore, SessionManager};

// ---------------------------------------------------------------------------
// PendingRotation / RotationOutcome
// ---------------------------------------------------------------------------

/// A sealed rotation whose backend registration or local finalization has
/// not succeeded yet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingRotation {
    /// Account that received the device key.
    pub address: FlowAddress,
    /// User the rotation is performed for.
    pub user_id: String,
    /// Device key added on chain.
    pub key: DeviceKey,
    /// Sealed add-key transaction.
    pub tx_id: TransactionId,
    /// Device registering the key.
    pub device_info: DeviceInfo,
}

/// Result of a completed rotation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RotationOutcome {
    /// Account that received the device key.
    pub address: FlowAddress,
    /// The new device key, now persisted.
    pub key: DeviceKey,
    /// Sealed add-key transaction.
    pub tx_id: TransactionId,
    /// `true` if the on-chain step was skipped because an earlier
    /// attempt already sealed it.
    pub resumed: bool,
}

// ---------------------------------------------------------------------------
// QuorumKeyRotation
// ---------------------------------------------------------------------------

/// Adds a full-weight device key to an account using two backup keys.
pub struct QuorumKeyRotation {
    chain: Arc<dyn ChainClient>,
    backend: Arc<dyn BackendApi>,
    keystore: Arc<dyn SecureKeyStore>,
    session: Arc<dyn SessionManager>,
    service_signer: Arc<dyn TransactionSigner>,
    config: BackupConfig,
    pending: Mutex<Option<PendingRotation>>,
}

impl QuorumKeyRotation {
    /// Creates the rotation service.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        backend: Arc<dyn BackendApi>,
        keystore: Arc<dyn SecureKeyStore>,
        session: Arc<dyn SessionManager>,
        service_signer: Arc<dyn TransactionSigner>,
        config: BackupConfig,
    ) -> Self {
        Self {
            chain,
            backend,
            keystore,
            session,
            service_signer,
            config,
            pending: Mutex::new(None),
        }
    }

    /// Returns the sealed-but-unfinalized rotation, if any.
    pub async fn pending(&self) -> Option<PendingRotation> {
        self.pending.lock().await.clone()
    }

    /// Runs the full rotation for `user_id` with two co-signers.
    ///
    /// # Errors
    ///
    /// - [`OutblockError::InvalidAddress`] if the co-signers belong to
    ///   different accounts.
    /// - [`OutblockError::KeyNotFound`] if either backup key is not an
    ///   active key of the account.
    /// - [`OutblockError::Timeout`], [`OutblockError::SealFailed`],
    ///   [`OutblockError::SealIncomplete`] from the seal wait. The backend
    ///   is not called and nothing is persisted.
    /// - [`OutblockError::SignatureRejected`] if the backend refuses the
    ///   co-signatures. The rotation stays pending.
    /// - Chain, backend and key-store errors propagate unchanged.
    pub async fn rotate(
        &self,
        first: &CoSigner,
        second: &CoSigner,
        user_id: &str,
        device_info: DeviceInfo,
    ) -> Result<RotationOutcome> {
        if user_id.is_empty() {
            return Err(OutblockError::MissingUid);
        }
        let address = first.item().address;
        if second.item().address != address {
            return Err(OutblockError::InvalidAddress {
                reason: format!(
                    "co-signers belong to different accounts: {address} and {}",
                    second.item().address
                ),
            });
        }

        let mut pending = self.pending.lock().await;
        let account = self.chain.get_account_at_latest_block(address).await?;

        if let Some(previous) = pending
            .as_ref()
            .filter(|p| p.address == address && p.user_id == user_id)
        {
            if account.find_key(&previous.key.public_key).is_some() {
                tracing::info!(
                    %address,
                    tx_id = %previous.tx_id,
                    "device key already on account, resuming finalization"
                );
                let mut outcome = self.finalize(previous, first, second).await?;
                outcome.resumed = true;
                *pending = None;
                return Ok(outcome);
            }
            tracing::warn!(%address, "pending device key not on account, starting over");
            *pending = None;
        }

        let sealed = self
            .submit(&account, first, second, user_id, device_info)
            .await?;
        match self.finalize(&sealed, first, second).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!(
                    %address,
                    tx_id = %sealed.tx_id,
                    error = %e,
                    "rotation sealed but not finalized, keeping it pending"
                );
                *pending = Some(sealed);
                Err(e)
            }
        }
    }

    /// Re-runs finalization of the pending rotation.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::KeyNotFound`] if nothing is pending or the
    /// pending key is not an active key of the account, otherwise the
    /// errors of the finalization steps of [`rotate`](Self::rotate).
    pub async fn finalize_pending(
        &self,
        first: &CoSigner,
        second: &CoSigner,
    ) -> Result<RotationOutcome> {
        let mut pending = self.pending.lock().await;
        let previous = pending.as_ref().ok_or_else(|| OutblockError::KeyNotFound {
            reason: "no pending key rotation".into(),
        })?;

        let account = self
            .chain
            .get_account_at_latest_block(previous.address)
            .await?;
        if account.find_key(&previous.key.public_key).is_none() {
            return Err(OutblockError::KeyNotFound {
                reason: format!("pending device key is not on account {}", previous.address),
            });
        }

        let mut outcome = self.finalize(previous, first, second).await?;
        outcome.resumed = true;
        *pending = None;
        Ok(outcome)
    }

    // -- Steps ------------------------------------------------------------

    /// Steps 1 to 4a: look up keys, generate the device key, submit and
    /// await the seal.
    async fn submit(
        &self,
        account: &Account,
        first: &CoSigner,
        second: &CoSigner,
        user_id: &str,
        device_info: DeviceInfo,
    ) -> Result<PendingRotation> {
        let address = account.address;
        let first_key = account
            .find_key(first.public_key())
            .ok_or_else(|| key_not_found(address, first))?;
        let second_key = account
            .find_key(second.public_key())
            .ok_or_else(|| key_not_found(address, second))?;

        let device_key = self.keystore.generate_key().await?;
        let new_key = self.account_key_for(&device_key);

        let first_signer = IndexedSigner {
            inner: first,
            key_index: first_key.index,
        };
        let second_signer = IndexedSigner {
            inner: second,
            key_index: second_key.index,
        };

        let request = MultiSignAddKey {
            address,
            key: new_key,
            proposal_key: ProposalKey {
                address,
                key_index: first_key.index,
                sequence_number: first_key.sequence_number,
            },
            signers: vec![
                &first_signer as &dyn TransactionSigner,
                &second_signer,
                self.service_signer.as_ref(),
            ],
        };

        let tx_id = self.chain.add_key_with_multi(request).await?;
        tracing::info!(%address, %tx_id, "key rotation submitted");

        let outcome = await_seal(self.chain.as_ref(), &tx_id, self.config.seal_timeout()).await?;
        if let Err(e) = outcome.into_result(&tx_id) {
            tracing::warn!(%address, %tx_id, error = %e, "key rotation not sealed");
            return Err(e);
        }
        tracing::info!(%address, %tx_id, "key rotation sealed");

        Ok(PendingRotation {
            address,
            user_id: user_id.to_string(),
            key: device_key,
            tx_id,
            device_info,
        })
    }

    /// Steps 4b and 5: co-sign the user id, register with the backend,
    /// persist locally.
    async fn finalize(
        &self,
        sealed: &PendingRotation,
        first: &CoSigner,
        second: &CoSigner,
    ) -> Result<RotationOutcome> {
        let message = user_id_message(&sealed.user_id);
        let signatures = vec![first.key_signature(&message)?, second.key_signature(&message)?];

        let request = AddSignedRequest {
            account_key: (&self.account_key_for(&sealed.key)).into(),
            device_info: sealed.device_info.clone(),
            signatures,
        };

        let response = self.backend.add_signed(request).await.map_err(|e| {
            tracing::error!(address = %sealed.address, error = %e, "addSigned request failed");
            e
        })?;
        if !response.is_success() {
            tracing::error!(
                address = %sealed.address,
                http_code = response.http_code,
                "backend rejected co-signatures"
            );
            return Err(OutblockError::SignatureRejected {
                reason: format!("addSigned returned {}: {}", response.http_code, response.message),
            });
        }

        self.keystore.persist(&sealed.key, &sealed.user_id).await?;
        self.session
            .register_store_user(&sealed.user_id, sealed.address, &sealed.key)
            .await?;
        self.session.restore_session(&sealed.user_id).await?;

        tracing::info!(address = %sealed.address, user_id = %sealed.user_id, "key rotation finalized");
        Ok(RotationOutcome {
            address: sealed.address,
            key: sealed.key.clone(),
            tx_id: sealed.tx_id.clone(),
            resumed: false,
        })
    }

    fn account_key_for(&self, key: &DeviceKey) -> NewAccountKey {
        NewAccountKey {
            public_key: key.public_key.clone(),
            sign_algo: key.sign_algo,
            hash_algo: key.hash_algo,
            weight: self.config.full_key_weight,
        }
    }
}

fn key_not_found(address: FlowAddress, signer: &CoSigner) -> OutblockError {
    OutblockError::KeyNotFound {
        reason: format!(
            "backup key {} ({}) is not an active key of {address}",
            signer.public_key(),
            signer.item().backup_type
        ),
    }
}

// ---------------------------------------------------------------------------
// IndexedSigner
// ---------------------------------------------------------------------------

/// A co-signer signing under the key index found on chain, which may
/// differ from the index recorded in its backup item.
struct IndexedSigner<'a> {
    inner: &'a CoSigner,
    key_index: u32,
}

#[async_trait]
impl TransactionSigner for IndexedSigner<'_> {
    fn address(&self) -> FlowAddress {
        self.inner.item().address
    }

    fn key_index(&self) -> u32 {
        self.key_index
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.inner.sign_message(message)?.to_vec())
    }
}
