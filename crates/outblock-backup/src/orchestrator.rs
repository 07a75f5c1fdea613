//! Multi-backup orchestration.
//!
//! Creating a backup for one custodian is three ordered steps:
//!
//! ```text
//! register_key_to_chain  add a half-weight key for a fresh mnemonic,
//!                        stage the encrypted BackupItem
//! backup_key             upload the staged item to the custodian
//! sync_key_to_server     tell the backend about the new key
//! ```
//!
//! `backup_key` refuses to run for a type with nothing staged, so a
//! custodian never holds a mnemonic whose key is not on the account.
//!
//! Restoring reads two custodians, pairs their items for the same
//! account and hands them to [`QuorumKeyRotation`].

use std::collections::HashMap;
use std::sync::Arc;

use outblock_crypto::cipher::{derive_password, BackupPassword};
use outblock_types::config::BackupConfig;
use outblock_types::{ActiveUser, BackupItem, BackupType, DeviceInfo, OutblockError, Result};
use outblock_wallet::backend::{AccountKeyPayload, BackendApi, BackupInfo, SyncDeviceRequest};
use outblock_wallet::chain::{await_seal, ChainClient, NewAccountKey};
use outblock_wallet::manager::WalletManager;
use outblock_wallet::{CoSigner, QuorumKeyRotation, RotationOutcome};
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use crate::codec::items_for_user;
use crate::env::PasswordProvider;
use crate::store::StoreRegistry;

/// Items registered on chain, before and after upload.
#[derive(Default)]
struct Staging {
    pending: HashMap<BackupType, BackupItem>,
    uploaded: HashMap<BackupType, BackupItem>,
}

/// Drives backup creation and quorum restore across custodians.
pub struct BackupOrchestrator {
    stores: StoreRegistry,
    env: Arc<dyn PasswordProvider>,
    wallets: Arc<dyn WalletManager>,
    chain: Arc<dyn ChainClient>,
    backend: Arc<dyn BackendApi>,
    config: BackupConfig,
    device_info: DeviceInfo,
    staging: Mutex<Staging>,
    pin: Mutex<Option<Zeroizing<String>>>,
}

impl BackupOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(
        stores: StoreRegistry,
        env: Arc<dyn PasswordProvider>,
        wallets: Arc<dyn WalletManager>,
        chain: Arc<dyn ChainClient>,
        backend: Arc<dyn BackendApi>,
        config: BackupConfig,
    ) -> Self {
        Self {
            stores,
            env,
            wallets,
            chain,
            backend,
            config,
            device_info: DeviceInfo::default(),
            staging: Mutex::new(Staging::default()),
            pin: Mutex::new(None),
        }
    }

    /// Sets the device recorded in items and reported to the backend.
    pub fn with_device_info(mut self, device_info: DeviceInfo) -> Self {
        self.device_info = device_info;
        self
    }

    /// The store registry.
    pub fn stores(&self) -> &StoreRegistry {
        &self.stores
    }

    /// Sets the PIN protecting Google, iCloud and Dropbox items created
    /// from now on. `None` clears it.
    pub async fn set_pin_code(&self, pin: Option<&str>) {
        *self.pin.lock().await = pin
            .filter(|p| !p.is_empty())
            .map(|p| Zeroizing::new(p.to_string()));
    }

    /// Returns the item staged for `backup_type`, if any.
    pub async fn staged_item(&self, backup_type: BackupType) -> Option<BackupItem> {
        self.staging.lock().await.pending.get(&backup_type).cloned()
    }

    // -- Backup -----------------------------------------------------------

    /// Adds a new backup key to the primary account and stages its item.
    ///
    /// Returns `Ok(false)` if the add-key transaction sealed as failed.
    ///
    /// # Errors
    ///
    /// - [`OutblockError::MissingUserName`] / [`OutblockError::MissingUid`]
    ///   for an incomplete user.
    /// - [`OutblockError::MissingAddress`] without a primary wallet.
    /// - [`OutblockError::MissingMnemonic`] if no wallet could be created.
    /// - [`OutblockError::Timeout`] / [`OutblockError::SealIncomplete`]
    ///   from the seal wait.
    /// - [`OutblockError::KeyNotFound`] if the sealed key is not on the
    ///   account afterwards.
    pub async fn register_key_to_chain(
        &self,
        backup_type: BackupType,
        user: &ActiveUser,
    ) -> Result<bool> {
        if user.user_name.is_empty() {
            return Err(OutblockError::MissingUserName);
        }
        if user.user_id.is_empty() {
            return Err(OutblockError::MissingUid);
        }
        let address = self
            .wallets
            .primary_wallet_address()
            .ok_or(OutblockError::MissingAddress)?;
        let wallet = self.wallets.create_hd_wallet(None, &self.config).map_err(|e| {
            tracing::warn!(error = %e, "failed to create backup wallet");
            OutblockError::MissingMnemonic
        })?;

        let key = NewAccountKey {
            public_key: wallet.public_key_hex(),
            sign_algo: wallet.sign_algo(),
            hash_algo: wallet.hash_algo(),
            weight: self.config.multi_key_weight,
        };
        let signer = self.wallets.primary_signer()?;
        let tx_id = self
            .chain
            .add_key_to_account(address, key.clone(), signer.as_ref())
            .await?;
        tracing::info!(%address, %tx_id, %backup_type, "backup key submitted");

        let outcome = await_seal(self.chain.as_ref(), &tx_id, self.config.seal_timeout()).await?;
        match outcome.into_result(&tx_id) {
            Ok(()) => {}
            Err(OutblockError::SealFailed { reason }) => {
                tracing::warn!(%address, %tx_id, %reason, "backup key transaction failed");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        let account = self.chain.get_account_at_latest_block(address).await?;
        let key_index = account
            .find_key(&key.public_key)
            .map(|k| k.index)
            .ok_or_else(|| OutblockError::KeyNotFound {
                reason: format!("sealed backup key is not on account {address}"),
            })?;

        let code = match self.pin.lock().await.as_ref() {
            Some(pin) if backup_type.requires_pin() => Some(derive_password(pin)),
            _ => None,
        };
        let password = match &code {
            Some(code) => BackupPassword::for_pin_code(code)?,
            None => self.env.default_password()?,
        };

        let item = BackupItem {
            address,
            user_id: user.user_id.clone(),
            user_name: user.user_name.clone(),
            user_avatar: None,
            public_key: key.public_key,
            data: password.encrypt_mnemonic(wallet.mnemonic())?,
            key_index,
            sign_algo: key.sign_algo,
            hash_algo: key.hash_algo,
            weight: key.weight,
            updated_time: chrono::Utc::now().timestamp(),
            device_info: Some(self.device_info.clone()),
            code,
            backup_type,
        };

        tracing::info!(%address, key_index, %backup_type, "backup key registered");
        self.staging.lock().await.pending.insert(backup_type, item);
        Ok(true)
    }

    /// Uploads the item staged for `backup_type`.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::NotRegistered`] if
    /// [`register_key_to_chain`](Self::register_key_to_chain) has not
    /// staged an item for this type, otherwise the store's errors.
    pub async fn backup_key(&self, backup_type: BackupType, user: &ActiveUser) -> Result<()> {
        let item = self
            .staged_item(backup_type)
            .await
            .ok_or(OutblockError::NotRegistered { backup_type })?;

        let store = self.stores.get(backup_type)?;
        store
            .upload(user, &item, &self.env.default_password()?)
            .await
            .map_err(|e| {
                tracing::error!(%backup_type, error = %e, "backup upload failed");
                e
            })?;

        let mut staging = self.staging.lock().await;
        staging.pending.remove(&backup_type);
        staging.uploaded.insert(backup_type, item);
        tracing::info!(%backup_type, "backup uploaded");
        Ok(())
    }

    /// Reports the key of the `backup_type` backup to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::NotRegistered`] if no key was registered
    /// for this type, and [`OutblockError::BackendError`] for a
    /// non-success response.
    pub async fn sync_key_to_server(&self, backup_type: BackupType) -> Result<()> {
        let item = {
            let staging = self.staging.lock().await;
            staging
                .uploaded
                .get(&backup_type)
                .or_else(|| staging.pending.get(&backup_type))
                .cloned()
                .ok_or(OutblockError::NotRegistered { backup_type })?
        };

        let request = SyncDeviceRequest {
            account_key: AccountKeyPayload {
                public_key: item.public_key,
                sign_algo: item.sign_algo,
                hash_algo: item.hash_algo,
                weight: item.weight,
            },
            device_info: self.device_info.clone(),
            backup_info: Some(BackupInfo {
                backup_type,
                name: backup_type.to_string(),
            }),
        };

        let response = self.backend.sync_device(request).await?;
        if let Err(e) = response.into_result() {
            tracing::error!(%backup_type, error = %e, "syncDevice rejected");
            return Err(e);
        }
        Ok(())
    }

    /// Registers, uploads and syncs a backup in that order.
    ///
    /// Returns `Ok(false)` without uploading if registration was rejected
    /// on chain.
    ///
    /// # Errors
    ///
    /// A failed sync is returned after the upload has happened. The
    /// uploaded item stays staged, so [`sync_key_to_server`](Self::sync_key_to_server)
    /// can be retried on its own.
    pub async fn create_backup(&self, backup_type: BackupType, user: &ActiveUser) -> Result<bool> {
        if !self.register_key_to_chain(backup_type, user).await? {
            return Ok(false);
        }
        self.backup_key(backup_type, user).await?;
        if let Err(e) = self.sync_key_to_server(backup_type).await {
            tracing::warn!(%backup_type, error = %e, "backup uploaded but device sync failed");
            return Err(e);
        }
        Ok(true)
    }

    // -- Custodian access -------------------------------------------------

    /// Logs into the `backup_type` custodian.
    pub async fn login(&self, backup_type: BackupType) -> Result<()> {
        self.stores.get(backup_type)?.login_cloud().await
    }

    /// Reads the `backup_type` list with the default password.
    pub async fn fetch_items(&self, backup_type: BackupType) -> Result<Vec<BackupItem>> {
        self.stores
            .get(backup_type)?
            .get_current_items(&self.env.default_password()?)
            .await
    }

    /// Removes `user`'s entries from the `backup_type` list.
    pub async fn delete_backup(&self, backup_type: BackupType, user: &ActiveUser) -> Result<()> {
        self.stores
            .get(backup_type)?
            .remove_item(user, &self.env.default_password()?)
            .await
    }

    // -- Restore ----------------------------------------------------------

    /// Finds two backups of `user_id` for the same account, taken from
    /// different custodians.
    ///
    /// Custodians that cannot be read are skipped. The returned items
    /// carry the type of the custodian they were read from.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::KeyNotFound`] if no such pair exists.
    pub async fn find_quorum(
        &self,
        types: &[BackupType],
        user_id: &str,
    ) -> Result<(BackupItem, BackupItem)> {
        let mut found: Vec<BackupItem> = Vec::new();

        for &backup_type in types {
            if found.iter().any(|i| i.backup_type == backup_type) {
                continue;
            }
            let items = match self.fetch_items(backup_type).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(%backup_type, error = %e, "skipping unreadable backup");
                    continue;
                }
            };

            for candidate in items_for_user(&items, user_id) {
                if let Some(partner) = found.iter().find(|i| i.address == candidate.address) {
                    let mut second = candidate.clone();
                    second.backup_type = backup_type;
                    return Ok((partner.clone(), second));
                }
            }
            if let Some(first) = items_for_user(&items, user_id).first() {
                let mut item = (*first).clone();
                item.backup_type = backup_type;
                found.push(item);
            }
        }

        Err(OutblockError::KeyNotFound {
            reason: format!(
                "fewer than two backups of user {user_id} for one account in {} custodians",
                types.len()
            ),
        })
    }

    /// Password that decrypts `item`'s mnemonic.
    pub fn password_for(&self, item: &BackupItem) -> Result<BackupPassword> {
        match item.code.as_deref() {
            Some(code) if item.is_pin_protected() => BackupPassword::for_pin_code(code),
            _ => self.env.default_password(),
        }
    }

    /// Restores access to `user_id`'s account from two custodians.
    pub async fn restore_with_quorum(
        &self,
        types: &[BackupType],
        user_id: &str,
        rotation: &QuorumKeyRotation,
        device_info: DeviceInfo,
    ) -> Result<RotationOutcome> {
        let (first, second) = self.find_quorum(types, user_id).await?;
        tracing::info!(
            address = %first.address,
            first = %first.backup_type,
            second = %second.backup_type,
            "restoring with backup quorum"
        );

        let first = self.co_signer(first)?;
        let second = self.co_signer(second)?;
        rotation.rotate(&first, &second, user_id, device_info).await
    }

    fn co_signer(&self, item: BackupItem) -> Result<CoSigner> {
        let password = self.password_for(&item)?;
        Ok(CoSigner::new(item, password).with_derivation_path(self.config.derivation_path.clone()))
    }
}

impl std::fmt::Debug for BackupOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupOrchestrator")
            .field("stores", &self.stores)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
