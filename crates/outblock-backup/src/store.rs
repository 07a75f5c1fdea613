//! Custodian abstraction and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use outblock_crypto::cipher::BackupPassword;
use outblock_types::{ActiveUser, BackupItem, BackupType, OutblockError, Result};

use crate::codec;
use crate::session::LoginState;

/// One place a backup list is kept.
///
/// Writes are fetch-modify-write without locking; two devices writing
/// at once means the last writer wins.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// The custodian this store talks to.
    fn backup_type(&self) -> BackupType;

    /// Current session state.
    fn login_state(&self) -> LoginState;

    /// Establishes a session. A no-op when one exists.
    async fn login_cloud(&self) -> Result<()>;

    /// Replaces `user`'s entry in the remote list with `item`.
    async fn upload(
        &self,
        user: &ActiveUser,
        item: &BackupItem,
        password: &BackupPassword,
    ) -> Result<()>;

    /// Reads and decrypts the remote list.
    async fn get_current_items(&self, password: &BackupPassword) -> Result<Vec<BackupItem>>;

    /// Removes `user`'s entries from the remote list.
    async fn remove_item(&self, user: &ActiveUser, password: &BackupPassword) -> Result<()>;
}

/// Decodes the remote content, treating a missing file as an empty list.
pub(crate) fn decode_or_empty(
    content: Option<String>,
    password: &BackupPassword,
) -> Result<Vec<BackupItem>> {
    match content {
        Some(content) if !content.trim().is_empty() => codec::decrypt_list(&content, password),
        _ => Ok(Vec::new()),
    }
}

/// Merges `item` into `list` and re-encrypts the result.
pub(crate) fn merge_and_encode(
    list: Vec<BackupItem>,
    user: &ActiveUser,
    item: &BackupItem,
    password: &BackupPassword,
) -> Result<String> {
    let list = codec::add_or_replace(list, item.clone(), user)?;
    codec::encrypt_list(&list, password)
}

// ---------------------------------------------------------------------------
// StoreRegistry
// ---------------------------------------------------------------------------

/// Stores keyed by custodian type.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    stores: HashMap<BackupType, Arc<dyn BackupStore>>,
}

impl StoreRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `store` under its own type, replacing any previous one.
    pub fn register(&mut self, store: Arc<dyn BackupStore>) {
        self.stores.insert(store.backup_type(), store);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, store: Arc<dyn BackupStore>) -> Self {
        self.register(store);
        self
    }

    /// Returns the store for `backup_type`.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::Unsupported`] if none is registered.
    pub fn get(&self, backup_type: BackupType) -> Result<Arc<dyn BackupStore>> {
        self.stores
            .get(&backup_type)
            .cloned()
            .ok_or_else(|| OutblockError::Unsupported {
                reason: format!("no store registered for {backup_type}"),
            })
    }

    /// Registered types, in [`BackupType::ALL`] order.
    pub fn types(&self) -> Vec<BackupType> {
        BackupType::ALL
            .into_iter()
            .filter(|t| self.stores.contains_key(t))
            .collect()
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("types", &self.types())
            .finish()
    }
}
