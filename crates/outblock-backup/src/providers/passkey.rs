//! Passkey placeholder. No custodian backs it yet.

use async_trait::async_trait;
use outblock_crypto::cipher::BackupPassword;
use outblock_types::{ActiveUser, BackupItem, BackupType, OutblockError, Result};

use crate::session::LoginState;
use crate::store::BackupStore;

/// [`BackupStore`] that rejects every operation.
#[derive(Debug, Default)]
pub struct PasskeyStore;

impl PasskeyStore {
    /// Creates the placeholder store.
    pub fn new() -> Self {
        Self
    }
}

fn unsupported(operation: &str) -> OutblockError {
    OutblockError::Unsupported {
        reason: format!("passkey backup does not support {operation}"),
    }
}

#[async_trait]
impl BackupStore for PasskeyStore {
    fn backup_type(&self) -> BackupType {
        BackupType::Passkey
    }

    fn login_state(&self) -> LoginState {
        LoginState::Unauthenticated
    }

    async fn login_cloud(&self) -> Result<()> {
        Err(unsupported("login"))
    }

    async fn upload(
        &self,
        _user: &ActiveUser,
        _item: &BackupItem,
        _password: &BackupPassword,
    ) -> Result<()> {
        Err(unsupported("upload"))
    }

    async fn get_current_items(&self, _password: &BackupPassword) -> Result<Vec<BackupItem>> {
        Err(unsupported("reading items"))
    }

    async fn remove_item(&self, _user: &ActiveUser, _password: &BackupPassword) -> Result<()> {
        Err(unsupported("removal"))
    }
}
