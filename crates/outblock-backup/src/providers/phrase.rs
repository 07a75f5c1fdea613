//! Recovery phrase kept on the device.
//!
//! The list lives in a file under an app directory. There is no remote
//! session, so the store is always authenticated.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use outblock_crypto::cipher::BackupPassword;
use outblock_types::{ActiveUser, BackupItem, BackupType, OutblockError, Result};

use crate::codec;
use crate::session::LoginState;
use crate::store::{decode_or_empty, merge_and_encode, BackupStore};

/// [`BackupStore`] writing to a local file.
#[derive(Debug)]
pub struct PhraseStore {
    path: PathBuf,
}

impl PhraseStore {
    /// Creates a store keeping its list at `dir/file_name`.
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Self {
            path: dir.join(file_name),
        }
    }

    /// Location of the list file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_content(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OutblockError::CloudReadFailed {
                reason: format!("failed to read {}: {e}", self.path.display()),
            }),
        }
    }

    async fn write_content(&self, content: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| OutblockError::CloudWriteFailed {
                    reason: format!("failed to create {}: {e}", dir.display()),
                })?;
        }
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| OutblockError::CloudWriteFailed {
                reason: format!("failed to write {}: {e}", self.path.display()),
            })
    }

    async fn read_list(&self, password: &BackupPassword) -> Result<Vec<BackupItem>> {
        decode_or_empty(self.read_content().await?, password)
    }
}

#[async_trait]
impl BackupStore for PhraseStore {
    fn backup_type(&self) -> BackupType {
        BackupType::Phrase
    }

    fn login_state(&self) -> LoginState {
        LoginState::Authenticated
    }

    async fn login_cloud(&self) -> Result<()> {
        Ok(())
    }

    async fn upload(
        &self,
        user: &ActiveUser,
        item: &BackupItem,
        password: &BackupPassword,
    ) -> Result<()> {
        let list = self.read_list(password).await?;
        let content = merge_and_encode(list, user, item, password)?;
        self.write_content(&content).await
    }

    async fn get_current_items(&self, password: &BackupPassword) -> Result<Vec<BackupItem>> {
        self.read_list(password).await
    }

    async fn remove_item(&self, user: &ActiveUser, password: &BackupPassword) -> Result<()> {
        let list = codec::remove_current_user(self.read_list(password).await?, user);
        let content = codec::encrypt_list(&list, password)?;
        self.write_content(&content).await
    }
}
