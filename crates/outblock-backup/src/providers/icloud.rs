//! iCloud ubiquity container.
//!
//! Unlike the other custodians, reading a list that was never written is
//! an error ([`OutblockError::FileNotFoundOnCloud`]). Uploads start from
//! an empty list in that case.

use std::sync::Arc;

use async_trait::async_trait;
use outblock_crypto::cipher::BackupPassword;
use outblock_types::{ActiveUser, BackupItem, BackupType, OutblockError, Result};

use crate::codec;
use crate::session::{LoginState, SessionGate};
use crate::store::{merge_and_encode, BackupStore};

/// The app's iCloud document container.
#[async_trait]
pub trait UbiquityContainer: Send + Sync {
    /// Returns `true` if iCloud is signed in and the container resolves.
    async fn is_available(&self) -> bool;

    /// Returns `true` if `name` exists in the container.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Reads `name`.
    async fn read(&self, name: &str) -> Result<String>;

    /// Creates or overwrites `name`.
    async fn write(&self, name: &str, content: &str) -> Result<()>;
}

/// [`BackupStore`] over a [`UbiquityContainer`].
pub struct ICloudStore {
    container: Arc<dyn UbiquityContainer>,
    file_name: String,
    gate: SessionGate,
}

impl ICloudStore {
    /// Creates a store keeping its list in `file_name`.
    pub fn new(container: Arc<dyn UbiquityContainer>, file_name: impl Into<String>) -> Self {
        Self {
            container,
            file_name: file_name.into(),
            gate: SessionGate::new(),
        }
    }

    async fn check_available(&self) -> Result<()> {
        if self.container.is_available().await {
            Ok(())
        } else {
            Err(OutblockError::Unauthorized {
                reason: "iCloud is not available".into(),
            })
        }
    }

    async fn ensure_session(&self) -> Result<()> {
        self.gate
            .ensure_authenticated("icloud", || async {
                Ok::<_, OutblockError>(self.container.is_available().await)
            })
            .await
    }

    async fn read_list(&self, password: &BackupPassword) -> Result<Vec<BackupItem>> {
        if !self.container.exists(&self.file_name).await? {
            return Err(OutblockError::FileNotFoundOnCloud {
                file: self.file_name.clone(),
            });
        }
        let content = self.container.read(&self.file_name).await?;
        codec::decrypt_list(&content, password)
    }

    async fn read_list_or_empty(&self, password: &BackupPassword) -> Result<Vec<BackupItem>> {
        match self.read_list(password).await {
            Err(OutblockError::FileNotFoundOnCloud { .. }) => Ok(Vec::new()),
            other => other,
        }
    }
}

#[async_trait]
impl BackupStore for ICloudStore {
    fn backup_type(&self) -> BackupType {
        BackupType::ICloud
    }

    fn login_state(&self) -> LoginState {
        self.gate.state()
    }

    async fn login_cloud(&self) -> Result<()> {
        self.gate.login(|| self.check_available()).await
    }

    async fn upload(
        &self,
        user: &ActiveUser,
        item: &BackupItem,
        password: &BackupPassword,
    ) -> Result<()> {
        self.ensure_session().await?;
        let list = self.read_list_or_empty(password).await?;
        let content = merge_and_encode(list, user, item, password)?;
        self.container.write(&self.file_name, &content).await
    }

    async fn get_current_items(&self, password: &BackupPassword) -> Result<Vec<BackupItem>> {
        self.ensure_session().await?;
        self.read_list(password).await
    }

    async fn remove_item(&self, user: &ActiveUser, password: &BackupPassword) -> Result<()> {
        self.ensure_session().await?;
        let list = codec::remove_current_user(self.read_list_or_empty(password).await?, user);
        let content = codec::encrypt_list(&list, password)?;
        self.container.write(&self.file_name, &content).await
    }
}
