//! Google Drive app-data folder.

use std::sync::Arc;

use async_trait::async_trait;
use outblock_crypto::cipher::BackupPassword;
use outblock_types::{ActiveUser, BackupItem, BackupType, OutblockError, Result};

use crate::session::{LoginState, SessionGate};
use crate::store::{decode_or_empty, merge_and_encode, BackupStore};

/// Scope granting access to the hidden app-data folder.
pub const DRIVE_APP_DATA_SCOPE: &str = "https://www.googleapis.com/auth/drive.appdata";

/// Google sign-in and Drive client.
#[async_trait]
pub trait GoogleDriveApi: Send + Sync {
    /// Restores a previous sign-in without UI. `false` if there is none.
    async fn restore_previous_sign_in(&self) -> Result<bool>;

    /// Runs the interactive sign-in.
    async fn sign_in(&self) -> Result<()>;

    /// Scopes the signed-in user granted.
    async fn granted_scopes(&self) -> Result<Vec<String>>;

    /// Asks the user for additional scopes.
    async fn request_scopes(&self, scopes: &[&str]) -> Result<()>;

    /// Content of the app-data file `name`, `None` if it does not exist.
    async fn read_app_data_file(&self, name: &str) -> Result<Option<String>>;

    /// Creates or overwrites the app-data file `name`.
    async fn write_app_data_file(&self, name: &str, content: &str) -> Result<()>;
}

/// [`BackupStore`] over a [`GoogleDriveApi`].
pub struct GoogleDriveStore {
    api: Arc<dyn GoogleDriveApi>,
    file_name: String,
    gate: SessionGate,
}

impl GoogleDriveStore {
    /// Creates a store keeping its list in `file_name`.
    pub fn new(api: Arc<dyn GoogleDriveApi>, file_name: impl Into<String>) -> Self {
        Self {
            api,
            file_name: file_name.into(),
            gate: SessionGate::new(),
        }
    }

    async fn has_app_data_scope(&self) -> Result<bool> {
        Ok(self
            .api
            .granted_scopes()
            .await?
            .iter()
            .any(|s| s == DRIVE_APP_DATA_SCOPE))
    }

    async fn ensure_session(&self) -> Result<()> {
        self.gate
            .ensure_authenticated("google", || async {
                let restored = self.api.restore_previous_sign_in().await?;
                Ok::<_, OutblockError>(restored && self.has_app_data_scope().await?)
            })
            .await
    }

    async fn read_list(&self, password: &BackupPassword) -> Result<Vec<BackupItem>> {
        let content = self.api.read_app_data_file(&self.file_name).await?;
        decode_or_empty(content, password)
    }
}

#[async_trait]
impl BackupStore for GoogleDriveStore {
    fn backup_type(&self) -> BackupType {
        BackupType::Google
    }

    fn login_state(&self) -> LoginState {
        self.gate.state()
    }

    async fn login_cloud(&self) -> Result<()> {
        self.gate
            .login(|| async {
                if !self.api.restore_previous_sign_in().await? {
                    self.api.sign_in().await?;
                }
                if !self.has_app_data_scope().await? {
                    tracing::debug!("requesting drive app-data scope");
                    self.api.request_scopes(&[DRIVE_APP_DATA_SCOPE]).await?;
                    if !self.has_app_data_scope().await? {
                        return Err(OutblockError::Unauthorized {
                            reason: "drive app-data scope not granted".into(),
                        });
                    }
                }
                tracing::info!("google drive session established");
                Ok(())
            })
            .await
    }

    async fn upload(
        &self,
        user: &ActiveUser,
        item: &BackupItem,
        password: &BackupPassword,
    ) -> Result<()> {
        self.ensure_session().await?;
        let list = self.read_list(password).await?;
        let content = merge_and_encode(list, user, item, password)?;
        self.api.write_app_data_file(&self.file_name, &content).await
    }

    async fn get_current_items(&self, password: &BackupPassword) -> Result<Vec<BackupItem>> {
        self.ensure_session().await?;
        self.read_list(password).await
    }

    async fn remove_item(&self, user: &ActiveUser, password: &BackupPassword) -> Result<()> {
        self.ensure_session().await?;
        let list = crate::codec::remove_current_user(self.read_list(password).await?, user);
        let content = crate::codec::encrypt_list(&list, password)?;
        self.api.write_app_data_file(&self.file_name, &content).await
    }
}
