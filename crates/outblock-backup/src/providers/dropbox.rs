//! Dropbox app folder.
//!
//! Dropbox authorizes through an OAuth redirect back into the app. The
//! store hands the SDK a one-shot sender; the host's redirect handler
//! completes it with the authorization result, and the login awaits the
//! receiver with a deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use outblock_crypto::cipher::BackupPassword;
use outblock_types::{ActiveUser, BackupItem, BackupType, OutblockError, Result};
use tokio::sync::oneshot;

use crate::session::{LoginState, SessionGate};
use crate::store::{decode_or_empty, merge_and_encode, BackupStore};

/// Dropbox client.
#[async_trait]
pub trait DropboxApi: Send + Sync {
    /// Returns `true` if a stored token authorizes the client.
    fn is_authorized(&self) -> bool;

    /// Opens the authorization flow. `redirect` receives the outcome
    /// once the app handles the OAuth redirect.
    async fn start_authorization(&self, redirect: oneshot::Sender<Result<()>>) -> Result<()>;

    /// Content of the file at `path`, `None` if it does not exist.
    async fn download(&self, path: &str) -> Result<Option<String>>;

    /// Writes `content` to `path`, overwriting.
    async fn upload(&self, path: &str, content: &str) -> Result<()>;
}

/// [`BackupStore`] over a [`DropboxApi`].
pub struct DropboxStore {
    api: Arc<dyn DropboxApi>,
    path: String,
    login_timeout: Duration,
    gate: SessionGate,
}

impl DropboxStore {
    /// Creates a store keeping its list at `/file_name`.
    pub fn new(api: Arc<dyn DropboxApi>, file_name: &str, login_timeout: Duration) -> Self {
        Self {
            api,
            path: format!("/{file_name}"),
            login_timeout,
            gate: SessionGate::new(),
        }
    }

    /// Remote path of the list.
    pub fn path(&self) -> &str {
        &self.path
    }

    async fn authorize(&self) -> Result<()> {
        if self.api.is_authorized() {
            return Ok(());
        }

        let (tx, rx) = oneshot::channel();
        self.api.start_authorization(tx).await?;

        match tokio::time::timeout(self.login_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(OutblockError::Unauthorized {
                reason: "dropbox authorization was abandoned".into(),
            }),
            Err(_) => {
                tracing::warn!(timeout = ?self.login_timeout, "dropbox authorization timed out");
                Err(OutblockError::Timeout {
                    operation: "dropbox authorization".into(),
                })
            }
        }
    }

    async fn ensure_session(&self) -> Result<()> {
        self.gate
            .ensure_authenticated("dropbox", || async {
                Ok::<_, OutblockError>(self.api.is_authorized())
            })
            .await
    }

    async fn read_list(&self, password: &BackupPassword) -> Result<Vec<BackupItem>> {
        decode_or_empty(self.api.download(&self.path).await?, password)
    }
}

#[async_trait]
impl BackupStore for DropboxStore {
    fn backup_type(&self) -> BackupType {
        BackupType::Dropbox
    }

    fn login_state(&self) -> LoginState {
        self.gate.state()
    }

    async fn login_cloud(&self) -> Result<()> {
        self.gate.login(|| self.authorize()).await
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
        self.api.upload(&self.path, &content).await
    }

    async fn get_current_items(&self, password: &BackupPassword) -> Result<Vec<BackupItem>> {
        self.ensure_session().await?;
        self.read_list(password).await
    }

    async fn remove_item(&self, user: &ActiveUser, password: &BackupPassword) -> Result<()> {
        self.ensure_session().await?;
        let list = crate::codec::remove_current_user(self.read_list(password).await?, user);
        let content = crate::codec::encrypt_list(&list, password)?;
        self.api.upload(&self.path, &content).await
    }
}
