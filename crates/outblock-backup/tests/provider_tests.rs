//! Contract tests for the custodian adapters.
//!
//! Every adapter runs against an in-memory SDK fake. The fakes store the
//! exact bytes an adapter writes, so the tests also check the on-cloud
//! format through the list codec.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::*;
use outblock_backup::codec;
use outblock_backup::providers::{
    DropboxStore, GoogleDriveStore, ICloudStore, PasskeyStore, PhraseStore,
};
use outblock_backup::{BackupStore, LoginState};
use outblock_crypto::cipher::BackupPassword;
use outblock_types::config::BACKUP_FILE_NAME;
use outblock_types::{
    ActiveUser, BackupItem, BackupType, HashAlgo, OutblockError, Result, SignAlgo,
};

fn password() -> Result<BackupPassword> {
    BackupPassword::new(ENV_KEY, ENV_IV)
}

fn item(user_id: &str, user_name: &str, data: &str, backup_type: BackupType) -> BackupItem {
    BackupItem {
        address: ADDRESS,
        user_id: user_id.into(),
        user_name: user_name.into(),
        user_avatar: None,
        public_key: "ab".repeat(64),
        data: data.into(),
        key_index: 1,
        sign_algo: SignAlgo::EcdsaSecp256k1,
        hash_algo: HashAlgo::Sha2_256,
        weight: 500,
        updated_time: 1_700_000_000,
        device_info: None,
        code: None,
        backup_type,
    }
}

// ---------------------------------------------------------------------------
// Google Drive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn google_missing_file_is_empty_list() -> Result<()> {
    init_tracing();
    let store = GoogleDriveStore::new(Arc::new(MemoryDrive::authorized()), BACKUP_FILE_NAME);
    store.login_cloud().await?;
    assert!(store.get_current_items(&password()?).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn google_upload_replaces_user_entry() -> Result<()> {
    let drive = Arc::new(MemoryDrive::authorized());
    let store = GoogleDriveStore::new(drive.clone(), BACKUP_FILE_NAME);
    let password = password()?;
    let alice = ActiveUser::new("u1", "alice");
    let bob = ActiveUser::new("u2", "bob");

    store
        .upload(&alice, &item("u1", "alice", "first", BackupType::Google), &password)
        .await?;
    store
        .upload(&bob, &item("u2", "bob", "bob", BackupType::Google), &password)
        .await?;
    store
        .upload(&alice, &item("u1", "alice", "second", BackupType::Google), &password)
        .await?;

    let content = drive.file(BACKUP_FILE_NAME).ok_or(OutblockError::FileNotFoundOnCloud {
        file: BACKUP_FILE_NAME.into(),
    })?;
    let items = codec::decrypt_list(&content, &password)?;
    let data: Vec<&str> = items.iter().map(|i| i.data.as_str()).collect();
    assert_eq!(data, vec!["bob", "second"]);
    Ok(())
}

#[tokio::test]
async fn google_login_requests_missing_scope_once() -> Result<()> {
    let drive = Arc::new(MemoryDrive::default());
    drive.grant_scope_on_request.store(true, Ordering::SeqCst);
    let store = GoogleDriveStore::new(drive.clone(), BACKUP_FILE_NAME);
    assert_eq!(store.login_state(), LoginState::Unauthenticated);

    store.login_cloud().await?;
    store.login_cloud().await?;

    assert_eq!(drive.sign_in_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.login_state(), LoginState::Authenticated);
    Ok(())
}

#[tokio::test]
async fn google_denied_scope_fails_login() {
    let drive = Arc::new(MemoryDrive::default());
    let store = GoogleDriveStore::new(drive, BACKUP_FILE_NAME);
    let result = store.login_cloud().await;
    assert!(matches!(result, Err(OutblockError::Unauthorized { .. })));
    assert_eq!(store.login_state(), LoginState::Unauthenticated);
}

#[tokio::test]
async fn google_without_session_is_unauthorized() -> Result<()> {
    let store = GoogleDriveStore::new(Arc::new(MemoryDrive::default()), BACKUP_FILE_NAME);
    let result = store.get_current_items(&password()?).await;
    assert!(matches!(result, Err(OutblockError::Unauthorized { .. })));
    Ok(())
}

#[tokio::test]
async fn google_restores_session_silently() -> Result<()> {
    let drive = Arc::new(MemoryDrive::authorized());
    let store = GoogleDriveStore::new(drive.clone(), BACKUP_FILE_NAME);
    // No explicit login: the previous sign-in is restored.
    assert!(store.get_current_items(&password()?).await?.is_empty());
    assert_eq!(store.login_state(), LoginState::Authenticated);
    assert_eq!(drive.sign_in_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

// ---------------------------------------------------------------------------
// Dropbox
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropbox_login_completes_through_redirect() -> Result<()> {
    let dropbox = Arc::new(MemoryDropbox::new(RedirectBehavior::Approve));
    let store = DropboxStore::new(dropbox.clone(), BACKUP_FILE_NAME, Duration::from_secs(5));

    store.login_cloud().await?;
    store.login_cloud().await?;

    assert_eq!(store.login_state(), LoginState::Authenticated);
    assert_eq!(dropbox.authorization_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn dropbox_login_times_out() {
    let dropbox = Arc::new(MemoryDropbox::new(RedirectBehavior::Never));
    let store = DropboxStore::new(dropbox, BACKUP_FILE_NAME, Duration::from_millis(50));

    let result = store.login_cloud().await;
    assert!(matches!(result, Err(OutblockError::Timeout { .. })));
    assert_eq!(store.login_state(), LoginState::Unauthenticated);
}

#[tokio::test]
async fn dropbox_abandoned_redirect_is_unauthorized() {
    let dropbox = Arc::new(MemoryDropbox::new(RedirectBehavior::Abandon));
    let store = DropboxStore::new(dropbox, BACKUP_FILE_NAME, Duration::from_secs(5));
    let result = store.login_cloud().await;
    assert!(matches!(result, Err(OutblockError::Unauthorized { .. })));
}

#[tokio::test]
async fn dropbox_reads_quoted_content_at_root_path() -> Result<()> {
    let dropbox = Arc::new(MemoryDropbox::new(RedirectBehavior::Approve));
    let store = DropboxStore::new(dropbox.clone(), BACKUP_FILE_NAME, Duration::from_secs(5));
    assert_eq!(store.path(), format!("/{BACKUP_FILE_NAME}"));

    let password = password()?;
    let items = vec![item("u1", "alice", "00", BackupType::Dropbox)];
    let envelope = codec::encrypt_list(&items, &password)?;
    dropbox.put_file(store.path(), &format!("\"{envelope}\""));

    store.login_cloud().await?;
    assert_eq!(store.get_current_items(&password).await?, items);
    Ok(())
}

#[tokio::test]
async fn dropbox_missing_file_is_empty_list() -> Result<()> {
    let dropbox = Arc::new(MemoryDropbox::new(RedirectBehavior::Approve));
    dropbox.authorized.store(true, Ordering::SeqCst);
    let store = DropboxStore::new(dropbox, BACKUP_FILE_NAME, Duration::from_secs(5));
    assert!(store.get_current_items(&password()?).await?.is_empty());
    Ok(())
}

// ---------------------------------------------------------------------------
// iCloud
// ---------------------------------------------------------------------------

#[tokio::test]
async fn icloud_missing_file_is_reported() -> Result<()> {
    let store = ICloudStore::new(Arc::new(MemoryContainer::new(true)), BACKUP_FILE_NAME);
    store.login_cloud().await?;
    let result = store.get_current_items(&password()?).await;
    assert!(matches!(
        result,
        Err(OutblockError::FileNotFoundOnCloud { file }) if file == BACKUP_FILE_NAME
    ));
    Ok(())
}

#[tokio::test]
async fn icloud_first_upload_creates_file() -> Result<()> {
    let container = Arc::new(MemoryContainer::new(true));
    let store = ICloudStore::new(container.clone(), BACKUP_FILE_NAME);
    let password = password()?;
    let user = ActiveUser::new("u1", "alice");

    store
        .upload(&user, &item("u1", "alice", "00", BackupType::ICloud), &password)
        .await?;
    assert!(container.file(BACKUP_FILE_NAME).is_some());
    assert_eq!(store.get_current_items(&password).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn icloud_unavailable_rejects_login() {
    let store = ICloudStore::new(Arc::new(MemoryContainer::new(false)), BACKUP_FILE_NAME);
    assert!(matches!(
        store.login_cloud().await,
        Err(OutblockError::Unauthorized { .. })
    ));
}

// ---------------------------------------------------------------------------
// Phrase
// ---------------------------------------------------------------------------

#[tokio::test]
async fn phrase_store_roundtrips_through_disk() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = PhraseStore::new(&dir.path().join("backups"), BACKUP_FILE_NAME);
    let password = password()?;
    let alice = ActiveUser::new("u1", "alice");

    assert_eq!(store.login_state(), LoginState::Authenticated);
    store.login_cloud().await?;
    assert!(store.get_current_items(&password).await?.is_empty());

    store
        .upload(&alice, &item("u1", "alice", "00", BackupType::Phrase), &password)
        .await?;
    store
        .upload(&ActiveUser::new("u2", "bob"), &item("u2", "bob", "11", BackupType::Phrase), &password)
        .await?;
    assert!(store.path().exists());
    assert_eq!(store.get_current_items(&password).await?.len(), 2);

    store.remove_item(&alice, &password).await?;
    let remaining = store.get_current_items(&password).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].user_id, "u2");
    Ok(())
}

#[tokio::test]
async fn removal_keeps_entry_with_other_name() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = PhraseStore::new(dir.path(), BACKUP_FILE_NAME);
    let password = password()?;

    // Written under a user name that no longer matches the active user.
    store
        .upload(
            &ActiveUser::new("u1", "old-name"),
            &item("u1", "old-name", "00", BackupType::Phrase),
            &password,
        )
        .await?;
    store
        .remove_item(&ActiveUser::new("u1", "new-name"), &password)
        .await?;
    assert_eq!(store.get_current_items(&password).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn wrong_list_password_is_decryption_error() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = PhraseStore::new(dir.path(), BACKUP_FILE_NAME);
    store
        .upload(
            &ActiveUser::new("u1", "alice"),
            &item("u1", "alice", "00", BackupType::Phrase),
            &password()?,
        )
        .await?;

    let other = BackupPassword::new("some-other-secret", ENV_IV)?;
    assert!(matches!(
        store.get_current_items(&other).await,
        Err(OutblockError::DecryptionFailed { .. })
    ));
    Ok(())
}

// ---------------------------------------------------------------------------
// Passkey
// ---------------------------------------------------------------------------

#[tokio::test]
async fn passkey_is_unsupported() -> Result<()> {
    let store = PasskeyStore::new();
    let user = ActiveUser::new("u1", "alice");
    assert!(matches!(store.login_cloud().await, Err(OutblockError::Unsupported { .. })));
    assert!(matches!(
        store.upload(&user, &item("u1", "alice", "00", BackupType::Passkey), &password()?).await,
        Err(OutblockError::Unsupported { .. })
    ));
    assert!(matches!(
        store.get_current_items(&password()?).await,
        Err(OutblockError::Unsupported { .. })
    ));
    assert!(matches!(
        store.remove_item(&user, &password()?).await,
        Err(OutblockError::Unsupported { .. })
    ));
    Ok(())
}
