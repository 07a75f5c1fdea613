//! In-memory custodian SDKs, chain, backend and wallet manager shared by
//! the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use outblock_crypto::signing::{verify, PrivateKey, PublicKey, SigningCurve};
use outblock_backup::providers::{
    DropboxApi, GoogleDriveApi, UbiquityContainer, DRIVE_APP_DATA_SCOPE,
};
use outblock_types::{FlowAddress, HashAlgo, OutblockError, Result, SignAlgo};
use outblock_wallet::backend::{AddSignedRequest, BackendApi, BackendResponse, SyncDeviceRequest};
use outblock_wallet::chain::{
    Account, AccountKey, ChainClient, MultiSignAddKey, NewAccountKey, SealOutcome, TransactionId,
    TransactionSigner,
};
use outblock_wallet::keystore::{DeviceKey, SecureKeyStore, SessionManager};
use outblock_wallet::manager::WalletManager;
use tokio::sync::oneshot;

pub const ADDRESS: FlowAddress = FlowAddress::new([0x0b; 8]);
pub const SERVICE_ADDRESS: FlowAddress = FlowAddress::new([0x5e; 8]);
pub const ENV_KEY: &str = "flow-backup-secret";
pub const ENV_IV: &str = "a1b2c3d4e5f60718";
const TX_PAYLOAD: &[u8] = b"transaction payload";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("outblock_backup=debug,outblock_wallet=debug")
        .try_init();
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ---------------------------------------------------------------------------
// Google Drive
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryDrive {
    pub has_previous_sign_in: AtomicBool,
    pub grant_scope_on_request: AtomicBool,
    pub signed_in: AtomicBool,
    pub sign_in_calls: AtomicUsize,
    scopes: Mutex<Vec<String>>,
    files: Mutex<HashMap<String, String>>,
}

impl MemoryDrive {
    /// A drive the user has already authorized.
    pub fn authorized() -> Self {
        let drive = Self::default();
        drive.has_previous_sign_in.store(true, Ordering::SeqCst);
        drive.signed_in.store(true, Ordering::SeqCst);
        drive.grant_scope_on_request.store(true, Ordering::SeqCst);
        lock(&drive.scopes).push(DRIVE_APP_DATA_SCOPE.to_string());
        drive
    }

    pub fn file(&self, name: &str) -> Option<String> {
        lock(&self.files).get(name).cloned()
    }

    pub fn put_file(&self, name: &str, content: &str) {
        lock(&self.files).insert(name.to_string(), content.to_string());
    }
}

#[async_trait]
impl GoogleDriveApi for MemoryDrive {
    async fn restore_previous_sign_in(&self) -> Result<bool> {
        let restored = self.has_previous_sign_in.load(Ordering::SeqCst);
        if restored {
            self.signed_in.store(true, Ordering::SeqCst);
        }
        Ok(restored)
    }

    async fn sign_in(&self) -> Result<()> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.signed_in.store(true, Ordering::SeqCst);
        self.has_previous_sign_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn granted_scopes(&self) -> Result<Vec<String>> {
        Ok(lock(&self.scopes).clone())
    }

    async fn request_scopes(&self, scopes: &[&str]) -> Result<()> {
        if self.grant_scope_on_request.load(Ordering::SeqCst) {
            lock(&self.scopes).extend(scopes.iter().map(|s| s.to_string()));
        }
        Ok(())
    }

    async fn read_app_data_file(&self, name: &str) -> Result<Option<String>> {
        Ok(self.file(name))
    }

    async fn write_app_data_file(&self, name: &str, content: &str) -> Result<()> {
        self.put_file(name, content);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dropbox
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq)]
pub enum RedirectBehavior {
    /// The redirect handler reports success.
    Approve,
    /// The user never comes back.
    Never,
    /// The redirect handler is dropped without answering.
    Abandon,
}

pub struct MemoryDropbox {
    pub authorized: AtomicBool,
    pub authorization_calls: AtomicUsize,
    redirect: Mutex<RedirectBehavior>,
    parked: Mutex<Vec<oneshot::Sender<Result<()>>>>,
    files: Mutex<HashMap<String, String>>,
}

impl MemoryDropbox {
    pub fn new(redirect: RedirectBehavior) -> Self {
        Self {
            authorized: AtomicBool::new(false),
            authorization_calls: AtomicUsize::new(0),
            redirect: Mutex::new(redirect),
            parked: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn file(&self, path: &str) -> Option<String> {
        lock(&self.files).get(path).cloned()
    }

    pub fn put_file(&self, path: &str, content: &str) {
        lock(&self.files).insert(path.to_string(), content.to_string());
    }
}

#[async_trait]
impl DropboxApi for MemoryDropbox {
    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    async fn start_authorization(&self, redirect: oneshot::Sender<Result<()>>) -> Result<()> {
        self.authorization_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *lock(&self.redirect);
        match behavior {
            RedirectBehavior::Approve => {
                self.authorized.store(true, Ordering::SeqCst);
                let _ = redirect.send(Ok(()));
            }
            RedirectBehavior::Never => lock(&self.parked).push(redirect),
            RedirectBehavior::Abandon => drop(redirect),
        }
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Option<String>> {
        Ok(self.file(path))
    }

    async fn upload(&self, path: &str, content: &str) -> Result<()> {
        self.put_file(path, content);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// iCloud
// ---------------------------------------------------------------------------

pub struct MemoryContainer {
    pub available: AtomicBool,
    files: Mutex<HashMap<String, String>>,
}

impl MemoryContainer {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn file(&self, name: &str) -> Option<String> {
        lock(&self.files).get(name).cloned()
    }
}

#[async_trait]
impl UbiquityContainer for MemoryContainer {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(lock(&self.files).contains_key(name))
    }

    async fn read(&self, name: &str) -> Result<String> {
        self.file(name).ok_or_else(|| OutblockError::CloudReadFailed {
            reason: format!("{name} vanished"),
        })
    }

    async fn write(&self, name: &str, content: &str) -> Result<()> {
        lock(&self.files).insert(name.to_string(), content.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq)]
pub enum SealBehavior {
    Honest,
    Failed,
    Hang,
}

/// Account whose add-key transactions seal once the signing keys reach
/// the threshold. Single-signer add-keys are signed by the primary key.
pub struct MockChain {
    account: Mutex<Account>,
    behavior: Mutex<SealBehavior>,
    transactions: Mutex<HashMap<String, (NewAccountKey, u32)>>,
    pub single_submissions: AtomicUsize,
    pub multi_submissions: AtomicUsize,
    next_tx: AtomicUsize,
    threshold: u32,
}

impl MockChain {
    pub fn new(primary_public_key: String) -> Self {
        Self {
            account: Mutex::new(Account {
                address: ADDRESS,
                keys: vec![AccountKey {
                    index: 0,
                    public_key: primary_public_key,
                    sign_algo: SignAlgo::EcdsaP256,
                    hash_algo: HashAlgo::Sha2_256,
                    weight: 1000,
                    sequence_number: 0,
                    revoked: false,
                }],
            }),
            behavior: Mutex::new(SealBehavior::Honest),
            transactions: Mutex::new(HashMap::new()),
            single_submissions: AtomicUsize::new(0),
            multi_submissions: AtomicUsize::new(0),
            next_tx: AtomicUsize::new(0),
            threshold: 1000,
        }
    }

    pub fn set_behavior(&self, behavior: SealBehavior) {
        *lock(&self.behavior) = behavior;
    }

    pub fn account(&self) -> Account {
        lock(&self.account).clone()
    }

    /// Revokes the primary key, as after losing the device.
    pub fn revoke_primary(&self) {
        if let Some(key) = lock(&self.account).keys.get_mut(0) {
            key.revoked = true;
        }
    }

    /// Weight the signer contributes. The payload signature must verify
    /// against the account key at the signer's index.
    async fn signer_weight(&self, signer: &dyn TransactionSigner) -> Result<u32> {
        let signature = signer.sign(TX_PAYLOAD).await?;
        assert_eq!(signature.len(), 64);
        if signer.address() != ADDRESS {
            return Ok(0);
        }
        let key = lock(&self.account)
            .keys
            .iter()
            .find(|k| k.index == signer.key_index() && !k.revoked)
            .cloned();
        let Some(key) = key else {
            return Ok(0);
        };
        let public_key =
            PublicKey::from_hex(SigningCurve::from_sign_algo(key.sign_algo), &key.public_key)?;
        verify(&public_key, TX_PAYLOAD, &signature).map_err(|_| OutblockError::NetworkError {
            reason: format!("invalid signature for key {}", key.index),
        })?;
        Ok(key.weight)
    }

    fn record(&self, key: NewAccountKey, weight: u32, counter: &AtomicUsize) -> TransactionId {
        counter.fetch_add(1, Ordering::SeqCst);
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let id = format!("tx-{n}");
        lock(&self.transactions).insert(id.clone(), (key, weight));
        TransactionId(id)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_account_at_latest_block(&self, address: FlowAddress) -> Result<Account> {
        let account = self.account();
        if account.address != address {
            return Err(OutblockError::NetworkError {
                reason: format!("unknown account {address}"),
            });
        }
        Ok(account)
    }

    async fn add_key_to_account(
        &self,
        address: FlowAddress,
        key: NewAccountKey,
        signer: &dyn TransactionSigner,
    ) -> Result<TransactionId> {
        assert_eq!(address, ADDRESS);
        let weight = self.signer_weight(signer).await?;
        Ok(self.record(key, weight, &self.single_submissions))
    }

    async fn add_key_with_multi(&self, request: MultiSignAddKey<'_>) -> Result<TransactionId> {
        let mut weight = 0;
        for signer in &request.signers {
            weight += self.signer_weight(*signer).await?;
        }
        Ok(self.record(request.key, weight, &self.multi_submissions))
    }

    async fn once_sealed(&self, tx_id: &TransactionId) -> Result<SealOutcome> {
        let behavior = *lock(&self.behavior);
        match behavior {
            SealBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(SealOutcome::default())
            }
            SealBehavior::Failed => Ok(SealOutcome {
                is_failed: true,
                is_complete: true,
                error_message: Some("execution reverted".into()),
            }),
            SealBehavior::Honest => {
                let Some((key, weight)) = lock(&self.transactions).remove(&tx_id.0) else {
                    return Err(OutblockError::NetworkError {
                        reason: format!("unknown transaction {tx_id}"),
                    });
                };
                if weight < self.threshold {
                    return Ok(SealOutcome::default());
                }
                let mut account = lock(&self.account);
                let index = account.keys.len() as u32;
                account.keys.push(AccountKey {
                    index,
                    public_key: key.public_key,
                    sign_algo: key.sign_algo,
                    hash_algo: key.hash_algo,
                    weight: key.weight,
                    sequence_number: 0,
                    revoked: false,
                });
                Ok(SealOutcome::sealed())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

pub struct MockBackend {
    pub status: AtomicU16,
    pub syncs: Mutex<Vec<SyncDeviceRequest>>,
    pub add_signed: Mutex<Vec<AddSignedRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            status: AtomicU16::new(200),
            syncs: Mutex::new(Vec::new()),
            add_signed: Mutex::new(Vec::new()),
        }
    }

    pub fn syncs(&self) -> Vec<SyncDeviceRequest> {
        lock(&self.syncs).clone()
    }

    pub fn add_signed_requests(&self) -> Vec<AddSignedRequest> {
        lock(&self.add_signed).clone()
    }

    fn response(&self) -> BackendResponse {
        let code = self.status.load(Ordering::SeqCst);
        BackendResponse {
            http_code: code,
            message: if code < 300 { "ok".into() } else { "server says no".into() },
        }
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn sync_device(&self, request: SyncDeviceRequest) -> Result<BackendResponse> {
        lock(&self.syncs).push(request);
        Ok(self.response())
    }

    async fn add_signed(&self, request: AddSignedRequest) -> Result<BackendResponse> {
        lock(&self.add_signed).push(request);
        Ok(self.response())
    }
}

// ---------------------------------------------------------------------------
// Wallet manager, key store, session
// ---------------------------------------------------------------------------

pub struct KeySigner {
    pub address: FlowAddress,
    pub key_index: u32,
    pub key: PrivateKey,
}

#[async_trait]
impl TransactionSigner for KeySigner {
    fn address(&self) -> FlowAddress {
        self.address
    }

    fn key_index(&self) -> u32 {
        self.key_index
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(message)?.to_vec())
    }
}

pub struct MockWallets {
    pub address: Option<FlowAddress>,
    pub signer: Arc<KeySigner>,
}

impl MockWallets {
    pub fn new(address: Option<FlowAddress>) -> Self {
        Self {
            address,
            signer: Arc::new(KeySigner {
                address: ADDRESS,
                key_index: 0,
                key: PrivateKey::generate(SigningCurve::P256),
            }),
        }
    }

    pub fn primary_public_key(&self) -> Result<String> {
        Ok(self.signer.key.public_key()?.to_hex())
    }
}

impl WalletManager for MockWallets {
    fn primary_wallet_address(&self) -> Option<FlowAddress> {
        self.address
    }

    fn primary_signer(&self) -> Result<Arc<dyn TransactionSigner>> {
        let signer: Arc<dyn TransactionSigner> = self.signer.clone();
        Ok(signer)
    }
}

#[derive(Default)]
pub struct MockKeyStore {
    pub persisted: Mutex<Vec<String>>,
}

#[async_trait]
impl SecureKeyStore for MockKeyStore {
    async fn generate_key(&self) -> Result<DeviceKey> {
        let key = PrivateKey::generate(SigningCurve::P256);
        Ok(DeviceKey {
            handle_id: "enclave-1".into(),
            public_key: key.public_key()?.to_hex(),
            sign_algo: SignAlgo::EcdsaP256,
            hash_algo: HashAlgo::Sha2_256,
        })
    }

    async fn persist(&self, key: &DeviceKey, _user_id: &str) -> Result<()> {
        lock(&self.persisted).push(key.handle_id.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockSession {
    pub restored: AtomicUsize,
}

#[async_trait]
impl SessionManager for MockSession {
    async fn register_store_user(
        &self,
        _user_id: &str,
        _address: FlowAddress,
        _key: &DeviceKey,
    ) -> Result<()> {
        Ok(())
    }

    async fn restore_session(&self, _user_id: &str) -> Result<()> {
        self.restored.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn service_signer() -> Arc<KeySigner> {
    Arc::new(KeySigner {
        address: SERVICE_ADDRESS,
        key_index: 0,
        key: PrivateKey::generate(SigningCurve::P256),
    })
}
