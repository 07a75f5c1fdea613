//! Backend API collaborator and its request payloads.
//!
//! Payloads serialize to the backend's JSON shape (snake_case). The HTTP
//! transport lives behind [`BackendApi`].

use async_trait::async_trait;
use outblock_types::{BackupType, DeviceInfo, HashAlgo, OutblockError, Result, SignAlgo};
use serde::{Deserialize, Serialize};

use crate::chain::NewAccountKey;

/// Public key descriptor sent to the backend.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AccountKeyPayload {
    /// Public key hex.
    pub public_key: String,
    /// Signature scheme code.
    pub sign_algo: SignAlgo,
    /// Hash scheme code.
    pub hash_algo: HashAlgo,
    /// Signing weight.
    pub weight: u32,
}

impl From<&NewAccountKey> for AccountKeyPayload {
    fn from(key: &NewAccountKey) -> Self {
        Self {
            public_key: key.public_key.clone(),
            sign_algo: key.sign_algo,
            hash_algo: key.hash_algo,
            weight: key.weight,
        }
    }
}

/// Backup metadata attached to a device sync.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Custodian of the backup.
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    /// Display name of the backup.
    pub name: String,
}

/// Body of `POST syncDevice`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SyncDeviceRequest {
    /// Key the device registered.
    pub account_key: AccountKeyPayload,
    /// Registering device.
    pub device_info: DeviceInfo,
    /// Backup the key belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_info: Option<BackupInfo>,
}

/// One co-signer's proof of key ownership.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AccountKeySignature {
    /// Public key of the signing key.
    pub public_key: String,
    /// Signature scheme code.
    pub sign_algo: SignAlgo,
    /// Hash scheme code.
    pub hash_algo: HashAlgo,
    /// Weight of the signing key.
    pub weight: u32,
    /// Hex of the 64-byte signature over the user-id message.
    pub signature: String,
}

/// Body of `POST addSigned`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AddSignedRequest {
    /// Newly added key.
    pub account_key: AccountKeyPayload,
    /// Device owning the new key.
    pub device_info: DeviceInfo,
    /// Proofs from the co-signers.
    pub signatures: Vec<AccountKeySignature>,
}

/// Status returned by the backend.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    /// HTTP status code.
    pub http_code: u16,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
}

impl BackendResponse {
    /// Returns `true` for 2xx codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_code)
    }

    /// Maps a non-success response to [`OutblockError::BackendError`].
    pub fn into_result(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(OutblockError::BackendError {
                code: self.http_code,
                message: self.message,
            })
        }
    }
}

/// Backend REST API.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Registers a device key with the backend.
    async fn sync_device(&self, request: SyncDeviceRequest) -> Result<BackendResponse>;

    /// Registers a co-signed key with the backend.
    async fn add_signed(&self, request: AddSignedRequest) -> Result<BackendResponse>;
}
