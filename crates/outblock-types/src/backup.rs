//! Backup records as stored at a custodian.
//!
//! A [`BackupItem`] is the unit of one user's backup inside a custodian
//! file. The file itself holds an encrypted JSON array of items, at most
//! one per `userId`.

use serde::{Deserialize, Serialize};

use crate::{BackupType, FlowAddress, HashAlgo, SignAlgo};

/// Default signing weight of a key registered for one backup.
///
/// Two such keys together reach the account threshold of 1000.
pub const DEFAULT_BACKUP_KEY_WEIGHT: u32 = 500;

// ---------------------------------------------------------------------------
// DeviceInfo
// ---------------------------------------------------------------------------

/// Metadata about the device that registered a key.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable identifier of the device installation.
    pub device_id: String,
    /// User-visible device name.
    pub name: String,
    /// Device family, e.g. `"ios"`.
    #[serde(rename = "type")]
    pub device_type: String,
    /// User agent string of the app.
    pub user_agent: String,
    /// App version that registered the key.
    pub app_version: String,
    /// Last known IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Last known city.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Last known country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

// ---------------------------------------------------------------------------
// ActiveUser
// ---------------------------------------------------------------------------

/// The signed-in user on whose behalf a backup list is modified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActiveUser {
    /// Backend user id.
    pub user_id: String,
    /// Backend user name.
    pub user_name: String,
}

impl ActiveUser {
    /// Creates a new `ActiveUser`.
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// BackupItem
// ---------------------------------------------------------------------------

/// One user's encrypted mnemonic plus account metadata.
///
/// # Invariants
///
/// - `data` is the hex-encoded output of the symmetric cipher applied to
///   a UTF-8 mnemonic. It is never plaintext.
/// - `code`, when set, is the PIN-derived secret the item's password is
///   derived from instead of the default backup password.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupItem {
    /// Chain account address this key belongs to.
    pub address: FlowAddress,
    /// Backend id of the backup owner.
    pub user_id: String,
    /// Backend user name of the backup owner.
    pub user_name: String,
    /// Avatar URL of the backup owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    /// Public key (hex) matching the backed-up private key material.
    pub public_key: String,
    /// Hex of the encrypted mnemonic.
    pub data: String,
    /// Index of this key in the account's key list.
    pub key_index: u32,
    /// Signature scheme of the key.
    pub sign_algo: SignAlgo,
    /// Hash scheme of the key.
    pub hash_algo: HashAlgo,
    /// Signing weight of the key on the account.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Seconds since the Unix epoch of the last update.
    #[serde(default = "now_secs")]
    pub updated_time: i64,
    /// Device that registered the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    /// PIN-derived secret, set only for PIN-protected backups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Custodian this item was written for.
    #[serde(default)]
    pub backup_type: BackupType,
}

impl BackupItem {
    /// Returns `true` if this item is encrypted with a PIN-derived password.
    pub fn is_pin_protected(&self) -> bool {
        self.code.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Returns `true` if this item belongs to `user`, matching both id and name.
    pub fn belongs_to(&self, user: &ActiveUser) -> bool {
        self.user_id == user.user_id && self.user_name == user.user_name
    }
}

fn default_weight() -> u32 {
    DEFAULT_BACKUP_KEY_WEIGHT
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
