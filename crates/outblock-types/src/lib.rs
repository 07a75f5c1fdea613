//! Core shared types for the Outblock multi-backup key core.
//!
//! This crate defines all fundamental types used across the workspace.
//! No other crate should define shared types; everything lives here.

pub mod backup;
pub mod config;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use backup::{ActiveUser, BackupItem, DeviceInfo};

// ---------------------------------------------------------------------------
// FlowAddress
// ---------------------------------------------------------------------------

/// 8-byte Flow account address.
///
/// Displayed as `0x` followed by 16 lowercase hex characters. Parsing
/// accepts the value with or without the `0x` prefix.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct FlowAddress([u8; 8]);

impl FlowAddress {
    /// The fixed byte length of an address.
    pub const LEN: usize = 8;

    /// Creates a new `FlowAddress` from raw bytes.
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl From<[u8; 8]> for FlowAddress {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for FlowAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for FlowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for FlowAddress {
    type Err = OutblockError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|_| OutblockError::InvalidAddress {
            reason: "invalid hex encoding".into(),
        })?;
        if bytes.len() != Self::LEN {
            return Err(OutblockError::InvalidAddress {
                reason: format!("expected {} bytes, got {}", Self::LEN, bytes.len()),
            });
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for FlowAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FlowAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// BackupType
// ---------------------------------------------------------------------------

/// Custodian that holds one copy of a backup.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    /// Google Drive app-data folder.
    Google,
    /// Passkey placeholder. Not implemented by any custodian yet.
    Passkey,
    /// iCloud ubiquity container.
    #[serde(rename = "icloud")]
    ICloud,
    /// Manual recovery phrase kept on the device.
    #[default]
    Phrase,
    /// Dropbox app folder.
    Dropbox,
}

impl BackupType {
    /// Every custodian type, in display order.
    pub const ALL: [BackupType; 5] = [
        Self::Google,
        Self::Passkey,
        Self::ICloud,
        Self::Phrase,
        Self::Dropbox,
    ];

    /// Returns `true` for custodians whose items are encrypted with a
    /// PIN-derived password when a PIN has been configured.
    pub fn requires_pin(&self) -> bool {
        matches!(self, Self::Google | Self::ICloud | Self::Dropbox)
    }

    /// Returns `true` for remote custodians reached over a network SDK.
    pub fn is_cloud(&self) -> bool {
        matches!(self, Self::Google | Self::ICloud | Self::Dropbox)
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Passkey => write!(f, "passkey"),
            Self::ICloud => write!(f, "icloud"),
            Self::Phrase => write!(f, "phrase"),
            Self::Dropbox => write!(f, "dropbox"),
        }
    }
}

impl FromStr for BackupType {
    type Err = OutblockError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "passkey" => Ok(Self::Passkey),
            "icloud" => Ok(Self::ICloud),
            "phrase" => Ok(Self::Phrase),
            "dropbox" => Ok(Self::Dropbox),
            other => Err(OutblockError::ConfigError {
                reason: format!("unknown backup type '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// SignAlgo / HashAlgo
// ---------------------------------------------------------------------------

/// Signature scheme of an account key, encoded with the chain's integer codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SignAlgo {
    /// ECDSA over NIST P-256.
    EcdsaP256,
    /// ECDSA over secp256k1.
    EcdsaSecp256k1,
}

impl SignAlgo {
    /// Returns the integer code used on chain and in backup items.
    pub fn code(&self) -> u8 {
        match self {
            Self::EcdsaP256 => 1,
            Self::EcdsaSecp256k1 => 2,
        }
    }
}

impl From<SignAlgo> for u8 {
    fn from(algo: SignAlgo) -> Self {
        algo.code()
    }
}

impl TryFrom<u8> for SignAlgo {
    type Error = OutblockError;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::EcdsaP256),
            2 => Ok(Self::EcdsaSecp256k1),
            other => Err(OutblockError::DecodingFailed {
                reason: format!("unknown signature algorithm code {other}"),
            }),
        }
    }
}

/// Hash scheme of an account key, encoded with the chain's integer codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HashAlgo {
    /// SHA2-256.
    Sha2_256,
    /// SHA3-256.
    Sha3_256,
}

impl HashAlgo {
    /// Returns the integer code used on chain and in backup items.
    pub fn code(&self) -> u8 {
        match self {
            Self::Sha2_256 => 1,
            Self::Sha3_256 => 3,
        }
    }
}

impl From<HashAlgo> for u8 {
    fn from(algo: HashAlgo) -> Self {
        algo.code()
    }
}

impl TryFrom<u8> for HashAlgo {
    type Error = OutblockError;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Sha2_256),
            3 => Ok(Self::Sha3_256),
            other => Err(OutblockError::DecodingFailed {
                reason: format!("unknown hash algorithm code {other}"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// OutblockError
// ---------------------------------------------------------------------------

/// Central error type for the multi-backup key core.
///
/// All crates in the workspace convert their internal errors into variants
/// of this enum, ensuring a unified error handling surface.
#[derive(Debug, Error)]
pub enum OutblockError {
    // ----- Preconditions ---------------------------------------------------

    /// The active user has no user name.
    #[error("missing user name")]
    MissingUserName,

    /// The active user has no user id.
    #[error("missing user id")]
    MissingUid,

    /// No mnemonic is available for the wallet being backed up.
    #[error("missing mnemonic")]
    MissingMnemonic,

    /// No primary wallet address is available.
    #[error("missing wallet address")]
    MissingAddress,

    /// A list merge was requested without an active user.
    #[error("missing active user")]
    MissingUser,

    /// A backup was requested for a type whose key was never registered on chain.
    #[error("no registered key staged for {backup_type} backup")]
    NotRegistered {
        /// The custodian the backup was requested for.
        backup_type: BackupType,
    },

    // ----- Crypto ----------------------------------------------------------

    /// Stored data is not valid hex (the backup blob is missing or truncated).
    #[error("missing data: {reason}")]
    HexDecodeFailed {
        /// Human-readable description of the decoding failure.
        reason: String,
    },

    /// Authenticated decryption failed (wrong password, wrong IV, or tampering).
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Decrypted bytes are not the expected JSON or UTF-8 structure.
    #[error("decoding failed: {reason}")]
    DecodingFailed {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A cryptographic operation failed (key derivation, signing, encryption).
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    // ----- Custodian -------------------------------------------------------

    /// The custodian session is not established and could not be silently established.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Human-readable description of the session problem.
        reason: String,
    },

    /// The backup file does not exist at the custodian.
    #[error("file not found on cloud: {file}")]
    FileNotFoundOnCloud {
        /// Name of the missing file.
        file: String,
    },

    /// Reading from the custodian failed.
    #[error("cloud read failed: {reason}")]
    CloudReadFailed {
        /// Human-readable description of the read failure.
        reason: String,
    },

    /// Writing to the custodian failed.
    #[error("cloud write failed: {reason}")]
    CloudWriteFailed {
        /// Human-readable description of the write failure.
        reason: String,
    },

    /// The operation is not supported by this custodian.
    #[error("unsupported: {reason}")]
    Unsupported {
        /// Human-readable description of the unsupported operation.
        reason: String,
    },

    // ----- Chain -----------------------------------------------------------

    /// The transaction sealed but was marked failed.
    #[error("transaction sealed as failed: {reason}")]
    SealFailed {
        /// Error message reported by the chain.
        reason: String,
    },

    /// The transaction sealed without sufficient signature weight.
    #[error("transaction {tx_id} sealed incomplete")]
    SealIncomplete {
        /// Identifier of the transaction.
        tx_id: String,
    },

    /// An operation did not finish within its deadline.
    #[error("timed out: {operation}")]
    Timeout {
        /// Name of the operation that timed out.
        operation: String,
    },

    /// A transport-level failure talking to the chain or a custodian.
    #[error("network error: {reason}")]
    NetworkError {
        /// Human-readable description of the network failure.
        reason: String,
    },

    /// A public key was not found among the account's keys.
    #[error("key not found: {reason}")]
    KeyNotFound {
        /// Human-readable description of the lookup.
        reason: String,
    },

    // ----- Backend ---------------------------------------------------------

    /// The backend answered with a non-success status.
    #[error("backend error {code}: {message}")]
    BackendError {
        /// HTTP status code returned by the backend.
        code: u16,
        /// Message returned by the backend.
        message: String,
    },

    /// The backend refused the co-signed key registration.
    #[error("signature rejected by backend: {reason}")]
    SignatureRejected {
        /// Status and message returned by the backend.
        reason: String,
    },

    // ----- Configuration ---------------------------------------------------

    /// The provided address is malformed.
    #[error("invalid address: {reason}")]
    InvalidAddress {
        /// Human-readable description of why the address is invalid.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },
}

impl OutblockError {
    /// Returns the short message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::HexDecodeFailed { .. }
            | Self::DecryptionFailed { .. }
            | Self::DecodingFailed { .. } => "backup unreadable".into(),
            Self::SealFailed { .. }
            | Self::SealIncomplete { .. }
            | Self::SignatureRejected { .. } => "incorrect signature information".into(),
            other => other.to_string(),
        }
    }

    /// Returns `true` for transport failures a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::CloudReadFailed { .. }
                | Self::CloudWriteFailed { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`OutblockError`].
pub type Result<T> = std::result::Result<T, OutblockError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
