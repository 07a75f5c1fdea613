//! Backup core configuration with sensible defaults.
//!
//! All operational parameters are centralized here. Secrets (the default
//! backup password and the persisted AES IV) are deliberately absent:
//! they come from the password provider, not from a config file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{OutblockError, Result};

/// File name of the backup list at every custodian.
pub const BACKUP_FILE_NAME: &str = "outblock_multi_backup";

/// Fixed derivation path of backup keys (BIP-44, coin type 539).
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/539'/0'/0/0";

/// Mnemonic lengths accepted by BIP39.
const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Configuration of the backup orchestrator and key rotation.
///
/// All values are configurable via a JSON file; missing fields take
/// their defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// File name of the encrypted list at each custodian.
    pub backup_file_name: String,

    /// Weight of a key registered for a single backup.
    pub multi_key_weight: u32,

    /// Weight of a full key. Also the account's signing threshold.
    pub full_key_weight: u32,

    /// Derivation path used for every backup key.
    pub derivation_path: String,

    /// Number of words in a freshly generated backup mnemonic.
    pub mnemonic_word_count: usize,

    /// Seconds to wait for a transaction to seal.
    pub seal_timeout_secs: u64,

    /// Seconds to wait for an interactive custodian login.
    pub login_timeout_secs: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_file_name: BACKUP_FILE_NAME.into(),
            multi_key_weight: 500,
            full_key_weight: 1000,
            derivation_path: DEFAULT_DERIVATION_PATH.into(),
            mnemonic_word_count: 12,
            seal_timeout_secs: 120,
            login_timeout_secs: 180,
        }
    }
}

impl BackupConfig {
    /// Loads a JSON config file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::ConfigError`] if the file cannot be read,
    /// is not valid JSON, or fails [`validate`](Self::validate).
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| OutblockError::ConfigError {
            reason: format!("failed to read config file {}: {e}", path.display()),
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| OutblockError::ConfigError {
            reason: format!("failed to parse config file: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the seal timeout as a [`Duration`].
    pub fn seal_timeout(&self) -> Duration {
        Duration::from_secs(self.seal_timeout_secs)
    }

    /// Returns the login timeout as a [`Duration`].
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    /// Validates all configuration values.
    ///
    /// Returns an error if any value is outside its acceptable range.
    pub fn validate(&self) -> Result<()> {
        if self.backup_file_name.trim().is_empty() {
            return Err(OutblockError::ConfigError {
                reason: "backup_file_name must not be empty".into(),
            });
        }

        if self.multi_key_weight == 0 || self.full_key_weight == 0 {
            return Err(OutblockError::ConfigError {
                reason: "key weights must be greater than 0".into(),
            });
        }

        if self.multi_key_weight > self.full_key_weight {
            return Err(OutblockError::ConfigError {
                reason: "multi_key_weight must not exceed full_key_weight".into(),
            });
        }

        if !self.derivation_path.starts_with("m/") {
            return Err(OutblockError::ConfigError {
                reason: format!("derivation_path must start with 'm/': {}", self.derivation_path),
            });
        }

        if !VALID_WORD_COUNTS.contains(&self.mnemonic_word_count) {
            return Err(OutblockError::ConfigError {
                reason: format!(
                    "mnemonic_word_count must be one of {VALID_WORD_COUNTS:?}, got {}",
                    self.mnemonic_word_count
                ),
            });
        }

        if self.seal_timeout_secs == 0 {
            return Err(OutblockError::ConfigError {
                reason: "seal_timeout_secs must be greater than 0".into(),
            });
        }

        if self.login_timeout_secs == 0 {
            return Err(OutblockError::ConfigError {
                reason: "login_timeout_secs must be greater than 0".into(),
            });
        }

        Ok(())
    }
}
