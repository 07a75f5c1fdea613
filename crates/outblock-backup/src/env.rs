//! Source of the default backup password.
//!
//! The backup AES key and the persisted 16-byte IV are process-wide
//! secrets owned by the host app. They are injected once through a
//! [`PasswordProvider`] and never change afterwards.

use std::fmt;
use std::path::Path;

use outblock_crypto::cipher::{BackupPassword, IV_LEN};
use outblock_types::{OutblockError, Result};
use serde::Deserialize;
use zeroize::Zeroizing;

/// Provides the default backup password.
pub trait PasswordProvider: Send + Sync {
    /// The backup AES key string.
    fn backup_aes_key(&self) -> &str;

    /// The persisted 16-byte IV string.
    fn aes_iv(&self) -> &str;

    /// The default password: provider key with provider IV.
    fn default_password(&self) -> Result<BackupPassword> {
        BackupPassword::new(self.backup_aes_key(), self.aes_iv())
    }
}

/// Immutable [`PasswordProvider`] built from known values.
#[derive(Deserialize)]
pub struct StaticEnv {
    backup_aes_key: Zeroizing<String>,
    aes_iv: String,
}

impl StaticEnv {
    /// Creates a provider, validating both values.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::ConfigError`] if the key is empty or the
    /// IV is not exactly 16 bytes.
    pub fn new(backup_aes_key: impl Into<String>, aes_iv: impl Into<String>) -> Result<Self> {
        let env = Self {
            backup_aes_key: Zeroizing::new(backup_aes_key.into()),
            aes_iv: aes_iv.into(),
        };
        env.validate()?;
        Ok(env)
    }

    /// Loads `{ "backup_aes_key": ..., "aes_iv": ... }` from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            OutblockError::ConfigError {
                reason: format!("failed to read env file {}: {e}", path.display()),
            }
        })?);
        let env: Self = serde_json::from_str(&json).map_err(|e| OutblockError::ConfigError {
            reason: format!("failed to parse env file: {e}"),
        })?;
        env.validate()?;
        Ok(env)
    }

    fn validate(&self) -> Result<()> {
        if self.backup_aes_key.is_empty() {
            return Err(OutblockError::ConfigError {
                reason: "backup AES key must not be empty".into(),
            });
        }
        if self.aes_iv.len() != IV_LEN {
            return Err(OutblockError::ConfigError {
                reason: format!("AES IV must be {IV_LEN} bytes, got {}", self.aes_iv.len()),
            });
        }
        Ok(())
    }
}

impl PasswordProvider for StaticEnv {
    fn backup_aes_key(&self) -> &str {
        &self.backup_aes_key
    }

    fn aes_iv(&self) -> &str {
        &self.aes_iv
    }
}

impl fmt::Debug for StaticEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticEnv")
            .field("backup_aes_key", &"<redacted>")
            .field("aes_iv", &self.aes_iv)
            .finish()
    }
}
