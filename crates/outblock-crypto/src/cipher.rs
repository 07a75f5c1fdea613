//! AES-GCM backup cipher and password derivation.
//!
//! Backups are encrypted with AES-128-GCM using a 16-byte nonce. The key
//! and IV are *strings*, which is what custodian files written by other
//! clients expect:
//!
//! - key = UTF-8 bytes of the key string, truncated or right-padded with
//!   zeros to 16 bytes;
//! - nonce = UTF-8 bytes of the IV string, exactly 16 bytes.
//!
//! The output is the "combined" box: `nonce(16) || ciphertext || tag(16)`.

use std::fmt;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes128;
use aes_gcm::{AesGcm, Nonce};
use outblock_types::{OutblockError, Result};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

/// AES-128-GCM with a 128-bit nonce.
type Aes128Gcm16 = AesGcm<Aes128, U16>;

/// Byte length of the AES key.
pub const KEY_LEN: usize = 16;

/// Byte length of the IV / nonce.
pub const IV_LEN: usize = 16;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Number of hex characters kept by [`derive_password`].
const DERIVED_PASSWORD_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Password derivation
// ---------------------------------------------------------------------------

/// Derives a password string from `s`.
///
/// `SHA-256(utf8(s))`, lowercase hex, first 16 hex characters (not bytes).
/// Used both to strengthen a PIN into a key and to derive an IV from a
/// supplied password.
pub fn derive_password(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    let mut hex_digest = hex::encode(digest);
    let derived = hex_digest[..DERIVED_PASSWORD_LEN].to_string();
    hex_digest.zeroize();
    derived
}

// ---------------------------------------------------------------------------
// Encrypt / Decrypt
// ---------------------------------------------------------------------------

/// Encrypts `plaintext` with a key and IV given as strings.
///
/// # Errors
///
/// - [`OutblockError::ConfigError`] if the IV is not exactly 16 bytes.
/// - [`OutblockError::CryptoError`] if the cipher fails.
pub fn encrypt(plaintext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>> {
    let cipher = build_cipher(key)?;
    let nonce_bytes = iv_bytes(iv)?;
    let nonce = Nonce::<U16>::from_slice(nonce_bytes);

    let sealed = cipher.encrypt(nonce, plaintext).map_err(|e| OutblockError::CryptoError {
        reason: format!("AES-GCM encryption failed: {e}"),
    })?;

    let mut combined = Vec::with_capacity(IV_LEN + sealed.len());
    combined.extend_from_slice(nonce_bytes);
    combined.extend_from_slice(&sealed);
    Ok(combined)
}

/// Decrypts a combined box produced by [`encrypt`].
///
/// # Errors
///
/// - [`OutblockError::ConfigError`] if the IV is not exactly 16 bytes.
/// - [`OutblockError::DecryptionFailed`] if the box is truncated, its
///   nonce differs from `iv`, or tag verification fails (wrong key,
///   wrong IV, or tampered data).
pub fn decrypt(ciphertext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>> {
    let cipher = build_cipher(key)?;
    let nonce_bytes = iv_bytes(iv)?;

    if ciphertext.len() < IV_LEN + TAG_LEN {
        return Err(OutblockError::DecryptionFailed {
            reason: format!(
                "ciphertext too short: expected at least {} bytes, got {}",
                IV_LEN + TAG_LEN,
                ciphertext.len()
            ),
        });
    }

    let (embedded_nonce, sealed) = ciphertext.split_at(IV_LEN);
    if embedded_nonce != nonce_bytes {
        return Err(OutblockError::DecryptionFailed {
            reason: "nonce does not match the expected IV".into(),
        });
    }

    cipher
        .decrypt(Nonce::<U16>::from_slice(nonce_bytes), sealed)
        .map_err(|_| OutblockError::DecryptionFailed {
            reason: "authentication tag mismatch".into(),
        })
}

fn build_cipher(key: &str) -> Result<Aes128Gcm16> {
    let mut key_bytes = Zeroizing::new([0u8; KEY_LEN]);
    let raw = key.as_bytes();
    let n = raw.len().min(KEY_LEN);
    key_bytes[..n].copy_from_slice(&raw[..n]);

    Aes128Gcm16::new_from_slice(&key_bytes[..]).map_err(|e| OutblockError::CryptoError {
        reason: format!("invalid AES key: {e}"),
    })
}

fn iv_bytes(iv: &str) -> Result<&[u8]> {
    let bytes = iv.as_bytes();
    if bytes.len() != IV_LEN {
        return Err(OutblockError::ConfigError {
            reason: format!("IV must be {IV_LEN} bytes, got {}", bytes.len()),
        });
    }
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// BackupPassword
// ---------------------------------------------------------------------------

/// A key/IV pair used to encrypt backup data.
///
/// The key is zeroized on drop. `Debug` never prints the key.
pub struct BackupPassword {
    key: Zeroizing<String>,
    iv: String,
}

impl BackupPassword {
    /// Creates a password from an explicit key and IV.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::ConfigError`] if the key is empty or the
    /// IV is not exactly 16 bytes.
    pub fn new(key: impl Into<String>, iv: impl Into<String>) -> Result<Self> {
        let key = Zeroizing::new(key.into());
        let iv = iv.into();
        if key.is_empty() {
            return Err(OutblockError::ConfigError {
                reason: "backup key must not be empty".into(),
            });
        }
        iv_bytes(&iv)?;
        Ok(Self { key, iv })
    }

    /// Password whose IV is derived from the supplied secret.
    ///
    /// key = `secret`, iv = [`derive_password`]`(secret)`.
    pub fn from_secret(secret: &str) -> Result<Self> {
        Self::new(secret, derive_password(secret))
    }

    /// Password of a PIN-protected backup item.
    ///
    /// The key is [`derive_password`]`(code)` where `code` is the value
    /// stored in the item's `code` field.
    pub fn for_pin_code(code: &str) -> Result<Self> {
        let key = Zeroizing::new(derive_password(code));
        Self::from_secret(&key)
    }

    /// Returns the key string.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the IV string.
    pub fn iv(&self) -> &str {
        &self.iv
    }

    /// Encrypts `plaintext` with this password.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        encrypt(plaintext, &self.key, &self.iv)
    }

    /// Decrypts `ciphertext` with this password.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        decrypt(ciphertext, &self.key, &self.iv)
    }

    /// Encrypts `plaintext` and hex-encodes the combined box.
    pub fn encrypt_hex(&self, plaintext: &[u8]) -> Result<String> {
        Ok(hex::encode(self.encrypt(plaintext)?))
    }

    /// Hex-decodes and decrypts a combined box.
    ///
    /// # Errors
    ///
    /// - [`OutblockError::HexDecodeFailed`] if `hex_data` is not valid hex.
    /// - [`OutblockError::DecryptionFailed`] as for [`decrypt`].
    pub fn decrypt_hex(&self, hex_data: &str) -> Result<Vec<u8>> {
        let bytes = hex::decode(hex_data).map_err(|e| OutblockError::HexDecodeFailed {
            reason: format!("invalid hex: {e}"),
        })?;
        self.decrypt(&bytes)
    }

    /// Encrypts a mnemonic into the hex form stored in `BackupItem::data`.
    pub fn encrypt_mnemonic(&self, mnemonic: &str) -> Result<String> {
        self.encrypt_hex(mnemonic.as_bytes())
    }

    /// Decrypts `BackupItem::data` back into a mnemonic.
    ///
    /// The returned string is zeroized on drop.
    ///
    /// # Errors
    ///
    /// As for [`decrypt_hex`](Self::decrypt_hex), plus
    /// [`OutblockError::DecodingFailed`] if the plaintext is not UTF-8.
    pub fn decrypt_mnemonic(&self, hex_data: &str) -> Result<Zeroizing<String>> {
        let plaintext = self.decrypt_hex(hex_data)?;
        let phrase = String::from_utf8(plaintext).map_err(|e| {
            let mut bad = e.into_bytes();
            bad.zeroize();
            OutblockError::DecodingFailed {
                reason: "decrypted mnemonic is not valid UTF-8".into(),
            }
        })?;
        Ok(Zeroizing::new(phrase))
    }
}

impl fmt::Debug for BackupPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupPassword")
            .field("key", &"<redacted>")
            .field("iv", &self.iv)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
