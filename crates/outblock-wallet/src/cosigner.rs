//! Signer backed by a recovered backup item.
//!
//! A [`CoSigner`] holds only the encrypted item and its password. Every
//! signature decrypts the mnemonic, derives the key, signs, and drops
//! both again; nothing secret outlives a single `sign` call.

use async_trait::async_trait;
use outblock_crypto::cipher::BackupPassword;
use outblock_crypto::hd_derive::derive_private_key;
use outblock_crypto::mnemonic::Mnemonic;
use outblock_crypto::signing::{SigningCurve, SIGNATURE_LEN};
use outblock_types::config::DEFAULT_DERIVATION_PATH;
use outblock_types::{BackupItem, FlowAddress, OutblockError, Result};

use crate::backend::AccountKeySignature;
use crate::chain::TransactionSigner;

/// Ephemeral signer for one [`BackupItem`].
pub struct CoSigner {
    item: BackupItem,
    password: BackupPassword,
    derivation_path: String,
}

impl CoSigner {
    /// Wraps `item`, which decrypts with `password`.
    pub fn new(item: BackupItem, password: BackupPassword) -> Self {
        Self {
            item,
            password,
            derivation_path: DEFAULT_DERIVATION_PATH.to_string(),
        }
    }

    /// Overrides the derivation path.
    pub fn with_derivation_path(mut self, path: impl Into<String>) -> Self {
        self.derivation_path = path.into();
        self
    }

    /// Returns the wrapped item.
    pub fn item(&self) -> &BackupItem {
        &self.item
    }

    /// Returns the public key recorded in the item.
    pub fn public_key(&self) -> &str {
        &self.item.public_key
    }

    /// Signs `SHA-256(message)` with the recovered key.
    ///
    /// 15-word mnemonics sign on P-256, every other length on secp256k1.
    /// The recovery byte of the raw signature is dropped. The mnemonic,
    /// seed and private key are zeroized before returning, on error paths
    /// too.
    ///
    /// # Errors
    ///
    /// - [`OutblockError::DecryptionFailed`] / [`OutblockError::HexDecodeFailed`]
    ///   if the item does not decrypt with this password.
    /// - [`OutblockError::CryptoError`] if the plaintext is not a valid
    ///   mnemonic or signing fails.
    pub fn sign_message(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
        let phrase = self.password.decrypt_mnemonic(&self.item.data)?;
        let mnemonic = Mnemonic::from_phrase(&phrase)?;
        drop(phrase);

        let curve = SigningCurve::for_word_count(mnemonic.word_count());
        let seed = mnemonic.to_seed()?;
        drop(mnemonic);

        let key = derive_private_key(&seed, curve, &self.derivation_path)?;
        drop(seed);

        key.sign(message)
    }

    /// Checks that the item's mnemonic derives the recorded public key.
    pub fn verify_public_key(&self) -> Result<()> {
        let phrase = self.password.decrypt_mnemonic(&self.item.data)?;
        let mnemonic = Mnemonic::from_phrase(&phrase)?;
        let curve = SigningCurve::for_word_count(mnemonic.word_count());
        let seed = mnemonic.to_seed()?;
        let derived = derive_private_key(&seed, curve, &self.derivation_path)?.public_key()?;

        if derived.to_hex().eq_ignore_ascii_case(self.item.public_key.trim_start_matches("0x")) {
            Ok(())
        } else {
            Err(OutblockError::KeyNotFound {
                reason: format!(
                    "backup of {} does not derive its recorded public key",
                    self.item.address
                ),
            })
        }
    }

    /// Signs `message` and packages the result for the backend.
    pub fn key_signature(&self, message: &[u8]) -> Result<AccountKeySignature> {
        let signature = self.sign_message(message)?;
        Ok(AccountKeySignature {
            public_key: self.item.public_key.clone(),
            sign_algo: self.item.sign_algo,
            hash_algo: self.item.hash_algo,
            weight: self.item.weight,
            signature: hex::encode(signature),
        })
    }
}

#[async_trait]
impl TransactionSigner for CoSigner {
    fn address(&self) -> FlowAddress {
        self.item.address
    }

    fn key_index(&self) -> u32 {
        self.item.key_index
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.sign_message(message)?.to_vec())
    }
}

impl std::fmt::Debug for CoSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoSigner")
            .field("address", &self.item.address)
            .field("key_index", &self.item.key_index)
            .field("backup_type", &self.item.backup_type)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
