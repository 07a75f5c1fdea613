//! BIP39 wallet creation and restore on secp256k1 or P-256.
//!
//! An [`HdWallet`] owns a mnemonic and the key derived from it along a
//! fixed path. The curve follows the mnemonic length: 15-word phrases
//! are P-256 wallets, every other length is secp256k1.
//!
//! The mnemonic and private key are zeroized when the wallet is dropped.

use outblock_crypto::hd_derive::derive_private_key;
use outblock_crypto::mnemonic::{generate_mnemonic, Mnemonic};
use outblock_crypto::signing::{PrivateKey, PublicKey, SigningCurve, SIGNATURE_LEN};
use outblock_types::{HashAlgo, Result, SignAlgo};

/// A mnemonic-backed wallet with its derived signing key.
///
/// # Invariants
///
/// - `private_key` is the key at `derivation_path` of `mnemonic`'s seed.
/// - `public_key` always matches `private_key`.
pub struct HdWallet {
    mnemonic: Mnemonic,
    derivation_path: String,
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl HdWallet {
    /// Generates a fresh wallet with a random `word_count`-word mnemonic.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::CryptoError`](outblock_types::OutblockError::CryptoError)
    /// if the word count is not a BIP39 length or derivation fails.
    pub fn generate(word_count: usize, derivation_path: &str) -> Result<Self> {
        let mnemonic = generate_mnemonic(word_count)?;
        Self::from_parsed(mnemonic, derivation_path)
    }

    /// Restores a wallet from an existing phrase.
    pub fn from_mnemonic(phrase: &str, derivation_path: &str) -> Result<Self> {
        let mnemonic = Mnemonic::from_phrase(phrase)?;
        Self::from_parsed(mnemonic, derivation_path)
    }

    fn from_parsed(mnemonic: Mnemonic, derivation_path: &str) -> Result<Self> {
        let curve = SigningCurve::for_word_count(mnemonic.word_count());
        let seed = mnemonic.to_seed()?;
        let private_key = derive_private_key(&seed, curve, derivation_path)?;
        let public_key = private_key.public_key()?;

        Ok(Self {
            mnemonic,
            derivation_path: derivation_path.to_string(),
            private_key,
            public_key,
        })
    }

    // -- Accessors --------------------------------------------------------

    /// Returns the mnemonic phrase.
    ///
    /// Callers must not log or persist the returned value unencrypted.
    pub fn mnemonic(&self) -> &str {
        self.mnemonic.as_str()
    }

    /// Returns the number of words in the mnemonic.
    pub fn word_count(&self) -> usize {
        self.mnemonic.word_count()
    }

    /// Returns the derivation path of the signing key.
    pub fn derivation_path(&self) -> &str {
        &self.derivation_path
    }

    /// Returns the curve of the signing key.
    pub fn curve(&self) -> SigningCurve {
        self.private_key.curve()
    }

    /// Returns the chain signature algorithm of the signing key.
    pub fn sign_algo(&self) -> SignAlgo {
        self.curve().sign_algo()
    }

    /// Returns the chain hash algorithm. Always SHA2-256.
    pub fn hash_algo(&self) -> HashAlgo {
        HashAlgo::Sha2_256
    }

    /// Returns the public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Returns the public key as 128 hex characters.
    pub fn public_key_hex(&self) -> String {
        self.public_key.to_hex()
    }

    /// Signs `SHA-256(message)` with the wallet key.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
        self.private_key.sign(message)
    }
}

// HdWallet does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use outblock_crypto::signing::verify;
    use outblock_types::config::DEFAULT_DERIVATION_PATH;
    use outblock_types::OutblockError;

    #[test]
    fn generated_wallet_is_secp256k1() -> std::result::Result<(), OutblockError> {
        let wallet = HdWallet::generate(12, DEFAULT_DERIVATION_PATH)?;
        assert_eq!(wallet.word_count(), 12);
        assert_eq!(wallet.curve(), SigningCurve::Secp256k1);
        assert_eq!(wallet.sign_algo(), SignAlgo::EcdsaSecp256k1);
        assert_eq!(wallet.public_key_hex().len(), 128);
        Ok(())
    }

    #[test]
    fn fifteen_words_select_p256() -> std::result::Result<(), OutblockError> {
        let wallet = HdWallet::generate(15, DEFAULT_DERIVATION_PATH)?;
        assert_eq!(wallet.curve(), SigningCurve::P256);
        assert_eq!(wallet.sign_algo(), SignAlgo::EcdsaP256);
        Ok(())
    }

    #[test]
    fn restore_yields_same_key() -> std::result::Result<(), OutblockError> {
        let wallet = HdWallet::generate(24, DEFAULT_DERIVATION_PATH)?;
        let restored = HdWallet::from_mnemonic(wallet.mnemonic(), DEFAULT_DERIVATION_PATH)?;
        assert_eq!(restored.public_key(), wallet.public_key());
        Ok(())
    }

    #[test]
    fn wallet_signature_verifies() -> std::result::Result<(), OutblockError> {
        let wallet = HdWallet::generate(12, DEFAULT_DERIVATION_PATH)?;
        let signature = wallet.sign(b"add key")?;
        verify(wallet.public_key(), b"add key", &signature)
    }

    #[test]
    fn invalid_phrase_rejected() {
        assert!(HdWallet::from_mnemonic("not a mnemonic", DEFAULT_DERIVATION_PATH).is_err());
    }
}
