//! BIP39 mnemonic generation, validation, and seed derivation.
//!
//! Word lists, checksums and PBKDF2 come from the `bip39` crate. This
//! module wraps them so that phrases and seeds never outlive their use:
//! both [`Mnemonic`] and [`Seed`] are zeroized on drop.

use outblock_types::{OutblockError, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Word counts accepted by BIP39.
pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

// ---------------------------------------------------------------------------
// Mnemonic
// ---------------------------------------------------------------------------

/// A validated BIP39 English mnemonic phrase.
///
/// The inner string is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic(String);

impl Mnemonic {
    /// Parses and validates a phrase.
    ///
    /// Whitespace between words is normalized to single spaces.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::CryptoError`] if a word is unknown, the
    /// word count is not a BIP39 length, or the checksum fails.
    pub fn from_phrase(phrase: &str) -> Result<Self> {
        let parsed = bip39::Mnemonic::parse_in_normalized(bip39::Language::English, phrase)
            .map_err(|e| OutblockError::CryptoError {
                reason: format!("invalid mnemonic: {e}"),
            })?;
        Ok(Self(parsed.to_string()))
    }

    /// Returns the phrase as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the individual words.
    pub fn words(&self) -> Vec<&str> {
        self.0.split_whitespace().collect()
    }

    /// Returns the number of words.
    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }

    /// Derives the 64-byte seed with an empty passphrase.
    pub fn to_seed(&self) -> Result<Seed> {
        mnemonic_to_seed(&self.0, "")
    }
}

// Mnemonic does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// A 64-byte seed derived from a mnemonic via PBKDF2-HMAC-SHA512.
///
/// Input to HD key derivation. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    /// Fixed byte length of a BIP39 seed.
    pub const LEN: usize = 64;

    /// Creates a [`Seed`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Returns the raw seed bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Generates a random English mnemonic with `word_count` words.
///
/// # Errors
///
/// Returns [`OutblockError::CryptoError`] if `word_count` is not one of
/// [`VALID_WORD_COUNTS`].
pub fn generate_mnemonic(word_count: usize) -> Result<Mnemonic> {
    if !VALID_WORD_COUNTS.contains(&word_count) {
        return Err(OutblockError::CryptoError {
            reason: format!("unsupported mnemonic length: {word_count} words"),
        });
    }
    let generated = bip39::Mnemonic::generate_in(bip39::Language::English, word_count)
        .map_err(|e| OutblockError::CryptoError {
            reason: format!("mnemonic generation failed: {e}"),
        })?;
    Ok(Mnemonic(generated.to_string()))
}

/// Validates a phrase against the English word list and its checksum.
pub fn validate_mnemonic(phrase: &str) -> Result<()> {
    Mnemonic::from_phrase(phrase).map(|_| ())
}

/// Derives the 64-byte BIP39 seed of `phrase` with `passphrase`.
///
/// # Errors
///
/// Returns [`OutblockError::CryptoError`] if the phrase is invalid.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Seed> {
    let parsed = bip39::Mnemonic::parse_in_normalized(bip39::Language::English, phrase)
        .map_err(|e| OutblockError::CryptoError {
            reason: format!("invalid mnemonic: {e}"),
        })?;
    Ok(Seed(parsed.to_seed_normalized(passphrase)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
