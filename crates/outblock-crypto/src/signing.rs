//! ECDSA signing over secp256k1 and NIST P-256.
//!
//! Flow accounts accept both curves. Keys are handled as raw 32-byte
//! scalars and zeroized on drop. Messages are hashed with SHA-256 before
//! signing. The signer produces `r || s || v`; the chain only takes the
//! 64-byte `r || s` prefix.
//!
//! Public keys are exchanged as the 64-byte uncompressed SEC1 point
//! without the leading `0x04`, hex-encoded.

use outblock_types::{OutblockError, Result, SignAlgo};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::{Field, PrimeField};

use crate::hash::sha256;

/// Byte length of a private scalar.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Byte length of a raw public key (`x || y`).
pub const PUBLIC_KEY_LEN: usize = 64;

/// Byte length of a compact signature (`r || s`).
pub const SIGNATURE_LEN: usize = 64;

/// Byte length of a recoverable signature (`r || s || v`).
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

// ---------------------------------------------------------------------------
// SigningCurve
// ---------------------------------------------------------------------------

/// Elliptic curve of a key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SigningCurve {
    /// secp256k1.
    Secp256k1,
    /// NIST P-256 (secp256r1).
    P256,
}

impl SigningCurve {
    /// Picks the curve for a wallet created from a mnemonic.
    ///
    /// 15-word phrases are P-256 wallets; every other length uses
    /// secp256k1.
    pub fn for_word_count(word_count: usize) -> Self {
        if word_count == 15 {
            Self::P256
        } else {
            Self::Secp256k1
        }
    }

    /// Returns the chain's algorithm code for this curve.
    pub fn sign_algo(self) -> SignAlgo {
        match self {
            Self::Secp256k1 => SignAlgo::EcdsaSecp256k1,
            Self::P256 => SignAlgo::EcdsaP256,
        }
    }

    /// Returns the curve used by `algo`.
    pub fn from_sign_algo(algo: SignAlgo) -> Self {
        match algo {
            SignAlgo::EcdsaSecp256k1 => Self::Secp256k1,
            SignAlgo::EcdsaP256 => Self::P256,
        }
    }

    /// HMAC key of the master-key step of HD derivation.
    pub(crate) fn seed_hmac_key(self) -> &'static [u8] {
        match self {
            Self::Secp256k1 => b"Bitcoin seed",
            Self::P256 => b"Nist256p1 seed",
        }
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// Uncompressed public key without the SEC1 `0x04` prefix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PublicKey {
    curve: SigningCurve,
    bytes: [u8; PUBLIC_KEY_LEN],
}

impl PublicKey {
    /// Parses a 128-character hex key.
    ///
    /// The point is checked to lie on `curve`.
    ///
    /// # Errors
    ///
    /// - [`OutblockError::HexDecodeFailed`] for malformed hex.
    /// - [`OutblockError::CryptoError`] for a wrong length or an invalid point.
    pub fn from_hex(curve: SigningCurve, hex_key: &str) -> Result<Self> {
        let raw = hex::decode(hex_key.trim_start_matches("0x")).map_err(|e| {
            OutblockError::HexDecodeFailed {
                reason: format!("invalid public key hex: {e}"),
            }
        })?;
        if raw.len() != PUBLIC_KEY_LEN {
            return Err(OutblockError::CryptoError {
                reason: format!(
                    "public key must be {PUBLIC_KEY_LEN} bytes, got {}",
                    raw.len()
                ),
            });
        }
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes.copy_from_slice(&raw);
        let key = Self { curve, bytes };
        // Reject points that are not on the curve.
        key.sec1_bytes_checked()?;
        Ok(key)
    }

    /// Returns the curve of this key.
    pub fn curve(&self) -> SigningCurve {
        self.curve
    }

    /// Returns the raw `x || y` bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.bytes
    }

    /// Returns the lowercase hex of `x || y`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    fn sec1_bytes(&self) -> [u8; PUBLIC_KEY_LEN + 1] {
        let mut out = [0u8; PUBLIC_KEY_LEN + 1];
        out[0] = 0x04;
        out[1..].copy_from_slice(&self.bytes);
        out
    }

    fn sec1_bytes_checked(&self) -> Result<()> {
        let sec1 = self.sec1_bytes();
        let valid = match self.curve {
            SigningCurve::Secp256k1 => k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).is_ok(),
            SigningCurve::P256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).is_ok(),
        };
        if valid {
            Ok(())
        } else {
            Err(OutblockError::CryptoError {
                reason: "public key is not a valid curve point".into(),
            })
        }
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// A 32-byte private scalar on a [`SigningCurve`].
///
/// The scalar is zeroized on drop.
pub struct PrivateKey {
    curve: SigningCurve,
    bytes: Zeroizing<[u8; PRIVATE_KEY_LEN]>,
}

impl PrivateKey {
    /// Wraps an existing scalar.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::CryptoError`] if the scalar is zero or not
    /// below the curve order.
    pub fn from_bytes(curve: SigningCurve, bytes: &[u8; PRIVATE_KEY_LEN]) -> Result<Self> {
        if !is_valid_scalar(curve, bytes) {
            return Err(OutblockError::CryptoError {
                reason: "private key is not a valid scalar".into(),
            });
        }
        Ok(Self {
            curve,
            bytes: Zeroizing::new(*bytes),
        })
    }

    /// Generates a random key from OS entropy.
    pub fn generate(curve: SigningCurve) -> Self {
        let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        match curve {
            SigningCurve::Secp256k1 => {
                let secret = k256::SecretKey::random(&mut OsRng);
                bytes.copy_from_slice(&secret.to_bytes());
            }
            SigningCurve::P256 => {
                let secret = p256::SecretKey::random(&mut OsRng);
                bytes.copy_from_slice(&secret.to_bytes());
            }
        }
        Self { curve, bytes }
    }

    /// Returns the curve of this key.
    pub fn curve(&self) -> SigningCurve {
        self.curve
    }

    /// Returns the raw scalar bytes.
    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.bytes
    }

    /// Returns the matching public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        let point = uncompressed_point(self.curve, &self.bytes)?;
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes.copy_from_slice(&point[1..]);
        Ok(PublicKey {
            curve: self.curve,
            bytes,
        })
    }

    /// Signs `SHA-256(message)` and returns the compact `r || s` form.
    ///
    /// The recovery byte of [`sign_recoverable`](Self::sign_recoverable)
    /// is dropped.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
        let recoverable = self.sign_recoverable(&sha256(message))?;
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&recoverable[..SIGNATURE_LEN]);
        Ok(out)
    }

    /// Signs a 32-byte digest and returns `r || s || v`.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::CryptoError`] if the signer rejects the key
    /// or digest.
    pub fn sign_recoverable(&self, digest: &[u8; 32]) -> Result<[u8; RECOVERABLE_SIGNATURE_LEN]> {
        let mut out = [0u8; RECOVERABLE_SIGNATURE_LEN];
        match self.curve {
            SigningCurve::Secp256k1 => {
                let key = k256::ecdsa::SigningKey::from_slice(&self.bytes[..])
                    .map_err(crypto_error("invalid secp256k1 signing key"))?;
                let (signature, recovery_id) = key
                    .sign_prehash_recoverable(digest)
                    .map_err(crypto_error("secp256k1 signing failed"))?;
                out[..SIGNATURE_LEN].copy_from_slice(&signature.to_bytes());
                out[SIGNATURE_LEN] = recovery_id.to_byte();
            }
            SigningCurve::P256 => {
                let key = p256::ecdsa::SigningKey::from_slice(&self.bytes[..])
                    .map_err(crypto_error("invalid P-256 signing key"))?;
                let (signature, recovery_id) = key
                    .sign_prehash_recoverable(digest)
                    .map_err(crypto_error("P-256 signing failed"))?;
                out[..SIGNATURE_LEN].copy_from_slice(&signature.to_bytes());
                out[SIGNATURE_LEN] = recovery_id.to_byte();
            }
        }
        Ok(out)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("curve", &self.curve)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verifies a compact signature over `SHA-256(message)`.
///
/// # Errors
///
/// Returns [`OutblockError::CryptoError`] if the signature is malformed
/// or does not verify.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let digest = sha256(message);
    let sec1 = public_key.sec1_bytes();
    match public_key.curve {
        SigningCurve::Secp256k1 => {
            let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                .map_err(crypto_error("invalid secp256k1 public key"))?;
            let sig = k256::ecdsa::Signature::from_slice(signature)
                .map_err(crypto_error("malformed secp256k1 signature"))?;
            key.verify_prehash(&digest, &sig)
                .map_err(crypto_error("secp256k1 signature verification failed"))
        }
        SigningCurve::P256 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                .map_err(crypto_error("invalid P-256 public key"))?;
            let sig = p256::ecdsa::Signature::from_slice(signature)
                .map_err(crypto_error("malformed P-256 signature"))?;
            key.verify_prehash(&digest, &sig)
                .map_err(crypto_error("P-256 signature verification failed"))
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar helpers (used by HD derivation)
// ---------------------------------------------------------------------------

/// Returns `true` if `bytes` is a non-zero scalar below the curve order.
pub(crate) fn is_valid_scalar(curve: SigningCurve, bytes: &[u8; 32]) -> bool {
    match curve {
        SigningCurve::Secp256k1 => k256_scalar(bytes).is_some_and(|s| !bool::from(s.is_zero())),
        SigningCurve::P256 => p256_scalar(bytes).is_some_and(|s| !bool::from(s.is_zero())),
    }
}

/// Computes `(key + tweak) mod n`.
///
/// Returns `None` if `tweak` is not below the order or the sum is zero.
pub(crate) fn tweak_add(curve: SigningCurve, key: &[u8; 32], tweak: &[u8; 32]) -> Option<[u8; 32]> {
    let mut out = [0u8; 32];
    match curve {
        SigningCurve::Secp256k1 => {
            let sum = k256_scalar(key)? + k256_scalar(tweak)?;
            if bool::from(sum.is_zero()) {
                return None;
            }
            out.copy_from_slice(&sum.to_repr());
        }
        SigningCurve::P256 => {
            let sum = p256_scalar(key)? + p256_scalar(tweak)?;
            if bool::from(sum.is_zero()) {
                return None;
            }
            out.copy_from_slice(&sum.to_repr());
        }
    }
    Some(out)
}

/// Returns the 33-byte compressed SEC1 public key of a private scalar.
pub(crate) fn compressed_public_key(curve: SigningCurve, key: &[u8; 32]) -> Result<[u8; 33]> {
    let mut out = [0u8; 33];
    match curve {
        SigningCurve::Secp256k1 => {
            let secret = k256::SecretKey::from_slice(key)
                .map_err(crypto_error("invalid secp256k1 private key"))?;
            out.copy_from_slice(secret.public_key().to_encoded_point(true).as_bytes());
        }
        SigningCurve::P256 => {
            let secret = p256::SecretKey::from_slice(key)
                .map_err(crypto_error("invalid P-256 private key"))?;
            out.copy_from_slice(secret.public_key().to_encoded_point(true).as_bytes());
        }
    }
    Ok(out)
}

fn uncompressed_point(curve: SigningCurve, key: &[u8; 32]) -> Result<[u8; 65]> {
    let mut out = [0u8; 65];
    match curve {
        SigningCurve::Secp256k1 => {
            let secret = k256::SecretKey::from_slice(key)
                .map_err(crypto_error("invalid secp256k1 private key"))?;
            out.copy_from_slice(secret.public_key().to_encoded_point(false).as_bytes());
        }
        SigningCurve::P256 => {
            let secret = p256::SecretKey::from_slice(key)
                .map_err(crypto_error("invalid P-256 private key"))?;
            out.copy_from_slice(secret.public_key().to_encoded_point(false).as_bytes());
        }
    }
    Ok(out)
}

fn k256_scalar(bytes: &[u8; 32]) -> Option<k256::Scalar> {
    Option::from(k256::Scalar::from_repr(*k256::FieldBytes::from_slice(bytes)))
}

fn p256_scalar(bytes: &[u8; 32]) -> Option<p256::Scalar> {
    Option::from(p256::Scalar::from_repr(*p256::FieldBytes::from_slice(bytes)))
}

fn crypto_error<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> OutblockError {
    move |e| OutblockError::CryptoError {
        reason: format!("{context}: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
