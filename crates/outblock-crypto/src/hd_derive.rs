//! BIP-32 / SLIP-0010 hierarchical deterministic key derivation.
//!
//! Derives secp256k1 or NIST P-256 private keys from a BIP39 seed. Both
//! hardened and normal child indices are supported.
//!
//! # Derivation path format
//!
//! ```text
//! m/44'/539'/0'/0/0
//! ```
//!
//! A trailing `'` or `h` marks a hardened index.
//!
//! Reference: <https://github.com/satoshilabs/slips/blob/master/slip-0010.md>

use hmac::{Hmac, Mac};
use outblock_types::{OutblockError, Result};
use sha2::Sha512;
use zeroize::{Zeroize, Zeroizing};

use crate::mnemonic::Seed;
use crate::signing::{compressed_public_key, is_valid_scalar, tweak_add, PrivateKey, SigningCurve};

/// HMAC-SHA512 type alias.
type HmacSha512 = Hmac<Sha512>;

/// The hardened index offset (0x80000000).
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Private key plus chain code at one node of the tree.
struct ExtendedKey {
    key: Zeroizing<[u8; 32]>,
    chain_code: Zeroizing<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derives the private key at `path` from a BIP39 seed.
///
/// # Errors
///
/// - [`OutblockError::ConfigError`] if the path is malformed.
/// - [`OutblockError::CryptoError`] if HMAC or point arithmetic fails.
pub fn derive_private_key(seed: &Seed, curve: SigningCurve, path: &str) -> Result<PrivateKey> {
    derive_from_seed_bytes(seed.as_bytes(), curve, path)
}

/// Derives the private key at `path` from raw seed bytes of any length.
pub fn derive_from_seed_bytes(seed: &[u8], curve: SigningCurve, path: &str) -> Result<PrivateKey> {
    let indices = parse_derivation_path(path)?;

    let mut node = master_key(curve, seed)?;
    for &index in &indices {
        node = derive_child(curve, &node, index)?;
    }

    PrivateKey::from_bytes(curve, &node.key)
}

/// Parses a derivation path into child indices.
///
/// Hardened components have [`HARDENED_OFFSET`] applied.
///
/// # Errors
///
/// Returns [`OutblockError::ConfigError`] if the path does not start with
/// `m`, has an empty or non-numeric component, or an index that does not
/// fit below the hardened offset.
pub fn parse_derivation_path(path: &str) -> Result<Vec<u32>> {
    let mut parts = path.split('/');

    if parts.next() != Some("m") {
        return Err(OutblockError::ConfigError {
            reason: format!("derivation path must start with 'm': {path}"),
        });
    }

    parts
        .map(|component| {
            let (digits, hardened) = match component
                .strip_suffix('\'')
                .or_else(|| component.strip_suffix('h'))
            {
                Some(d) => (d, true),
                None => (component, false),
            };

            let index: u32 = digits.parse().map_err(|_| OutblockError::ConfigError {
                reason: format!("invalid path component '{component}' in {path}"),
            })?;

            if index >= HARDENED_OFFSET {
                return Err(OutblockError::ConfigError {
                    reason: format!("path index {index} out of range in {path}"),
                });
            }

            Ok(if hardened { index | HARDENED_OFFSET } else { index })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Internal: master key
// ---------------------------------------------------------------------------

/// `I = HMAC-SHA512(curve key, seed)`; retried with `I` as data while
/// `IL` is not a valid scalar.
fn master_key(curve: SigningCurve, seed: &[u8]) -> Result<ExtendedKey> {
    let mut i = hmac_sha512(curve.seed_hmac_key(), seed)?;
    loop {
        let (il, ir) = split(&i);
        if is_valid_scalar(curve, &il) {
            i.zeroize();
            return Ok(ExtendedKey {
                key: il,
                chain_code: ir,
            });
        }
        let next = hmac_sha512(curve.seed_hmac_key(), &i)?;
        i.zeroize();
        i = next;
    }
}

// ---------------------------------------------------------------------------
// Internal: child derivation
// ---------------------------------------------------------------------------

/// Derives child `index` of `parent`.
///
/// Hardened data is `0x00 || k || ser32(i)`, normal data is
/// `compressed(K) || ser32(i)`. When `IL` is invalid or the child key is
/// zero, the data becomes `0x01 || IR || ser32(i)` and the step repeats.
fn derive_child(curve: SigningCurve, parent: &ExtendedKey, index: u32) -> Result<ExtendedKey> {
    let mut data = Zeroizing::new(Vec::with_capacity(37));
    if index & HARDENED_OFFSET != 0 {
        data.push(0x00);
        data.extend_from_slice(&parent.key[..]);
    } else {
        data.extend_from_slice(&compressed_public_key(curve, &parent.key)?);
    }
    data.extend_from_slice(&index.to_be_bytes());

    loop {
        let mut i = hmac_sha512(&parent.chain_code[..], &data)?;
        let (il, ir) = split(&i);
        i.zeroize();

        if let Some(child) = tweak_add(curve, &parent.key, &il) {
            return Ok(ExtendedKey {
                key: Zeroizing::new(child),
                chain_code: ir,
            });
        }

        data.clear();
        data.push(0x01);
        data.extend_from_slice(&ir[..]);
        data.extend_from_slice(&index.to_be_bytes());
    }
}

// ---------------------------------------------------------------------------
// Internal: HMAC-SHA512
// ---------------------------------------------------------------------------

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64]> {
    let mut mac = HmacSha512::new_from_slice(key).map_err(|e| OutblockError::CryptoError {
        reason: format!("HMAC-SHA512 key init failed: {e}"),
    })?;
    mac.update(data);
    let result = mac.finalize().into_bytes();

    let mut output = [0u8; 64];
    output.copy_from_slice(&result);
    Ok(output)
}

fn split(i: &[u8; 64]) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
    let mut left = Zeroizing::new([0u8; 32]);
    let mut right = Zeroizing::new([0u8; 32]);
    left.copy_from_slice(&i[..32]);
    right.copy_from_slice(&i[32..]);
    (left, right)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::mnemonic_to_seed;

    const TV1_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn tv1_key(path: &str) -> std::result::Result<String, Box<dyn std::error::Error>> {
        let seed = hex::decode(TV1_SEED)?;
        let key = derive_from_seed_bytes(&seed, SigningCurve::Secp256k1, path)?;
        Ok(hex::encode(key.as_bytes()))
    }

    /// BIP-32 test vector 1, chain m.
    #[test]
    fn bip32_tv1_master() -> std::result::Result<(), Box<dyn std::error::Error>> {
        assert_eq!(
            tv1_key("m")?,
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
        );
        Ok(())
    }

    /// BIP-32 test vector 1, chain m/0H.
    #[test]
    fn bip32_tv1_hardened_child() -> std::result::Result<(), Box<dyn std::error::Error>> {
        assert_eq!(
            tv1_key("m/0'")?,
            "edb2e14f9ee77d26dd93b4ecede8d16ed408ce149b6cd80b0715a2d911a0afea"
        );
        Ok(())
    }

    /// BIP-32 test vector 1, chain m/0H/1 (normal child).
    #[test]
    fn bip32_tv1_normal_child() -> std::result::Result<(), Box<dyn std::error::Error>> {
        assert_eq!(
            tv1_key("m/0h/1")?,
            "3c6cb8d0f6a264c91ea8b5030fadaa8e538b020f0a387421a12de9319dc93368"
        );
        Ok(())
    }

    #[test]
    fn derivation_is_deterministic() -> std::result::Result<(), OutblockError> {
        let seed = mnemonic_to_seed(
            "abandon abandon abandon abandon abandon abandon \
             abandon abandon abandon abandon abandon about",
            "",
        )?;
        for curve in [SigningCurve::Secp256k1, SigningCurve::P256] {
            let a = derive_private_key(&seed, curve, "m/44'/539'/0'/0/0")?;
            let b = derive_private_key(&seed, curve, "m/44'/539'/0'/0/0")?;
            assert_eq!(a.as_bytes(), b.as_bytes());

            let sibling = derive_private_key(&seed, curve, "m/44'/539'/0'/0/1")?;
            assert_ne!(a.as_bytes(), sibling.as_bytes());
        }
        Ok(())
    }

    #[test]
    fn curves_derive_different_keys() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let seed = hex::decode(TV1_SEED)?;
        let k1 = derive_from_seed_bytes(&seed, SigningCurve::Secp256k1, "m/0'")?;
        let r1 = derive_from_seed_bytes(&seed, SigningCurve::P256, "m/0'")?;
        assert_ne!(k1.as_bytes(), r1.as_bytes());
        Ok(())
    }

    #[test]
    fn parse_path_applies_hardened_offset() -> std::result::Result<(), OutblockError> {
        let indices = parse_derivation_path("m/44'/539'/0'/0/0")?;
        assert_eq!(
            indices,
            vec![44 | HARDENED_OFFSET, 539 | HARDENED_OFFSET, HARDENED_OFFSET, 0, 0]
        );
        assert!(parse_derivation_path("m")?.is_empty());
        Ok(())
    }

    #[test]
    fn parse_path_rejects_malformed() {
        assert!(parse_derivation_path("44'/0'").is_err());
        assert!(parse_derivation_path("m/").is_err());
        assert!(parse_derivation_path("m/abc").is_err());
        assert!(parse_derivation_path("m/2147483648").is_err());
    }
}
