//! Cryptographic primitives for the Outblock multi-backup key core.
//!
//! This crate is the **sole** location for all cryptographic operations.
//! No other crate in the workspace may perform raw crypto directly.
//!
//! # Modules
//!
//! - [`cipher`]: AES-GCM backup cipher and password/IV derivation
//! - [`hash`]: SHA-256 and chain domain tags
//! - [`mnemonic`]: BIP39 mnemonic generation, validation, seed derivation
//! - [`hd_derive`]: BIP32 / SLIP-0010 derivation for secp256k1 and P-256
//! - [`signing`]: ECDSA keys, recoverable signing, verification

pub mod cipher;
pub mod hash;
pub mod hd_derive;
pub mod mnemonic;
pub mod signing;
