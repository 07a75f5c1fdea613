//! Secure key storage and session collaborators.
//!
//! The device key that replaces a lost primary key is created inside
//! platform secure storage. This crate only sees a handle and the public
//! half; the private half never leaves the store.

use async_trait::async_trait;
use outblock_types::{FlowAddress, HashAlgo, Result, SignAlgo};

/// Handle to a key held by a [`SecureKeyStore`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceKey {
    /// Store-specific identifier of the key.
    pub handle_id: String,
    /// Public key hex (uncompressed point without prefix).
    pub public_key: String,
    /// Signature scheme of the key.
    pub sign_algo: SignAlgo,
    /// Hash scheme of the key.
    pub hash_algo: HashAlgo,
}

/// Platform secure storage (e.g. a secure enclave).
#[async_trait]
pub trait SecureKeyStore: Send + Sync {
    /// Creates a new key that is not yet persisted.
    async fn generate_key(&self) -> Result<DeviceKey>;

    /// Persists `key` as the signing key of `user_id`.
    async fn persist(&self, key: &DeviceKey, user_id: &str) -> Result<()>;
}

/// Local user session.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Records `key` as the store user of `user_id` at `address`.
    async fn register_store_user(
        &self,
        user_id: &str,
        address: FlowAddress,
        key: &DeviceKey,
    ) -> Result<()>;

    /// Reloads the session of `user_id`.
    async fn restore_session(&self, user_id: &str) -> Result<()>;
}
