//! SHA-256 hashing and Flow domain-separation tags.
//!
//! Flow prefixes every signed payload with a 32-byte domain tag so that a
//! signature over one kind of message can never be replayed as another.
//! The user-domain tag is used when proving control of a key to the
//! backend; the transaction-domain tag is used by chain transactions.

use sha2::{Digest, Sha256};

/// Byte length of a padded domain tag.
pub const DOMAIN_TAG_LEN: usize = 32;

/// Computes the SHA-256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Domain-separation tag prepended to signed payloads.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DomainTag {
    /// `"FLOW-V0.0-transaction"`.
    Transaction,
    /// `"FLOW-V0.0-user"`.
    User,
}

impl DomainTag {
    /// Returns the unpadded tag string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transaction => "FLOW-V0.0-transaction",
            Self::User => "FLOW-V0.0-user",
        }
    }

    /// Returns the tag right-padded with zero bytes to 32 bytes.
    pub fn tag_bytes(self) -> [u8; DOMAIN_TAG_LEN] {
        let mut out = [0u8; DOMAIN_TAG_LEN];
        let raw = self.as_str().as_bytes();
        out[..raw.len()].copy_from_slice(raw);
        out
    }

    /// Returns `tag_bytes() || message`.
    pub fn prefix(self, message: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(DOMAIN_TAG_LEN + message.len());
        out.extend_from_slice(&self.tag_bytes());
        out.extend_from_slice(message);
        out
    }
}

/// Builds the payload signed to prove key ownership for a backend user.
///
/// `USER tag || utf8(user_id)`.
pub fn user_id_message(user_id: &str) -> Vec<u8> {
    DomainTag::User.prefix(user_id.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
