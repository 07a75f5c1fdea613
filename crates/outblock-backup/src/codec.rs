//! Encrypted backup list envelope and its merge rules.
//!
//! A custodian file holds `hex(encrypt(json([BackupItem, ...])))`. Some
//! storage APIs hand the hex back wrapped in literal double quotes, so
//! decoding strips one leading and one trailing `"`.
//!
//! The list holds at most one item per `userId`: [`add_or_replace`] drops
//! a user's old entry before appending the new one.

use outblock_crypto::cipher::BackupPassword;
use outblock_types::{ActiveUser, BackupItem, OutblockError, Result};
use zeroize::Zeroizing;

/// Serializes, encrypts and hex-encodes `items`.
///
/// # Errors
///
/// Returns [`OutblockError::DecodingFailed`] if JSON encoding fails, or
/// the cipher's errors.
pub fn encrypt_list(items: &[BackupItem], password: &BackupPassword) -> Result<String> {
    let json = Zeroizing::new(serde_json::to_vec(items).map_err(|e| {
        OutblockError::DecodingFailed {
            reason: format!("failed to encode backup list: {e}"),
        }
    })?);
    password.encrypt_hex(&json)
}

/// Decodes an envelope produced by [`encrypt_list`].
///
/// # Errors
///
/// - [`OutblockError::HexDecodeFailed`] if the content is not hex.
/// - [`OutblockError::DecryptionFailed`] for a wrong password or
///   tampered data.
/// - [`OutblockError::DecodingFailed`] if the plaintext is not a JSON
///   array of items.
pub fn decrypt_list(content: &str, password: &BackupPassword) -> Result<Vec<BackupItem>> {
    let hex_data = strip_quotes(content.trim());
    let json = Zeroizing::new(password.decrypt_hex(hex_data)?);
    serde_json::from_slice(&json).map_err(|e| OutblockError::DecodingFailed {
        reason: format!("failed to decode backup list: {e}"),
    })
}

/// Replaces `user`'s entry with `item`.
///
/// Entries whose `userId` equals the active user's id are removed, then
/// `item` is appended. Applying it twice yields the same list.
///
/// # Errors
///
/// Returns [`OutblockError::MissingUser`] if the active user id is empty.
pub fn add_or_replace(
    mut list: Vec<BackupItem>,
    item: BackupItem,
    user: &ActiveUser,
) -> Result<Vec<BackupItem>> {
    if user.user_id.is_empty() {
        return Err(OutblockError::MissingUser);
    }
    list.retain(|existing| existing.user_id != user.user_id);
    list.push(item);
    Ok(list)
}

/// Removes the entries of `user`.
///
/// An entry is removed only when both `userId` and `userName` match.
pub fn remove_current_user(mut list: Vec<BackupItem>, user: &ActiveUser) -> Vec<BackupItem> {
    list.retain(|existing| !existing.belongs_to(user));
    list
}

/// Returns the entries of `user_id`.
pub fn items_for_user<'a>(list: &'a [BackupItem], user_id: &str) -> Vec<&'a BackupItem> {
    list.iter().filter(|item| item.user_id == user_id).collect()
}

fn strip_quotes(content: &str) -> &str {
    let content = content.strip_prefix('"').unwrap_or(content);
    content.strip_suffix('"').unwrap_or(content)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
