//! Wallet manager collaborator.

use std::sync::Arc;

use outblock_types::config::BackupConfig;
use outblock_types::{FlowAddress, Result};

use crate::chain::TransactionSigner;
use crate::hd_wallet::HdWallet;

/// Access to the user's primary wallet.
pub trait WalletManager: Send + Sync {
    /// Address of the primary wallet, if one exists.
    fn primary_wallet_address(&self) -> Option<FlowAddress>;

    /// Signer of the primary wallet's key.
    fn primary_signer(&self) -> Result<Arc<dyn TransactionSigner>>;

    /// Creates an HD wallet, restoring `mnemonic` when given.
    ///
    /// Without a mnemonic, a fresh phrase of
    /// `config.mnemonic_word_count` words is generated.
    fn create_hd_wallet(&self, mnemonic: Option<&str>, config: &BackupConfig) -> Result<HdWallet> {
        match mnemonic {
            Some(phrase) => HdWallet::from_mnemonic(phrase, &config.derivation_path),
            None => HdWallet::generate(config.mnemonic_word_count, &config.derivation_path),
        }
    }
}
