//! HD wallets and the two-signer key rotation for the Outblock backup core.
//!
//! - [`hd_wallet`] creates and restores BIP39 wallets on either curve
//! - [`chain`], [`backend`], [`keystore`] and [`manager`] describe the
//!   external collaborators (chain RPC, backend API, secure key storage,
//!   session and wallet management) as async traits
//! - [`cosigner`] turns a recovered [`BackupItem`](outblock_types::BackupItem)
//!   into a transaction signer
//! - [`rotation`] combines two co-signers into a new full-weight account key

pub mod backend;
pub mod chain;
pub mod cosigner;
pub mod hd_wallet;
pub mod keystore;
pub mod manager;
pub mod rotation;

pub use cosigner::CoSigner;
pub use hd_wallet::HdWallet;
pub use rotation::{PendingRotation, QuorumKeyRotation, RotationOutcome};
