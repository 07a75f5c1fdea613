//! Multi-custodian backups for the Outblock wallet.
//!
//! - [`codec`] encrypts backup lists and merges items into them
//! - [`store`], [`session`] and [`providers`] talk to the custodians
//!   (Google Drive, iCloud, Dropbox, on-device phrase, passkey)
//! - [`env`] supplies the default backup password
//! - [`orchestrator`] creates backups and restores from two of them

pub mod codec;
pub mod env;
pub mod orchestrator;
pub mod providers;
pub mod session;
pub mod store;

pub use env::{PasswordProvider, StaticEnv};
pub use orchestrator::BackupOrchestrator;
pub use session::{LoginState, SessionGate};
pub use store::{BackupStore, StoreRegistry};
