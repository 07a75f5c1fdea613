//! Custodian adapters.
//!
//! Each adapter wraps a platform SDK, modelled as an async trait so the
//! host app injects the real client and tests inject fakes.

pub mod dropbox;
pub mod google;
pub mod icloud;
pub mod passkey;
pub mod phrase;

pub use dropbox::{DropboxApi, DropboxStore};
pub use google::{GoogleDriveApi, GoogleDriveStore, DRIVE_APP_DATA_SCOPE};
pub use icloud::{ICloudStore, UbiquityContainer};
pub use passkey::PasskeyStore;
pub use phrase::PhraseStore;
