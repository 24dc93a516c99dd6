//! Steam non-Steam shortcut storage (`userdata/<id>/config/shortcuts.vdf`)

pub mod entry;
pub mod error;
pub mod store;
pub mod vdf;

pub use entry::Shortcut;
pub use error::StoreError;
pub use store::{LoadCondition, LoadOutcome, MergeReport, ShortcutStore, backup_path};
