use std::path::PathBuf;

use thiserror::Error;

use super::vdf::VdfError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("shortcut store is corrupt: {0}")]
    CorruptInput(#[from] VdfError),

    #[error("shortcut store has no `shortcuts` map at its root")]
    MissingRoot,

    #[error("no shortcut whose name contains '{needle}'; add it to Steam as a non-Steam game first")]
    MissingReference { needle: String },

    #[error("shortcut key {key} is already in use")]
    DuplicateKey { key: u32 },

    #[error("no shortcut key left after {}", u32::MAX)]
    KeysExhausted,

    #[error("shortcut field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Conditions the caller recovers from by continuing with an empty store.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::CorruptInput(_) | StoreError::MissingRoot)
    }
}
