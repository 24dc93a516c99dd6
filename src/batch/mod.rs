//! Batch import of `title: url` lines into the shortcut store
//!
//! A run moves through explicit states:
//!
//! ```text
//! LoadedBatch --classify--> PreviewedBatch --apply--> AppliedBatch
//!                                          \--cancel--> CancelledBatch
//! ```
//!
//! Nothing touches the store or any file before `apply`, and `apply` works
//! on a copy of the store that only replaces the caller's store once every
//! line went in. Persisting the result is a separate step, see [`files`].

pub mod files;
pub mod parse;

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::launch::LaunchProfile;
use crate::shortcuts::{ShortcutStore, StoreError};

pub use files::{BatchFiles, CommitReport};
pub use parse::{AddableLine, SkipReason, SkippedLine, preview_label};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("batch file {} not found", path.display())]
    SourceMissing { path: PathBuf },

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

    #[error("could not add '{line}': {source}")]
    Insert {
        line: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raw lines read from the batch source, not yet classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedBatch {
    lines: Vec<String>,
}

impl LoadedBatch {
    pub fn load(text: &str) -> Self {
        Self {
            lines: parse::split_lines(text),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn classify(self) -> PreviewedBatch {
        let mut addable = Vec::new();
        let mut skipped = Vec::new();
        for line in &self.lines {
            match parse::classify_line(line) {
                Ok(line) => addable.push(line),
                Err(skip) => skipped.push(skip),
            }
        }
        PreviewedBatch { addable, skipped }
    }
}

/// Classified lines awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewedBatch {
    addable: Vec<AddableLine>,
    skipped: Vec<SkippedLine>,
}

impl PreviewedBatch {
    pub fn addable(&self) -> &[AddableLine] {
        &self.addable
    }

    pub fn skipped(&self) -> &[SkippedLine] {
        &self.skipped
    }

    /// Nothing to add; callers report "nothing to do" and touch no files.
    pub fn is_empty(&self) -> bool {
        self.addable.is_empty()
    }

    pub fn cancel(self) -> CancelledBatch {
        CancelledBatch {
            skipped: self.skipped,
            declined: self.addable,
        }
    }

    /// Insert every addable line, in input order, into `store`.
    ///
    /// Keys are allocated one at a time right before each insert. Lines whose
    /// title and launch options already exist in the store are counted as
    /// consumed without being inserted again, so a run interrupted after
    /// saving the store can be repeated safely. On error `store` is left
    /// exactly as it was.
    pub fn apply(
        self,
        store: &mut ShortcutStore,
        profile: &LaunchProfile,
    ) -> Result<AppliedBatch, BatchError> {
        let mut working = store.clone();
        let mut applied = Vec::new();
        let mut already_present = Vec::new();

        for line in self.addable {
            let shortcut = profile.shortcut_for(&line.title, &line.url);
            if working.contains_equivalent(&shortcut) {
                already_present.push(line);
                continue;
            }

            let key = working
                .add(shortcut)
                .map_err(|source| BatchError::Insert {
                    line: line.original.clone(),
                    source,
                })?;
            applied.push(AppliedLine { key, line });
        }

        *store = working;
        Ok(AppliedBatch {
            applied,
            already_present,
            skipped: self.skipped,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedLine {
    pub key: u32,
    #[serde(flatten)]
    pub line: AddableLine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedBatch {
    pub applied: Vec<AppliedLine>,
    pub already_present: Vec<AddableLine>,
    pub skipped: Vec<SkippedLine>,
}

impl AppliedBatch {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// Steam only picks up new shortcuts after a restart.
    pub fn restart_needed(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Original lines to drop from the source file.
    pub fn consumed_lines(&self) -> HashSet<&str> {
        self.applied
            .iter()
            .map(|a| a.line.original.as_str())
            .chain(self.already_present.iter().map(|l| l.original.as_str()))
            .collect()
    }

    /// Lines for the backup ledger: every applied line in application order,
    /// then already-present lines that `recorded` does not hold yet.
    ///
    /// The second group covers a run that saved the store but failed before
    /// its ledger append; those lines are consumed from the source now and
    /// must not vanish from both files.
    pub fn ledger_lines<'a>(&'a self, recorded: &HashSet<&str>) -> Vec<&'a str> {
        let mut lines: Vec<&str> = self
            .applied
            .iter()
            .map(|a| a.line.original.as_str())
            .collect();
        let mut seen: HashSet<&str> = lines.iter().copied().collect();
        for line in &self.already_present {
            let original = line.original.as_str();
            if !recorded.contains(original) && seen.insert(original) {
                lines.push(original);
            }
        }
        lines
    }
}

/// The operator declined; nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelledBatch {
    pub skipped: Vec<SkippedLine>,
    pub declined: Vec<AddableLine>,
}
