//! Batch source and backup ledger files

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{AppliedBatch, BatchError};
use crate::shortcuts::ShortcutStore;

/// The pair of text files one batch run works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFiles {
    /// `title: url` lines still waiting to be imported
    pub source: PathBuf,
    /// Append-only record of every imported line
    pub ledger: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub store_saved: bool,
    pub ledger_lines: usize,
    pub remaining_lines: usize,
}

impl BatchFiles {
    pub fn new(source: impl Into<PathBuf>, ledger: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ledger: ledger.into(),
        }
    }

    pub fn read_source(&self) -> Result<String, BatchError> {
        fs::read_to_string(&self.source).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                BatchError::SourceMissing {
                    path: self.source.clone(),
                }
            } else {
                BatchError::Read {
                    path: self.source.clone(),
                    source,
                }
            }
        })
    }

    /// Persist an applied batch: save the store, append the ledger, then
    /// rewrite the source without the consumed lines.
    ///
    /// Steps run in that order and stop at the first failure. Steps that
    /// already succeeded are not rolled back; re-running the same batch
    /// afterwards recognises the entries that made it into the store.
    pub fn commit(
        &self,
        original_source: &str,
        applied: &AppliedBatch,
        store: &ShortcutStore,
        store_path: &Path,
    ) -> Result<CommitReport, BatchError> {
        let mut report = CommitReport::default();
        let consumed = applied.consumed_lines();
        if consumed.is_empty() {
            return Ok(report);
        }

        if applied.restart_needed() {
            store.save(store_path)?;
            report.store_saved = true;
        }

        let existing = read_ledger(&self.ledger)?;
        let recorded: HashSet<&str> = existing.lines().map(str::trim).collect();
        let ledger_lines = applied.ledger_lines(&recorded);
        write_ledger(&self.ledger, &existing, &ledger_lines)?;
        report.ledger_lines = ledger_lines.len();

        let remaining = remaining_source(original_source, &consumed);
        report.remaining_lines = remaining.lines().filter(|l| !l.trim().is_empty()).count();
        fs::write(&self.source, remaining).map_err(|source| BatchError::Write {
            path: self.source.clone(),
            source,
        })?;

        Ok(report)
    }
}

/// `original` minus every line whose trimmed text was consumed.
///
/// Kept lines retain their own whitespace and line endings.
pub fn remaining_source(original: &str, consumed: &HashSet<&str>) -> String {
    original
        .split_inclusive('\n')
        .filter(|line| !consumed.contains(line.trim()))
        .collect()
}

/// Append `lines` to the ledger, one per line, creating it if needed.
pub fn append_ledger(path: &Path, lines: &[&str]) -> Result<(), BatchError> {
    if lines.is_empty() {
        return Ok(());
    }
    let existing = read_ledger(path)?;
    write_ledger(path, &existing, lines)
}

/// Current ledger text; a missing ledger reads as empty.
fn read_ledger(path: &Path) -> Result<String, BatchError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(BatchError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_ledger(path: &Path, existing: &str, lines: &[&str]) -> Result<(), BatchError> {
    if lines.is_empty() {
        return Ok(());
    }

    let write_err = |source| BatchError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut out = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        out.push('\n');
    }
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;
    file.write_all(out.as_bytes()).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_source_keeps_other_lines_verbatim() {
        let original = "  Game A: http://x  \nGame B\n\n\tGame D: http://y\r\nGame E: http://z";
        let consumed: HashSet<&str> = ["Game A: http://x", "Game D: http://y"].into_iter().collect();
        assert_eq!(
            remaining_source(original, &consumed),
            "Game B\n\nGame E: http://z"
        );
    }

    #[test]
    fn remaining_source_drops_every_duplicate() {
        let original = "G: http://a\nH: http://b\nG: http://a\n";
        let consumed: HashSet<&str> = ["G: http://a"].into_iter().collect();
        assert_eq!(remaining_source(original, &consumed), "H: http://b\n");
    }

    #[test]
    fn ledger_appends_after_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batchbackup.txt");
        fs::write(&path, "Old: http://o\n").unwrap();

        append_ledger(&path, &["New: http://n", "Newer: http://m"]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Old: http://o\nNew: http://n\nNewer: http://m\n"
        );
    }

    #[test]
    fn ledger_never_glues_onto_unterminated_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batchbackup.txt");
        fs::write(&path, "Old: http://o").unwrap();

        append_ledger(&path, &["New: http://n"]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Old: http://o\nNew: http://n\n"
        );
    }

    #[test]
    fn ledger_is_created_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batchbackup.txt");
        append_ledger(&path, &["A: http://a"]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "A: http://a\n");
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let files = BatchFiles::new(dir.path().join("batchadd.txt"), dir.path().join("b.txt"));
        assert!(matches!(
            files.read_source(),
            Err(BatchError::SourceMissing { .. })
        ));
    }
}
