use std::fs;
use std::io::Write;
use std::path::Path;

use super::entry::Shortcut;
use super::error::StoreError;
use super::vdf::{self, VdfNode, VdfValue};

const ROOT_KEY: &str = "shortcuts";

/// How the backing file looked when it was loaded
#[derive(Debug)]
pub enum LoadCondition {
    /// File was missing or empty; starting fresh is normal on first run
    Fresh,
    Loaded,
    /// File existed but could not be parsed; the store starts empty
    Corrupt(StoreError),
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub store: ShortcutStore,
    pub condition: LoadCondition,
}

/// Result of merging another store into this one
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: Vec<u32>,
    pub skipped: Vec<String>,
}

/// In-memory copy of a `shortcuts.vdf` file.
///
/// Entries keep file order. Children of the root map that are not numbered
/// shortcut maps are carried along untouched and written after the entries.
/// Top-level nodes beside the root, and the root's own spelling, are kept
/// when the file had them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShortcutStore {
    entries: Vec<Shortcut>,
    foreign: Vec<VdfNode>,
    layout: Option<DocumentLayout>,
}

/// Top-level nodes of a document that is not a lone `shortcuts` map.
/// The node at `root` is a placeholder refilled on encode.
#[derive(Debug, Clone, PartialEq)]
struct DocumentLayout {
    nodes: Vec<VdfNode>,
    root: usize,
}

impl ShortcutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shortcut> {
        self.entries.iter()
    }

    pub fn get(&self, key: u32) -> Option<&Shortcut> {
        self.entries.iter().find(|s| s.key == key)
    }

    pub fn keys(&self) -> Vec<u32> {
        self.entries.iter().map(|s| s.key).collect()
    }

    /// Decode a store from raw file bytes.
    ///
    /// Empty input is an empty store. Anything that is not a binary VDF
    /// document with a `shortcuts` map at its root is an error; callers that
    /// want the "continue with an empty store" behaviour use [`Self::load`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, StoreError> {
        let document = vdf::read_document(data)?;
        if document.is_empty() {
            return Ok(Self::new());
        }

        let root_index = document
            .iter()
            .position(|node| node.key.eq_ignore_ascii_case(ROOT_KEY))
            .ok_or(StoreError::MissingRoot)?;
        let root = document[root_index]
            .value
            .as_map()
            .ok_or(StoreError::MissingRoot)?;

        let mut store = Self::new();
        if document.len() > 1 || document[root_index].key != ROOT_KEY {
            let mut nodes = document.clone();
            nodes[root_index].value = VdfValue::Map(Vec::new());
            store.layout = Some(DocumentLayout {
                nodes,
                root: root_index,
            });
        }
        for child in root {
            match (child.key.parse::<u32>(), &child.value) {
                (Ok(key), VdfValue::Map(fields)) if !store.key_in_use(key) => {
                    store.entries.push(Shortcut::from_fields(key, fields));
                }
                _ => store.foreign.push(child.clone()),
            }
        }

        Ok(store)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut children: Vec<VdfNode> = self.entries.iter().map(Shortcut::to_node).collect();
        children.extend(self.foreign.iter().cloned());

        match &self.layout {
            Some(layout) => {
                let mut nodes = layout.nodes.clone();
                if let Some(root) = nodes.get_mut(layout.root) {
                    root.value = VdfValue::Map(children);
                }
                vdf::write_document(&nodes)
            }
            None => vdf::write_document(&[VdfNode::map(ROOT_KEY, children)]),
        }
    }

    /// Read the backing file, falling back to an empty store when it is
    /// missing, empty or corrupt. Only I/O failures other than "not found"
    /// are returned as errors.
    pub fn load(path: &Path) -> Result<LoadOutcome, StoreError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if data.is_empty() {
            return Ok(LoadOutcome {
                store: Self::new(),
                condition: LoadCondition::Fresh,
            });
        }

        match Self::from_bytes(&data) {
            Ok(store) => Ok(LoadOutcome {
                store,
                condition: LoadCondition::Loaded,
            }),
            Err(e) if e.is_recoverable() => Ok(LoadOutcome {
                store: Self::new(),
                condition: LoadCondition::Corrupt(e),
            }),
            Err(e) => Err(e),
        }
    }

    /// Write the whole store to `path`.
    ///
    /// An existing file is copied to `<name>.bak` first. The new content goes
    /// to a temporary file in the same directory which is then renamed over
    /// the target, so readers never see a half-written store.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        let data = self.to_bytes();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        if path.exists() {
            fs::copy(path, backup_path(path)).map_err(write_err)?;
        }

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&data).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    /// Case-insensitive substring search over display names.
    ///
    /// Linear scan in store order; the first hit wins even if later entries
    /// match more closely.
    pub fn find_by_name_contains(&self, needle: &str) -> Result<&Shortcut, StoreError> {
        let needle_lower = needle.to_lowercase();
        self.entries
            .iter()
            .find(|s| s.display_name.to_lowercase().contains(&needle_lower))
            .ok_or_else(|| StoreError::MissingReference {
                needle: needle.to_string(),
            })
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Shortcut> {
        self.entries.iter().find(|s| s.display_name == name)
    }

    /// Whether an entry with the same name, executable and launch options exists.
    pub fn contains_equivalent(&self, shortcut: &Shortcut) -> bool {
        self.entries.iter().any(|s| {
            s.display_name == shortcut.display_name
                && s.executable_path == shortcut.executable_path
                && s.launch_arguments == shortcut.launch_arguments
        })
    }

    /// Next free key: one past the largest numeric key under the root, or 0
    /// when there is none. Numbered children that are not shortcut entries
    /// count too.
    ///
    /// Nothing is reserved; insert the entry before allocating again.
    pub fn allocate_key(&self) -> Result<u32, StoreError> {
        match self.numeric_keys().max() {
            None => Ok(0),
            Some(max) => max.checked_add(1).ok_or(StoreError::KeysExhausted),
        }
    }

    fn numeric_keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|s| s.key).chain(
            self.foreign
                .iter()
                .filter_map(|node| node.key.parse::<u32>().ok()),
        )
    }

    fn key_in_use(&self, key: u32) -> bool {
        self.numeric_keys().any(|k| k == key)
    }

    pub fn insert(&mut self, shortcut: Shortcut) -> Result<(), StoreError> {
        validate(&shortcut)?;
        if self.key_in_use(shortcut.key) {
            return Err(StoreError::DuplicateKey { key: shortcut.key });
        }
        self.entries.push(shortcut);
        Ok(())
    }

    /// Allocate a key for `shortcut` and insert it, returning the key.
    pub fn add(&mut self, mut shortcut: Shortcut) -> Result<u32, StoreError> {
        shortcut.key = self.allocate_key()?;
        let key = shortcut.key;
        self.insert(shortcut)?;
        Ok(key)
    }

    /// Append every entry of `other` that has no equivalent here yet.
    pub fn merge(&mut self, other: &ShortcutStore) -> Result<MergeReport, StoreError> {
        let mut report = MergeReport::default();
        for shortcut in other.iter() {
            if self.contains_equivalent(shortcut) {
                report.skipped.push(shortcut.display_name.clone());
                continue;
            }
            let key = self.add(shortcut.clone())?;
            report.inserted.push(key);
        }
        Ok(report)
    }
}

pub fn backup_path(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

fn validate(shortcut: &Shortcut) -> Result<(), StoreError> {
    if shortcut.display_name.trim().is_empty() {
        return Err(StoreError::InvalidField {
            field: "AppName",
            reason: "must not be empty".to_string(),
        });
    }

    for (field, value) in shortcut.text_fields() {
        if value.contains('\0') {
            return Err(StoreError::InvalidField {
                field,
                reason: "contains a NUL byte".to_string(),
            });
        }
    }

    if shortcut.tags.iter().any(|t| t.contains('\0')) {
        return Err(StoreError::InvalidField {
            field: "tags",
            reason: "contains a NUL byte".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browser_store() -> ShortcutStore {
        let mut store = ShortcutStore::new();
        store
            .add(Shortcut::new(
                "Google Chrome",
                "\"/usr/bin/flatpak\"",
                "\"/usr/bin\"",
                "run com.google.Chrome",
            ))
            .unwrap();
        store
    }

    #[test]
    fn roundtrip_empty() {
        let store = ShortcutStore::new();
        let parsed = ShortcutStore::from_bytes(&store.to_bytes()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn roundtrip_multiple_shortcuts() {
        let mut store = browser_store();
        let mut game = Shortcut::new("Game2", "/bin/g2", "/home", "--opt").with_tags(["b", "a"]);
        game.is_hidden = 1;
        game.allow_overlay = 0;
        store.add(game).unwrap();

        let parsed = ShortcutStore::from_bytes(&store.to_bytes()).unwrap();
        assert_eq!(parsed, store);
        assert_eq!(parsed.get(1).unwrap().tags, vec!["b", "a"]);
    }

    #[test]
    fn encoding_is_stable() {
        let store = browser_store();
        let bytes = store.to_bytes();
        let again = ShortcutStore::from_bytes(&bytes).unwrap().to_bytes();
        assert_eq!(bytes, again);
    }

    #[test]
    fn empty_bytes_are_an_empty_store() {
        assert!(ShortcutStore::from_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = ShortcutStore::from_bytes(b"not a vdf file").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn wrong_root_is_corrupt() {
        let bytes = vdf::write_document(&[VdfNode::map("games", vec![])]);
        let err = ShortcutStore::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, StoreError::MissingRoot));
    }

    #[test]
    fn foreign_children_are_preserved() {
        let bytes = vdf::write_document(&[VdfNode::map(
            "shortcuts",
            vec![
                Shortcut::new("A", "", "", "").to_node(),
                VdfNode::string("note", "keep me"),
                VdfNode::map("abc", vec![]),
            ],
        )]);
        let mut store = ShortcutStore::from_bytes(&bytes).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.to_bytes(), bytes);

        store.add(Shortcut::new("B", "", "", "")).unwrap();
        let reparsed = ShortcutStore::from_bytes(&store.to_bytes()).unwrap();
        assert_eq!(reparsed, store);
    }

    #[test]
    fn keys_are_dense_from_zero() {
        let mut store = ShortcutStore::new();
        for i in 0..5 {
            store
                .add(Shortcut::new(&format!("Game {i}"), "", "", ""))
                .unwrap();
        }
        assert_eq!(store.keys(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn allocate_key_skips_past_gaps() {
        let mut store = ShortcutStore::new();
        for key in [0, 2, 5] {
            let mut s = Shortcut::new("Game", "", "", "");
            s.key = key;
            store.insert(s).unwrap();
        }
        assert_eq!(store.allocate_key().unwrap(), 6);
    }

    #[test]
    fn numbered_foreign_children_are_not_reused() {
        let bytes = vdf::write_document(&[VdfNode::map(
            "shortcuts",
            vec![
                Shortcut::new("A", "", "", "").to_node(),
                VdfNode::string("1", "not a shortcut"),
            ],
        )]);
        let mut store = ShortcutStore::from_bytes(&bytes).unwrap();
        assert_eq!(store.keys(), vec![0]);
        assert_eq!(store.allocate_key().unwrap(), 2);

        let mut clash = Shortcut::new("B", "", "", "");
        clash.key = 1;
        assert!(matches!(
            store.insert(clash),
            Err(StoreError::DuplicateKey { key: 1 })
        ));

        assert_eq!(store.add(Shortcut::new("B", "", "", "")).unwrap(), 2);
        let root = vdf::read_document(&store.to_bytes()).unwrap();
        let keys: Vec<&str> = root[0]
            .value
            .as_map()
            .unwrap()
            .iter()
            .map(|n| n.key.as_str())
            .collect();
        assert_eq!(keys, vec!["0", "2", "1"]);
    }

    #[test]
    fn repeated_entry_key_is_kept_as_foreign() {
        let mut first = Shortcut::new("A", "", "", "");
        first.key = 3;
        let mut second = Shortcut::new("B", "", "", "");
        second.key = 3;
        let bytes = vdf::write_document(&[VdfNode::map(
            "shortcuts",
            vec![first.to_node(), second.to_node()],
        )]);

        let store = ShortcutStore::from_bytes(&bytes).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.allocate_key().unwrap(), 4);
        assert_eq!(store.to_bytes(), bytes);
    }

    #[test]
    fn largest_key_cannot_be_followed() {
        let mut last = Shortcut::new("Last", "", "", "");
        last.key = u32::MAX;
        let bytes = vdf::write_document(&[VdfNode::map("shortcuts", vec![last.to_node()])]);

        let mut store = ShortcutStore::from_bytes(&bytes).unwrap();
        assert!(matches!(store.allocate_key(), Err(StoreError::KeysExhausted)));
        assert!(matches!(
            store.add(Shortcut::new("Next", "", "", "")),
            Err(StoreError::KeysExhausted)
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn root_spelling_and_sibling_nodes_survive() {
        let bytes = vdf::write_document(&[
            VdfNode::string("version", "2"),
            VdfNode::map("Shortcuts", vec![Shortcut::new("A", "", "", "").to_node()]),
            VdfNode::map("extra", vec![VdfNode::int("n", 7)]),
        ]);
        let mut store = ShortcutStore::from_bytes(&bytes).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.to_bytes(), bytes);

        store.add(Shortcut::new("B", "", "", "")).unwrap();
        let document = vdf::read_document(&store.to_bytes()).unwrap();
        let top: Vec<&str> = document.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(top, vec!["version", "Shortcuts", "extra"]);
        assert_eq!(document[1].value.as_map().unwrap().len(), 2);
    }

    #[test]
    fn insert_rejects_duplicate_key() {
        let mut store = browser_store();
        let err = store.insert(Shortcut::new("Other", "", "", "")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { key: 0 }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn insert_rejects_empty_name_and_nul() {
        let mut store = ShortcutStore::new();
        assert!(matches!(
            store.add(Shortcut::new("  ", "", "", "")),
            Err(StoreError::InvalidField { field: "AppName", .. })
        ));
        assert!(matches!(
            store.add(Shortcut::new("Game", "", "", "a\0b")),
            Err(StoreError::InvalidField {
                field: "LaunchOptions",
                ..
            })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn find_by_name_contains_is_case_insensitive_first_match() {
        let mut store = browser_store();
        store
            .add(Shortcut::new("Chrome Beta", "/other", "/", ""))
            .unwrap();

        let found = store.find_by_name_contains("chrome").unwrap();
        assert_eq!(found.key, 0);
        assert_eq!(found.executable_path, "\"/usr/bin/flatpak\"");
    }

    #[test]
    fn find_by_name_contains_reports_missing_reference() {
        let store = browser_store();
        let err = store.find_by_name_contains("Edge").unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { ref needle } if needle == "Edge"));
    }

    #[test]
    fn merge_skips_equivalent_entries() {
        let mut store = browser_store();
        let mut other = browser_store();
        other.add(Shortcut::new("New Game", "/bin/x", "/", "")).unwrap();

        let report = store.merge(&other).unwrap();
        assert_eq!(report.inserted, vec![1]);
        assert_eq!(report.skipped, vec!["Google Chrome"]);
        assert_eq!(store.get(1).unwrap().display_name, "New Game");
    }

    #[test]
    fn load_missing_file_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = ShortcutStore::load(&dir.path().join("shortcuts.vdf")).unwrap();
        assert!(outcome.store.is_empty());
        assert!(matches!(outcome.condition, LoadCondition::Fresh));
    }

    #[test]
    fn load_empty_file_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shortcuts.vdf");
        fs::write(&path, b"").unwrap();
        let outcome = ShortcutStore::load(&path).unwrap();
        assert!(outcome.store.is_empty());
        assert!(matches!(outcome.condition, LoadCondition::Fresh));
    }

    #[test]
    fn load_corrupt_file_is_empty_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shortcuts.vdf");
        fs::write(&path, b"\x00shortcuts\x00\x01AppName\x00oops").unwrap();
        let outcome = ShortcutStore::load(&path).unwrap();
        assert!(outcome.store.is_empty());
        assert!(matches!(outcome.condition, LoadCondition::Corrupt(_)));
    }

    #[test]
    fn save_writes_backup_and_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("shortcuts.vdf");

        let mut store = browser_store();
        store.save(&path).unwrap();
        let first = fs::read(&path).unwrap();
        assert!(!backup_path(&path).exists());

        store.add(Shortcut::new("Game", "", "", "")).unwrap();
        store.save(&path).unwrap();

        assert_eq!(fs::read(backup_path(&path)).unwrap(), first);
        let reloaded = ShortcutStore::load(&path).unwrap();
        assert!(matches!(reloaded.condition, LoadCondition::Loaded));
        assert_eq!(reloaded.store, store);
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/a/shortcuts.vdf")),
            Path::new("/a/shortcuts.vdf.bak")
        );
    }
}
