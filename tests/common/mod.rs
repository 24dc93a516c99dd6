use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use kioskcut::batch::BatchFiles;
use kioskcut::launch::{BrowserDescriptor, LaunchProfile, UserAgentOverride, WindowOptions};
use kioskcut::shortcuts::{Shortcut, ShortcutStore};

pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// shortcuts.vdf laid out like a Steam userdata profile
    pub fn store_path(&self) -> PathBuf {
        self.path().join("userdata/12345/config/shortcuts.vdf")
    }

    pub fn batch_files(&self) -> BatchFiles {
        BatchFiles::new(
            self.path().join("batchadd.txt"),
            self.path().join("batchbackup.txt"),
        )
    }

    /// Write a store holding a Chrome shortcut plus one unrelated game.
    pub fn seed_store(&self) -> Result<ShortcutStore> {
        let mut store = ShortcutStore::new();
        store.add(Shortcut::new(
            "Google Chrome",
            "\"/usr/bin/flatpak\"",
            "\"/usr/bin/\"",
            "run --branch=stable --arch=x86_64 --command=/app/bin/chrome com.google.Chrome",
        ))?;
        store.add(Shortcut::new("Celeste", "\"/games/celeste\"", "\"/games\"", "").with_tags(["Indie"]))?;
        store.save(&self.store_path())?;
        Ok(store)
    }

    pub fn write(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content)?;
        Ok(())
    }

    pub fn read(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }
}

pub fn chrome_profile(store: &ShortcutStore) -> Result<LaunchProfile> {
    let chrome = kioskcut::launch::known_browser("Chrome").expect("Chrome is a known browser");
    Ok(LaunchProfile {
        browser: BrowserDescriptor::resolve(chrome, store)?,
        browser_command: None,
        window: WindowOptions::default(),
        user_agent_overrides: UserAgentOverride::defaults(),
        collection: "GeForce Now".to_string(),
    })
}
