use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::launch::{UserAgentOverride, WindowOptions};
use crate::paths;

/// User preferences, stored in `config.toml`.
///
/// Loaded once at startup and handed to whatever needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Browser used for new shortcuts ("Chrome" or "Edge")
    pub browser: String,
    /// Steam collection tag put on new shortcuts
    pub collection: String,
    /// Overrides the `--command=` value; defaults to the browser shortcut's executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_command: Option<String>,
    /// Explicit shortcuts.vdf location, bypassing Steam profile discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortcuts_path: Option<PathBuf>,
    pub batch_file: PathBuf,
    pub ledger_file: PathBuf,
    pub window: WindowOptions,
    pub user_agent_overrides: Vec<UserAgentOverride>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            browser: Self::DEFAULT_BROWSER.to_string(),
            collection: Self::DEFAULT_COLLECTION.to_string(),
            browser_command: None,
            shortcuts_path: None,
            batch_file: PathBuf::from("batchadd.txt"),
            ledger_file: PathBuf::from("batchbackup.txt"),
            window: WindowOptions::default(),
            user_agent_overrides: UserAgentOverride::defaults(),
        }
    }
}

impl Settings {
    pub const DEFAULT_BROWSER: &'static str = "Chrome";
    pub const DEFAULT_COLLECTION: &'static str = "GeForce Now";

    pub fn load() -> Result<Self> {
        Self::load_from_path(paths::settings_path()?)
    }

    /// Missing file means defaults; nothing is written until `save`.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("parsing settings at {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_path(paths::settings_path()?)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("serializing settings")?;
        fs::write(path, content)
            .with_context(|| format!("writing settings to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from_path(dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.browser, "Chrome");
        assert_eq!(settings.collection, "GeForce Now");
        assert!(!dir.path().join("config.toml").exists());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "browser = \"Edge\"\n\n[window]\nwidth = 1280\n").unwrap();

        let settings = Settings::load_from_path(&path).unwrap();
        assert_eq!(settings.browser, "Edge");
        assert_eq!(settings.collection, "GeForce Now");
        assert_eq!(settings.window.width, 1280);
        assert_eq!(settings.window.height, 640);
        assert_eq!(settings.user_agent_overrides, UserAgentOverride::defaults());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let settings = Settings {
            collection: "Cloud".to_string(),
            browser_command: Some("/app/bin/edge".to_string()),
            ..Settings::default()
        };
        settings.save_to_path(&path).unwrap();

        assert_eq!(Settings::load_from_path(&path).unwrap(), settings);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "browser = [").unwrap();
        assert!(Settings::load_from_path(&path).is_err());
    }
}
