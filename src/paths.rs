use anyhow::{Context, Result, anyhow, bail};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Get the kioskcut config directory
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("kioskcut"))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Steam userdata directories (one per logged-in account) under `home`
pub fn find_steam_userdata_dirs(home: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    let candidates = [
        home.join(".local/share/Steam/userdata"),
        home.join(".steam/steam/userdata"),
        home.join(".var/app/com.valvesoftware.Steam/.local/share/Steam/userdata"),
    ];

    for base in &candidates {
        if base.is_dir()
            && let Ok(entries) = std::fs::read_dir(base)
        {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir()
                    && let Some(name) = path.file_name().and_then(|n| n.to_str())
                    && name.chars().all(|c| c.is_ascii_digit())
                    // "0" is the anonymous placeholder account
                    && name != "0"
                {
                    dirs.push(path);
                }
            }
        }
    }

    // ~/.steam/steam is usually a symlink to ~/.local/share/Steam
    let mut seen = HashSet::new();
    dirs.retain(|dir| seen.insert(dir.canonicalize().unwrap_or_else(|_| dir.clone())));
    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));

    dirs
}

pub fn shortcuts_vdf_path(userdata_dir: &Path) -> PathBuf {
    userdata_dir.join("config").join("shortcuts.vdf")
}

/// Pick the shortcuts.vdf to work on.
///
/// An explicit path wins. Otherwise exactly one Steam account must exist,
/// or `user` must name one of them.
pub fn resolve_shortcuts_path(
    explicit: Option<&Path>,
    user: Option<&str>,
    home: &Path,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let userdata_dirs = find_steam_userdata_dirs(home);
    if userdata_dirs.is_empty() {
        bail!(
            "No Steam userdata directories found.\n\
             Is Steam installed? Pass --shortcuts to use a specific file."
        );
    }

    if let Some(user) = user {
        return userdata_dirs
            .iter()
            .find(|dir| dir.file_name().and_then(|n| n.to_str()) == Some(user))
            .map(|dir| shortcuts_vdf_path(dir))
            .ok_or_else(|| anyhow!("No Steam userdata directory for user {}", user));
    }

    match userdata_dirs.as_slice() {
        [only] => Ok(shortcuts_vdf_path(only)),
        many => {
            let ids: Vec<String> = many
                .iter()
                .filter_map(|d| d.file_name().map(|n| n.to_string_lossy().to_string()))
                .collect();
            bail!(
                "Multiple Steam users found ({}). Pass --user <id> to pick one.",
                ids.join(", ")
            )
        }
    }
}

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))
}
