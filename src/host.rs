//! The outside world: flatpak and the Steam process.
//!
//! The core never installs browsers, edits sandbox policy or restarts Steam
//! itself. It asks these collaborators narrow questions and leaves the rest to
//! the user.

use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::launch::{KNOWN_BROWSERS, KnownBrowser};

/// Filesystem path browsers need for controller input
pub const UDEV_PATH: &str = "/run/udev:ro";

pub trait BrowserDiscovery {
    /// Known browsers that are currently installed, in preference order.
    fn installed_browsers(&self) -> Result<Vec<KnownBrowser>>;
}

pub trait SandboxPermissions {
    fn has_filesystem_access(&self, app_id: &str, path: &str) -> Result<bool>;
    fn grant_filesystem_access(&self, app_id: &str, path: &str) -> Result<()>;
}

pub trait SteamProcess {
    fn is_running(&self) -> bool;
}

/// Collaborators backed by the `flatpak` and `pgrep` binaries
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl BrowserDiscovery for SystemHost {
    fn installed_browsers(&self) -> Result<Vec<KnownBrowser>> {
        let output = Command::new("flatpak")
            .args(["list", "--app", "--columns=application"])
            .output();

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                Ok(browsers_in_listing(&stdout))
            }
            Err(_) => Ok(Vec::new()),
        }
    }
}

impl SandboxPermissions for SystemHost {
    fn has_filesystem_access(&self, app_id: &str, path: &str) -> Result<bool> {
        let output = Command::new("flatpak")
            .args(["info", "--show-permissions", app_id])
            .output()
            .context("Failed to run flatpak info")?;
        Ok(String::from_utf8_lossy(&output.stdout).contains(path))
    }

    fn grant_filesystem_access(&self, app_id: &str, path: &str) -> Result<()> {
        let status = Command::new("flatpak")
            .args(["override", "--user", &format!("--filesystem={path}"), app_id])
            .status()
            .context("Failed to run flatpak override")?;
        if !status.success() {
            bail!("flatpak override for {} exited with {}", app_id, status);
        }
        Ok(())
    }
}

impl SteamProcess for SystemHost {
    fn is_running(&self) -> bool {
        Command::new("pgrep")
            .arg("-x")
            .arg("steam")
            .output()
            .is_ok_and(|o| o.status.success())
    }
}

fn browsers_in_listing(listing: &str) -> Vec<KnownBrowser> {
    KNOWN_BROWSERS
        .iter()
        .copied()
        .filter(|browser| listing.lines().any(|line| line.trim() == browser.app_id))
        .collect()
}
